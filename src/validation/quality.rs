//! Two-stage event quality cuts
//!
//! Stage one looks only at reconstruction scalars and frame content. Stage
//! two, evaluated only when stage one passes in full, looks at the largest
//! single HLC/SLC pulse of the event.

use nalgebra::Vector3;
use tracing::debug;

use crate::algorithms::projection::horizontal_distance;
use crate::core::geometry::GeometryModel;
use crate::processing::pulses::{DataBlock, EventFrame, PulseCategory};
use crate::utils::config::QualityCutConfig;
use crate::validation::error::ShowerResult;

/// Reconstruction-level quantities entering stage one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageOneInputs {
    /// Horizontal distance of the reconstructed core from the array centre (m)
    pub core_distance: f64,
    /// Reconstructed zenith (rad)
    pub zenith: f64,
    /// Fitted signal at 125 m (VEM)
    pub s125: f64,
    pub sta5_triggered: bool,
    pub blocks_present: bool,
}

/// Largest single pulse of an event and where it was seen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseExtremum {
    /// VEM
    pub charge: f64,
    /// Horizontal distance of the pulse's channel from the reconstructed core (m)
    pub core_distance: f64,
}

/// Outcome of every criterion plus the overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityDecision {
    pub core_contained: bool,
    pub zenith_accepted: bool,
    pub s125_accepted: bool,
    pub triggered: bool,
    pub blocks_present: bool,
    pub max_charge_accepted: bool,
    pub max_charge_near_core: bool,
    pub accepted: bool,
}

impl QualityDecision {
    pub fn stage_one_passed(&self) -> bool {
        self.core_contained
            && self.zenith_accepted
            && self.s125_accepted
            && self.triggered
            && self.blocks_present
    }

    pub fn stage_two_passed(&self) -> bool {
        self.max_charge_accepted && self.max_charge_near_core
    }
}

/// Binary admission filter for the analysed event sample
#[derive(Debug, Clone, Default)]
pub struct QualityCutEvaluator {
    config: QualityCutConfig,
}

impl QualityCutEvaluator {
    pub fn new(config: QualityCutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityCutConfig {
        &self.config
    }

    /// Pure decision from precomputed inputs.
    ///
    /// The extremum is ignored unless stage one passes; a missing extremum
    /// (no pulses in the window) fails stage two.
    pub fn decide(&self, inputs: &StageOneInputs, extremum: Option<PulseExtremum>) -> QualityDecision {
        let mut decision = QualityDecision {
            core_contained: inputs.core_distance < self.config.max_core_distance_m,
            zenith_accepted: inputs.zenith.cos() >= self.config.min_cos_zenith,
            s125_accepted: inputs.s125 >= self.config.min_s125_vem,
            triggered: inputs.sta5_triggered,
            blocks_present: inputs.blocks_present,
            ..QualityDecision::default()
        };

        if !decision.stage_one_passed() {
            return decision;
        }

        if let Some(extremum) = extremum {
            decision.max_charge_accepted = extremum.charge >= self.config.min_max_charge_vem;
            decision.max_charge_near_core = extremum.core_distance <= self.config.max_charge_distance_m;
        }
        decision.accepted = decision.stage_two_passed();
        decision
    }

    /// Stage-one inputs of a frame, or `None` without a reconstruction
    pub fn stage_one_inputs(&self, frame: &EventFrame) -> Option<StageOneInputs> {
        let reco = frame.reconstruction.as_ref()?;
        Some(StageOneInputs {
            core_distance: reco.x.hypot(reco.y),
            zenith: reco.zenith,
            s125: reco.s125,
            sta5_triggered: frame.sta5_triggered,
            blocks_present: Self::blocks_present(frame),
        })
    }

    fn blocks_present(frame: &EventFrame) -> bool {
        DataBlock::required().into_iter().all(|b| frame.has_block(b))
    }

    /// Largest in-window HLC/SLC pulse relative to the reconstructed core.
    ///
    /// Ties keep the first pulse seen (HLC before SLC).
    pub fn find_extremum(&self, frame: &EventFrame, geometry: &GeometryModel) -> ShowerResult<Option<PulseExtremum>> {
        let Some(reco) = frame.reconstruction.as_ref() else {
            return Ok(None);
        };
        let core = Vector3::new(reco.x, reco.y, reco.z);

        let mut best: Option<PulseExtremum> = None;
        for category in [PulseCategory::Hlc, PulseCategory::Slc] {
            for pulse in frame.pulses(category) {
                if (reco.time - pulse.time).abs() > self.config.time_window_ns {
                    continue;
                }
                let position = geometry.channel_position(pulse.channel)?;
                if best.map_or(true, |b| pulse.charge > b.charge) {
                    best = Some(PulseExtremum {
                        charge: pulse.charge,
                        core_distance: horizontal_distance(position, &core),
                    });
                }
            }
        }
        Ok(best)
    }

    /// Full two-stage evaluation of one frame.
    ///
    /// Only geometry mismatches are errors; anything else is a rejection.
    pub fn evaluate(&self, frame: &EventFrame, geometry: &GeometryModel) -> ShowerResult<QualityDecision> {
        let Some(inputs) = self.stage_one_inputs(frame) else {
            debug!(run = frame.header.run, event = frame.header.event, "no reconstruction, event rejected");
            return Ok(QualityDecision {
                triggered: frame.sta5_triggered,
                blocks_present: Self::blocks_present(frame),
                ..QualityDecision::default()
            });
        };

        let stage_one = self.decide(&inputs, None);
        let decision = if stage_one.stage_one_passed() {
            self.decide(&inputs, self.find_extremum(frame, geometry)?)
        } else {
            stage_one
        };

        debug!(
            run = frame.header.run,
            event = frame.header.event,
            stage_one = decision.stage_one_passed(),
            accepted = decision.accepted,
            "quality cuts evaluated"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::grid_geometry;
    use crate::core::types::ChannelId;
    use crate::processing::pulses::Pulse;
    use crate::processing::shower::fixtures::frame;
    use crate::validation::error::ShowerError;

    fn passing_inputs() -> StageOneInputs {
        StageOneInputs {
            core_distance: 100.0,
            zenith: 0.95f64.acos(),
            s125: 5.0,
            sta5_triggered: true,
            blocks_present: true,
        }
    }

    #[test]
    fn test_good_event_is_accepted() {
        let evaluator = QualityCutEvaluator::default();
        let decision = evaluator.decide(
            &passing_inputs(),
            Some(PulseExtremum { charge: 10.0, core_distance: 200.0 }),
        );
        assert!(decision.stage_one_passed());
        assert!(decision.stage_two_passed());
        assert!(decision.accepted);
    }

    #[test]
    fn test_uncontained_core_is_rejected() {
        let evaluator = QualityCutEvaluator::default();
        let inputs = StageOneInputs { core_distance: 450.0, ..passing_inputs() };
        let decision = evaluator.decide(&inputs, Some(PulseExtremum { charge: 10.0, core_distance: 200.0 }));
        assert!(!decision.core_contained);
        assert!(decision.zenith_accepted);
        assert!(!decision.accepted);
        // Stage two is not evaluated after a stage-one failure
        assert!(!decision.max_charge_accepted);
    }

    #[test]
    fn test_small_max_charge_is_rejected() {
        let evaluator = QualityCutEvaluator::default();
        let decision = evaluator.decide(
            &passing_inputs(),
            Some(PulseExtremum { charge: 3.0, core_distance: 200.0 }),
        );
        assert!(decision.stage_one_passed());
        assert!(!decision.max_charge_accepted);
        assert!(!decision.accepted);
    }

    #[test]
    fn test_distant_max_charge_is_rejected() {
        let evaluator = QualityCutEvaluator::default();
        let decision = evaluator.decide(
            &passing_inputs(),
            Some(PulseExtremum { charge: 50.0, core_distance: 300.5 }),
        );
        assert!(decision.max_charge_accepted);
        assert!(!decision.max_charge_near_core);
        assert!(!decision.accepted);
    }

    #[test]
    fn test_threshold_edges() {
        let evaluator = QualityCutEvaluator::default();
        let edge = StageOneInputs { core_distance: 400.0, ..passing_inputs() };
        assert!(!evaluator.decide(&edge, None).core_contained);

        let edge = StageOneInputs { s125: 1.0, ..passing_inputs() };
        assert!(evaluator.decide(&edge, None).s125_accepted);

        let decision = evaluator.decide(
            &passing_inputs(),
            Some(PulseExtremum { charge: 6.0, core_distance: 300.0 }),
        );
        assert!(decision.accepted);
    }

    #[test]
    fn test_missing_trigger_or_blocks_rejects() {
        let evaluator = QualityCutEvaluator::default();
        let extremum = Some(PulseExtremum { charge: 10.0, core_distance: 10.0 });

        let no_trigger = StageOneInputs { sta5_triggered: false, ..passing_inputs() };
        assert!(!evaluator.decide(&no_trigger, extremum).accepted);

        let no_blocks = StageOneInputs { blocks_present: false, ..passing_inputs() };
        assert!(!evaluator.decide(&no_blocks, extremum).accepted);
    }

    #[test]
    fn test_no_pulses_fails_stage_two() {
        let evaluator = QualityCutEvaluator::default();
        let decision = evaluator.decide(&passing_inputs(), None);
        assert!(decision.stage_one_passed());
        assert!(!decision.accepted);
    }

    #[test]
    fn test_decision_is_deterministic() {
        let evaluator = QualityCutEvaluator::default();
        let extremum = Some(PulseExtremum { charge: 7.5, core_distance: 120.0 });
        let first = evaluator.decide(&passing_inputs(), extremum);
        for _ in 0..10 {
            assert_eq!(evaluator.decide(&passing_inputs(), extremum), first);
        }
    }

    #[test]
    fn test_evaluate_frame() {
        let geometry = grid_geometry(2, 125.0);
        let evaluator = QualityCutEvaluator::default();
        let input = frame("PPlus", 1, 1);

        let decision = evaluator.evaluate(&input, &geometry).unwrap();
        assert!(decision.stage_one_passed());
        assert!(decision.accepted);
    }

    #[test]
    fn test_extremum_picks_largest_in_window_pulse() {
        let geometry = grid_geometry(2, 125.0);
        let evaluator = QualityCutEvaluator::default();
        let mut input = frame("PPlus", 1, 1);
        input.pulses.insert(PulseCategory::Slc, vec![
            Pulse::new(ChannelId::new(4, 63), 9.0, 5100.0),
            Pulse::new(ChannelId::new(2, 63), 40.0, 7000.0),
        ]);

        let extremum = evaluator.find_extremum(&input, &geometry).unwrap().unwrap();
        assert_eq!(extremum.charge, 9.0);
        // Station 4 is at (125, 125), module 63 is 4 m towards +x; core at (10, 0)
        let expected = ((129.0f64 - 10.0).powi(2) + 125.0f64.powi(2)).sqrt();
        assert!((extremum.core_distance - expected).abs() < 1e-9);

        let decision = evaluator.evaluate(&input, &geometry).unwrap();
        assert!(decision.max_charge_accepted);
        assert!(decision.max_charge_near_core);
    }

    #[test]
    fn test_missing_block_fails_stage_one() {
        let geometry = grid_geometry(1, 0.0);
        let evaluator = QualityCutEvaluator::default();
        let mut input = frame("PPlus", 1, 1);
        input.has_mc_primary_info = false;

        let decision = evaluator.evaluate(&input, &geometry).unwrap();
        assert!(!decision.blocks_present);
        assert!(!decision.accepted);
    }

    #[test]
    fn test_missing_reconstruction_rejects() {
        let geometry = grid_geometry(1, 0.0);
        let evaluator = QualityCutEvaluator::default();
        let mut input = frame("PPlus", 1, 1);
        input.reconstruction = None;

        let decision = evaluator.evaluate(&input, &geometry).unwrap();
        assert!(!decision.accepted);
        assert!(!decision.core_contained);
        assert!(!decision.zenith_accepted);
        assert!(!decision.s125_accepted);
        // Frame-level criteria are still reported
        assert!(decision.triggered);
        assert!(decision.blocks_present);

        input.sta5_triggered = false;
        assert!(!evaluator.evaluate(&input, &geometry).unwrap().triggered);
    }

    #[test]
    fn test_unknown_channel_aborts() {
        let geometry = grid_geometry(1, 0.0);
        let evaluator = QualityCutEvaluator::default();
        let mut input = frame("PPlus", 1, 1);
        let channel = ChannelId::new(50, 61);
        input.pulses.insert(PulseCategory::Hlc, vec![Pulse::new(channel, 12.0, 5000.0)]);

        assert_eq!(
            evaluator.evaluate(&input, &geometry),
            Err(ShowerError::GeometryLookupMiss { channel })
        );
    }
}

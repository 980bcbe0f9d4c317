//! Signal selection used by the downstream muon-content analyses
//!
//! Only tanks far from the shower axis are used, where the muon component
//! dominates. Component PE are converted to VEM with each tank's own
//! total-charge/total-PE ratio before the per-tank charge window is applied.

use std::collections::BTreeMap;
use tracing::trace;

use crate::core::types::PrimarySpecies;
use crate::processing::aggregator::SensorSignal;
use crate::processing::shower::ShowerRecord;
use crate::utils::config::AnalysisConfig;

/// Windowed signal sums over the tanks beyond the distance cut
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistantSignalSums {
    /// Scaled muon charge (VEM)
    pub muon_charge: f64,
    pub hlc_charge: f64,
    pub slc_charge: f64,
    pub total_charge: f64,
    /// Tanks beyond the distance cut with a usable charge scale
    pub sensors_used: usize,
    /// Tanks beyond the distance cut skipped for lack of PE
    pub sensors_skipped: usize,
}

/// Per-shower summary row for composition studies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub run: u32,
    pub species: PrimarySpecies,
    pub energy_proton: f64,
    pub energy_iron: f64,
    pub zenith: f64,
    /// SLC charge beyond the feature distance within the closed charge window
    pub slc_charge: f64,
    /// Scaled muon charge beyond the feature distance, unwindowed
    pub muon_charge: f64,
    pub muon_count: f64,
}

/// Applies the analysis configuration to shower records
#[derive(Debug, Clone, Default)]
pub struct SignalSelection {
    config: AnalysisConfig,
}

impl SignalSelection {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Primary energy strictly inside the configured window
    pub fn in_energy_window(&self, record: &ShowerRecord) -> bool {
        let energy = record.primary().energy;
        energy > self.config.energy_lower_ev && energy < self.config.energy_upper_ev
    }

    /// Tank charge strictly inside the configured window
    pub fn in_charge_window(&self, charge: f64) -> bool {
        charge > self.config.charge_lower_vem && charge < self.config.charge_upper_vem
    }

    fn distant_signals<'r>(&self, record: &'r ShowerRecord) -> impl Iterator<Item = &'r SensorSignal> {
        let distance = self.config.distance_m;
        record
            .signals()
            .values()
            .filter(move |s| s.lateral_distance >= distance)
    }

    /// Charge sums over tanks at or beyond the distance cut
    pub fn distant_sums(&self, record: &ShowerRecord) -> DistantSignalSums {
        let mut sums = DistantSignalSums::default();
        for signal in self.distant_signals(record) {
            let muon_charge = match signal.muon_charge() {
                Ok(charge) => charge,
                Err(error) => {
                    trace!(%error, "tank skipped");
                    sums.sensors_skipped += 1;
                    continue;
                }
            };
            sums.sensors_used += 1;
            if self.in_charge_window(muon_charge) {
                sums.muon_charge += muon_charge;
            }
            if self.in_charge_window(signal.hlc_charge) {
                sums.hlc_charge += signal.hlc_charge;
            }
            if self.in_charge_window(signal.slc_charge) {
                sums.slc_charge += signal.slc_charge;
            }
            if self.in_charge_window(signal.total_charge) {
                sums.total_charge += signal.total_charge;
            }
        }
        sums
    }

    /// Records inside the energy window, paired with their distant sums
    pub fn select<'r>(
        &'r self,
        records: &'r [ShowerRecord],
    ) -> impl Iterator<Item = (&'r ShowerRecord, DistantSignalSums)> + 'r {
        records
            .iter()
            .filter(move |r| self.in_energy_window(r))
            .map(move |r| (r, self.distant_sums(r)))
    }

    /// Summary row of one shower.
    ///
    /// Uses tanks strictly beyond the feature distance and a closed SLC window.
    pub fn feature_row(&self, record: &ShowerRecord) -> FeatureRow {
        let mut slc_charge = 0.0;
        let mut muon_charge = 0.0;
        let mut muon_count = 0.0;

        for signal in record.signals().values() {
            if signal.lateral_distance <= self.config.feature_distance_m {
                continue;
            }
            let Ok(scaled) = signal.muon_charge() else {
                continue;
            };
            muon_charge += scaled;
            muon_count += f64::from(signal.muon_count);
            if signal.slc_charge >= self.config.charge_lower_vem && signal.slc_charge <= self.config.charge_upper_vem {
                slc_charge += signal.slc_charge;
            }
        }

        let reco = record.reconstruction();
        FeatureRow {
            run: record.run(),
            species: record.species(),
            energy_proton: reco.energy_proton,
            energy_iron: reco.energy_iron,
            zenith: reco.zenith,
            slc_charge,
            muon_charge,
            muon_count,
        }
    }
}

/// Average feature rows of the same run and species
pub fn average_by_run(rows: &[FeatureRow]) -> Vec<FeatureRow> {
    let mut groups: BTreeMap<(u32, bool), Vec<&FeatureRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.run, row.species == PrimarySpecies::Iron))
            .or_default()
            .push(row);
    }

    groups
        .into_values()
        .map(|group| {
            let n = group.len() as f64;
            let mean = |f: fn(&FeatureRow) -> f64| group.iter().map(|r| f(r)).sum::<f64>() / n;
            FeatureRow {
                run: group[0].run,
                species: group[0].species,
                energy_proton: mean(|r| r.energy_proton),
                energy_iron: mean(|r| r.energy_iron),
                zenith: mean(|r| r.zenith),
                slc_charge: mean(|r| r.slc_charge),
                muon_charge: mean(|r| r.muon_charge),
                muon_count: mean(|r| r.muon_count),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::intersection::MuonCount;
    use crate::core::geometry::{grid_geometry, GeometryModel};
    use crate::core::types::{ChannelId, SensorId};
    use crate::processing::pulses::{Pulse, PulseCategory};
    use crate::processing::shower::fixtures::frame;
    use crate::processing::shower::ShowerBuilder;
    use crate::utils::config::AggregationConfig;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    /// 2x2 station grid; the shower lands on station 1
    fn distant_record(type_name: &str, energy_gev: f64) -> ShowerRecord {
        record_on_grid(type_name, energy_gev, 500.0)
    }

    fn record_on_grid(type_name: &str, energy_gev: f64, spacing: f64) -> ShowerRecord {
        let geometry = grid_geometry(2, spacing);
        let builder = ShowerBuilder::new(&geometry, &AggregationConfig::default());
        let mut input = frame(type_name, 3, 1);
        if let Some(mc) = input.mc_primary.as_mut() {
            mc.energy_gev = energy_gev;
        }
        // Station 2 tank 1: 50 muon PE, 50 other PE, 1.2 VEM HLC, 0.8 VEM SLC
        input.pulses.insert(PulseCategory::Muon, vec![Pulse::new(ChannelId::new(2, 61), 50.0, 5000.0)]);
        input.pulses.insert(PulseCategory::Gamma, vec![Pulse::new(ChannelId::new(2, 62), 50.0, 5000.0)]);
        input.pulses.insert(PulseCategory::Hlc, vec![Pulse::new(ChannelId::new(2, 61), 1.2, 5000.0)]);
        input.pulses.insert(PulseCategory::Slc, vec![
            Pulse::new(ChannelId::new(2, 62), 0.8, 5000.0),
            // Station 3 tank 2 has charge but no PE
            Pulse::new(ChannelId::new(3, 63), 1.0, 5000.0),
        ]);
        builder.build(&input).unwrap()
    }

    #[test]
    fn test_energy_window_is_exclusive() {
        let selection = SignalSelection::default();
        assert!(selection.in_energy_window(&distant_record("PPlus", 5.0e6)));
        assert!(!selection.in_energy_window(&distant_record("PPlus", 1.0e7)));
        assert!(!selection.in_energy_window(&distant_record("PPlus", 1.0e6)));
    }

    #[test]
    fn test_distant_sums_scale_muon_pe() {
        let selection = SignalSelection::default();
        let sums = selection.distant_sums(&distant_record("PPlus", 5.0e6));

        // scale = 2.0 VEM / 100 PE; total charge sits on the open upper bound
        assert_relative_eq!(sums.muon_charge, 1.0, epsilon = 1e-12);
        assert_relative_eq!(sums.hlc_charge, 1.2);
        assert_relative_eq!(sums.slc_charge, 0.8);
        assert_eq!(sums.total_charge, 0.0);
        assert_eq!(sums.sensors_used, 1);
        assert_eq!(sums.sensors_skipped, 5);
    }

    #[test]
    fn test_select_filters_by_energy() {
        let selection = SignalSelection::default();
        let records = vec![distant_record("PPlus", 5.0e6), distant_record("PPlus", 2.0e7)];
        let selected: Vec<_> = selection.select(&records).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.primary().energy, 5.0e15);
    }

    #[test]
    fn test_feature_row() {
        let selection = SignalSelection::default();
        let mut count = MuonCount::default();
        count.total = 2;
        count.per_sensor.insert(SensorId::new(2, 1), 2);
        let record = distant_record("Fe56Nucleus", 5.0e6).with_muon_count(&count);

        let row = selection.feature_row(&record);
        assert_eq!(row.species, PrimarySpecies::Iron);
        assert_relative_eq!(row.muon_charge, 1.0, epsilon = 1e-12);
        assert_relative_eq!(row.slc_charge, 0.8);
        assert_eq!(row.muon_count, 2.0);
    }

    #[test]
    fn test_feature_row_uses_its_own_distance() {
        // Station 2 tank 1 sits at 396 m: inside the 300 m cut, short of 400 m
        let record = record_on_grid("PPlus", 5.0e6, 400.0);
        let selection = SignalSelection::default();
        assert_eq!(selection.distant_sums(&record).sensors_used, 1);

        let row = selection.feature_row(&record);
        assert_eq!(row.muon_charge, 0.0);
        assert_eq!(row.slc_charge, 0.0);

        let closer = SignalSelection::new(AnalysisConfig { feature_distance_m: 300.0, ..AnalysisConfig::default() });
        assert_relative_eq!(closer.feature_row(&record).muon_charge, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tank_straddling_cut_follows_distance_channel() {
        // OM 61 lies inside the 300 m cut, OM 62 just outside
        let mut channels = Vec::new();
        for (module, x) in [(61u8, -5.0), (62, -4.0), (63, 4.0), (64, 5.0)] {
            channels.push((ChannelId::new(1, module), Vector3::new(x, 0.0, 1945.0)));
        }
        for (module, x) in [(61u8, 299.5), (62, 300.3), (63, 308.0), (64, 309.0)] {
            channels.push((ChannelId::new(2, module), Vector3::new(x, 0.0, 1945.0)));
        }
        let geometry = GeometryModel::from_channels(channels).unwrap();
        let builder = ShowerBuilder::new(&geometry, &AggregationConfig::default());
        let mut input = frame("PPlus", 1, 1);
        input.pulses.insert(PulseCategory::Muon, vec![Pulse::new(ChannelId::new(2, 61), 50.0, 5000.0)]);
        input.pulses.insert(PulseCategory::Gamma, vec![Pulse::new(ChannelId::new(2, 62), 50.0, 5000.0)]);
        input.pulses.insert(PulseCategory::Hlc, vec![Pulse::new(ChannelId::new(2, 61), 1.5, 5000.0)]);
        let record = builder.build(&input).unwrap();

        assert_relative_eq!(record.signal(SensorId::new(2, 1)).unwrap().lateral_distance, 300.3, epsilon = 1e-9);
        let sums = SignalSelection::default().distant_sums(&record);
        assert_eq!(sums.sensors_used, 1);
        assert_relative_eq!(sums.muon_charge, 0.75, epsilon = 1e-12);
        assert_relative_eq!(sums.hlc_charge, 1.5);
    }

    #[test]
    fn test_average_by_run_groups_species() {
        let selection = SignalSelection::default();
        let proton = selection.feature_row(&distant_record("PPlus", 5.0e6));
        let iron = selection.feature_row(&distant_record("Fe56Nucleus", 5.0e6));
        let mut other = proton;
        other.muon_charge = 1.6;

        let averaged = average_by_run(&[proton, iron, other]);
        assert_eq!(averaged.len(), 2);
        let proton_avg = averaged.iter().find(|r| r.species == PrimarySpecies::Proton).unwrap();
        assert_relative_eq!(proton_avg.muon_charge, (proton.muon_charge + 1.6) / 2.0);
    }
}

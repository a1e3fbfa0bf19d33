/*
    Kinematic filters, recursive estimation of planar motion
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{Simulator, SimulatorConfig, SpeedSimulator, SpeedSimulatorConfig};
use crate::config::{ConfigRepr, TrackerConfig};
use crate::errors::FilterError;
use crate::filter::consistency::Consistency;
use crate::fusion::{AnyTracker, Measurements, TrackerKind};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant as StdInstant;
use typed_builder::TypedBuilder;

/// Simulated data of a scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScenarioData {
    Trajectory(SimulatorConfig),
    Speed(SpeedSimulatorConfig),
}

impl Default for ScenarioData {
    fn default() -> Self {
        Self::Speed(SpeedSimulatorConfig::default())
    }
}

/// A tracker run on simulated data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct ScenarioConfig {
    #[builder(setter(into))]
    pub name: String,
    pub kind: TrackerKind,
    #[serde(default)]
    #[builder(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    #[builder(default)]
    pub data: ScenarioData,
    #[serde(default)]
    #[builder(default)]
    pub seed: u64,
}

impl ConfigRepr for ScenarioConfig {}

/// Summary of a scenario run.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioReport {
    pub name: String,
    pub kind: TrackerKind,
    pub seed: u64,
    /// Number of simulated bundles
    pub bundles: usize,
    /// Number of bundles which produced an estimate
    pub estimates: usize,
    pub resets: usize,
    pub gated: usize,
    /// Root mean square of the position error of the estimates which are not resets
    pub position_rms: Option<f64>,
    pub consistency: Consistency,
    pub check_string: String,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}, seed {}): {} estimates from {} bundles, {} resets, {} gated",
            self.name, self.kind, self.seed, self.estimates, self.bundles, self.resets, self.gated
        )?;
        if let Some(rms) = self.position_rms {
            write!(f, ", position RMS {rms:.3}")?;
        }
        if !self.check_string.is_empty() {
            write!(f, "\n{}", self.check_string)?;
        }
        Ok(())
    }
}

impl ScenarioConfig {
    /// Simulated bundles of this scenario.
    pub fn measurements(&self) -> Result<Vec<Measurements>, FilterError> {
        Ok(match &self.data {
            ScenarioData::Trajectory(config) => Simulator::new(config, self.seed)?.generate(),
            ScenarioData::Speed(config) => SpeedSimulator::new(config, self.seed)?.generate(),
        })
    }

    /// Runs the tracker on every simulated bundle. Any filter error aborts the scenario.
    pub fn run(&self) -> Result<ScenarioReport, FilterError> {
        let bundles = self.measurements()?;
        let mut tracker = AnyTracker::new(self.kind, &self.tracker)?;
        let mut estimates = 0;
        let mut resets = 0;
        let mut gated = 0;
        let mut sum_squares = 0.0;
        let mut errors = 0;
        for m in &bundles {
            let Some(update) = tracker.update(m)? else {
                continue;
            };
            estimates += 1;
            if update.reset {
                resets += 1;
                continue;
            }
            if update.gated {
                gated += 1;
            }
            if let Some(truth) = &m.true_data {
                sum_squares += (update.position - truth.position).norm_squared();
                errors += 1;
            }
        }
        Ok(ScenarioReport {
            name: self.name.clone(),
            kind: self.kind,
            seed: self.seed,
            bundles: bundles.len(),
            estimates,
            resets,
            gated,
            position_rms: (errors > 0).then(|| (sum_squares / errors as f64).sqrt()),
            consistency: *tracker.consistency(),
            check_string: tracker.consistency_string(),
        })
    }
}

fn progress_bar(count: usize) -> ProgressBar {
    let pb = ProgressBar::new(count as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:100.cyan/blue} {pos:>7}/{len:7} {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("scenarios");
    pb
}

/// Runs every scenario in parallel, each with its own simulator, generator and tracker.
///
/// The reports are in the order of the scenarios and only depend on their configuration and seed.
#[must_use = "scenario reports must be used"]
pub fn run_batch(scenarios: &[ScenarioConfig]) -> Vec<Result<ScenarioReport, FilterError>> {
    info!("running {} scenarios", scenarios.len());
    let start = StdInstant::now();
    let reports = scenarios
        .par_iter()
        .progress_with(progress_bar(scenarios.len()))
        .map(|scenario| scenario.run())
        .collect::<Vec<_>>();
    info!(
        "ran {} scenarios in {:.3} s",
        scenarios.len(),
        start.elapsed().as_secs_f64()
    );
    reports
}

#[cfg(test)]
mod ut_batch {
    use super::*;

    #[test]
    fn serde_scenario() {
        let yaml = r#"
- name: speed
  kind: Speed1
  seed: 3
- name: direction
  kind: Direction11
  data: !Trajectory
    count: 100
  tracker:
    gate: 5.0
"#;
        let scenarios = ScenarioConfig::loads_many(yaml).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].kind, TrackerKind::Speed1);
        assert_eq!(scenarios[0].data, ScenarioData::default());
        assert_eq!(scenarios[1].tracker.gate, Some(5.0));
        match &scenarios[1].data {
            ScenarioData::Trajectory(config) => assert_eq!(config.count, 100),
            ScenarioData::Speed(_) => panic!("expected a trajectory"),
        }
        let serialized = serde_yaml::to_string(&scenarios).unwrap();
        assert_eq!(ScenarioConfig::loads_many(&serialized).unwrap(), scenarios);
    }
}

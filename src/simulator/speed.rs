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

use super::{check_cadence, white_noise, Pcg64Mcg};
use crate::config::{duration_from_str, duration_to_str, epoch_from_str, epoch_to_str, ConfigRepr};
use crate::errors::{FilterError, InvalidParameterSnafu};
use crate::filter::kinematic::discrete_noise_gain;
use crate::fusion::{Measurements, TrueData};
use crate::linalg::Vector2;
use crate::models::{NoiseModel, ProcessNoise};
use crate::time::{Duration, Epoch, TimeUnits};
use rand::Rng;
use rand_distr::Normal;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use typed_builder::TypedBuilder;

/// Configuration of a trajectory which follows the constant velocity process model exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct SpeedSimulatorConfig {
    #[serde(serialize_with = "epoch_to_str", deserialize_with = "epoch_from_str")]
    #[builder(default = Epoch::from_gregorian_tai_at_midnight(2024, 1, 1))]
    pub start: Epoch,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Duration::from_seconds(1.0))]
    pub dt: Duration,
    #[builder(default = 1000)]
    pub count: usize,
    /// Initial velocity, along x and y
    #[builder(default = [10.0, 5.0])]
    pub velocity: [f64; 2],
    /// Variance of the discrete white noise acceleration of each axis
    #[builder(default = 0.01)]
    pub process_variance: f64,
    #[builder(default = 4.0)]
    pub position_variance: f64,
    #[builder(default = 0.04)]
    pub speed_variance: f64,
    #[builder(default = 1)]
    pub position_cadence: usize,
    #[builder(default = 1)]
    pub speed_cadence: usize,
}

impl SpeedSimulatorConfig {
    /// Process noise which matches the simulated trajectory.
    pub fn process_noise(&self) -> ProcessNoise {
        ProcessNoise::builder()
            .position(NoiseModel::Discrete {
                variance: self.process_variance,
            })
            .build()
    }
}

impl Default for SpeedSimulatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for SpeedSimulatorConfig {}

/// Trajectory of a constant velocity object driven by a discrete white noise acceleration.
///
/// Each axis evolves as `x(k+1) = F x(k) + g w` with `g = [dt^2/2, dt]` and `w` of variance
/// `process_variance`, which is exactly the discrete process noise of the speed models.
#[derive(Clone, Debug)]
pub struct SpeedSimulator {
    config: SpeedSimulatorConfig,
    dt: f64,
    rng: Pcg64Mcg,
    process_noise: Normal<f64>,
    position_noise: Normal<f64>,
    speed_noise: Normal<f64>,
    step: usize,
    position: Vector2<f64>,
    velocity: Vector2<f64>,
}

impl SpeedSimulator {
    pub fn new(config: &SpeedSimulatorConfig, seed: u64) -> Result<Self, FilterError> {
        let dt = config.dt.to_seconds();
        ensure!(
            dt.is_finite() && dt > 0.0,
            InvalidParameterSnafu {
                param: "simulator dt (s)",
                value: dt
            }
        );
        check_cadence("position cadence", config.position_cadence)?;
        check_cadence("speed cadence", config.speed_cadence)?;
        Ok(Self {
            config: config.clone(),
            dt,
            rng: Pcg64Mcg::new(seed.into()),
            process_noise: white_noise("process variance", config.process_variance)?,
            position_noise: white_noise("position variance", config.position_variance)?,
            speed_noise: white_noise("speed variance", config.speed_variance)?,
            step: 0,
            position: Vector2::zeros(),
            velocity: Vector2::new(config.velocity[0], config.velocity[1]),
        })
    }

    pub fn step(&mut self) {
        let g = discrete_noise_gain::<2>(self.dt);
        for axis in 0..2 {
            let w = self.rng.sample(self.process_noise);
            self.position[axis] += self.dt * self.velocity[axis] + g[0] * w;
            self.velocity[axis] += g[1] * w;
        }
        self.step += 1;
    }

    pub fn epoch(&self) -> Epoch {
        self.config.start + (self.step as f64 * self.dt).seconds()
    }

    pub fn position(&self) -> Vector2<f64> {
        self.position
    }

    pub fn velocity(&self) -> Vector2<f64> {
        self.velocity
    }

    pub fn true_data(&self) -> TrueData {
        TrueData {
            position: self.position,
            speed: self.velocity.norm(),
            angle: 0.0,
            angle_r: 0.0,
        }
    }

    pub fn generate(mut self) -> Vec<Measurements> {
        let c = self.config.clone();
        let mut bundles = Vec::with_capacity(c.count);
        for i in 0..c.count {
            self.step();
            let mut m = Measurements::new(self.epoch()).with_true_data(self.true_data());
            if i % c.position_cadence == 0 {
                let noise = Vector2::new(
                    self.rng.sample(self.position_noise),
                    self.rng.sample(self.position_noise),
                );
                m = m.with_position(
                    self.position + noise,
                    Some(Vector2::new(c.position_variance, c.position_variance)),
                );
            }
            if i % c.speed_cadence == 0 {
                let speed = self.velocity.norm() + self.rng.sample(self.speed_noise);
                m = m.with_speed(speed, c.speed_variance);
            }
            bundles.push(m);
        }
        bundles
    }
}

#[cfg(test)]
mod ut_speed {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn noiseless_line() {
        let config = SpeedSimulatorConfig::builder()
            .count(10)
            .process_variance(0.0)
            .position_variance(0.0)
            .speed_variance(0.0)
            .build();
        let bundles = SpeedSimulator::new(&config, 0).unwrap().generate();
        assert_eq!(bundles.len(), 10);
        let last = bundles.last().unwrap();
        assert_abs_diff_eq!(last.position.unwrap().value, Vector2::new(100.0, 50.0), epsilon = 1e-9);
        assert_abs_diff_eq!(last.speed.unwrap().value[0], 125.0_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!((last.epoch - config.start).to_seconds(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn velocity_random_walk() {
        // The velocity of each axis is a random walk of variance process_variance dt^2 per step
        let config = SpeedSimulatorConfig::builder().process_variance(1.0).build();
        let mut increments = Vec::new();
        let mut sim = SpeedSimulator::new(&config, 42).unwrap();
        for _ in 0..10_000 {
            let v = sim.velocity();
            sim.step();
            increments.push(sim.velocity().x - v.x);
        }
        let n = increments.len() as f64;
        let variance = increments.iter().map(|d| d * d).sum::<f64>() / n;
        assert!((variance - 1.0).abs() < 0.05);
        assert_eq!(config.process_noise().position, NoiseModel::Discrete { variance: 1.0 });
    }
}

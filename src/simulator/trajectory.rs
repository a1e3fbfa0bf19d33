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
use crate::angle::Angle;
use crate::config::{duration_from_str, duration_to_str, epoch_from_str, epoch_to_str, ConfigRepr};
use crate::errors::{FilterError, InvalidParameterSnafu};
use crate::fusion::{Measurements, TrueData};
use crate::linalg::Vector2;
use crate::time::{Duration, Epoch, TimeUnits};
use crate::utils::rotate;
use rand::Rng;
use rand_distr::{Bernoulli, Normal, UnitCircle};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::f64::consts::{FRAC_PI_2, PI};
use typed_builder::TypedBuilder;

/// The trajectory starts this far from the origin along y.
const OFFSET: f64 = 500.0;
/// Period of the velocity angle schedule, in seconds.
const ANGLE_PERIOD: f64 = 31.0;
/// Duration of the turn at the start of each angle period, in seconds.
const ANGLE_CHANGE_PERIOD: f64 = 9.0;

/// Configuration of the two dimensional trajectory simulator.
///
/// The speed follows a sinusoid between `speed_min` and `speed_max`, clamped to
/// `[speed_clamp_min, speed_clamp_max]`, so the object stops whenever the sinusoid goes below a positive
/// clamp minimum. The velocity angle turns at the start of every 31 s period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct SimulatorConfig {
    #[serde(serialize_with = "epoch_to_str", deserialize_with = "epoch_from_str")]
    #[builder(default = Epoch::from_gregorian_tai_at_midnight(2024, 1, 1))]
    pub start: Epoch,
    /// Time step between two bundles
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Duration::from_seconds(0.1))]
    pub dt: Duration,
    /// Number of bundles
    #[builder(default = 5000)]
    pub count: usize,
    #[builder(default = -3.0)]
    pub speed_min: f64,
    #[builder(default = 30.0)]
    pub speed_max: f64,
    #[builder(default = 0.0)]
    pub speed_clamp_min: f64,
    #[builder(default = 25.0)]
    pub speed_clamp_max: f64,
    /// Variance of the noise added to the speed profile
    #[builder(default = 0.01)]
    pub speed_variance: f64,
    /// Period of the speed sinusoid, in seconds
    #[builder(default = 100.0)]
    pub speed_period: f64,
    /// Initial sensor angle, in radians
    #[builder(default = -30_f64.to_radians())]
    pub angle: f64,
    /// Drift of the sensor angle, in radians per hour
    #[builder(default = 2_f64.to_radians())]
    pub angle_drift_per_hour: f64,
    /// Constant bias of the measured direction, in radians
    #[builder(default = 30_f64.to_radians())]
    pub angle_r: f64,
    #[builder(default = 100.0)]
    pub position_variance: f64,
    #[builder(default = 0.01)]
    pub speed_measurement_variance: f64,
    #[builder(default = 2_f64.to_radians().powi(2))]
    pub direction_variance: f64,
    #[builder(default = 1.0)]
    pub acceleration_variance: f64,
    /// Distance of the position outliers
    #[builder(default = 300.0)]
    pub bad_position: f64,
    /// Probability of a position outlier
    #[builder(default = 0.0)]
    pub bad_position_probability: f64,
    /// Each channel is measured every this many steps
    #[builder(default = 10)]
    pub position_cadence: usize,
    #[builder(default = 1)]
    pub speed_cadence: usize,
    #[builder(default = 1)]
    pub direction_cadence: usize,
    #[builder(default = 1)]
    pub acceleration_cadence: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for SimulatorConfig {}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Velocity {
    magnitude: f64,
    angle: f64,
}

impl Velocity {
    fn vector(&self) -> Vector2<f64> {
        Vector2::new(
            self.magnitude * self.angle.cos(),
            self.magnitude * self.angle.sin(),
        )
    }
}

/// Two dimensional trajectory with a varying speed and direction, seen by a sensor whose angle drifts.
///
/// Directions are measured with the constant bias `angle_r` plus the sensor angle, and accelerations are
/// measured in the rotated sensor frame.
#[derive(Clone, Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    dt: f64,
    speed_mean: f64,
    speed_amplitude: f64,
    angle_drift: f64,
    angle_r: f64,
    rng: Pcg64Mcg,
    speed_noise: Normal<f64>,
    position_noise: Normal<f64>,
    speed_measurement_noise: Normal<f64>,
    direction_noise: Normal<f64>,
    acceleration_noise: Normal<f64>,
    outlier: Bernoulli,
    time: f64,
    position: Vector2<f64>,
    previous_velocity: Option<Velocity>,
    previous_velocity_time: Option<f64>,
    stop_start: Option<f64>,
    stopped_duration: f64,
    velocity: Velocity,
    next_velocity: Velocity,
    next_acceleration: Vector2<f64>,
    acceleration: Vector2<f64>,
    angle: f64,
}

impl Simulator {
    pub fn new(config: &SimulatorConfig, seed: u64) -> Result<Self, FilterError> {
        let dt = config.dt.to_seconds();
        ensure!(
            dt.is_finite() && dt > 0.0,
            InvalidParameterSnafu {
                param: "simulator dt (s)",
                value: dt
            }
        );
        ensure!(
            config.speed_max >= config.speed_min,
            InvalidParameterSnafu {
                param: "simulator maximum speed",
                value: config.speed_max
            }
        );
        ensure!(
            config.speed_clamp_min >= 0.0 && config.speed_clamp_max >= config.speed_clamp_min,
            InvalidParameterSnafu {
                param: "simulator speed clamp",
                value: config.speed_clamp_min
            }
        );
        ensure!(
            config.speed_period > 0.0,
            InvalidParameterSnafu {
                param: "simulator speed period (s)",
                value: config.speed_period
            }
        );
        for (what, cadence) in [
            ("position cadence", config.position_cadence),
            ("speed cadence", config.speed_cadence),
            ("direction cadence", config.direction_cadence),
            ("acceleration cadence", config.acceleration_cadence),
        ] {
            check_cadence(what, cadence)?;
        }
        let outlier = Bernoulli::new(config.bad_position_probability).map_err(|_| {
            FilterError::InvalidParameter {
                param: "position outlier probability",
                value: config.bad_position_probability,
            }
        })?;

        let mut simulator = Self {
            config: config.clone(),
            dt,
            speed_mean: (config.speed_min + config.speed_max) / 2.0,
            speed_amplitude: (config.speed_max - config.speed_min) / 2.0,
            angle_drift: dt * config.angle_drift_per_hour / 3600.0,
            angle_r: Angle::from_radians(config.angle_r).radians(),
            rng: Pcg64Mcg::new(seed.into()),
            speed_noise: white_noise("speed profile variance", config.speed_variance)?,
            position_noise: white_noise("position variance", config.position_variance)?,
            speed_measurement_noise: white_noise(
                "speed measurement variance",
                config.speed_measurement_variance,
            )?,
            direction_noise: white_noise("direction variance", config.direction_variance)?,
            acceleration_noise: white_noise("acceleration variance", config.acceleration_variance)?,
            outlier,
            time: 0.0,
            position: Vector2::new(0.0, OFFSET),
            previous_velocity: None,
            previous_velocity_time: None,
            stop_start: None,
            stopped_duration: 0.0,
            velocity: Velocity {
                magnitude: 0.0,
                angle: 0.0,
            },
            next_velocity: Velocity {
                magnitude: 0.0,
                angle: 0.0,
            },
            next_acceleration: Vector2::zeros(),
            acceleration: Vector2::zeros(),
            angle: Angle::from_radians(config.angle).radians(),
        };

        simulator.velocity = simulator.noisy_velocity(0.0);
        simulator.next_velocity = simulator.noisy_velocity(dt);
        simulator.next_acceleration =
            (simulator.next_velocity.vector() - simulator.velocity.vector()) / dt;
        simulator.acceleration = simulator.next_acceleration;
        Ok(simulator)
    }

    /// Velocity angle schedule: a quarter turn at the start of every period, then straight.
    fn velocity_angle(time: f64) -> f64 {
        let period = (time / ANGLE_PERIOD).floor();
        let in_period = time - period * ANGLE_PERIOD;
        let angle_time = period + (in_period / ANGLE_CHANGE_PERIOD).clamp(0.0, 1.0);
        0.2 + FRAC_PI_2 * (angle_time * FRAC_PI_2).cos()
    }

    fn speed_profile(&mut self, time: f64) -> f64 {
        let speed = self.speed_mean
            + self.speed_amplitude * (time * 2.0 * PI / self.config.speed_period).sin();
        let speed = speed.clamp(self.config.speed_clamp_min, self.config.speed_clamp_max);
        if speed > 0.0 {
            (speed + self.rng.sample(self.speed_noise)).max(0.0)
        } else {
            0.0
        }
    }

    /// The angle schedule is paused while stopped, so the object resumes in the direction it stopped.
    fn noisy_velocity(&mut self, time: f64) -> Velocity {
        let magnitude = self.speed_profile(time);
        let was_moving = self.previous_velocity.map_or(true, |v| v.magnitude > 0.0);
        if magnitude == 0.0 && was_moving {
            self.stop_start = Some(time);
        }
        if magnitude > 0.0 && !was_moving {
            if let (Some(start), Some(last)) = (self.stop_start, self.previous_velocity_time) {
                self.stopped_duration += last - start;
            }
            self.stop_start = None;
        }
        if magnitude == 0.0 && !was_moving {
            self.previous_velocity_time = Some(time);
            if let Some(previous) = self.previous_velocity {
                return previous;
            }
        }
        let velocity = Velocity {
            magnitude,
            angle: Self::velocity_angle(time - self.stopped_duration),
        };
        self.previous_velocity = Some(velocity);
        self.previous_velocity_time = Some(time);
        velocity
    }

    /// Advances the true trajectory by one step.
    pub fn step(&mut self) {
        self.time += self.dt;
        self.position +=
            self.dt * self.velocity.vector() + (self.dt * self.dt / 2.0) * self.next_acceleration;

        self.velocity = self.next_velocity;
        self.next_velocity = self.noisy_velocity(self.time + self.dt);

        let previous_acceleration = self.next_acceleration;
        self.next_acceleration = (self.next_velocity.vector() - self.velocity.vector()) / self.dt;
        self.acceleration = (previous_acceleration + self.next_acceleration) / 2.0;

        self.angle = (Angle::from_radians(self.angle) + Angle::from_radians(self.angle_drift)).radians();
    }

    pub fn epoch(&self) -> Epoch {
        self.config.start + self.time.seconds()
    }

    pub fn position(&self) -> Vector2<f64> {
        self.position
    }

    pub fn speed(&self) -> f64 {
        self.velocity.magnitude
    }

    /// Sensor angle
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn angle_r(&self) -> f64 {
        self.angle_r
    }

    pub fn true_data(&self) -> TrueData {
        TrueData {
            position: self.position,
            speed: self.speed(),
            angle: self.angle,
            angle_r: self.angle_r,
        }
    }

    pub fn measure_position(&mut self) -> Vector2<f64> {
        let noise = Vector2::new(
            self.rng.sample(self.position_noise),
            self.rng.sample(self.position_noise),
        );
        let m = self.position + noise;
        if self.rng.sample(self.outlier) {
            let [x, y]: [f64; 2] = self.rng.sample(UnitCircle);
            m + self.config.bad_position * Vector2::new(x, y)
        } else {
            m
        }
    }

    /// Measured speed, never negative and exactly zero while stopped.
    pub fn measure_speed(&mut self) -> f64 {
        let speed = self.velocity.magnitude;
        if speed > 0.0 {
            (speed + self.rng.sample(self.speed_measurement_noise)).max(0.0)
        } else {
            0.0
        }
    }

    pub fn measure_direction(&mut self) -> f64 {
        let noise = self.rng.sample(self.direction_noise);
        (Angle::from_radians(self.velocity.angle)
            + Angle::from_radians(self.angle_r)
            + Angle::from_radians(self.angle)
            + Angle::from_radians(noise))
        .radians()
    }

    /// Acceleration in the sensor frame.
    pub fn measure_acceleration(&mut self) -> Vector2<f64> {
        let noise = Vector2::new(
            self.rng.sample(self.acceleration_noise),
            self.rng.sample(self.acceleration_noise),
        );
        rotate(&self.acceleration, self.angle) + noise
    }

    /// Steps through the whole trajectory and returns one bundle per step, with the true data.
    pub fn generate(mut self) -> Vec<Measurements> {
        let c = self.config.clone();
        let mut bundles = Vec::with_capacity(c.count);
        for i in 0..c.count {
            self.step();
            let mut m = Measurements::new(self.epoch()).with_true_data(self.true_data());
            if i % c.acceleration_cadence == 0 {
                let value = self.measure_acceleration();
                m = m.with_acceleration(
                    value,
                    Vector2::new(c.acceleration_variance, c.acceleration_variance),
                );
            }
            if i % c.direction_cadence == 0 {
                let value = self.measure_direction();
                m = m.with_direction(value, c.direction_variance);
            }
            if i % c.position_cadence == 0 {
                let value = self.measure_position();
                m = m.with_position(
                    value,
                    Some(Vector2::new(c.position_variance, c.position_variance)),
                );
            }
            if i % c.speed_cadence == 0 {
                let value = self.measure_speed();
                m = m.with_speed(value, c.speed_measurement_variance);
            }
            bundles.push(m);
        }
        bundles
    }
}

#[cfg(test)]
mod ut_trajectory {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn deterministic_and_cadenced() {
        let config = SimulatorConfig::builder()
            .count(200)
            .position_cadence(10)
            .speed_cadence(2)
            .build();
        let a = Simulator::new(&config, 7).unwrap().generate();
        let b = Simulator::new(&config, 7).unwrap().generate();
        let c = Simulator::new(&config, 8).unwrap().generate();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 200);
        assert_eq!(a.iter().filter(|m| m.position.is_some()).count(), 20);
        assert_eq!(a.iter().filter(|m| m.speed.is_some()).count(), 100);
        assert!(a.iter().all(|m| m.direction.is_some() && m.acceleration.is_some()));
        assert!(a.windows(2).all(|w| w[1].epoch > w[0].epoch));
        assert_abs_diff_eq!((a[0].epoch - config.start).to_seconds(), 0.1, epsilon = 1e-9);
    }

    #[test]
    fn truth() {
        let config = SimulatorConfig::builder()
            .speed_variance(0.0)
            .speed_min(10.0)
            .speed_max(10.0)
            .speed_clamp_max(20.0)
            .angle_drift_per_hour(3600.0_f64.to_radians())
            .build();
        let mut sim = Simulator::new(&config, 0).unwrap();
        let start = sim.position();
        for _ in 0..10 {
            sim.step();
        }
        assert_abs_diff_eq!(sim.speed(), 10.0, epsilon = 1e-12);
        // One degree per second for one second
        assert_abs_diff_eq!(sim.angle(), config.angle + 1.0_f64.to_radians(), epsilon = 1e-9);
        let travelled = (sim.position() - start).norm();
        assert!(travelled > 9.0 && travelled <= 10.0 + 1e-9);
        assert_abs_diff_eq!(sim.true_data().angle_r, 30_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn outliers() {
        let config = SimulatorConfig::builder()
            .count(100)
            .position_cadence(1)
            .position_variance(0.0)
            .bad_position_probability(1.0)
            .build();
        let bundles = Simulator::new(&config, 1).unwrap().generate();
        for m in bundles {
            let error = m.position.unwrap().value - m.true_data.unwrap().position;
            assert_abs_diff_eq!(error.norm(), 300.0, epsilon = 1e-9);
        }

        let bad = SimulatorConfig::builder().bad_position_probability(2.0).build();
        assert!(Simulator::new(&bad, 1).is_err());
        let bad = SimulatorConfig::builder().position_cadence(0).build();
        assert!(Simulator::new(&bad, 1).is_err());
    }

    #[test]
    fn serde_simulator_config() {
        let config = SimulatorConfig::builder().count(10).dt(1.seconds()).build();
        let serialized = serde_yaml::to_string(&config).unwrap();
        let deserd: SimulatorConfig = serde_yaml::from_str(&serialized).unwrap();
        assert_eq!(deserd, config);
    }
}

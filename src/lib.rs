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

/*! # kinematic-filters

Unscented and extended Kalman filters which fuse intermittent position, speed, direction and acceleration
measurements of a single moving object into a consistent estimate of its planar motion.

The crate is organized bottom-up:
+ [`filter`] holds the generic estimation engines (sigma points, UKF, EKF, gating, consistency statistics);
+ [`models`] defines the kinematic models, i.e. which state components are tracked and how they are observed;
+ [`fusion`] turns time-tagged measurement bundles into filter resets, predictions and updates;
+ [`simulator`] generates synthetic trajectories to validate the filters statistically.
*/

/// Wrapped angles, the only place where angle wrap-around is implemented.
pub mod angle;

/// Generic estimation engines and their statistics.
pub mod filter;

/// Kinematic models plugged into the engines.
pub mod models;

/// Measurement fusion: turns measurement bundles into filter updates.
pub mod fusion;

/// Synthetic trajectories and measurements, for validation only.
pub mod simulator;

/// Loading of configurations from YAML.
pub mod config;

/// Small helpers shared by the models and the simulator.
pub mod utils;

mod errors;
/// Functions which may fail return a `FilterError`, they never panic.
pub use self::errors::FilterError;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

pub use self::angle::Angle;

#[allow(unused_imports)]
pub mod prelude {
    pub use crate::config::{ConfigError, ConfigRepr, TrackerConfig};
    pub use crate::filter::consistency::{Consistency, NormalizedSquared};
    pub use crate::filter::*;
    pub use crate::fusion::*;
    pub use crate::models::*;
    pub use crate::simulator::*;
    pub use crate::time::{Duration, Epoch, TimeUnits, Unit};
    pub use crate::{Angle, FilterError};
}

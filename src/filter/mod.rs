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

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Validation of the state, covariance and scalar inputs of the engines.
pub mod checks;

/// Scaled sigma points of the unscented transform.
pub mod sigma_points;
pub use sigma_points::SigmaPoints;

/// Combination rules of state vectors with angle components.
pub mod state_space;
pub use state_space::StateSpace;

/// Gating, normalized innovation and likelihood of a measurement update.
pub mod update_info;
pub use update_info::{make_update_info, UpdateInfo};

/// Unscented Kalman filter.
pub mod ukf;
pub use ukf::Ukf;

/// Extended Kalman filter, optionally with an H infinity gain.
pub mod ekf;
pub use ekf::Ekf;

/// Kinematic transition and white noise matrices.
pub mod kinematic;
pub use kinematic::{continuous_white_noise, discrete_white_noise, kinematic_transition};

/// NEES and NIS statistics.
pub mod consistency;

/// Stage of a filter in its predict/update cycle.
///
/// A filter starts uninitialized, must be reset before any prediction, and must be predicted at least
/// once after a reset before any update.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStage {
    #[default]
    Uninitialized,
    Reset,
    Predicted,
    Updated,
}

impl FilterStage {
    pub fn is_initialized(self) -> bool {
        self != Self::Uninitialized
    }

    pub fn can_update(self) -> bool {
        matches!(self, Self::Predicted | Self::Updated)
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Reset => "reset",
            Self::Predicted => "predicted",
            Self::Updated => "updated",
        };
        write!(f, "{name}")
    }
}

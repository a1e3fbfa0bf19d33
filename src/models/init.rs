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

use crate::errors::FilterError;
use crate::filter::checks::check_variance;
use serde_derive::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Initial values of the state components which cannot be estimated from the lookback positions.
///
/// The speed hint is only used when a single position is available at reset: it is then split evenly
/// between both axes, so that the initial velocity has the hinted magnitude. The angle hint is replaced
/// by the estimate from the queued directions when the object was moving.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct Init {
    #[builder(default = 0.0)]
    pub speed: f64,
    #[builder(default = 30.0_f64.powi(2))]
    pub speed_variance: f64,
    #[builder(default = 0.0)]
    pub acceleration: f64,
    #[builder(default = 10.0_f64.powi(2))]
    pub acceleration_variance: f64,
    #[builder(default = 0.0)]
    pub angle: f64,
    #[builder(default = 100.0_f64.to_radians().powi(2))]
    pub angle_variance: f64,
    #[builder(default = 0.0)]
    pub angle_speed: f64,
    #[builder(default = 1.0_f64.to_radians().powi(2))]
    pub angle_speed_variance: f64,
    #[builder(default = 0.0)]
    pub angle_r: f64,
    #[builder(default = 50.0_f64.to_radians().powi(2))]
    pub angle_r_variance: f64,
}

impl Init {
    pub fn validate(&self) -> Result<(), FilterError> {
        check_variance("initial speed", self.speed_variance)?;
        check_variance("initial acceleration", self.acceleration_variance)?;
        check_variance("initial angle", self.angle_variance)?;
        check_variance("initial angle speed", self.angle_speed_variance)?;
        check_variance("initial angle r", self.angle_r_variance)
    }
}

impl Default for Init {
    fn default() -> Self {
        Self::builder().build()
    }
}

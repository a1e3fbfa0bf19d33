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

//! Synthetic trajectories and their measurements, used to check the filters statistically.
//!
//! Every simulator is seeded: the same configuration and seed always produce the same measurements.

use crate::errors::{FilterError, InvalidParameterSnafu};
use rand_distr::Normal;
use snafu::ensure;

mod trajectory;
pub use trajectory::{Simulator, SimulatorConfig};

mod speed;
pub use speed::{SpeedSimulator, SpeedSimulatorConfig};

mod batch;
pub use batch::{run_batch, ScenarioConfig, ScenarioData, ScenarioReport};

pub use rand_pcg::Pcg64Mcg;

/// Zero mean normal distribution of the provided variance.
pub(crate) fn white_noise(what: &'static str, variance: f64) -> Result<Normal<f64>, FilterError> {
    ensure!(
        variance.is_finite() && variance >= 0.0,
        InvalidParameterSnafu {
            param: what,
            value: variance
        }
    );
    Normal::new(0.0, variance.sqrt()).map_err(|_| FilterError::InvalidParameter {
        param: what,
        value: variance,
    })
}

/// Checks that a measurement cadence is at least one step.
pub(crate) fn check_cadence(what: &'static str, count: usize) -> Result<(), FilterError> {
    ensure!(
        count > 0,
        InvalidParameterSnafu {
            param: what,
            value: count as f64
        }
    );
    Ok(())
}

#[cfg(test)]
mod ut_simulator {
    use super::*;
    use rand::Rng;

    #[test]
    fn white_noise_sigma() {
        let mut rng = Pcg64Mcg::new(1000);
        let noise = white_noise("test", 4.0).unwrap();
        let n = 20_000;
        let mut sum = 0.0;
        let mut sum2 = 0.0;
        for _ in 0..n {
            let x = rng.sample(noise);
            sum += x;
            sum2 += x * x;
        }
        let mean = sum / n as f64;
        let variance = sum2 / n as f64 - mean * mean;
        assert!(mean.abs() < 0.1);
        assert!((variance - 4.0).abs() < 0.2);

        assert!(white_noise("test", -1.0).is_err());
        assert!(white_noise("test", f64::NAN).is_err());
        assert!(white_noise("test", 0.0).is_ok());
        assert!(check_cadence("position", 0).is_err());
    }
}

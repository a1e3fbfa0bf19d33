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

use super::checks::check_variance;
use crate::errors::{FilterError, InvalidParameterSnafu, NonPositiveDefiniteSnafu};
use crate::linalg::{SMatrix, SVector};
use serde_derive::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::fmt;

/// Probability of the two sided interval in which the mean of a consistent filter must lie.
pub const CONSISTENCY_PROBABILITY: f64 = 0.999;

/// Accumulator of normalized squared values (NEES or NIS).
///
/// If the filter is consistent, each value is chi-squared distributed with as many degrees of freedom as
/// the dimension of the error, so the sum of all values is chi-squared distributed with the sum of the
/// degrees of freedom.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSquared {
    count: usize,
    sum: f64,
    dof_sum: usize,
}

impl NormalizedSquared {
    /// Adds e^T C^-1 e, with as many degrees of freedom as the dimension of the error.
    pub fn add<const M: usize>(
        &mut self,
        error: &SVector<f64, M>,
        covariance: &SMatrix<f64, M, M>,
    ) -> Result<(), FilterError> {
        let chol = covariance.cholesky().context(NonPositiveDefiniteSnafu {
            action: "normalized squared covariance",
        })?;
        let value = error.dot(&chol.solve(error));
        self.add_dof(value, M)
    }

    /// Adds e^2 / variance, with one degree of freedom.
    pub fn add_1(&mut self, error: f64, variance: f64) -> Result<(), FilterError> {
        check_variance("normalized squared", variance)?;
        self.add_dof(error * error / variance, 1)
    }

    /// Adds an already normalized value.
    pub fn add_dof(&mut self, value: f64, dof: usize) -> Result<(), FilterError> {
        ensure!(
            value.is_finite() && value >= 0.0 && dof > 0,
            InvalidParameterSnafu {
                param: "normalized squared value",
                value
            }
        );
        self.count += 1;
        self.sum += value;
        self.dof_sum += dof;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean of the accumulated values, None if nothing was accumulated.
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    /// Mean degrees of freedom, i.e. the expected mean of a consistent filter.
    pub fn expected_mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.dof_sum as f64 / self.count as f64)
        }
    }

    /// Interval of the mean of a consistent filter, of probability [`CONSISTENCY_PROBABILITY`].
    pub fn interval(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let distribution = ChiSquared::new(self.dof_sum as f64).ok()?;
        let tail = (1.0 - CONSISTENCY_PROBABILITY) / 2.0;
        let count = self.count as f64;
        Some((
            distribution.inverse_cdf(tail) / count,
            distribution.inverse_cdf(1.0 - tail) / count,
        ))
    }

    /// Returns whether the mean lies inside the consistency interval, None if nothing was accumulated.
    pub fn is_consistent(&self) -> Option<bool> {
        let mean = self.mean()?;
        let (lower, upper) = self.interval()?;
        Some(lower <= mean && mean <= upper)
    }

    pub fn check_string(&self) -> String {
        format!("{self}")
    }
}

impl fmt::Display for NormalizedSquared {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.mean(), self.expected_mean(), self.interval()) {
            (Some(mean), Some(expected), Some((lower, upper))) => {
                let verdict = if lower <= mean && mean <= upper {
                    "pass"
                } else {
                    "fail"
                };
                write!(
                    f,
                    "count = {}; mean = {mean:.4}; expected = {expected:.4} in [{lower:.4}, {upper:.4}]; {verdict}",
                    self.count
                )
            }
            _ => write!(f, "no data"),
        }
    }
}

/// NEES of the position and of the speed, and NIS of the updates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Consistency {
    pub nees_position: NormalizedSquared,
    pub nees_speed: NormalizedSquared,
    pub nis: NormalizedSquared,
}

impl Consistency {
    /// Joins the check strings of the non empty accumulators.
    pub fn check_string(&self, name: &str) -> String {
        [
            ("NEES position", &self.nees_position),
            ("NEES speed", &self.nees_speed),
            ("NIS", &self.nis),
        ]
        .iter()
        .filter(|(_, ns)| !ns.is_empty())
        .map(|(what, ns)| format!("{name}; {what}; {}", ns.check_string()))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[cfg(test)]
mod ut_consistency {
    use super::*;
    use crate::linalg::{Matrix2, Vector2};
    use approx::assert_abs_diff_eq;

    #[test]
    fn accumulate() {
        let mut ns = NormalizedSquared::default();
        assert!(ns.mean().is_none());
        assert_eq!(ns.check_string(), "no data");

        ns.add(&Vector2::new(1.0, 2.0), &Matrix2::new(1.0, 0.0, 0.0, 4.0))
            .unwrap();
        ns.add_1(3.0, 9.0).unwrap();
        assert_eq!(ns.count(), 2);
        assert_abs_diff_eq!(ns.mean().unwrap(), 1.5);
        assert_abs_diff_eq!(ns.expected_mean().unwrap(), 1.5);
        assert_eq!(ns.is_consistent(), Some(true));
        assert!(ns.check_string().ends_with("pass"));

        assert!(ns.add_1(1.0, 0.0).is_err());
        assert!(ns
            .add(&Vector2::new(1.0, 0.0), &-Matrix2::identity())
            .is_err());
        assert_eq!(ns.count(), 2);
    }

    #[test]
    fn interval_bounds() {
        let mut ns = NormalizedSquared::default();
        for _ in 0..1000 {
            ns.add_dof(2.0, 2).unwrap();
        }
        let (lower, upper) = ns.interval().unwrap();
        assert!(lower < 2.0 && 2.0 < upper);
        // The interval of the mean shrinks as 1/sqrt(count) around the degrees of freedom
        assert!(upper - lower < 0.5);

        let mut biased = NormalizedSquared::default();
        for _ in 0..1000 {
            biased.add_dof(4.0, 2).unwrap();
        }
        assert_eq!(biased.is_consistent(), Some(false));
        assert!(biased.check_string().ends_with("fail"));
    }

    #[test]
    fn grouped() {
        let mut consistency = Consistency::default();
        assert!(consistency.check_string("filter").is_empty());
        consistency.nis.add_dof(1.0, 1).unwrap();
        let s = consistency.check_string("filter");
        assert!(s.starts_with("filter; NIS; count = 1"));
        assert_eq!(s.lines().count(), 1);
    }
}

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
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// An angle in radians, always stored in (-pi, pi].
///
/// Every arithmetic operation renormalizes the result, so an angle computed as a sum or a difference
/// of other angles never leaves the canonical range.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Self = Self(0.0);

    /// Builds a wrapped angle from any finite value in radians.
    pub fn from_radians(radians: f64) -> Self {
        Self(wrap(radians))
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self::from_radians(degrees.to_radians())
    }

    /// Angle of the vector (x, y) from the x axis.
    pub fn of_vector(x: f64, y: f64) -> Self {
        Self::from_radians(y.atan2(x))
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn degrees(self) -> f64 {
        self.0.to_degrees()
    }

    /// Returns the real value equivalent to this angle which is closest to `reference`.
    ///
    /// The result is not wrapped: it lies in [reference - pi, reference + pi].
    pub fn unwrap_around(self, reference: f64) -> f64 {
        reference + (self - Self::from_radians(reference)).radians()
    }
}

/// Wraps a value in radians into (-pi, pi].
pub(crate) fn wrap(radians: f64) -> f64 {
    if radians > -PI && radians <= PI {
        return radians;
    }
    let wrapped = radians - TAU * ((radians + PI) / TAU).floor();
    // floor places the value in [-pi, pi), the lower bound belongs to the upper end
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

impl From<f64> for Angle {
    fn from(radians: f64) -> Self {
        Self::from_radians(radians)
    }
}

impl From<Angle> for f64 {
    fn from(angle: Angle) -> Self {
        angle.0
    }
}

impl Add for Angle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_radians(self.0 + rhs.0)
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Angle {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_radians(self.0 - rhs.0)
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Angle {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_radians(-self.0)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.*} deg", p, self.degrees()),
            None => write!(f, "{} deg", self.degrees()),
        }
    }
}

#[cfg(test)]
mod ut_angle {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn wrap_range() {
        for k in -20..=20 {
            let raw = 0.37 * f64::from(k);
            let a = Angle::from_radians(raw);
            assert!(a.radians() > -PI && a.radians() <= PI, "{raw} -> {a}");
            assert_abs_diff_eq!(a.radians().sin(), raw.sin(), epsilon = 1e-12);
            assert_abs_diff_eq!(a.radians().cos(), raw.cos(), epsilon = 1e-12);
        }
        assert_eq!(Angle::from_radians(PI).radians(), PI);
        assert_eq!(Angle::from_radians(-PI).radians(), PI);
        assert_abs_diff_eq!(Angle::from_radians(3.0 * PI).radians(), PI, epsilon = 1e-12);
    }

    #[test]
    fn seam_arithmetic() {
        let a = Angle::from_radians(PI - 0.01);
        let b = Angle::from_radians(-PI + 0.01);
        // Crossing the seam must be a small step, not a full turn
        assert_abs_diff_eq!((b - a).radians(), 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!((a - b).radians(), -0.02, epsilon = 1e-12);
        let mut c = a;
        c += Angle::from_radians(0.02);
        assert_abs_diff_eq!(c.radians(), -PI + 0.01, epsilon = 1e-12);
        c -= Angle::from_radians(0.02);
        assert_abs_diff_eq!(c.radians(), PI - 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!((-a).radians(), -PI + 0.01, epsilon = 1e-12);
    }

    #[test]
    fn unwrap_near_reference() {
        let a = Angle::from_radians(-PI + 0.1);
        assert_abs_diff_eq!(a.unwrap_around(PI), PI + 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(a.unwrap_around(0.0), -PI + 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(Angle::of_vector(0.0, 1.0).degrees(), 90.0, epsilon = 1e-12);
    }
}

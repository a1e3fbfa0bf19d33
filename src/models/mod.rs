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

use crate::angle::Angle;
use crate::errors::{FilterError, NoiseNotConfiguredSnafu, UnsupportedDimensionSnafu};
use crate::filter::checks::check_dt;
use crate::filter::{kinematic_transition, StateSpace};
use crate::fusion::LinearFit;
use crate::linalg::{Matrix2, SMatrix, SVector, Vector2};
use crate::utils::rotate;
use snafu::OptionExt;
use std::fmt;

mod channel;
pub use channel::{Channel, ChannelSet};

mod init;
pub use init::Init;

mod layout;
pub use layout::{Block, BlockKind, Layout};

mod noise;
pub use noise::{NoiseModel, ProcessNoise};

mod acceleration;
mod direction;
mod position;
mod speed;
pub use acceleration::{Acceleration0, Acceleration1};
pub use direction::{Direction10, Direction11, Direction21};
pub use position::{Position0, Position1, Position2};
pub use speed::{Speed1, Speed2};

/// A kinematic model of dimension N: the layout of its state and the channels it observes.
///
/// The process function, the process noise, the measurement functions and their Jacobians are all
/// derived from the layout, so a model is fully defined by its associated constants.
pub trait MotionModel<const N: usize>:
    Copy + Clone + fmt::Debug + Default + Send + Sync + 'static
{
    const NAME: &'static str;
    const LAYOUT: Layout;
    /// Indexes of the angle components, must match the layout.
    const ANGLES: &'static [usize];
    /// Primary channels this model can be updated with.
    const CHANNELS: &'static [Channel];

    fn space() -> StateSpace<N> {
        StateSpace::with_angles(Self::ANGLES)
    }

    /// Returns whether this model can be updated with the provided channel.
    fn observes(channel: Channel) -> bool {
        match channel {
            Channel::Velocity => Self::LAYOUT.vx().is_some(),
            _ => Self::CHANNELS.contains(&channel),
        }
    }

    /// Block diagonal kinematic transition over `dt`.
    fn transition(dt: f64) -> Result<SMatrix<f64, N, N>, FilterError> {
        let mut f = SMatrix::<f64, N, N>::zeros();
        for block in Self::LAYOUT.blocks() {
            let s = block.start;
            match block.len {
                1 => f
                    .fixed_view_mut::<1, 1>(s, s)
                    .copy_from(&kinematic_transition::<1>(dt)),
                2 => f
                    .fixed_view_mut::<2, 2>(s, s)
                    .copy_from(&kinematic_transition::<2>(dt)),
                3 => f
                    .fixed_view_mut::<3, 3>(s, s)
                    .copy_from(&kinematic_transition::<3>(dt)),
                len => return UnsupportedDimensionSnafu { dim: len }.fail(),
            }
        }
        Ok(f)
    }

    /// Process function, from the transition over the time step.
    fn f(transition: &SMatrix<f64, N, N>, x: &SVector<f64, N>) -> SVector<f64, N> {
        Self::space().normalize(transition * x)
    }

    /// Block diagonal process noise over `dt`.
    fn q(dt: f64, noise: &ProcessNoise) -> Result<SMatrix<f64, N, N>, FilterError> {
        check_dt(dt)?;
        let mut q = SMatrix::<f64, N, N>::zeros();
        for block in Self::LAYOUT.blocks() {
            let model = match block.kind {
                BlockKind::Position => Some(noise.position),
                BlockKind::Angle => noise.angle,
                BlockKind::AngleR => noise.angle_r,
            }
            .context(NoiseNotConfiguredSnafu {
                kind: block.kind.name(),
            })?;
            model.validate()?;
            model.place(&mut q, block.start, block.len, dt)?;
        }
        Ok(q)
    }

    /// Predicted value of the provided channel; only the first `channel.dimension()` values are set.
    ///
    /// The direction is unwrapped around `reference`, the measured direction, so that the weighted
    /// mean of predicted directions does not straddle the seam.
    fn measure(x: &SVector<f64, N>, channel: Channel, reference: &[f64; 2]) -> [f64; 2] {
        match channel {
            Channel::Position => {
                let p = Self::position(x);
                [p.x, p.y]
            }
            Channel::Speed => [Self::speed(x).unwrap_or(0.0), 0.0],
            Channel::Direction => {
                let v = Self::velocity(x).unwrap_or_else(Vector2::zeros);
                let mut direction = Angle::of_vector(v.x, v.y);
                if let Some(angle) = Self::angle(x) {
                    direction += Angle::from_radians(angle);
                }
                if let Some(angle_r) = Self::angle_r(x) {
                    direction += Angle::from_radians(angle_r);
                }
                [direction.unwrap_around(reference[0]), 0.0]
            }
            Channel::Acceleration => {
                let a = Self::acceleration(x).unwrap_or_else(Vector2::zeros);
                let a = rotate(&a, Self::angle(x).unwrap_or(0.0));
                [a.x, a.y]
            }
            Channel::Velocity => {
                let v = Self::velocity(x).unwrap_or_else(Vector2::zeros);
                [v.x, v.y]
            }
        }
    }

    /// Jacobian of [`Self::measure`], only the first `channel.dimension()` rows are set.
    fn measure_jacobian(x: &SVector<f64, N>, channel: Channel) -> SMatrix<f64, 2, N> {
        let l = Self::LAYOUT;
        let mut h = SMatrix::<f64, 2, N>::zeros();
        let v = Self::velocity(x).unwrap_or_else(Vector2::zeros);
        match channel {
            Channel::Position => {
                h[(0, l.px())] = 1.0;
                h[(1, l.py())] = 1.0;
            }
            Channel::Speed => {
                let speed = v.norm();
                if let (Some(vx), Some(vy)) = (l.vx(), l.vy()) {
                    if speed > 0.0 {
                        h[(0, vx)] = v.x / speed;
                        h[(0, vy)] = v.y / speed;
                    }
                }
            }
            Channel::Direction => {
                let speed2 = v.norm_squared();
                if let (Some(vx), Some(vy)) = (l.vx(), l.vy()) {
                    if speed2 > 0.0 {
                        h[(0, vx)] = -v.y / speed2;
                        h[(0, vy)] = v.x / speed2;
                    }
                }
                for i in l.angle().into_iter().chain(l.angle_r()) {
                    h[(0, i)] = 1.0;
                }
            }
            Channel::Acceleration => {
                if let (Some(ax), Some(ay)) = (l.ax(), l.ay()) {
                    let angle = Self::angle(x).unwrap_or(0.0);
                    let (sin, cos) = angle.sin_cos();
                    h[(0, ax)] = cos;
                    h[(0, ay)] = -sin;
                    h[(1, ax)] = sin;
                    h[(1, ay)] = cos;
                    if let Some(i) = l.angle() {
                        let (a_x, a_y) = (x[ax], x[ay]);
                        h[(0, i)] = -a_x * sin - a_y * cos;
                        h[(1, i)] = a_x * cos - a_y * sin;
                    }
                }
            }
            Channel::Velocity => {
                if let (Some(vx), Some(vy)) = (l.vx(), l.vy()) {
                    h[(0, vx)] = 1.0;
                    h[(1, vy)] = 1.0;
                }
            }
        }
        h
    }

    /// Initial state and covariance from the linear fit of the lookback positions and the hints.
    fn initial_state(fit: &LinearFit, init: &Init) -> (SVector<f64, N>, SMatrix<f64, N, N>) {
        let l = Self::LAYOUT;
        let mut x = SVector::<f64, N>::zeros();
        let mut p = SMatrix::<f64, N, N>::zeros();

        // The fit is ordered as [px, vx, py, vy]
        let fitted = [
            (fit.position.x, Some(l.px())),
            (fit.velocity.x, l.vx()),
            (fit.position.y, Some(l.py())),
            (fit.velocity.y, l.vy()),
        ];
        for (r, (value, row)) in fitted.iter().enumerate() {
            let Some(row) = *row else { continue };
            x[row] = *value;
            for (c, (_, col)) in fitted.iter().enumerate() {
                if let Some(col) = *col {
                    p[(row, col)] = fit.covariance[(r, c)];
                }
            }
        }

        // The sensor angle estimated from the queued directions takes precedence over the hint
        let (angle, angle_variance) = fit
            .angle
            .map_or((init.angle, init.angle_variance), |a| (a.value, a.variance));
        let hints = [
            (l.ax(), init.acceleration, init.acceleration_variance),
            (l.ay(), init.acceleration, init.acceleration_variance),
            (l.angle(), angle, angle_variance),
            (l.angle_speed(), init.angle_speed, init.angle_speed_variance),
            (l.angle_r(), init.angle_r, init.angle_r_variance),
        ];
        for (index, value, variance) in hints {
            if let Some(i) = index {
                x[i] = value;
                p[(i, i)] = variance;
            }
        }

        (Self::space().normalize(x), p)
    }

    fn position(x: &SVector<f64, N>) -> Vector2<f64> {
        Vector2::new(x[Self::LAYOUT.px()], x[Self::LAYOUT.py()])
    }

    fn position_p(p: &SMatrix<f64, N, N>) -> Matrix2<f64> {
        let (i, j) = (Self::LAYOUT.px(), Self::LAYOUT.py());
        Matrix2::new(p[(i, i)], p[(i, j)], p[(j, i)], p[(j, j)])
    }

    fn velocity(x: &SVector<f64, N>) -> Option<Vector2<f64>> {
        match (Self::LAYOUT.vx(), Self::LAYOUT.vy()) {
            (Some(i), Some(j)) => Some(Vector2::new(x[i], x[j])),
            _ => None,
        }
    }

    fn velocity_p(p: &SMatrix<f64, N, N>) -> Option<Matrix2<f64>> {
        match (Self::LAYOUT.vx(), Self::LAYOUT.vy()) {
            (Some(i), Some(j)) => Some(Matrix2::new(p[(i, i)], p[(i, j)], p[(j, i)], p[(j, j)])),
            _ => None,
        }
    }

    fn speed(x: &SVector<f64, N>) -> Option<f64> {
        Self::velocity(x).map(|v| v.norm())
    }

    /// Variance of the speed, from the velocity covariance projected on the direction of motion.
    fn speed_p(x: &SVector<f64, N>, p: &SMatrix<f64, N, N>) -> Option<f64> {
        let v = Self::velocity(x)?;
        let pv = Self::velocity_p(p)?;
        let speed = v.norm();
        if speed > 0.0 {
            let j = v / speed;
            Some(j.dot(&(pv * j)))
        } else {
            Some(pv.trace() / 2.0)
        }
    }

    fn acceleration(x: &SVector<f64, N>) -> Option<Vector2<f64>> {
        match (Self::LAYOUT.ax(), Self::LAYOUT.ay()) {
            (Some(i), Some(j)) => Some(Vector2::new(x[i], x[j])),
            _ => None,
        }
    }

    fn angle(x: &SVector<f64, N>) -> Option<f64> {
        Self::LAYOUT.angle().map(|i| x[i])
    }

    fn angle_speed(x: &SVector<f64, N>) -> Option<f64> {
        Self::LAYOUT.angle_speed().map(|i| x[i])
    }

    fn angle_r(x: &SVector<f64, N>) -> Option<f64> {
        Self::LAYOUT.angle_r().map(|i| x[i])
    }
}

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

use super::{Measurement, Measurements};
use crate::angle::Angle;
use crate::errors::{FilterError, InvalidParameterSnafu, SingularFitSnafu};
use crate::filter::checks::{check_variance, check_variances};
use crate::linalg::{Matrix2, Matrix4, Vector2, Vector4};
use crate::models::Init;
use crate::time::{Duration, Epoch};
use snafu::{ensure, OptionExt};
use std::collections::VecDeque;
use std::f64::consts::FRAC_1_SQRT_2;

/// Fitted speed below which the heading is too uncertain to estimate the sensor angle.
pub const ANGLE_ESTIMATION_SPEED: f64 = 1.0;

/// Sensor angle estimated from the measured directions and the fitted heading.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AngleEstimate {
    pub value: f64,
    pub variance: f64,
}

/// Position and velocity at the epoch of a queued bundle, from a weighted least squares line fit of each
/// axis over the positions queued up to that bundle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearFit {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
    /// Covariance of [px, vx, py, vy]
    pub covariance: Matrix4<f64>,
    /// Sensor angle, if directions were measured while moving
    pub angle: Option<AngleEstimate>,
}

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    measurements: Measurements,
    position: Measurement<2>,
    /// Fit available when this bundle was queued
    fit: LinearFit,
}

/// Lookback buffer of the most recent bundles with a usable position, used to reset a filter.
///
/// Each bundle is queued with the linear fit of the positions known at its epoch. A reset starts from
/// the fit of the oldest bundle and replays the following ones, so no position is used twice.
///
/// Consecutive entries are always less than `reset_dt` apart: an older history is discarded when a
/// position arrives after a longer gap.
#[derive(Clone, Debug)]
pub struct MeasurementQueue {
    size: usize,
    reset_dt: Duration,
    angle_estimation_variance: f64,
    entries: VecDeque<Entry>,
}

impl MeasurementQueue {
    pub fn new(
        size: usize,
        reset_dt: Duration,
        angle_estimation_variance: f64,
    ) -> Result<Self, FilterError> {
        ensure!(
            size > 0,
            InvalidParameterSnafu {
                param: "measurement queue size",
                value: size as f64
            }
        );
        ensure!(
            reset_dt.to_seconds() > 0.0,
            InvalidParameterSnafu {
                param: "reset dt (s)",
                value: reset_dt.to_seconds()
            }
        );
        check_variance("angle estimation", angle_estimation_variance)?;
        Ok(Self {
            size,
            reset_dt,
            angle_estimation_variance,
            entries: VecDeque::with_capacity(size + 1),
        })
    }

    /// Queues a bundle with its fit. Bundles without a usable position are not queued.
    pub fn push(&mut self, m: &Measurements, init: &Init) -> Result<(), FilterError> {
        let Some(position) = m.usable_position() else {
            return Ok(());
        };
        check_variances("position", &position.variance)?;
        if let Some(last) = self.entries.back() {
            let gap = m.epoch - last.measurements.epoch;
            if gap >= self.reset_dt {
                debug!("clearing {} queued bundles, gap of {gap}", self.entries.len());
                self.entries.clear();
            }
        }

        let history = self
            .entries
            .iter()
            .map(|e| (e.measurements.epoch, e.position, e.measurements.direction));
        let current = (m.epoch, position, m.direction);
        let fit = self.fit(history.chain(std::iter::once(current)), m.epoch, init)?;

        self.entries.push_back(Entry {
            measurements: m.clone(),
            position,
            fit,
        });
        while self.entries.len() > self.size {
            self.entries.pop_front();
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn last_epoch(&self) -> Option<Epoch> {
        self.entries.back().map(|e| e.measurements.epoch)
    }

    /// Epoch and fit of the oldest queued bundle, from which a reset starts.
    pub fn first(&self) -> Option<(Epoch, &LinearFit)> {
        self.entries
            .front()
            .map(|e| (e.measurements.epoch, &e.fit))
    }

    /// Bundles queued after the oldest one, in time order, to be replayed after a reset.
    pub fn replay(&self) -> impl Iterator<Item = &Measurements> {
        self.entries.iter().skip(1).map(|e| &e.measurements)
    }

    /// Fits a line on each axis and evaluates it at `epoch`.
    ///
    /// With a single position, the velocity comes from the speed hint of `init`, with no preferred
    /// direction.
    fn fit<I>(&self, positions: I, epoch: Epoch, init: &Init) -> Result<LinearFit, FilterError>
    where
        I: Iterator<Item = (Epoch, Measurement<2>, Option<Measurement<1>>)> + Clone,
    {
        let count = positions.clone().count();
        let (_, last, _) = positions.clone().last().context(SingularFitSnafu)?;

        if count == 1 {
            let v = last.variance;
            let speed = init.speed * FRAC_1_SQRT_2;
            return Ok(LinearFit {
                position: last.value,
                velocity: Vector2::new(speed, speed),
                covariance: Matrix4::from_diagonal(&Vector4::new(
                    v.x,
                    init.speed_variance,
                    v.y,
                    init.speed_variance,
                )),
                angle: None,
            });
        }

        let mut position = Vector2::zeros();
        let mut velocity = Vector2::zeros();
        let mut covariance = Matrix4::zeros();
        for axis in 0..2 {
            // Normal equations of p(t) = p0 + v (t - epoch), weighted by the inverse variances
            let mut normal = Matrix2::<f64>::zeros();
            let mut rhs = Vector2::<f64>::zeros();
            for (t, m, _) in positions.clone() {
                let tau = (t - epoch).to_seconds();
                let w = 1.0 / m.variance[axis];
                let p = m.value[axis];
                normal += w * Matrix2::new(1.0, tau, tau, tau * tau);
                rhs += w * Vector2::new(p, tau * p);
            }
            let cov = normal.try_inverse().context(SingularFitSnafu)?;
            ensure!(cov[(0, 0)] > 0.0 && cov[(1, 1)] > 0.0, SingularFitSnafu);
            let solution = cov * rhs;
            position[axis] = solution[0];
            velocity[axis] = solution[1];
            covariance
                .fixed_view_mut::<2, 2>(2 * axis, 2 * axis)
                .copy_from(&cov);
        }

        let angle = self.estimate_angle(positions.filter_map(|(_, _, d)| d), &velocity);

        Ok(LinearFit {
            position,
            velocity,
            covariance,
            angle,
        })
    }

    /// Circular mean of the differences between the measured directions and the fitted heading.
    fn estimate_angle<I>(&self, directions: I, velocity: &Vector2<f64>) -> Option<AngleEstimate>
    where
        I: Iterator<Item = Measurement<1>>,
    {
        if velocity.norm() < ANGLE_ESTIMATION_SPEED {
            return None;
        }
        let heading = Angle::of_vector(velocity.x, velocity.y);
        let (sin, cos, count) = directions.fold((0.0, 0.0, 0), |(sin, cos, count), d| {
            let (s, c) = (Angle::from_radians(d.value[0]) - heading).radians().sin_cos();
            (sin + s, cos + c, count + 1)
        });
        if count == 0 {
            return None;
        }
        Some(AngleEstimate {
            value: Angle::of_vector(cos, sin).radians(),
            variance: self.angle_estimation_variance,
        })
    }
}

#[cfg(test)]
mod ut_queue {
    use super::*;
    use crate::time::TimeUnits;
    use approx::assert_abs_diff_eq;

    fn start() -> Epoch {
        Epoch::from_gregorian_tai_at_midnight(2024, 1, 1)
    }

    fn bundle(t: f64, x: f64, y: f64, variance: f64) -> Measurements {
        Measurements::new(start() + t.seconds())
            .with_position(Vector2::new(x, y), Some(Vector2::new(variance, variance)))
    }

    fn queue(size: usize) -> MeasurementQueue {
        MeasurementQueue::new(size, 10.seconds(), 20_f64.to_radians().powi(2)).unwrap()
    }

    #[test]
    fn exact_line() {
        let mut queue = queue(4);
        for k in 0..6 {
            let t = f64::from(k);
            queue
                .push(&bundle(t, 1.0 + 2.0 * t, 5.0 - t, 0.25), &Init::default())
                .unwrap();
        }
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.replay().count(), 3);

        // The oldest bundle (t = 2) carries the fit of the positions t = 0, 1, 2
        let (epoch, fit) = queue.first().unwrap();
        assert_eq!(epoch, start() + 2.seconds());
        assert_abs_diff_eq!(fit.position, Vector2::new(5.0, 3.0), epsilon = 1e-9);
        assert_abs_diff_eq!(fit.velocity, Vector2::new(2.0, -1.0), epsilon = 1e-9);
        assert!(fit.angle.is_none());

        // Closed form of the WLS covariance with taus -2, -1, 0 and equal weights
        let w = 4.0;
        let normal: Matrix2<f64> = w * Matrix2::new(3.0, -3.0, -3.0, 5.0);
        let expected = normal.try_inverse().unwrap();
        assert_abs_diff_eq!(
            fit.covariance.fixed_view::<2, 2>(0, 0).into_owned(),
            expected,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            fit.covariance.fixed_view::<2, 2>(2, 2).into_owned(),
            expected,
            epsilon = 1e-12
        );
        assert_eq!(fit.covariance[(0, 2)], 0.0);
    }

    #[test]
    fn cleared_on_gap() {
        let mut queue = queue(3);
        queue.push(&bundle(0.0, 0.0, 0.0, 1.0), &Init::default()).unwrap();
        queue.push(&bundle(1.0, 1.0, 0.0, 1.0), &Init::default()).unwrap();
        assert_eq!(queue.len(), 2);
        // A gap of exactly reset_dt clears the history
        queue.push(&bundle(11.0, 2.0, 0.0, 1.0), &Init::default()).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.last_epoch(), Some(start() + 11.seconds()));
        assert_eq!(queue.replay().count(), 0);
    }

    #[test]
    fn single_position() {
        let mut queue = queue(1);
        let init = Init::builder().speed(2.0).speed_variance(9.0).build();
        queue.push(&bundle(0.0, 3.0, 4.0, 2.0), &init).unwrap();
        let (_, fit) = queue.first().unwrap();
        assert_eq!(fit.position, Vector2::new(3.0, 4.0));
        assert_abs_diff_eq!(fit.velocity.norm(), 2.0, epsilon = 1e-12);
        assert_eq!(fit.covariance.diagonal(), Vector4::new(2.0, 9.0, 2.0, 9.0));
    }

    #[test]
    fn angle_from_directions() {
        let mut queue = queue(5);
        let angle = 0.3;
        // Heading north west, across the seam of the measured direction
        let heading = Angle::of_vector(-10.0, 1.0).radians();
        for k in 0..5 {
            let t = f64::from(k);
            let direction = (Angle::from_radians(heading) + Angle::from_radians(angle)).radians();
            let m = bundle(t, -10.0 * t, t, 1e-4).with_direction(direction, 0.01);
            queue.push(&m, &Init::default()).unwrap();
        }
        let estimate = queue.entries.back().unwrap().fit.angle.unwrap();
        assert_abs_diff_eq!(estimate.value, angle, epsilon = 1e-6);
        assert_abs_diff_eq!(estimate.variance, 20_f64.to_radians().powi(2));

    }

    #[test]
    fn no_angle_when_still() {
        let mut queue = queue(3);
        for k in 0..3 {
            let m = bundle(f64::from(k), 1.0, 1.0, 1.0).with_direction(0.5, 0.01);
            queue.push(&m, &Init::default()).unwrap();
        }
        assert!(queue.entries.back().unwrap().fit.angle.is_none());
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn invalid() {
        assert!(MeasurementQueue::new(0, 10.seconds(), 1.0).is_err());
        assert!(MeasurementQueue::new(3, 10.seconds(), 0.0).is_err());
        let mut queue = queue(3);
        assert!(queue.first().is_none());
        assert!(queue.push(&bundle(0.0, 0.0, 0.0, 0.0), &Init::default()).is_err());
        // Positions without a variance are not queued
        let unknown = Measurements::new(start()).with_position(Vector2::zeros(), None);
        queue.push(&unknown, &Init::default()).unwrap();
        assert!(queue.is_empty());
    }
}

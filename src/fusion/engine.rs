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

use super::{LinearFit, Reading};
use crate::angle::Angle;
use crate::errors::{FilterError, UnsupportedDimensionSnafu};
use crate::filter::checks::check_variance;
use crate::filter::{Ekf, FilterStage, SigmaPoints, Ukf, UpdateInfo};
use crate::linalg::{Matrix2, SMatrix, SVector, Vector2};
use crate::models::{Channel, ChannelSet, Init, MotionModel, ProcessNoise};
use std::fmt;
use std::marker::PhantomData;

const NORMALIZED_INNOVATION: bool = true;
const LIKELIHOOD: bool = false;

/// Outcome of a stacked update, independent of the measurement dimension.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UpdateOutcome {
    /// Primary channels of the update, None for a velocity pseudo-measurement
    pub channels: Option<ChannelSet>,
    pub gated: bool,
    /// Normalized innovation squared
    pub nis: Option<f64>,
    /// Degrees of freedom of the NIS, i.e. the stacked measurement dimension
    pub dof: usize,
}

impl UpdateOutcome {
    pub fn includes(&self, channel: Channel) -> bool {
        self.channels.map_or(false, |set| set.contains(channel))
    }
}

/// A filter of a given motion model, driven by a tracker.
///
/// This hides the state dimension and the engine (UKF or EKF) from the tracker: the tracker only feeds
/// lookback fits, time steps and readings, and reads back the kinematic quantities.
pub trait KinematicFilter: Send {
    fn name(&self) -> String;

    /// Whether this filter can be updated with the provided channel.
    fn observes(&self, channel: Channel) -> bool;

    fn stage(&self) -> FilterStage;

    /// Initializes the filter from a linear fit of the lookback positions and the initial hints.
    fn reset(&mut self, fit: &LinearFit, init: &Init) -> Result<(), FilterError>;

    /// Propagates the filter by `dt` seconds.
    fn predict(
        &mut self,
        dt: f64,
        noise: &ProcessNoise,
        fading_memory_alpha: f64,
    ) -> Result<(), FilterError>;

    /// Runs a single update with all the provided readings stacked in order.
    ///
    /// Readings of channels this filter does not observe are ignored. Returns None if no reading is left.
    fn update(
        &mut self,
        readings: &[Reading],
        gate: Option<f64>,
    ) -> Result<Option<UpdateOutcome>, FilterError>;

    fn position(&self) -> Vector2<f64>;

    fn position_p(&self) -> Matrix2<f64>;

    fn velocity(&self) -> Option<Vector2<f64>>;

    fn speed(&self) -> Option<f64>;

    fn speed_p(&self) -> Option<f64>;

    fn angle(&self) -> Option<f64>;

    fn angle_speed(&self) -> Option<f64>;

    fn angle_r(&self) -> Option<f64>;
}

/// Stacks the values of the readings, and their variances as a diagonal covariance.
fn stack_z<const M: usize>(
    readings: &[Reading],
) -> Result<(SVector<f64, M>, SMatrix<f64, M, M>), FilterError> {
    let mut z = SVector::<f64, M>::zeros();
    let mut r = SMatrix::<f64, M, M>::zeros();
    let mut row = 0;
    for reading in readings {
        for i in 0..reading.dimension() {
            check_variance("measurement", reading.variance[i])?;
            z[row] = reading.value[i];
            r[(row, row)] = reading.variance[i];
            row += 1;
        }
    }
    Ok((z, r))
}

/// Stacked measurement function of the model.
fn stack_h<Mo, const N: usize, const M: usize>(
    x: &SVector<f64, N>,
    readings: &[Reading],
) -> SVector<f64, M>
where
    Mo: MotionModel<N>,
{
    let mut h = SVector::<f64, M>::zeros();
    let mut row = 0;
    for reading in readings {
        let values = Mo::measure(x, reading.channel, &reading.value);
        for value in values.iter().take(reading.dimension()) {
            h[row] = *value;
            row += 1;
        }
    }
    h
}

/// Stacked measurement Jacobian of the model.
fn stack_hj<Mo, const N: usize, const M: usize>(
    x: &SVector<f64, N>,
    readings: &[Reading],
) -> SMatrix<f64, M, N>
where
    Mo: MotionModel<N>,
{
    let mut hj = SMatrix::<f64, M, N>::zeros();
    let mut row = 0;
    for reading in readings {
        let rows = Mo::measure_jacobian(x, reading.channel);
        for i in 0..reading.dimension() {
            hj.set_row(row, &rows.row(i));
            row += 1;
        }
    }
    hj
}

/// Difference of two stacked measurements, wrapping the direction rows.
fn stacked_residual<const M: usize>(
    readings: &[Reading],
    a: &SVector<f64, M>,
    b: &SVector<f64, M>,
) -> SVector<f64, M> {
    let mut residual = a - b;
    let mut row = 0;
    for reading in readings {
        if reading.channel.is_angle() {
            residual[row] = Angle::from_radians(residual[row]).radians();
        }
        row += reading.dimension();
    }
    residual
}

fn outcome<const M: usize>(readings: &[Reading], info: &UpdateInfo<M>) -> UpdateOutcome {
    let channels = readings.iter().map(|r| r.channel).collect::<Vec<_>>();
    UpdateOutcome {
        channels: ChannelSet::from_channels(&channels),
        gated: info.gated,
        nis: info.normalized_innovation_squared,
        dof: UpdateInfo::<M>::DOF,
    }
}

/// Keeps the observed readings and dispatches on their stacked dimension.
macro_rules! dispatch_update {
    ($self:ident, $readings:ident, $gate:ident) => {{
        let observed = $readings
            .iter()
            .filter(|r| Mo::observes(r.channel))
            .copied()
            .collect::<Vec<_>>();
        if observed.is_empty() {
            return Ok(None);
        }
        let dim = observed.iter().map(|r| r.dimension()).sum::<usize>();
        let outcome = match dim {
            1 => $self.update_stacked::<1>(&observed, $gate)?,
            2 => $self.update_stacked::<2>(&observed, $gate)?,
            3 => $self.update_stacked::<3>(&observed, $gate)?,
            4 => $self.update_stacked::<4>(&observed, $gate)?,
            5 => $self.update_stacked::<5>(&observed, $gate)?,
            6 => $self.update_stacked::<6>(&observed, $gate)?,
            _ => return UnsupportedDimensionSnafu { dim }.fail(),
        };
        if outcome.gated {
            debug!(
                "{} update gated, NIS = {:?}",
                $self.name(),
                outcome.nis
            );
        } else {
            trace!("{} NIS = {:?} ({} dof)", $self.name(), outcome.nis, outcome.dof);
        }
        Ok(Some(outcome))
    }};
}

/// Accessors shared by the engines, reading the state through the model.
macro_rules! kinematic_accessors {
    ($engine:ident) => {
        fn position(&self) -> Vector2<f64> {
            Mo::position(self.$engine.x())
        }

        fn position_p(&self) -> Matrix2<f64> {
            Mo::position_p(self.$engine.p())
        }

        fn velocity(&self) -> Option<Vector2<f64>> {
            Mo::velocity(self.$engine.x())
        }

        fn speed(&self) -> Option<f64> {
            Mo::speed(self.$engine.x())
        }

        fn speed_p(&self) -> Option<f64> {
            Mo::speed_p(self.$engine.x(), self.$engine.p())
        }

        fn angle(&self) -> Option<f64> {
            Mo::angle(self.$engine.x())
        }

        fn angle_speed(&self) -> Option<f64> {
            Mo::angle_speed(self.$engine.x())
        }

        fn angle_r(&self) -> Option<f64> {
            Mo::angle_r(self.$engine.x())
        }
    };
}

/// A motion model estimated with an unscented Kalman filter.
#[derive(Clone, Debug)]
pub struct UkfFilter<Mo, const N: usize>
where
    Mo: MotionModel<N>,
{
    ukf: Ukf<N>,
    _model: PhantomData<Mo>,
}

impl<Mo, const N: usize> UkfFilter<Mo, N>
where
    Mo: MotionModel<N>,
{
    pub fn new(sigma_points_alpha: f64) -> Result<Self, FilterError> {
        Ok(Self {
            ukf: Ukf::new(SigmaPoints::new(sigma_points_alpha)?, Mo::space()),
            _model: PhantomData,
        })
    }

    pub fn ukf(&self) -> &Ukf<N> {
        &self.ukf
    }

    fn update_stacked<const M: usize>(
        &mut self,
        readings: &[Reading],
        gate: Option<f64>,
    ) -> Result<UpdateOutcome, FilterError> {
        let (z, r) = stack_z::<M>(readings)?;
        let info = self.ukf.update(
            |x| stack_h::<Mo, N, M>(x, readings),
            &r,
            &z,
            |a, b| stacked_residual(readings, a, b),
            gate,
            NORMALIZED_INNOVATION,
            LIKELIHOOD,
        )?;
        Ok(outcome(readings, &info))
    }
}

impl<Mo, const N: usize> KinematicFilter for UkfFilter<Mo, N>
where
    Mo: MotionModel<N>,
{
    fn name(&self) -> String {
        format!(
            "{} UKF (alpha {})",
            Mo::NAME,
            self.ukf.sigma_points().alpha()
        )
    }

    fn observes(&self, channel: Channel) -> bool {
        Mo::observes(channel)
    }

    fn stage(&self) -> FilterStage {
        self.ukf.stage()
    }

    fn reset(&mut self, fit: &LinearFit, init: &Init) -> Result<(), FilterError> {
        let (x, p) = Mo::initial_state(fit, init);
        self.ukf.reset(x, p)
    }

    fn predict(
        &mut self,
        dt: f64,
        noise: &ProcessNoise,
        fading_memory_alpha: f64,
    ) -> Result<(), FilterError> {
        let q = Mo::q(dt, noise)?;
        let f = Mo::transition(dt)?;
        self.ukf
            .predict(|x| Mo::f(&f, x), &q, fading_memory_alpha)
    }

    fn update(
        &mut self,
        readings: &[Reading],
        gate: Option<f64>,
    ) -> Result<Option<UpdateOutcome>, FilterError> {
        dispatch_update!(self, readings, gate)
    }

    kinematic_accessors!(ukf);
}

/// A motion model estimated with an extended Kalman filter, optionally with an H infinity gain.
#[derive(Clone, Debug)]
pub struct EkfFilter<Mo, const N: usize>
where
    Mo: MotionModel<N>,
{
    ekf: Ekf<N>,
    theta: Option<f64>,
    _model: PhantomData<Mo>,
}

impl<Mo, const N: usize> EkfFilter<Mo, N>
where
    Mo: MotionModel<N>,
{
    pub fn new(theta: Option<f64>) -> Self {
        Self {
            ekf: Ekf::new(Mo::space()),
            theta,
            _model: PhantomData,
        }
    }

    pub fn ekf(&self) -> &Ekf<N> {
        &self.ekf
    }

    fn update_stacked<const M: usize>(
        &mut self,
        readings: &[Reading],
        gate: Option<f64>,
    ) -> Result<UpdateOutcome, FilterError> {
        let (z, r) = stack_z::<M>(readings)?;
        let info = self.ekf.update(
            |x| stack_h::<Mo, N, M>(x, readings),
            |x| stack_hj::<Mo, N, M>(x, readings),
            &r,
            &z,
            |a, b| stacked_residual(readings, a, b),
            self.theta,
            gate,
            NORMALIZED_INNOVATION,
            LIKELIHOOD,
        )?;
        Ok(outcome(readings, &info))
    }
}

impl<Mo, const N: usize> KinematicFilter for EkfFilter<Mo, N>
where
    Mo: MotionModel<N>,
{
    fn name(&self) -> String {
        match self.theta {
            Some(theta) => format!("{} EKF (theta {theta})", Mo::NAME),
            None => format!("{} EKF", Mo::NAME),
        }
    }

    fn observes(&self, channel: Channel) -> bool {
        Mo::observes(channel)
    }

    fn stage(&self) -> FilterStage {
        self.ekf.stage()
    }

    fn reset(&mut self, fit: &LinearFit, init: &Init) -> Result<(), FilterError> {
        let (x, p) = Mo::initial_state(fit, init);
        self.ekf.reset(x, p)
    }

    fn predict(
        &mut self,
        dt: f64,
        noise: &ProcessNoise,
        fading_memory_alpha: f64,
    ) -> Result<(), FilterError> {
        let q = Mo::q(dt, noise)?;
        let f = Mo::transition(dt)?;
        self.ekf
            .predict(|x| Mo::f(&f, x), |_| f, &q, fading_memory_alpha)
    }

    fn update(
        &mut self,
        readings: &[Reading],
        gate: Option<f64>,
    ) -> Result<Option<UpdateOutcome>, FilterError> {
        dispatch_update!(self, readings, gate)
    }

    kinematic_accessors!(ekf);
}

impl<Mo, const N: usize> fmt::Display for UkfFilter<Mo, N>
where
    Mo: MotionModel<N>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.ukf.stage())
    }
}

impl<Mo, const N: usize> fmt::Display for EkfFilter<Mo, N>
where
    Mo: MotionModel<N>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.ekf.stage())
    }
}

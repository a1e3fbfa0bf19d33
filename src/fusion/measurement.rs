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

use crate::linalg::{SVector, Vector1, Vector2};
use crate::models::Channel;
use crate::time::Epoch;
use std::fmt;

/// A measurement with a diagonal covariance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Measurement<const M: usize> {
    pub value: SVector<f64, M>,
    pub variance: SVector<f64, M>,
}

impl<const M: usize> Measurement<M> {
    pub fn new(value: SVector<f64, M>, variance: SVector<f64, M>) -> Self {
        Self { value, variance }
    }
}

impl Measurement<1> {
    pub fn scalar(value: f64, variance: f64) -> Self {
        Self::new(Vector1::new(value), Vector1::new(variance))
    }
}

/// A position, whose variance may be unknown.
///
/// A position without a variance cannot be used in an update nor in the linear fit of a reset.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PositionMeasurement {
    pub value: Vector2<f64>,
    pub variance: Option<Vector2<f64>>,
}

impl PositionMeasurement {
    /// Returns the position as a measurement if its variance is known.
    pub fn usable(&self) -> Option<Measurement<2>> {
        self.variance.map(|variance| Measurement::new(self.value, variance))
    }
}

/// True values of the simulated trajectory, used to compute the NEES.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TrueData {
    pub position: Vector2<f64>,
    pub speed: f64,
    /// Direction of the velocity
    pub angle: f64,
    /// Bias of the measured direction
    pub angle_r: f64,
}

/// All measurements of the object taken at the same epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurements {
    pub epoch: Epoch,
    pub position: Option<PositionMeasurement>,
    pub speed: Option<Measurement<1>>,
    pub direction: Option<Measurement<1>>,
    pub acceleration: Option<Measurement<2>>,
    pub true_data: Option<TrueData>,
}

impl Measurements {
    /// An empty bundle at the provided epoch.
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            position: None,
            speed: None,
            direction: None,
            acceleration: None,
            true_data: None,
        }
    }

    pub fn with_position(mut self, value: Vector2<f64>, variance: Option<Vector2<f64>>) -> Self {
        self.position = Some(PositionMeasurement { value, variance });
        self
    }

    pub fn with_speed(mut self, value: f64, variance: f64) -> Self {
        self.speed = Some(Measurement::scalar(value, variance));
        self
    }

    pub fn with_direction(mut self, value: f64, variance: f64) -> Self {
        self.direction = Some(Measurement::scalar(value, variance));
        self
    }

    pub fn with_acceleration(mut self, value: Vector2<f64>, variance: Vector2<f64>) -> Self {
        self.acceleration = Some(Measurement::new(value, variance));
        self
    }

    pub fn with_true_data(mut self, true_data: TrueData) -> Self {
        self.true_data = Some(true_data);
        self
    }

    /// The position measurement, if it has a variance.
    pub fn usable_position(&self) -> Option<Measurement<2>> {
        self.position.and_then(|p| p.usable())
    }

    /// Readings of the usable channels, in stacking order, keeping only the channels accepted by `observes`.
    pub fn readings<F>(&self, observes: F) -> Vec<Reading>
    where
        F: Fn(Channel) -> bool,
    {
        let mut readings = Vec::with_capacity(4);
        if let Some(p) = self.usable_position() {
            readings.push(Reading::from_measurement(Channel::Position, &p));
        }
        if let Some(s) = self.speed {
            readings.push(Reading::from_measurement(Channel::Speed, &s));
        }
        if let Some(d) = self.direction {
            readings.push(Reading::from_measurement(Channel::Direction, &d));
        }
        if let Some(a) = self.acceleration {
            readings.push(Reading::from_measurement(Channel::Acceleration, &a));
        }
        readings.retain(|r| observes(r.channel));
        readings
    }
}

impl fmt::Display for Measurements {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.epoch)?;
        if let Some(p) = self.position {
            write!(f, "; position = ({:.3}, {:.3})", p.value.x, p.value.y)?;
        }
        if let Some(s) = self.speed {
            write!(f, "; speed = {:.3}", s.value[0])?;
        }
        if let Some(d) = self.direction {
            write!(f, "; direction = {:.3} deg", d.value[0].to_degrees())?;
        }
        if let Some(a) = self.acceleration {
            write!(f, "; acceleration = ({:.3}, {:.3})", a.value.x, a.value.y)?;
        }
        Ok(())
    }
}

/// A single channel of a bundle, with its values and variances padded to two components.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reading {
    pub channel: Channel,
    pub value: [f64; 2],
    pub variance: [f64; 2],
}

impl Reading {
    pub fn from_measurement<const M: usize>(channel: Channel, m: &Measurement<M>) -> Self {
        let mut value = [0.0; 2];
        let mut variance = [0.0; 2];
        for i in 0..M.min(2) {
            value[i] = m.value[i];
            variance[i] = m.variance[i];
        }
        Self {
            channel,
            value,
            variance,
        }
    }

    pub fn dimension(&self) -> usize {
        self.channel.dimension()
    }
}

#[cfg(test)]
mod ut_measurement {
    use super::*;
    use crate::time::{Epoch, TimeUnits};

    #[test]
    fn readings_order_and_filtering() {
        let epoch = Epoch::from_gregorian_tai_at_midnight(2024, 1, 1) + 1.seconds();
        let m = Measurements::new(epoch)
            .with_acceleration(Vector2::new(0.1, 0.2), Vector2::new(1.0, 1.0))
            .with_speed(3.0, 0.5)
            .with_position(Vector2::new(1.0, 2.0), Some(Vector2::new(4.0, 4.0)));

        let all = m.readings(|_| true);
        let channels = all.iter().map(|r| r.channel).collect::<Vec<_>>();
        assert_eq!(
            channels,
            vec![Channel::Position, Channel::Speed, Channel::Acceleration]
        );
        assert_eq!(all[1].value, [3.0, 0.0]);

        let no_accel = m.readings(|c| c != Channel::Acceleration);
        assert_eq!(no_accel.len(), 2);

        let unknown_variance = Measurements::new(epoch).with_position(Vector2::new(1.0, 2.0), None);
        assert!(unknown_variance.readings(|_| true).is_empty());
        assert!(unknown_variance.usable_position().is_none());
    }
}

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

use super::{KinematicFilter, Measurements, MeasurementQueue, Reading, TrueData, UpdateOutcome};
use crate::config::TrackerConfig;
use crate::errors::{FilterError, NonIncreasingTimeSnafu, PositionInPredictionSnafu};
use crate::filter::consistency::Consistency;
use crate::linalg::Vector2;
use crate::models::{Channel, ChannelSet, ProcessNoise};
use crate::time::Epoch;
use snafu::ensure;
use std::fmt;

/// Speed below which a reading counts towards standing.
pub const STANDING_SPEED: f64 = 0.1;
/// Velocity pseudo-measurement used while standing, and its variance.
pub const STANDING_VELOCITY: [f64; 2] = [0.001, 0.001];
pub const STANDING_VELOCITY_VARIANCE: [f64; 2] = [0.01, 0.01];

/// Estimate emitted by a tracker after a reset, a prediction or an update.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackUpdate {
    pub epoch: Epoch,
    pub position: Vector2<f64>,
    /// Diagonal of the position covariance
    pub position_p: Vector2<f64>,
    pub speed: Option<f64>,
    pub speed_p: Option<f64>,
    pub angle: Option<f64>,
    pub angle_r: Option<f64>,
    /// Set if the update was rejected by the gate, the estimate is then the prediction
    pub gated: bool,
    /// Set if the estimate is the bootstrap from the lookback queue
    pub reset: bool,
    pub nis: Option<f64>,
    /// Channels of the update, None after a reset, a prediction or a standing update
    pub channels: Option<ChannelSet>,
}

impl fmt::Display for TrackUpdate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: position = ({:.3}, {:.3}) +/- ({:.3}, {:.3})",
            self.epoch,
            self.position.x,
            self.position.y,
            self.position_p.x.sqrt(),
            self.position_p.y.sqrt()
        )?;
        if let (Some(speed), Some(speed_p)) = (self.speed, self.speed_p) {
            write!(f, "; speed = {speed:.3} +/- {:.3}", speed_p.sqrt())?;
        }
        if let Some(angle) = self.angle {
            write!(f, "; angle = {:.3} deg", angle.to_degrees())?;
        }
        if let Some(angle_r) = self.angle_r {
            write!(f, "; angle r = {:.3} deg", angle_r.to_degrees())?;
        }
        if self.reset {
            write!(f, " (reset)")?;
        } else if self.gated {
            write!(f, " (gated)")?;
        } else if let Some(channels) = self.channels {
            write!(f, " ({channels})")?;
        }
        Ok(())
    }
}

/// Fuses bundles of measurements of a single object with one filter.
///
/// Each bundle either resets the filter from the lookback queue (first bundle, or after a gap of at
/// least `reset_dt` since the last accepted update), or predicts the filter to the bundle epoch and runs
/// a single update with all of its usable channels.
#[derive(Clone, Debug)]
pub struct Tracker<F: KinematicFilter> {
    filter: F,
    config: TrackerConfig,
    standing_detection: bool,
    queue: MeasurementQueue,
    /// Epoch of the last bundle which was used
    last_time: Option<Epoch>,
    /// Epoch of the filter estimate
    last_update: Option<Epoch>,
    /// Epoch of the last reset or update which was not gated
    last_accepted: Option<Epoch>,
    last_speed: Option<f64>,
    standing: bool,
    consistency: Consistency,
}

impl<F: KinematicFilter> Tracker<F> {
    /// Builds a tracker around `filter`, standing detection is only used if enabled here and in the
    /// configuration.
    pub fn new(
        filter: F,
        config: &TrackerConfig,
        standing_detection: bool,
    ) -> Result<Self, FilterError> {
        config.validate()?;
        let queue = MeasurementQueue::new(
            config.queue_size,
            config.reset_dt,
            config.angle_estimation_variance,
        )?;
        Ok(Self {
            filter,
            config: config.clone(),
            standing_detection: standing_detection && config.standing_detection,
            queue,
            last_time: None,
            last_update: None,
            last_accepted: None,
            last_speed: None,
            standing: false,
            consistency: Consistency::default(),
        })
    }

    pub fn name(&self) -> String {
        self.filter.name()
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn consistency(&self) -> &Consistency {
        &self.consistency
    }

    /// NEES and NIS check strings of this tracker, one line per non empty accumulator.
    pub fn consistency_string(&self) -> String {
        self.consistency.check_string(&self.filter.name())
    }

    pub fn is_standing(&self) -> bool {
        self.standing
    }

    /// Processes a bundle of measurements.
    ///
    /// Returns None if the bundle has no usable channel, or if the filter must be reset but the bundle
    /// has no usable position.
    pub fn update(&mut self, m: &Measurements) -> Result<Option<TrackUpdate>, FilterError> {
        let readings = m.readings(|channel| self.filter.observes(channel));
        if readings.is_empty() {
            return Ok(None);
        }
        self.check_time(m.epoch)?;
        self.last_time = Some(m.epoch);

        if self.standing_detection {
            self.detect_standing(m);
        }

        self.queue.push(m, &self.config.init)?;

        let (last_update, last_accepted) = match (self.last_update, self.last_accepted) {
            (Some(update), Some(accepted)) if m.epoch - accepted < self.config.reset_dt => {
                (update, accepted)
            }
            _ => return self.reset(m),
        };

        let dt = (m.epoch - last_update).to_seconds();
        let outcome = if self.standing {
            self.filter.predict(dt, &ProcessNoise::none(), 1.0)?;
            let standing = Reading {
                channel: Channel::Velocity,
                value: STANDING_VELOCITY,
                variance: STANDING_VELOCITY_VARIANCE,
            };
            self.filter.update(&[standing], self.config.gate)?
        } else {
            self.filter.predict(
                dt,
                &self.config.process_noise,
                self.config.fading_memory_alpha,
            )?;
            self.filter.update(&readings, self.config.gate)?
        };
        self.last_update = Some(m.epoch);

        if let Some(outcome) = &outcome {
            self.add_nis(outcome, (m.epoch - last_accepted).to_seconds())?;
            if !outcome.gated {
                self.last_accepted = Some(m.epoch);
                if let Some(true_data) = &m.true_data {
                    self.add_nees(true_data)?;
                }
            }
        }

        Ok(Some(self.track_update(m.epoch, false, outcome)))
    }

    /// Predicts the estimate to the epoch of a bundle without updating it.
    ///
    /// Returns None if the filter is not initialized or if the last accepted update is older than
    /// `reset_dt`, in which case the next update will reset the filter.
    pub fn predict(&mut self, m: &Measurements) -> Result<Option<TrackUpdate>, FilterError> {
        ensure!(m.usable_position().is_none(), PositionInPredictionSnafu);
        let (Some(last_update), Some(last_accepted)) = (self.last_update, self.last_accepted) else {
            return Ok(None);
        };
        self.check_time(m.epoch)?;
        if !self.filter.stage().is_initialized() || m.epoch - last_accepted >= self.config.reset_dt {
            return Ok(None);
        }

        let dt = (m.epoch - last_update).to_seconds();
        self.filter.predict(
            dt,
            &self.config.process_noise,
            self.config.fading_memory_alpha,
        )?;
        self.last_time = Some(m.epoch);
        self.last_update = Some(m.epoch);
        Ok(Some(self.track_update(m.epoch, false, None)))
    }

    fn check_time(&self, epoch: Epoch) -> Result<(), FilterError> {
        if let Some(last) = self.last_time {
            ensure!(
                epoch > last,
                NonIncreasingTimeSnafu {
                    from: last,
                    to: epoch
                }
            );
        }
        Ok(())
    }

    /// Resets the filter from the fit of the oldest queued bundle, then replays the other queued bundles
    /// up to `m`, which is the last one. The queue is drained.
    fn reset(&mut self, m: &Measurements) -> Result<Option<TrackUpdate>, FilterError> {
        if m.usable_position().is_none() {
            if m.position.is_some() {
                warn!(
                    "{}: position without variance at {} cannot reset the filter",
                    self.filter.name(),
                    m.epoch
                );
            }
            return Ok(None);
        }
        let Some((mut last, fit)) = self.queue.first().map(|(epoch, fit)| (epoch, *fit)) else {
            return Ok(None);
        };

        self.filter.reset(&fit, &self.config.init)?;
        self.standing = false;

        let replay: Vec<Measurements> = self.queue.replay().cloned().collect();
        for bundle in &replay {
            let dt = (bundle.epoch - last).to_seconds();
            self.filter.predict(
                dt,
                &self.config.process_noise,
                self.config.fading_memory_alpha,
            )?;
            let readings = bundle.readings(|channel| self.filter.observes(channel));
            if let Some(outcome) = self.filter.update(&readings, self.config.gate)? {
                self.add_nis(&outcome, dt)?;
            }
            last = bundle.epoch;
        }
        self.queue.clear();

        self.last_update = Some(m.epoch);
        self.last_accepted = Some(m.epoch);
        info!(
            "{}: reset at {} from {} queued bundles",
            self.filter.name(),
            m.epoch,
            replay.len() + 1
        );

        Ok(Some(self.track_update(m.epoch, true, None)))
    }

    fn detect_standing(&mut self, m: &Measurements) {
        let Some(speed) = m.speed else {
            return;
        };
        let speed = speed.value[0];
        let standing = self
            .last_speed
            .map_or(false, |last| last < STANDING_SPEED && speed < STANDING_SPEED);
        if standing != self.standing {
            debug!(
                "{}: {} at {}",
                self.filter.name(),
                if standing { "standing" } else { "moving" },
                m.epoch
            );
        }
        self.standing = standing;
        self.last_speed = Some(speed);
    }

    fn add_nees(&mut self, true_data: &TrueData) -> Result<(), FilterError> {
        let error = true_data.position - self.filter.position();
        self.consistency
            .nees_position
            .add(&error, &self.filter.position_p())?;
        if let (Some(speed), Some(speed_p)) = (self.filter.speed(), self.filter.speed_p()) {
            self.consistency
                .nees_speed
                .add_1(true_data.speed - speed, speed_p)?;
        }
        Ok(())
    }

    fn add_nis(&mut self, outcome: &UpdateOutcome, dt: f64) -> Result<(), FilterError> {
        if outcome.gated || !outcome.includes(Channel::Position) {
            return Ok(());
        }
        if let Some(linear_dt) = self.config.linear_dt {
            if dt > linear_dt.to_seconds() {
                return Ok(());
            }
        }
        if let Some(nis) = outcome.nis {
            self.consistency.nis.add_dof(nis, outcome.dof)?;
        }
        Ok(())
    }

    fn track_update(&self, epoch: Epoch, reset: bool, outcome: Option<UpdateOutcome>) -> TrackUpdate {
        TrackUpdate {
            epoch,
            position: self.filter.position(),
            position_p: self.filter.position_p().diagonal(),
            speed: self.filter.speed(),
            speed_p: self.filter.speed_p(),
            angle: self.filter.angle(),
            angle_r: self.filter.angle_r(),
            gated: outcome.map_or(false, |o| o.gated),
            reset,
            nis: outcome.and_then(|o| o.nis),
            channels: outcome.and_then(|o| o.channels),
        }
    }
}

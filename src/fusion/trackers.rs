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

use super::{EkfFilter, Measurements, TrackUpdate, Tracker, UkfFilter};
use crate::config::TrackerConfig;
use crate::errors::FilterError;
use crate::filter::consistency::Consistency;
use crate::models::{
    Acceleration0, Acceleration1, Direction10, Direction11, Direction21, Position0, Position1,
    Position2, Speed1, Speed2,
};
use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

pub type PositionTracker0 = Tracker<EkfFilter<Position0, 2>>;
pub type PositionTracker1 = Tracker<EkfFilter<Position1, 4>>;
pub type PositionTracker2 = Tracker<EkfFilter<Position2, 6>>;
pub type SpeedTracker1 = Tracker<UkfFilter<Speed1, 4>>;
pub type SpeedTracker2 = Tracker<UkfFilter<Speed2, 6>>;
pub type DirectionTracker10 = Tracker<UkfFilter<Direction10, 5>>;
pub type DirectionTracker11 = Tracker<UkfFilter<Direction11, 6>>;
pub type DirectionTracker21 = Tracker<UkfFilter<Direction21, 8>>;
pub type AccelerationTracker0 = Tracker<UkfFilter<Acceleration0, 8>>;
pub type AccelerationTracker1 = Tracker<UkfFilter<Acceleration1, 9>>;
pub type AccelerationTrackerEkf1 = Tracker<EkfFilter<Acceleration1, 9>>;

/// Position trackers, extended Kalman filters with the optional H infinity `theta` of the configuration.
pub mod position {
    use super::*;

    pub fn tracker_0(config: &TrackerConfig) -> Result<PositionTracker0, FilterError> {
        Tracker::new(EkfFilter::new(config.theta), config, false)
    }

    pub fn tracker_1(config: &TrackerConfig) -> Result<PositionTracker1, FilterError> {
        Tracker::new(EkfFilter::new(config.theta), config, false)
    }

    pub fn tracker_2(config: &TrackerConfig) -> Result<PositionTracker2, FilterError> {
        Tracker::new(EkfFilter::new(config.theta), config, false)
    }
}

/// Speed trackers, unscented Kalman filters.
pub mod speed {
    use super::*;

    pub fn tracker_1(config: &TrackerConfig) -> Result<SpeedTracker1, FilterError> {
        Tracker::new(UkfFilter::new(config.sigma_points_alpha)?, config, false)
    }

    pub fn tracker_2(config: &TrackerConfig) -> Result<SpeedTracker2, FilterError> {
        Tracker::new(UkfFilter::new(config.sigma_points_alpha)?, config, false)
    }
}

/// Direction trackers, unscented Kalman filters with standing detection.
pub mod direction {
    use super::*;

    pub fn tracker_1_0(config: &TrackerConfig) -> Result<DirectionTracker10, FilterError> {
        Tracker::new(UkfFilter::new(config.sigma_points_alpha)?, config, true)
    }

    pub fn tracker_1_1(config: &TrackerConfig) -> Result<DirectionTracker11, FilterError> {
        Tracker::new(UkfFilter::new(config.sigma_points_alpha)?, config, true)
    }

    pub fn tracker_2_1(config: &TrackerConfig) -> Result<DirectionTracker21, FilterError> {
        Tracker::new(UkfFilter::new(config.sigma_points_alpha)?, config, true)
    }
}

/// Acceleration trackers.
pub mod acceleration {
    use super::*;

    pub fn tracker_0(config: &TrackerConfig) -> Result<AccelerationTracker0, FilterError> {
        Tracker::new(UkfFilter::new(config.sigma_points_alpha)?, config, false)
    }

    pub fn tracker_1(config: &TrackerConfig) -> Result<AccelerationTracker1, FilterError> {
        Tracker::new(UkfFilter::new(config.sigma_points_alpha)?, config, false)
    }

    /// The nine state model with an extended Kalman filter.
    pub fn tracker_ekf_1(config: &TrackerConfig) -> Result<AccelerationTrackerEkf1, FilterError> {
        Tracker::new(EkfFilter::new(config.theta), config, false)
    }
}

/// Every tracker which can be built at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
pub enum TrackerKind {
    Position0,
    Position1,
    Position2,
    Speed1,
    Speed2,
    Direction10,
    Direction11,
    Direction21,
    Acceleration0,
    Acceleration1,
    AccelerationEkf1,
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A tracker of any kind, for runtime selection.
#[derive(Clone, Debug)]
pub enum AnyTracker {
    Position0(PositionTracker0),
    Position1(PositionTracker1),
    Position2(PositionTracker2),
    Speed1(SpeedTracker1),
    Speed2(SpeedTracker2),
    Direction10(DirectionTracker10),
    Direction11(DirectionTracker11),
    Direction21(DirectionTracker21),
    Acceleration0(AccelerationTracker0),
    Acceleration1(AccelerationTracker1),
    AccelerationEkf1(AccelerationTrackerEkf1),
}

macro_rules! dispatch {
    ($self:ident, $tracker:ident => $body:expr) => {
        match $self {
            Self::Position0($tracker) => $body,
            Self::Position1($tracker) => $body,
            Self::Position2($tracker) => $body,
            Self::Speed1($tracker) => $body,
            Self::Speed2($tracker) => $body,
            Self::Direction10($tracker) => $body,
            Self::Direction11($tracker) => $body,
            Self::Direction21($tracker) => $body,
            Self::Acceleration0($tracker) => $body,
            Self::Acceleration1($tracker) => $body,
            Self::AccelerationEkf1($tracker) => $body,
        }
    };
}

impl AnyTracker {
    pub fn new(kind: TrackerKind, config: &TrackerConfig) -> Result<Self, FilterError> {
        Ok(match kind {
            TrackerKind::Position0 => Self::Position0(position::tracker_0(config)?),
            TrackerKind::Position1 => Self::Position1(position::tracker_1(config)?),
            TrackerKind::Position2 => Self::Position2(position::tracker_2(config)?),
            TrackerKind::Speed1 => Self::Speed1(speed::tracker_1(config)?),
            TrackerKind::Speed2 => Self::Speed2(speed::tracker_2(config)?),
            TrackerKind::Direction10 => Self::Direction10(direction::tracker_1_0(config)?),
            TrackerKind::Direction11 => Self::Direction11(direction::tracker_1_1(config)?),
            TrackerKind::Direction21 => Self::Direction21(direction::tracker_2_1(config)?),
            TrackerKind::Acceleration0 => Self::Acceleration0(acceleration::tracker_0(config)?),
            TrackerKind::Acceleration1 => Self::Acceleration1(acceleration::tracker_1(config)?),
            TrackerKind::AccelerationEkf1 => {
                Self::AccelerationEkf1(acceleration::tracker_ekf_1(config)?)
            }
        })
    }

    pub fn kind(&self) -> TrackerKind {
        match self {
            Self::Position0(_) => TrackerKind::Position0,
            Self::Position1(_) => TrackerKind::Position1,
            Self::Position2(_) => TrackerKind::Position2,
            Self::Speed1(_) => TrackerKind::Speed1,
            Self::Speed2(_) => TrackerKind::Speed2,
            Self::Direction10(_) => TrackerKind::Direction10,
            Self::Direction11(_) => TrackerKind::Direction11,
            Self::Direction21(_) => TrackerKind::Direction21,
            Self::Acceleration0(_) => TrackerKind::Acceleration0,
            Self::Acceleration1(_) => TrackerKind::Acceleration1,
            Self::AccelerationEkf1(_) => TrackerKind::AccelerationEkf1,
        }
    }

    pub fn name(&self) -> String {
        dispatch!(self, t => t.name())
    }

    pub fn update(&mut self, m: &Measurements) -> Result<Option<TrackUpdate>, FilterError> {
        dispatch!(self, t => t.update(m))
    }

    pub fn predict(&mut self, m: &Measurements) -> Result<Option<TrackUpdate>, FilterError> {
        dispatch!(self, t => t.predict(m))
    }

    pub fn consistency(&self) -> &Consistency {
        dispatch!(self, t => t.consistency())
    }

    pub fn consistency_string(&self) -> String {
        dispatch!(self, t => t.consistency_string())
    }
}

#[cfg(test)]
mod ut_trackers {
    use super::*;
    use enum_iterator::all;

    #[test]
    fn every_kind() {
        let config = TrackerConfig::default();
        for kind in all::<TrackerKind>() {
            let tracker = AnyTracker::new(kind, &config).unwrap();
            assert_eq!(tracker.kind(), kind);
            assert!(tracker.consistency_string().is_empty());
        }
        assert_eq!(all::<TrackerKind>().count(), 11);

        let bad = TrackerConfig::builder().sigma_points_alpha(0.0).build();
        assert!(AnyTracker::new(TrackerKind::Speed1, &bad).is_err());
        assert!(AnyTracker::new(TrackerKind::Position1, &bad).is_ok());
    }

    #[test]
    fn names() {
        let config = TrackerConfig::builder().theta(0.01).build();
        let tracker = AnyTracker::new(TrackerKind::Position1, &config).unwrap();
        assert!(tracker.name().contains("theta 0.01"));
        let tracker = AnyTracker::new(TrackerKind::AccelerationEkf1, &config).unwrap();
        assert!(tracker.name().contains("EKF"));
    }
}

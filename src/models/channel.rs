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

use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// A kind of measurement of the moving object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize, Deserialize)]
pub enum Channel {
    /// (x, y), in meters
    Position,
    /// Norm of the velocity, in meters per second
    Speed,
    /// Direction of the velocity in the sensor frame, in radians
    Direction,
    /// (ax, ay) in the sensor frame, in meters per second squared
    Acceleration,
    /// (vx, vy), only used as a pseudo-measurement when the object is standing
    Velocity,
}

impl Channel {
    /// Number of scalar components of this channel.
    pub const fn dimension(self) -> usize {
        match self {
            Self::Position | Self::Acceleration | Self::Velocity => 2,
            Self::Speed | Self::Direction => 1,
        }
    }

    /// Whether the residual of this channel is an angle.
    pub const fn is_angle(self) -> bool {
        matches!(self, Self::Direction)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Position => "position",
            Self::Speed => "speed",
            Self::Direction => "direction",
            Self::Acceleration => "acceleration",
            Self::Velocity => "velocity",
        };
        write!(f, "{name}")
    }
}

/// A non empty combination of position, speed, direction and acceleration measured at the same time.
///
/// The channels of a set are always stacked in the order position, speed, direction, acceleration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
pub enum ChannelSet {
    Position,
    Speed,
    Direction,
    Acceleration,
    PositionSpeed,
    PositionDirection,
    PositionAcceleration,
    SpeedDirection,
    SpeedAcceleration,
    DirectionAcceleration,
    PositionSpeedDirection,
    PositionSpeedAcceleration,
    PositionDirectionAcceleration,
    SpeedDirectionAcceleration,
    PositionSpeedDirectionAcceleration,
}

impl ChannelSet {
    /// Returns the set of the flagged channels, None if no channel is flagged.
    pub fn from_flags(position: bool, speed: bool, direction: bool, acceleration: bool) -> Option<Self> {
        use ChannelSet::*;
        match (position, speed, direction, acceleration) {
            (false, false, false, false) => None,
            (true, false, false, false) => Some(Position),
            (false, true, false, false) => Some(Speed),
            (false, false, true, false) => Some(Direction),
            (false, false, false, true) => Some(Acceleration),
            (true, true, false, false) => Some(PositionSpeed),
            (true, false, true, false) => Some(PositionDirection),
            (true, false, false, true) => Some(PositionAcceleration),
            (false, true, true, false) => Some(SpeedDirection),
            (false, true, false, true) => Some(SpeedAcceleration),
            (false, false, true, true) => Some(DirectionAcceleration),
            (true, true, true, false) => Some(PositionSpeedDirection),
            (true, true, false, true) => Some(PositionSpeedAcceleration),
            (true, false, true, true) => Some(PositionDirectionAcceleration),
            (false, true, true, true) => Some(SpeedDirectionAcceleration),
            (true, true, true, true) => Some(PositionSpeedDirectionAcceleration),
        }
    }

    /// Returns the set made of the provided channels, velocity is ignored.
    pub fn from_channels(channels: &[Channel]) -> Option<Self> {
        Self::from_flags(
            channels.contains(&Channel::Position),
            channels.contains(&Channel::Speed),
            channels.contains(&Channel::Direction),
            channels.contains(&Channel::Acceleration),
        )
    }

    /// Channels of this set, in stacking order.
    pub const fn channels(self) -> &'static [Channel] {
        use Channel as C;
        match self {
            Self::Position => &[C::Position],
            Self::Speed => &[C::Speed],
            Self::Direction => &[C::Direction],
            Self::Acceleration => &[C::Acceleration],
            Self::PositionSpeed => &[C::Position, C::Speed],
            Self::PositionDirection => &[C::Position, C::Direction],
            Self::PositionAcceleration => &[C::Position, C::Acceleration],
            Self::SpeedDirection => &[C::Speed, C::Direction],
            Self::SpeedAcceleration => &[C::Speed, C::Acceleration],
            Self::DirectionAcceleration => &[C::Direction, C::Acceleration],
            Self::PositionSpeedDirection => &[C::Position, C::Speed, C::Direction],
            Self::PositionSpeedAcceleration => &[C::Position, C::Speed, C::Acceleration],
            Self::PositionDirectionAcceleration => &[C::Position, C::Direction, C::Acceleration],
            Self::SpeedDirectionAcceleration => &[C::Speed, C::Direction, C::Acceleration],
            Self::PositionSpeedDirectionAcceleration => {
                &[C::Position, C::Speed, C::Direction, C::Acceleration]
            }
        }
    }

    pub fn contains(self, channel: Channel) -> bool {
        self.channels().contains(&channel)
    }

    /// Dimension of the stacked measurement vector.
    pub fn dimension(self) -> usize {
        self.channels().iter().map(|c| c.dimension()).sum()
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = self
            .channels()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", names.join("+"))
    }
}

#[cfg(test)]
mod ut_channel {
    use super::*;
    use enum_iterator::all;
    use std::collections::HashSet;

    #[test]
    fn fifteen_subsets() {
        let sets = all::<ChannelSet>().collect::<Vec<_>>();
        assert_eq!(sets.len(), 15);

        let mut seen = HashSet::new();
        for set in &sets {
            let channels = set.channels();
            assert!(!channels.is_empty());
            assert!(!channels.contains(&Channel::Velocity));
            // Stacking order
            assert!(channels.windows(2).all(|w| w[0] < w[1]), "{set}");
            assert_eq!(
                set.dimension(),
                channels.iter().map(|c| c.dimension()).sum::<usize>()
            );
            assert_eq!(ChannelSet::from_channels(channels), Some(*set));
            assert!(seen.insert(channels.to_vec()));
        }

        assert_eq!(ChannelSet::from_flags(false, false, false, false), None);
        assert_eq!(ChannelSet::PositionSpeedDirectionAcceleration.dimension(), 6);
        assert_eq!(ChannelSet::SpeedDirection.to_string(), "speed+direction");
    }
}

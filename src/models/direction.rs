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

use super::{Channel, Layout, MotionModel};

const OBSERVED: &[Channel] = &[Channel::Position, Channel::Speed, Channel::Direction];

/// Constant velocity and a constant sensor angle, which offsets the measured direction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Direction10;

impl MotionModel<5> for Direction10 {
    const NAME: &'static str = "Direction 1.0";
    const LAYOUT: Layout = Layout {
        position_order: 1,
        angle_order: Some(0),
        angle_r: false,
    };
    const ANGLES: &'static [usize] = &[4];
    const CHANNELS: &'static [Channel] = OBSERVED;
}

/// Constant velocity and a sensor angle drifting at a constant rate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Direction11;

impl MotionModel<6> for Direction11 {
    const NAME: &'static str = "Direction 1.1";
    const LAYOUT: Layout = Layout {
        position_order: 1,
        angle_order: Some(1),
        angle_r: false,
    };
    const ANGLES: &'static [usize] = &[4];
    const CHANNELS: &'static [Channel] = OBSERVED;
}

/// Constant acceleration and a sensor angle drifting at a constant rate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Direction21;

impl MotionModel<8> for Direction21 {
    const NAME: &'static str = "Direction 2.1";
    const LAYOUT: Layout = Layout {
        position_order: 2,
        angle_order: Some(1),
        angle_r: false,
    };
    const ANGLES: &'static [usize] = &[6];
    const CHANNELS: &'static [Channel] = OBSERVED;
}

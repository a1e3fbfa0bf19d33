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

/// Position only, as a random walk. Two states: [px, py].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Position0;

impl MotionModel<2> for Position0 {
    const NAME: &'static str = "Position 0";
    const LAYOUT: Layout = Layout {
        position_order: 0,
        angle_order: None,
        angle_r: false,
    };
    const ANGLES: &'static [usize] = &[];
    const CHANNELS: &'static [Channel] = &[Channel::Position];
}

/// Constant velocity. Four states: [px, vx, py, vy].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Position1;

impl MotionModel<4> for Position1 {
    const NAME: &'static str = "Position 1";
    const LAYOUT: Layout = Layout {
        position_order: 1,
        angle_order: None,
        angle_r: false,
    };
    const ANGLES: &'static [usize] = &[];
    const CHANNELS: &'static [Channel] = &[Channel::Position];
}

/// Constant acceleration. Six states: [px, vx, ax, py, vy, ay].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Position2;

impl MotionModel<6> for Position2 {
    const NAME: &'static str = "Position 2";
    const LAYOUT: Layout = Layout {
        position_order: 2,
        angle_order: None,
        angle_r: false,
    };
    const ANGLES: &'static [usize] = &[];
    const CHANNELS: &'static [Channel] = &[Channel::Position];
}

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

const OBSERVED: &[Channel] = &[
    Channel::Position,
    Channel::Speed,
    Channel::Direction,
    Channel::Acceleration,
];

/// Constant acceleration, a constant sensor angle and a direction bias.
///
/// Accelerations are measured in the sensor frame, i.e. rotated by the sensor angle, while directions
/// are offset by both the sensor angle and the bias.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Acceleration0;

impl MotionModel<8> for Acceleration0 {
    const NAME: &'static str = "Acceleration 0";
    const LAYOUT: Layout = Layout {
        position_order: 2,
        angle_order: Some(0),
        angle_r: true,
    };
    const ANGLES: &'static [usize] = &[6, 7];
    const CHANNELS: &'static [Channel] = OBSERVED;
}

/// Constant acceleration, a sensor angle drifting at a constant rate and a direction bias.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Acceleration1;

impl MotionModel<9> for Acceleration1 {
    const NAME: &'static str = "Acceleration 1";
    const LAYOUT: Layout = Layout {
        position_order: 2,
        angle_order: Some(1),
        angle_r: true,
    };
    const ANGLES: &'static [usize] = &[6, 8];
    const CHANNELS: &'static [Channel] = OBSERVED;
}

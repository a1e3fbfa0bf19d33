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

use std::fmt;

/// Which kinematic quantity a block of the state drives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Position,
    Angle,
    AngleR,
}

impl BlockKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Angle => "angle",
            Self::AngleR => "angle r",
        }
    }
}

/// A kinematic polynomial in the state: `len` consecutive components starting at `start`, each the
/// derivative of the previous one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub start: usize,
    pub len: usize,
    pub kind: BlockKind,
}

/// Layout of the state vector of a model.
///
/// The state is `[px, (vx), (ax), py, (vy), (ay), (angle), (angle_speed), (angle_r)]`: each position
/// axis is a polynomial of `position_order`, followed by the sensor angle polynomial of `angle_order` if
/// any, and by the constant direction bias `angle_r` if tracked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub position_order: usize,
    pub angle_order: Option<usize>,
    pub angle_r: bool,
}

impl Layout {
    /// Number of components per position axis.
    pub const fn axis_len(&self) -> usize {
        self.position_order + 1
    }

    const fn angle_len(&self) -> usize {
        match self.angle_order {
            Some(order) => order + 1,
            None => 0,
        }
    }

    /// Dimension of the state.
    pub const fn dimension(&self) -> usize {
        2 * self.axis_len() + self.angle_len() + if self.angle_r { 1 } else { 0 }
    }

    pub const fn px(&self) -> usize {
        0
    }

    pub const fn py(&self) -> usize {
        self.axis_len()
    }

    pub const fn vx(&self) -> Option<usize> {
        if self.position_order >= 1 {
            Some(1)
        } else {
            None
        }
    }

    pub const fn vy(&self) -> Option<usize> {
        if self.position_order >= 1 {
            Some(self.axis_len() + 1)
        } else {
            None
        }
    }

    pub const fn ax(&self) -> Option<usize> {
        if self.position_order >= 2 {
            Some(2)
        } else {
            None
        }
    }

    pub const fn ay(&self) -> Option<usize> {
        if self.position_order >= 2 {
            Some(self.axis_len() + 2)
        } else {
            None
        }
    }

    pub const fn angle(&self) -> Option<usize> {
        match self.angle_order {
            Some(_) => Some(2 * self.axis_len()),
            None => None,
        }
    }

    pub const fn angle_speed(&self) -> Option<usize> {
        match self.angle_order {
            Some(order) if order >= 1 => Some(2 * self.axis_len() + 1),
            _ => None,
        }
    }

    pub const fn angle_r(&self) -> Option<usize> {
        if self.angle_r {
            Some(self.dimension() - 1)
        } else {
            None
        }
    }

    /// Kinematic blocks of the state, in order.
    pub fn blocks(&self) -> Vec<Block> {
        let axis = self.axis_len();
        let mut blocks = vec![
            Block {
                start: 0,
                len: axis,
                kind: BlockKind::Position,
            },
            Block {
                start: axis,
                len: axis,
                kind: BlockKind::Position,
            },
        ];
        if let Some(start) = self.angle() {
            blocks.push(Block {
                start,
                len: self.angle_len(),
                kind: BlockKind::Angle,
            });
        }
        if let Some(start) = self.angle_r() {
            blocks.push(Block {
                start,
                len: 1,
                kind: BlockKind::AngleR,
            });
        }
        blocks
    }

    /// Indexes of the angle components, which must be wrapped.
    pub fn angle_indexes(&self) -> Vec<usize> {
        self.angle().into_iter().chain(self.angle_r()).collect()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "position order {}", self.position_order)?;
        if let Some(order) = self.angle_order {
            write!(f, ", angle order {order}")?;
        }
        if self.angle_r {
            write!(f, ", angle r")?;
        }
        write!(f, " ({} states)", self.dimension())
    }
}

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

use crate::linalg::{Matrix2, SMatrix, Vector2};

/// Rotates the provided vector counter-clockwise by `angle` radians.
pub fn rotate(v: &Vector2<f64>, angle: f64) -> Vector2<f64> {
    let (sin, cos) = angle.sin_cos();
    Matrix2::new(cos, -sin, sin, cos) * v
}

/// Returns n! as a float, only used for small orders of kinematic polynomials.
pub fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Returns whether the provided square matrix is symmetric to within a relative tolerance.
pub fn is_symmetric<const N: usize>(m: &SMatrix<f64, N, N>, tolerance: f64) -> bool {
    for i in 1..N {
        for j in 0..i {
            let scale = m[(i, j)].abs().max(m[(j, i)].abs()).max(1.0);
            if (m[(i, j)] - m[(j, i)]).abs() > tolerance * scale {
                return false;
            }
        }
    }
    true
}

/// Returns the symmetric part of the provided square matrix.
pub fn symmetrize<const N: usize>(m: &SMatrix<f64, N, N>) -> SMatrix<f64, N, N> {
    0.5 * (m + m.transpose())
}

/**
 * HyperReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use ndarray::{Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};

/// Samples every entry of a (rows x cols) table independently from N(0, std^2).
pub fn random_normal<R: Rng>(rows: usize, cols: usize, std: f32, rng: &mut R) -> Result<Array2<f32>> {
    let normal = Normal::new(0.0_f32, std).map_err(|failure| Error::InvalidConfiguration {
        field: "emb_size",
        reason: failure.to_string(),
    })?;
    Ok(Array2::from_shape_fn((rows, cols), |_| normal.sample(&mut *rng)))
}

/// Copies the requested rows, in the requested order. Rows may repeat.
pub fn gather_rows(table: &Array2<f32>, indices: &[usize], kind: &'static str) -> Result<Array2<f32>> {
    if let Some(&index) = indices.iter().find(|&&index| index >= table.nrows()) {
        return Err(Error::IndexOutOfRange { kind, index, bound: table.nrows() });
    }
    Ok(table.select(Axis(0), indices))
}

/// left · rightᵀ, i.e. all pairwise dot products between the rows of both tables.
pub fn pairwise_dots(left: ArrayView2<f32>, right: ArrayView2<f32>) -> Result<Array2<f32>> {
    if left.ncols() != right.ncols() {
        return Err(Error::ShapeMismatch {
            operation: "pairwise dot products",
            left: left.dim(),
            right: right.dim(),
        });
    }
    Ok(left.dot(&right.t()))
}

pub fn sum_of_squares(table: &Array2<f32>) -> f32 {
    table.iter().map(|value| value * value).sum()
}

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

use ndarray::Array2;
use sprs::{CsMat, TriMat};

use crate::error::{Error, Result};

/// Anything that maps a dense (cols x d) matrix to a dense (rows x d) matrix.
pub trait SparseOperator {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn multiply(&self, dense: &Array2<f32>) -> Result<Array2<f32>>;
}

impl SparseOperator for CsMat<f32> {

    fn rows(&self) -> usize {
        CsMat::rows(self)
    }

    fn cols(&self) -> usize {
        CsMat::cols(self)
    }

    fn multiply(&self, dense: &Array2<f32>) -> Result<Array2<f32>> {
        check_product("sparse multiply", self.shape(), dense.dim())?;
        Ok(self * dense)
    }
}

fn check_product(operation: &'static str, left: (usize, usize), right: (usize, usize)) -> Result<()> {
    if left.1 != right.0 {
        return Err(Error::ShapeMismatch { operation, left, right });
    }
    Ok(())
}

/// Builds a CSR matrix from (row, column, value) entries. Duplicate entries are summed up.
pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f32)]) -> Result<CsMat<f32>> {
    let mut matrix = TriMat::new((rows, cols));

    for &(row, col, value) in triplets {
        if row >= rows {
            return Err(Error::IndexOutOfRange { kind: "row", index: row, bound: rows });
        }
        if col >= cols {
            return Err(Error::IndexOutOfRange { kind: "column", index: col, bound: cols });
        }
        matrix.add_triplet(row, col, value);
    }

    Ok(matrix.to_csr())
}

/// A square matrix with `values` on its diagonal.
pub fn diagonal(values: &[f32]) -> CsMat<f32> {
    let size = values.len();
    CsMat::new((size, size), (0..=size).collect(), (0..size).collect(), values.to_vec())
}

pub fn transpose(matrix: &CsMat<f32>) -> CsMat<f32> {
    matrix.transpose_view().to_csr()
}

/// left · right
pub fn product(left: &CsMat<f32>, right: &CsMat<f32>) -> Result<CsMat<f32>> {
    check_product("sparse product", left.shape(), right.shape())?;
    Ok(left * right)
}

/// Places `bottom` underneath `top`.
pub fn vstack(top: &CsMat<f32>, bottom: &CsMat<f32>) -> Result<CsMat<f32>> {
    if top.cols() != bottom.cols() {
        return Err(Error::ShapeMismatch {
            operation: "sparse vstack",
            left: top.shape(),
            right: bottom.shape(),
        });
    }
    Ok(sprs::vstack(&[top.view(), bottom.view()]))
}

/// Places `right` next to `left`.
pub fn hstack(left: &CsMat<f32>, right: &CsMat<f32>) -> Result<CsMat<f32>> {
    if left.rows() != right.rows() {
        return Err(Error::ShapeMismatch {
            operation: "sparse hstack",
            left: left.shape(),
            right: right.shape(),
        });
    }
    // sprs stacks horizontally in CSC storage.
    Ok(sprs::hstack(&[left.view(), right.view()]).to_csr())
}

pub fn row_sums(matrix: &CsMat<f32>) -> Vec<f64> {
    let mut sums = vec![0.0f64; matrix.rows()];
    for (&value, (row, _)) in matrix.iter() {
        sums[row] += value as f64;
    }
    sums
}

pub fn col_sums(matrix: &CsMat<f32>) -> Vec<f64> {
    let mut sums = vec![0.0f64; matrix.cols()];
    for (&value, (_, col)) in matrix.iter() {
        sums[col] += value as f64;
    }
    sums
}

#[cfg(test)]
mod tests {

    use ndarray::arr2;
    use sprs::CsMat;

    use super::*;

    fn example() -> CsMat<f32> {
        // [[1, 0, 2],
        //  [0, 0, 0],
        //  [0, 3, 0]]
        from_triplets(3, 3, &[(0, 2, 2.0), (2, 1, 3.0), (0, 0, 1.0)]).unwrap()
    }

    #[test]
    fn duplicates_are_summed() {
        let matrix = from_triplets(2, 2, &[(0, 1, 1.0), (0, 1, 1.0), (1, 0, 4.0)]).unwrap();

        assert!(matrix.is_csr());
        assert_eq!(matrix.to_dense(), arr2(&[[0.0f32, 2.0], [4.0, 0.0]]));
    }

    #[test]
    fn out_of_range_triplets_are_rejected() {
        assert!(from_triplets(2, 2, &[(2, 0, 1.0)]).is_err());
        assert!(from_triplets(2, 2, &[(0, 2, 1.0)]).is_err());
    }

    #[test]
    fn transposed_products() {
        let a = example();
        let transposed = transpose(&a);

        assert!(transposed.is_csr());
        assert_eq!(transposed.to_dense(), a.to_dense().t());

        let gram = product(&a, &transposed).unwrap();
        assert_eq!(gram.to_dense(), a.to_dense().dot(&a.to_dense().t()));

        assert!(product(&a, &from_triplets(2, 3, &[]).unwrap()).is_err());
    }

    #[test]
    fn stacking() {
        let a = example();
        let b = from_triplets(1, 3, &[(0, 1, 5.0)]).unwrap();
        let c = from_triplets(3, 1, &[(1, 0, 7.0)]).unwrap();

        let vertical = vstack(&a, &b).unwrap();
        assert_eq!(vertical.shape(), (4, 3));
        assert_eq!(vertical.get(3, 1), Some(&5.0));
        assert_eq!(vertical.get(2, 1), Some(&3.0));

        let horizontal = hstack(&a, &c).unwrap();
        assert!(horizontal.is_csr());
        assert_eq!(horizontal.to_dense(), arr2(&[
            [1.0f32, 0.0, 2.0, 0.0],
            [0.0, 0.0, 0.0, 7.0],
            [0.0, 3.0, 0.0, 0.0],
        ]));

        assert!(vstack(&a, &c).is_err());
        assert!(hstack(&a, &b).is_err());
    }

    #[test]
    fn sums_and_diagonal_scaling() {
        let a = example();

        assert_eq!(row_sums(&a), vec![3.0, 0.0, 3.0]);
        assert_eq!(col_sums(&a), vec![1.0, 3.0, 2.0]);

        let rows_scaled = &diagonal(&[2.0, 1.0, 0.5]) * &a;
        assert_eq!(rows_scaled.get(0, 2), Some(&4.0));
        assert_eq!(rows_scaled.get(2, 1), Some(&1.5));

        let cols_scaled = &a * &diagonal(&[1.0, 10.0, 0.5]);
        assert_eq!(cols_scaled.get(0, 2), Some(&1.0));
        assert_eq!(cols_scaled.get(2, 1), Some(&30.0));
    }

    #[test]
    fn multiply_dense() {
        let a = example();
        let dense = arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);

        let product = a.multiply(&dense).unwrap();
        assert_eq!(product, arr2(&[[3.0f32, 2.0], [0.0, 0.0], [0.0, 3.0]]));

        assert!(a.multiply(&arr2(&[[1.0, 1.0], [1.0, 1.0]])).is_err());
        assert_eq!(diagonal(&[1.0; 3]).multiply(&dense).unwrap(), dense);
    }
}

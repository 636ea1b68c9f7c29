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

use std::ops::Range;

use ndarray::{s, Array2, Axis};
use scoped_pool::Pool;
use sprs::CsMat;
use tracing::{debug, trace};

use crate::error::{invalid_config, Error, Result};
use crate::sparse::SparseOperator;

/// Placement target for the blocks of the partitioned operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// Blocks are multiplied one after another on the calling thread.
    Cpu,
    /// Blocks are multiplied concurrently on a pool with the given number of threads.
    Threads(usize),
}

enum Executor {
    Sequential,
    Pooled(Pool),
}

/// A contiguous range of rows of the normalized operator.
#[derive(Clone, Debug)]
pub struct OperatorBlock {
    rows: Range<usize>,
    matrix: CsMat<f32>,
}

impl OperatorBlock {

    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    pub fn matrix(&self) -> &CsMat<f32> {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.rows.end - self.rows.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The normalized operator as an ordered sequence of row blocks placed on a device. Each block
/// multiplies the full input and produces the output rows of its range.
pub struct PartitionedOperator {
    blocks: Vec<OperatorBlock>,
    num_rows: usize,
    num_cols: usize,
    device: Device,
    executor: Executor,
}

impl PartitionedOperator {

    pub fn blocks(&self) -> &[OperatorBlock] {
        &self.blocks
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Concatenates the blocks again, yielding the unpartitioned operator.
    pub fn assemble(&self) -> CsMat<f32> {
        let views: Vec<_> = self.blocks.iter().map(|block| block.matrix.view()).collect();
        sprs::vstack(&views)
    }
}

impl SparseOperator for PartitionedOperator {

    fn rows(&self) -> usize {
        self.num_rows
    }

    fn cols(&self) -> usize {
        self.num_cols
    }

    fn multiply(&self, dense: &Array2<f32>) -> Result<Array2<f32>> {
        if self.num_cols != dense.nrows() {
            return Err(Error::ShapeMismatch {
                operation: "partitioned multiply",
                left: (self.num_rows, self.num_cols),
                right: dense.dim(),
            });
        }

        let width = dense.ncols();
        let mut result = Array2::<f32>::zeros((self.num_rows, width));

        match self.executor {
            Executor::Sequential => {
                for block in self.blocks.iter() {
                    result.slice_mut(s![block.rows.clone(), ..]).assign(&(&block.matrix * dense));
                }
            },
            Executor::Pooled(ref pool) => {
                // Blocks are ordered and contiguous, so every block owns the next rows.
                let mut jobs = Vec::with_capacity(self.blocks.len());
                let mut remaining = result.view_mut();
                for block in self.blocks.iter() {
                    let (target, rest) = remaining.split_at(Axis(0), block.len());
                    jobs.push((block, target));
                    remaining = rest;
                }

                pool.scoped(|scope| {
                    for (block, mut target) in jobs.drain(..) {
                        scope.execute(move || target.assign(&(&block.matrix * dense)));
                    }
                });
            },
        }

        trace!(rows = self.num_rows, width, blocks = self.blocks.len(), "multiplied partitioned operator");

        Ok(result)
    }
}

impl Drop for PartitionedOperator {
    fn drop(&mut self) {
        if let Executor::Pooled(ref pool) = self.executor {
            pool.shutdown();
        }
    }
}

/// Splits a square operator into `split_num` row blocks. All blocks have `rows / split_num`
/// rows, except the last one which also takes the remainder.
pub struct HypergraphPartitioner {
    split_num: usize,
}

impl HypergraphPartitioner {

    pub fn new(split_num: usize) -> Result<Self> {
        if split_num < 1 {
            return invalid_config("split_num", "must be at least 1");
        }
        Ok(HypergraphPartitioner { split_num })
    }

    pub fn row_ranges(&self, num_rows: usize) -> Vec<Range<usize>> {
        let block_len = num_rows / self.split_num;
        (0..self.split_num)
            .map(|index| {
                let start = index * block_len;
                if index == self.split_num - 1 {
                    start..num_rows
                } else {
                    start..start + block_len
                }
            })
            .collect()
    }

    pub fn split(&self, operator: &CsMat<f32>, device: Device) -> Result<PartitionedOperator> {
        if !operator.is_csr() {
            return self.split(&operator.to_csr(), device);
        }

        let blocks: Vec<OperatorBlock> = self.row_ranges(operator.rows())
            .into_iter()
            .map(|rows| {
                let matrix = operator.slice_outer(rows.clone()).to_owned();
                debug!(start = rows.start, end = rows.end, nnz = matrix.nnz(), "placed operator block");
                OperatorBlock { rows, matrix }
            })
            .collect();

        let executor = match device {
            Device::Cpu => Executor::Sequential,
            Device::Threads(0) => return invalid_config("device", "thread count must be at least 1"),
            Device::Threads(num_threads) => Executor::Pooled(Pool::new(num_threads)),
        };

        Ok(PartitionedOperator {
            blocks,
            num_rows: operator.rows(),
            num_cols: operator.cols(),
            device,
            executor,
        })
    }
}

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

extern crate csv;
extern crate fnv;
extern crate ndarray;
extern crate rand;
extern crate rand_distr;
extern crate rand_xorshift;
extern crate scoped_pool;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate sprs;
extern crate thiserror;
extern crate tracing;

use std::time::Instant;

use tracing::info;

pub mod config;
pub mod dense;
pub mod dropout;
pub mod error;
pub mod hypergraph;
pub mod io;
pub mod model;
pub mod partition;
pub mod recommend;
pub mod similarity;
pub mod sparse;
pub mod types;

pub use config::ModelConfig;
pub use error::{Error, Result};
pub use model::{Batch, ForwardOutput, HypergraphModel, Parameters, Propagated};
pub use partition::{Device, PartitionedOperator};
pub use types::{Dimensions, RawRelations, Relation};

use hypergraph::HypergraphBuilder;
use partition::HypergraphPartitioner;

/// Turns the raw relations into the partitioned propagation operator: builds the hypergraph
/// incidence matrix, normalizes it and splits the result into row blocks placed on the
/// configured device. Runs once per model.
pub fn build_operator(relations: &RawRelations, config: &ModelConfig) -> Result<PartitionedOperator> {
    config.validate()?;

    let start = Instant::now();

    let hypergraph = HypergraphBuilder::new(config.threshold).build(relations)?;
    let built = start.elapsed().as_millis();

    let normalized = hypergraph.normalize();
    let normalized_at = start.elapsed().as_millis();

    let operator = HypergraphPartitioner::new(config.split_num)?.split(&normalized, config.device)?;

    info!(
        nnz = normalized.nnz(),
        split_num = config.split_num,
        device = ?config.device,
        build_ms = built as u64,
        normalize_ms = (normalized_at - built) as u64,
        total_ms = start.elapsed().as_millis() as u64,
        "built propagation operator"
    );

    Ok(operator)
}

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

// Construction and normalization of the user-bundle-item hypergraph.
//
// Nodes are users followed by bundles. Hyperedges are items (grouping the users and
// bundles that contain them), followed by one hyperedge per user and one per bundle that
// group their similar users and interacting bundles:
//
// ```text
//            items         users              bundles
// users   [ user_item    | user_sim         | user_bundle ]
// bundles [ bundle_item  | user_bundle^T    | bundle_sim  ]
// ```

use sprs::CsMat;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::similarity::RelationSimilarizer;
use crate::sparse;
use crate::types::{Dimensions, RawRelations};

/// Keeps degree-0 rows and columns from dividing by zero.
pub const EPSILON: f64 = 1e-8;

/// The incidence matrix H of the hypergraph, rows are nodes, columns are hyperedges.
#[derive(Clone, Debug)]
pub struct Hypergraph {
    incidence: CsMat<f32>,
    dimensions: Dimensions,
}

impl Hypergraph {

    pub fn incidence(&self) -> &CsMat<f32> {
        &self.incidence
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn num_nodes(&self) -> usize {
        self.incidence.rows()
    }

    /// Symmetrically normalized convolution operator of this hypergraph.
    pub fn normalize(&self) -> CsMat<f32> {
        normalize(&self.incidence)
    }
}

pub struct HypergraphBuilder {
    similarizer: RelationSimilarizer,
}

impl HypergraphBuilder {

    pub fn new(threshold: u32) -> Self {
        HypergraphBuilder { similarizer: RelationSimilarizer::new(threshold) }
    }

    pub fn build(&self, relations: &RawRelations) -> Result<Hypergraph> {
        let dimensions = relations.dimensions()?;
        relations.check_values()?;

        info!(
            num_users = dimensions.num_users,
            num_bundles = dimensions.num_bundles,
            num_items = dimensions.num_items,
            user_item_nnz = relations.user_item.nnz(),
            bundle_item_nnz = relations.bundle_item.nnz(),
            user_bundle_nnz = relations.user_bundle.nnz(),
            "building hypergraph"
        );

        let similarities = self.similarizer.similarize(&relations.user_bundle)?;

        debug!(
            threshold = self.similarizer.threshold(),
            user_similarity_nnz = similarities.users.nnz(),
            bundle_similarity_nnz = similarities.bundles.nnz(),
            "derived similarity relations"
        );

        let item_block = sparse::vstack(&relations.user_item, &relations.bundle_item)?;

        let bundle_user = sparse::transpose(&relations.user_bundle);
        let user_edges = sparse::vstack(&similarities.users, &bundle_user)?;
        let bundle_edges = sparse::vstack(&relations.user_bundle, &similarities.bundles)?;
        let bound_block = sparse::hstack(&user_edges, &bundle_edges)?;

        let incidence = sparse::hstack(&item_block, &bound_block)?;

        let num_nodes = dimensions.num_users + dimensions.num_bundles;
        let num_hyperedges = dimensions.num_items + num_nodes;
        if incidence.shape() != (num_nodes, num_hyperedges) {
            return Err(Error::ShapeMismatch {
                operation: "hypergraph incidence",
                left: incidence.shape(),
                right: (num_nodes, num_hyperedges),
            });
        }

        info!(num_nodes, num_hyperedges, nnz = incidence.nnz(), "built incidence matrix");

        Ok(Hypergraph { incidence, dimensions })
    }
}

/// Computes D_v · H · D_e · Hᵀ · D_v, with D_v and D_e the inverse square roots of the node and
/// hyperedge degrees. The result maps node vectors to node vectors. No symmetry is enforced on
/// the result.
pub fn normalize(incidence: &CsMat<f32>) -> CsMat<f32> {
    let node_factors = sparse::diagonal(&inverse_sqrt_degrees(&sparse::row_sums(incidence)));
    let edge_factors = sparse::diagonal(&inverse_sqrt_degrees(&sparse::col_sums(incidence)));

    // D_v · H
    let left = &node_factors * incidence;
    // (D_v · H · D_e) · (D_v · H)ᵀ
    let operator = &(&left * &edge_factors) * &sparse::transpose(&left);

    debug!(
        rows = operator.rows(),
        cols = operator.cols(),
        nnz = operator.nnz(),
        "normalized hypergraph"
    );

    operator
}

fn inverse_sqrt_degrees(degrees: &[f64]) -> Vec<f32> {
    degrees.iter()
        .map(|degree| (1.0 / (degree.sqrt() + EPSILON)) as f32)
        .collect()
}

#[cfg(test)]
mod tests {

    use ndarray::{arr2, Array2};
    use sprs::CsMat;

    use crate::error::Error;
    use crate::sparse::from_triplets;
    use crate::types::RawRelations;
    use super::{normalize, HypergraphBuilder, EPSILON};

    fn close_enough_to(value: f32, expected: f32) -> bool {
        (value - expected).abs() < 1e-5
    }

    fn scenario() -> RawRelations {
        RawRelations::new(
            from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]).unwrap(),
            from_triplets(2, 2, &[(0, 0, 1.0), (0, 1, 1.0)]).unwrap(),
            from_triplets(2, 2, &[(0, 0, 2.0), (1, 1, 20.0)]).unwrap(),
        ).unwrap()
    }

    #[test]
    fn block_layout() {
        let hypergraph = HypergraphBuilder::new(10).build(&scenario()).unwrap();
        let incidence = hypergraph.incidence();

        assert!(incidence.is_csr());
        assert_eq!(incidence.shape(), (4, 6));
        assert_eq!(hypergraph.num_nodes(), 4);

        let expected: Array2<f32> = arr2(&[
            // items     | user sim  | user-bundle
            [1.0, 0.0,   0.0, 0.0,   2.0, 0.0],
            [0.0, 1.0,   0.0, 1.0,   0.0, 20.0],
            // items     | bundle-user | bundle sim
            [1.0, 1.0,   2.0, 0.0,   0.0, 0.0],
            [0.0, 0.0,   0.0, 20.0,  0.0, 1.0],
        ]);
        assert_eq!(incidence.to_dense(), expected);
    }

    #[test]
    fn mismatching_relations_abort_the_build() {
        let relations = RawRelations {
            user_item: from_triplets(2, 2, &[]).unwrap(),
            bundle_item: from_triplets(3, 2, &[]).unwrap(),
            user_bundle: from_triplets(2, 2, &[]).unwrap(),
        };
        assert!(HypergraphBuilder::new(10).build(&relations).is_err());
    }

    #[test]
    fn negative_counts_abort_the_build() {
        // Bypasses the checks of RawRelations::new.
        let relations = RawRelations {
            user_item: from_triplets(2, 2, &[(0, 0, -1.0)]).unwrap(),
            ..scenario()
        };
        match HypergraphBuilder::new(10).build(&relations) {
            Err(Error::NegativeValue { relation, .. }) => assert_eq!(relation, "user_item"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    /// D_v · H · D_e · Hᵀ · D_v with plain dense loops.
    fn normalize_dense(incidence: &Array2<f32>) -> Vec<Vec<f32>> {
        let (nodes, edges) = incidence.dim();
        let node_degree: Vec<f64> = (0..nodes)
            .map(|v| (0..edges).map(|e| incidence[[v, e]] as f64).sum())
            .collect();
        let edge_degree: Vec<f64> = (0..edges)
            .map(|e| (0..nodes).map(|v| incidence[[v, e]] as f64).sum())
            .collect();

        let mut result = vec![vec![0.0f32; nodes]; nodes];
        for a in 0..nodes {
            for b in 0..nodes {
                let mut sum = 0.0f64;
                for e in 0..edges {
                    sum += incidence[[a, e]] as f64 * incidence[[b, e]] as f64
                        / (edge_degree[e].sqrt() + EPSILON);
                }
                result[a][b] = (sum / (node_degree[a].sqrt() + EPSILON)
                    / (node_degree[b].sqrt() + EPSILON)) as f32;
            }
        }
        result
    }

    #[test]
    fn normalization_matches_dense_arithmetic() {
        // 3 nodes, 2 hyperedges: row sums 3, 1, 2 and column sums 2, 4.
        let incidence = from_triplets(
            3, 2, &[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 1.0), (2, 1, 2.0)],
        ).unwrap();

        let operator = normalize(&incidence).to_dense();
        let expected = normalize_dense(&incidence.to_dense());

        assert_eq!(operator.dim(), (3, 3));
        for a in 0..3 {
            for b in 0..3 {
                assert!(close_enough_to(operator[[a, b]], expected[a][b]),
                    "entry ({}, {}): {} vs {}", a, b, operator[[a, b]], expected[a][b]);
            }
        }

        // (1/√3)·(1·1/√2 + 2·2/2)·(1/√3)
        let expected_00 = (1.0 / 2f32.sqrt() + 2.0) / 3.0;
        assert!(close_enough_to(operator[[0, 0]], expected_00));
    }

    #[test]
    fn zero_degrees_do_not_produce_nan() {
        // Node 1 and hyperedge 1 are isolated.
        let incidence = from_triplets(2, 2, &[(0, 0, 1.0)]).unwrap();

        let operator: CsMat<f32> = normalize(&incidence);

        assert!(operator.iter().all(|(value, _)| value.is_finite()));
        assert!(close_enough_to(operator.to_dense()[[0, 0]], 1.0));
        assert_eq!(operator.get(1, 1), None);
    }

    #[test]
    fn scenario_operator_is_square_over_nodes() {
        let hypergraph = HypergraphBuilder::new(10).build(&scenario()).unwrap();
        let operator = hypergraph.normalize();

        assert_eq!(operator.shape(), (4, 4));
        assert!(operator.iter().all(|(&value, _)| value.is_finite() && value >= 0.0));
    }
}

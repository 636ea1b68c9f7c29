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

// One-hop propagation over the partitioned hypergraph operator and scoring of user-bundle
// pairs. The learnable buffers are plain matrices, gradients and their application are left
// to the surrounding training code, which mutates the buffers between calls.


use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2, Axis};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use tracing::{info, trace};

use crate::config::ModelConfig;
use crate::dense;
use crate::dropout::{BernoulliDropout, DropoutMask, Mode};
use crate::error::{Error, Result};
use crate::partition::PartitionedOperator;
use crate::sparse::SparseOperator;
use crate::types::{Dimensions, RawRelations};

/// Learnable buffers of the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// |U| x d
    pub users_feature: Array2<f32>,
    /// |B| x d
    pub bundles_feature: Array2<f32>,
    /// d x 1, maps a user feature to its score bound
    pub user_bound: Array2<f32>,
}

impl Parameters {

    /// Draws all buffers from N(0, 0.5 / d).
    pub fn init(dimensions: Dimensions, emb_size: usize, seed: u64) -> Result<Self> {
        let mut rng = XorShiftRng::seed_from_u64(seed);
        let std = 0.5 / emb_size as f32;

        Ok(Parameters {
            users_feature: dense::random_normal(dimensions.num_users, emb_size, std, &mut rng)?,
            bundles_feature: dense::random_normal(dimensions.num_bundles, emb_size, std, &mut rng)?,
            user_bound: dense::random_normal(emb_size, 1, std, &mut rng)?,
        })
    }

    fn check(&self, dimensions: Dimensions, emb_size: usize) -> Result<()> {
        check_shape("users_feature", "num_users", &self.users_feature, (dimensions.num_users, emb_size))?;
        check_shape("bundles_feature", "num_bundles", &self.bundles_feature, (dimensions.num_bundles, emb_size))?;
        check_shape("user_bound", "emb_size", &self.user_bound, (emb_size, 1))
    }
}

fn check_shape(
    relation: &'static str,
    dimension: &'static str,
    matrix: &Array2<f32>,
    expected: (usize, usize),
) -> Result<()> {
    if matrix.nrows() != expected.0 {
        return Err(Error::DimensionMismatch { relation, dimension, expected: expected.0, got: matrix.nrows() });
    }
    if matrix.ncols() != expected.1 {
        return Err(Error::DimensionMismatch { relation, dimension: "emb_size", expected: expected.1, got: matrix.ncols() });
    }
    Ok(())
}

/// Mutable views on the learnable buffers. Their shapes cannot be changed through them.
pub struct ParametersMut<'a> {
    pub users_feature: ArrayViewMut2<'a, f32>,
    pub bundles_feature: ArrayViewMut2<'a, f32>,
    pub user_bound: ArrayViewMut2<'a, f32>,
}

/// Propagated user and bundle features. Row i always belongs to user i (bundle i).
#[derive(Clone, Debug, PartialEq)]
pub struct Propagated {
    pub users_feature: Array2<f32>,
    pub bundles_feature: Array2<f32>,
}

/// A training batch: every user comes with the same number of candidate bundles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub users: Vec<usize>,
    pub bundles: Vec<Vec<usize>>,
}

impl Batch {
    fn num_candidates(&self) -> Result<usize> {
        if self.bundles.len() != self.users.len() {
            return Err(Error::ShapeMismatch {
                operation: "batch",
                left: (self.users.len(), 1),
                right: (self.bundles.len(), 0),
            });
        }
        let num_candidates = self.bundles.first().map_or(0, |candidates| candidates.len());
        for candidates in self.bundles.iter() {
            if candidates.len() != num_candidates {
                return Err(Error::ShapeMismatch {
                    operation: "batch",
                    left: (self.users.len(), num_candidates),
                    right: (1, candidates.len()),
                });
            }
        }
        Ok(num_candidates)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForwardOutput {
    /// batch x candidates
    pub pred: Array2<f32>,
    /// batch x 1
    pub user_score_bound: Array2<f32>,
    pub reg_loss: f32,
}

pub struct HypergraphModel {
    dimensions: Dimensions,
    emb_size: usize,
    operator: Arc<PartitionedOperator>,
    parameters: Parameters,
    dropout: f32,
    l2_norm: f32,
    mode: Mode,
    sampler: Box<dyn DropoutMask + Send>,
}

impl HypergraphModel {

    /// Builds, normalizes and partitions the hypergraph of the given relations and randomly
    /// initializes the embeddings. Starts out in training mode.
    pub fn new(relations: &RawRelations, config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        let dimensions = relations.dimensions()?;
        let operator = crate::build_operator(relations, config)?;
        HypergraphModel::with_operator(dimensions, Arc::new(operator), config)
    }

    /// Uses an already partitioned operator, which may be shared between models.
    pub fn with_operator(
        dimensions: Dimensions,
        operator: Arc<PartitionedOperator>,
        config: &ModelConfig,
    ) -> Result<Self> {
        config.validate()?;

        let num_nodes = dimensions.num_users + dimensions.num_bundles;
        if operator.rows() != num_nodes || operator.cols() != num_nodes {
            return Err(Error::ShapeMismatch {
                operation: "propagation operator",
                left: (operator.rows(), operator.cols()),
                right: (num_nodes, num_nodes),
            });
        }

        let parameters = Parameters::init(dimensions, config.emb_size, config.seed)?;

        info!(
            num_users = dimensions.num_users,
            num_bundles = dimensions.num_bundles,
            emb_size = config.emb_size,
            dropout = config.dropout,
            l2_norm = config.l2_norm,
            "initialized hypergraph model"
        );

        Ok(HypergraphModel {
            dimensions,
            emb_size: config.emb_size,
            operator,
            parameters,
            dropout: config.dropout,
            l2_norm: config.l2_norm,
            mode: Mode::Train,
            sampler: Box::new(BernoulliDropout::new(config.seed)),
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn emb_size(&self) -> usize {
        self.emb_size
    }

    pub fn operator(&self) -> &Arc<PartitionedOperator> {
        &self.operator
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn train(&mut self) {
        self.mode = Mode::Train;
    }

    pub fn eval(&mut self) {
        self.mode = Mode::Eval;
    }

    pub fn set_sampler(&mut self, sampler: Box<dyn DropoutMask + Send>) {
        self.sampler = sampler;
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> ParametersMut<'_> {
        ParametersMut {
            users_feature: self.parameters.users_feature.view_mut(),
            bundles_feature: self.parameters.bundles_feature.view_mut(),
            user_bound: self.parameters.user_bound.view_mut(),
        }
    }

    /// Replaces all buffers, e.g. with trained ones. Their shapes have to match the model.
    pub fn load_parameters(&mut self, parameters: Parameters) -> Result<()> {
        parameters.check(self.dimensions, self.emb_size)?;
        self.parameters = parameters;
        Ok(())
    }

    /// One hop over the hypergraph, averaged with the unpropagated embeddings. Dropout is only
    /// applied to the propagated term, and only in training mode.
    pub fn propagate(&mut self) -> Result<Propagated> {
        let (embed_0, mut embed_1) = self.hop()?;
        if self.mode == Mode::Train {
            self.sampler.mask(&mut embed_1, self.dropout);
        }
        self.combine(embed_0, embed_1)
    }

    /// Propagation without dropout, regardless of the mode. Only needs a shared reference, so
    /// evaluation passes can run against the same model.
    pub fn propagate_eval(&self) -> Result<Propagated> {
        let (embed_0, embed_1) = self.hop()?;
        self.combine(embed_0, embed_1)
    }

    fn hop(&self) -> Result<(Array2<f32>, Array2<f32>)> {
        let embed_0 = ndarray::concatenate(
            Axis(0),
            &[self.parameters.users_feature.view(), self.parameters.bundles_feature.view()],
        )?;
        let embed_1 = self.operator.multiply(&embed_0)?;
        Ok((embed_0, embed_1))
    }

    fn combine(&self, embed_0: Array2<f32>, embed_1: Array2<f32>) -> Result<Propagated> {
        let mut all_embeds = embed_0;
        all_embeds *= 0.5;
        all_embeds.scaled_add(0.5, &embed_1);

        let (users_feature, bundles_feature) = all_embeds.view()
            .split_at(Axis(0), self.dimensions.num_users);

        trace!(mode = ?self.mode, "propagated embeddings");

        Ok(Propagated {
            users_feature: users_feature.to_owned(),
            bundles_feature: bundles_feature.to_owned(),
        })
    }

    /// Row-wise dot products of two equally shaped matrices, one score per pair of rows.
    pub fn predict(&self, users_feature: ArrayView2<f32>, bundles_feature: ArrayView2<f32>) -> Result<Array1<f32>> {
        if users_feature.dim() != bundles_feature.dim() {
            return Err(Error::ShapeMismatch {
                operation: "predict",
                left: users_feature.dim(),
                right: bundles_feature.dim(),
            });
        }
        Ok((&users_feature * &bundles_feature).sum_axis(Axis(1)))
    }

    /// λ · (‖users_feature‖² + ‖bundles_feature‖²)
    pub fn regularize(&self, users_feature: &Array2<f32>, bundles_feature: &Array2<f32>) -> f32 {
        self.l2_norm * (dense::sum_of_squares(users_feature) + dense::sum_of_squares(bundles_feature))
    }

    /// Scores every candidate bundle of the batch for its user. The L2 penalty only covers the
    /// rows the batch touches.
    pub fn forward(&mut self, batch: &Batch) -> Result<ForwardOutput> {
        let num_candidates = batch.num_candidates()?;
        let propagated = self.propagate()?;

        let expanded_users: Vec<usize> = batch.users.iter()
            .flat_map(|&user| std::iter::repeat(user).take(num_candidates))
            .collect();
        let flat_bundles: Vec<usize> = batch.bundles.iter().flatten().cloned().collect();

        let users_embedding = dense::gather_rows(&propagated.users_feature, &expanded_users, "user")?;
        let bundles_embedding = dense::gather_rows(&propagated.bundles_feature, &flat_bundles, "bundle")?;

        let pred = self.predict(users_embedding.view(), bundles_embedding.view())?
            .into_shape((batch.users.len(), num_candidates))?;

        let batch_users = dense::gather_rows(&propagated.users_feature, &batch.users, "user")?;
        let reg_loss = self.regularize(&batch_users, &bundles_embedding);

        let user_score_bound = batch_users.dot(&self.parameters.user_bound);

        Ok(ForwardOutput { pred, user_score_bound, reg_loss })
    }

    /// Scores the given users against every bundle, yielding a users x |B| matrix.
    pub fn evaluate(&self, propagated: &Propagated, users: &[usize]) -> Result<Array2<f32>> {
        let users_feature = dense::gather_rows(&propagated.users_feature, users, "user")?;
        dense::pairwise_dots(users_feature.view(), propagated.bundles_feature.view())
    }
}

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

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fnv::FnvHashSet;
use ndarray::ArrayView1;

use crate::error::{Error, Result};
use crate::model::{HypergraphModel, Propagated};
use crate::types::Relation;

/// Result type used to find the top-k bundles per user via a binary heap
#[derive(PartialEq, Debug)]
struct ScoredBundle {
    bundle: usize,
    score: f32,
}

/// Ordering for our max-heap, which keeps the worst of the current top-k bundles on top. A
/// bundle is worse if it has a lower score, or the same score and a higher id. There is no total
/// order on floating point numbers, incomparable scores count as equal.
fn cmp_reverse(a: &ScoredBundle, b: &ScoredBundle) -> Ordering {
    match a.score.partial_cmp(&b.score) {
        Some(Ordering::Less) => Ordering::Greater,
        Some(Ordering::Greater) => Ordering::Less,
        _ => a.bundle.cmp(&b.bundle),
    }
}

impl Eq for ScoredBundle {}

impl Ord for ScoredBundle {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredBundle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}

/// Returns the ids of the `k` highest scoring bundles in descending order of score, skipping
/// the bundles in `exclude`.
pub fn top_k_bundles(scores: ArrayView1<f32>, k: usize, exclude: &FnvHashSet<usize>) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap = BinaryHeap::with_capacity(k);

    for (bundle, &score) in scores.iter().enumerate() {
        if exclude.contains(&bundle) || score.is_nan() {
            continue;
        }

        let scored_bundle = ScoredBundle { bundle, score };

        if heap.len() < k {
            heap.push(scored_bundle);
        } else if let Some(mut top) = heap.peek_mut() {
            if scored_bundle < *top {
                *top = scored_bundle;
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|scored_bundle| scored_bundle.bundle)
        .collect()
}

/// Ranks all bundles for the given users, leaving out the bundles each user already
/// interacted with according to `history`.
pub fn recommend(
    model: &HypergraphModel,
    propagated: &Propagated,
    users: &[usize],
    num_bundles_to_recommend: usize,
    history: &Relation,
) -> Result<Vec<Vec<usize>>> {

    if !history.is_csr() {
        return recommend(model, propagated, users, num_bundles_to_recommend, &history.to_csr());
    }

    let scores = model.evaluate(propagated, users)?;

    users.iter()
        .enumerate()
        .map(|(position, &user)| {
            let seen: FnvHashSet<usize> = match history.outer_view(user) {
                Some(bundles) => bundles.indices().iter().cloned().collect(),
                None => {
                    return Err(Error::IndexOutOfRange { kind: "user", index: user, bound: history.rows() })
                },
            };
            Ok(top_k_bundles(scores.row(position), num_bundles_to_recommend, &seen))
        })
        .collect()
}

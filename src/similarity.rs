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

use sprs::TriMat;

use crate::error::Result;
use crate::sparse;
use crate::types::Relation;

/// Binary user-user and bundle-bundle relations derived from co-interactions.
#[derive(Clone, Debug)]
pub struct SimilarityRelations {
    pub users: Relation,
    pub bundles: Relation,
}

/// Derives similarity relations from the user-bundle relation: two users are similar if
/// they co-interacted with bundles more than `threshold` times, two bundles are similar if
/// they share more than `threshold` interactions.
pub struct RelationSimilarizer {
    threshold: u32,
}

impl RelationSimilarizer {

    pub fn new(threshold: u32) -> Self {
        RelationSimilarizer { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn similarize(&self, user_bundle: &Relation) -> Result<SimilarityRelations> {
        let bundle_user = sparse::transpose(user_bundle);

        let user_cooccurrences = sparse::product(user_bundle, &bundle_user)?;
        let bundle_cooccurrences = sparse::product(&bundle_user, user_bundle)?;

        Ok(SimilarityRelations {
            users: self.binarize(&user_cooccurrences),
            bundles: self.binarize(&bundle_cooccurrences),
        })
    }

    /// Only stored co-occurrence counts are inspected, counts <= threshold are dropped.
    pub fn binarize(&self, cooccurrences: &Relation) -> Relation {
        let threshold = self.threshold as f32;
        let mut binarized = TriMat::new(cooccurrences.shape());
        for (&count, (row, col)) in cooccurrences.iter() {
            if count > threshold {
                binarized.add_triplet(row, col, 1.0);
            }
        }
        binarized.to_csr()
    }
}

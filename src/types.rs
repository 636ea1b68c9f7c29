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

use sprs::CsMat;

use crate::error::{Error, Result};

/// Nonnegative sparse interaction counts between two kinds of entities, in CSR storage.
pub type Relation = CsMat<f32>;

/// The three observed interaction relations the hypergraph is built from.
#[derive(Clone, Debug)]
pub struct RawRelations {
    pub user_item: Relation,
    pub bundle_item: Relation,
    pub user_bundle: Relation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub num_users: usize,
    pub num_bundles: usize,
    pub num_items: usize,
}

impl RawRelations {

    pub fn new(user_item: Relation, bundle_item: Relation, user_bundle: Relation) -> Result<Self> {
        let relations = RawRelations { user_item, bundle_item, user_bundle };
        relations.dimensions()?;
        relations.check_values()?;
        Ok(relations)
    }

    /// |U| and |B| are read from the user-bundle relation, |I| from the user-item relation,
    /// every other side needs to agree with them.
    pub fn dimensions(&self) -> Result<Dimensions> {
        let (num_users, num_bundles) = self.user_bundle.shape();
        let num_items = self.user_item.cols();

        check("user_item", "num_users", num_users, self.user_item.rows())?;
        check("bundle_item", "num_bundles", num_bundles, self.bundle_item.rows())?;
        check("bundle_item", "num_items", num_items, self.bundle_item.cols())?;

        Ok(Dimensions { num_users, num_bundles, num_items })
    }

    /// Rejects negative (and NaN) interaction counts.
    pub fn check_values(&self) -> Result<()> {
        check_nonnegative("user_item", &self.user_item)?;
        check_nonnegative("bundle_item", &self.bundle_item)?;
        check_nonnegative("user_bundle", &self.user_bundle)
    }
}

fn check(relation: &'static str, dimension: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::DimensionMismatch { relation, dimension, expected, got });
    }
    Ok(())
}

fn check_nonnegative(relation: &'static str, values: &Relation) -> Result<()> {
    match values.iter().find(|&(&value, _)| !(value >= 0.0)) {
        Some((&value, (row, col))) => Err(Error::NegativeValue { relation, row, col, value }),
        None => Ok(()),
    }
}

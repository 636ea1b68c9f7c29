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

use std::io;

use thiserror::Error;

/// Everything that can go wrong while building the hypergraph or scoring with it.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw relations disagree on the number of users, bundles or items.
    #[error("dimension mismatch in {relation}: expected {dimension} = {expected}, got {got}")]
    DimensionMismatch {
        relation: &'static str,
        dimension: &'static str,
        expected: usize,
        got: usize,
    },

    /// Interaction counts have to be nonnegative, degrees are square rooted later on.
    #[error("{relation} holds the negative value {value} at ({row}, {col})")]
    NegativeValue {
        relation: &'static str,
        row: usize,
        col: usize,
        value: f32,
    },

    #[error("invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// A batch referenced a user or bundle that does not exist.
    #[error("{kind} index {index} out of range (must be < {bound})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("shape mismatch in {operation}: {left:?} vs {right:?}")]
    ShapeMismatch {
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("malformed input in {path}, line {line}: {reason}")]
    MalformedInput {
        path: String,
        line: u64,
        reason: String,
    },

    #[error("array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn invalid_config<T>(field: &'static str, reason: impl Into<String>) -> Result<T> {
    Err(Error::InvalidConfiguration { field, reason: reason.into() })
}

#[cfg(test)]
mod tests {

    use super::Error;

    #[test]
    fn messages_name_the_culprit() {
        let mismatch = Error::DimensionMismatch {
            relation: "bundle_item",
            dimension: "num_items",
            expected: 5,
            got: 4,
        };
        let message = mismatch.to_string();
        assert!(message.contains("bundle_item"));
        assert!(message.contains("num_items"));

        let config = Error::InvalidConfiguration {
            field: "split_num",
            reason: String::from("must be at least 1"),
        };
        assert!(config.to_string().contains("split_num"));
    }
}

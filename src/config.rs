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

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{invalid_config, Result};
use crate::partition::Device;

pub const DEFAULT_THRESHOLD: u32 = 10;
pub const DEFAULT_SPLIT_NUM: usize = 16;
pub const DEFAULT_EMB_SIZE: usize = 64;

/// Construction-time settings of the hypergraph model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Where the partitioned operator is multiplied.
    pub device: Device,
    /// Dropout probability for the propagated term, in [0, 1).
    pub dropout: f32,
    /// Coefficient of the L2 penalty.
    pub l2_norm: f32,
    /// Embedding dimension d.
    pub emb_size: usize,
    /// Co-occurrence count a user or bundle pair has to exceed to become similar.
    pub threshold: u32,
    /// Number of row blocks of the normalized operator.
    pub split_num: usize,
    /// Seeds both the embedding initialization and the dropout sampler.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            device: Device::Cpu,
            dropout: 0.0,
            l2_norm: 0.0,
            emb_size: DEFAULT_EMB_SIZE,
            threshold: DEFAULT_THRESHOLD,
            split_num: DEFAULT_SPLIT_NUM,
            seed: 0,
        }
    }
}

impl ModelConfig {

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: ModelConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.split_num < 1 {
            return invalid_config("split_num", "must be at least 1");
        }
        if !(self.dropout >= 0.0 && self.dropout < 1.0) {
            return invalid_config("dropout", format!("{} is not in [0, 1)", self.dropout));
        }
        if !(self.l2_norm >= 0.0 && self.l2_norm.is_finite()) {
            return invalid_config("l2_norm", format!("{} is not a finite value >= 0", self.l2_norm));
        }
        if self.emb_size < 1 {
            return invalid_config("emb_size", "must be at least 1");
        }
        if let Device::Threads(0) = self.device {
            return invalid_config("device", "thread count must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use crate::error::Error;
    use crate::partition::Device;
    use super::ModelConfig;

    fn rejected_field(config: ModelConfig) -> &'static str {
        match config.validate() {
            Err(Error::InvalidConfiguration { field, .. }) => field,
            other => panic!("expected an invalid configuration, got {:?}", other),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.threshold, 10);
        assert_eq!(config.split_num, 16);
    }

    #[test]
    fn invalid_fields_are_named() {
        assert_eq!(rejected_field(ModelConfig { split_num: 0, ..Default::default() }), "split_num");
        assert_eq!(rejected_field(ModelConfig { dropout: 1.0, ..Default::default() }), "dropout");
        assert_eq!(rejected_field(ModelConfig { dropout: -0.1, ..Default::default() }), "dropout");
        assert_eq!(rejected_field(ModelConfig { l2_norm: -1.0, ..Default::default() }), "l2_norm");
        assert_eq!(rejected_field(ModelConfig { emb_size: 0, ..Default::default() }), "emb_size");
        assert_eq!(
            rejected_field(ModelConfig { device: Device::Threads(0), ..Default::default() }),
            "device"
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"dropout": 0.2, "device": {"threads": 4}}"#).unwrap();

        assert_eq!(config.dropout, 0.2);
        assert_eq!(config.device, Device::Threads(4));
        assert_eq!(config.emb_size, 64);

        let negative: Result<ModelConfig, _> = serde_json::from_str(r#"{"threshold": -1}"#);
        assert!(negative.is_err());
    }
}

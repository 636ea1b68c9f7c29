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
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

/// Whether stochastic regularization is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// Randomly zeroes entries of a matrix with the given probability.
pub trait DropoutMask {
    fn mask(&mut self, values: &mut Array2<f32>, probability: f32);
}

/// Inverted dropout: dropped entries become zero, kept entries are scaled by 1 / (1 - p) so
/// that the expected value of every entry stays the same.
pub struct BernoulliDropout {
    rng: XorShiftRng,
}

impl BernoulliDropout {
    pub fn new(seed: u64) -> Self {
        BernoulliDropout { rng: XorShiftRng::seed_from_u64(seed) }
    }
}

impl DropoutMask for BernoulliDropout {
    fn mask(&mut self, values: &mut Array2<f32>, probability: f32) {
        if probability <= 0.0 {
            return;
        }
        let keep_scale = 1.0 / (1.0 - probability);
        let rng = &mut self.rng;
        values.mapv_inplace(|value| {
            if rng.gen::<f32>() < probability {
                0.0
            } else {
                value * keep_scale
            }
        });
    }
}

#[cfg(test)]
mod tests {

    use ndarray::{arr2, Array2};

    use super::{BernoulliDropout, DropoutMask};

    #[test]
    fn zero_probability_keeps_everything() {
        let original = arr2(&[[1.0, 2.0], [3.0, 4.0]]);

        let mut masked = original.clone();
        BernoulliDropout::new(3).mask(&mut masked, 0.0);
        assert_eq!(masked, original);
    }

    #[test]
    fn kept_entries_are_rescaled() {
        let mut values = Array2::from_elem((100, 10), 1.0);

        BernoulliDropout::new(42).mask(&mut values, 0.5);

        let dropped = values.iter().filter(|&&value| value == 0.0).count();
        assert!(values.iter().all(|&value| value == 0.0 || value == 2.0));
        assert!(dropped > 350 && dropped < 650, "dropped {} of 1000", dropped);
    }
}

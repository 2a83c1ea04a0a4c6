use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::{DatasetError, Result};

/// Randomly split `items` into train and validation sets.
///
/// The train set holds `floor(len * fraction)` items. With a seed the split
/// is reproducible. Both halves come back sorted.
pub fn split_train_val<T: Clone + Ord>(
    items: &[T],
    fraction: f64,
    seed: Option<u64>,
) -> Result<(Vec<T>, Vec<T>)> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(DatasetError::InvalidSplit(fraction));
    }

    let mut shuffled = items.to_vec();
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        shuffled.shuffle(&mut rng);
    } else {
        let mut rng = rand::rng();
        shuffled.shuffle(&mut rng);
    }

    let train_len = ((items.len() as f64) * fraction).floor() as usize;
    let mut val = shuffled.split_off(train_len.min(shuffled.len()));
    let mut train = shuffled;

    train.sort();
    val.sort();
    Ok((train, val))
}

//! Stride transform between the `m`-major and `2d`-major layouts.
//!
//! Pure bookkeeping: elements are moved, never copied or combined.

use crate::error::{Error, Result};

fn split_shape(len: usize, d: usize) -> Result<usize> {
  if d == 0 {
    return Err(Error::InvalidParameter {
      name: "d",
      reason: "stride must be positive".to_string(),
    });
  }
  if len % d != 0 {
    return Err(Error::DimensionMismatch {
      context: "rearrange length divisible by d",
      expected: (len / d + 1) * d,
      actual: len,
    });
  }
  Ok(len / d)
}

fn move_to<T>(seq: Vec<T>, target: impl Fn(usize) -> usize) -> Vec<T> {
  let mut out: Vec<Option<T>> = (0..seq.len()).map(|_| None).collect();
  for (i, x) in seq.into_iter().enumerate() {
    out[target(i)] = Some(x);
  }
  out.into_iter().flatten().collect()
}

/// Read `seq` as a row-major `d × (n/d)` matrix and return it column-major:
/// `out[j·d + i] = seq[i·(n/d) + j]`.
pub fn rearrange<T>(seq: Vec<T>, d: usize) -> Result<Vec<T>> {
  let m = split_shape(seq.len(), d)?;
  Ok(move_to(seq, |s| (s % m) * d + s / m))
}

/// Inverse of [`rearrange`]
pub fn reverse_rearrange<T>(seq: Vec<T>, d: usize) -> Result<Vec<T>> {
  let m = split_shape(seq.len(), d)?;
  Ok(move_to(seq, |s| (s % d) * m + s / d))
}

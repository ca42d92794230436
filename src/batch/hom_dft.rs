//! Recursive homomorphic inverse transform, Nussbaumer style.
//!
//! The recursion is written against [`SlotArithmetic`], the three slot-level
//! operations it needs. Packed ciphertexts implement it through rotation keys
//! and [`crate::batch::plain::PlainEvaluator`] implements it on cleartext
//! slot polynomials, which lets key generation compute the transform's
//! response without touching a ciphertext.

use crate::batch::matrix::{enc_vec_mat_mult, ExponentMatrix};
use crate::batch::rearrange::{rearrange, reverse_rearrange};
use crate::error::{ensure_len, Error, Result};
use crate::params::BatchParams;
use crate::parallel::{default_railgun, Railgun};
use tracing::{debug, instrument};

pub trait SlotArithmetic: Sync {
  type Slots: Clone + Send + Sync;

  fn params(&self) -> &BatchParams;

  /// Additive identity shaped like `like`
  fn zero_like(&self, like: &Self::Slots) -> Self::Slots;

  fn add_assign(&self, acc: &mut Self::Slots, rhs: &Self::Slots) -> Result<()>;

  /// Anti-cyclic rotation of the slots by `delta`
  fn anti_rotate(&self, x: &Self::Slots, delta: usize) -> Result<Self::Slots>;
}

/// Number of inputs `hom_dft_inverse` takes at depth `rho`: `(2d)^(rho-1)`
pub fn input_len(d: usize, rho: usize) -> Result<usize> {
  (2 * d)
    .checked_pow(rho.saturating_sub(1) as u32)
    .ok_or_else(|| Error::InvalidParameter {
      name: "rho",
      reason: format!("(2·{})^{} overflows", d, rho.saturating_sub(1)),
    })
}

/// Extend `inputs` with zeros up to the transform length `(2d)^(rho-1)`.
///
/// Padding is a separate, explicit step: [`hom_dft_inverse`] itself only
/// accepts exact lengths. At least one input is needed to shape the zeros.
pub fn pad_to_transform_len<E: SlotArithmetic>(
  engine: &E,
  mut inputs: Vec<E::Slots>,
) -> Result<Vec<E::Slots>> {
  let target = engine.params().transform_len();
  let Some(first) = inputs.first() else {
    return Err(Error::DimensionMismatch {
      context: "pad_to_transform_len needs an input",
      expected: target,
      actual: 0,
    });
  };
  if inputs.len() > target {
    return Err(Error::DimensionMismatch {
      context: "pad_to_transform_len input longer than transform",
      expected: target,
      actual: inputs.len(),
    });
  }
  let zero = engine.zero_like(first);
  inputs.resize(target, zero);
  Ok(inputs)
}

/// Homomorphic inverse transform of depth `rho`.
///
/// Takes exactly `(2d)^(rho-1)` inputs and returns `d^(rho-1)` outputs; depth
/// one and below returns the inputs unchanged. The `2d` recursive sub-calls
/// and the per-block matrix products run in parallel.
#[instrument(skip(engine, inputs), fields(len = inputs.len()))]
pub fn hom_dft_inverse<E: SlotArithmetic>(
  engine: &E,
  inputs: &[E::Slots],
  rho: usize,
) -> Result<Vec<E::Slots>> {
  if rho <= 1 {
    return Ok(inputs.to_vec());
  }
  let params = engine.params();
  let d = params.d;
  let dim = 2 * d;
  ensure_len("hom_dft_inverse input", input_len(d, rho)?, inputs.len())?;

  let railgun = default_railgun();
  let chunks: Vec<&[E::Slots]> = inputs.chunks(inputs.len() / dim).collect();
  let sub_results = railgun.par_try_map(&chunks, |chunk| hom_dft_inverse(engine, chunk, rho - 1))?;
  let combined: Vec<E::Slots> = sub_results.into_iter().flatten().collect();
  debug!(rho, combined = combined.len(), "sub-transforms joined");

  let rearranged = rearrange(combined, d)?;
  let matrix = ExponentMatrix::inverse_dft(dim);
  let blocks: Vec<&[E::Slots]> = rearranged.chunks(dim).collect();
  let transformed: Vec<E::Slots> = railgun
    .par_try_map(&blocks, |block| enc_vec_mat_mult(engine, &matrix, block))?
    .into_iter()
    .flatten()
    .collect();
  let back = reverse_rearrange(transformed, d)?;

  let half = back.len() / 2;
  let (lower, upper) = back.split_at(half);
  let rotation = params.combine_rotation(rho);
  let halved = railgun.par_try_map_range(half, |i| {
    let mut acc = lower[i].clone();
    let rotated = engine.anti_rotate(&upper[i], rotation)?;
    engine.add_assign(&mut acc, &rotated)?;
    Ok(acc)
  })?;

  reverse_rearrange(halved, d)
}

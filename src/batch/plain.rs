use crate::batch::hom_dft::{hom_dft_inverse, SlotArithmetic};
use crate::error::{ensure_len, Result};
use crate::params::BatchParams;

/// Cleartext slot vector, read as a polynomial in `Y` modulo `Y^r + 1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPolynomial {
  coeffs: Vec<i64>,
}

impl SlotPolynomial {
  pub fn zero(r: usize) -> Self {
    SlotPolynomial { coeffs: vec![0; r] }
  }

  /// `coeff·Y^a`, with `a` taken modulo `2r`
  pub fn monomial(r: usize, a: usize, coeff: i64) -> Self {
    let mut p = Self::zero(r);
    if let Some(c0) = p.coeffs.first_mut() {
      *c0 = coeff;
    }
    p.rotate(a)
  }

  pub fn from_slots(coeffs: Vec<i64>) -> Self {
    SlotPolynomial { coeffs }
  }

  pub fn coeffs(&self) -> &[i64] {
    &self.coeffs
  }

  pub fn r(&self) -> usize {
    self.coeffs.len()
  }

  pub fn is_zero(&self) -> bool {
    self.coeffs.iter().all(|&c| c == 0)
  }

  /// Non-zero terms as `(exponent, coefficient)`
  pub fn terms(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
    self
      .coeffs
      .iter()
      .enumerate()
      .filter(|&(_, &c)| c != 0)
      .map(|(a, &c)| (a, c))
  }

  /// Multiply by `Y^delta`
  pub fn rotate(&self, delta: usize) -> Self {
    let r = self.r();
    let mut out = Self::zero(r);
    if r == 0 {
      return out;
    }
    let delta = delta % (2 * r);
    for (j, &c) in self.coeffs.iter().enumerate() {
      let k = j + delta;
      if k < r {
        out.coeffs[k] += c;
      } else if k < 2 * r {
        out.coeffs[k - r] -= c;
      } else {
        out.coeffs[k - 2 * r] += c;
      }
    }
    out
  }
}

/// Cleartext evaluator for [`hom_dft_inverse`]
#[derive(Debug, Clone)]
pub struct PlainEvaluator {
  params: BatchParams,
}

impl PlainEvaluator {
  pub fn new(params: BatchParams) -> Self {
    PlainEvaluator { params }
  }
}

impl SlotArithmetic for PlainEvaluator {
  type Slots = SlotPolynomial;

  fn params(&self) -> &BatchParams {
    &self.params
  }

  fn zero_like(&self, like: &SlotPolynomial) -> SlotPolynomial {
    SlotPolynomial::zero(like.r())
  }

  fn add_assign(&self, acc: &mut SlotPolynomial, rhs: &SlotPolynomial) -> Result<()> {
    ensure_len("slot polynomial addition", acc.r(), rhs.r())?;
    for (x, y) in acc.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
      *x += y;
    }
    Ok(())
  }

  fn anti_rotate(&self, x: &SlotPolynomial, delta: usize) -> Result<SlotPolynomial> {
    Ok(x.rotate(delta))
  }
}

/// First output of the transform applied to a unit in slot 0 of the first
/// input. The transform is linear and slot-shift invariant, so any input
/// placed in the first ciphertext leaves it multiplied by this polynomial.
pub fn transform_response(params: &BatchParams) -> Result<SlotPolynomial> {
  let engine = PlainEvaluator::new(*params);
  let mut inputs = vec![SlotPolynomial::zero(params.r); params.transform_len()];
  if let Some(first) = inputs.first_mut() {
    *first = SlotPolynomial::monomial(params.r, 0, 1);
  }
  let outputs = hom_dft_inverse(&engine, &inputs, params.rho)?;
  Ok(
    outputs
      .into_iter()
      .next()
      .unwrap_or_else(|| SlotPolynomial::zero(params.r)),
  )
}

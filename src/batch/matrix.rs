use crate::batch::hom_dft::SlotArithmetic;
use crate::error::{ensure_len, Result};
use crate::parallel::{default_railgun, Railgun};

/// Square matrix of exponents of the primitive `dim`-th root `ω`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentMatrix {
  dim: usize,
  entries: Vec<usize>,
}

impl ExponentMatrix {
  /// `M[i][j] = -(i·j) mod dim`
  pub fn inverse_dft(dim: usize) -> Self {
    let entries = (0..dim * dim)
      .map(|idx| {
        let (i, j) = (idx / dim, idx % dim);
        (dim - i * j % dim) % dim
      })
      .collect();
    ExponentMatrix { dim, entries }
  }

  pub fn rows(&self) -> usize {
    self.dim
  }

  pub fn cols(&self) -> usize {
    self.dim
  }

  pub fn get(&self, i: usize, j: usize) -> usize {
    self.entries[i * self.dim + j]
  }

  pub fn row(&self, i: usize) -> &[usize] {
    &self.entries[i * self.dim..(i + 1) * self.dim]
  }
}

/// `out[i] = Σ_j ω^{M[i][j]}·c[j]`, with `ω^e` applied as an anti-cyclic
/// rotation by `e·2r/dim` slots. Output rows are evaluated in parallel.
pub fn enc_vec_mat_mult<E: SlotArithmetic>(
  engine: &E,
  m: &ExponentMatrix,
  c: &[E::Slots],
) -> Result<Vec<E::Slots>> {
  ensure_len("enc_vec_mat_mult matrix columns", m.cols(), c.len())?;
  let Some(first) = c.first() else {
    return Ok(Vec::new());
  };
  let step = 2 * engine.params().r / m.cols();

  default_railgun().par_try_map_range(m.rows(), |i| {
    let mut acc = engine.zero_like(first);
    for (&e, x) in m.row(i).iter().zip(c.iter()) {
      let rotated = engine.anti_rotate(x, e * step)?;
      engine.add_assign(&mut acc, &rotated)?;
    }
    Ok(acc)
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::batch::plain::{PlainEvaluator, SlotPolynomial};
  use crate::error::Error;
  use crate::params::{self, BatchParams};

  #[test]
  fn test_inverse_dft_exponents() {
    let m = ExponentMatrix::inverse_dft(4);
    assert_eq!(m.row(0), &[0, 0, 0, 0]);
    assert_eq!(m.row(1), &[0, 3, 2, 1]);
    assert_eq!(m.row(2), &[0, 2, 0, 2]);
    assert_eq!(m.row(3), &[0, 1, 2, 3]);
    assert_eq!(m.get(3, 3), 3);
    for i in 0..4 {
      for j in 0..4 {
        assert_eq!(m.get(i, j), m.get(j, i));
        assert_eq!((m.get(i, j) + i * j) % 4, 0);
      }
    }
  }

  #[test]
  fn test_enc_vec_mat_mult_in_the_clear() {
    let p = BatchParams::builder(2, 2)
      .security(params::TOY_N256)
      .build()
      .unwrap();
    let engine = PlainEvaluator::new(p);
    let r = p.r;
    let m = ExponentMatrix::inverse_dft(4);

    // A single unit in column 1 spreads as ω^{-i} over the rows
    let mut c = vec![SlotPolynomial::zero(r); 4];
    c[1] = SlotPolynomial::monomial(r, 0, 1);
    let out = enc_vec_mat_mult(&engine, &m, &c).unwrap();
    assert_eq!(out.len(), 4);
    let step = r / 2;
    assert_eq!(out[0], SlotPolynomial::monomial(r, 0, 1));
    // ω^3 = Y^{3r/2} = -Y^{r/2}
    assert_eq!(out[1], SlotPolynomial::monomial(r, step, -1));
    assert_eq!(out[2], SlotPolynomial::monomial(r, 0, -1));
    assert_eq!(out[3], SlotPolynomial::monomial(r, step, 1));
  }

  #[test]
  fn test_enc_vec_mat_mult_dimension_mismatch() {
    let p = BatchParams::builder(2, 2)
      .security(params::TOY_N256)
      .build()
      .unwrap();
    let engine = PlainEvaluator::new(p);
    let c = vec![SlotPolynomial::zero(p.r); 3];
    assert_eq!(
      enc_vec_mat_mult(&engine, &ExponentMatrix::inverse_dft(4), &c),
      Err(Error::DimensionMismatch {
        context: "enc_vec_mat_mult matrix columns",
        expected: 4,
        actual: 3
      })
    );
  }
}

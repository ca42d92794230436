use crate::fft::{fma_in_fd, FFTPlan, FFTProcessor};
use crate::key;
use crate::params::{Torus, TrgswParams, TORUS_SIZE, ZERO_TORUS};
use crate::trlwe;

/// TRGSW ciphertext of an integer polynomial `μ`
///
/// Row `i < L` is an encryption of zero with `μ·Bg^{-(i+1)}` added to `a`,
/// row `L + i` the same with it added to `b`. Integer coefficients are stored
/// as wrapping `u32`, so `-1` is `u32::MAX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TRGSWLv1 {
  pub trlwe: Vec<trlwe::TRLWELv1>,
}

impl TRGSWLv1 {
  /// The all-zero ciphertext, an exact additive identity
  pub fn zero(params: &TrgswParams) -> TRGSWLv1 {
    TRGSWLv1 {
      trlwe: vec![trlwe::TRLWELv1::new(params.n); params.l * 2],
    }
  }

  pub fn l(&self) -> usize {
    self.trlwe.len() / 2
  }

  pub fn encrypt_poly(
    mu: &[Torus],
    alpha: f64,
    key: &key::SecretKeyLv1,
    params: &TrgswParams,
    plan: &mut FFTPlan,
  ) -> Self {
    let plain_zero = vec![ZERO_TORUS; params.n];
    let mut trgsw = TRGSWLv1 {
      trlwe: (0..params.l * 2)
        .map(|_| trlwe::TRLWELv1::encrypt_torus(&plain_zero, alpha, key, plan))
        .collect(),
    };
    trgsw.add_gadget_message(mu, params);
    trgsw
  }

  /// Encrypt the constant polynomial `p`
  pub fn encrypt_torus(
    p: Torus,
    alpha: f64,
    key: &key::SecretKeyLv1,
    params: &TrgswParams,
    plan: &mut FFTPlan,
  ) -> Self {
    let mut mu = vec![ZERO_TORUS; params.n];
    mu[0] = p;
    Self::encrypt_poly(&mu, alpha, key, params, plan)
  }

  /// Noiseless ciphertext with zero mask. Decrypts to `μ` under every key.
  pub fn trivial(mu: &[Torus], params: &TrgswParams) -> Self {
    let mut trgsw = Self::zero(params);
    trgsw.add_gadget_message(mu, params);
    trgsw
  }

  fn add_gadget_message(&mut self, mu: &[Torus], params: &TrgswParams) {
    let l = params.l;
    for i in 0..l {
      let g = params.gadget(i);
      for (j, &m) in mu.iter().enumerate() {
        let v = m.wrapping_mul(g);
        self.trlwe[i].a[j] = self.trlwe[i].a[j].wrapping_add(v);
        self.trlwe[i + l].b[j] = self.trlwe[i + l].b[j].wrapping_add(v);
      }
    }
  }

  pub fn add_assign(&mut self, other: &TRGSWLv1) {
    for (row, other_row) in self.trlwe.iter_mut().zip(other.trlwe.iter()) {
      row.add_assign(other_row);
    }
  }

  pub fn mul_by_monomial(&self, k: usize) -> TRGSWLv1 {
    TRGSWLv1 {
      trlwe: self.trlwe.iter().map(|row| row.mul_by_monomial(k)).collect(),
    }
  }

  /// Decrypt `μ mod Bg`, centred in `[-Bg/2, Bg/2)`.
  ///
  /// Reads row `L`, which carries `μ` at the coarsest gadget scale and is
  /// therefore the most noise tolerant.
  pub fn decrypt_poly(
    &self,
    key: &key::SecretKeyLv1,
    params: &TrgswParams,
    plan: &mut FFTPlan,
  ) -> Vec<i64> {
    let shift = TORUS_SIZE as u32 - params.bgbit;
    let half = 1 << (shift - 1);
    self.trlwe[params.l]
      .phase(key, plan)
      .iter()
      .map(|&v| {
        let digit = (v.wrapping_add(half) >> shift) as i64;
        if digit >= (params.bg / 2) as i64 {
          digit - params.bg as i64
        } else {
          digit
        }
      })
      .collect()
  }
}

#[derive(Debug, Clone)]
pub struct TRGSWLv1FFT {
  pub trlwe_fft: Vec<trlwe::TRLWELv1FFT>,
}

impl TRGSWLv1FFT {
  pub fn new(trgsw: &TRGSWLv1, plan: &mut FFTPlan) -> TRGSWLv1FFT {
    TRGSWLv1FFT {
      trlwe_fft: trgsw
        .trlwe
        .iter()
        .map(|t| trlwe::TRLWELv1FFT::new(t, plan))
        .collect(),
    }
  }
}

/// Rounding offset that turns truncation into signed rounding in
/// [`decompose_poly`]: `Bg/2` at every level plus half a unit of the last one.
pub fn decomposition_offset(params: &TrgswParams) -> Torus {
  let mut offset: Torus = 0;
  for i in 0..params.l {
    offset = offset.wrapping_add((params.bg / 2).wrapping_mul(params.gadget(i)));
  }
  offset.wrapping_add(1 << (TORUS_SIZE as u32 - params.precision_bits() - 1))
}

/// Signed base-`Bg` digits of a torus polynomial, most significant level first
pub fn decompose_poly(poly: &[Torus], offset: Torus, params: &TrgswParams) -> Vec<Vec<Torus>> {
  let bgbit = params.bgbit;
  let mask: Torus = (1 << bgbit) - 1;
  let half_bg: Torus = 1 << (bgbit - 1);

  let mut res = vec![vec![ZERO_TORUS; poly.len()]; params.l];
  for (j, &x) in poly.iter().enumerate() {
    let tmp = x.wrapping_add(offset);
    for (i, digits) in res.iter_mut().enumerate() {
      let shift = TORUS_SIZE as u32 - (i as u32 + 1) * bgbit;
      digits[j] = ((tmp >> shift) & mask).wrapping_sub(half_bg);
    }
  }
  res
}

/// Digits of `a` (levels `0..L`) followed by digits of `b` (levels `L..2L`)
pub fn decomposition(trlwe: &trlwe::TRLWELv1, cloud_key: &key::CloudKey) -> Vec<Vec<Torus>> {
  let params = &cloud_key.params.trgsw_lv1;
  let offset = cloud_key.decomposition_offset;
  let mut res = decompose_poly(&trlwe.a, offset, params);
  res.extend(decompose_poly(&trlwe.b, offset, params));
  res
}

/// `TRGSW(μ) ⊡ TRLWE(m) = TRLWE(μ·m)`
pub fn external_product_with_fft(
  trgsw_fft: &TRGSWLv1FFT,
  trlwe: &trlwe::TRLWELv1,
  cloud_key: &key::CloudKey,
  plan: &mut FFTPlan,
) -> trlwe::TRLWELv1 {
  let dec = decomposition(trlwe, cloud_key);
  let n = trlwe.n();

  let mut out_a_fft = vec![0.0f64; n];
  let mut out_b_fft = vec![0.0f64; n];

  for (digit, row) in dec.iter().zip(trgsw_fft.trlwe_fft.iter()) {
    let dec_fft = plan.processor.ifft(digit);
    fma_in_fd(&mut out_a_fft, &dec_fft, &row.a);
    fma_in_fd(&mut out_b_fft, &dec_fft, &row.b);
  }

  trlwe::TRLWELv1 {
    a: plan.processor.fft(&out_a_fft),
    b: plan.processor.fft(&out_b_fft),
  }
}

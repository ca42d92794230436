use crate::fft::{FFTPlan, FFTProcessor};
use crate::key;
use crate::params::Torus;
use crate::params::ZERO_TORUS;
use crate::tlwe;
use crate::utils;
use rand::Rng;

/// Ring LWE ciphertext `(a, b)` with `b = a·s + m + e` in `T[X]/(X^N+1)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TRLWELv1 {
  pub a: Vec<Torus>,
  pub b: Vec<Torus>,
}

impl TRLWELv1 {
  pub fn new(n: usize) -> TRLWELv1 {
    TRLWELv1 {
      a: vec![ZERO_TORUS; n],
      b: vec![ZERO_TORUS; n],
    }
  }

  /// Ring degree
  pub fn n(&self) -> usize {
    self.a.len()
  }

  /// Encrypt a torus polynomial
  pub fn encrypt_torus(
    m: &[Torus],
    alpha: f64,
    key: &key::SecretKeyLv1,
    plan: &mut FFTPlan,
  ) -> TRLWELv1 {
    let mut rng = rand::thread_rng();
    let mut trlwe = TRLWELv1::new(key.len());
    trlwe.a.iter_mut().for_each(|e| *e = rng.gen());

    let poly_res = plan.processor.poly_mul(&trlwe.a, key);
    for ((bref, &rval), &mval) in trlwe.b.iter_mut().zip(poly_res.iter()).zip(m.iter()) {
      let noise = utils::gaussian_f64(0.0, alpha, &mut rng);
      *bref = rval.wrapping_add(mval).wrapping_add(noise);
    }

    trlwe
  }

  pub fn encrypt_f64(
    p: &[f64],
    alpha: f64,
    key: &key::SecretKeyLv1,
    plan: &mut FFTPlan,
  ) -> TRLWELv1 {
    Self::encrypt_torus(&utils::f64_to_torus_vec(p), alpha, key, plan)
  }

  pub fn encrypt_bool(
    p_bool: &[bool],
    alpha: f64,
    key: &key::SecretKeyLv1,
    plan: &mut FFTPlan,
  ) -> TRLWELv1 {
    let p_f64: Vec<f64> = p_bool
      .iter()
      .map(|e| if *e { 0.125f64 } else { -0.125f64 })
      .collect();
    Self::encrypt_f64(&p_f64, alpha, key, plan)
  }

  /// `b - a·s`
  pub fn phase(&self, key: &key::SecretKeyLv1, plan: &mut FFTPlan) -> Vec<Torus> {
    let poly_res = plan.processor.poly_mul(&self.a, key);
    self
      .b
      .iter()
      .zip(poly_res.iter())
      .map(|(&b, &r)| b.wrapping_sub(r))
      .collect()
  }

  pub fn decrypt_bool(&self, key: &key::SecretKeyLv1, plan: &mut FFTPlan) -> Vec<bool> {
    self
      .phase(key, plan)
      .iter()
      .map(|&v| (v as i32) >= 0)
      .collect()
  }

  pub fn add_assign(&mut self, other: &TRLWELv1) {
    for (x, &y) in self.a.iter_mut().zip(other.a.iter()) {
      *x = x.wrapping_add(y);
    }
    for (x, &y) in self.b.iter_mut().zip(other.b.iter()) {
      *x = x.wrapping_add(y);
    }
  }

  pub fn sub_assign(&mut self, other: &TRLWELv1) {
    for (x, &y) in self.a.iter_mut().zip(other.a.iter()) {
      *x = x.wrapping_sub(y);
    }
    for (x, &y) in self.b.iter_mut().zip(other.b.iter()) {
      *x = x.wrapping_sub(y);
    }
  }

  /// Multiply both components by `X^k`, `k` taken modulo `2N`
  pub fn mul_by_monomial(&self, k: usize) -> TRLWELv1 {
    TRLWELv1 {
      a: poly_mul_with_x_k(&self.a, k),
      b: poly_mul_with_x_k(&self.b, k),
    }
  }

  /// Apply `X ↦ X^g` to both components.
  ///
  /// The result encrypts `m(X^g)` under the key `s(X^g)`.
  pub fn automorphism(&self, g: usize) -> TRLWELv1 {
    TRLWELv1 {
      a: poly_automorphism(&self.a, g),
      b: poly_automorphism(&self.b, g),
    }
  }
}

#[derive(Debug, Clone)]
pub struct TRLWELv1FFT {
  pub a: Vec<f64>,
  pub b: Vec<f64>,
}

impl TRLWELv1FFT {
  pub fn new(trlwe: &TRLWELv1, plan: &mut FFTPlan) -> TRLWELv1FFT {
    TRLWELv1FFT {
      a: plan.processor.ifft(&trlwe.a),
      b: plan.processor.ifft(&trlwe.b),
    }
  }
}

/// Negacyclic multiplication by `X^k` for any `k`; `X^N = -1`.
pub fn poly_mul_with_x_k(a: &[Torus], k: usize) -> Vec<Torus> {
  let n = a.len();
  let k = k % (2 * n);
  let mut res = vec![ZERO_TORUS; n];
  for (i, &x) in a.iter().enumerate() {
    let j = i + k;
    if j < n {
      res[j] = x;
    } else if j < 2 * n {
      res[j - n] = x.wrapping_neg();
    } else {
      res[j - 2 * n] = x;
    }
  }
  res
}

/// `a(X) ↦ a(X^g)` for odd `g`. With `g = 2N-1` this is the index inversion
/// `X ↦ X^{-1}`: the constant term stays, coefficient `i` moves to `N-i` negated.
pub fn poly_automorphism(a: &[Torus], g: usize) -> Vec<Torus> {
  let n = a.len();
  let two_n = 2 * n;
  let mut res = vec![ZERO_TORUS; n];
  for (i, &x) in a.iter().enumerate() {
    let j = (g % two_n) * i % two_n;
    if j < n {
      res[j] = x;
    } else {
      res[j - n] = x.wrapping_neg();
    }
  }
  res
}

/// Extract coefficient `k` of the phase as an LWE ciphertext under the ring key
pub fn sample_extract_index(trlwe: &TRLWELv1, k: usize) -> tlwe::TLWELv1 {
  let n = trlwe.n();
  let mut res = tlwe::TLWELv1::new(n);

  for i in 0..n {
    if i <= k {
      res.p[i] = trlwe.a[k - i];
    } else {
      res.p[i] = trlwe.a[n + k - i].wrapping_neg();
    }
  }
  *res.b_mut() = trlwe.b[k];

  res
}

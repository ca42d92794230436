use crate::key;
use crate::params::HalfTorus;
use crate::params::Torus;
use crate::params::ZERO_TORUS;
use crate::utils;
use rand::Rng;
use std::ops::{Add, Neg, Sub};

/// LWE ciphertext under the level 0 key `z`: `p = [a_0, .., a_{n-1}, b]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TLWELv0 {
  pub p: Vec<Torus>,
}

impl TLWELv0 {
  pub fn new(n: usize) -> TLWELv0 {
    TLWELv0 {
      p: vec![ZERO_TORUS; n + 1],
    }
  }

  /// LWE dimension. Zero for a malformed ciphertext with no `b`.
  pub fn n(&self) -> usize {
    self.p.len().saturating_sub(1)
  }

  pub fn a(&self) -> &[Torus] {
    &self.p[..self.n()]
  }

  pub fn b(&self) -> Torus {
    self.p[self.n()]
  }

  pub fn b_mut(&mut self) -> &mut Torus {
    let n = self.n();
    &mut self.p[n]
  }

  /// Encrypt a message already on the torus
  pub fn encrypt_torus(m: Torus, alpha: f64, key: &key::SecretKeyLv0) -> TLWELv0 {
    let mut rng = rand::thread_rng();
    let mut tlwe = TLWELv0::new(key.len());
    let mut inner_product: Torus = 0;

    for (i, &key) in key.iter().enumerate() {
      let rand_torus: Torus = rng.gen();
      inner_product = inner_product.wrapping_add(key.wrapping_mul(rand_torus));
      tlwe.p[i] = rand_torus;
    }

    let noise = utils::gaussian_f64(0.0, alpha, &mut rng);
    *tlwe.b_mut() = inner_product.wrapping_add(m).wrapping_add(noise);
    tlwe
  }

  /// Encrypt a fixed-point message in `[-1/2, 1/2)`.
  ///
  /// Out-of-range messages saturate at the nearest bound rather than wrap
  /// (see [`utils::f64_to_torus_saturating`]).
  pub fn encrypt_f64(p: f64, alpha: f64, key: &key::SecretKeyLv0) -> TLWELv0 {
    Self::encrypt_torus(utils::f64_to_torus_saturating(p), alpha, key)
  }

  pub fn encrypt_bool(p_bool: bool, alpha: f64, key: &key::SecretKeyLv0) -> TLWELv0 {
    let p = if p_bool { 0.125 } else { -0.125 };
    Self::encrypt_f64(p, alpha, key)
  }

  /// `b - <a, z>`
  pub fn phase(&self, key: &key::SecretKeyLv0) -> Torus {
    let inner_product = self
      .a()
      .iter()
      .zip(key.iter())
      .fold(0 as Torus, |acc, (&a, &k)| acc.wrapping_add(a.wrapping_mul(k)));
    self.b().wrapping_sub(inner_product)
  }

  pub fn decrypt_bool(&self, key: &key::SecretKeyLv0) -> bool {
    (self.phase(key) as HalfTorus) >= 0
  }

  pub fn decrypt_f64(&self, key: &key::SecretKeyLv0) -> f64 {
    utils::torus_to_f64(self.phase(key))
  }
}

impl Add for &TLWELv0 {
  type Output = TLWELv0;

  fn add(self, other: &TLWELv0) -> TLWELv0 {
    TLWELv0 {
      p: self
        .p
        .iter()
        .zip(other.p.iter())
        .map(|(&s, &o)| s.wrapping_add(o))
        .collect(),
    }
  }
}

impl Sub for &TLWELv0 {
  type Output = TLWELv0;

  fn sub(self, other: &TLWELv0) -> TLWELv0 {
    TLWELv0 {
      p: self
        .p
        .iter()
        .zip(other.p.iter())
        .map(|(&s, &o)| s.wrapping_sub(o))
        .collect(),
    }
  }
}

impl Neg for TLWELv0 {
  type Output = TLWELv0;

  fn neg(mut self) -> TLWELv0 {
    self.p.iter_mut().for_each(|e| *e = e.wrapping_neg());
    self
  }
}

/// LWE ciphertext under the ring key `s`, as produced by sample extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TLWELv1 {
  pub p: Vec<Torus>,
}

impl TLWELv1 {
  pub fn new(n: usize) -> TLWELv1 {
    TLWELv1 {
      p: vec![ZERO_TORUS; n + 1],
    }
  }

  pub fn n(&self) -> usize {
    self.p.len() - 1
  }

  pub fn b(&self) -> Torus {
    self.p[self.n()]
  }

  pub fn b_mut(&mut self) -> &mut Torus {
    let n = self.n();
    &mut self.p[n]
  }

  pub fn phase(&self, key: &key::SecretKeyLv1) -> Torus {
    let inner_product = self.p[..self.n()]
      .iter()
      .zip(key.iter())
      .fold(0 as Torus, |acc, (&a, &k)| acc.wrapping_add(a.wrapping_mul(k)));
    self.b().wrapping_sub(inner_product)
  }

  pub fn decrypt_bool(&self, key: &key::SecretKeyLv1) -> bool {
    (self.phase(key) as HalfTorus) >= 0
  }

  #[cfg(test)]
  pub fn encrypt_f64(p: f64, alpha: f64, key: &key::SecretKeyLv1) -> TLWELv1 {
    let mut rng = rand::thread_rng();
    let mut tlwe = TLWELv1::new(key.len());
    let mut inner_product: Torus = 0;
    for (i, &key_val) in key.iter().enumerate() {
      let rand_torus: Torus = rng.gen();
      inner_product = inner_product.wrapping_add(key_val.wrapping_mul(rand_torus));
      tlwe.p[i] = rand_torus;
    }
    *tlwe.b_mut() = inner_product.wrapping_add(utils::gaussian_f64(p, alpha, &mut rng));
    tlwe
  }

  #[cfg(test)]
  pub fn encrypt_bool(b: bool, alpha: f64, key: &key::SecretKeyLv1) -> TLWELv1 {
    let p = if b { 0.125 } else { -0.125 };
    Self::encrypt_f64(p, alpha, key)
  }
}

#[cfg(test)]
mod tests {
  use crate::key;
  use crate::params;
  use crate::tlwe::*;
  use rand::Rng;

  #[test]
  fn test_tlwe_enc_and_dec() {
    let mut rng = rand::thread_rng();
    let p = params::TOY_N256;

    let key = key::SecretKey::new(&p);
    let key_dirty = key::SecretKey::new(&p);

    let mut differs = 0;
    let try_num = 10000;

    for _i in 0..try_num {
      let sample = rng.gen::<bool>();
      let secret = TLWELv0::encrypt_bool(sample, p.tlwe_lv0.alpha, &key.key_lv0);
      let plain = secret.decrypt_bool(&key.key_lv0);
      let plain_dirty = secret.decrypt_bool(&key_dirty.key_lv0);
      assert_eq!(plain, sample);
      if plain != plain_dirty {
        differs += 1;
      }
    }

    // With n_lwe = 16 a wrong key still collides with the right one now and then
    let probability = differs as f64 / try_num as f64;
    assert!(probability > 0.3);
  }

  #[test]
  fn test_dimension_of_empty_ciphertext() {
    assert_eq!(TLWELv0 { p: vec![] }.n(), 0);
    assert_eq!(TLWELv0::new(4).n(), 4);
  }

  #[test]
  fn test_encrypt_f64_saturates() {
    let p = params::TOY_N256;
    let key = key::SecretKey::new(&p);

    let over = TLWELv0::encrypt_f64(0.9, 0.0, &key.key_lv0);
    assert!(over.decrypt_f64(&key.key_lv0) > 0.49);

    let under = TLWELv0::encrypt_f64(-4.0, 0.0, &key.key_lv0);
    assert!(under.decrypt_f64(&key.key_lv0) < -0.49);
  }

  #[test]
  fn test_tlwe_add_sub_neg() {
    let p = params::TOY_N256;
    let key = key::SecretKey::new(&p);

    let x = TLWELv0::encrypt_f64(0.125, p.tlwe_lv0.alpha, &key.key_lv0);
    let y = TLWELv0::encrypt_f64(0.25, p.tlwe_lv0.alpha, &key.key_lv0);

    assert!(((&x + &y).decrypt_f64(&key.key_lv0) - 0.375).abs() < 0.01);
    assert!(((&x - &y).decrypt_f64(&key.key_lv0) + 0.125).abs() < 0.01);
    assert!(((-x).decrypt_f64(&key.key_lv0) + 0.125).abs() < 0.01);
  }
}

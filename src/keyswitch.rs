use crate::fft::{fma_in_fd, FFTPlan, FFTProcessor};
use crate::key;
use crate::params::{SecurityParams, Torus, TORUS_SIZE};
use crate::parallel::{default_railgun, Railgun};
use crate::tlwe;
use crate::trgsw;
use crate::trlwe;

/// LWE key switching table from the ring key `s` (as an `N`-dimensional LWE
/// key) down to the level 0 key `z`. Entry `BASE·IKS_T·i + BASE·j + k`
/// encrypts `k·s_i·BASE^{-(j+1)}`.
pub type KeySwitchingKey = Vec<tlwe::TLWELv0>;

pub fn gen_key_switching_key(secret: &key::SecretKey, params: &SecurityParams) -> KeySwitchingKey {
  let basebit = params.trgsw_lv1.basebit;
  let base = 1usize << basebit;
  let iks_t = params.trgsw_lv1.iks_t;
  let alpha = params.tlwe_lv0.alpha;

  let blocks = default_railgun().par_map(&secret.key_lv1, |&s_i| {
    let mut block = Vec::with_capacity(base * iks_t);
    for j in 0..iks_t {
      for k in 0..base {
        let m = (k as Torus).wrapping_mul(s_i) << (TORUS_SIZE - (j + 1) * basebit);
        block.push(tlwe::TLWELv0::encrypt_torus(m, alpha, &secret.key_lv0));
      }
    }
    block
  });

  blocks.into_iter().flatten().collect()
}

pub fn identity_key_switching(
  src: &tlwe::TLWELv1,
  key_switching_key: &KeySwitchingKey,
  params: &SecurityParams,
) -> tlwe::TLWELv0 {
  let n = src.n();
  let basebit = params.trgsw_lv1.basebit;
  let base = 1usize << basebit;
  let iks_t = params.trgsw_lv1.iks_t;
  let mut res = tlwe::TLWELv0::new(params.tlwe_lv0.n);

  *res.b_mut() = src.b();

  let prec_offset: Torus = 1 << (TORUS_SIZE - (1 + basebit * iks_t));

  for i in 0..n {
    let a_bar = src.p[i].wrapping_add(prec_offset);
    for j in 0..iks_t {
      let k = (a_bar >> (TORUS_SIZE - (j + 1) * basebit)) & ((1 << basebit) - 1);
      if k != 0 {
        let idx = (base * iks_t * i) + (base * j) + k as usize;
        for (x, &y) in res.p.iter_mut().zip(key_switching_key[idx].p.iter()) {
          *x = x.wrapping_sub(y);
        }
      }
    }
  }

  res
}

/// Ring key switching key from a key `s'` to the ring key `s`.
///
/// Row `t` is `TRLWE_s(s'·Bg^{-(t+1)})`. A key can carry a public monomial
/// factor `X^shift`; switching with it multiplies the message by `X^shift`.
#[derive(Debug, Clone)]
pub struct RingKeySwitchKey {
  rows: Vec<trlwe::TRLWELv1>,
  rows_fft: Vec<trlwe::TRLWELv1FFT>,
  shift: usize,
}

impl RingKeySwitchKey {
  pub fn generate(
    from: &[Torus],
    to: &key::SecretKeyLv1,
    params: &SecurityParams,
    plan: &mut FFTPlan,
  ) -> RingKeySwitchKey {
    let trgsw_params = &params.trgsw_lv1;
    let rows: Vec<trlwe::TRLWELv1> = (0..trgsw_params.l)
      .map(|t| {
        let g = trgsw_params.gadget(t);
        let m: Vec<Torus> = from.iter().map(|&x| x.wrapping_mul(g)).collect();
        trlwe::TRLWELv1::encrypt_torus(&m, trgsw_params.alpha, to, plan)
      })
      .collect();
    Self::from_rows(rows, 0, plan)
  }

  fn from_rows(rows: Vec<trlwe::TRLWELv1>, shift: usize, plan: &mut FFTPlan) -> RingKeySwitchKey {
    let rows_fft = rows
      .iter()
      .map(|row| trlwe::TRLWELv1FFT::new(row, plan))
      .collect();
    RingKeySwitchKey {
      rows,
      rows_fft,
      shift,
    }
  }

  /// The same switch with the message additionally multiplied by `X^k`.
  /// Needs no secret material.
  pub fn scaled_by_monomial(&self, k: usize, plan: &mut FFTPlan) -> RingKeySwitchKey {
    let two_n = 2 * plan.n;
    let rows = self.rows.iter().map(|row| row.mul_by_monomial(k)).collect();
    Self::from_rows(rows, (self.shift + k) % two_n, plan)
  }

  pub fn shift(&self) -> usize {
    self.shift
  }

  /// `(0, X^shift·b) - Σ_t dec_t(a)·K_t`
  pub fn switch(
    &self,
    c: &trlwe::TRLWELv1,
    cloud_key: &key::CloudKey,
    plan: &mut FFTPlan,
  ) -> trlwe::TRLWELv1 {
    let digits = trgsw::decompose_poly(
      &c.a,
      cloud_key.decomposition_offset,
      &cloud_key.params.trgsw_lv1,
    );
    let n = c.n();
    let mut acc_a = vec![0.0f64; n];
    let mut acc_b = vec![0.0f64; n];
    for (digit, row) in digits.iter().zip(self.rows_fft.iter()) {
      let digit_fft = plan.processor.ifft(digit);
      fma_in_fd(&mut acc_a, &digit_fft, &row.a);
      fma_in_fd(&mut acc_b, &digit_fft, &row.b);
    }

    let sub_a = plan.processor.fft(&acc_a);
    let sub_b = plan.processor.fft(&acc_b);
    let b = trlwe::poly_mul_with_x_k(&c.b, self.shift);
    trlwe::TRLWELv1 {
      a: sub_a.iter().map(|x| x.wrapping_neg()).collect(),
      b: b
        .iter()
        .zip(sub_b.iter())
        .map(|(&x, &y)| x.wrapping_sub(y))
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fft::FFTPlan;
  use crate::params;
  use rand::Rng;

  #[test]
  fn test_identity_key_switching() {
    let mut rng = rand::thread_rng();
    let p = params::TOY_N256;
    let key = key::SecretKey::new(&p);
    let ksk = gen_key_switching_key(&key, &p);
    assert_eq!(
      ksk.len(),
      p.trgsw_lv1.n * p.trgsw_lv1.iks_t * (1 << p.trgsw_lv1.basebit)
    );

    for _i in 0..100 {
      let plain_text = rng.gen::<bool>();
      let tlwe_lv1 = tlwe::TLWELv1::encrypt_bool(plain_text, p.tlwe_lv1.alpha, &key.key_lv1);
      let tlwe_lv0 = identity_key_switching(&tlwe_lv1, &ksk, &p);
      assert_eq!(tlwe_lv0.n(), p.tlwe_lv0.n);
      assert_eq!(plain_text, tlwe_lv0.decrypt_bool(&key.key_lv0));
    }
  }

  #[test]
  fn test_ring_key_switch_from_inverted_key() {
    let mut rng = rand::thread_rng();
    let p = params::TOY_N256;
    let n = p.trgsw_lv1.n;
    let key = key::SecretKey::new(&p);
    let cloud_key = key::CloudKey::new(&key, &p);
    let mut plan = FFTPlan::new(n);

    let inverted = trlwe::poly_automorphism(&key.key_lv1, 2 * n - 1);
    let ksk = RingKeySwitchKey::generate(&inverted, &key.key_lv1, &p, &mut plan);

    let plain_text: Vec<bool> = (0..n).map(|_| rng.gen()).collect();
    let c = trlwe::TRLWELv1::encrypt_bool(&plain_text, p.trlwe_lv1.alpha, &inverted, &mut plan);
    let switched = ksk.switch(&c, &cloud_key, &mut plan);
    assert_eq!(plain_text, switched.decrypt_bool(&key.key_lv1, &mut plan));

    // A monomial-scaled key folds a shift by X^5 into the switch
    let scaled = ksk.scaled_by_monomial(5, &mut plan);
    assert_eq!(scaled.shift(), 5);
    let shifted = scaled.switch(&c, &cloud_key, &mut plan);
    let dec = shifted.decrypt_bool(&key.key_lv1, &mut plan);
    for j in 5..n {
      assert_eq!(dec[j], plain_text[j - 5]);
    }
    for j in 0..5 {
      assert_eq!(dec[j], !plain_text[n + j - 5]);
    }
  }
}

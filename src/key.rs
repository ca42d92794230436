use crate::error::{Error, Result};
use crate::fft::{with_fft_plan, FFTPlan};
use crate::keyswitch::{self, KeySwitchingKey, RingKeySwitchKey};
use crate::params::{SecurityParams, Torus};
use crate::trgsw::{self, TRGSWLv1, TRGSWLv1FFT};
use crate::trlwe;
use crate::utils;
use std::collections::HashMap;
use tracing::instrument;

/// Binary LWE key `z`
pub type SecretKeyLv0 = Vec<Torus>;
/// Binary ring key `s`, also used as an `N`-dimensional LWE key
pub type SecretKeyLv1 = Vec<Torus>;

#[derive(Debug, Clone)]
pub struct SecretKey {
  pub key_lv0: SecretKeyLv0,
  pub key_lv1: SecretKeyLv1,
}

impl SecretKey {
  pub fn new(params: &SecurityParams) -> SecretKey {
    let mut rng = rand::thread_rng();
    SecretKey {
      key_lv0: utils::random_binary_vec(params.tlwe_lv0.n, &mut rng),
      key_lv1: utils::random_binary_vec(params.trlwe_lv1.n, &mut rng),
    }
  }
}

/// Galois element of the index inversion `X ↦ X^{-1}` in degree `n`
pub fn index_inversion(n: usize) -> usize {
  2 * n - 1
}

/// Public evaluation material that does not depend on the batch shape
pub struct CloudKey {
  pub params: SecurityParams,
  pub decomposition_offset: Torus,
  /// Ring key `s` to level 0 key `z`
  pub key_switching_key: KeySwitchingKey,
  /// `σ_g(s) → s`, by Galois element `g`
  pub automorphism_keys: HashMap<usize, RingKeySwitchKey>,
  /// `TRGSW(-s)`: maps an encryption of `m` to an encryption of `-s·m`
  pub relinearization_key: TRGSWLv1FFT,
}

impl CloudKey {
  #[instrument(skip_all, fields(n = params.trgsw_lv1.n))]
  pub fn new(secret: &SecretKey, params: &SecurityParams) -> CloudKey {
    let n = params.trgsw_lv1.n;
    let key_switching_key = keyswitch::gen_key_switching_key(secret, params);

    let (automorphism_keys, relinearization_key) = with_fft_plan(n, |plan| {
      let mut automorphism_keys = HashMap::new();
      let g = index_inversion(n);
      automorphism_keys.insert(g, Self::automorphism_key_for(secret, g, params, plan));

      let neg_s: Vec<Torus> = secret.key_lv1.iter().map(|x| x.wrapping_neg()).collect();
      let relin = TRGSWLv1::encrypt_poly(
        &neg_s,
        params.trgsw_lv1.alpha,
        &secret.key_lv1,
        &params.trgsw_lv1,
        plan,
      );
      (automorphism_keys, TRGSWLv1FFT::new(&relin, plan))
    });

    tracing::debug!(
      ksk_entries = key_switching_key.len(),
      automorphisms = automorphism_keys.len(),
      "cloud key generated"
    );

    CloudKey {
      params: *params,
      decomposition_offset: trgsw::decomposition_offset(&params.trgsw_lv1),
      key_switching_key,
      automorphism_keys,
      relinearization_key,
    }
  }

  fn automorphism_key_for(
    secret: &SecretKey,
    g: usize,
    params: &SecurityParams,
    plan: &mut FFTPlan,
  ) -> RingKeySwitchKey {
    let from = trlwe::poly_automorphism(&secret.key_lv1, g);
    RingKeySwitchKey::generate(&from, &secret.key_lv1, params, plan)
  }

  pub fn automorphism_key(&self, g: usize) -> Result<&RingKeySwitchKey> {
    self.automorphism_keys.get(&g).ok_or(Error::KeyMissing {
      row: g,
      rows: self.automorphism_keys.len(),
    })
  }
}

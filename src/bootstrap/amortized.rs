use crate::batch::mode::Mode;
use crate::batch::vec_mat::{bits_of, vec_mat_mult_into};
use crate::batch::{hom_dft_inverse, pad_to_transform_len, BatchBootstrappingKey, PackedCiphertext};
use crate::bootstrap::BatchBootstrap;
use crate::error::{ensure_len, Error, Result};
use crate::keyswitch::identity_key_switching;
use crate::params::BatchParams;
use crate::parallel::{default_railgun, Railgun};
use crate::tlwe::{TLWELv0, TLWELv1};
use crate::trlwe::sample_extract_index;
use crate::utils;
use tracing::{debug, instrument};

/// Amortized batch bootstrap
///
/// Packs all `n` inputs into one TRGSW ciphertext and refreshes them with a
/// single homomorphic inverse transform:
/// - Packing with the batched key block (additions only)
/// - Recursive inverse transform built from slot rotations
/// - Sample extraction of every slot from the finest gadget row
/// - Identity key switching to convert back to level 0
#[derive(Debug, Clone)]
pub struct AmortizedBootstrap {
  _private: (),
}

impl AmortizedBootstrap {
  pub fn new() -> Self {
    AmortizedBootstrap { _private: () }
  }
}

impl Default for AmortizedBootstrap {
  fn default() -> Self {
    Self::new()
  }
}

impl BatchBootstrap for AmortizedBootstrap {
  fn bootstrap_batch(
    &self,
    inputs: &[TLWELv0],
    key: &BatchBootstrappingKey,
  ) -> Result<Vec<TLWELv0>> {
    batch_bootstrap(inputs, key, key.params())
  }

  fn bootstrap_batch_without_key_switch(
    &self,
    inputs: &[TLWELv0],
    key: &BatchBootstrappingKey,
  ) -> Result<Vec<TLWELv1>> {
    batch_bootstrap_without_key_switch(inputs, key, key.params())
  }

  fn name(&self) -> &str {
    "amortized"
  }
}

fn check_shape(
  inputs: &[TLWELv0],
  key: &BatchBootstrappingKey,
  params: &BatchParams,
) -> Result<()> {
  ensure_len("batch_bootstrap input count", params.n, inputs.len())?;
  if key.params() != params {
    return Err(Error::InvalidParameter {
      name: "params",
      reason: format!("key was generated for {}", key.params().describe()),
    });
  }
  let n_lwe = params.security.tlwe_lv0.n;
  for input in inputs {
    ensure_len("batch_bootstrap input length", n_lwe + 1, input.p.len())?;
  }
  Ok(())
}

/// `Σ_k (S·b̃_k in slot k) + Σ_{k,j} vec_mat_mult(bits(ã_kj), row(k, j))`
///
/// Slot `k` ends up holding `S·(b̃_k - Σ_j ã_kj·z_j)`, the modulus-switched
/// phase of input `k` scaled by `S`.
fn pack_inputs(
  inputs: &[TLWELv0],
  key: &BatchBootstrappingKey,
  params: &BatchParams,
) -> Result<PackedCiphertext> {
  let bits = params.modulus_bits();
  let n_lwe = params.security.tlwe_lv0.n;
  let block = key.key_block();

  let partials = default_railgun().par_try_map_range(inputs.len(), |k| {
    let input = &inputs[k];
    let mut slots = vec![0i64; k + 1];
    slots[k] = key.scale() * utils::mod_switch(input.b(), bits) as i64;
    let mut acc = PackedCiphertext::trivial(&slots, Mode::InFactor1x2, params)?;
    for (j, &a) in input.a().iter().enumerate() {
      let a_bits = bits_of(utils::mod_switch(a, bits), block.width());
      vec_mat_mult_into(&mut acc, &a_bits, block.row(k * n_lwe + j)?)?;
    }
    Ok(acc)
  })?;

  let mut partials = partials.into_iter();
  let mut packed = partials.next().ok_or(Error::DimensionMismatch {
    context: "batch_bootstrap input count",
    expected: params.n,
    actual: 0,
  })?;
  for partial in partials {
    packed.add_assign(&partial)?;
  }
  Ok(packed)
}

/// Refresh `params.n` inputs, returning LWE ciphertexts under the ring key.
#[instrument(skip_all, fields(n = params.n, d = params.d, rho = params.rho))]
pub fn batch_bootstrap_without_key_switch(
  inputs: &[TLWELv0],
  key: &BatchBootstrappingKey,
  params: &BatchParams,
) -> Result<Vec<TLWELv1>> {
  check_shape(inputs, key, params)?;
  let engine = key.rotation_keys();

  let packed = pack_inputs(inputs, key, params)?;
  let padded = pad_to_transform_len(engine, vec![packed])?;
  debug!(len = padded.len(), "transform input padded");

  let transformed = hom_dft_inverse(engine, &padded, params.rho)?;
  let head = transformed.first().ok_or(Error::DimensionMismatch {
    context: "hom_dft_inverse output",
    expected: params.output_len(),
    actual: 0,
  })?;
  let finest = head.rows().last().ok_or(Error::DimensionMismatch {
    context: "packed ciphertext rows",
    expected: 2 * params.security.trgsw_lv1.l,
    actual: 0,
  })?;

  let stride = params.stride();
  let slots: Vec<usize> = (0..params.n).collect();
  Ok(default_railgun().par_map(&slots, |&k| sample_extract_index(finest, k * stride)))
}

/// Refresh `params.n` LWE ciphertexts under the level 0 key.
///
/// Fails with `DimensionMismatch` unless exactly `params.n` inputs are given;
/// there is no partial output.
pub fn batch_bootstrap(
  inputs: &[TLWELv0],
  key: &BatchBootstrappingKey,
  params: &BatchParams,
) -> Result<Vec<TLWELv0>> {
  let extracted = batch_bootstrap_without_key_switch(inputs, key, params)?;
  let ksk = &key.cloud_key().key_switching_key;
  Ok(default_railgun().par_map(&extracted, |tlwe| {
    identity_key_switching(tlwe, ksk, &params.security)
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bootstrap::default_bootstrap;
  use crate::key::SecretKey;
  use crate::params::{self, SecurityParams};
  use rand::Rng;
  use std::sync::OnceLock;

  struct Fixture {
    params: BatchParams,
    secret: SecretKey,
    key: BatchBootstrappingKey,
  }

  fn fixture(security: SecurityParams) -> Fixture {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let params = BatchParams::builder(2, 2).security(security).build().unwrap();
    let secret = SecretKey::new(&params.security);
    let key = BatchBootstrappingKey::new(&secret, &params).unwrap();
    Fixture {
      params,
      secret,
      key,
    }
  }

  fn reference() -> &'static Fixture {
    static REFERENCE: OnceLock<Fixture> = OnceLock::new();
    REFERENCE.get_or_init(|| fixture(params::TOY_N1024))
  }

  fn encrypt_all(bits: &[bool], f: &Fixture) -> Vec<TLWELv0> {
    let alpha = f.params.security.tlwe_lv0.alpha;
    bits
      .iter()
      .map(|&b| TLWELv0::encrypt_bool(b, alpha, &f.secret.key_lv0))
      .collect()
  }

  #[test]
  fn test_alternating_pattern_survives() {
    let f = reference();
    assert_eq!(f.params.n, 8);
    let pattern = [false, true, false, true, false, true, false, true];

    let outputs = batch_bootstrap(&encrypt_all(&pattern, f), &f.key, &f.params).unwrap();
    assert_eq!(outputs.len(), 8);
    let decrypted: Vec<bool> = outputs
      .iter()
      .map(|c| c.decrypt_bool(&f.secret.key_lv0))
      .collect();
    assert_eq!(decrypted, pattern);
  }

  #[test]
  fn test_all_zero_inputs() {
    let f = reference();
    let zeros = [false; 8];
    let outputs = batch_bootstrap(&encrypt_all(&zeros, f), &f.key, &f.params).unwrap();
    assert!(outputs.iter().all(|c| !c.decrypt_bool(&f.secret.key_lv0)));
  }

  #[test]
  fn test_wrong_input_count_fails() {
    let f = reference();
    let inputs = encrypt_all(&[true; 7], f);
    assert_eq!(
      batch_bootstrap(&inputs, &f.key, &f.params),
      Err(Error::DimensionMismatch {
        context: "batch_bootstrap input count",
        expected: 8,
        actual: 7
      })
    );

    let inputs = encrypt_all(&[true; 9], f);
    assert!(matches!(
      batch_bootstrap(&inputs, &f.key, &f.params),
      Err(Error::DimensionMismatch { actual: 9, .. })
    ));
  }

  #[test]
  fn test_malformed_input_fails_without_output() {
    let f = reference();
    let n_lwe = f.params.security.tlwe_lv0.n;

    let mut inputs = encrypt_all(&[true; 8], f);
    inputs[0] = TLWELv0 { p: vec![] };
    assert_eq!(
      batch_bootstrap(&inputs, &f.key, &f.params),
      Err(Error::DimensionMismatch {
        context: "batch_bootstrap input length",
        expected: n_lwe + 1,
        actual: 0
      })
    );

    inputs[0] = TLWELv0::new(n_lwe - 1);
    assert!(matches!(
      batch_bootstrap_without_key_switch(&inputs, &f.key, &f.params),
      Err(Error::DimensionMismatch { actual, .. }) if actual == n_lwe
    ));
  }

  #[test]
  fn test_mismatched_params_fail() {
    let f = reference();
    let other = BatchParams::builder(2, 2)
      .security(params::TOY_N1024)
      .capacity(256)
      .build()
      .unwrap();
    let inputs = encrypt_all(&[true; 8], f);
    assert!(matches!(
      batch_bootstrap(&inputs, &f.key, &other),
      Err(Error::InvalidParameter { name: "params", .. })
    ));
  }

  #[test]
  fn test_random_batches_small_ring() {
    let f = fixture(params::TOY_N256);
    let bootstrap = default_bootstrap();
    assert_eq!(bootstrap.name(), "amortized");
    let mut rng = rand::thread_rng();

    for _ in 0..3 {
      let bits: Vec<bool> = (0..f.params.n).map(|_| rng.gen()).collect();
      let inputs = encrypt_all(&bits, &f);

      let refreshed = bootstrap.bootstrap_batch(&inputs, &f.key).unwrap();
      let decrypted: Vec<bool> = refreshed
        .iter()
        .map(|c| c.decrypt_bool(&f.secret.key_lv0))
        .collect();
      assert_eq!(decrypted, bits);

      let ring_outputs = bootstrap
        .bootstrap_batch_without_key_switch(&inputs, &f.key)
        .unwrap();
      let decrypted: Vec<bool> = ring_outputs
        .iter()
        .map(|c| c.decrypt_bool(&f.secret.key_lv1))
        .collect();
      assert_eq!(decrypted, bits);
    }
  }

  #[test]
  fn test_output_phase_tracks_input_phase() {
    let f = fixture(params::TOY_N256);
    let mut rng = rand::thread_rng();
    let bits: Vec<bool> = (0..f.params.n).map(|_| rng.gen()).collect();

    // Noiseless inputs pulled 1/32 towards zero
    let inputs: Vec<TLWELv0> = bits
      .iter()
      .map(|&b| {
        let m = if b { 0.125 - 1.0 / 32.0 } else { -0.125 + 1.0 / 32.0 };
        TLWELv0::encrypt_f64(m, 0.0, &f.secret.key_lv0)
      })
      .collect();

    let outputs = batch_bootstrap_without_key_switch(&inputs, &f.key, &f.params).unwrap();
    for (out, &b) in outputs.iter().zip(bits.iter()) {
      let phase = utils::torus_to_f64(out.phase(&f.secret.key_lv1));
      let target: f64 = if b { 0.125 } else { -0.125 };
      // The output phase is the input phase rounded to the 1/q grid
      assert!((phase - (target - target.signum() / 32.0)).abs() < 0.03, "phase {}", phase);
    }
  }
}

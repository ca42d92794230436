//! Slot rotation inside one packed ciphertext.
//!
//! A rotation by `δ` slots is built from two half steps:
//!
//! - [`batch_permute`]: index inversion `X ↦ X^{-1}` followed by a key switch
//!   with the permutation key for `δ`, which folds in `Y^{-δ}`. The message
//!   becomes `σ(μ)·Y^{-δ}` and the ciphertext moves to the dual factor.
//! - [`inv_auto`]: index inversion followed by the plain inversion key switch.
//!   Applied after the permutation this yields `μ·Y^δ` in the original factor.
//!
//! Only the `b`-half rows of the TRGSW are switched. The `a`-half rows are
//! rebuilt from them by an external product with `TRGSW(-s)`.

use crate::batch::hom_dft::SlotArithmetic;
use crate::batch::mode::compose;
use crate::batch::packed::PackedCiphertext;
use crate::error::{Error, Result};
use crate::fft::{with_fft_plan, FFTPlan};
use crate::key::{self, CloudKey, SecretKey};
use crate::keyswitch::RingKeySwitchKey;
use crate::params::BatchParams;
use crate::trgsw::{self, TRGSWLv1};
use crate::trlwe::TRLWELv1;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument};

/// Cyclic slot shift by `offset`, taken modulo `2r`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotPermutation {
  offset: usize,
}

impl SlotPermutation {
  pub fn cyclic_shift(delta: usize, r: usize) -> Self {
    SlotPermutation {
      offset: delta % (2 * r),
    }
  }

  pub fn offset(&self) -> usize {
    self.offset
  }

  pub fn is_identity(&self) -> bool {
    self.offset == 0
  }
}

/// Key switch from `σ(s)` to `s` that multiplies the message by `Y^{-offset}`
#[derive(Debug)]
pub struct PermutationKey {
  permutation: SlotPermutation,
  switch_key: RingKeySwitchKey,
}

impl PermutationKey {
  pub fn permutation(&self) -> SlotPermutation {
    self.permutation
  }
}

/// Lazily populated permutation keys, shared by concurrent rotations
#[derive(Debug, Default)]
pub struct PermutationCache {
  keys: RwLock<HashMap<SlotPermutation, Arc<PermutationKey>>>,
}

impl PermutationCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self
      .keys
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Cached key for `permutation`, deriving it on a miss. A miss is
  /// re-checked under the write lock, so each key is derived once.
  pub fn get_or_derive(
    &self,
    permutation: SlotPermutation,
    derive: impl FnOnce() -> Result<PermutationKey>,
  ) -> Result<Arc<PermutationKey>> {
    if let Some(key) = self
      .keys
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&permutation)
    {
      return Ok(Arc::clone(key));
    }

    let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(key) = keys.get(&permutation) {
      return Ok(Arc::clone(key));
    }
    debug!(offset = permutation.offset(), "permutation key cache miss");
    let key = Arc::new(derive()?);
    keys.insert(permutation, Arc::clone(&key));
    Ok(key)
  }
}

/// Everything a rotation needs: the public cloud key and the permutation
/// keys derived from it.
pub struct RotationKeys {
  params: BatchParams,
  cloud_key: CloudKey,
  permutations: PermutationCache,
}

impl RotationKeys {
  pub fn new(secret: &SecretKey, params: &BatchParams) -> Result<Self> {
    Self::from_cloud_key(CloudKey::new(secret, &params.security), params)
  }

  pub fn from_cloud_key(cloud_key: CloudKey, params: &BatchParams) -> Result<Self> {
    if cloud_key.params != params.security {
      return Err(Error::InvalidParameter {
        name: "params",
        reason: format!(
          "cloud key built for N={}, batch expects N={}",
          cloud_key.params.trgsw_lv1.n, params.ring_n
        ),
      });
    }
    Ok(RotationKeys {
      params: *params,
      cloud_key,
      permutations: PermutationCache::new(),
    })
  }

  pub fn params(&self) -> &BatchParams {
    &self.params
  }

  pub fn cloud_key(&self) -> &CloudKey {
    &self.cloud_key
  }

  pub fn permutations(&self) -> &PermutationCache {
    &self.permutations
  }

  fn inversion_key(&self) -> Result<&RingKeySwitchKey> {
    self
      .cloud_key
      .automorphism_key(key::index_inversion(self.params.ring_n))
  }

  /// Permutation key for `permutation`, from the cache or derived now
  #[instrument(skip_all, fields(offset = permutation.offset()))]
  pub fn permutation_key(&self, permutation: SlotPermutation) -> Result<Arc<PermutationKey>> {
    self.permutations.get_or_derive(permutation, || {
      let two_n = 2 * self.params.ring_n;
      let shift = (two_n - permutation.offset() * self.params.stride() % two_n) % two_n;
      let inversion = self.inversion_key()?;
      let switch_key = with_fft_plan(self.params.ring_n, |plan| {
        inversion.scaled_by_monomial(shift, plan)
      });
      Ok(PermutationKey {
        permutation,
        switch_key,
      })
    })
  }
}

/// `σ` then a key switch, on each `b`-half row
fn switch_b_rows(
  rows: &[TRLWELv1],
  switch_key: &RingKeySwitchKey,
  cloud_key: &CloudKey,
  plan: &mut FFTPlan,
) -> Vec<TRLWELv1> {
  let g = key::index_inversion(plan.n);
  rows
    .iter()
    .map(|row| switch_key.switch(&row.automorphism(g), cloud_key, plan))
    .collect()
}

/// Reassemble a TRGSW from its `b`-half rows. `a`-half row `i` must encrypt
/// `-s` times `b`-half row `i`.
fn regenerate(b_rows: Vec<TRLWELv1>, cloud_key: &CloudKey, plan: &mut FFTPlan) -> TRGSWLv1 {
  let mut trlwe: Vec<TRLWELv1> = b_rows
    .iter()
    .map(|row| {
      trgsw::external_product_with_fft(&cloud_key.relinearization_key, row, cloud_key, plan)
    })
    .collect();
  trlwe.extend(b_rows);
  TRGSWLv1 { trlwe }
}

fn b_half(c: &PackedCiphertext) -> &[TRLWELv1] {
  let rows = c.rows();
  &rows[rows.len() / 2..]
}

/// Permutation-keyed product: `μ ↦ σ(μ)·Y^{-δ}`, moving `C` into the dual
/// factor. Fails with `ModeMismatch` for transition-mode inputs.
pub fn batch_permute(
  c: &PackedCiphertext,
  permutation: SlotPermutation,
  keys: &RotationKeys,
) -> Result<PackedCiphertext> {
  let transition = c.mode().outgoing()?;
  let mode = compose(c.mode(), transition)?;
  let perm_key = keys.permutation_key(permutation)?;
  let cloud_key = keys.cloud_key();
  let trgsw = with_fft_plan(keys.params.ring_n, |plan| {
    let rows = switch_b_rows(b_half(c), &perm_key.switch_key, cloud_key, plan);
    regenerate(rows, cloud_key, plan)
  });
  Ok(PackedCiphertext::from_parts(trgsw, mode))
}

/// Index inversion `X ↦ X^{-1}` switched back to `s`, moving `C` into the
/// dual factor.
pub fn inv_auto(c: &PackedCiphertext, keys: &RotationKeys) -> Result<PackedCiphertext> {
  let mode = c.mode().dual()?;
  let inversion = keys.inversion_key()?;
  let cloud_key = keys.cloud_key();
  let trgsw = with_fft_plan(keys.params.ring_n, |plan| {
    let rows = switch_b_rows(b_half(c), inversion, cloud_key, plan);
    regenerate(rows, cloud_key, plan)
  });
  Ok(PackedCiphertext::from_parts(trgsw, mode))
}

/// Anti-cyclic rotation of the `r` slots by `delta`: slot `j` moves to
/// `j + delta`, negated each time it wraps past slot `r - 1`.
///
/// Equivalent to `inv_auto(batch_permute(C, δ))`, with the `a`-half rows
/// rebuilt once at the end. `delta ≡ 0 (mod 2r)` returns an exact copy.
pub fn batch_anti_rot(
  c: &PackedCiphertext,
  delta: usize,
  keys: &RotationKeys,
) -> Result<PackedCiphertext> {
  let permutation = SlotPermutation::cyclic_shift(delta, keys.params.r);
  if permutation.is_identity() {
    return Ok(c.clone());
  }

  let transition = c.mode().outgoing()?;
  let mode = compose(c.mode(), transition)?.dual()?;
  let perm_key = keys.permutation_key(permutation)?;
  let inversion = keys.inversion_key()?;
  let cloud_key = keys.cloud_key();

  let trgsw = with_fft_plan(keys.params.ring_n, |plan| {
    let permuted = switch_b_rows(b_half(c), &perm_key.switch_key, cloud_key, plan);
    let rotated = switch_b_rows(&permuted, inversion, cloud_key, plan);
    regenerate(rotated, cloud_key, plan)
  });
  Ok(PackedCiphertext::from_parts(trgsw, mode))
}

impl SlotArithmetic for RotationKeys {
  type Slots = PackedCiphertext;

  fn params(&self) -> &BatchParams {
    &self.params
  }

  fn zero_like(&self, like: &PackedCiphertext) -> PackedCiphertext {
    like.zero_like()
  }

  fn add_assign(&self, acc: &mut PackedCiphertext, rhs: &PackedCiphertext) -> Result<()> {
    acc.add_assign(rhs)
  }

  fn anti_rotate(&self, x: &PackedCiphertext, delta: usize) -> Result<PackedCiphertext> {
    batch_anti_rot(x, delta, self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::batch::mode::Mode;
  use crate::params;
  use crate::parallel::{default_railgun, Railgun};
  use rand::Rng;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::OnceLock;

  struct Fixture {
    params: BatchParams,
    secret: SecretKey,
    keys: RotationKeys,
  }

  fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
      let params = BatchParams::builder(2, 2)
        .security(params::TOY_N256)
        .build()
        .unwrap();
      let secret = SecretKey::new(&params.security);
      let keys = RotationKeys::new(&secret, &params).unwrap();
      Fixture {
        params,
        secret,
        keys,
      }
    })
  }

  fn random_packed(mode: Mode) -> (Vec<i64>, PackedCiphertext) {
    let f = fixture();
    let mut rng = rand::thread_rng();
    let slots: Vec<i64> = (0..f.params.r).map(|_| rng.gen_range(-8..8)).collect();
    let c = with_fft_plan(f.params.ring_n, |plan| {
      PackedCiphertext::encrypt(&slots, mode, &f.secret, &f.params, plan).unwrap()
    });
    (slots, c)
  }

  fn decrypt(c: &PackedCiphertext) -> Vec<i64> {
    let f = fixture();
    with_fft_plan(f.params.ring_n, |plan| c.decrypt_slots(&f.secret, &f.params, plan))
  }

  /// Plain anti-cyclic rotation of a slot vector
  fn rotate_plain(slots: &[i64], delta: usize) -> Vec<i64> {
    let r = slots.len();
    let mut out = vec![0; r];
    for (j, &v) in slots.iter().enumerate() {
      let k = (j + delta) % (2 * r);
      if k < r {
        out[k] = v;
      } else {
        out[k - r] = -v;
      }
    }
    out
  }

  #[test]
  fn test_rotate_by_zero_is_exact_identity() {
    let f = fixture();
    let (_, c) = random_packed(Mode::InFactor1x2);
    assert_eq!(batch_anti_rot(&c, 0, &f.keys).unwrap(), c);
    assert_eq!(batch_anti_rot(&c, 2 * f.params.r, &f.keys).unwrap(), c);
  }

  #[test]
  fn test_anti_rotation_matches_plain_rotation() {
    let f = fixture();
    let (slots, c) = random_packed(Mode::InFactor1x2);
    for delta in [1, 5, f.params.r - 1, f.params.r, f.params.r + 3] {
      let rotated = batch_anti_rot(&c, delta, &f.keys).unwrap();
      assert_eq!(rotated.mode(), Mode::InFactor1x2);
      assert_eq!(decrypt(&rotated), rotate_plain(&slots, delta), "delta={}", delta);
    }
  }

  #[test]
  fn test_rotation_round_trips() {
    let f = fixture();
    let r = f.params.r;
    let (slots, c) = random_packed(Mode::InFactor1x3);
    let k = 7;
    let once = batch_anti_rot(&c, k, &f.keys).unwrap();

    let back = batch_anti_rot(&once, 2 * r - k, &f.keys).unwrap();
    assert_eq!(back.mode(), Mode::InFactor1x3);
    assert_eq!(decrypt(&back), slots);

    // Y^r = -1, so the half-period round trip negates
    let negated = batch_anti_rot(&once, r - k, &f.keys).unwrap();
    let expected: Vec<i64> = slots.iter().map(|v| -v).collect();
    assert_eq!(decrypt(&negated), expected);
  }

  #[test]
  fn test_rotation_is_permute_then_inv_auto() {
    let f = fixture();
    let (slots, c) = random_packed(Mode::InFactor1x2);
    let delta = 11;
    let perm = SlotPermutation::cyclic_shift(delta, f.params.r);

    let permuted = batch_permute(&c, perm, &f.keys).unwrap();
    assert_eq!(permuted.mode(), Mode::InFactor1x3);
    let rotated = inv_auto(&permuted, &f.keys).unwrap();
    assert_eq!(rotated.mode(), Mode::InFactor1x2);
    assert_eq!(decrypt(&rotated), rotate_plain(&slots, delta));
  }

  #[test]
  fn test_inv_auto_inverts_slot_order() {
    let f = fixture();
    let r = f.params.r;
    let (slots, c) = random_packed(Mode::InFactor1x2);
    let inverted = inv_auto(&c, &f.keys).unwrap();
    assert_eq!(inverted.mode(), Mode::InFactor1x3);

    let dec = decrypt(&inverted);
    assert_eq!(dec[0], slots[0]);
    for j in 1..r {
      assert_eq!(dec[r - j], -slots[j]);
    }
  }

  #[test]
  fn test_transition_modes_are_rejected() {
    let f = fixture();
    let c = PackedCiphertext::zero(Mode::Factor12To13, &f.params);
    assert!(matches!(
      batch_anti_rot(&c, 3, &f.keys),
      Err(Error::ModeMismatch { .. })
    ));
    assert!(matches!(inv_auto(&c, &f.keys), Err(Error::ModeMismatch { .. })));
    let perm = SlotPermutation::cyclic_shift(3, f.params.r);
    assert!(matches!(
      batch_permute(&c, perm, &f.keys),
      Err(Error::ModeMismatch { .. })
    ));
  }

  #[test]
  fn test_permutation_cache_derives_once() {
    let cache = PermutationCache::new();
    let f = fixture();
    let perm = SlotPermutation::cyclic_shift(2 * f.params.r + 9, f.params.r);
    assert_eq!(perm.offset(), 9);

    let derivations = std::sync::atomic::AtomicUsize::new(0);
    let derive = || {
      derivations.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
      f.keys.permutation_key(perm).map(|k| PermutationKey {
        permutation: k.permutation(),
        switch_key: k.switch_key.clone(),
      })
    };
    let first = cache.get_or_derive(perm, derive).unwrap();
    let second = cache.get_or_derive(perm, derive).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(derivations.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_permutation_cache_concurrent_callers_share_one_key() {
    let cache = PermutationCache::new();
    let f = fixture();
    let perm = SlotPermutation::cyclic_shift(5, f.params.r);

    let derivations = AtomicUsize::new(0);
    let derive = || {
      derivations.fetch_add(1, Ordering::SeqCst);
      f.keys.permutation_key(perm).map(|k| PermutationKey {
        permutation: k.permutation(),
        switch_key: k.switch_key.clone(),
      })
    };
    let keys = default_railgun()
      .par_try_map_range(64, |_| cache.get_or_derive(perm, derive))
      .unwrap();

    assert_eq!(keys.len(), 64);
    assert!(keys.iter().all(|k| Arc::ptr_eq(k, &keys[0])));
    assert_eq!(derivations.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_rotating_zero_stays_exact_zero() {
    let f = fixture();
    let zero = PackedCiphertext::zero(Mode::InFactor1x2, &f.params);
    assert_eq!(batch_anti_rot(&zero, 17, &f.keys).unwrap(), zero);
  }
}

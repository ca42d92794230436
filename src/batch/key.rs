use crate::batch::mode::Mode;
use crate::batch::packed::PackedCiphertext;
use crate::batch::plain::{transform_response, SlotPolynomial};
use crate::batch::rotation::RotationKeys;
use crate::error::{Error, Result};
use crate::fft::with_fft_plan;
use crate::key::{CloudKey, SecretKey};
use crate::params::BatchParams;
use crate::parallel::{default_railgun, Railgun};
use tracing::{info, instrument};

/// Batched bootstrapping key: row `k·n_lwe + j`, column `t` encrypts
/// `-2^t·z_j·S` in slot `k`.
#[derive(Debug, Clone)]
pub struct KeyBlock {
  rows: Vec<Vec<PackedCiphertext>>,
  width: usize,
}

impl KeyBlock {
  pub fn rows(&self) -> usize {
    self.rows.len()
  }

  /// Entries per row, one per bit of a modulus-switched mask coefficient
  pub fn width(&self) -> usize {
    self.width
  }

  pub fn row(&self, index: usize) -> Result<&[PackedCiphertext]> {
    self
      .rows
      .get(index)
      .map(Vec::as_slice)
      .ok_or(Error::KeyMissing {
        row: index,
        rows: self.rows.len(),
      })
  }
}

/// Everything `batch_bootstrap` needs for one parameter set
pub struct BatchBootstrappingKey {
  params: BatchParams,
  key_block: KeyBlock,
  rotation: RotationKeys,
  scale: i64,
  response: SlotPolynomial,
}

/// `S` such that `S·c` equals the gadget scale, where `c` is the constant
/// term of the transform response. Also rejects responses whose other terms
/// would move an input slot onto another input slot.
fn key_scale(params: &BatchParams, response: &SlotPolynomial) -> Result<i64> {
  let gadget_scale = params.gadget_scale();
  let gain = response.coeffs().first().copied().unwrap_or(0);
  if gain == 0 || gadget_scale % gain != 0 {
    return Err(Error::CapacityViolation {
      context: "transform gain divides the gadget scale",
      capacity: gadget_scale as usize,
      required: gain.unsigned_abs() as usize,
    });
  }

  for (a, _) in response.terms().filter(|&(a, _)| a != 0) {
    if a < params.n || a + params.n > params.r {
      return Err(Error::CapacityViolation {
        context: "transform response keeps input slots apart",
        capacity: params.r,
        required: a.max(params.n) + params.n,
      });
    }
  }
  Ok(gadget_scale / gain)
}

impl BatchBootstrappingKey {
  #[instrument(skip_all, fields(n = params.n, d = params.d, rho = params.rho))]
  pub fn new(secret: &SecretKey, params: &BatchParams) -> Result<Self> {
    let n_lwe = params.security.tlwe_lv0.n;
    if secret.key_lv0.len() != n_lwe || secret.key_lv1.len() != params.ring_n {
      return Err(Error::InvalidParameter {
        name: "secret",
        reason: format!(
          "key sizes ({}, {}) do not match n_lwe={} N={}",
          secret.key_lv0.len(),
          secret.key_lv1.len(),
          n_lwe,
          params.ring_n
        ),
      });
    }

    let response = transform_response(params)?;
    let scale = key_scale(params, &response)?;
    let width = params.modulus_bits();

    let rows = default_railgun().par_try_map_range(params.n * n_lwe, |row| {
      let (k, j) = (row / n_lwe, row % n_lwe);
      let z = secret.key_lv0[j] as i64;
      with_fft_plan(params.ring_n, |plan| {
        (0..width)
          .map(|t| {
            let value = -(1i64 << t) * z * scale;
            PackedCiphertext::encrypt_slot(k, value, Mode::InFactor1x2, secret, params, plan)
          })
          .collect::<Result<Vec<_>>>()
      })
    })?;
    let rotation = RotationKeys::from_cloud_key(CloudKey::new(secret, &params.security), params)?;

    info!(
      rows = rows.len(),
      width,
      scale,
      response_terms = response.terms().count(),
      "batch bootstrapping key generated"
    );

    Ok(BatchBootstrappingKey {
      params: *params,
      key_block: KeyBlock { rows, width },
      rotation,
      scale,
      response,
    })
  }

  pub fn params(&self) -> &BatchParams {
    &self.params
  }

  pub fn key_block(&self) -> &KeyBlock {
    &self.key_block
  }

  pub fn rotation_keys(&self) -> &RotationKeys {
    &self.rotation
  }

  pub fn cloud_key(&self) -> &CloudKey {
    self.rotation.cloud_key()
  }

  /// Slot scale `S` applied to every key block entry
  pub fn scale(&self) -> i64 {
    self.scale
  }

  /// Transform response `T(e_0)_0`
  pub fn response(&self) -> &SlotPolynomial {
    &self.response
  }
}

use crate::batch::mode::Mode;
use crate::error::{Error, Result};
use crate::fft::FFTPlan;
use crate::key::SecretKey;
use crate::params::{BatchParams, Torus, ZERO_TORUS};
use crate::trgsw::TRGSWLv1;
use crate::trlwe::TRLWELv1;

/// A TRGSW ciphertext whose message polynomial carries `r` integer slots,
/// slot `j` at coefficient `j·stride`, tagged with its packing mode.
///
/// Owns its rows exclusively. Every combinator either returns a fresh value
/// or mutates its own accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedCiphertext {
  trgsw: TRGSWLv1,
  mode: Mode,
}

/// Message polynomial with `slots[j]` at coefficient `j·stride`
fn slot_message(slots: &[i64], params: &BatchParams) -> Result<Vec<Torus>> {
  if slots.len() > params.r {
    return Err(Error::DimensionMismatch {
      context: "slot count within capacity",
      expected: params.r,
      actual: slots.len(),
    });
  }
  let stride = params.stride();
  let mut mu = vec![ZERO_TORUS; params.ring_n];
  for (j, &v) in slots.iter().enumerate() {
    mu[j * stride] = v as Torus;
  }
  Ok(mu)
}

impl PackedCiphertext {
  pub(crate) fn from_parts(trgsw: TRGSWLv1, mode: Mode) -> Self {
    PackedCiphertext { trgsw, mode }
  }

  pub fn encrypt(
    slots: &[i64],
    mode: Mode,
    secret: &SecretKey,
    params: &BatchParams,
    plan: &mut FFTPlan,
  ) -> Result<Self> {
    let mu = slot_message(slots, params)?;
    let trgsw_params = &params.security.trgsw_lv1;
    Ok(Self::from_parts(
      TRGSWLv1::encrypt_poly(&mu, trgsw_params.alpha, &secret.key_lv1, trgsw_params, plan),
      mode,
    ))
  }

  /// Encryption of `value` in slot `slot`, zero elsewhere
  pub fn encrypt_slot(
    slot: usize,
    value: i64,
    mode: Mode,
    secret: &SecretKey,
    params: &BatchParams,
    plan: &mut FFTPlan,
  ) -> Result<Self> {
    let mut slots = vec![0; slot + 1];
    slots[slot] = value;
    Self::encrypt(&slots, mode, secret, params, plan)
  }

  /// Noiseless encryption with a zero mask
  pub fn trivial(slots: &[i64], mode: Mode, params: &BatchParams) -> Result<Self> {
    let mu = slot_message(slots, params)?;
    Ok(Self::from_parts(
      TRGSWLv1::trivial(&mu, &params.security.trgsw_lv1),
      mode,
    ))
  }

  pub fn zero(mode: Mode, params: &BatchParams) -> Self {
    Self::from_parts(TRGSWLv1::zero(&params.security.trgsw_lv1), mode)
  }

  /// Additive identity with the same shape and mode as `self`
  pub fn zero_like(&self) -> Self {
    let n = self.trgsw.trlwe.first().map_or(0, TRLWELv1::n);
    Self::from_parts(
      TRGSWLv1 {
        trlwe: vec![TRLWELv1::new(n); self.trgsw.trlwe.len()],
      },
      self.mode,
    )
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn rows(&self) -> &[TRLWELv1] {
    &self.trgsw.trlwe
  }

  /// Slot-wise addition. Both operands must share a mode.
  pub fn add_assign(&mut self, rhs: &PackedCiphertext) -> Result<()> {
    if self.mode != rhs.mode {
      return Err(Error::ModeMismatch {
        left: self.mode,
        right: rhs.mode,
      });
    }
    if self.trgsw.trlwe.len() != rhs.trgsw.trlwe.len() {
      return Err(Error::DimensionMismatch {
        context: "packed ciphertext rows",
        expected: self.trgsw.trlwe.len(),
        actual: rhs.trgsw.trlwe.len(),
      });
    }
    self.trgsw.add_assign(&rhs.trgsw);
    Ok(())
  }

  /// Multiply the message by `X^k`. With `k = δ·stride` this rotates the
  /// slots by `δ`, negating what wraps past slot `r-1`.
  pub fn mul_by_monomial(&self, k: usize) -> PackedCiphertext {
    Self::from_parts(self.trgsw.mul_by_monomial(k), self.mode)
  }

  /// Slot values modulo `Bg`, centred
  pub fn decrypt_slots(
    &self,
    secret: &SecretKey,
    params: &BatchParams,
    plan: &mut FFTPlan,
  ) -> Vec<i64> {
    let coeffs = self
      .trgsw
      .decrypt_poly(&secret.key_lv1, &params.security.trgsw_lv1, plan);
    coeffs.into_iter().step_by(params.stride()).collect()
  }
}

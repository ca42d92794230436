use crate::error::{Error, Result};
use std::fmt;

/// Tensor factor a packed ciphertext currently lives in
///
/// `InFactor1x2` and `InFactor1x3` are resting modes. The two transition
/// modes only appear on the permutation side of a product and move a
/// ciphertext from one factor to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
  InFactor1x2,
  InFactor1x3,
  Factor12To13,
  Factor13To12,
}

impl Mode {
  pub const ALL: [Mode; 4] = [
    Mode::InFactor1x2,
    Mode::InFactor1x3,
    Mode::Factor12To13,
    Mode::Factor13To12,
  ];

  pub fn is_transition(self) -> bool {
    matches!(self, Mode::Factor12To13 | Mode::Factor13To12)
  }

  /// The transition leaving this factor
  pub fn outgoing(self) -> Result<Mode> {
    match self {
      Mode::InFactor1x2 => Ok(Mode::Factor12To13),
      Mode::InFactor1x3 => Ok(Mode::Factor13To12),
      transition => Err(Error::ModeMismatch {
        left: transition,
        right: transition,
      }),
    }
  }

  /// The other resting factor
  pub fn dual(self) -> Result<Mode> {
    match self {
      Mode::InFactor1x2 => Ok(Mode::InFactor1x3),
      Mode::InFactor1x3 => Ok(Mode::InFactor1x2),
      transition => Err(Error::ModeMismatch {
        left: transition,
        right: transition,
      }),
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Mode::InFactor1x2 => "R12",
      Mode::InFactor1x3 => "R13",
      Mode::Factor12To13 => "R12->R13",
      Mode::Factor13To12 => "R13->R12",
    };
    f.write_str(s)
  }
}

/// Output mode of a product of two packed ciphertexts.
///
/// Only a resting factor times its outgoing transition is defined, in either
/// order. Everything else is a `ModeMismatch`.
pub fn compose(m1: Mode, m2: Mode) -> Result<Mode> {
  use Mode::*;
  match (m1, m2) {
    (InFactor1x2, Factor12To13) | (Factor12To13, InFactor1x2) => Ok(InFactor1x3),
    (InFactor1x3, Factor13To12) | (Factor13To12, InFactor1x3) => Ok(InFactor1x2),
    (left, right) => Err(Error::ModeMismatch { left, right }),
  }
}

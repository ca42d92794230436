//! Error type for batch bootstrapping
//!
//! Every failure in this crate comes from a programming or parameterization
//! mistake (wrong vector length, illegal mode composition, undersized key),
//! never from a transient condition. Errors are therefore returned once and
//! propagated unchanged to the caller.

use crate::batch::mode::Mode;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// A vector or matrix had the wrong length, or a length was not divisible
  /// by the required factor.
  DimensionMismatch {
    context: &'static str,
    expected: usize,
    actual: usize,
  },
  /// Two packed ciphertexts whose modes cannot be composed or added.
  ModeMismatch { left: Mode, right: Mode },
  /// The slot capacity cannot hold what the parameters ask of it.
  CapacityViolation {
    context: &'static str,
    capacity: usize,
    required: usize,
  },
  /// A key block row was requested that the key does not contain.
  KeyMissing { row: usize, rows: usize },
  /// A parameter value outside its legal domain.
  InvalidParameter { name: &'static str, reason: String },
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::DimensionMismatch {
        context,
        expected,
        actual,
      } => write!(
        f,
        "dimension mismatch in {}: expected {}, got {}",
        context, expected, actual
      ),
      Error::ModeMismatch { left, right } => {
        write!(f, "mode mismatch: cannot combine {} with {}", left, right)
      }
      Error::CapacityViolation {
        context,
        capacity,
        required,
      } => write!(
        f,
        "capacity violation in {}: capacity {} does not satisfy requirement {}",
        context, capacity, required
      ),
      Error::KeyMissing { row, rows } => {
        write!(f, "key block row {} missing (key has {} rows)", row, rows)
      }
      Error::InvalidParameter { name, reason } => {
        write!(f, "invalid parameter `{}`: {}", name, reason)
      }
    }
  }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Fails with `DimensionMismatch` unless `actual == expected`.
pub(crate) fn ensure_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
  if expected == actual {
    Ok(())
  } else {
    Err(Error::DimensionMismatch {
      context,
      expected,
      actual,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_mentions_context() {
    let err = Error::DimensionMismatch {
      context: "vec_mat_mult",
      expected: 4,
      actual: 3,
    };
    let msg = err.to_string();
    assert!(msg.contains("vec_mat_mult"));
    assert!(msg.contains('4') && msg.contains('3'));

    let err = Error::ModeMismatch {
      left: Mode::InFactor1x2,
      right: Mode::InFactor1x3,
    };
    assert!(err.to_string().contains("R12"));
  }

  #[test]
  fn test_ensure_len() {
    assert!(ensure_len("x", 3, 3).is_ok());
    assert_eq!(
      ensure_len("x", 3, 2),
      Err(Error::DimensionMismatch {
        context: "x",
        expected: 3,
        actual: 2
      })
    );
  }
}

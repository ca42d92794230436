/// Parameter selection for batch bootstrapping
///
/// Two layers of parameters live here:
///
/// - [`SecurityParams`]: the lattice layer (LWE dimension, ring degree,
///   gadget and key switching bases, noise widths).
/// - [`BatchParams`]: the transform shape (radix `d`, depth `rho`, batch
///   capacity `r`, modulus switching target `q`) layered on top.
///
/// The presets are toy parameters sized so that a full batch bootstrapping
/// key fits comfortably in memory. They are not secure.
///
/// # Usage Example
///
/// ```rust
/// use rs_batch_tfhe::params::{BatchParams, TOY_N1024};
///
/// let params = BatchParams::builder(2, 2).security(TOY_N1024).build().unwrap();
/// assert_eq!(params.n, 8);
/// assert_eq!(params.r, 512);
/// ```
pub type Torus = u32;
pub type HalfTorus = i32;

pub const TORUS_SIZE: usize = std::mem::size_of::<Torus>() * 8;
pub const ZERO_TORUS: Torus = 0;

use crate::error::{Error, Result};

// ============================================================================
// LATTICE PARAMETER STRUCTURE
// ============================================================================

/// Lattice parameter set shared by every ciphertext type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecurityParams {
  pub security_bits: usize,
  pub description: &'static str,
  pub tlwe_lv0: TlweParams,
  pub tlwe_lv1: TlweParams,
  pub trlwe_lv1: TrlweParams,
  pub trgsw_lv1: TrgswParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TlweParams {
  pub n: usize,
  pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrlweParams {
  pub n: usize,
  pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrgswParams {
  pub n: usize,
  pub nbit: usize,
  pub bgbit: u32,
  pub bg: u32,
  pub l: usize,
  pub basebit: usize,
  pub iks_t: usize,
  pub alpha: f64,
}

impl TrgswParams {
  /// Torus value of the gadget entry `Bg^{-(level+1)}`
  pub fn gadget(&self, level: usize) -> Torus {
    1 << (TORUS_SIZE as u32 - (level as u32 + 1) * self.bgbit)
  }

  /// Number of bits resolved by a full gadget decomposition
  pub fn precision_bits(&self) -> u32 {
    self.bgbit * self.l as u32
  }
}

// ============================================================================
// PARAMETER CONSTANTS
// ============================================================================

/// Ring degree 1024, the degree used by the reference scenario
pub const TOY_N1024: SecurityParams = SecurityParams {
  security_bits: 0,
  description: "toy parameters (N=1024, n_lwe=16), not secure",
  tlwe_lv0: TlweParams {
    n: 16,
    alpha: 2.0e-5,
  },
  tlwe_lv1: TlweParams {
    n: 1024,
    alpha: 2.0e-8,
  },
  trlwe_lv1: TrlweParams {
    n: 1024,
    alpha: 2.0e-8,
  },
  trgsw_lv1: TrgswParams {
    n: 1024,
    nbit: 10,
    bgbit: 6,
    bg: 64,
    l: 3,
    basebit: 2,
    iks_t: 9,
    alpha: 2.0e-8,
  },
};

/// Ring degree 256, for fast tests
pub const TOY_N256: SecurityParams = SecurityParams {
  security_bits: 0,
  description: "toy parameters (N=256, n_lwe=16), not secure",
  tlwe_lv0: TlweParams {
    n: 16,
    alpha: 2.0e-5,
  },
  tlwe_lv1: TlweParams {
    n: 256,
    alpha: 2.0e-8,
  },
  trlwe_lv1: TrlweParams {
    n: 256,
    alpha: 2.0e-8,
  },
  trgsw_lv1: TrgswParams {
    n: 256,
    nbit: 8,
    bgbit: 6,
    bg: 64,
    l: 3,
    basebit: 2,
    iks_t: 9,
    alpha: 2.0e-8,
  },
};

/// Default lattice parameters
pub const DEFAULT_SECURITY: SecurityParams = TOY_N1024;

/// Get a description of a lattice parameter set
pub fn security_info(params: SecurityParams) -> String {
  format!(
    "Security level: {} bits ({})",
    params.security_bits, params.description
  )
}

// ============================================================================
// BATCH PARAMETERS
// ============================================================================

/// Shape of one batch bootstrapping instance
///
/// Invariants established by [`BatchParamsBuilder::build`]:
/// - `d` is a power of two and `n = 2·d^rho`
/// - `r` is a power of two dividing `ring_n`, and `r > 2·d·v`
/// - `n <= r`, so every input owns a distinct slot
/// - `q` is a power of two no larger than the gadget precision `2^{bgbit·L}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchParams {
  /// Number of LWE ciphertexts refreshed per call
  pub n: usize,
  /// Ring degree `N`
  pub ring_n: usize,
  /// Modulus switching target for the input LWE ciphertexts
  pub q: usize,
  /// Transform radix
  pub d: usize,
  /// Recursion depth
  pub rho: usize,
  /// Batch capacity (number of logical slots)
  pub r: usize,
  /// Small-ring split factor
  pub v: usize,
  pub security: SecurityParams,
}

impl BatchParams {
  pub fn builder(d: usize, rho: usize) -> BatchParamsBuilder {
    BatchParamsBuilder {
      d,
      rho,
      security: DEFAULT_SECURITY,
      capacity: None,
      split_factor: 1,
      modulus: None,
    }
  }

  /// Distance in coefficients between neighbouring slots
  pub fn stride(&self) -> usize {
    self.ring_n / self.r
  }

  /// Length of the vector `hom_dft_inverse` expects at depth `rho`: `(2d)^(rho-1)`
  pub fn transform_len(&self) -> usize {
    (2 * self.d).pow(self.rho.saturating_sub(1) as u32)
  }

  /// Length of the vector `hom_dft_inverse` returns at depth `rho`
  pub fn output_len(&self) -> usize {
    if self.rho <= 1 {
      1
    } else {
      self.d.pow((self.rho - 1) as u32)
    }
  }

  /// Slots per power of the primitive `2d`-th root `ω = Y^{r/d}`
  pub fn root_step(&self) -> usize {
    self.r / self.d
  }

  /// Butterfly combine rotation at recursion level `level`: `N / 2^level` slots
  pub fn combine_rotation(&self, level: usize) -> usize {
    self.ring_n >> level
  }

  pub fn modulus_bits(&self) -> usize {
    self.q.trailing_zeros() as usize
  }

  /// `2^{bgbit·L} / q`: the product of the key scale and the transform gain
  /// that lands an encrypted phase back on the torus after extraction.
  pub fn gadget_scale(&self) -> i64 {
    (1i64 << self.security.trgsw_lv1.precision_bits()) / self.q as i64
  }

  pub fn describe(&self) -> String {
    format!(
      "batch params: n={} N={} q={} d={} rho={} r={} v={} (stride {}, transform length {})",
      self.n,
      self.ring_n,
      self.q,
      self.d,
      self.rho,
      self.r,
      self.v,
      self.stride(),
      self.transform_len()
    )
  }
}

#[derive(Debug, Clone)]
pub struct BatchParamsBuilder {
  d: usize,
  rho: usize,
  security: SecurityParams,
  capacity: Option<usize>,
  split_factor: usize,
  modulus: Option<usize>,
}

impl BatchParamsBuilder {
  pub fn security(mut self, security: SecurityParams) -> Self {
    self.security = security;
    self
  }

  /// Batch capacity `r` (defaults to `N/2`)
  pub fn capacity(mut self, r: usize) -> Self {
    self.capacity = Some(r);
    self
  }

  pub fn split_factor(mut self, v: usize) -> Self {
    self.split_factor = v;
    self
  }

  /// Modulus switching target `q` (defaults to `2N`)
  pub fn modulus(mut self, q: usize) -> Self {
    self.modulus = Some(q);
    self
  }

  pub fn build(self) -> Result<BatchParams> {
    let BatchParamsBuilder {
      d,
      rho,
      security,
      capacity,
      split_factor: v,
      modulus,
    } = self;
    let ring_n = security.trgsw_lv1.n;

    if !d.is_power_of_two() {
      return Err(invalid("d", format!("{} is not a power of two", d)));
    }
    if rho == 0 {
      return Err(invalid("rho", "recursion depth must be at least 1".to_string()));
    }
    if !ring_n.is_power_of_two() || ring_n < 2 {
      return Err(invalid("N", format!("{} is not a power of two", ring_n)));
    }
    if v == 0 {
      return Err(invalid("v", "split factor must be at least 1".to_string()));
    }
    let n = d
      .checked_pow(rho as u32)
      .and_then(|p| p.checked_mul(2))
      .ok_or_else(|| invalid("rho", format!("2·{}^{} overflows", d, rho)))?;

    let r = capacity.unwrap_or(ring_n / 2);
    if r == 0 || !r.is_power_of_two() || r > ring_n {
      return Err(invalid("r", format!("{} does not divide N={}", r, ring_n)));
    }
    if r <= 2 * d * v {
      return Err(Error::CapacityViolation {
        context: "batch capacity r > 2dv",
        capacity: r,
        required: 2 * d * v + 1,
      });
    }
    if n > r {
      return Err(Error::CapacityViolation {
        context: "one slot per input",
        capacity: r,
        required: n,
      });
    }

    let q = modulus.unwrap_or(2 * ring_n);
    let precision = 1usize << security.trgsw_lv1.precision_bits();
    if q < 2 || !q.is_power_of_two() || q > precision {
      return Err(invalid(
        "q",
        format!("{} must be a power of two in [2, {}]", q, precision),
      ));
    }

    Ok(BatchParams {
      n,
      ring_n,
      q,
      d,
      rho,
      r,
      v,
      security,
    })
  }
}

fn invalid(name: &'static str, reason: String) -> Error {
  Error::InvalidParameter { name, reason }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_security_info() {
    let info = security_info(TOY_N1024);
    println!("{}", info);
    assert!(info.contains("N=1024"));
  }

  #[test]
  fn test_parameter_constants() {
    assert_eq!(TOY_N1024.trgsw_lv1.n, 1 << TOY_N1024.trgsw_lv1.nbit);
    assert_eq!(TOY_N256.trgsw_lv1.n, 1 << TOY_N256.trgsw_lv1.nbit);
    assert_eq!(TOY_N1024.trgsw_lv1.bg, 1 << TOY_N1024.trgsw_lv1.bgbit);
    assert_eq!(TOY_N1024.trgsw_lv1.gadget(0), 1 << 26);
    assert_eq!(TOY_N1024.trgsw_lv1.gadget(2), 1 << 14);
  }

  #[test]
  fn test_reference_shape() {
    let params = BatchParams::builder(2, 2).security(TOY_N1024).build().unwrap();
    assert_eq!(params.n, 8);
    assert_eq!(params.ring_n, 1024);
    assert_eq!(params.r, 512);
    assert_eq!(params.q, 2048);
    assert_eq!(params.stride(), 2);
    assert_eq!(params.transform_len(), 4);
    assert_eq!(params.output_len(), 2);
    assert_eq!(params.root_step(), 256);
    assert_eq!(params.combine_rotation(2), 256);
    assert_eq!(params.modulus_bits(), 11);
    assert_eq!(params.gadget_scale(), 128);
    assert!(params.describe().contains("rho=2"));
  }

  #[test]
  fn test_capacity_violation_is_an_error() {
    let err = BatchParams::builder(2, 2)
      .security(TOY_N256)
      .capacity(4)
      .build()
      .unwrap_err();
    assert!(matches!(
      err,
      Error::CapacityViolation {
        capacity: 4,
        required: 5,
        ..
      }
    ));

    let err = BatchParams::builder(4, 2)
      .security(TOY_N256)
      .capacity(16)
      .split_factor(2)
      .build()
      .unwrap_err();
    assert!(matches!(err, Error::CapacityViolation { .. }));
  }

  #[test]
  fn test_too_many_inputs_for_capacity() {
    // n = 2·2^6 = 128 inputs cannot fit into 64 slots
    let err = BatchParams::builder(2, 6)
      .security(TOY_N256)
      .capacity(64)
      .build()
      .unwrap_err();
    assert!(matches!(
      err,
      Error::CapacityViolation {
        capacity: 64,
        required: 128,
        ..
      }
    ));
  }

  #[test]
  fn test_invalid_parameters() {
    assert!(matches!(
      BatchParams::builder(3, 2).build(),
      Err(Error::InvalidParameter { name: "d", .. })
    ));
    assert!(matches!(
      BatchParams::builder(2, 0).build(),
      Err(Error::InvalidParameter { name: "rho", .. })
    ));
    assert!(matches!(
      BatchParams::builder(2, 2).capacity(48).build(),
      Err(Error::InvalidParameter { name: "r", .. })
    ));
    assert!(matches!(
      BatchParams::builder(2, 2).modulus(1000).build(),
      Err(Error::InvalidParameter { name: "q", .. })
    ));
    assert!(matches!(
      BatchParams::builder(2, 2).modulus(1 << 20).build(),
      Err(Error::InvalidParameter { name: "q", .. })
    ));
  }
}

//! FFT Processor Module
//!
//! This module provides abstracted FFT operations for negacyclic polynomial
//! multiplication in the ring R[X]/(X^N+1).
//!
//! # Usage
//!
//! ```ignore
//! use crate::fft::{with_fft_plan, FFTProcessor};
//!
//! let product = with_fft_plan(1024, |plan| plan.processor.poly_mul(&a, &b));
//! ```
//!
//! # Algorithm
//!
//! The negacyclic FFT embeds an N-point negacyclic problem into a 2N-point
//! cyclic FFT, extracting only the odd frequency indices which correspond
//! to the primitive 2N-th roots of unity needed for polynomial multiplication
//! modulo X^N+1.

use crate::params::Torus;
use std::cell::RefCell;
use std::collections::HashMap;

pub mod rustfft_processor;

/// FFT Processor trait for negacyclic polynomial multiplication in R[X]/(X^N+1)
pub trait FFTProcessor {
  /// Create a new FFT processor for polynomials of size n
  fn new(n: usize) -> Self;

  /// Forward transform: time domain (N torus values) → frequency domain
  /// (N/2 complex values stored as `[re_0..re_{N/2-1}, im_0..im_{N/2-1}]`)
  fn ifft(&mut self, input: &[Torus]) -> Vec<f64>;

  /// Inverse transform: frequency domain → time domain, rounded onto the torus
  fn fft(&mut self, input: &[f64]) -> Vec<Torus>;

  /// Negacyclic polynomial multiplication: a(X) * b(X) mod (X^N+1)
  ///
  /// Exact as long as one operand has small coefficients (a key, a digit
  /// polynomial or a monomial), which is the only way this crate uses it.
  fn poly_mul(&mut self, a: &[Torus], b: &[Torus]) -> Vec<Torus> {
    let a_fft = self.ifft(a);
    let b_fft = self.ifft(b);
    let mut acc = vec![0.0f64; a_fft.len()];
    fma_in_fd(&mut acc, &a_fft, &b_fft);
    self.fft(&acc)
  }
}

pub type DefaultFFTProcessor = rustfft_processor::RustFFTProcessor;

pub struct FFTPlan {
  pub processor: DefaultFFTProcessor,
  pub n: usize,
}

impl FFTPlan {
  pub fn new(n: usize) -> FFTPlan {
    FFTPlan {
      processor: DefaultFFTProcessor::new(n),
      n,
    }
  }
}

thread_local!(static FFT_PLANS: RefCell<HashMap<usize, FFTPlan>> = RefCell::new(HashMap::new()));

/// Run `f` with this thread's cached plan for ring degree `n`.
///
/// The plan is checked out of the cache for the duration of `f`, so a nested
/// call on the same thread (for example from a work-stealing join) builds a
/// fresh plan instead of aliasing the borrowed one.
pub fn with_fft_plan<R>(n: usize, f: impl FnOnce(&mut FFTPlan) -> R) -> R {
  let mut plan = FFT_PLANS
    .with(|plans| plans.borrow_mut().remove(&n))
    .unwrap_or_else(|| FFTPlan::new(n));
  let res = f(&mut plan);
  FFT_PLANS.with(|plans| plans.borrow_mut().insert(n, plan));
  res
}

/// Complex multiply-accumulate in frequency domain: `res += a * b / 2`
///
/// The 1/2 compensates the factor two the odd-bin extraction puts on every
/// frequency bin.
pub fn fma_in_fd(res: &mut [f64], a: &[f64], b: &[f64]) {
  let ns2 = res.len() / 2;
  for i in 0..ns2 {
    let (a_re, a_im) = (a[i], a[i + ns2]);
    let (b_re, b_im) = (b[i], b[i + ns2]);
    res[i] += (a_re * b_re - a_im * b_im) * 0.5;
    res[i + ns2] += (a_re * b_im + a_im * b_re) * 0.5;
  }
}

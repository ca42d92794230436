/// Pure Rust FFT processor using RustFFT library
///
/// This implementation provides negacyclic polynomial multiplication
/// for any architecture and any power-of-two ring degree.
use super::FFTProcessor;
use crate::params::Torus;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub struct RustFFTProcessor {
  n: usize,
  fft: Arc<dyn Fft<f64>>,
  buffer: Vec<Complex<f64>>,
  scratch: Vec<Complex<f64>>,
}

impl FFTProcessor for RustFFTProcessor {
  fn new(n: usize) -> Self {
    tracing::debug!(n, "planning negacyclic rustfft processor");
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(2 * n);
    let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    RustFFTProcessor {
      n,
      fft,
      buffer: vec![Complex::new(0.0, 0.0); 2 * n],
      scratch,
    }
  }

  fn ifft(&mut self, input: &[Torus]) -> Vec<f64> {
    let mut result = vec![0.0f64; self.n];
    self.execute_reverse_torus32(&mut result, input);
    result
  }

  fn fft(&mut self, input: &[f64]) -> Vec<Torus> {
    let mut result = vec![0 as Torus; self.n];
    self.execute_direct_torus32(&mut result, input);
    result
  }
}

impl RustFFTProcessor {
  /// Negacyclic FFT: Time domain → Frequency domain
  ///
  /// 1. Embed the N-point negacyclic problem into a 2N-point cyclic one:
  ///    `[a[0], ..., a[N-1], -a[0], ..., -a[N-1]]`
  /// 2. Apply a 2N-point complex FFT
  /// 3. Keep the odd bins only (the primitive 2N-th roots of unity). These
  ///    N/2 values fully represent the negacyclic transform.
  fn execute_reverse_torus32(&mut self, result: &mut [f64], input: &[Torus]) {
    let n = self.n;
    let ns2 = n / 2;

    for (i, &x) in input.iter().enumerate().take(n) {
      let val = x as i32 as f64;
      self.buffer[i] = Complex::new(val, 0.0);
      self.buffer[i + n] = Complex::new(-val, 0.0);
    }

    self
      .fft
      .process_with_scratch(&mut self.buffer, &mut self.scratch);

    for i in 0..ns2 {
      let idx = 2 * i + 1;
      result[i] = self.buffer[idx].re;
      result[i + ns2] = self.buffer[idx].im;
    }
  }

  /// Negacyclic IFFT: Frequency domain → Time domain
  ///
  /// Places the N/2 values at odd indices of a 2N buffer together with their
  /// conjugates at `2N-1-2i`, runs the same forward FFT, and reads the time
  /// domain back in reversed order.
  fn execute_direct_torus32(&mut self, result: &mut [Torus], input: &[f64]) {
    let n = self.n;
    let ns2 = n / 2;
    let nn = 2 * n;
    let scale = 2.0 / (n as f64);

    self
      .buffer
      .iter_mut()
      .for_each(|c| *c = Complex::new(0.0, 0.0));
    for i in 0..ns2 {
      self.buffer[2 * i + 1] = Complex::new(input[i] * scale, input[i + ns2] * scale);
      self.buffer[nn - 1 - 2 * i] = Complex::new(input[i] * scale, -input[i + ns2] * scale);
    }

    self
      .fft
      .process_with_scratch(&mut self.buffer, &mut self.scratch);

    let adjust = 0.25;
    result[0] = to_torus(self.buffer[0].re * adjust);
    for i in 1..n {
      result[i] = to_torus(-self.buffer[n - i].re * adjust);
    }
  }
}

fn to_torus(x: f64) -> Torus {
  // f64 -> i64 saturates in Rust; the torus wraps, so reduce first
  (x.round() % 4294967296.0) as i64 as Torus
}

use crate::params::{HalfTorus, Torus, TORUS_SIZE};
use rand::Rng;
use rand_distr::StandardNormal;

const TWO_POW_32: f64 = (1u64 << 32) as f64;

/// Map a real number onto the torus `R/Z`, wrapping modulo 1.
pub fn f64_to_torus(d: f64) -> Torus {
  let torus = (d % 1.0) * TWO_POW_32;
  torus.round() as i64 as Torus
}

pub fn f64_to_torus_vec(d: &[f64]) -> Vec<Torus> {
  d.iter().map(|&e| f64_to_torus(e)).collect()
}

/// Map a fixed-point value in `[-1/2, 1/2)` onto the torus, saturating.
///
/// Values at or above `1/2` clamp to the largest positive torus value and
/// values below `-1/2` clamp to the most negative one, instead of wrapping
/// around to the opposite sign. `NaN` encodes as zero.
pub fn f64_to_torus_saturating(d: f64) -> Torus {
  if d.is_nan() {
    return 0;
  }
  let scaled = (d * TWO_POW_32).round();
  if scaled >= HalfTorus::MAX as f64 {
    HalfTorus::MAX as Torus
  } else if scaled <= HalfTorus::MIN as f64 {
    HalfTorus::MIN as Torus
  } else {
    scaled as i64 as HalfTorus as Torus
  }
}

/// Signed representative of a torus value in `[-1/2, 1/2)`.
pub fn torus_to_f64(t: Torus) -> f64 {
  (t as HalfTorus) as f64 / TWO_POW_32
}

/// `mu` plus centred Gaussian noise of standard deviation `alpha`, on the torus.
pub fn gaussian_f64<R: Rng>(mu: f64, alpha: f64, rng: &mut R) -> Torus {
  let e: f64 = rng.sample(StandardNormal);
  f64_to_torus(mu + e * alpha)
}

/// Uniform binary secret of length `n`.
pub fn random_binary_vec<R: Rng>(n: usize, rng: &mut R) -> Vec<Torus> {
  (0..n).map(|_| rng.gen::<bool>() as Torus).collect()
}

/// Round a torus value to the nearest multiple of `2^-bits`, returning the
/// integer in `[0, 2^bits)`.
pub fn mod_switch(t: Torus, bits: usize) -> usize {
  debug_assert!(bits >= 1 && bits < TORUS_SIZE);
  let half = 1 << (TORUS_SIZE - bits - 1);
  (t.wrapping_add(half) >> (TORUS_SIZE - bits)) as usize
}

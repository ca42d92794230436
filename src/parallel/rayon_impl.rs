//! Rayon-based implementation of the Railgun trait

use super::{ParallelConfig, Railgun};
use rayon::prelude::*;

/// Rayon-based parallelization backend
///
/// Runs on Rayon's global work-stealing pool; `with_config` builds a
/// dedicated pool for the duration of one closure.
#[derive(Debug, Clone)]
pub struct RayonRailgun {
  config: ParallelConfig,
}

impl RayonRailgun {
  pub fn new() -> Self {
    Self {
      config: ParallelConfig::default(),
    }
  }

  pub fn with_config(config: ParallelConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ParallelConfig {
    &self.config
  }
}

impl Default for RayonRailgun {
  fn default() -> Self {
    Self::new()
  }
}

impl Railgun for RayonRailgun {
  fn par_map<T, U, F>(&self, input: &[T], f: F) -> Vec<U>
  where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
  {
    input.par_iter().map(f).collect()
  }

  fn par_map_indexed<T, U, F>(&self, input: &[T], f: F) -> Vec<U>
  where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync + Send,
  {
    input.par_iter().enumerate().map(|(i, x)| f(i, x)).collect()
  }

  fn par_try_map<T, U, E, F>(&self, input: &[T], f: F) -> Result<Vec<U>, E>
  where
    T: Sync,
    U: Send,
    E: Send,
    F: Fn(&T) -> Result<U, E> + Sync + Send,
  {
    input.par_iter().map(f).collect()
  }

  fn par_try_map_range<U, E, F>(&self, len: usize, f: F) -> Result<Vec<U>, E>
  where
    U: Send,
    E: Send,
    F: Fn(usize) -> Result<U, E> + Sync + Send,
  {
    (0..len).into_par_iter().map(f).collect()
  }

  fn with_config<F, R>(&self, config: ParallelConfig, f: F) -> R
  where
    F: Fn() -> R + Send + Sync,
    R: Send,
  {
    let mut builder = rayon::ThreadPoolBuilder::new();

    if let Some(stack_size) = config.stack_size {
      builder = builder.stack_size(stack_size);
    }

    if let Some(num_threads) = config.num_threads {
      builder = builder.num_threads(num_threads);
    }

    match builder.build() {
      Ok(pool) => pool.install(f),
      Err(err) => {
        tracing::warn!(%err, "could not build a dedicated pool, using the global one");
        f()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rayon_par_map() {
    let railgun = RayonRailgun::new();
    let input = vec![1, 2, 3, 4, 5, 6, 7, 8];
    let result = railgun.par_map(&input, |x| x * x);
    assert_eq!(result, vec![1, 4, 9, 16, 25, 36, 49, 64]);
  }

  #[test]
  fn test_rayon_large_stack() {
    let railgun = RayonRailgun::new();
    assert_eq!(railgun.config().num_threads, None);
    let config = ParallelConfig {
      stack_size: Some(16 * 1024 * 1024),
      num_threads: Some(4),
    };

    let result = railgun.with_config(config, || {
      let data: Vec<i32> = (0..1000).collect();
      data.par_iter().map(|x| x * 2).sum::<i32>()
    });

    assert_eq!(result, 999000);
  }

  #[test]
  fn test_rayon_indexed() {
    let railgun = RayonRailgun::new();
    let input = vec!["a", "b", "c"];
    let result = railgun.par_map_indexed(&input, |i, s| format!("{}{}", i, s));
    assert_eq!(result, vec!["0a", "1b", "2c"]);
  }
}

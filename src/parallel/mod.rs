//! Parallelization abstraction layer
//!
//! The `Railgun` trait abstracts over the parallel backend used by key
//! generation, the recursive transform and output extraction. Every engine
//! step is fallible, so alongside plain maps the trait offers `par_try_map`
//! variants that stop at, and return, the first error.
//!
//! The approach uses generics with a simple trait bound, making it zero-cost
//! while still allowing another backend to be swapped in.

use std::sync::OnceLock;

pub mod rayon_impl;

pub use rayon_impl::RayonRailgun;

/// Configuration for parallel execution
#[derive(Debug, Clone)]
pub struct ParallelConfig {
  /// Stack size per thread (in bytes)
  pub stack_size: Option<usize>,
  /// Number of threads (None = automatic)
  pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
  fn default() -> Self {
    Self {
      stack_size: Some(8 * 1024 * 1024),
      num_threads: None,
    }
  }
}

/// Trait for parallelization backends
pub trait Railgun: Clone + Send + Sync {
  /// Parallel map over a slice, preserving order
  fn par_map<T, U, F>(&self, input: &[T], f: F) -> Vec<U>
  where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send;

  /// Parallel map over a slice with indexed function
  fn par_map_indexed<T, U, F>(&self, input: &[T], f: F) -> Vec<U>
  where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync + Send;

  /// Parallel fallible map over a slice, preserving order. Fails with one of
  /// the errors produced if any element fails.
  fn par_try_map<T, U, E, F>(&self, input: &[T], f: F) -> Result<Vec<U>, E>
  where
    T: Sync,
    U: Send,
    E: Send,
    F: Fn(&T) -> Result<U, E> + Sync + Send;

  /// Fallible map over the index range `0..len`
  fn par_try_map_range<U, E, F>(&self, len: usize, f: F) -> Result<Vec<U>, E>
  where
    U: Send,
    E: Send,
    F: Fn(usize) -> Result<U, E> + Sync + Send;

  /// Execute a closure with a custom parallel configuration
  ///
  /// This allows operations that need specific thread pool settings
  /// (e.g., larger stack sizes for deep recursion).
  fn with_config<F, R>(&self, config: ParallelConfig, f: F) -> R
  where
    F: Fn() -> R + Send + Sync,
    R: Send;
}

/// Global default parallelization backend (singleton)
///
/// Initialized on first use with Rayon defaults; later calls just return
/// the reference.
static DEFAULT_RAILGUN: OnceLock<RayonRailgun> = OnceLock::new();

pub fn default_railgun() -> &'static RayonRailgun {
  DEFAULT_RAILGUN.get_or_init(RayonRailgun::default)
}

/// Create a custom Rayon-based parallelization backend
pub fn rayon_railgun(config: ParallelConfig) -> RayonRailgun {
  RayonRailgun::with_config(config)
}

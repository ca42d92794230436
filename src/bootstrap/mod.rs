pub mod amortized;

use crate::batch::BatchBootstrappingKey;
use crate::error::Result;
use crate::tlwe::{TLWELv0, TLWELv1};

pub use amortized::{batch_bootstrap, batch_bootstrap_without_key_switch, AmortizedBootstrap};

/// Trait for batch bootstrapping strategies
///
/// A batch bootstrap refreshes `n` noisy LWE ciphertexts at once. Instead of
/// one blind rotation per input, the inputs are packed into slots of a
/// single TRGSW ciphertext and refreshed together by a homomorphic inverse
/// transform.
///
/// # Typical Flow
/// 1. Packing: modulus switch every input and accumulate the batched key
/// 2. Transform: run the recursive inverse transform over the packed vector
/// 3. Extraction: sample extract one LWE per slot
/// 4. Key switching: bring every output back to the level 0 key
pub trait BatchBootstrap: Send + Sync {
  /// Refresh a full batch. Either every output is produced or the call fails.
  fn bootstrap_batch(&self, inputs: &[TLWELv0], key: &BatchBootstrappingKey)
    -> Result<Vec<TLWELv0>>;

  /// Refresh without the final key switch.
  ///
  /// Outputs are encrypted under the ring key `s` (level 1).
  fn bootstrap_batch_without_key_switch(
    &self,
    inputs: &[TLWELv0],
    key: &BatchBootstrappingKey,
  ) -> Result<Vec<TLWELv1>>;

  /// Get the name of this bootstrap strategy
  fn name(&self) -> &str;
}

/// Get the default batch bootstrap strategy
pub fn default_bootstrap() -> Box<dyn BatchBootstrap> {
  Box::new(AmortizedBootstrap::new())
}

//! Amortized batch bootstrapping for TFHE.
//!
//! `n` LWE ciphertexts are packed into the slots of one TRGSW ciphertext and
//! refreshed together by a recursive homomorphic inverse transform. See
//! [`bootstrap::batch_bootstrap`] for the entry point and [`batch`] for the
//! transform engine.

pub mod batch;
pub mod bootstrap;
pub mod error;
pub mod fft;
pub mod key;
pub mod keyswitch;
pub mod parallel;
pub mod params;
pub mod tlwe;
pub mod trgsw;
pub mod trlwe;
pub mod utils;

pub use error::{Error, Result};

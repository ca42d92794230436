//! Packed-ciphertext transform engine.
//!
//! Leaf to root: [`mode`] algebra, the [`rearrange`] stride transform,
//! [`vec_mat`] accumulation, slot [`rotation`], exponent [`matrix`] products
//! and the recursive [`hom_dft`] transform. [`key`] holds the batched
//! bootstrapping key the orchestrator in [`crate::bootstrap`] consumes.

pub mod hom_dft;
pub mod key;
pub mod matrix;
pub mod mode;
pub mod packed;
pub mod plain;
pub mod rearrange;
pub mod rotation;
pub mod vec_mat;

pub use hom_dft::{hom_dft_inverse, pad_to_transform_len, SlotArithmetic};
pub use key::{BatchBootstrappingKey, KeyBlock};
pub use matrix::{enc_vec_mat_mult, ExponentMatrix};
pub use mode::{compose, Mode};
pub use packed::PackedCiphertext;
pub use rotation::{batch_anti_rot, batch_permute, inv_auto, RotationKeys, SlotPermutation};
pub use vec_mat::vec_mat_mult;

use crate::batch::packed::PackedCiphertext;
use crate::error::{ensure_len, Error, Result};

/// `Σ_{i : bits[i]} key_row[i]`, starting from the zero ciphertext in the mode
/// of `key_row[0]`.
///
/// The plaintext selects which key entries are added, so no ciphertext
/// multiplication is involved. An empty key row has no mode to start from
/// and is rejected.
pub fn vec_mat_mult(bits: &[bool], key_row: &[PackedCiphertext]) -> Result<PackedCiphertext> {
  let first = key_row.first().ok_or(Error::DimensionMismatch {
    context: "vec_mat_mult key row",
    expected: bits.len().max(1),
    actual: 0,
  })?;
  let mut acc = first.zero_like();
  vec_mat_mult_into(&mut acc, bits, key_row)?;
  Ok(acc)
}

/// Accumulating form of [`vec_mat_mult`]: adds the selected entries into `acc`.
pub fn vec_mat_mult_into(
  acc: &mut PackedCiphertext,
  bits: &[bool],
  key_row: &[PackedCiphertext],
) -> Result<()> {
  ensure_len("vec_mat_mult bits against key row", key_row.len(), bits.len())?;
  for (&bit, entry) in bits.iter().zip(key_row.iter()) {
    if bit {
      acc.add_assign(entry)?;
    }
  }
  Ok(())
}

/// Little-endian bits of `value`, `width` of them
pub fn bits_of(value: usize, width: usize) -> Vec<bool> {
  (0..width).map(|t| (value >> t) & 1 == 1).collect()
}

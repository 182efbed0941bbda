//! RFC 4648 Base32.
//!
//! Decoding is hand rolled so it can write into a fixed buffer and report
//! exactly why an input was refused. Encoding is only needed for
//! provisioning and tests, so it goes through the `base32` crate.

use crate::error::DecodeError;

pub fn encode(secret: &[u8]) -> String {
  base32::encode(base32::Alphabet::RFC4648 { padding: true }, secret)
}

fn value_of(c: char) -> Option<u8> {
  match c {
    'A'..='Z' => Some(c as u8 - b'A'),
    'a'..='z' => Some(c as u8 - b'a'),
    '2'..='7' => Some(c as u8 - b'2' + 26),
    _ => None,
  }
}

fn is_skipped(c: char) -> bool {
  matches!(c, '=' | ' ' | '\t' | '\n' | '\r')
}

/// Decodes `encoded` into `out` and returns the number of bytes written.
///
/// Letters are case-insensitive; padding and whitespace are ignored anywhere
/// in the input. Bits left over after the last full byte are dropped.
pub fn decode(encoded: &str, out: &mut [u8]) -> Result<usize, DecodeError> {
  let mut written = 0;
  let mut bits = 0u32;
  let mut buffer = 0u32;

  for (position, c) in encoded.chars().enumerate() {
    if is_skipped(c) {
      continue;
    }
    let value = value_of(c).ok_or(DecodeError::InvalidCharacter { character: c, position })?;

    buffer = (buffer << 5) | value as u32;
    bits += 5;
    if bits >= 8 {
      bits -= 8;
      let slot = out.get_mut(written).ok_or(DecodeError::BufferTooSmall { capacity: written })?;
      *slot = (buffer >> bits) as u8;
      written += 1;
      buffer &= (1 << bits) - 1;
    }
  }

  trace!("base32 decoded {} bytes", written);
  Ok(written)
}

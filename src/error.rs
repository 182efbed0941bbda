use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
  #[error("invalid base32 character {character:?} at position {position}")]
  InvalidCharacter { character: char, position: usize },

  #[error("decoded output exceeds {capacity} bytes")]
  BufferTooSmall { capacity: usize },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotpError {
  /// Decoding failed (source attached) or produced an empty key.
  #[error("invalid secret")]
  InvalidSecret(#[source] Option<DecodeError>),

  #[error("time step must be greater than zero")]
  InvalidStep,

  #[error("digits must be between 1 and 9, got {0}")]
  InvalidDigits(u8),

  #[error("otp needs {needed} bytes, buffer holds {capacity}")]
  BufferTooSmall { needed: usize, capacity: usize },
}

impl From<DecodeError> for TotpError {
  fn from(value: DecodeError) -> Self {
    Self::InvalidSecret(Some(value))
  }
}

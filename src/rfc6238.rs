use std::time::{SystemTime, UNIX_EPOCH};

use crate::base32;
use crate::error::TotpError;
use crate::hmac::hmac_sha1;
use crate::sha1::Digest;

/// Largest decoded secret accepted, in bytes.
pub const MAX_SECRET_LEN: usize = 64;
pub const MAX_DIGITS: u8 = 9;
/// Room for `MAX_DIGITS` plus a trailing NUL.
pub const OTP_CAPACITY: usize = MAX_DIGITS as usize + 1;

/// A formatted one-time password, kept on the stack.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Otp {
  buf: [u8; OTP_CAPACITY],
  len: usize,
}

impl Otp {
  pub fn as_str(&self) -> &str {
    std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
  }
}

impl std::ops::Deref for Otp {
  type Target = str;

  fn deref(&self) -> &str {
    self.as_str()
  }
}

impl std::fmt::Display for Otp {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.as_str().fmt(f)
  }
}

impl std::fmt::Debug for Otp {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Otp({:?})", self.as_str())
  }
}

impl PartialEq<&str> for Otp {
  fn eq(&self, other: &&str) -> bool {
    self.as_str() == *other
  }
}

pub fn unix_time() -> u64 {
  match SystemTime::now().duration_since(UNIX_EPOCH) {
    Ok(n) => n.as_secs(),
    Err(_) => 0,
  }
}

pub fn counter(current_time: u64, step_seconds: u32) -> Result<u64, TotpError> {
  if step_seconds == 0 {
    return Err(TotpError::InvalidStep);
  }
  Ok(current_time / step_seconds as u64)
}

/// Seconds left in the current step, always below `step_seconds`.
pub fn time_remaining(current_time: u64, step_seconds: u32) -> Result<u32, TotpError> {
  if step_seconds == 0 {
    return Err(TotpError::InvalidStep);
  }
  let step = step_seconds as u64;
  Ok(((step - current_time % step) % step) as u32)
}

/// RFC 4226 dynamic truncation to a 31-bit value.
pub fn truncate(mac: &Digest) -> u32 {
  let offset = (mac[mac.len() - 1] & 0x0f) as usize;
  ((mac[offset] as u32 & 0x7f) << 24) |
    ((mac[offset + 1] as u32) << 16) |
    ((mac[offset + 2] as u32) << 8) |
    (mac[offset + 3] as u32)
}

fn divisor(digits: u8) -> Result<u32, TotpError> {
  if digits == 0 || digits > MAX_DIGITS {
    return Err(TotpError::InvalidDigits(digits));
  }
  Ok(10u32.pow(digits as u32))
}

/// Writes `value` as exactly `digits` zero-padded decimal characters followed
/// by a NUL, returning the number of characters.
fn write_code(mut value: u32, digits: u8, out: &mut [u8]) -> Result<usize, TotpError> {
  let len = digits as usize;
  if out.len() < len + 1 {
    return Err(TotpError::BufferTooSmall { needed: len + 1, capacity: out.len() });
  }
  for slot in out[..len].iter_mut().rev() {
    *slot = b'0' + (value % 10) as u8;
    value /= 10;
  }
  out[len] = 0;
  Ok(len)
}

/// RFC 4226 HOTP over raw key bytes. The code is written to `out`.
pub fn hotp(key: &[u8], counter: u64, digits: u8, out: &mut [u8]) -> Result<usize, TotpError> {
  let divisor = divisor(digits)?;
  let mac = hmac_sha1(key, &counter.to_be_bytes());
  write_code(truncate(&mac) % divisor, digits, out)
}

fn decode_secret(secret_base32: &str, key: &mut [u8; MAX_SECRET_LEN]) -> Result<usize, TotpError> {
  let len = base32::decode(secret_base32, key).map_err(|e| {
    debug!("rejecting secret: {}", e);
    TotpError::from(e)
  })?;
  if len == 0 {
    debug!("rejecting secret: decoded to zero bytes");
    return Err(TotpError::InvalidSecret(None));
  }
  Ok(len)
}

/// Generates the TOTP for `current_time` into a caller-supplied buffer.
///
/// Returns the code length and the seconds remaining in the current step.
/// `out` must hold `digits` characters plus a NUL terminator.
pub fn generate_into(
  current_time: u64,
  secret_base32: &str,
  step_seconds: u32,
  digits: u8,
  out: &mut [u8],
) -> Result<(usize, u32), TotpError> {
  let mut key = [0u8; MAX_SECRET_LEN];
  let key_len = decode_secret(secret_base32, &mut key)?;
  let counter = counter(current_time, step_seconds)?;
  let len = hotp(&key[..key_len], counter, digits, out)?;
  let remaining = time_remaining(current_time, step_seconds)?;
  trace!("counter {} valid for {}s", counter, remaining);
  Ok((len, remaining))
}

pub fn generate(current_time: u64, secret_base32: &str, step_seconds: u32, digits: u8) -> Result<(Otp, u32), TotpError> {
  let mut otp = Otp { buf: [0; OTP_CAPACITY], len: 0 };
  let (len, remaining) = generate_into(current_time, secret_base32, step_seconds, digits, &mut otp.buf)?;
  otp.len = len;
  Ok((otp, remaining))
}

/// Checks `candidate` against the previous, current and next step.
pub fn verify(
  current_time: u64,
  secret_base32: &str,
  step_seconds: u32,
  digits: u8,
  candidate: &str,
) -> Result<bool, TotpError> {
  let mut key = [0u8; MAX_SECRET_LEN];
  let key_len = decode_secret(secret_base32, &mut key)?;
  let counter = counter(current_time, step_seconds)?;

  let mut buf = [0u8; OTP_CAPACITY];
  for c in [counter.checked_sub(1), Some(counter), counter.checked_add(1)].into_iter().flatten() {
    let len = hotp(&key[..key_len], c, digits, &mut buf)?;
    if &buf[..len] == candidate.as_bytes() {
      debug!("accepted code for counter {} (current {})", c, counter);
      return Ok(true);
    }
  }
  Ok(false)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::error::DecodeError;
  use proptest::prelude::*;

  const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

  fn hotp_string(key: &[u8], counter: u64, digits: u8) -> String {
    let mut out = [0u8; OTP_CAPACITY];
    let len = hotp(key, counter, digits, &mut out).unwrap();
    String::from_utf8(out[..len].to_vec()).unwrap()
  }

  #[test]
  fn test_rfc4226_vectors() {
    let expected = [
      "755224", "287082", "359152", "969429", "338314",
      "254676", "287922", "162583", "399871", "520489",
    ];
    for (counter, code) in expected.iter().enumerate() {
      assert_eq!(hotp_string(b"12345678901234567890", counter as u64, 6), *code);
    }
  }

  #[test]
  fn test_generate_otp() {
    assert_eq!(hotp_string(b"your_secret_key", 123456, 6), "811986");
  }

  #[test]
  fn test_rfc6238_vectors() {
    let expected = [
      (59, "94287082"),
      (1111111109, "07081804"),
      (1111111111, "14050471"),
      (1234567890, "89005924"),
      (2000000000, "69279037"),
      (20000000000, "65353130"),
    ];
    for (time, code) in expected {
      let (otp, _) = generate(time, RFC_SECRET, 30, 8).unwrap();
      assert_eq!(otp, code, "time {}", time);
      let (short, _) = generate(time, RFC_SECRET, 30, 6).unwrap();
      assert_eq!(short, &code[2..], "time {}", time);
    }
  }

  #[test]
  fn test_lowercase_padded_secret() {
    let (otp, _) = generate(59, "gezdgnbv gy3tqojq gezdgnbv gy3tqojq====", 30, 8).unwrap();
    assert_eq!(otp.as_str(), "94287082");
  }

  #[test]
  fn test_time_remaining() {
    assert_eq!(generate(59, RFC_SECRET, 30, 6).unwrap().1, 1);
    assert_eq!(time_remaining(0, 30), Ok(0));
    assert_eq!(time_remaining(1, 30), Ok(29));
    assert_eq!(time_remaining(60, 30), Ok(0));
    assert_eq!(time_remaining(1111111109, 30), Ok(1));
    assert_eq!(time_remaining(5, 1), Ok(0));
  }

  #[test]
  fn test_invalid_step() {
    assert_eq!(generate(59, RFC_SECRET, 0, 6), Err(TotpError::InvalidStep));
    assert_eq!(time_remaining(59, 0), Err(TotpError::InvalidStep));
    assert_eq!(counter(59, 0), Err(TotpError::InvalidStep));
  }

  #[test]
  fn test_invalid_secret() {
    assert_eq!(generate(59, "", 30, 6), Err(TotpError::InvalidSecret(None)));
    assert_eq!(generate(59, "====", 30, 6), Err(TotpError::InvalidSecret(None)));
    assert_eq!(generate(59, "M", 30, 6), Err(TotpError::InvalidSecret(None)));
    assert_eq!(
      generate(59, "GEZD0NBV", 30, 6),
      Err(TotpError::InvalidSecret(Some(DecodeError::InvalidCharacter { character: '0', position: 4 })))
    );
  }

  #[test]
  fn test_oversized_secret() {
    assert!(generate(59, &"A".repeat(103), 30, 6).is_ok());
    assert_eq!(
      generate(59, &"A".repeat(104), 30, 6),
      Err(TotpError::InvalidSecret(Some(DecodeError::BufferTooSmall { capacity: MAX_SECRET_LEN })))
    );
  }

  #[test]
  fn test_invalid_digits() {
    assert_eq!(generate(59, RFC_SECRET, 30, 0), Err(TotpError::InvalidDigits(0)));
    assert_eq!(generate(59, RFC_SECRET, 30, 10), Err(TotpError::InvalidDigits(10)));
    assert!(generate(59, RFC_SECRET, 30, 9).is_ok());
  }

  #[test]
  fn test_generate_into() {
    let mut out = [0xffu8; 7];
    assert_eq!(generate_into(59, RFC_SECRET, 30, 6, &mut out), Ok((6, 1)));
    assert_eq!(&out, b"287082\0");

    let mut small = [0u8; 6];
    assert_eq!(
      generate_into(59, RFC_SECRET, 30, 6, &mut small),
      Err(TotpError::BufferTooSmall { needed: 7, capacity: 6 })
    );
  }

  #[test]
  fn test_verify() {
    assert_eq!(verify(59, RFC_SECRET, 30, 6, "287082"), Ok(true));
    // one step late and one step early are tolerated
    assert_eq!(verify(89, RFC_SECRET, 30, 6, "287082"), Ok(true));
    assert_eq!(verify(29, RFC_SECRET, 30, 6, "287082"), Ok(true));
    assert_eq!(verify(119, RFC_SECRET, 30, 6, "287082"), Ok(false));
    assert_eq!(verify(59, RFC_SECRET, 30, 6, "28708"), Ok(false));
    assert_eq!(verify(59, RFC_SECRET, 0, 6, "287082"), Err(TotpError::InvalidStep));
  }

  #[test]
  fn test_truncate() {
    // RFC 4226 section 5.4 example
    let mac = [
      0x1f, 0x86, 0x98, 0x69, 0x0e, 0x02, 0xca, 0x16, 0x61, 0x85,
      0x50, 0xef, 0x7f, 0x19, 0xda, 0x8e, 0x94, 0x5b, 0x55, 0x5a,
    ];
    assert_eq!(truncate(&mac), 0x50ef7f19);
    assert_eq!(truncate(&mac) % 1_000_000, 872921);
  }

  proptest! {
    #[test]
    fn remaining_below_step(time in any::<u64>(), step in 1u32..) {
      let remaining = time_remaining(time, step).unwrap();
      prop_assert!(remaining < step);
      prop_assert_eq!((time % step as u64 + remaining as u64) % step as u64, 0);
    }

    #[test]
    fn generate_is_deterministic(time in any::<u64>(), step in 1u32..3600, digits in 1u8..=9) {
      let first = generate(time, RFC_SECRET, step, digits).unwrap();
      let second = generate(time, RFC_SECRET, step, digits).unwrap();
      prop_assert_eq!(first, second);
      prop_assert_eq!(first.0.len(), digits as usize);
      prop_assert!(first.0.bytes().all(|b| b.is_ascii_digit()));
    }
  }
}

//! Time-based one-time passwords (RFC 6238) with no external crypto.
//!
//! ```
//! let (otp, remaining) = pico_totp::generate(59, "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ", 30, 8).unwrap();
//! assert_eq!(otp, "94287082");
//! assert_eq!(remaining, 1);
//! ```

#[macro_use]
extern crate log;

pub mod base32;
pub mod error;
pub mod hmac;
pub mod rfc6238;
pub mod sha1;

pub use error::{DecodeError, TotpError};
pub use rfc6238::{generate, generate_into, hotp, verify, Otp};

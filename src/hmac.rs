//! HMAC-SHA1 (RFC 2104).

use crate::sha1::{sha1, Digest, Sha1, BLOCK_LEN};

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

pub fn hmac_sha1(key: &[u8], message: &[u8]) -> Digest {
  let mut key_block = [0u8; BLOCK_LEN];
  if key.len() > BLOCK_LEN {
    let hashed = sha1(key);
    key_block[..hashed.len()].copy_from_slice(&hashed);
  } else {
    key_block[..key.len()].copy_from_slice(key);
  }

  let mut ipad = [0u8; BLOCK_LEN];
  let mut opad = [0u8; BLOCK_LEN];
  for ((i, o), k) in ipad.iter_mut().zip(opad.iter_mut()).zip(key_block) {
    *i = k ^ IPAD;
    *o = k ^ OPAD;
  }

  let mut inner = Sha1::new();
  inner.update(&ipad);
  inner.update(message);
  let inner_hash = inner.finalize();

  let mut outer = Sha1::new();
  outer.update(&opad);
  outer.update(&inner_hash);
  outer.finalize()
}

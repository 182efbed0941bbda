//! SHA-1 (FIPS 180-4).

pub const DIGEST_LEN: usize = 20;
pub const BLOCK_LEN: usize = 64;

pub type Digest = [u8; DIGEST_LEN];

const INITIAL_STATE: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

/// Streaming SHA-1 state.
///
/// Input is buffered one block at a time, so memory use does not depend on
/// the message length.
#[derive(Clone)]
pub struct Sha1 {
  state: [u32; 5],
  block: [u8; BLOCK_LEN],
  block_len: usize,
  /// total message length in bytes
  len: u64,
}

impl Default for Sha1 {
  fn default() -> Self {
    Self::new()
  }
}

impl Sha1 {
  pub fn new() -> Self {
    Self {
      state: INITIAL_STATE,
      block: [0; BLOCK_LEN],
      block_len: 0,
      len: 0,
    }
  }

  pub fn update(&mut self, mut data: &[u8]) {
    self.len = self.len.wrapping_add(data.len() as u64);

    if self.block_len > 0 {
      let take = (BLOCK_LEN - self.block_len).min(data.len());
      self.block[self.block_len..self.block_len + take].copy_from_slice(&data[..take]);
      self.block_len += take;
      data = &data[take..];
      if self.block_len < BLOCK_LEN {
        return;
      }
      compress(&mut self.state, &self.block);
      self.block_len = 0;
    }

    let mut chunks = data.chunks_exact(BLOCK_LEN);
    for chunk in &mut chunks {
      let mut block = [0u8; BLOCK_LEN];
      block.copy_from_slice(chunk);
      compress(&mut self.state, &block);
    }
    let rest = chunks.remainder();
    self.block[..rest.len()].copy_from_slice(rest);
    self.block_len = rest.len();
  }

  pub fn finalize(mut self) -> Digest {
    let bit_len = self.len.wrapping_mul(8);

    self.block[self.block_len] = 0x80;
    self.block[self.block_len + 1..].fill(0);
    if self.block_len >= BLOCK_LEN - 8 {
      // no room left for the length field
      compress(&mut self.state, &self.block);
      self.block.fill(0);
    }
    self.block[BLOCK_LEN - 8..].copy_from_slice(&bit_len.to_be_bytes());
    compress(&mut self.state, &self.block);

    let mut digest = [0u8; DIGEST_LEN];
    for (out, word) in digest.chunks_exact_mut(4).zip(self.state) {
      out.copy_from_slice(&word.to_be_bytes());
    }
    digest
  }
}

pub fn sha1(message: &[u8]) -> Digest {
  let mut hasher = Sha1::new();
  hasher.update(message);
  hasher.finalize()
}

fn compress(state: &mut [u32; 5], block: &[u8; BLOCK_LEN]) {
  let mut w = [0u32; 80];
  for (j, word) in block.chunks_exact(4).enumerate() {
    w[j] = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
  }
  for j in 16..80 {
    w[j] = (w[j - 3] ^ w[j - 8] ^ w[j - 14] ^ w[j - 16]).rotate_left(1);
  }

  let [mut a, mut b, mut c, mut d, mut e] = *state;
  for (j, &word) in w.iter().enumerate() {
    let (f, k) = match j {
      0..=19 => ((b & c) | (!b & d), 0x5A827999),
      20..=39 => (b ^ c ^ d, 0x6ED9EBA1),
      40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1BBCDC),
      _ => (b ^ c ^ d, 0xCA62C1D6),
    };
    let temp = a.rotate_left(5)
      .wrapping_add(f)
      .wrapping_add(e)
      .wrapping_add(k)
      .wrapping_add(word);
    e = d;
    d = c;
    c = b.rotate_left(30);
    b = a;
    a = temp;
  }

  for (h, v) in state.iter_mut().zip([a, b, c, d, e]) {
    *h = h.wrapping_add(v);
  }
}

//! 128-bit key hashing.
//!
//! The default backend is a portable add-rotate-xor network working on
//! 32-byte blocks with a length-tagged finalization. With the
//! `murmur3-hash` feature the filter hashes keys with MurmurHash3 x64/128
//! instead. Both backends satisfy the same contract: deterministic, total
//! over every key length, and strongly avalanching, because page selection
//! and in-page probes are cut from disjoint slices of the output.

const MAGIC: u64 = 0xdead_beef_dead_beef;

struct State {
    a: u64,
    b: u64,
    c: u64,
    d: u64,
}

impl State {
    #[inline(always)]
    fn mix(&mut self) {
        self.c = self.c.rotate_left(50).wrapping_add(self.d);
        self.a ^= self.c;
        self.d = self.d.rotate_left(52).wrapping_add(self.a);
        self.b ^= self.d;
        self.a = self.a.rotate_left(30).wrapping_add(self.b);
        self.c ^= self.a;
        self.b = self.b.rotate_left(41).wrapping_add(self.c);
        self.d ^= self.b;
        self.c = self.c.rotate_left(54).wrapping_add(self.d);
        self.a ^= self.c;
        self.d = self.d.rotate_left(48).wrapping_add(self.a);
        self.b ^= self.d;
        self.a = self.a.rotate_left(38).wrapping_add(self.b);
        self.c ^= self.a;
        self.b = self.b.rotate_left(37).wrapping_add(self.c);
        self.d ^= self.b;
        self.c = self.c.rotate_left(62).wrapping_add(self.d);
        self.a ^= self.c;
        self.d = self.d.rotate_left(34).wrapping_add(self.a);
        self.b ^= self.d;
        self.a = self.a.rotate_left(5).wrapping_add(self.b);
        self.c ^= self.a;
        self.b = self.b.rotate_left(36).wrapping_add(self.c);
        self.d ^= self.b;
    }

    #[inline(always)]
    fn end(&mut self) {
        self.d ^= self.c;
        self.c = self.c.rotate_left(15);
        self.d = self.d.wrapping_add(self.c);
        self.a ^= self.d;
        self.d = self.d.rotate_left(52);
        self.a = self.a.wrapping_add(self.d);
        self.b ^= self.a;
        self.a = self.a.rotate_left(26);
        self.b = self.b.wrapping_add(self.a);
        self.c ^= self.b;
        self.b = self.b.rotate_left(51);
        self.c = self.c.wrapping_add(self.b);
        self.d ^= self.c;
        self.c = self.c.rotate_left(28);
        self.d = self.d.wrapping_add(self.c);
        self.a ^= self.d;
        self.d = self.d.rotate_left(9);
        self.a = self.a.wrapping_add(self.d);
        self.b ^= self.a;
        self.a = self.a.rotate_left(47);
        self.b = self.b.wrapping_add(self.a);
        self.c ^= self.b;
        self.b = self.b.rotate_left(54);
        self.c = self.c.wrapping_add(self.b);
        self.d ^= self.c;
        self.c = self.c.rotate_left(32);
        self.d = self.d.wrapping_add(self.c);
        self.a ^= self.d;
        self.d = self.d.rotate_left(25);
        self.a = self.a.wrapping_add(self.d);
        self.b ^= self.a;
        self.a = self.a.rotate_left(63);
        self.b = self.b.wrapping_add(self.a);
    }

    #[inline(always)]
    fn absorb_half(&mut self, block: &[u8]) {
        self.c = self.c.wrapping_add(read_u64(&block[0..8]));
        self.d = self.d.wrapping_add(read_u64(&block[8..16]));
        self.mix();
    }
}

#[inline(always)]
fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0_u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// Little-endian value of up to eight bytes.
#[inline(always)]
fn read_partial(bytes: &[u8]) -> u64 {
    debug_assert!(bytes.len() <= 8);
    bytes
        .iter()
        .rev()
        .fold(0_u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

/// Hashes `key` with the ARX backend and seed 0.
pub fn hash128(key: &[u8]) -> [u64; 2] {
    hash128_with_seed(key, 0)
}

/// Hashes `key` with the ARX backend.
///
/// Returns the low and high 64-bit halves of the code.
pub fn hash128_with_seed(key: &[u8], seed: u64) -> [u64; 2] {
    let mut s = State {
        a: seed,
        b: seed,
        c: MAGIC,
        d: MAGIC,
    };

    let mut blocks = key.chunks_exact(32);
    for block in &mut blocks {
        s.absorb_half(&block[0..16]);
        s.a = s.a.wrapping_add(read_u64(&block[16..24]));
        s.b = s.b.wrapping_add(read_u64(&block[24..32]));
    }

    let mut rest = blocks.remainder();
    if rest.len() >= 16 {
        s.absorb_half(&rest[0..16]);
        rest = &rest[16..];
    }

    s.d = s.d.wrapping_add((key.len() as u64) << 56);
    match rest.len() {
        0 => {
            s.c = s.c.wrapping_add(MAGIC);
            s.d = s.d.wrapping_add(MAGIC);
        }
        1..=7 => {
            s.c = s.c.wrapping_add(read_partial(rest));
        }
        _ => {
            s.c = s.c.wrapping_add(read_u64(&rest[0..8]));
            s.d = s.d.wrapping_add(read_partial(&rest[8..]));
        }
    }
    s.end();
    [s.a, s.b]
}

/// Hashes `key` with MurmurHash3 x64/128.
#[cfg(feature = "murmur3-hash")]
pub fn murmur3_128(key: &[u8], seed: u32) -> [u64; 2] {
    let mut cursor = std::io::Cursor::new(key);
    // an in-memory cursor never fails to read
    let code = murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or_default();
    [code as u64, (code >> 64) as u64]
}

/// Hashes a key with the backend the filter is built with.
#[inline(always)]
pub fn key_hash(key: &[u8]) -> HashCode {
    #[cfg(not(feature = "murmur3-hash"))]
    let [lo, hi] = hash128(key);
    #[cfg(feature = "murmur3-hash")]
    let [lo, hi] = murmur3_128(key, 0);
    HashCode::from_halves(lo, hi)
}

/// A 128-bit hash code as sixteen little-endian bytes.
///
/// Word `i` covers bytes `4i..4i+4` and lane `i` covers bytes `2i..2i+2`,
/// so lane `2i` is the low half of word `i` and lane `2i + 1` its high half.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HashCode([u8; 16]);

impl HashCode {
    pub fn from_halves(lo: u64, hi: u64) -> Self {
        let mut bytes = [0_u8; 16];
        bytes[..8].copy_from_slice(&lo.to_le_bytes());
        bytes[8..].copy_from_slice(&hi.to_le_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// 32-bit word `i`, `i < 4`.
    #[inline(always)]
    pub fn word(&self, i: usize) -> u32 {
        let at = i * 4;
        u32::from_le_bytes([
            self.0[at],
            self.0[at + 1],
            self.0[at + 2],
            self.0[at + 3],
        ])
    }

    /// 16-bit lane `i`, `i < 8`.
    #[inline(always)]
    pub fn lane(&self, i: usize) -> u16 {
        let at = i * 2;
        u16::from_le_bytes([self.0[at], self.0[at + 1]])
    }
}

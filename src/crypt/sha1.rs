/// Module that implements the SHA-1 front used by the session handshake.
///
/// The digests and key derivations of the wire protocol hash byte spans and
/// fixed width big integer operands; this wraps the ecosystem SHA-1 and
/// HMAC-SHA-1 behind that surface.
use crate::crypt::bignum::BigNum;
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};

pub const SHA1_DIGEST_LENGTH: usize = 20;

type HmacSha1 = Hmac<Sha1>;

/// Incremental SHA-1 hasher.
pub struct Sha1Hasher {
    inner: Sha1,
}

impl Sha1Hasher {
    pub fn new() -> Sha1Hasher {
        Sha1Hasher { inner: Sha1::new() }
    }

    /// Feed a byte span into the hash.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Feed the fixed width big-endian serialization of `n` into the hash.
    pub fn update_bignum(&mut self, width: usize, n: &BigNum) {
        self.inner.update(n.to_bytes(width));
    }

    pub fn finalize(self) -> [u8; SHA1_DIGEST_LENGTH] {
        self.inner.finalize().into()
    }
}

impl Default for Sha1Hasher {
    fn default() -> Self {
        Sha1Hasher::new()
    }
}

/// Compute HMAC-SHA-1.
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> [u8; SHA1_DIGEST_LENGTH] {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Compare two digests without leaking the position of a mismatch through
/// timing.
pub fn digest_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

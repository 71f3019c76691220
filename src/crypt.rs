/// Module that implements the cryptography of the world connection.
pub mod arc4;
pub mod bignum;
pub mod sha1;

use crate::crypt::arc4::Arc4;
use crate::crypt::bignum::BigNum;
use crate::crypt::sha1::{hmac_sha1, Sha1Hasher, SHA1_DIGEST_LENGTH};

/// Width in bytes of the session key when it is serialized into digests and
/// key derivation. Must match the width the upstream auth stage used when
/// storing `accounts."sessionKey"`, otherwise no client digest will ever
/// verify.
pub const SESSION_KEY_WIDTH: usize = 40;

/// Keystream bytes discarded per direction after keying.
const KEYSTREAM_DROP: usize = 1024;

/// Per-connection header cipher. Headers pass unmodified until the handshake
/// has been verified; afterwards every inbound header byte runs through
/// `dec_in` and every outbound header byte through `enc_out`. Payloads are
/// never touched.
pub enum SessionCrypt {
    PassThrough,
    Active { dec_in: Arc4, enc_out: Arc4 },
}

impl SessionCrypt {
    pub fn new() -> SessionCrypt {
        SessionCrypt::PassThrough
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionCrypt::Active { .. })
    }

    /// Key both directions from the session key and the two challenge seeds.
    /// Happens exactly once per connection, at handshake success.
    pub fn activate(&mut self, session_key: &BigNum, seed1: &BigNum, seed2: &BigNum) {
        let mut enc_out = Arc4::new(&derive_direction_key(seed1, session_key));
        let mut dec_in = Arc4::new(&derive_direction_key(seed2, session_key));
        enc_out.skip(KEYSTREAM_DROP);
        dec_in.skip(KEYSTREAM_DROP);
        *self = SessionCrypt::Active { dec_in, enc_out };
    }

    /// Decrypt an inbound header in place.
    pub fn decrypt_inbound(&mut self, data: &mut [u8]) {
        if let SessionCrypt::Active { dec_in, .. } = self {
            dec_in.apply_keystream(data);
        }
    }

    /// Encrypt an outbound header in place.
    pub fn encrypt_outbound(&mut self, data: &mut [u8]) {
        if let SessionCrypt::Active { enc_out, .. } = self {
            enc_out.apply_keystream(data);
        }
    }
}

impl Default for SessionCrypt {
    fn default() -> Self {
        SessionCrypt::new()
    }
}

/// Directional 20 byte cipher key: the 40 byte session key is run through
/// HMAC-SHA-1 under the 16 byte seed, and the result hashed behind a 64 byte
/// zero block.
fn derive_direction_key(seed: &BigNum, session_key: &BigNum) -> [u8; SHA1_DIGEST_LENGTH] {
    let mac = hmac_sha1(&seed.to_bytes(16), &session_key.to_bytes(SESSION_KEY_WIDTH));
    let mut sha = Sha1Hasher::new();
    sha.update(&[0u8; 64]);
    sha.update(&mac);
    sha.finalize()
}

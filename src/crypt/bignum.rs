/// Module that implements the fixed width unsigned integers used by the
/// session handshake.
use crate::Result;
use anyhow::ensure;
use rand::rngs::OsRng;
use rand_core::RngCore;

/// Upper size limit in bytes.
const MAX_BYTES: usize = 256;

/// An unsigned integer of up to 256 bytes, kept big-endian. Only the
/// operations the handshake crypto needs are exposed.
#[derive(Clone, Debug)]
pub struct BigNum {
    bytes: Vec<u8>,
}

impl BigNum {
    /// Generate a random number filling exactly `bits` bits.
    pub fn rand(bits: usize) -> BigNum {
        assert!(bits > 0 && bits <= MAX_BYTES * 8);
        let mut bytes = vec![0; (bits + 7) / 8];
        OsRng.fill_bytes(&mut bytes);
        if bits % 8 != 0 {
            bytes[0] &= 0xFF >> (8 - bits % 8);
        }
        BigNum::from_bytes(&bytes)
    }

    /// Parse a big-endian hex string, as stored in the accounts table.
    pub fn from_hex(input: &str) -> Result<BigNum> {
        let bytes = if input.len() % 2 == 1 {
            hex::decode(format!("0{}", input))?
        } else {
            hex::decode(input)?
        };
        ensure!(bytes.len() <= MAX_BYTES, "value is wider than 256 bytes");
        Ok(BigNum::from_bytes(&bytes))
    }

    /// Take over a big-endian byte sequence. Leading zero bytes are not part
    /// of the value.
    pub fn from_bytes(input: &[u8]) -> BigNum {
        let first = input.iter().position(|&b| b != 0).unwrap_or(input.len());
        BigNum {
            bytes: input[first..].to_vec(),
        }
    }

    /// Serialize big-endian into exactly `width` bytes, zero padded on the
    /// high side. A wider value is truncated to its low `width` bytes.
    pub fn to_bytes(&self, width: usize) -> Vec<u8> {
        let mut out = vec![0; width];
        if self.bytes.len() >= width {
            out.copy_from_slice(&self.bytes[self.bytes.len() - width..]);
        } else {
            out[width - self.bytes.len()..].copy_from_slice(&self.bytes);
        }
        out
    }

    /// Number of bytes of the value without high side padding.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PartialEq for BigNum {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for BigNum {}

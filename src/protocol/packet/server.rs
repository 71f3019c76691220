/// Module for server network packets.
use crate::crypt::bignum::BigNum;
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::packet::{WELL_KNOWN_ADDONS, WELL_KNOWN_ADDON_CRC};

/// Result codes carried in the first byte of SMSG_AUTH_RESPONSE.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(u8)]
pub enum AuthResult {
    Ok = 12,
    Failed = 13,
    Reject = 14,
    SystemError = 17,
    UnknownAccount = 21,
}

/// Body of SMSG_AUTH_CHALLENGE.
pub struct SAuthChallenge<'a> {
    pub conn_seed: u32,
    pub seed1: &'a BigNum,
    pub seed2: &'a BigNum,
}

impl<'a> SAuthChallenge<'a> {
    pub fn write(&self, buffer: &mut ByteBuffer) {
        buffer.write_u32(1);
        buffer.write_u32(self.conn_seed);
        buffer.write(&self.seed1.to_bytes(16));
        buffer.write(&self.seed2.to_bytes(16));
    }
}

/// Body of SMSG_AUTH_RESPONSE.
pub struct SAuthResponse {
    pub result: AuthResult,
    pub expansion: u8,
}

impl SAuthResponse {
    pub fn write(&self, buffer: &mut ByteBuffer) {
        buffer.write_u8(self.result as u8);
        buffer.write_u32(0); // billing time remaining
        buffer.write_u8(0); // billing flags
        buffer.write_u32(0); // billing time rested
        buffer.write_u8(self.expansion);
    }
}

/// Body of SMSG_ADDON_INFO, built from the canonical addon table.
pub struct SAddonInfo {
    addons: Vec<(&'static str, u32)>,
}

impl SAddonInfo {
    pub fn from_known_table() -> SAddonInfo {
        SAddonInfo {
            addons: WELL_KNOWN_ADDONS
                .iter()
                .map(|name| (*name, WELL_KNOWN_ADDON_CRC))
                .collect(),
        }
    }

    pub fn write(&self, buffer: &mut ByteBuffer) {
        for (_name, crc) in &self.addons {
            buffer.write_u8(2); // state
            buffer.write_u8(1); // use key or crc
            buffer.write_u8(u8::from(*crc != WELL_KNOWN_ADDON_CRC)); // needs the public key blob
            buffer.write_u32(0);
            buffer.write_u8(0); // uses url
        }
        buffer.write_u32(0); // banned addon count
    }
}

/// Body of SMSG_ACCOUNT_DATA_TIMES: server time, one bitmask block and a zero
/// slot per set mask bit.
pub struct SAccountDataTimes {
    pub server_time: u32,
    pub mask: u32,
}

impl SAccountDataTimes {
    pub fn write(&self, buffer: &mut ByteBuffer) {
        buffer.write_u32(self.server_time);
        buffer.write_u8(1);
        buffer.write_u32(self.mask);
        for i in 0..8 {
            if self.mask & (1 << i) != 0 {
                buffer.write_u32(0);
            }
        }
    }
}

/// Body of SMSG_TUTORIAL_FLAGS: eight fully set flag words.
pub struct STutorialFlags;

impl STutorialFlags {
    pub fn write(&self, buffer: &mut ByteBuffer) {
        for _ in 0..8 {
            buffer.write_u32(0xFFFF_FFFF);
        }
    }
}

/// Body of SMSG_CLIENTCACHE_VERSION.
pub struct SClientCacheVersion {
    pub version: u32,
}

impl SClientCacheVersion {
    pub fn write(&self, buffer: &mut ByteBuffer) {
        buffer.write_u32(self.version);
    }
}

/// Body of SMSG_UPDATE_ACCOUNT_DATA_COMPLETE.
pub struct SUpdateAccountDataComplete {
    pub data_type: u32,
}

impl SUpdateAccountDataComplete {
    pub fn write(&self, buffer: &mut ByteBuffer) {
        buffer.write_u32(self.data_type);
        buffer.write_u32(0);
    }
}

/// Body of SMSG_PONG.
pub struct SPong {
    pub sequence: u32,
}

impl SPong {
    pub fn write(&self, buffer: &mut ByteBuffer) {
        buffer.write_u32(self.sequence);
    }
}

/// Module that implements the client and server packet headers.
use crate::protocol::opcode::NUM_MSG_TYPES;
use crate::{Result, WorldgateError};
use anyhow::bail;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Exact wire size of a client packet header after decryption.
pub const CLIENT_HEADER_SIZE: usize = 6;

/// Bounds on the declared client packet size (opcode plus payload).
pub const MIN_CLIENT_PACKET_SIZE: u16 = 4;
pub const MAX_CLIENT_PACKET_SIZE: u16 = 10240;

/// Decrypted client packet header: a big-endian size covering opcode and
/// payload, followed by the little-endian opcode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClientPacketHeader {
    pub size: u16,
    pub opcode: u32,
}

impl ClientPacketHeader {
    pub fn read(data: &[u8; CLIENT_HEADER_SIZE]) -> Result<ClientPacketHeader> {
        let size = BigEndian::read_u16(&data[0..2]);
        let opcode = LittleEndian::read_u32(&data[2..6]);

        if size < MIN_CLIENT_PACKET_SIZE || size > MAX_CLIENT_PACKET_SIZE {
            bail!(WorldgateError::Protocol(format!(
                "client packet size {} out of range",
                size
            )));
        }
        if opcode >= u32::from(NUM_MSG_TYPES) {
            bail!(WorldgateError::Protocol(format!(
                "client opcode {:#x} out of range",
                opcode
            )));
        }

        Ok(ClientPacketHeader { size, opcode })
    }

    /// Payload bytes following the opcode.
    pub fn payload_size(&self) -> usize {
        self.size as usize - 4
    }
}

/// Server packet header before encryption: a big-endian size covering opcode
/// and payload (three bytes with the top bit of the first byte set when it
/// exceeds 0x7FFF), followed by the little-endian opcode.
pub struct ServerPacketHeader {
    bytes: [u8; 5],
    length: usize,
}

impl ServerPacketHeader {
    pub fn new(payload_size: usize, opcode: u16) -> ServerPacketHeader {
        let size = payload_size + 2;
        let mut bytes = [0u8; 5];

        let length = if size > 0x7FFF {
            bytes[0] = 0x80 | ((size >> 16) as u8);
            bytes[1] = (size >> 8) as u8;
            bytes[2] = size as u8;
            LittleEndian::write_u16(&mut bytes[3..5], opcode);
            5
        } else {
            bytes[0] = (size >> 8) as u8;
            bytes[1] = size as u8;
            LittleEndian::write_u16(&mut bytes[2..4], opcode);
            4
        };

        ServerPacketHeader { bytes, length }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.length]
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.length]
    }
}

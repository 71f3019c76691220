/// Module for client network packets.
use crate::protocol::buffer::ByteBuffer;
use crate::Result;

/// Body of CMSG_AUTH_SESSION up to the addon manifest. The manifest stays in
/// the packet buffer and is parsed separately, since a broken manifest must
/// not reject the client.
#[derive(Clone, Debug, PartialEq)]
pub struct CAuthSession {
    pub build: u32,
    pub login_server_id: u32,
    pub account_name: String,
    pub login_server_type: u32,
    pub local_challenge: u32,
    pub region_id: u32,
    pub battlegroup_id: u32,
    pub realm_id: u32,
    pub dos_response: u64,
    pub digest: [u8; 20],
}

impl CAuthSession {
    pub fn read(buffer: &mut ByteBuffer) -> Result<CAuthSession> {
        let build = buffer.read_u32()?;
        let login_server_id = buffer.read_u32()?;
        let account_name = buffer.read_cstring()?;
        let login_server_type = buffer.read_u32()?;
        let local_challenge = buffer.read_u32()?;
        let region_id = buffer.read_u32()?;
        let battlegroup_id = buffer.read_u32()?;
        let realm_id = buffer.read_u32()?;
        let dos_response = buffer.read_u64()?;
        let mut digest = [0u8; 20];
        buffer.read(&mut digest)?;

        Ok(CAuthSession {
            build,
            login_server_id,
            account_name,
            login_server_type,
            local_challenge,
            region_id,
            battlegroup_id,
            realm_id,
            dos_response,
            digest,
        })
    }
}

/// Body of CMSG_REDIRECT_CLIENT_PROOF, sent to continue a session after a
/// connection redirect.
#[derive(Clone, Debug, PartialEq)]
pub struct CRedirectClientProof {
    pub username: String,
    pub dos_response: u64,
    pub digest: [u8; 20],
}

impl CRedirectClientProof {
    pub fn read(buffer: &mut ByteBuffer) -> Result<CRedirectClientProof> {
        let username = buffer.read_cstring()?;
        let dos_response = buffer.read_u64()?;
        let mut digest = [0u8; 20];
        buffer.read(&mut digest)?;

        Ok(CRedirectClientProof {
            username,
            dos_response,
            digest,
        })
    }
}

/// Fixed lead of CMSG_UPDATE_ACCOUNT_DATA; the compressed payload behind it
/// is not consumed at this layer.
#[derive(Clone, Debug, PartialEq)]
pub struct CUpdateAccountData {
    pub data_type: u32,
    pub timestamp: u32,
    pub decompressed_size: u32,
}

impl CUpdateAccountData {
    pub fn read(buffer: &mut ByteBuffer) -> Result<CUpdateAccountData> {
        Ok(CUpdateAccountData {
            data_type: buffer.read_u32()?,
            timestamp: buffer.read_u32()?,
            decompressed_size: buffer.read_u32()?,
        })
    }
}

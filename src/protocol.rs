/// Module that implements the world connection protocol.
pub mod buffer;
pub mod header;
pub mod opcode;
pub mod packet;

use crate::crypt::bignum::BigNum;
use crate::crypt::sha1::{digest_equal, Sha1Hasher};
use crate::crypt::{SessionCrypt, SESSION_KEY_WIDTH};
use crate::message::{
    pass_message, BusMessage, ConnectionHandle, ConnectionRegistry, Message, SessionCommand,
};
use crate::model::repository::{account, character};
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::header::{ClientPacketHeader, ServerPacketHeader, CLIENT_HEADER_SIZE};
use crate::protocol::opcode::{Opcode, PacketAction, DISPATCH_TABLE};
use crate::protocol::packet::client::{CAuthSession, CRedirectClientProof, CUpdateAccountData};
use crate::protocol::packet::server::{
    AuthResult, SAccountDataTimes, SAddonInfo, SAuthChallenge, SAuthResponse, SClientCacheVersion,
    SPong, STutorialFlags, SUpdateAccountDataComplete,
};
use crate::protocol::packet::{parse_addon_manifest, WELL_KNOWN_ADDON_CRC};
use crate::{DbPool, Result, WorldgateError};
use anyhow::{bail, Context};
use async_macros::select;
use async_std::channel::{Receiver, Sender};
use async_std::io::timeout;
use async_std::net::TcpStream;
use async_std::prelude::*;
use chrono::Utc;
use rand::rngs::OsRng;
use rand_core::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Bitmask of the per-character account data slots announced to the client.
const ACCOUNT_DATA_CACHE_MASK: u32 = 0x15;

const EXPANSION: u8 = 2;

/// Everything a connection needs from the rest of the process: the database
/// pool, the world queue producer and the connection registry.
pub struct WorldContext {
    pub pool: DbPool,
    pub bus: Sender<BusMessage>,
    pub registry: ConnectionRegistry,
}

/// Handshake phases of a world connection.
#[derive(Clone, Copy, Debug, PartialEq)]
enum HandshakePhase {
    Unverified,
    ChallengeSent,
    AwaitingAuth,
    AuthVerifying,
    Authenticated,
    Closed,
}

enum SessionLoopEvent {
    Rx(usize),
    Command(SessionCommand),
}

/// Per-socket protocol state machine.
pub struct WorldSession<'a> {
    pub handle: ConnectionHandle,
    stream: &'a mut TcpStream,
    crypt: SessionCrypt,
    read_buffer: ByteBuffer,
    header_buffer: ByteBuffer,
    packet_buffer: ByteBuffer,
    current_header: Option<ClientPacketHeader>,
    seed1: BigNum,
    seed2: BigNum,
    conn_seed: u32,
    account: u32,
    session_key: Option<BigNum>,
    phase: HandshakePhase,
    context: Arc<WorldContext>,
    command_channel: Receiver<SessionCommand>,
    write_timeout_dur: Duration,
    read_timeout_dur: Duration,
    peek_timeout_dur: Duration,
}

impl<'a> WorldSession<'a> {
    /// Initializes a `WorldSession` and registers it with the connection
    /// table. The caller must unregister the handle once the session ends.
    pub fn new(stream: &'a mut TcpStream, context: Arc<WorldContext>) -> WorldSession<'a> {
        let (handle, command_channel) = context.registry.register();

        WorldSession {
            handle,
            stream,
            crypt: SessionCrypt::new(),
            read_buffer: ByteBuffer::new(),
            header_buffer: ByteBuffer::with_capacity(CLIENT_HEADER_SIZE),
            packet_buffer: ByteBuffer::new(),
            current_header: None,
            seed1: BigNum::rand(16 * 8),
            seed2: BigNum::rand(16 * 8),
            conn_seed: OsRng.next_u32(),
            account: 0,
            session_key: None,
            phase: HandshakePhase::Unverified,
            context,
            command_channel,
            write_timeout_dur: Duration::from_secs(15),
            read_timeout_dur: Duration::from_secs(15),
            peek_timeout_dur: Duration::from_secs(120),
        }
    }

    /// Account bound to this connection; 0 until the handshake verified.
    pub fn account(&self) -> u32 {
        self.account
    }

    /// Session key recovered from the accounts table, once verified.
    pub fn session_key(&self) -> Option<&BigNum> {
        self.session_key.as_ref()
    }

    /// Send the connection greeting: the resume marker and the auth
    /// challenge. These are the only frames that ever leave with a plaintext
    /// header.
    pub async fn start(&mut self) -> Result<()> {
        self.send_packet(Opcode::SMSG_RESUME_COMMS as u16, &[]).await?;

        let mut challenge = ByteBuffer::with_capacity(40);
        SAuthChallenge {
            conn_seed: self.conn_seed,
            seed1: &self.seed1,
            seed2: &self.seed2,
        }
        .write(&mut challenge);
        self.send_packet(Opcode::SMSG_AUTH_CHALLENGE as u16, challenge.read_ptr())
            .await?;

        self.phase = HandshakePhase::ChallengeSent;
        Ok(())
    }

    /// Drives the connection until the peer goes away or a protocol error
    /// kills it.
    pub async fn handle_connection(&mut self) -> Result<()> {
        if self.phase == HandshakePhase::ChallengeSent {
            self.phase = HandshakePhase::AwaitingAuth;
        }

        let mut peek_buf = vec![0u8; 1];
        let mut chunk = vec![0u8; 4096];

        loop {
            let rx = async {
                let read = timeout(self.peek_timeout_dur, self.stream.peek(&mut peek_buf))
                    .await
                    .context("Could not peek into TCP stream")?;
                Ok::<_, anyhow::Error>(SessionLoopEvent::Rx(read))
            };

            let command = async {
                let command = self
                    .command_channel
                    .recv()
                    .await
                    .map_err(|_| WorldgateError::ConnectionClosed)?;
                Ok::<_, anyhow::Error>(SessionLoopEvent::Command(command))
            };

            match select!(rx, command).await? {
                SessionLoopEvent::Rx(0) => {
                    // Peer closed the connection
                    self.phase = HandshakePhase::Closed;
                    return Ok(());
                }
                SessionLoopEvent::Rx(_) => {
                    let read =
                        timeout(self.read_timeout_dur, self.stream.read(&mut chunk)).await?;
                    if read == 0 {
                        self.phase = HandshakePhase::Closed;
                        return Ok(());
                    }
                    self.read_buffer.write(&chunk[..read]);
                    if let Err(e) = self.process_inbound().await {
                        self.phase = HandshakePhase::Closed;
                        return Err(e);
                    }
                }
                SessionLoopEvent::Command(SessionCommand::SendPacket { opcode, payload }) => {
                    self.send_packet(opcode, &payload).await?;
                }
                SessionLoopEvent::Command(SessionCommand::Close) => {
                    self.phase = HandshakePhase::Closed;
                    return Ok(());
                }
            }
        }
    }

    /// Cut raw inbound bytes into frames: fill the 6 byte header stage,
    /// decrypt and validate it, fill the packet stage, dispatch.
    async fn process_inbound(&mut self) -> Result<()> {
        while self.read_buffer.remaining() > 0 {
            if self.header_buffer.space_left() > 0 {
                let wanted = self
                    .read_buffer
                    .remaining()
                    .min(self.header_buffer.space_left());
                self.header_buffer
                    .write(self.read_buffer.read_slice(wanted)?);

                if self.header_buffer.space_left() > 0 {
                    // Wait until we have the entire header
                    break;
                }

                self.handle_header_read()?;
            }

            if self.packet_buffer.space_left() > 0 {
                let wanted = self
                    .read_buffer
                    .remaining()
                    .min(self.packet_buffer.space_left());
                self.packet_buffer
                    .write(self.read_buffer.read_slice(wanted)?);

                if self.packet_buffer.space_left() > 0 {
                    // Wait until we have all of the packet data
                    break;
                }
            }

            self.handle_packet_read().await?;
            self.header_buffer.clear();
        }

        if self.read_buffer.remaining() == 0 {
            self.read_buffer.clear();
        }
        Ok(())
    }

    fn handle_header_read(&mut self) -> Result<()> {
        let mut raw = [0u8; CLIENT_HEADER_SIZE];
        raw.copy_from_slice(self.header_buffer.read_ptr());
        self.crypt.decrypt_inbound(&mut raw);

        let header = ClientPacketHeader::read(&raw)?;
        trace!(
            "Received header for opcode {:#x} with size {}",
            header.opcode,
            header.size
        );

        self.packet_buffer.resize(header.payload_size());
        self.packet_buffer.clear();
        self.current_header = Some(header);
        Ok(())
    }

    async fn handle_packet_read(&mut self) -> Result<()> {
        let header = match self.current_header.take() {
            Some(header) => header,
            None => bail!(WorldgateError::Protocol("no staged header".to_string())),
        };

        let action = DISPATCH_TABLE[header.opcode as usize];
        trace!("Received opcode {:#x} ({:?})", header.opcode, action);

        match action {
            PacketAction::SuspendCommsAck => {
                let _response = self.packet_buffer.read_u32()?;
            }
            PacketAction::Ping => {
                let mut pong = ByteBuffer::with_capacity(4);
                SPong { sequence: 0 }.write(&mut pong);
                self.send_packet(Opcode::SMSG_PONG as u16, pong.read_ptr())
                    .await?;
            }
            PacketAction::KeepAlive => {}
            PacketAction::AuthSession => self.handle_auth_session().await?,
            PacketAction::RedirectClientProof => self.handle_redirect_proof().await?,
            PacketAction::ReadyForAccountDataTimes => {
                let mut body = ByteBuffer::with_capacity(24);
                SAccountDataTimes {
                    server_time: Utc::now().timestamp() as u32,
                    mask: ACCOUNT_DATA_CACHE_MASK,
                }
                .write(&mut body);
                self.send_packet(Opcode::SMSG_ACCOUNT_DATA_TIMES as u16, body.read_ptr())
                    .await?;
            }
            PacketAction::UpdateAccountData => {
                let update = CUpdateAccountData::read(&mut self.packet_buffer)?;
                if update.data_type > 8 {
                    debug!(
                        "Ignoring account data update with type {}",
                        update.data_type
                    );
                } else {
                    let mut body = ByteBuffer::with_capacity(8);
                    SUpdateAccountDataComplete {
                        data_type: update.data_type,
                    }
                    .write(&mut body);
                    self.send_packet(
                        Opcode::SMSG_UPDATE_ACCOUNT_DATA_COMPLETE as u16,
                        body.read_ptr(),
                    )
                    .await?;
                }
            }
            PacketAction::Forward => {
                let mut packet = ByteBuffer::with_capacity(self.packet_buffer.remaining());
                packet.write(self.packet_buffer.read_ptr());
                let message = Message::ForwardPacket {
                    opcode: header.opcode,
                    account: self.account,
                    packet,
                    connection: self.handle,
                };
                if let Err(e) = pass_message(&self.context.bus, message) {
                    warn!(
                        "Dropping forwarded packet with opcode {:#x}: {:?}",
                        header.opcode, e
                    );
                }
            }
        }

        Ok(())
    }

    /// Verify the auth session against the stored session key, switch the
    /// cipher on and emit the post-auth preamble.
    async fn handle_auth_session(&mut self) -> Result<()> {
        if self.phase != HandshakePhase::AwaitingAuth || self.account != 0 {
            bail!(WorldgateError::Protocol(
                "auth session outside the handshake window".to_string()
            ));
        }
        self.phase = HandshakePhase::AuthVerifying;

        let session = CAuthSession::read(&mut self.packet_buffer)?;
        debug!("Auth session incoming for account {}", session.account_name);

        // A broken manifest must not reject the client.
        match parse_addon_manifest(&mut self.packet_buffer) {
            Ok(addons) => {
                for addon in &addons {
                    if addon.crc != WELL_KNOWN_ADDON_CRC {
                        info!("Addon {} reports crc {:#010x}", addon.name, addon.crc);
                    }
                }
            }
            Err(e) => warn!("Skipping unreadable addon manifest: {:?}", e),
        }

        let mut conn = self.context.pool.acquire().await?;
        let accounts = account::get_by_username(&mut conn, &session.account_name).await?;
        if accounts.len() != 1 {
            bail!(WorldgateError::NoAccount);
        }

        let session_key = BigNum::from_hex(&accounts[0].session_key)?;
        if !verify_session_digest(
            &session.account_name,
            session.local_challenge,
            self.conn_seed,
            &session_key,
            &session.digest,
        ) {
            bail!(WorldgateError::DigestMismatch);
        }

        self.crypt.activate(&session_key, &self.seed1, &self.seed2);
        self.session_key = Some(session_key);
        self.account = accounts[0].guid as u32;
        self.phase = HandshakePhase::Authenticated;
        info!("Connection authenticated for account {}", self.account);

        self.send_auth_success_preamble().await
    }

    /// Verify a continued session after a connection redirect. Carries no
    /// addon manifest; otherwise symmetrical to the auth session path.
    async fn handle_redirect_proof(&mut self) -> Result<()> {
        if self.phase != HandshakePhase::AwaitingAuth || self.account != 0 {
            bail!(WorldgateError::Protocol(
                "redirect proof outside the handshake window".to_string()
            ));
        }
        self.phase = HandshakePhase::AuthVerifying;

        let proof = CRedirectClientProof::read(&mut self.packet_buffer)?;
        debug!("Redirect proof incoming for account {}", proof.username);

        let mut conn = self.context.pool.acquire().await?;
        let accounts = account::get_by_username(&mut conn, &proof.username).await?;
        if accounts.len() != 1 {
            bail!(WorldgateError::NoAccount);
        }

        let session_key = BigNum::from_hex(&accounts[0].session_key)?;
        if !verify_redirect_digest(&proof.username, self.conn_seed, &session_key, &proof.digest) {
            bail!(WorldgateError::DigestMismatch);
        }

        self.crypt.activate(&session_key, &self.seed1, &self.seed2);
        self.session_key = Some(session_key);
        self.account = accounts[0].guid as u32;
        self.phase = HandshakePhase::Authenticated;
        info!("Connection resumed for account {}", self.account);

        self.send_auth_success_preamble().await
    }

    /// The fixed frame sequence following a verified handshake, then the
    /// forwarded login for a character that is already flagged online.
    async fn send_auth_success_preamble(&mut self) -> Result<()> {
        let mut response = ByteBuffer::with_capacity(16);
        SAuthResponse {
            result: AuthResult::Ok,
            expansion: EXPANSION,
        }
        .write(&mut response);
        self.send_packet(Opcode::SMSG_AUTH_RESPONSE as u16, response.read_ptr())
            .await?;

        let mut addon_info = ByteBuffer::new();
        SAddonInfo::from_known_table().write(&mut addon_info);
        self.send_packet(Opcode::SMSG_ADDON_INFO as u16, addon_info.read_ptr())
            .await?;

        let mut client_cache = ByteBuffer::with_capacity(4);
        SClientCacheVersion { version: 0 }.write(&mut client_cache);
        self.send_packet(
            Opcode::SMSG_CLIENTCACHE_VERSION as u16,
            client_cache.read_ptr(),
        )
        .await?;

        let mut tutorial_flags = ByteBuffer::with_capacity(32);
        STutorialFlags.write(&mut tutorial_flags);
        self.send_packet(Opcode::SMSG_TUTORIAL_FLAGS as u16, tutorial_flags.read_ptr())
            .await?;

        let mut conn = self.context.pool.acquire().await?;
        if let Some(online) = character::get_online_by_account(&mut conn, self.account as i32).await?
        {
            debug!("Forwarding login for online character {}", online.guid);
            let mut packet = ByteBuffer::with_capacity(8);
            packet.write_u64(online.guid as u64);
            let message = Message::ForwardPacket {
                opcode: Opcode::CMSG_PLAYER_LOGIN as u32,
                account: self.account,
                packet,
                connection: self.handle,
            };
            if let Err(e) = pass_message(&self.context.bus, message) {
                warn!("Dropping player login forward: {:?}", e);
            }
        }

        Ok(())
    }

    /// Frame and send one packet: encrypted header, then the payload, in a
    /// single contiguous write.
    async fn send_packet(&mut self, opcode: u16, payload: &[u8]) -> Result<()> {
        let mut header = ServerPacketHeader::new(payload.len(), opcode);
        self.crypt.encrypt_outbound(header.as_mut_bytes());

        let mut buffer = Vec::with_capacity(header.as_bytes().len() + payload.len());
        buffer.extend_from_slice(header.as_bytes());
        buffer.extend_from_slice(payload);

        timeout(self.write_timeout_dur, self.stream.write_all(&buffer)).await?;
        trace!("Sent opcode {:#x} with {} payload bytes", opcode, payload.len());
        Ok(())
    }
}

/// Digest a client presents to prove it owns the session key bound to
/// `account_name`.
pub fn verify_session_digest(
    account_name: &str,
    local_challenge: u32,
    conn_seed: u32,
    session_key: &BigNum,
    digest: &[u8; 20],
) -> bool {
    let mut sha = Sha1Hasher::new();
    sha.update(account_name.as_bytes());
    sha.update(&[0u8; 4]);
    sha.update(&local_challenge.to_le_bytes());
    sha.update(&conn_seed.to_le_bytes());
    sha.update_bignum(SESSION_KEY_WIDTH, session_key);
    digest_equal(&sha.finalize(), digest)
}

/// Digest of the continued session proof after a redirect.
pub fn verify_redirect_digest(
    username: &str,
    conn_seed: u32,
    session_key: &BigNum,
    digest: &[u8; 20],
) -> bool {
    let mut sha = Sha1Hasher::new();
    sha.update(username.as_bytes());
    sha.update_bignum(SESSION_KEY_WIDTH, session_key);
    sha.update(&conn_seed.to_le_bytes());
    digest_equal(&sha.finalize(), digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::world_queue;
    use crate::protocol::opcode::NUM_MSG_TYPES;
    use async_std::net::{TcpListener, TcpStream};
    use async_std::task::{self, JoinHandle};
    use byteorder::{BigEndian, ByteOrder, LittleEndian};
    use sha1::{Digest, Sha1};
    use std::net::SocketAddr;

    async fn test_context() -> Result<(Arc<WorldContext>, Receiver<BusMessage>)> {
        // The pool stays unconnected; none of these tests touch the database.
        let pool = DbPool::builder()
            .min_size(0)
            .build("postgres://localhost/worldgate_test")
            .await?;
        let (bus, queue) = world_queue();

        Ok((
            Arc::new(WorldContext {
                pool,
                bus,
                registry: ConnectionRegistry::new(),
            }),
            queue,
        ))
    }

    async fn spawn_session_server() -> Result<(SocketAddr, JoinHandle<()>, Receiver<BusMessage>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (context, queue) = test_context().await?;

        let join = task::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut session = WorldSession::new(&mut socket, context.clone());
            let handle = session.handle;
            session.start().await.unwrap();
            session.handle_connection().await.ok();
            context.registry.unregister(handle);
        });

        Ok((addr, join, queue))
    }

    /// Read one plaintext server frame: 4 byte header (big-endian size,
    /// little-endian opcode), then the payload.
    async fn read_frame(stream: &mut TcpStream) -> Result<(u16, Vec<u8>)> {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await?;

        let size = BigEndian::read_u16(&header[0..2]) as usize;
        let opcode = LittleEndian::read_u16(&header[2..4]);

        let mut payload = vec![0u8; size - 2];
        stream.read_exact(&mut payload).await?;
        Ok((opcode, payload))
    }

    /// Write one plaintext client frame: 6 byte header (big-endian size over
    /// opcode and payload, little-endian opcode), then the payload.
    async fn write_frame(stream: &mut TcpStream, opcode: u32, payload: &[u8]) -> Result<()> {
        let mut header = [0u8; 6];
        BigEndian::write_u16(&mut header[0..2], (payload.len() + 4) as u16);
        LittleEndian::write_u32(&mut header[2..6], opcode);

        stream.write_all(&header).await?;
        stream.write_all(payload).await?;
        Ok(())
    }

    async fn read_until_closed(stream: &mut TcpStream) -> bool {
        let mut scratch = vec![0u8; 256];
        loop {
            match stream.read(&mut scratch).await {
                Ok(0) => return true,
                Ok(_) => continue,
                Err(_) => return true,
            }
        }
    }

    #[async_std::test]
    async fn test_greeting_frames() -> Result<()> {
        let (addr, join, _queue) = spawn_session_server().await?;
        let mut stream = TcpStream::connect(&addr).await?;

        let (opcode, payload) = read_frame(&mut stream).await?;
        assert_eq!(opcode, Opcode::SMSG_RESUME_COMMS as u16);
        assert!(payload.is_empty());

        let (opcode, payload) = read_frame(&mut stream).await?;
        assert_eq!(opcode, Opcode::SMSG_AUTH_CHALLENGE as u16);
        assert_eq!(payload.len(), 40);
        assert_eq!(LittleEndian::read_u32(&payload[0..4]), 1);

        drop(stream);
        join.await;
        Ok(())
    }

    #[async_std::test]
    async fn test_ping_pong() -> Result<()> {
        let (addr, join, _queue) = spawn_session_server().await?;
        let mut stream = TcpStream::connect(&addr).await?;

        read_frame(&mut stream).await?;
        read_frame(&mut stream).await?;

        let mut ping_payload = [0u8; 4];
        LittleEndian::write_u32(&mut ping_payload, 0x1234_5678);
        write_frame(&mut stream, Opcode::CMSG_PING as u32, &ping_payload).await?;

        let (opcode, payload) = read_frame(&mut stream).await?;
        assert_eq!(opcode, Opcode::SMSG_PONG as u16);
        assert_eq!(payload, vec![0, 0, 0, 0]);

        drop(stream);
        join.await;
        Ok(())
    }

    #[async_std::test]
    async fn test_oversized_frame_closes_connection() -> Result<()> {
        let (addr, join, _queue) = spawn_session_server().await?;
        let mut stream = TcpStream::connect(&addr).await?;

        read_frame(&mut stream).await?;
        read_frame(&mut stream).await?;

        let mut header = [0u8; 6];
        BigEndian::write_u16(&mut header[0..2], 20000);
        LittleEndian::write_u32(&mut header[2..6], Opcode::CMSG_PING as u32);
        stream.write_all(&header).await?;

        assert!(read_until_closed(&mut stream).await);
        join.await;
        Ok(())
    }

    #[async_std::test]
    async fn test_out_of_range_opcode_closes_connection() -> Result<()> {
        let (addr, join, _queue) = spawn_session_server().await?;
        let mut stream = TcpStream::connect(&addr).await?;

        read_frame(&mut stream).await?;
        read_frame(&mut stream).await?;

        write_frame(&mut stream, u32::from(NUM_MSG_TYPES), &[]).await?;

        assert!(read_until_closed(&mut stream).await);
        join.await;
        Ok(())
    }

    #[async_std::test]
    async fn test_malformed_auth_session_closes_connection() -> Result<()> {
        let (addr, join, _queue) = spawn_session_server().await?;
        let mut stream = TcpStream::connect(&addr).await?;

        read_frame(&mut stream).await?;
        read_frame(&mut stream).await?;

        write_frame(&mut stream, Opcode::CMSG_AUTH_SESSION as u32, &[0u8; 4]).await?;

        assert!(read_until_closed(&mut stream).await);
        join.await;
        Ok(())
    }

    #[async_std::test]
    async fn test_unhandled_opcode_is_forwarded_verbatim() -> Result<()> {
        let (addr, join, queue) = spawn_session_server().await?;
        let mut stream = TcpStream::connect(&addr).await?;

        read_frame(&mut stream).await?;
        read_frame(&mut stream).await?;

        let payload = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x42];
        write_frame(&mut stream, Opcode::CMSG_NAME_QUERY as u32, &payload).await?;

        let message = queue.recv().await?;
        match *message {
            Message::ForwardPacket {
                opcode,
                account,
                packet,
                ..
            } => {
                assert_eq!(opcode, Opcode::CMSG_NAME_QUERY as u32);
                assert_eq!(account, 0);
                assert_eq!(packet.read_ptr(), payload.as_slice());
            }
        }

        drop(stream);
        join.await;
        Ok(())
    }

    #[async_std::test]
    async fn test_split_frame_delivery() -> Result<()> {
        // A frame arriving one byte at a time must still assemble cleanly.
        let (addr, join, _queue) = spawn_session_server().await?;
        let mut stream = TcpStream::connect(&addr).await?;

        read_frame(&mut stream).await?;
        read_frame(&mut stream).await?;

        let mut frame = Vec::new();
        let mut header = [0u8; 6];
        BigEndian::write_u16(&mut header[0..2], 8);
        LittleEndian::write_u32(&mut header[2..6], Opcode::CMSG_PING as u32);
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&[0u8; 4]);

        for byte in frame {
            stream.write_all(&[byte]).await?;
            stream.flush().await?;
        }

        let (opcode, _) = read_frame(&mut stream).await?;
        assert_eq!(opcode, Opcode::SMSG_PONG as u16);

        drop(stream);
        join.await;
        Ok(())
    }

    fn session_digest_fixture() -> (String, u32, u32, BigNum, [u8; 20]) {
        let account_name = "TESTER".to_string();
        let local_challenge = 0x1122_3344u32;
        let conn_seed = 0xDEAD_BEEFu32;
        let session_key = BigNum::from_bytes(&(1..=40).collect::<Vec<u8>>());

        // Compose the digest independently of the helpers under test.
        let mut sha = Sha1::new();
        sha.update(account_name.as_bytes());
        sha.update([0u8; 4]);
        sha.update([0x44, 0x33, 0x22, 0x11]);
        sha.update([0xEF, 0xBE, 0xAD, 0xDE]);
        sha.update(session_key.to_bytes(SESSION_KEY_WIDTH));
        let digest: [u8; 20] = sha.finalize().into();

        (account_name, local_challenge, conn_seed, session_key, digest)
    }

    #[test]
    fn test_session_digest_accepts_valid_proof() {
        let (account_name, local_challenge, conn_seed, session_key, digest) =
            session_digest_fixture();

        assert!(verify_session_digest(
            &account_name,
            local_challenge,
            conn_seed,
            &session_key,
            &digest
        ));
    }

    #[test]
    fn test_session_digest_rejects_flipped_byte() {
        let (account_name, local_challenge, conn_seed, session_key, mut digest) =
            session_digest_fixture();
        digest[7] ^= 0x01;

        assert!(!verify_session_digest(
            &account_name,
            local_challenge,
            conn_seed,
            &session_key,
            &digest
        ));
    }

    #[test]
    fn test_session_digest_binds_the_connection_seed() {
        let (account_name, local_challenge, conn_seed, session_key, digest) =
            session_digest_fixture();

        assert!(!verify_session_digest(
            &account_name,
            local_challenge,
            conn_seed ^ 1,
            &session_key,
            &digest
        ));
    }

    #[test]
    fn test_redirect_digest_round_trip() {
        let username = "TESTER";
        let conn_seed = 0xCAFE_F00Du32;
        let session_key = BigNum::from_bytes(&[0x33; 40]);

        let mut sha = Sha1::new();
        sha.update(username.as_bytes());
        sha.update(session_key.to_bytes(SESSION_KEY_WIDTH));
        sha.update(conn_seed.to_le_bytes());
        let digest: [u8; 20] = sha.finalize().into();

        assert!(verify_redirect_digest(
            username,
            conn_seed,
            &session_key,
            &digest
        ));
        assert!(!verify_redirect_digest(
            "OTHER",
            conn_seed,
            &session_key,
            &digest
        ));
    }
}

/// Module that defines the wire opcodes and the flat dispatch table.
use lazy_static::lazy_static;

/// Upper bound of valid opcode values. Inbound headers carrying anything at
/// or above it are a protocol violation.
pub const NUM_MSG_TYPES: u16 = 0x051F;

/// Wire opcodes the world node sends or handles itself. Client packets
/// outside this set still flow through the node; they are forwarded to the
/// world handler untouched.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    CMSG_PLAYER_LOGIN = 0x003D,
    CMSG_NAME_QUERY = 0x0050,
    SMSG_TUTORIAL_FLAGS = 0x00FD,
    CMSG_PING = 0x01DC,
    SMSG_PONG = 0x01DD,
    SMSG_AUTH_CHALLENGE = 0x01EC,
    CMSG_AUTH_SESSION = 0x01ED,
    SMSG_AUTH_RESPONSE = 0x01EE,
    SMSG_ACCOUNT_DATA_TIMES = 0x0209,
    CMSG_UPDATE_ACCOUNT_DATA = 0x020B,
    SMSG_ADDON_INFO = 0x02EF,
    CMSG_KEEP_ALIVE = 0x0407,
    SMSG_UPDATE_ACCOUNT_DATA_COMPLETE = 0x0463,
    CMSG_SUSPEND_COMMS_ACK = 0x0487,
    SMSG_RESUME_COMMS = 0x0488,
    SMSG_CLIENTCACHE_VERSION = 0x04AB,
    CMSG_REDIRECT_CLIENT_PROOF = 0x04C0,
    CMSG_READY_FOR_ACCOUNT_DATA_TIMES = 0x04FF,
}

/// Built-in handling selected per opcode; `Forward` is the default action for
/// everything without a built-in handler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PacketAction {
    SuspendCommsAck,
    Ping,
    KeepAlive,
    AuthSession,
    RedirectClientProof,
    ReadyForAccountDataTimes,
    UpdateAccountData,
    Forward,
}

lazy_static! {
    /// Flat opcode value to action table. Immutable after process start.
    pub static ref DISPATCH_TABLE: Vec<PacketAction> = build_dispatch_table();
}

fn build_dispatch_table() -> Vec<PacketAction> {
    let mut table = vec![PacketAction::Forward; NUM_MSG_TYPES as usize];
    table[Opcode::CMSG_SUSPEND_COMMS_ACK as usize] = PacketAction::SuspendCommsAck;
    table[Opcode::CMSG_PING as usize] = PacketAction::Ping;
    table[Opcode::CMSG_KEEP_ALIVE as usize] = PacketAction::KeepAlive;
    table[Opcode::CMSG_AUTH_SESSION as usize] = PacketAction::AuthSession;
    table[Opcode::CMSG_REDIRECT_CLIENT_PROOF as usize] = PacketAction::RedirectClientProof;
    table[Opcode::CMSG_READY_FOR_ACCOUNT_DATA_TIMES as usize] =
        PacketAction::ReadyForAccountDataTimes;
    table[Opcode::CMSG_UPDATE_ACCOUNT_DATA as usize] = PacketAction::UpdateAccountData;
    table
}

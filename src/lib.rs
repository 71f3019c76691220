#![warn(clippy::all)]

use thiserror::Error;

pub mod config;
pub mod crypt;
pub mod message;
pub mod model;
pub mod protocol;
pub mod realmserver;
pub mod worldhandler;
pub mod worldserver;

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

pub type DbPool = sqlx::PgPool;

#[derive(Error, Debug)]
pub enum WorldgateError {
    #[error("not enough bytes left in buffer")]
    ShortRead,

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("client digest does not match the stored session key")]
    DigestMismatch,

    #[error("account missing or ambiguous")]
    NoAccount,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("world message queue is full or gone")]
    BusUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hex error: {0}")]
    FromHex(#[from] hex::FromHexError),

    #[error("flate2 decompress error: {0}")]
    Flate2Decompress(#[from] flate2::DecompressError),

    #[error("utf8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// The module of the realm endpoint that serves the realm catalog.
use crate::config::{Configuration, RealmConfiguration};
use crate::protocol::buffer::ByteBuffer;
use crate::{Result, WorldgateError};
use anyhow::bail;
use async_std::net::{TcpListener, TcpStream};
use async_std::prelude::*;
use async_std::task;
use std::io::ErrorKind;
use tracing::{error, info, info_span, warn};
use tracing_futures::Instrument;

/// Command byte of the realm catalog request and response.
const CMD_REALM_LIST: u8 = 0x10;

/// Main loop of the realm server.
pub async fn run(config: Configuration) -> Result<()> {
    let listen_string = format!("{}:{}", config.server.ip, config.server.realm_port);
    info!("listening on tcp://{}", listen_string);
    let listener = TcpListener::bind(listen_string).await?;

    loop {
        match listener.accept().await {
            Ok((mut socket, addr)) => {
                let realms = config.realms.clone();

                task::spawn(
                    async move {
                        info!("Incoming connection");
                        match handle_client(&mut socket, &realms).await {
                            Ok(_) => info!("Connection closed"),
                            Err(e) => warn!("Error while serving realm list: {:?}", e),
                        }
                    }
                    .instrument(info_span!("socket", %addr)),
                );
            }
            Err(e) => error!("Failed to open connection: {:?}", e),
        }
    }
}

async fn handle_client(stream: &mut TcpStream, realms: &[RealmConfiguration]) -> Result<()> {
    let mut request = [0u8; 5];

    loop {
        match stream.read_exact(&mut request).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        if request[0] != CMD_REALM_LIST {
            bail!(WorldgateError::Protocol(format!(
                "unexpected realm command {:#x}",
                request[0]
            )));
        }

        let response = build_realm_list_response(realms);
        stream.write_all(&response).await?;
    }
}

/// Frame the catalog: command byte, little-endian payload size, a padding
/// word, the realm count and one row per realm.
pub fn build_realm_list_response(realms: &[RealmConfiguration]) -> Vec<u8> {
    let mut body = ByteBuffer::new();
    body.write_u32(0);
    body.write_u16(realms.len() as u16);

    for realm in realms {
        body.write_u8(1); // kind
        body.write_u8(0); // not locked
        body.write_u8(0); // flags
        body.write_cstring(&realm.name);
        body.write_cstring(&realm.address);
        body.write_f32(realm.population);
        body.write_u8(0); // characters on this realm
        body.write_u8(realm.timezone);
        body.write_u8(realm.id);
    }

    let mut response = Vec::with_capacity(3 + body.remaining());
    response.push(CMD_REALM_LIST);
    response.extend_from_slice(&(body.remaining() as u16).to_le_bytes());
    response.extend_from_slice(body.read_ptr());
    response
}

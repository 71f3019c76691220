/// The module of the world server that accepts the game client connections.
use crate::config::Configuration;
use crate::protocol::{WorldContext, WorldSession};
use crate::{Result, WorldgateError};
use async_std::net::TcpListener;
use async_std::task;
use std::sync::Arc;
use tracing::{error, info, info_span, warn};
use tracing_futures::Instrument;

/// Main loop of the world server.
pub async fn run(context: Arc<WorldContext>, config: Configuration) -> Result<()> {
    let listen_string = format!("{}:{}", config.server.ip, config.server.world_port);
    info!("listening on tcp://{}", listen_string);
    let listener = TcpListener::bind(listen_string).await?;

    loop {
        match listener.accept().await {
            Ok((mut socket, addr)) => {
                let connection_context = context.clone();

                task::spawn(
                    async move {
                        info!("Incoming connection");

                        let mut session = WorldSession::new(&mut socket, connection_context.clone());
                        let handle = session.handle;

                        let result = async {
                            session.start().await?;
                            session.handle_connection().await
                        }
                        .instrument(info_span!("connection", id = handle.id, generation = handle.generation))
                        .await;

                        // The close is terminal: no bus reply may reach this
                        // slot once the generation has been bumped.
                        connection_context.registry.unregister(handle);

                        match result {
                            Ok(_) => info!("Connection closed"),
                            Err(e) => match e.downcast_ref::<WorldgateError>() {
                                Some(WorldgateError::ConnectionClosed) => {
                                    info!("Connection closed");
                                }
                                Some(..) | None => {
                                    warn!("Error while handling world session: {:?}", e)
                                }
                            },
                        }
                    }
                    .instrument(info_span!("socket", %addr)),
                );
            }
            Err(e) => error!("Failed to open connection: {:?}", e),
        }
    }
}

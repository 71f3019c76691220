/// The module that consumes the forwarded packets of the world queue.
///
/// The world simulation proper lives in another process; this handler owns
/// the queue end of the contract, decodes the synthetic player login and
/// answers through the connection registry when it has something to say.
use crate::message::{BusMessage, Message};
use crate::protocol::opcode::Opcode;
use crate::Result;
use async_std::channel::Receiver;
use tracing::{debug, info};

pub struct WorldHandler {
    queue: Receiver<BusMessage>,
}

impl WorldHandler {
    pub fn new(queue: Receiver<BusMessage>) -> WorldHandler {
        WorldHandler { queue }
    }

    /// Single consumer loop; ends when the last producer is gone.
    pub async fn run(&mut self) -> Result<()> {
        while let Ok(message) = self.queue.recv().await {
            if let Err(e) = self.handle_message(*message) {
                debug!("Dropping world message: {:?}", e);
            }
        }
        Ok(())
    }

    fn handle_message(&mut self, message: Message) -> Result<()> {
        match message {
            Message::ForwardPacket {
                opcode,
                account,
                mut packet,
                connection,
            } => {
                if opcode == Opcode::CMSG_PLAYER_LOGIN as u32 {
                    let guid = packet.read_u64()?;
                    info!(
                        "Player login for character {} on account {} (connection {}/{})",
                        guid, account, connection.id, connection.generation
                    );
                } else {
                    debug!(
                        "No world handler for opcode {:#x} from account {}",
                        opcode, account
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{world_queue, ConnectionHandle};
    use crate::protocol::buffer::ByteBuffer;

    fn forward(opcode: u32, payload: Vec<u8>) -> Message {
        Message::ForwardPacket {
            opcode,
            account: 77,
            packet: ByteBuffer::from_vec(payload),
            connection: ConnectionHandle {
                id: 0,
                generation: 0,
            },
        }
    }

    #[test]
    fn test_player_login_is_decoded() {
        let (_bus, queue) = world_queue();
        let mut handler = WorldHandler::new(queue);

        let mut payload = ByteBuffer::new();
        payload.write_u64(0x0102_0304_0506_0708);

        let message = forward(Opcode::CMSG_PLAYER_LOGIN as u32, payload.read_ptr().to_vec());
        assert!(handler.handle_message(message).is_ok());
    }

    #[test]
    fn test_truncated_player_login_is_rejected() {
        let (_bus, queue) = world_queue();
        let mut handler = WorldHandler::new(queue);

        let message = forward(Opcode::CMSG_PLAYER_LOGIN as u32, vec![1, 2, 3]);
        assert!(handler.handle_message(message).is_err());
    }

    #[test]
    fn test_other_opcodes_are_consumed() {
        let (_bus, queue) = world_queue();
        let mut handler = WorldHandler::new(queue);

        let message = forward(Opcode::CMSG_NAME_QUERY as u32, vec![0; 8]);
        assert!(handler.handle_message(message).is_ok());
    }
}

/// Messages passed between the connection layer and the world handler.
///
/// The world queue is many-producer single-consumer and pushes never block.
/// The handler talks back through a generation stamped connection handle, so
/// a reply arriving after the connection died can never touch a recycled
/// slot.
use crate::protocol::buffer::ByteBuffer;
use crate::{Result, WorldgateError};
use anyhow::bail;
use async_std::channel::{bounded, Receiver, Sender};
use std::fmt;
use std::sync::Mutex;

pub type BusMessage = Box<Message>;

/// Capacity of the world queue and of each connection command channel.
const CHANNEL_CAPACITY: usize = 128;

/// Messages emitted by the connection layer.
#[derive(Clone, Debug)]
pub enum Message {
    /// A client packet without a built-in handler, payload copied verbatim.
    ForwardPacket {
        opcode: u32,
        account: u32,
        packet: ByteBuffer,
        connection: ConnectionHandle,
    },
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::ForwardPacket { .. } => write!(f, "Message::ForwardPacket"),
        }
    }
}

/// Commands re-entering a connection's serialization domain.
#[derive(Clone, Debug)]
pub enum SessionCommand {
    SendPacket { opcode: u16, payload: Vec<u8> },
    Close,
}

/// Stamped reference to a connection slot. The stamp goes stale the moment
/// the connection unregisters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub id: u32,
    pub generation: u32,
}

struct Slot {
    generation: u32,
    sender: Option<Sender<SessionCommand>>,
}

/// Table of live connections. Slots are recycled across connections; the
/// generation stamp keeps late senders away from a reused slot.
pub struct ConnectionRegistry {
    slots: Mutex<Vec<Slot>>,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        ConnectionRegistry {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Register a new connection. Returns its handle and the command channel
    /// the session has to drain.
    pub fn register(&self) -> (ConnectionHandle, Receiver<SessionCommand>) {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let mut slots = self.slots.lock().unwrap();

        for (id, slot) in slots.iter_mut().enumerate() {
            if slot.sender.is_none() {
                slot.sender = Some(tx);
                return (
                    ConnectionHandle {
                        id: id as u32,
                        generation: slot.generation,
                    },
                    rx,
                );
            }
        }

        slots.push(Slot {
            generation: 0,
            sender: Some(tx),
        });
        (
            ConnectionHandle {
                id: slots.len() as u32 - 1,
                generation: 0,
            },
            rx,
        )
    }

    /// Release the slot and bump its generation so stale handles miss. Must
    /// run after the terminal close of the connection.
    pub fn unregister(&self, handle: ConnectionHandle) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(handle.id as usize) {
            if slot.generation == handle.generation {
                slot.generation = slot.generation.wrapping_add(1);
                slot.sender = None;
            }
        }
    }

    /// Push a command towards the connection if the handle is still current.
    /// Never blocks.
    pub fn send(&self, handle: ConnectionHandle, command: SessionCommand) -> Result<()> {
        let slots = self.slots.lock().unwrap();
        let sender = match slots.get(handle.id as usize) {
            Some(slot) if slot.generation == handle.generation => match &slot.sender {
                Some(sender) => sender.clone(),
                None => bail!(WorldgateError::ConnectionClosed),
            },
            _ => bail!(WorldgateError::ConnectionClosed),
        };
        drop(slots);

        if sender.try_send(command).is_err() {
            bail!(WorldgateError::BusUnavailable);
        }
        Ok(())
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        ConnectionRegistry::new()
    }
}

/// Create the world handler queue.
pub fn world_queue() -> (Sender<BusMessage>, Receiver<BusMessage>) {
    bounded(CHANNEL_CAPACITY)
}

/// Push a message onto the world queue without blocking.
pub fn pass_message(bus: &Sender<BusMessage>, message: Message) -> Result<()> {
    if bus.try_send(Box::new(message)).is_err() {
        bail!(WorldgateError::BusUnavailable);
    }
    Ok(())
}

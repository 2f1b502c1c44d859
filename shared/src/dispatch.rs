//! Packet dispatch: a handler table keyed by [`PacketType`].
//!
//! The server and the client each build one table at startup and route
//! every decoded message through it. `Ctx` is the role's mutable state
//! (the server's registry/session, the client's session/replication);
//! `Meta` carries per-message metadata (the sending client's ID on the
//! server, nothing on the client). A message whose type has no registered
//! handler is reported back to the caller rather than treated as an error,
//! since the server intentionally leaves pass-through types unhandled.

use crate::protocol::{Message, PacketType};
use std::collections::HashMap;

/// Error type handlers may surface; dispatching stops at the first one.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type Handler<Ctx, Meta> =
    Box<dyn Fn(&mut Ctx, Meta, &Message) -> Result<(), HandlerError> + Send + Sync>;

pub struct DispatchTable<Ctx, Meta = ()> {
    handlers: HashMap<PacketType, Handler<Ctx, Meta>>,
}

impl<Ctx, Meta: Copy> DispatchTable<Ctx, Meta> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers the handler for one packet type, replacing any previous
    /// registration.
    pub fn register<F>(&mut self, kind: PacketType, handler: F)
    where
        F: Fn(&mut Ctx, Meta, &Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Routes `message` to its registered handler. Returns `Ok(false)`
    /// when no handler is registered for the message's type.
    pub fn dispatch(
        &self,
        ctx: &mut Ctx,
        meta: Meta,
        message: &Message,
    ) -> Result<bool, HandlerError> {
        match self.handlers.get(&message.packet_type()) {
            Some(handler) => {
                handler(ctx, meta, message)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_registered(&self, kind: PacketType) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl<Ctx, Meta: Copy> Default for DispatchTable<Ctx, Meta> {
    fn default() -> Self {
        Self::new()
    }
}

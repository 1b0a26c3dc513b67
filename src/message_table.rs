//local shortcuts
use crate::*;
use crate::client_session::handlers;

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;
use std::collections::HashMap;

//-------------------------------------------------------------------------------------------------------------------

/// Signature for an inbound message handler: given the session, the connection it arrived on, and the
/// parsed frame, mutate session state and return `Ok(())` or a typed [`Error`].
///
/// `ClientSession` is a shared handle over interior-mutable state (see its doc comment), so handlers take
/// it by shared reference rather than `&mut`.
pub type MessageHandler = fn(&ClientSession, &dyn Connection, &XmlNode) -> Result<(), Error>;

//-------------------------------------------------------------------------------------------------------------------

/// A read-only, name-keyed registry mapping an inbound message verb to its handler (C4).
///
/// Built once (typically via [`MessageTable::with_defaults`]) and shared read-only across every
/// [`ClientSession`](crate::ClientSession) instance of a given protocol flavor — mirroring the
/// class-level `message_table` in `original_source`'s `InfcSessionClass`, translated from runtime
/// singleton mutation into an explicitly constructed, immutable value.
#[derive(Debug, Clone, Default)]
pub struct MessageTable
{
    handlers: HashMap<String, MessageHandler>,
}

impl MessageTable
{
    pub fn new() -> Self { Self::default() }

    /// Registers `handler` under `name`. Returns `false` (and does not overwrite) if `name` is already
    /// registered, matching `original_source`'s `infc_session_class_register_message`.
    pub fn register(&mut self, name: impl Into<String>, handler: MessageHandler) -> bool
    {
        let name = name.into();
        if self.handlers.contains_key(&name) { return false; }
        self.handlers.insert(name, handler);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<MessageHandler>
    {
        self.handlers.get(name).copied()
    }

    /// Builds the table with the five default handlers from spec.md §4.5.4: `user-join`, `user-rejoin`,
    /// `user-leave`, `request-failed`, `session-close`.
    pub fn with_defaults() -> Self
    {
        let mut table = Self::new();
        table.register("user-join", handlers::handle_user_join);
        table.register("user-rejoin", handlers::handle_user_rejoin);
        table.register("user-leave", handlers::handle_user_leave);
        table.register("request-failed", handlers::handle_request_failed);
        table.register("session-close", handlers::handle_session_close);
        table
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------

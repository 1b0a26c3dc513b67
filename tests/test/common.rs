//local shortcuts
use infc_session::*;

//third-party shortcuts

//standard shortcuts
use std::sync::Arc;

//-------------------------------------------------------------------------------------------------------------------
//-------------------------------------------------------------------------------------------------------------------

/// Builds a fresh [`ClientSession`] over an [`InMemorySessionBase`], with its own
/// [`InMemoryConnectionManager`].
pub fn new_session() -> (ClientSession, Arc<InMemoryConnectionManager>)
{
    let manager = Arc::new(InMemoryConnectionManager::new());
    let base = InMemorySessionBase::new(manager.clone());
    let session = ClientSession::new(1u128, Box::new(base));
    (session, manager)
}

/// As [`new_session`], but seeds the roster with `users` before the session takes ownership of the base
/// (`ClientSession` hides its `SessionBase` behind `pub(crate)` accessors, so roster seeding has to happen
/// before construction).
pub fn new_session_with_users(users: Vec<User>) -> (ClientSession, Arc<InMemoryConnectionManager>)
{
    let manager = Arc::new(InMemoryConnectionManager::new());
    let mut base = InMemorySessionBase::new(manager.clone());
    for user in users { base.insert_user(user); }
    let session = ClientSession::new(1u128, Box::new(base));
    (session, manager)
}

/// Binds a fresh [`InMemoryConnection`] (id `conn_id`) to `session` and returns a handle the test can use
/// to inspect sent frames and drive status changes.
pub fn bind(session: &ClientSession, conn_id: ConnectionId) -> InMemoryConnection
{
    let conn = InMemoryConnection::new(conn_id);
    session.set_connection(Some(Arc::new(conn.clone())), Some("doc"));
    conn
}

/// Builds a [`PropertyBag`] of string-valued properties from `(key, value)` pairs; sufficient for exercising
/// the wire path without needing typed construction at every call site.
pub fn props(pairs: &[(&str, &str)]) -> PropertyBag
{
    pairs.iter().map(|(k, v)| (k.to_string(), PropertyValue::Str(v.to_string()))).collect()
}

//-------------------------------------------------------------------------------------------------------------------

//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

//-------------------------------------------------------------------------------------------------------------------

/// Identifier for a [`Session`](crate::ClientSession), stable for the lifetime of the process.
pub type SessionId = u128;

/// Identifier for a [`Connection`].
pub type ConnectionId = u64;

/// Identifier for a [`User`].
pub type UserId = u32;

//-------------------------------------------------------------------------------------------------------------------

/// Lifecycle status of a [`ClientSession`](crate::ClientSession)'s underlying replica.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionStatus
{
    /// the initial document is still being transferred
    Synchronizing,
    /// the replica is up to date and accepting regular messages
    Running,
    /// the session is terminal; it may still be reused via [`ClientSession::set_connection`](crate::ClientSession::set_connection)
    Closed,
}

//-------------------------------------------------------------------------------------------------------------------

/// Progress of a synchronization in flight on a particular connection.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SyncStatus
{
    /// no synchronization involves this connection
    None,
    /// the bulk transfer is still underway
    InProgress,
    /// the last synchronization message was sent; waiting for the peer's acknowledgement
    AwaitingAck,
}

//-------------------------------------------------------------------------------------------------------------------

/// Availability of a [`User`] in the roster.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UserStatus
{
    Available,
    Unavailable,
}

//-------------------------------------------------------------------------------------------------------------------

/// Whether a [`User`] was joined by this session (as opposed to some other host).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UserFlags
{
    /// the inbound `user-join`/`user-rejoin` carried a `seq`, i.e. it is a reply to our own request
    Local,
    /// the user was joined/rejoined by another host
    None,
}

//-------------------------------------------------------------------------------------------------------------------

/// A typed value for a user property, mirroring the closed set of shapes the wire format can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue
{
    Str(String),
    UInt(u32),
    Float(f64),
    Status(UserStatus),
    Flags(UserFlags),
    /// an opaque ACL identity, passed through without interpretation (see spec Non-goals)
    Acl(String),
}

/// An ordered set of named properties, extracted from or destined for an XML frame's attributes.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

//-------------------------------------------------------------------------------------------------------------------

/// A user known to a [`SessionBase`]'s roster.
#[derive(Debug, Clone)]
pub struct User
{
    id: UserId,
    status: UserStatus,
    flags: UserFlags,
    properties: PropertyBag,
}

impl User
{
    /// Makes a new user from a property bag. Requires `id` and `status` to be present in `properties`.
    pub fn new(id: UserId, properties: PropertyBag) -> Self
    {
        let status = match properties.get("status")
        {
            Some(PropertyValue::Status(status)) => *status,
            _ => UserStatus::Unavailable,
        };
        let flags = match properties.get("flags")
        {
            Some(PropertyValue::Flags(flags)) => *flags,
            _ => UserFlags::None,
        };

        Self{ id, status, flags, properties }
    }

    pub fn id(&self) -> UserId { self.id }
    pub fn status(&self) -> UserStatus { self.status }
    pub fn flags(&self) -> UserFlags { self.flags }
    pub fn property(&self, name: &str) -> Option<&PropertyValue> { self.properties.get(name) }
    pub fn properties(&self) -> &PropertyBag { &self.properties }

    pub fn set_status(&mut self, status: UserStatus)
    {
        self.status = status;
        self.properties.insert("status".to_string(), PropertyValue::Status(status));
    }

    pub fn set_flags(&mut self, flags: UserFlags)
    {
        self.flags = flags;
        self.properties.insert("flags".to_string(), PropertyValue::Flags(flags));
    }

    /// Applies every property in `props` except `"id"`, which is immutable after construction.
    pub fn apply_properties(&mut self, props: &PropertyBag)
    {
        for (key, value) in props
        {
            if key == "id" { continue; }
            self.properties.insert(key.clone(), value.clone());
        }

        if let Some(PropertyValue::Status(status)) = self.properties.get("status") { self.status = *status; }
        if let Some(PropertyValue::Flags(flags)) = self.properties.get("flags") { self.flags = *flags; }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Status of a [`Connection`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectionStatus
{
    Open,
    Closing,
    Closed,
}

/// Error returned by [`Connection::send`]/[`ConnectionManager::send`] when the frame could not be transmitted.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TransportError;

impl std::fmt::Display for TransportError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "TransportError") }
}
impl std::error::Error for TransportError {}

/// RAII handle for a status-change subscription: dropping it unsubscribes.
///
/// A [`ClientSession`](crate::ClientSession) holds at most one of these at a time, which is what makes
/// invariant 4 ("holds exactly one iff `connection != None`") mechanically enforceable: binding a new
/// connection replaces the field, dropping the old guard.
pub struct StatusSubscription
{
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl StatusSubscription
{
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self
    {
        Self{ unsubscribe: Some(Box::new(unsubscribe)) }
    }
}

impl Drop for StatusSubscription
{
    fn drop(&mut self)
    {
        if let Some(unsubscribe) = self.unsubscribe.take() { unsubscribe(); }
    }
}

impl Debug for StatusSubscription
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "StatusSubscription") }
}

/// The duplex, XML-framed transport a [`ClientSession`](crate::ClientSession) is bound to.
///
/// Out of scope per the specification; referenced here only by contract. `send` must not block and may
/// synchronously re-enter the session through a status-change callback (see the crate's concurrency notes).
pub trait Connection: Debug
{
    fn id(&self) -> ConnectionId;
    fn status(&self) -> ConnectionStatus;
    fn send(&self, xml: &XmlNode) -> Result<(), TransportError>;
    /// Registers a callback invoked whenever [`Connection::status`] changes. Dropping the returned
    /// [`StatusSubscription`] unregisters it.
    fn subscribe_status_change(&self, callback: Box<dyn FnMut(ConnectionStatus)>) -> StatusSubscription;
}

/// The connection multiplexer that routes inbound frames between multiple co-hosted sessions.
///
/// Out of scope per the specification; referenced here only by contract.
pub trait ConnectionManager: Debug
{
    fn add_object(&self, conn: &dyn Connection, session_id: SessionId, identifier: &str);
    fn remove_object(&self, conn: &dyn Connection, session_id: SessionId);
    fn send(&self, conn: &dyn Connection, session_id: SessionId, xml: &XmlNode) -> Result<(), TransportError>;
}

/// The base session: owns the user roster, the document buffer, and synchronization progress.
///
/// Out of scope per the specification (the document buffer / operational-transformation core is an external
/// collaborator); referenced here only by contract. [`InMemorySessionBase`] is a reference implementation
/// sufficient to exercise and test the client-side subsystem this crate actually implements.
pub trait SessionBase: Debug
{
    fn status(&self) -> SessionStatus;
    fn set_status(&mut self, status: SessionStatus);
    fn sync_status(&self, connection: ConnectionId) -> SyncStatus;

    fn foreach_user_mut(&mut self, f: &mut dyn FnMut(&mut User));
    fn lookup_user_by_id(&self, id: UserId) -> Option<&User>;
    fn lookup_user_by_id_mut(&mut self, id: UserId) -> Option<&mut User>;
    /// Validates `props` and adds a new user to the roster, returning the newly added user.
    fn add_user(&mut self, props: PropertyBag) -> Result<&User, Error>;

    /// Reads the user-property children/attributes off an inbound `user-join`/`user-rejoin` frame.
    fn extract_user_props(&self, xml: &XmlNode) -> PropertyBag;
    /// Renders user-join parameters as attributes on an outbound frame.
    fn set_xml_user_props(&self, props: &PropertyBag, xml: XmlNode) -> XmlNode;
    /// Validates that `props` may legally be applied to `existing` (e.g. on rejoin).
    fn validate_user_props(&self, props: &PropertyBag, existing: &User) -> Result<(), Error>;

    fn connection_manager(&self) -> Arc<dyn ConnectionManager>;

    /// Gives the base session a chance to process an inbound frame after the client subsystem's own
    /// dispatch (document/operational-transformation handling; out of scope for this crate). No-op by
    /// default.
    fn on_inbound_xml(&mut self, _connection: ConnectionId, _xml: &XmlNode) {}

    /// Chained after [`ClientSession`](crate::ClientSession)'s own `synchronization_complete` handling;
    /// a real base session would transition its own status (e.g. Synchronizing -> Running) here.
    fn on_synchronization_complete(&mut self, _connection: ConnectionId) {}

    /// Chained after [`ClientSession`](crate::ClientSession)'s own `synchronization_failed` handling.
    fn on_synchronization_failed(&mut self, _connection: ConnectionId, _error: &Error) {}
}

//-------------------------------------------------------------------------------------------------------------------

/// Reference [`SessionBase`] implementation backed by an in-memory roster.
///
/// Property validation is permissive: it rejects only attempts to change a user's `id` (which is
/// construct-only, matching `original_source`'s treatment of the `id` GObject property).
#[derive(Debug)]
pub struct InMemorySessionBase
{
    status: SessionStatus,
    sync_status: SyncStatus,
    next_user_id: UserId,
    users: BTreeMap<UserId, User>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl InMemorySessionBase
{
    pub fn new(connection_manager: Arc<dyn ConnectionManager>) -> Self
    {
        Self{
            status: SessionStatus::Running,
            sync_status: SyncStatus::None,
            next_user_id: 1,
            users: BTreeMap::default(),
            connection_manager,
        }
    }

    /// Sets the synchronization status reported for every connection (sufficient for a single-connection
    /// test double; a real implementation would track this per connection).
    pub fn set_sync_status(&mut self, status: SyncStatus)
    {
        self.sync_status = status;
    }

    /// Directly inserts a user into the roster, bypassing validation (for test setup).
    pub fn insert_user(&mut self, user: User) -> UserId
    {
        let id = user.id();
        if id >= self.next_user_id { self.next_user_id = id + 1; }
        self.users.insert(id, user);
        id
    }
}

impl SessionBase for InMemorySessionBase
{
    fn status(&self) -> SessionStatus { self.status }
    fn set_status(&mut self, status: SessionStatus) { self.status = status; }
    fn sync_status(&self, _connection: ConnectionId) -> SyncStatus { self.sync_status }

    fn foreach_user_mut(&mut self, f: &mut dyn FnMut(&mut User))
    {
        for user in self.users.values_mut() { f(user); }
    }

    fn lookup_user_by_id(&self, id: UserId) -> Option<&User> { self.users.get(&id) }
    fn lookup_user_by_id_mut(&mut self, id: UserId) -> Option<&mut User> { self.users.get_mut(&id) }

    fn add_user(&mut self, mut props: PropertyBag) -> Result<&User, Error>
    {
        // the server assigns user ids; honor one already present in `props` (the normal case, read off an
        // inbound `user-join` reply) rather than allocating a competing local id.
        let id = match props.get("id")
        {
            Some(PropertyValue::UInt(id)) => *id,
            _ =>
            {
                let id = self.next_user_id;
                props.insert("id".to_string(), PropertyValue::UInt(id));
                id
            }
        };
        if id >= self.next_user_id { self.next_user_id = id + 1; }
        props.entry("status".to_string()).or_insert(PropertyValue::Status(UserStatus::Available));

        let user = User::new(id, props);
        self.users.insert(id, user);
        Ok(self.users.get(&id).expect("just inserted"))
    }

    fn extract_user_props(&self, xml: &XmlNode) -> PropertyBag
    {
        let mut props = PropertyBag::default();
        for (key, value) in &xml.attrs
        {
            match key.as_str()
            {
                "seq" => continue,
                "id" =>
                {
                    if let Ok(id) = value.parse::<u32>() { props.insert(key.clone(), PropertyValue::UInt(id)); }
                }
                "status" =>
                {
                    let status = match value.as_str()
                    {
                        "available"   => UserStatus::Available,
                        "unavailable" => UserStatus::Unavailable,
                        _             => continue,
                    };
                    props.insert(key.clone(), PropertyValue::Status(status));
                }
                "hue" =>
                {
                    if let Ok(hue) = value.parse::<f64>() { props.insert(key.clone(), PropertyValue::Float(hue)); }
                }
                "acl-identity" => { props.insert(key.clone(), PropertyValue::Acl(value.clone())); }
                _ => { props.insert(key.clone(), PropertyValue::Str(value.clone())); }
            }
        }
        props
    }

    fn set_xml_user_props(&self, props: &PropertyBag, mut xml: XmlNode) -> XmlNode
    {
        for (key, value) in props
        {
            let rendered = match value
            {
                PropertyValue::Str(s)    => s.clone(),
                PropertyValue::UInt(n)   => n.to_string(),
                PropertyValue::Float(n)  => n.to_string(),
                PropertyValue::Acl(s)    => s.clone(),
                PropertyValue::Status(UserStatus::Available)   => "available".to_string(),
                PropertyValue::Status(UserStatus::Unavailable)  => "unavailable".to_string(),
                PropertyValue::Flags(UserFlags::Local) => "local".to_string(),
                PropertyValue::Flags(UserFlags::None)  => "none".to_string(),
            };
            xml = xml.with_attr(key.clone(), rendered);
        }
        xml
    }

    fn validate_user_props(&self, props: &PropertyBag, existing: &User) -> Result<(), Error>
    {
        if let Some(PropertyValue::UInt(id)) = props.get("id")
        {
            if *id != existing.id() { return Err(UserJoinError::NoSuchUser.into()); }
        }
        Ok(())
    }

    fn connection_manager(&self) -> Arc<dyn ConnectionManager> { self.connection_manager.clone() }
}

//-------------------------------------------------------------------------------------------------------------------

/// Reference [`Connection`] implementation for tests: records every frame sent and allows the test to
/// drive status-change notifications deterministically.
#[derive(Debug, Clone)]
pub struct InMemoryConnection
{
    inner: Arc<Mutex<InMemoryConnectionInner>>,
}

#[derive(Debug)]
struct InMemoryConnectionInner
{
    id: ConnectionId,
    status: ConnectionStatus,
    sent: Vec<XmlNode>,
    next_listener_id: u64,
    listeners: Vec<(u64, Box<dyn FnMut(ConnectionStatus)>)>,
    /// ids unsubscribed while their listener was out of `listeners` being called (see [`InMemoryConnection::set_status`]).
    removed_while_calling: std::collections::HashSet<u64>,
}

impl InMemoryConnection
{
    pub fn new(id: ConnectionId) -> Self
    {
        Self{
            inner: Arc::new(Mutex::new(InMemoryConnectionInner{
                id,
                status: ConnectionStatus::Open,
                sent: Vec::default(),
                next_listener_id: 0,
                listeners: Vec::default(),
                removed_while_calling: std::collections::HashSet::default(),
            }))
        }
    }

    /// Returns every frame sent on this connection so far, in send order.
    pub fn sent_frames(&self) -> Vec<XmlNode>
    {
        self.inner.lock().expect("lock poisoned").sent.clone()
    }

    /// Changes this connection's status and notifies subscribers.
    ///
    /// Each listener is invoked without the connection's `Mutex` held: a listener may synchronously
    /// reenter this connection (e.g. to unsubscribe itself via [`StatusSubscription::drop`], which locks
    /// the same mutex), and a non-reentrant `std::sync::Mutex` held across that call would deadlock. Each
    /// listener is instead removed from the index, called, then reinserted, unless it unsubscribed itself
    /// (or was unsubscribed reentrantly) while it was out.
    pub fn set_status(&self, status: ConnectionStatus)
    {
        let ids: Vec<u64> =
        {
            let mut inner = self.inner.lock().expect("lock poisoned");
            inner.status = status;
            inner.listeners.iter().map(|(id, _)| *id).collect()
        };

        for id in ids
        {
            let taken =
            {
                let mut inner = self.inner.lock().expect("lock poisoned");
                let pos = inner.listeners.iter().position(|(listener_id, _)| *listener_id == id);
                pos.map(|pos| inner.listeners.remove(pos))
            };

            let Some((id, mut listener)) = taken else { continue };
            listener(status);

            let mut inner = self.inner.lock().expect("lock poisoned");
            if inner.removed_while_calling.remove(&id)
            {
                // unsubscribed (by itself or reentrantly) while it was out being called; drop it for good.
            }
            else
            {
                inner.listeners.push((id, listener));
            }
        }
    }
}

impl Connection for InMemoryConnection
{
    fn id(&self) -> ConnectionId { self.inner.lock().expect("lock poisoned").id }
    fn status(&self) -> ConnectionStatus { self.inner.lock().expect("lock poisoned").status }

    fn send(&self, xml: &XmlNode) -> Result<(), TransportError>
    {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.status != ConnectionStatus::Open { return Err(TransportError); }
        inner.sent.push(xml.clone());
        Ok(())
    }

    fn subscribe_status_change(&self, callback: Box<dyn FnMut(ConnectionStatus)>) -> StatusSubscription
    {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, callback));

        let weak_inner = self.inner.clone();
        StatusSubscription::new(move ||
        {
            let mut inner = weak_inner.lock().expect("lock poisoned");
            match inner.listeners.iter().position(|(listener_id, _)| *listener_id == id)
            {
                Some(pos) => { inner.listeners.remove(pos); }
                // not currently in `listeners`: it's out being called by `set_status`, which will drop it
                // instead of reinserting it once it sees this id here.
                None => { inner.removed_while_calling.insert(id); }
            }
        })
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Reference [`ConnectionManager`] implementation for tests: records routing table mutations.
#[derive(Debug, Default)]
pub struct InMemoryConnectionManager
{
    routes: Mutex<Vec<(ConnectionId, SessionId, String)>>,
}

impl InMemoryConnectionManager
{
    pub fn new() -> Self { Self::default() }

    /// Returns `true` iff a route is currently registered for `(connection, session)`.
    pub fn has_route(&self, connection: ConnectionId, session: SessionId) -> bool
    {
        self.routes.lock().expect("lock poisoned").iter().any(|(c, s, _)| *c == connection && *s == session)
    }
}

impl ConnectionManager for InMemoryConnectionManager
{
    fn add_object(&self, conn: &dyn Connection, session_id: SessionId, identifier: &str)
    {
        self.routes.lock().expect("lock poisoned").push((conn.id(), session_id, identifier.to_string()));
    }

    fn remove_object(&self, conn: &dyn Connection, session_id: SessionId)
    {
        self.routes.lock().expect("lock poisoned").retain(|(c, s, _)| !(*c == conn.id() && *s == session_id));
    }

    fn send(&self, conn: &dyn Connection, _session_id: SessionId, xml: &XmlNode) -> Result<(), TransportError>
    {
        conn.send(xml)
    }
}

//-------------------------------------------------------------------------------------------------------------------

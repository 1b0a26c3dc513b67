//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

//-------------------------------------------------------------------------------------------------------------------

pub(crate) mod handlers;

//-------------------------------------------------------------------------------------------------------------------

struct ClientSessionCore
{
    session_id: SessionId,
    base: Box<dyn SessionBase>,
    connection: Option<Arc<dyn Connection>>,
    status_subscription: Option<StatusSubscription>,
    request_manager: RequestManager,
    message_table: Arc<MessageTable>,
    error_translator: Box<dyn TranslateError>,
    connection_changed_observers: Vec<Box<dyn FnMut(Option<Arc<dyn Connection>>)>>,
}

impl Debug for ClientSessionCore
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("ClientSessionCore")
            .field("session_id", &self.session_id)
            .field("base", &self.base)
            .field("connection", &self.connection)
            .field("request_manager", &self.request_manager)
            .finish()
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// The client-side session subsystem (C5): a connection binding, a [`RequestManager`], and a
/// [`MessageTable`] reference over a caller-supplied [`SessionBase`].
///
/// A `ClientSession` is a cheap, `Clone`-able handle (`Rc<RefCell<..>>`) rather than a single owned value,
/// because the status-change callback installed on a bound [`Connection`] must be able to synchronously
/// reenter and mutate the owning session (see the crate's concurrency notes: suspension points may
/// reenter through observer callbacks). This is the same single-threaded, signal-handler-style ownership
/// pattern used by GObject-derived APIs, translated into safe Rust via `Rc`/`Weak` rather than raw
/// self-pointers.
#[derive(Clone)]
pub struct ClientSession
{
    inner: Rc<RefCell<ClientSessionCore>>,
}

impl Debug for ClientSession
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_tuple("ClientSession").field(&self.inner.borrow()).finish()
    }
}

impl ClientSession
{
    /// Makes a new session over `base`, with the default message table and error translator.
    pub fn new(session_id: SessionId, base: Box<dyn SessionBase>) -> Self
    {
        Self::with_table(session_id, base, Arc::new(MessageTable::with_defaults()))
    }

    /// As [`ClientSession::new`], but with a caller-supplied message table (e.g. one with additional
    /// handlers registered, matching the subclass-extensible table in `original_source`).
    pub fn with_table(session_id: SessionId, base: Box<dyn SessionBase>, message_table: Arc<MessageTable>) -> Self
    {
        Self{
            inner: Rc::new(RefCell::new(ClientSessionCore{
                session_id,
                base,
                connection: None,
                status_subscription: None,
                request_manager: RequestManager::new(),
                message_table,
                error_translator: Box::new(DefaultErrorTranslator),
                connection_changed_observers: Vec::default(),
            })),
        }
    }

    /// Replaces this session's error translator (C6). Extends rather than replaces the default domains
    /// unless the caller's translator chooses not to delegate.
    pub fn set_error_translator(&self, translator: Box<dyn TranslateError>)
    {
        self.inner.borrow_mut().error_translator = translator;
    }

    pub fn session_id(&self) -> SessionId { self.inner.borrow().session_id }
    pub fn status(&self) -> SessionStatus { self.inner.borrow().base.status() }

    /// The currently bound connection, if any.
    pub fn connection(&self) -> Option<Arc<dyn Connection>>
    {
        self.inner.borrow().connection.clone()
    }

    /// Registers a callback invoked whenever the bound connection changes. There is no corresponding
    /// unsubscribe handle: observers are expected to live as long as the session they're watching, matching
    /// the property-notify surface this stands in for (spec §9, "Object-system properties -> plain accessors").
    pub fn on_connection_changed(&self, callback: impl FnMut(Option<Arc<dyn Connection>>) + 'static)
    {
        self.inner.borrow_mut().connection_changed_observers.push(Box::new(callback));
    }

    /// Invokes every `on_connection_changed` observer with the current connection.
    ///
    /// The observer list is taken out of the `RefCell` for the duration of the calls (any observer
    /// registered reentrantly during this notification is appended back afterwards) so an observer that
    /// reenters the session, e.g. to read `session.connection()`, does not panic against an outstanding
    /// borrow of `ClientSessionCore`.
    fn notify_connection_changed(&self)
    {
        let current = self.connection();
        let mut observers = std::mem::take(&mut self.inner.borrow_mut().connection_changed_observers);
        for observer in observers.iter_mut() { observer(current.clone()); }

        let mut core = self.inner.borrow_mut();
        if core.connection_changed_observers.is_empty()
        {
            core.connection_changed_observers = observers;
        }
        else
        {
            observers.append(&mut core.connection_changed_observers);
            core.connection_changed_observers = observers;
        }
    }

    /// Sends `xml` on the currently bound connection via the connection manager. No-op (with a logged
    /// warning) if no connection is bound or the send fails.
    fn send_on_current_connection(&self, xml: &XmlNode)
    {
        let (conn, manager, session_id) =
        {
            let core = self.inner.borrow();
            match &core.connection
            {
                Some(conn) => (conn.clone(), core.base.connection_manager(), core.session_id),
                None =>
                {
                    tracing::warn!(verb = %xml.name, "tried to send a frame with no connection bound");
                    return;
                }
            }
        };

        if manager.send(conn.as_ref(), session_id, xml).is_err()
        {
            tracing::warn!(verb = %xml.name, "failed to send frame on the bound connection");
        }
    }

    //-----------------------------------------------------------------------------------------------------
    // C5 public operations

    /// Binds (or unbinds) this session's subscription connection (§4.5).
    ///
    /// If a connection is already bound, a `session-unsubscribe` frame is sent on it and it is released
    /// (§4.5.1) before `connection` is bound. Connection-changed notifications are batched across the
    /// release+rebind pair: observers see exactly one notification, carrying the final value.
    pub fn set_connection(&self, connection: Option<Arc<dyn Connection>>, identifier: Option<&str>)
    {
        let had_connection = self.inner.borrow().connection.is_some();

        if had_connection
        {
            self.send_on_current_connection(&XmlNode::new("session-unsubscribe"));
            self.release_connection_impl(false);
        }

        if let Some(new_connection) = connection
        {
            let identifier = identifier.unwrap_or("");
            {
                let core = self.inner.borrow();
                core.base.connection_manager().add_object(new_connection.as_ref(), core.session_id, identifier);
            }

            // install the status-change subscription; the callback captures only a weak reference so a
            // connection outliving its session cannot keep the session's state alive, and so the callback
            // can tolerate firing after the session itself has been dropped.
            let weak: Weak<RefCell<ClientSessionCore>> = Rc::downgrade(&self.inner);
            let subscription = new_connection.subscribe_status_change(Box::new(move |status|
            {
                if let Some(inner) = weak.upgrade() { ClientSession{ inner }.on_connection_status_changed(status); }
            }));

            let mut core = self.inner.borrow_mut();
            core.connection = Some(new_connection);
            core.status_subscription = Some(subscription);
        }

        self.notify_connection_changed();
    }

    fn on_connection_status_changed(&self, status: ConnectionStatus)
    {
        match status
        {
            ConnectionStatus::Open => {}
            ConnectionStatus::Closing | ConnectionStatus::Closed =>
            {
                tracing::info!(?status, "bound connection's status changed; releasing");
                self.release_connection_impl(true);
            }
        }
    }

    /// Connection release procedure (§4.5.1). `notify` controls whether the connection-changed observers
    /// fire at the end of this call; [`ClientSession::set_connection`] suppresses it so the release+rebind
    /// pair is visible as a single notification.
    fn release_connection_impl(&self, notify: bool)
    {
        // collect, then resolve outside the borrow: a resolution callback may reenter the session (e.g. to
        // inspect the roster), which would otherwise panic against the still-held `RefCell` borrow.
        let cancelled = { self.inner.borrow_mut().request_manager.take_all() };
        for request in cancelled { request.fail(RequestError::Cancelled.into()); }
        {
            let mut core = self.inner.borrow_mut();
            core.base.foreach_user_mut(&mut |user| user.set_status(UserStatus::Unavailable));
        }

        let (old_connection, old_subscription) =
        {
            let mut core = self.inner.borrow_mut();
            (core.connection.take(), core.status_subscription.take())
        };
        drop(old_subscription);

        if let Some(conn) = &old_connection
        {
            let (manager, session_id) =
            {
                let core = self.inner.borrow();
                (core.base.connection_manager(), core.session_id)
            };
            manager.remove_object(conn.as_ref(), session_id);
        }

        if notify { self.notify_connection_changed(); }
    }

    /// Allocates a [`UserRequest`] for `user-join`, renders and sends the corresponding frame.
    ///
    /// Precondition: `status() == Running` and a connection is bound. Violation is a programmer error:
    /// logs and returns `None` rather than panicking.
    pub fn join_user(&self, properties: PropertyBag) -> Option<UserRequest>
    {
        if !self.check_can_request("join_user") { return None; }

        let request = self.inner.borrow_mut().request_manager.add("user-join");
        let xml =
        {
            let core = self.inner.borrow();
            core.base.set_xml_user_props(&properties, XmlNode::new("user-join").with_seq(request.seq()))
        };
        self.send_on_current_connection(&xml);
        Some(request)
    }

    /// Allocates a [`UserRequest`] for `user-leave`, renders and sends the corresponding frame.
    ///
    /// Precondition: as [`ClientSession::join_user`].
    pub fn leave_user(&self, user_id: UserId) -> Option<UserRequest>
    {
        if !self.check_can_request("leave_user") { return None; }

        let request = self.inner.borrow_mut().request_manager.add("user-leave");
        let xml = XmlNode::new("user-leave").with_seq(request.seq()).with_attr("id", user_id.to_string());
        self.send_on_current_connection(&xml);
        Some(request)
    }

    fn check_can_request(&self, op: &str) -> bool
    {
        let (status, has_connection) =
        {
            let core = self.inner.borrow();
            (core.base.status(), core.connection.is_some())
        };

        if status != SessionStatus::Running || !has_connection
        {
            tracing::error!(?status, has_connection, "{op} called while not Running or no connection bound");
            return false;
        }
        true
    }

    /// Inbound dispatch (§4.5 core algorithm).
    pub fn process_xml(&self, conn: &dyn Connection, xml: &XmlNode)
    {
        let sync_status = { self.inner.borrow().base.sync_status(conn.id()) };

        let result = if sync_status != SyncStatus::None
        {
            Err(RequestError::Synchronizing.into())
        }
        else
        {
            let handler = { self.inner.borrow().message_table.lookup(&xml.name) };
            match handler
            {
                Some(handler) => handler(self, conn, xml),
                None => Err(RequestError::UnexpectedMessage.into()),
            }
        };

        if let Err(error) = result
        {
            self.fail_dispatch(xml, error);
        }

        // chain to the base session's own inbound processor (document/OT handling; out of scope here)
        self.inner.borrow_mut().base.on_inbound_xml(conn.id(), xml);
    }

    /// §4.5 step 4: logs the offending frame, then either fails the seq-matched request (if any) or
    /// leaves the error purely observational.
    fn fail_dispatch(&self, xml: &XmlNode, error: Error)
    {
        tracing::warn!(frame = %xml.to_xml_string(), %error, "failed to process inbound frame");

        let matched = { self.inner.borrow().request_manager.get_by_xml(None, xml) };
        if let Ok(Some(request)) = matched
        {
            self.request_manager_fail(&request, RequestError::ReplyUnprocessed(Box::new(error)).into());
        }
    }

    /// Translates a server-reported `(domain, code)` pair via the session's current [`TranslateError`].
    pub(crate) fn translate_error(&self, domain: &str, code: u32) -> Error
    {
        self.inner.borrow().error_translator.translate(domain, code)
    }

    /// Resolves `request` as a failure and unregisters it. The resolution callback is invoked after the
    /// session's own `RefCell` borrow is dropped, so it may safely reenter the session (e.g. to look up a
    /// user) without panicking against an outstanding borrow.
    pub(crate) fn request_manager_fail(&self, request: &UserRequest, error: Error)
    {
        let held = { self.inner.borrow_mut().request_manager.take(request) };
        if !held
        {
            panic!("RequestManager::fail called on a request that is not (or no longer) held (seq={})", request.seq());
        }
        request.fail(error);
    }

    /// Unregisters an already-resolved request from the pending index (§4.5.4's user-join/rejoin/leave
    /// handlers resolve the request themselves via [`UserRequest::finish`], then call this instead of
    /// [`ClientSession::request_manager_fail`]).
    pub(crate) fn request_manager_remove(&self, request: &UserRequest)
    {
        self.inner.borrow_mut().request_manager.remove(request);
    }

    pub(crate) fn get_by_xml(&self, expected_verb: Option<&str>, xml: &XmlNode) -> Result<Option<UserRequest>, Error>
    {
        self.inner.borrow().request_manager.get_by_xml(expected_verb, xml)
    }

    pub(crate) fn get_by_xml_required(&self, expected_verb: Option<&str>, xml: &XmlNode) -> Result<UserRequest, Error>
    {
        self.inner.borrow().request_manager.get_by_xml_required(expected_verb, xml)
    }

    /// `session-close` handling (§4.5.4): releases the connection (§4.5.1) without closing the base session,
    /// so the session object remains reusable.
    pub(crate) fn release_connection_after_session_close(&self)
    {
        self.release_connection_impl(true);
    }

    pub(crate) fn base_extract_user_props(&self, xml: &XmlNode) -> PropertyBag
    {
        self.inner.borrow().base.extract_user_props(xml)
    }

    pub(crate) fn base_add_user(&self, props: PropertyBag) -> Result<User, Error>
    {
        self.inner.borrow_mut().base.add_user(props).map(User::clone)
    }

    /// Looks up a user in the roster by id. A plain accessor onto the base session's roster, in place of
    /// the property/notify surface the original exposes this through (spec §9).
    pub fn lookup_user(&self, id: UserId) -> Option<User>
    {
        self.inner.borrow().base.lookup_user_by_id(id).cloned()
    }

    pub(crate) fn base_validate_user_props(&self, props: &PropertyBag, existing: &User) -> Result<(), Error>
    {
        self.inner.borrow().base.validate_user_props(props, existing)
    }

    pub(crate) fn base_apply_user_props(&self, id: UserId, props: &PropertyBag) -> Option<User>
    {
        let mut core = self.inner.borrow_mut();
        let user = core.base.lookup_user_by_id_mut(id)?;
        user.apply_properties(props);
        Some(user.clone())
    }

    pub(crate) fn base_set_user_unavailable(&self, id: UserId) -> Option<User>
    {
        let mut core = self.inner.borrow_mut();
        let user = core.base.lookup_user_by_id_mut(id)?;
        user.set_status(UserStatus::Unavailable);
        Some(user.clone())
    }

    /// Close procedure (§4.5.2), overriding the base session's close.
    pub fn close(&self)
    {
        let connection_bound = self.inner.borrow().connection.is_some();

        if connection_bound
        {
            let sync_status =
            {
                let core = self.inner.borrow();
                let conn_id = core.connection.as_ref().expect("checked above").id();
                core.base.sync_status(conn_id)
            };

            if matches!(sync_status, SyncStatus::None | SyncStatus::AwaitingAck)
            {
                self.send_on_current_connection(&XmlNode::new("session-unsubscribe"));
            }

            self.release_connection_impl(true);
        }

        self.inner.borrow_mut().base.set_status(SessionStatus::Closed);
    }

    /// Synchronization-complete hook (§4.5.3).
    pub fn synchronization_complete(&self, conn: &dyn Connection)
    {
        let (status, bound_id) =
        {
            let core = self.inner.borrow();
            (core.base.status(), core.connection.as_ref().map(|c| c.id()))
        };

        if status == SessionStatus::Synchronizing
        {
            if let Some(bound_id) = bound_id
            {
                assert_eq!(
                    bound_id, conn.id(),
                    "synchronization_complete fired on a connection other than the one this session is bound to",
                );
            }
        }

        self.inner.borrow_mut().base.on_synchronization_complete(conn.id());
    }

    /// Synchronization-failed hook (§4.5.3).
    pub fn synchronization_failed(&self, conn: &dyn Connection, error: Error)
    {
        let status = self.inner.borrow().base.status();

        match status
        {
            SessionStatus::Synchronizing =>
            {
                // the base session will close as a result of the failed synchronization; cleanup happens
                // there, not here.
            }
            SessionStatus::Running =>
            {
                // no explicit session-unsubscribe: the peer already knows the synchronization failed.
                self.release_connection_impl(true);
            }
            SessionStatus::Closed =>
            {
                tracing::error!("synchronization_failed called on a closed session");
            }
        }

        self.inner.borrow_mut().base.on_synchronization_failed(conn.id(), &error);
    }
}

//-------------------------------------------------------------------------------------------------------------------

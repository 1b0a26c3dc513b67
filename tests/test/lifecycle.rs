//local shortcuts
use super::common;
use infc_session::*;

//third-party shortcuts

//standard shortcuts
use std::sync::{Arc, Mutex};

//-------------------------------------------------------------------------------------------------------------------
//-------------------------------------------------------------------------------------------------------------------

/// A [`SessionBase`] wrapping [`InMemorySessionBase`] that records every call to the synchronization
/// chaining hooks, so tests can assert `ClientSession` actually calls through to the base session rather
/// than swallowing the event.
#[derive(Debug)]
struct RecordingBase
{
    inner: InMemorySessionBase,
    sync_complete_calls: Arc<Mutex<Vec<ConnectionId>>>,
    sync_failed_calls: Arc<Mutex<Vec<ConnectionId>>>,
}

impl SessionBase for RecordingBase
{
    fn status(&self) -> SessionStatus { self.inner.status() }
    fn set_status(&mut self, status: SessionStatus) { self.inner.set_status(status) }
    fn sync_status(&self, connection: ConnectionId) -> SyncStatus { self.inner.sync_status(connection) }

    fn foreach_user_mut(&mut self, f: &mut dyn FnMut(&mut User)) { self.inner.foreach_user_mut(f) }
    fn lookup_user_by_id(&self, id: UserId) -> Option<&User> { self.inner.lookup_user_by_id(id) }
    fn lookup_user_by_id_mut(&mut self, id: UserId) -> Option<&mut User> { self.inner.lookup_user_by_id_mut(id) }
    fn add_user(&mut self, props: PropertyBag) -> Result<&User, Error> { self.inner.add_user(props) }

    fn extract_user_props(&self, xml: &XmlNode) -> PropertyBag { self.inner.extract_user_props(xml) }
    fn set_xml_user_props(&self, props: &PropertyBag, xml: XmlNode) -> XmlNode { self.inner.set_xml_user_props(props, xml) }
    fn validate_user_props(&self, props: &PropertyBag, existing: &User) -> Result<(), Error>
    {
        self.inner.validate_user_props(props, existing)
    }

    fn connection_manager(&self) -> Arc<dyn ConnectionManager> { self.inner.connection_manager() }

    fn on_synchronization_complete(&mut self, connection: ConnectionId)
    {
        self.sync_complete_calls.lock().unwrap().push(connection);
    }

    fn on_synchronization_failed(&mut self, connection: ConnectionId, _error: &Error)
    {
        self.sync_failed_calls.lock().unwrap().push(connection);
    }
}

fn recording_session(status: SessionStatus) -> (ClientSession, Arc<Mutex<Vec<ConnectionId>>>, Arc<Mutex<Vec<ConnectionId>>>)
{
    let manager = Arc::new(InMemoryConnectionManager::new());
    let mut inner = InMemorySessionBase::new(manager);
    inner.set_status(status);

    let sync_complete_calls = Arc::new(Mutex::new(Vec::new()));
    let sync_failed_calls = Arc::new(Mutex::new(Vec::new()));
    let base = RecordingBase{ inner, sync_complete_calls: sync_complete_calls.clone(), sync_failed_calls: sync_failed_calls.clone() };
    (ClientSession::new(1u128, Box::new(base)), sync_complete_calls, sync_failed_calls)
}

//-------------------------------------------------------------------------------------------------------------------

#[test]
fn synchronization_complete_chains_to_the_base_session()
{
    let (session, sync_complete_calls, _) = recording_session(SessionStatus::Synchronizing);
    let conn = InMemoryConnection::new(1);
    session.set_connection(Some(Arc::new(conn.clone())), Some("doc"));

    session.synchronization_complete(&conn);

    assert_eq!(sync_complete_calls.lock().unwrap().as_slice(), &[1]);
}

//-------------------------------------------------------------------------------------------------------------------

#[test]
fn synchronization_failed_while_running_releases_the_connection_and_chains_to_the_base_session()
{
    let (session, _, sync_failed_calls) = recording_session(SessionStatus::Running);
    let conn = InMemoryConnection::new(1);
    session.set_connection(Some(Arc::new(conn.clone())), Some("doc"));

    session.synchronization_failed(&conn, RequestError::Cancelled.into());

    assert!(session.connection().is_none());
    assert_eq!(sync_failed_calls.lock().unwrap().as_slice(), &[1]);
}

//-------------------------------------------------------------------------------------------------------------------

/// `session-close` releases the connection but leaves the base session's own status untouched, so the
/// session object can be rebound and reused (unlike [`ClientSession::close`]).
#[test]
fn session_close_message_releases_connection_without_closing_the_session()
{
    let (session, _manager) = common::new_session();
    let conn = common::bind(&session, 1);

    session.process_xml(&conn, &XmlNode::new("session-close"));

    assert!(session.connection().is_none());
    assert_eq!(session.status(), SessionStatus::Running);

    // still usable afterwards
    let conn2 = common::bind(&session, 2);
    assert_eq!(session.connection().map(|c| c.id()), Some(conn2.id()));
}

//-------------------------------------------------------------------------------------------------------------------

#[test]
fn close_sends_unsubscribe_when_no_synchronization_is_in_progress()
{
    let (session, _manager) = common::new_session();
    let conn = common::bind(&session, 1);

    session.close();

    assert_eq!(conn.sent_frames().last().map(|f| f.name.as_str()), Some("session-unsubscribe"));
    assert!(session.connection().is_none());
    assert_eq!(session.status(), SessionStatus::Closed);
}

//-------------------------------------------------------------------------------------------------------------------

#[test]
fn close_skips_unsubscribe_while_a_synchronization_is_in_progress()
{
    let manager = Arc::new(InMemoryConnectionManager::new());
    let mut base = InMemorySessionBase::new(manager);
    base.set_sync_status(SyncStatus::InProgress);
    let session = ClientSession::new(1u128, Box::new(base));
    let conn = InMemoryConnection::new(1);
    session.set_connection(Some(Arc::new(conn.clone())), Some("doc"));

    session.close();

    assert!(conn.sent_frames().iter().all(|f| f.name != "session-unsubscribe"));
    assert!(session.connection().is_none());
    assert_eq!(session.status(), SessionStatus::Closed);
}

//-------------------------------------------------------------------------------------------------------------------

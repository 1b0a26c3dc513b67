//local shortcuts
use super::common;
use infc_session::*;

//third-party shortcuts

//standard shortcuts
use std::sync::{Arc, Mutex};

//-------------------------------------------------------------------------------------------------------------------
//-------------------------------------------------------------------------------------------------------------------

/// S5: a regular message arriving while a synchronization is still in progress on the same connection is
/// rejected outright, and if it carried a `seq` matching a pending request, that request fails with the
/// wrapped error rather than being left to hang.
#[test]
fn regular_message_during_synchronization_fails_the_matched_request_and_is_not_dispatched()
{
    let manager = Arc::new(InMemoryConnectionManager::new());
    let mut base = InMemorySessionBase::new(manager.clone());
    base.set_sync_status(SyncStatus::InProgress);
    let session = ClientSession::new(1u128, Box::new(base));
    let conn_handle = InMemoryConnection::new(1);
    session.set_connection(Some(Arc::new(conn_handle.clone())), Some("doc"));

    let request = session.join_user(common::props(&[("name", "alice")])).expect("Running with a bound connection");

    let outcome = Arc::new(Mutex::new(None));
    {
        let outcome = outcome.clone();
        request.on_finished(move |user, error| *outcome.lock().unwrap() = Some((user, error)));
    }

    let reply = XmlNode::new("user-join")
        .with_seq(1)
        .with_attr("id", "7")
        .with_attr("name", "alice")
        .with_attr("status", "available");
    session.process_xml(&conn_handle, &reply);

    let (user, error) = outcome.lock().unwrap().take().expect("seq-matched request fails synchronously");
    assert!(user.is_none());
    match error.expect("an error")
    {
        Error::Request(RequestError::ReplyUnprocessed(inner)) =>
        {
            assert!(matches!(*inner, Error::Request(RequestError::Synchronizing)));
        }
        other => panic!("expected ReplyUnprocessed(Synchronizing), got {other:?}"),
    }

    // the handler never ran: no user was added to the roster
    assert!(session.lookup_user(7).is_none());
}

//-------------------------------------------------------------------------------------------------------------------

/// A regular message during synchronization with no `seq` is simply dropped (logged, not dispatched);
/// there is nothing to fail.
#[test]
fn regular_message_during_synchronization_with_no_seq_is_only_logged()
{
    let manager = Arc::new(InMemoryConnectionManager::new());
    let mut base = InMemorySessionBase::new(manager.clone());
    base.set_sync_status(SyncStatus::InProgress);
    let session = ClientSession::new(1u128, Box::new(base));
    let conn_handle = InMemoryConnection::new(1);
    session.set_connection(Some(Arc::new(conn_handle.clone())), Some("doc"));

    let frame = XmlNode::new("user-leave").with_attr("id", "7");
    session.process_xml(&conn_handle, &frame);

    assert!(session.lookup_user(7).is_none());
}

//-------------------------------------------------------------------------------------------------------------------

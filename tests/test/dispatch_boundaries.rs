//local shortcuts
use super::common;
use infc_session::*;

//third-party shortcuts

//standard shortcuts
use std::sync::{Arc, Mutex};

//-------------------------------------------------------------------------------------------------------------------
//-------------------------------------------------------------------------------------------------------------------

/// A `seq` that matches a pending request whose verb disagrees with the inbound frame resolves that
/// request with `SeqVerbMismatch` (wrapped in `ReplyUnprocessed`, per the generic dispatch-failure path),
/// rather than being silently accepted or left hanging.
#[test]
fn seq_matching_a_request_of_a_different_verb_fails_with_reply_unprocessed()
{
    let (session, _manager) = common::new_session();
    let conn = common::bind(&session, 1);

    let leave_request = session.leave_user(7).expect("Running with a bound connection");

    let outcome = Arc::new(Mutex::new(None));
    {
        let outcome = outcome.clone();
        leave_request.on_finished(move |user, error| *outcome.lock().unwrap() = Some((user, error)));
    }

    // same seq, but arrives as a user-join reply instead of the user-leave we actually sent
    let mismatched = XmlNode::new("user-join")
        .with_seq(leave_request.seq())
        .with_attr("id", "7")
        .with_attr("name", "alice")
        .with_attr("status", "available");
    session.process_xml(&conn, &mismatched);

    let (user, error) = outcome.lock().unwrap().take().expect("seq-matched request still resolves");
    assert!(user.is_none());
    match error.expect("an error")
    {
        Error::Request(RequestError::ReplyUnprocessed(inner)) =>
        {
            assert!(matches!(*inner, Error::Request(RequestError::SeqVerbMismatch)));
        }
        other => panic!("expected ReplyUnprocessed(SeqVerbMismatch), got {other:?}"),
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// `request-failed` referencing a `seq` with no matching pending request: the handler itself errors
/// (`NoSuchSeq`), and since the generic failure path also finds no seq match, the error is purely
/// observational (logged only, nothing resolved, no panic).
#[test]
fn request_failed_with_unknown_seq_is_only_logged()
{
    let (session, _manager) = common::new_session();
    let conn = common::bind(&session, 1);

    let frame = XmlNode::new("request-failed")
        .with_seq(999)
        .with_attr("domain", "inf-request-error")
        .with_attr("code", "0");

    // must not panic
    session.process_xml(&conn, &frame);

    assert_eq!(session.status(), SessionStatus::Running);
}

//-------------------------------------------------------------------------------------------------------------------

/// A resolution callback that reenters the session (here: looking up the roster while the connection is
/// being torn down) must not panic against the session's own interior-mutable state.
#[test]
fn resolution_callback_may_reenter_the_session()
{
    let mut props = common::props(&[("name", "alice")]);
    props.insert("status".to_string(), PropertyValue::Status(UserStatus::Available));
    let user7 = User::new(7, props);

    let (session, _manager) = common::new_session_with_users(vec![user7]);
    let conn = common::bind(&session, 1);

    let request = session.leave_user(7).expect("Running with a bound connection");

    let reentrant_lookup_status = Arc::new(Mutex::new(None));
    {
        let session = session.clone();
        let reentrant_lookup_status = reentrant_lookup_status.clone();
        request.on_finished(move |_user, _error|
        {
            // reenters the session from inside a cancellation callback triggered by connection loss
            *reentrant_lookup_status.lock().unwrap() = session.lookup_user(7).map(|u| u.status());
        });
    }

    conn.set_status(ConnectionStatus::Closed);

    // §4.5.1 clears pending requests (step 1) before marking the roster unavailable (step 2), so the
    // reentrant lookup above observes the user still `Available` at the moment the cancellation fires.
    assert_eq!(*reentrant_lookup_status.lock().unwrap(), Some(UserStatus::Available));
    assert_eq!(session.lookup_user(7).map(|u| u.status()), Some(UserStatus::Unavailable));
}

//-------------------------------------------------------------------------------------------------------------------

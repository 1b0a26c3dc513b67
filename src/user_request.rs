//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;
use std::sync::{Arc, Mutex};

//-------------------------------------------------------------------------------------------------------------------

type FinishedCallback = Box<dyn FnOnce(Option<User>, Option<Error>)>;

enum Outcome
{
    Pending(Option<FinishedCallback>),
    Resolved,
}

impl Debug for Outcome
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Outcome::Pending(cb) => write!(f, "Pending(has_callback: {})", cb.is_some()),
            Outcome::Resolved    => write!(f, "Resolved"),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A [`Request`] whose terminal outcome carries an optional user reference (C3): user join, rejoin (on the
/// server side only, but rejoin replies still correlate via `user-join`'s sibling `user-leave`), and leave.
///
/// Cloning a `UserRequest` shares the same pending outcome (all clones observe the same single
/// [`UserRequest::finish`] call), mirroring the teacher's `RequestSignal` clone semantics.
#[derive(Clone)]
pub struct UserRequest
{
    request: Request,
    outcome: Arc<Mutex<Outcome>>,
}

impl Debug for UserRequest
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("UserRequest").field("request", &self.request).finish()
    }
}

impl UserRequest
{
    pub(crate) fn new(name: impl Into<String>, seq: u32) -> Self
    {
        Self{ request: Request::new(name, seq), outcome: Arc::new(Mutex::new(Outcome::Pending(None))) }
    }

    pub fn name(&self) -> &str { self.request.name() }
    pub fn seq(&self) -> u32 { self.request.seq() }

    /// Registers the callback invoked exactly once when this request resolves.
    ///
    /// If the request has already resolved by the time this is called, nothing happens: `finish`/`fail`
    /// discard any callback registered after resolution, since the single terminal event has already been
    /// delivered (there is nothing left to deliver it to). Callers are expected to register their callback
    /// immediately after receiving the `UserRequest`, before yielding back to the event loop.
    pub fn on_finished(&self, callback: impl FnOnce(Option<User>, Option<Error>) + 'static)
    {
        let mut outcome = self.outcome.lock().expect("lock poisoned");
        if let Outcome::Pending(slot) = &mut *outcome
        {
            *slot = Some(Box::new(callback));
        }
    }

    /// Resolves this request, invoking the registered callback (if any) exactly once.
    ///
    /// Contract: exactly one of `user`/`error` must be non-`None`, except for the join-failure case where
    /// both the user is absent and the error is present (any failure can legally carry no user).
    ///
    /// # Panics
    /// Panics if this request has already resolved (programmer error — see [`RequestManager::fail`]).
    pub(crate) fn finish(&self, user: Option<User>, error: Option<Error>)
    {
        let callback = {
            let mut outcome = self.outcome.lock().expect("lock poisoned");
            match std::mem::replace(&mut *outcome, Outcome::Resolved)
            {
                Outcome::Pending(callback) => callback,
                Outcome::Resolved => panic!("UserRequest resolved twice (seq={})", self.seq()),
            }
        };

        if let Some(callback) = callback { callback(user, error); }
    }

    /// The default resolution path (C1's `fail`): resolves with no user and the given error.
    pub(crate) fn fail(&self, error: Error)
    {
        self.finish(None, Some(error));
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------

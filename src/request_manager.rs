//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;
use std::collections::HashMap;

//-------------------------------------------------------------------------------------------------------------------

/// Owns every [`UserRequest`] pending on one [`ClientSession`](crate::ClientSession) (C2).
///
/// Assigns strictly increasing sequence numbers and indexes live requests by `seq` for O(1) reply
/// correlation. A request is held here iff it has not yet resolved; [`RequestManager::fail`] and
/// [`RequestManager::remove`] are the only ways a request leaves the index, and both happen after the
/// request's terminal outcome has already been delivered (see invariant: "resolution happens before
/// removal from the index").
#[derive(Debug, Default)]
pub struct RequestManager
{
    next_seq: u32,
    pending: HashMap<u32, UserRequest>,
}

impl RequestManager
{
    pub fn new() -> Self
    {
        Self{ next_seq: 1, pending: HashMap::default() }
    }

    /// Allocates a fresh sequence number, constructs a [`UserRequest`] for `verb`, registers it, and
    /// returns it. The returned request's `seq` is unique among currently held requests.
    pub fn add(&mut self, verb: impl Into<String>) -> UserRequest
    {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let request = UserRequest::new(verb, seq);
        self.pending.insert(seq, request.clone());
        request
    }

    /// O(1) lookup by sequence number.
    pub fn get_by_seq(&self, seq: u32) -> Option<UserRequest>
    {
        self.pending.get(&seq).cloned()
    }

    /// Reads the `seq` attribute off `xml` and looks up the matching request.
    ///
    /// Returns `Ok(None)` if `seq` is absent. Returns `Err` if `seq` is present but malformed, or if
    /// `expected_verb` is given and does not match the matched request's name.
    pub fn get_by_xml(&self, expected_verb: Option<&str>, xml: &XmlNode) -> Result<Option<UserRequest>, Error>
    {
        let seq = match xml.attr_u32("seq")
        {
            Ok(None) => return Ok(None),
            Ok(Some(seq)) => seq,
            Err(()) => return Err(RequestError::NoSuchAttribute.into()),
        };

        match self.pending.get(&seq)
        {
            None => Err(RequestError::NoSuchSeq.into()),
            Some(request) =>
            {
                if let Some(expected) = expected_verb
                {
                    if request.name() != expected { return Err(RequestError::SeqVerbMismatch.into()); }
                }
                Ok(Some(request.clone()))
            }
        }
    }

    /// As [`RequestManager::get_by_xml`], but an absent `seq` is itself an error.
    pub fn get_by_xml_required(&self, expected_verb: Option<&str>, xml: &XmlNode) -> Result<UserRequest, Error>
    {
        match self.get_by_xml(expected_verb, xml)?
        {
            Some(request) => Ok(request),
            None => Err(RequestError::NoSuchAttribute.into()),
        }
    }

    /// Unregisters `request` without resolving it. Used by handlers that have already resolved the
    /// request themselves (e.g. via [`UserRequest::finish`]) and just need it removed from the index.
    pub fn remove(&mut self, request: &UserRequest)
    {
        self.pending.remove(&request.seq());
    }

    /// Unregisters `request` iff it is currently held, without resolving it. Unlike [`RequestManager::remove`],
    /// reports whether anything was actually removed; used to split "check held + remove" from "invoke the
    /// resolution callback" so callers can resolve outside of whatever lock/borrow guards the index itself
    /// (see [`RequestManager::fail`]'s doc comment on the reentrancy hazard this avoids).
    pub(crate) fn take(&mut self, request: &UserRequest) -> bool
    {
        self.pending.remove(&request.seq()).is_some()
    }

    /// Unregisters and returns every currently held request, in unspecified order, without resolving any of
    /// them. See [`RequestManager::take`].
    pub(crate) fn take_all(&mut self) -> Vec<UserRequest>
    {
        self.pending.drain().map(|(_, request)| request).collect()
    }

    /// Resolves `request` with `error`, then unregisters it.
    ///
    /// Callers that hold `request`'s owning [`ClientSession`](crate::ClientSession) borrowed while calling
    /// this must first drop that borrow: this calls `request`'s resolution callback synchronously, and that
    /// callback may reenter the session (e.g. to inspect roster state).
    ///
    /// # Panics
    /// Panics (programmer error) if `request` is not currently held: a request can only be failed once,
    /// by the component that holds it.
    pub fn fail(&mut self, request: &UserRequest, error: Error)
    {
        if !self.take(request)
        {
            panic!("RequestManager::fail called on a request that is not (or no longer) held (seq={})", request.seq());
        }
        request.fail(error);
    }

    /// Fails every held request with [`RequestError::Cancelled`], in unspecified order, exactly once each,
    /// then empties the index.
    ///
    /// See [`RequestManager::fail`]'s note on reentrancy: this also invokes resolution callbacks synchronously.
    pub fn clear(&mut self)
    {
        for request in self.take_all()
        {
            request.fail(RequestError::Cancelled.into());
        }
    }

    /// Number of currently held (unresolved) requests.
    pub fn len(&self) -> usize { self.pending.len() }
    pub fn is_empty(&self) -> bool { self.pending.is_empty() }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------

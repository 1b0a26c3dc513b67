//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;

//-------------------------------------------------------------------------------------------------------------------

/// Identity of one in-flight operation awaiting a correlated server reply (C1).
///
/// `Request` only carries the identity shared by every request variant plus the default ("no
/// component-specific success exists") resolution path, [`Request::fail`]. Concrete request kinds
/// (currently just [`UserRequest`]) embed a `Request` rather than subclass it.
#[derive(Debug, Clone)]
pub struct Request
{
    name: String,
    seq: u32,
}

impl Request
{
    pub(crate) fn new(name: impl Into<String>, seq: u32) -> Self
    {
        Self{ name: name.into(), seq }
    }

    /// The protocol verb this request correlates against (e.g. `"user-join"`).
    pub fn name(&self) -> &str { &self.name }

    /// The sequence number that pairs this request with its reply. Unique within the owning
    /// [`RequestManager`]'s lifetime.
    pub fn seq(&self) -> u32 { self.seq }
}

//-------------------------------------------------------------------------------------------------------------------

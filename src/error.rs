//local shortcuts

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;

//-------------------------------------------------------------------------------------------------------------------

/// Errors raised while servicing a request.
#[derive(Debug, Clone)]
pub enum RequestError
{
    /// a regular message arrived while a synchronization is in progress on the same connection
    Synchronizing,
    /// the inbound message's verb has no registered handler
    UnexpectedMessage,
    /// a handler failed while processing a message that carried a `seq`; wraps the handler's error
    ReplyUnprocessed(Box<Error>),
    /// a `seq` attribute referenced a request that is not currently held
    NoSuchSeq,
    /// a `seq` attribute referenced a request whose verb does not match the expected verb
    SeqVerbMismatch,
    /// a required attribute was absent, or present but malformed
    NoSuchAttribute,
    /// the request was cancelled by [`RequestManager::clear`](crate::RequestManager::clear)
    Cancelled,
}

impl std::fmt::Display for RequestError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let _ = write!(f, "RequestError::");
        match self
        {
            RequestError::Synchronizing       => write!(f, "Synchronizing"),
            RequestError::UnexpectedMessage    => write!(f, "UnexpectedMessage"),
            RequestError::ReplyUnprocessed(e)  => write!(f, "ReplyUnprocessed({})", e),
            RequestError::NoSuchSeq            => write!(f, "NoSuchSeq"),
            RequestError::SeqVerbMismatch       => write!(f, "SeqVerbMismatch"),
            RequestError::NoSuchAttribute       => write!(f, "NoSuchAttribute"),
            RequestError::Cancelled            => write!(f, "Cancelled"),
        }
    }
}
impl std::error::Error for RequestError {}

//-------------------------------------------------------------------------------------------------------------------

/// Errors raised while handling a `user-join`/`user-rejoin` message.
#[derive(Debug, Clone)]
pub enum UserJoinError
{
    /// a `user-rejoin` referenced an `id` with no known user
    NoSuchUser,
}

impl std::fmt::Display for UserJoinError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let _ = write!(f, "UserJoinError::");
        match self
        {
            UserJoinError::NoSuchUser => write!(f, "NoSuchUser"),
        }
    }
}
impl std::error::Error for UserJoinError {}

//-------------------------------------------------------------------------------------------------------------------

/// Errors raised while handling a `user-leave` message.
#[derive(Debug, Clone)]
pub enum UserLeaveError
{
    /// the `user-leave` message had no `id` attribute
    IdNotPresent,
    /// the `id` attribute referenced no known user
    NoSuchUser,
}

impl std::fmt::Display for UserLeaveError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let _ = write!(f, "UserLeaveError::");
        match self
        {
            UserLeaveError::IdNotPresent => write!(f, "IdNotPresent"),
            UserLeaveError::NoSuchUser   => write!(f, "NoSuchUser"),
        }
    }
}
impl std::error::Error for UserLeaveError {}

//-------------------------------------------------------------------------------------------------------------------

/// The session subsystem's unified error type.
#[derive(Debug, Clone)]
pub enum Error
{
    Request(RequestError),
    UserJoin(UserJoinError),
    UserLeave(UserLeaveError),
    /// the server reported an error from a domain this translator does not recognize
    UnknownDomain{ domain: String, code: u32 },
}

impl std::fmt::Display for Error
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Error::Request(e)   => write!(f, "{e}"),
            Error::UserJoin(e)  => write!(f, "{e}"),
            Error::UserLeave(e) => write!(f, "{e}"),
            Error::UnknownDomain{ domain, code } =>
                write!(f, "Error::UnknownDomain(domain: {domain}, code: {code})"),
        }
    }
}
impl std::error::Error for Error {}

impl From<RequestError> for Error
{
    fn from(err: RequestError) -> Self { Error::Request(err) }
}
impl From<UserJoinError> for Error
{
    fn from(err: UserJoinError) -> Self { Error::UserJoin(err) }
}
impl From<UserLeaveError> for Error
{
    fn from(err: UserLeaveError) -> Self { Error::UserLeave(err) }
}

//-------------------------------------------------------------------------------------------------------------------

/// Translates a server-reported `(domain, code)` pair into a locally typed [`Error`] (C6).
///
/// The default translator recognizes the `request`, `user-join`, and `user-leave` domains; a
/// [`ClientSession`](crate::ClientSession) may be constructed with any other implementation to extend the
/// set of recognized domains, matching the subclassing hook in the original `infc_session_translate_error_impl`.
pub trait TranslateError: Debug
{
    /// Translates a `(domain, code)` pair into an [`Error`]. Unrecognized domains must produce
    /// [`Error::UnknownDomain`] rather than panicking.
    fn translate(&self, domain: &str, code: u32) -> Error;
}

//-------------------------------------------------------------------------------------------------------------------

/// The default [`TranslateError`] implementation, covering the `request`, `user-join`, and `user-leave` domains.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorTranslator;

impl TranslateError for DefaultErrorTranslator
{
    fn translate(&self, domain: &str, code: u32) -> Error
    {
        match domain
        {
            "inf-request-error" => Error::Request(match code
            {
                0 => RequestError::Synchronizing,
                1 => RequestError::UnexpectedMessage,
                2 => RequestError::NoSuchSeq,
                3 => RequestError::SeqVerbMismatch,
                4 => RequestError::NoSuchAttribute,
                5 => RequestError::Cancelled,
                _ => return Error::UnknownDomain{ domain: domain.to_string(), code },
            }),
            "inf-user-join-error" => Error::UserJoin(match code
            {
                0 => UserJoinError::NoSuchUser,
                _ => return Error::UnknownDomain{ domain: domain.to_string(), code },
            }),
            "inf-user-leave-error" => Error::UserLeave(match code
            {
                0 => UserLeaveError::IdNotPresent,
                1 => UserLeaveError::NoSuchUser,
                _ => return Error::UnknownDomain{ domain: domain.to_string(), code },
            }),
            _ => Error::UnknownDomain{ domain: domain.to_string(), code },
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------

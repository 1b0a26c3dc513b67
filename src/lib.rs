//documentation
#![doc = include_str!("../README.md")]

//module tree
mod client_session;
mod collab;
mod error;
mod message_table;
mod request;
mod request_manager;
mod user_request;
mod xml;

//API exports
pub use client_session::*;
pub use collab::*;
pub use error::*;
pub use message_table::*;
pub use request::*;
pub use request_manager::*;
pub use user_request::*;
pub use xml::*;

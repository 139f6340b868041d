//! Fixed-width line codec for the Pulsar messaging protocol.
//!
//! Every message travels as a single text line made of four fixed-width
//! header fields followed by the free-form content:
//! - message id, zero-padded
//! - timestamp (seconds since epoch), zero-padded
//! - sender address, space-padded
//! - receiver address, space-padded
//!
//! One transport frame carries exactly one line. No escaping, no terminator.

pub mod address;
pub mod codec;
pub mod error;
pub mod message;

pub use address::{
    classify, is_reserved, AddressKind, CHANNEL_PREFIX, SERVER_ERROR, SERVER_MSG, SERVER_REQ,
    SYSTEM_PREFIX, USER_PREFIX,
};
pub use codec::{
    decode, encode, WireLayout, ID_WIDTH, RECEIVER_WIDTH, SENDER_WIDTH, TIME_WIDTH,
};
pub use error::{Result, WireError};
pub use message::{Message, MAX_CONTENT_CHARS};

//! # rendezvous-types
//!
//! Wire format types for the http-rendezvous stream relay.
//!
//! This crate provides the types shared between the relay server and its
//! clients:
//! - [`SessionId`] - Opaque session identity
//! - [`HeaderSet`] - Declared header contract for a session
//! - [`SessionState`] - Session lifecycle states
//! - [`CreateStreamRequest`], [`CreateStreamResponse`], [`SessionSummary`],
//!   [`TransferStats`], [`ErrorBody`] - JSON bodies of the HTTP surface

#![warn(missing_docs)]
#![warn(clippy::all)]

mod headers;
mod ids;
mod messages;
mod state;

pub use headers::HeaderSet;
pub use ids::{ParseSessionIdError, SessionId};
pub use messages::{
    CreateStreamRequest, CreateStreamResponse, ErrorBody, SessionSummary, TransferStats,
};
pub use state::SessionState;

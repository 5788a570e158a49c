//! # http-rendezvous-relay
//!
//! HTTP rendezvous server: a client registers a transfer session, then a
//! source uploads a byte stream into it.
//!
//! This crate implements a relay server that:
//! - Registers sessions with declared download/upload header sets
//! - Accepts exactly one source per session over `PUT /stream/:id`
//! - Pipes the source through a bounded buffer, counting reads and bytes
//! - Expires sessions that outlive their TTL and reaps finished ones
//!
//! ## Architecture
//!
//! ```text
//! Client ── POST /stream ──► SessionManager ──► Session (Pending)
//!                                                   │
//! Source ── PUT /stream/:id ──► SourceAttachment ───┤ Streaming
//!                                 │                 │
//!                        pump ─► pipe ─► ByteCounter ─► sink
//!                                                   │
//!                                  Completed / Failed / Expired
//! ```
//!
//! ## Endpoints
//!
//! - `POST /stream` → `{"stream": id}`
//! - `GET /stream` → session summaries in creation order
//! - `PUT /stream/:id` → transfer counters once the source ends
//! - `GET /stream/:id/status` → one session summary
//! - `GET /ping`, `GET /health`, `GET /metrics`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod clock;
pub mod config;
pub mod counter;
pub mod error;
pub mod http;
pub mod manager;
pub mod pipe;
pub mod relay;
pub mod server;
pub mod session;

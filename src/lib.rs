//! Now-playing metadata router for radio broadcast chains.
//!
//! **airtext** continuously aggregates "now playing" information from
//! heterogeneous sources (live HTTP pushes from the studio automation,
//! periodically polled remote APIs, static fallback text) and fans it
//! out, after per-destination transformation and timing alignment, to the
//! sinks of a broadcast chain: streaming-server control endpoints, file
//! drops for DAB+ PAD encoders, webhook receivers and HTTP polling
//! clients.
//!
//! # Architecture
//!
//! * **Value types**
//!   - [`metadata`]: song snapshots and their expiration policy
//!   - [`text`]: structured display text preserving field boundaries for
//!     DAB+ Dynamic Label Plus positional tags
//! * **Sources and sinks**
//!   - [`input`]: the input contract, the shared input base and the
//!     concrete text / dynamic / URL inputs
//!   - [`output`]: the output contract and the file / PAD / Icecast /
//!     webhook / HTTP sinks
//!   - [`format`]: the formatter catalog applied between selection and
//!     delivery
//! * **Coordination**
//!   - [`timeline`]: the chronologically ordered queue of pending
//!     deliveries with per-output cancellation
//!   - [`router`]: the single-writer coordinator: priority-based source
//!     selection, expiration-driven fallback, delayed scheduling and
//!     dedup
//! * **Edges**
//!   - [`config`]: the TOML topology file
//!   - [`server`]: the HTTP push and polling endpoints
//!   - [`http`]: the shared rate-limited HTTP client
//!   - [`signal`]: shutdown signals
//!   - [`error`]: error types and handling
//!
//! # Data flow
//!
//! Input → subscription channel → router scheduling → timeline →
//! processor wake at due time → render (prefix/suffix, formatter chains)
//! → dedup → sink delivery. A 1 Hz expiration checker switches outputs to
//! the next available source as values expire.
//!
//! # Concurrency
//!
//! Everything runs on the Tokio runtime as cooperative tasks wound down
//! by a single cancellation token. State is in memory only; a restart
//! re-primes from static inputs.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![doc(test(attr(ignore)))]

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod input;
pub mod metadata;
pub mod output;
pub mod router;
pub mod server;
pub mod signal;
pub mod text;
pub mod timeline;

//! Delivery sinks and the output contract.
//!
//! Outputs receive the structured text, not a flat string: sinks like the
//! DAB+ PAD file need the field ranges that only survive in structured
//! form. Each output declares a delay in whole seconds; the router adds it
//! to "now" when scheduling, so sinks sitting behind different broadcast
//! audio delays stay mutually aligned.
//!
//! Delivery is fire-and-forget. A failed send is the output's own concern:
//! the router logs it and moves on, and the content is retried only when
//! it next genuinely changes.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{error::Result, input::Input, text::StructuredText};

pub mod file;
pub mod http;
pub mod icecast;
pub mod pad;
pub mod webhook;

pub use file::FileOutput;
pub use http::HttpOutput;
pub use icecast::IcecastOutput;
pub use pad::PadOutput;
pub use webhook::WebhookOutput;

/// A delivery sink.
#[async_trait]
pub trait Output: Send + Sync {
    /// Stable identifier of this output.
    fn name(&self) -> &str;

    /// Type tag of this output (`"file"`, `"pad"`, ...), for the audit
    /// trail.
    fn kind(&self) -> &'static str;

    /// Broadcast-alignment delay added to "now" when scheduling a
    /// delivery. Whole seconds; zero means immediate.
    fn delay(&self) -> Duration;

    /// Installs the resolved priority input handles, once before start.
    ///
    /// Most sinks only ever see finished deliveries and ignore this;
    /// outputs that serve their own clients (the HTTP output) use it to
    /// report per-source state.
    fn set_inputs(&self, _inputs: Vec<Arc<dyn Input>>) {}

    /// Long-running sink task; returns promptly on cancellation.
    ///
    /// The default suits sinks without background work.
    async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        shutdown.cancelled().await;
        Ok(())
    }

    /// Delivers one rendered value.
    ///
    /// The router never sends concurrently to the same output: at most one
    /// update per output is ever ready at a time.
    ///
    /// # Errors
    ///
    /// Delivery failures (network, file I/O) are returned to the router,
    /// which logs them and does not retry.
    async fn send(&self, text: &StructuredText) -> Result<()>;
}

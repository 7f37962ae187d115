//! Static fallback text input.
//!
//! Holds one fixed line of text, available from the moment it is created
//! and never expiring. Typically the lowest-priority input of every
//! output, so listeners see the station slogan instead of a stale song
//! when everything else has gone quiet.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    input::{Input, InputBase},
    metadata::Metadata,
};

/// An input that always carries the same configured text as its title.
pub struct TextInput {
    base: InputBase,
}

impl TextInput {
    /// Creates the input with its fixed text; the value is available
    /// immediately, before the router starts.
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let base = InputBase::new(name);
        base.set_metadata(Metadata::new(String::new(), text.into()));
        Self { base }
    }
}

#[async_trait]
impl Input for TextInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "text"
    }

    /// Passive: nothing to do until shutdown.
    async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        shutdown.cancelled().await;
        Ok(())
    }
}

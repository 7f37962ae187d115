//! HTTP GET sink.
//!
//! The inverse of the push input: clients poll the router instead of the
//! router pushing to them. Deliveries are retained here and served by the
//! HTTP server as JSON (`GET /output/{name}`) or plain text
//! (`GET /output/{name}/plain`). This is the one sink that uses its
//! resolved priority inputs, to report per-source availability next to the
//! current text.

use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;

use crate::{error::Result, input::Input, output::Output, text::StructuredText};

/// An output that retains its last delivery for polling clients.
pub struct HttpOutput {
    name: String,
    delay: Duration,
    inputs: RwLock<Vec<Arc<dyn Input>>>,
    last: RwLock<Option<StructuredText>>,
}

impl HttpOutput {
    /// Creates the output; it holds nothing until the first delivery.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            inputs: RwLock::new(Vec::new()),
            last: RwLock::new(None),
        }
    }

    /// The most recent delivery, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<StructuredText> {
        self.last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current availability of every priority source, in priority order.
    #[must_use]
    pub fn sources(&self) -> Vec<(String, bool)> {
        self.inputs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|input| {
                let available = input
                    .metadata()
                    .is_some_and(|metadata| metadata.is_available());
                (input.name().to_string(), available)
            })
            .collect()
    }
}

#[async_trait]
impl Output for HttpOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn set_inputs(&self, inputs: Vec<Arc<dyn Input>>) {
        *self
            .inputs
            .write()
            .unwrap_or_else(PoisonError::into_inner) = inputs;
    }

    async fn send(&self, text: &StructuredText) -> Result<()> {
        *self.last.write().unwrap_or_else(PoisonError::into_inner) = Some(text.clone());
        Ok(())
    }
}

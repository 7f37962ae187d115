//! Webhook sink.
//!
//! POSTs a JSON document to a receiver URL on every delivery. The payload
//! carries the structured fields next to the rendered line, so receivers
//! can do their own presentation without re-parsing.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::{error::Result, http, output::Output, text::StructuredText};

/// Body POSTed to the receiver.
#[derive(Debug, Serialize)]
struct Payload<'a> {
    /// Name of the input the value originated from.
    source: &'a str,

    /// Type tag of the originating input.
    source_type: &'a str,

    artist: &'a str,
    title: &'a str,

    /// The fully rendered line, as other sinks display it.
    text: String,
}

/// An output POSTing deliveries to a webhook receiver.
pub struct WebhookOutput {
    name: String,
    delay: Duration,
    client: Arc<http::Client>,
    url: Url,
}

impl WebhookOutput {
    /// Creates the output.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration, client: Arc<http::Client>, url: Url) -> Self {
        Self {
            name: name.into(),
            delay,
            client,
            url,
        }
    }
}

#[async_trait]
impl Output for WebhookOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "webhook"
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    async fn send(&self, text: &StructuredText) -> Result<()> {
        let payload = Payload {
            source: &text.input_name,
            source_type: &text.input_kind,
            artist: &text.artist,
            title: &text.title,
            text: text.to_string(),
        };

        let request = self
            .client
            .unlimited
            .post(self.url.clone())
            .json(&payload)
            .build()?;

        self.client.execute(request).await?.error_for_status()?;
        debug!("{}: delivered to {}", self.name, self.url);
        Ok(())
    }
}

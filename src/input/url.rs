//! Polling input for remote now-playing APIs.
//!
//! Fetches a JSON document on a fixed interval and extracts the display
//! fields through configured [JSON pointers] (`"/now/artist"`). Poll
//! failures are logged and the loop continues; a source that keeps failing
//! simply expires and the router falls back to the next one.
//!
//! [JSON pointers]: https://datatracker.ietf.org/doc/html/rfc6901

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    error::Result,
    http,
    input::{Input, InputBase},
    metadata::{self, Metadata},
};

/// Settings for a [`UrlInput`], straight from the configuration file.
pub struct UrlInputConfig {
    /// Endpoint returning the JSON document.
    pub url: Url,

    /// Time between polls.
    pub poll_interval: Duration,

    /// Pointer to the title. Required; a document without it yields an
    /// unavailable value.
    pub title_path: String,

    /// Pointer to the artist.
    pub artist_path: Option<String>,

    /// Pointer to the opaque song id.
    pub song_id_path: Option<String>,

    /// Pointer to the duration string.
    pub duration_path: Option<String>,

    /// Fixed lifetime applied when the document carries no parseable
    /// duration.
    pub fallback_lifetime: Option<Duration>,
}

/// An input that polls a JSON endpoint.
pub struct UrlInput {
    base: InputBase,
    settings: UrlInputConfig,
    client: Arc<http::Client>,
}

impl UrlInput {
    /// Creates the input; the first poll happens once the router starts it.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        settings: UrlInputConfig,
        client: Arc<http::Client>,
    ) -> Self {
        Self {
            base: InputBase::new(name),
            settings,
            client,
        }
    }

    /// Fetches the document once and stores whatever it describes.
    ///
    /// The value is stored even when the title turns out empty; an empty
    /// title makes it unavailable, which is exactly what source selection
    /// should see.
    async fn poll(&self) -> Result<()> {
        let request = self.client.get(self.settings.url.clone(), "");
        let response = self.client.execute(request).await?.error_for_status()?;
        let document: Value = response.json().await?;

        let title = string_at(&document, Some(&self.settings.title_path)).unwrap_or_default();
        let artist =
            string_at(&document, self.settings.artist_path.as_deref()).unwrap_or_default();

        let mut value = Metadata::new(artist, title);
        value.song_id = string_at(&document, self.settings.song_id_path.as_deref());
        let duration = string_at(&document, self.settings.duration_path.as_deref());
        value.expires_at =
            metadata::expires_from(duration.as_deref(), self.settings.fallback_lifetime);
        value.duration = duration;
        self.base.set_metadata(value);
        Ok(())
    }
}

/// Resolves a pointer to a string, stringifying numbers (durations are
/// often reported as JSON numbers).
fn string_at(document: &Value, pointer: Option<&str>) -> Option<String> {
    match document.pointer(pointer?)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Input for UrlInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "url"
    }

    /// Poll loop; ends on cancellation.
    async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    if let Err(e) = self.poll().await {
                        warn!("{}: poll failed: {e}", self.base.name());
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointers_extract_strings_and_numbers() {
        let document: Value = serde_json::from_str(
            r#"{"now": {"artist": "Queen", "title": "One Vision", "duration": 272.5}}"#,
        )
        .unwrap();

        assert_eq!(
            string_at(&document, Some("/now/artist")).as_deref(),
            Some("Queen")
        );
        assert_eq!(
            string_at(&document, Some("/now/duration")).as_deref(),
            Some("272.5")
        );
        assert_eq!(string_at(&document, Some("/now/missing")), None);
        assert_eq!(string_at(&document, None), None);
    }
}

//! DAB+ PAD encoder file sink with Dynamic Label Plus tags.
//!
//! Writes the file a PAD encoder (ODR-PadEnc) watches for DLS text. Along
//! with the rendered line, the encoder expects a parameter block carrying
//! DL Plus positional tags:
//!
//! ```text
//! ##### parameters { #####
//! DL_PLUS=1
//! DL_PLUS_TAG=4 2 4
//! DL_PLUS_TAG=1 10 16
//! DL_PLUS_ITEM_TOGGLE=1
//! DL_PLUS_ITEM_RUNNING=1
//! ##### parameters } #####
//! 🎵 Queen - Bohemian Rhapsody
//! ```
//!
//! Content type 4 tags the artist, content type 1 the title. Each tag
//! carries `start` and `length - 1` in Unicode scalar values, straight
//! from the structured text's range queries; the `length - 1` form is the
//! DL Plus wire format and must not be normalized.

use std::{
    path::PathBuf,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;

use crate::{error::Result, output::Output, text::StructuredText};

/// DL Plus content type for the title.
const CONTENT_TYPE_TITLE: u8 = 1;

/// DL Plus content type for the artist.
const CONTENT_TYPE_ARTIST: u8 = 4;

/// An output feeding a DAB+ PAD encoder.
pub struct PadOutput {
    name: String,
    delay: Duration,
    path: PathBuf,
    item_toggle: Mutex<bool>,
}

impl PadOutput {
    /// Creates the output. The toggle starts cleared; receivers only care
    /// that it alternates.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            delay,
            path,
            item_toggle: Mutex::new(false),
        }
    }

    /// Renders the parameter block and text for one delivery.
    fn contents(&self, text: &StructuredText, item_toggle: bool) -> String {
        let rendered = text.to_string();
        let artist = text.artist_range();
        let title = text.title_range();

        let mut contents = String::new();
        if artist.is_some() || title.is_some() {
            contents.push_str("##### parameters { #####\n");
            contents.push_str("DL_PLUS=1\n");
            if let Some((start, length)) = artist {
                contents.push_str(&format!("DL_PLUS_TAG={CONTENT_TYPE_ARTIST} {start} {length}\n"));
            }
            if let Some((start, length)) = title {
                contents.push_str(&format!("DL_PLUS_TAG={CONTENT_TYPE_TITLE} {start} {length}\n"));
            }
            contents.push_str(&format!("DL_PLUS_ITEM_TOGGLE={}\n", u8::from(item_toggle)));
            contents.push_str(&format!(
                "DL_PLUS_ITEM_RUNNING={}\n",
                u8::from(artist.is_some() && title.is_some())
            ));
            contents.push_str("##### parameters } #####\n");
        }
        contents.push_str(&rendered);
        contents.push('\n');
        contents
    }
}

#[async_trait]
impl Output for PadOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "pad"
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    async fn send(&self, text: &StructuredText) -> Result<()> {
        // The router only delivers distinct rendered values, so flipping on
        // every send alternates the toggle per distinct value.
        let item_toggle = {
            let mut toggle = self
                .item_toggle
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *toggle = !*toggle;
            *toggle
        };

        tokio::fs::write(&self.path, self.contents(text, item_toggle)).await?;
        debug!("{}: wrote {}", self.name, self.path.display());
        Ok(())
    }
}

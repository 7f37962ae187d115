//! Metadata sources and the shared input machinery.
//!
//! Every input, whatever it polls or listens to, provides the same three
//! things: a stable name, its latest metadata value, and a subscriber
//! broadcast that fires on content changes. [`InputBase`] implements all
//! three; concrete inputs embed it and add their own acquisition logic.
//!
//! # Subscriber delivery
//!
//! Notification channels are bounded and owned by the router. Delivery is
//! best-effort: when a subscriber's buffer is full the notification is
//! dropped rather than blocking the input, and the value remains reachable
//! through [`Input::metadata`]. The subscriber list is snapshotted under
//! its lock but delivered to outside of it, since a subscriber may call
//! straight back into the input.
//!
//! # Passive vs active inputs
//!
//! Static text and HTTP-push inputs have no background work; their
//! [`Input::run`] simply awaits cancellation. The URL poller runs a poll
//! loop. The router does not care which, it only requires the run
//! contract.

use std::{
    sync::{PoisonError, RwLock},
    time::SystemTime,
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{error::Result, metadata::Metadata};

pub mod dynamic;
pub mod text;
pub mod url;

pub use dynamic::{DynamicInput, PushRequest};
pub use text::TextInput;
pub use url::UrlInput;

/// A metadata source.
#[async_trait]
pub trait Input: Send + Sync {
    /// The shared identity / current value / subscriber machinery.
    fn base(&self) -> &InputBase;

    /// Type tag of this input (`"text"`, `"dynamic"`, `"url"`), recorded on
    /// the structured text for filters and the audit trail.
    fn kind(&self) -> &'static str;

    /// Stable identifier of this input.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Returns a clone of the current value, if any.
    ///
    /// Callers never observe internal state; mutating the returned value
    /// has no effect on the input.
    fn metadata(&self) -> Option<Metadata> {
        self.base().metadata()
    }

    /// Registers a buffered notification channel for content changes.
    fn subscribe(&self, subscriber: mpsc::Sender<Metadata>) {
        self.base().subscribe(subscriber);
    }

    /// Deregisters a previously subscribed channel.
    fn unsubscribe(&self, subscriber: &mpsc::Sender<Metadata>) {
        self.base().unsubscribe(subscriber);
    }

    /// Long-running acquisition task; returns promptly on cancellation.
    async fn run(&self, shutdown: CancellationToken) -> Result<()>;
}

/// Name, current value and subscriber broadcast shared by every input.
pub struct InputBase {
    name: String,
    current: RwLock<Option<Metadata>>,
    subscribers: RwLock<Vec<mpsc::Sender<Metadata>>>,
}

impl InputBase {
    /// Creates an empty base with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: RwLock::new(None),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Stable identifier of this input.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a clone of the current value, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<Metadata> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registers a subscriber channel.
    pub fn subscribe(&self, subscriber: mpsc::Sender<Metadata>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    /// Deregisters a subscriber channel.
    pub fn unsubscribe(&self, subscriber: &mpsc::Sender<Metadata>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|existing| !existing.same_channel(subscriber));
    }

    /// Canonical mutator: stores a new value and notifies subscribers on
    /// content changes.
    ///
    /// HTML entities in artist and title are decoded here, exactly once;
    /// the song id is opaque and passed through. The value is stored even
    /// when its content is unchanged, so a re-push of the same song keeps
    /// its expiration tracking fresh. Content comparison spans title,
    /// artist, song id and duration.
    pub fn set_metadata(&self, mut metadata: Metadata) {
        metadata.source = self.name.clone();
        metadata.artist = html_escape::decode_html_entities(&metadata.artist).into_owned();
        metadata.title = html_escape::decode_html_entities(&metadata.title).into_owned();
        metadata.updated_at = SystemTime::now();

        let changed = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let changed = current.as_ref().is_none_or(|previous| {
                previous.title != metadata.title
                    || previous.artist != metadata.artist
                    || previous.song_id != metadata.song_id
                    || previous.duration != metadata.duration
            });
            *current = Some(metadata.clone());
            changed
        };

        if !changed {
            trace!("{}: content unchanged, not notifying", self.name);
            return;
        }

        // Snapshot under the lock, deliver outside of it.
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for subscriber in &subscribers {
            if let Err(e) = subscriber.try_send(metadata.clone()) {
                debug!("{}: dropping notification: {e}", self.name);
            }
        }
    }
}

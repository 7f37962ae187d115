//! HTTP-push input.
//!
//! Radio automation software pushes song changes to this input through the
//! HTTP server (`GET /input/{name}`). The input itself is transport-free:
//! [`DynamicInput::publish`] takes an already-parsed request, validates it,
//! derives the expiration and stores the value through the base. Rejected
//! pushes are reported to the caller and leave no trace in the input.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    input::{Input, InputBase},
    metadata::{self, Metadata},
};

/// One metadata push, as decoded from the request query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PushRequest {
    /// Performing artist.
    pub artist: Option<String>,

    /// Song title. Required; a push without one is rejected.
    pub title: Option<String>,

    /// Opaque song identifier.
    pub song_id: Option<String>,

    /// Song duration, parsed per the expiration policy.
    pub duration: Option<String>,

    /// Shared secret, checked when the input is configured with one.
    pub secret: Option<String>,
}

/// An input fed by external HTTP pushes.
pub struct DynamicInput {
    base: InputBase,
    secret: Option<String>,
    fallback_lifetime: Option<Duration>,
}

impl DynamicInput {
    /// Creates the input.
    ///
    /// `expiration_minutes` is the fixed fallback lifetime applied when a
    /// push carries no parseable duration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        secret: Option<String>,
        expiration_minutes: Option<u64>,
    ) -> Self {
        Self {
            base: InputBase::new(name),
            secret,
            fallback_lifetime: expiration_minutes.map(|minutes| Duration::from_secs(minutes * 60)),
        }
    }

    /// Validates and stores a pushed value.
    ///
    /// # Errors
    ///
    /// * `PermissionDenied` when the configured shared secret does not
    ///   match.
    /// * `InvalidArgument` when the title is missing or blank.
    ///
    /// No state changes on rejection.
    pub fn publish(&self, request: PushRequest) -> Result<()> {
        if let Some(expected) = &self.secret {
            if request.secret.as_deref() != Some(expected.as_str()) {
                return Err(Error::permission_denied(format!(
                    "{}: secret mismatch",
                    self.base.name()
                )));
            }
        }

        let title = request
            .title
            .filter(|title| !title.trim().is_empty())
            .ok_or_else(|| {
                Error::invalid_argument(format!("{}: title is required", self.base.name()))
            })?;

        let mut value = Metadata::new(request.artist.unwrap_or_default(), title);
        value.song_id = request.song_id;
        value.expires_at =
            metadata::expires_from(request.duration.as_deref(), self.fallback_lifetime);
        value.duration = request.duration;
        self.base.set_metadata(value);
        Ok(())
    }
}

#[async_trait]
impl Input for DynamicInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "dynamic"
    }

    /// Passive: the HTTP server drives this input.
    async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        shutdown.cancelled().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use crate::error::ErrorKind;

    use super::*;

    fn push(title: &str) -> PushRequest {
        PushRequest {
            title: Some(title.to_string()),
            ..PushRequest::default()
        }
    }

    #[test]
    fn accepts_a_plain_push() {
        let input = DynamicInput::new("live", None, None);
        input
            .publish(PushRequest {
                artist: Some("Queen".to_string()),
                ..push("One Vision")
            })
            .unwrap();

        let metadata = input.metadata().unwrap();
        assert_eq!(metadata.format_string(), "Queen - One Vision");
        assert_eq!(metadata.expires_at, None);
    }

    #[test]
    fn rejects_a_wrong_secret_without_state_change() {
        let input = DynamicInput::new("live", Some("hunter2".to_string()), None);

        let error = input
            .publish(PushRequest {
                secret: Some("wrong".to_string()),
                ..push("One Vision")
            })
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::PermissionDenied);
        assert!(input.metadata().is_none());

        input
            .publish(PushRequest {
                secret: Some("hunter2".to_string()),
                ..push("One Vision")
            })
            .unwrap();
        assert!(input.metadata().is_some());
    }

    #[test]
    fn rejects_a_missing_or_blank_title() {
        let input = DynamicInput::new("live", None, None);

        let error = input.publish(PushRequest::default()).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidArgument);

        let error = input.publish(push("   ")).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidArgument);
        assert!(input.metadata().is_none());
    }

    #[test]
    fn duration_drives_expiration() {
        let input = DynamicInput::new("live", None, None);
        input
            .publish(PushRequest {
                duration: Some("0:30".to_string()),
                ..push("One Vision")
            })
            .unwrap();

        // Rounded up to one minute from now.
        let expires_at = input.metadata().unwrap().expires_at.unwrap();
        assert!(expires_at > SystemTime::now() + Duration::from_secs(30));
        assert!(expires_at <= SystemTime::now() + Duration::from_secs(60));
    }

    #[test]
    fn fallback_lifetime_applies_without_duration() {
        let input = DynamicInput::new("live", None, Some(5));
        input.publish(push("One Vision")).unwrap();

        let expires_at = input.metadata().unwrap().expires_at.unwrap();
        assert!(expires_at > SystemTime::now() + Duration::from_secs(200));
    }
}

//! Song metadata values and their lifetime.
//!
//! This module provides the value type that travels from inputs to outputs:
//! a snapshot of "now playing" information together with the wall-clock
//! instant at which it stops being trustworthy.
//!
//! # Availability
//!
//! A metadata value is *available* when it has a non-empty title and has not
//! expired. Source selection and expiration fallback are both driven by this
//! single predicate.
//!
//! # Expiration
//!
//! Dynamic sources report a song duration as free-form text (`"272"`,
//! `"4:32.5"`, `"1:02:03"`). [`lifetime_from_duration`] turns that into a
//! lifetime rounded up to the next whole minute, so a clock that is a few
//! seconds off never cuts a song short. Unparseable durations degrade to a
//! configured fixed lifetime, or to an already-expired value so the router
//! falls back to the next source right away.

use std::time::{Duration, SystemTime};

use crate::error::{Error, Result};

/// A source's latest song snapshot.
///
/// Values are created by inputs, cloned on every read and never mutated
/// after publication. All fields are owned, so `Clone` yields a fully
/// independent snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Metadata {
    /// Name of the input that produced this value.
    ///
    /// Stamped by the input base on store; never mutated downstream.
    pub source: String,

    /// Opaque identifier of the song, if the source has one.
    ///
    /// Not HTML-entity-decoded; passed through as received.
    pub song_id: Option<String>,

    /// Performing artist. May be empty.
    pub artist: String,

    /// Song title. An empty title marks the value as unavailable.
    pub title: String,

    /// Song duration as reported by the source, if any.
    ///
    /// Kept verbatim for the audit trail; the parsed form only feeds
    /// [`Metadata::expires_at`].
    pub duration: Option<String>,

    /// When the input accepted this value.
    pub updated_at: SystemTime,

    /// When this value stops being trustworthy.
    ///
    /// `None` means the value never expires (static fallback text).
    pub expires_at: Option<SystemTime>,
}

impl Metadata {
    /// Creates a new snapshot with the given display fields.
    ///
    /// The source name is stamped by the input base when the value is
    /// stored; song id, duration and expiration default to absent.
    #[must_use]
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: String::new(),
            song_id: None,
            artist: artist.into(),
            title: title.into(),
            duration: None,
            updated_at: SystemTime::now(),
            expires_at: None,
        }
    }

    /// Whether the expiration instant, if any, has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| SystemTime::now() > expires_at)
    }

    /// Whether this value may be selected as an output's source.
    ///
    /// True iff the title is non-empty and the value has not expired.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.title.is_empty() && !self.is_expired()
    }

    /// Plain display form of the snapshot.
    ///
    /// `"artist - title"` when both fields are present, just the title when
    /// the artist is empty, and an empty string otherwise.
    #[must_use]
    pub fn format_string(&self) -> String {
        if self.title.is_empty() {
            String::new()
        } else if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist, self.title)
        }
    }
}

/// Parses a song duration string into a lifetime.
///
/// Accepted shapes, leading zeros optional:
/// * decimal seconds with `.` or `,` as separator: `272`, `272.5`,
///   `272,670041666667`
/// * `MM:SS` with `0 <= SS < 60`
/// * `HH:MM:SS` with `0 <= MM < 60` and `0 <= SS < 60`
///
/// The total is rounded up to the next whole minute. Zero or negative
/// totals yield [`Duration::ZERO`], i.e. a value that expires immediately.
///
/// # Errors
///
/// Returns an error for any other shape, including out-of-range sexagesimal
/// fields like `59:60`.
pub fn lifetime_from_duration(duration: &str) -> Result<Duration> {
    let duration = duration.trim();

    let seconds = if duration.contains(':') {
        let parts: Vec<&str> = duration.split(':').collect();
        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes: u64 = minutes.trim().parse()?;
                let seconds: u64 = seconds.trim().parse()?;
                if seconds >= 60 {
                    return Err(Error::out_of_range(format!(
                        "seconds out of range in duration {duration:?}"
                    )));
                }
                minutes * 60 + seconds
            }
            [hours, minutes, seconds] => {
                let hours: u64 = hours.trim().parse()?;
                let minutes: u64 = minutes.trim().parse()?;
                let seconds: u64 = seconds.trim().parse()?;
                if minutes >= 60 || seconds >= 60 {
                    return Err(Error::out_of_range(format!(
                        "minutes or seconds out of range in duration {duration:?}"
                    )));
                }
                hours * 3600 + minutes * 60 + seconds
            }
            _ => {
                return Err(Error::invalid_argument(format!(
                    "unrecognized duration {duration:?}"
                )));
            }
        }
    } else {
        let value: f64 = duration.replace(',', ".").parse()?;
        if !value.is_finite() {
            return Err(Error::invalid_argument(format!(
                "unrecognized duration {duration:?}"
            )));
        }
        if value <= 0.0 {
            return Ok(Duration::ZERO);
        }
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = value.ceil() as u64;
        whole
    };

    Ok(Duration::from_secs(seconds.div_ceil(60) * 60))
}

/// Computes the expiration instant for a freshly published value.
///
/// * A parseable duration string expires the value after its rounded-up
///   lifetime.
/// * An unparseable duration falls back to the configured fixed lifetime,
///   or expires the value immediately when none is configured.
/// * No duration at all uses the fixed lifetime when configured and
///   otherwise never expires.
#[must_use]
pub fn expires_from(duration: Option<&str>, fallback: Option<Duration>) -> Option<SystemTime> {
    let now = SystemTime::now();
    match duration {
        Some(value) => match lifetime_from_duration(value) {
            Ok(lifetime) => Some(now + lifetime),
            Err(e) => {
                warn!("substituting lifetime for duration {value:?}: {e}");
                Some(now + fallback.unwrap_or(Duration::ZERO))
            }
        },
        None => fallback.map(|lifetime| now + lifetime),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_requires_title() {
        let metadata = Metadata::new("Queen", "");
        assert!(!metadata.is_available());

        let metadata = Metadata::new("", "Bohemian Rhapsody");
        assert!(metadata.is_available());
    }

    #[test]
    fn available_requires_unexpired() {
        let mut metadata = Metadata::new("Queen", "Bohemian Rhapsody");
        assert!(metadata.is_available());

        metadata.expires_at = Some(SystemTime::now() - Duration::from_secs(1));
        assert!(metadata.is_expired());
        assert!(!metadata.is_available());

        metadata.expires_at = Some(SystemTime::now() + Duration::from_secs(60));
        assert!(metadata.is_available());
    }

    #[test]
    fn format_string_omits_empty_fields() {
        assert_eq!(Metadata::new("Queen", "One Vision").format_string(), "Queen - One Vision");
        assert_eq!(Metadata::new("", "One Vision").format_string(), "One Vision");
        assert_eq!(Metadata::new("Queen", "").format_string(), "");
    }

    #[test]
    fn clone_is_independent() {
        let mut original = Metadata::new("Queen", "One Vision");
        original.expires_at = Some(SystemTime::now() + Duration::from_secs(60));

        let mut copy = original.clone();
        assert_eq!(copy, original);

        copy.expires_at = None;
        assert!(original.expires_at.is_some());
    }

    #[test]
    fn decimal_durations_round_up_to_minutes() {
        assert_eq!(lifetime_from_duration("272").unwrap(), Duration::from_secs(300));
        assert_eq!(lifetime_from_duration("272.5").unwrap(), Duration::from_secs(300));
        assert_eq!(
            lifetime_from_duration("272,670041666667").unwrap(),
            Duration::from_secs(300)
        );
        assert_eq!(lifetime_from_duration("60").unwrap(), Duration::from_secs(60));
        assert_eq!(lifetime_from_duration("61").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn sexagesimal_durations() {
        assert_eq!(lifetime_from_duration("4:32").unwrap(), Duration::from_secs(300));
        assert_eq!(lifetime_from_duration("0:30").unwrap(), Duration::from_secs(60));
        assert_eq!(lifetime_from_duration("1:00:00").unwrap(), Duration::from_secs(3600));
        assert_eq!(lifetime_from_duration("90:00").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn zero_and_negative_durations_expire_immediately() {
        assert_eq!(lifetime_from_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(lifetime_from_duration("00:00").unwrap(), Duration::ZERO);
        assert_eq!(lifetime_from_duration("-5").unwrap(), Duration::ZERO);
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        assert!(lifetime_from_duration("59:60").is_err());
        assert!(lifetime_from_duration("1:60:00").is_err());
        assert!(lifetime_from_duration("1:2:3:4").is_err());
        assert!(lifetime_from_duration("four minutes").is_err());
        assert!(lifetime_from_duration("").is_err());
    }

    #[test]
    fn expires_from_applies_fallback_policy() {
        let fallback = Some(Duration::from_secs(300));

        // Parseable duration wins over the fallback.
        let expires = expires_from(Some("0:30"), fallback).unwrap();
        assert!(expires > SystemTime::now() + Duration::from_secs(30));

        // Unparseable duration degrades to the fallback.
        assert!(expires_from(Some("garbage"), fallback).unwrap() > SystemTime::now());

        // Unparseable duration without fallback expires immediately.
        let expires = expires_from(Some("garbage"), None).unwrap();
        assert!(expires <= SystemTime::now());

        // No duration: fallback when configured, otherwise never expires.
        assert!(expires_from(None, fallback).is_some());
        assert!(expires_from(None, None).is_none());
    }
}

//! Structured display text with field boundaries.
//!
//! Outputs do not receive a flat string: DAB+ Dynamic Label Plus needs to
//! know *where* the artist and title sit inside the rendered text, even
//! after prefixes, suffixes and formatters have reshaped it. This module
//! keeps the layout
//!
//! ```text
//! prefix | artist | separator | title | suffix
//! ```
//!
//! intact through the formatter chain and derives the positional tags from
//! it at delivery time.
//!
//! # Ranges
//!
//! [`StructuredText::artist_range`] and [`StructuredText::title_range`]
//! return `(start, length - 1)` measured in Unicode scalar values against
//! the rendered string. The `length - 1` form is what the DL Plus wire
//! format carries, so it is preserved here bit-exactly rather than
//! normalized to something friendlier.

use std::fmt;

use crate::metadata::Metadata;

/// Default separator between artist and title.
pub const DEFAULT_SEPARATOR: &str = " - ";

/// Display text that remembers where its fields are.
///
/// Formatters mutate the fields in place; rendering and range queries are
/// always computed from the current field values, so the positional tags
/// stay correct no matter what the chain did to the text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructuredText {
    /// Name of the input this text originated from.
    pub input_name: String,

    /// Type tag of the originating input, for the audit trail.
    pub input_kind: String,

    /// Text rendered before the artist.
    pub prefix: String,

    /// Performing artist. May be empty.
    pub artist: String,

    /// Separator rendered between artist and title when both are present.
    pub separator: String,

    /// Song title. May be empty.
    pub title: String,

    /// Text rendered after the title.
    pub suffix: String,
}

impl StructuredText {
    /// Creates a structured text with the default separator and empty
    /// prefix and suffix.
    #[must_use]
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            input_name: String::new(),
            input_kind: String::new(),
            prefix: String::new(),
            artist: artist.into(),
            separator: DEFAULT_SEPARATOR.to_string(),
            title: title.into(),
            suffix: String::new(),
        }
    }

    /// Whether there is anything to deliver.
    ///
    /// True iff the artist or the title is non-empty. Prefix and suffix
    /// alone do not count as content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.artist.is_empty() || !self.title.is_empty()
    }

    /// Position of the artist within the rendered string.
    ///
    /// Returns `(start, length - 1)` in Unicode scalar values, or `None`
    /// when the artist is empty.
    #[must_use]
    pub fn artist_range(&self) -> Option<(usize, usize)> {
        if self.artist.is_empty() {
            return None;
        }

        let start = self.prefix.chars().count();
        Some((start, self.artist.chars().count() - 1))
    }

    /// Position of the title within the rendered string.
    ///
    /// Returns `(start, length - 1)` in Unicode scalar values, or `None`
    /// when the title is empty. The separator only shifts the title when
    /// an artist is rendered before it.
    #[must_use]
    pub fn title_range(&self) -> Option<(usize, usize)> {
        if self.title.is_empty() {
            return None;
        }

        let mut start = self.prefix.chars().count();
        if !self.artist.is_empty() {
            start += self.artist.chars().count() + self.separator.chars().count();
        }
        Some((start, self.title.chars().count() - 1))
    }
}

impl From<&Metadata> for StructuredText {
    /// Builds the pre-formatting layout from a metadata snapshot.
    fn from(metadata: &Metadata) -> Self {
        let mut text = Self::new(metadata.artist.clone(), metadata.title.clone());
        text.input_name = metadata.source.clone();
        text
    }
}

impl fmt::Display for StructuredText {
    /// Renders the full string, omitting the separator when either side of
    /// it is empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)?;
        if !self.artist.is_empty() {
            f.write_str(&self.artist)?;
        }
        if !self.artist.is_empty() && !self.title.is_empty() {
            f.write_str(&self.separator)?;
        }
        if !self.title.is_empty() {
            f.write_str(&self.title)?;
        }
        f.write_str(&self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Extracts the substring addressed by a `(start, length - 1)` range,
    /// converting scalar-value offsets back to byte offsets.
    fn substring(rendered: &str, range: (usize, usize)) -> String {
        rendered
            .chars()
            .skip(range.0)
            .take(range.1 + 1)
            .collect()
    }

    #[test]
    fn renders_all_fields() {
        let mut text = StructuredText::new("Queen", "Bohemian Rhapsody");
        text.prefix = "🎵 ".to_string();

        assert_eq!(text.to_string(), "🎵 Queen - Bohemian Rhapsody");
    }

    #[test]
    fn no_dangling_separator() {
        let text = StructuredText::new("", "Bohemian Rhapsody");
        assert_eq!(text.to_string(), "Bohemian Rhapsody");

        let text = StructuredText::new("Queen", "");
        assert_eq!(text.to_string(), "Queen");

        let mut text = StructuredText::new("", "");
        text.prefix = "> ".to_string();
        text.suffix = " <".to_string();
        assert_eq!(text.to_string(), "> <");
        assert!(!text.has_content());
    }

    #[test]
    fn ranges_count_unicode_scalars() {
        let mut text = StructuredText::new("Queen", "Bohemian Rhapsody");
        text.prefix = "🎵 ".to_string();

        // The prefix is two scalar values, not five bytes.
        assert_eq!(text.artist_range(), Some((2, 4)));
        assert_eq!(text.title_range(), Some((10, 16)));
    }

    #[test]
    fn length_minus_one_convention() {
        let text = StructuredText::new("Beyoncé", "Halo");

        // Seven scalars minus one.
        assert_eq!(text.artist_range(), Some((0, 6)));
    }

    #[test]
    fn empty_fields_have_no_range() {
        let text = StructuredText::new("", "Halo");
        assert_eq!(text.artist_range(), None);
        assert_eq!(text.title_range(), Some((0, 3)));

        let text = StructuredText::new("Beyoncé", "");
        assert_eq!(text.title_range(), None);
    }

    #[test]
    fn ranges_round_trip_through_rendering() {
        let mut text = StructuredText::new("Beyoncé", "Déjà Vu");
        text.prefix = "🎶 nu: ".to_string();
        text.suffix = " 🎶".to_string();
        let rendered = text.to_string();

        assert_eq!(substring(&rendered, text.artist_range().unwrap()), "Beyoncé");
        assert_eq!(substring(&rendered, text.title_range().unwrap()), "Déjà Vu");
    }

    #[test]
    fn from_metadata_carries_source() {
        let mut metadata = Metadata::new("Queen", "One Vision");
        metadata.source = "live".to_string();

        let text = StructuredText::from(&metadata);
        assert_eq!(text.input_name, "live");
        assert_eq!(text.to_string(), "Queen - One Vision");
    }
}

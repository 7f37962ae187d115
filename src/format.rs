//! Text formatters applied between selection and delivery.
//!
//! Formatters are small, deterministic, in-place transforms over a
//! [`StructuredText`]. Inputs and outputs each carry an ordered chain of
//! them; the router applies the input's chain first, then the output's.
//! Because they mutate the structured fields rather than a flat string,
//! positional tags derived afterwards remain correct.
//!
//! The catalog is a closed set resolved by name from the configuration
//! file: `uppercase`, `lowercase`, `titlecase` and `rds`.

use std::sync::Arc;

use crate::{
    error::{Error, Result},
    text::StructuredText,
};

/// An in-place text transform.
///
/// Implementations must be deterministic and safe to re-invoke with the
/// same input.
pub trait Formatter: Send + Sync {
    /// Catalog name this formatter is resolved by.
    fn name(&self) -> &'static str;

    /// Transforms the text in place.
    fn format(&self, text: &mut StructuredText);
}

/// Resolves a formatter by its catalog name.
///
/// # Errors
///
/// Returns `NotFound` for names outside the catalog; this is a fatal
/// configuration error at startup.
pub fn formatter_by_name(name: &str) -> Result<Arc<dyn Formatter>> {
    match name {
        "uppercase" => Ok(Arc::new(Uppercase)),
        "lowercase" => Ok(Arc::new(Lowercase)),
        "titlecase" => Ok(Arc::new(TitleCase)),
        "rds" => Ok(Arc::new(RdsText)),
        other => Err(Error::not_found(format!("unknown formatter {other:?}"))),
    }
}

/// Resolves an ordered formatter chain from configuration names.
///
/// # Errors
///
/// Returns `NotFound` for any name outside the catalog.
pub fn chain_from_names(names: &[String]) -> Result<Vec<Arc<dyn Formatter>>> {
    names.iter().map(|name| formatter_by_name(name)).collect()
}

/// Uppercases artist and title.
pub struct Uppercase;

impl Formatter for Uppercase {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    fn format(&self, text: &mut StructuredText) {
        text.artist = text.artist.to_uppercase();
        text.title = text.title.to_uppercase();
    }
}

/// Lowercases artist and title.
pub struct Lowercase;

impl Formatter for Lowercase {
    fn name(&self) -> &'static str {
        "lowercase"
    }

    fn format(&self, text: &mut StructuredText) {
        text.artist = text.artist.to_lowercase();
        text.title = text.title.to_lowercase();
    }
}

/// Title-cases artist and title: the first letter of every
/// whitespace-separated word is uppercased, the rest lowercased.
pub struct TitleCase;

impl TitleCase {
    fn apply(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut at_word_start = true;
        for c in value.chars() {
            if c.is_whitespace() {
                at_word_start = true;
                result.push(c);
            } else if at_word_start {
                result.extend(c.to_uppercase());
                at_word_start = false;
            } else {
                result.extend(c.to_lowercase());
            }
        }
        result
    }
}

impl Formatter for TitleCase {
    fn name(&self) -> &'static str {
        "titlecase"
    }

    fn format(&self, text: &mut StructuredText) {
        text.artist = Self::apply(&text.artist);
        text.title = Self::apply(&text.title);
    }
}

/// Simplifies text for RDS RadioText displays.
///
/// Receivers in the field handle little beyond the basic character set, so
/// this folds common Latin diacritics to ASCII, replaces typographic
/// punctuation, and substitutes a space for anything else non-ASCII.
/// Applied to all five fields, since prefix and suffix reach the display
/// too.
pub struct RdsText;

impl RdsText {
    fn apply(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => result.push('a'),
                'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => result.push('A'),
                'é' | 'è' | 'ê' | 'ë' => result.push('e'),
                'É' | 'È' | 'Ê' | 'Ë' => result.push('E'),
                'í' | 'ì' | 'î' | 'ï' => result.push('i'),
                'Í' | 'Ì' | 'Î' | 'Ï' => result.push('I'),
                'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => result.push('o'),
                'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' => result.push('O'),
                'ú' | 'ù' | 'û' | 'ü' => result.push('u'),
                'Ú' | 'Ù' | 'Û' | 'Ü' => result.push('U'),
                'ý' | 'ÿ' => result.push('y'),
                'Ý' => result.push('Y'),
                'ñ' => result.push('n'),
                'Ñ' => result.push('N'),
                'ç' => result.push('c'),
                'Ç' => result.push('C'),
                'ß' => result.push_str("ss"),
                'æ' => result.push_str("ae"),
                'Æ' => result.push_str("AE"),
                '‘' | '’' | '‚' | '`' => result.push('\''),
                '“' | '”' | '„' => result.push('"'),
                '–' | '—' | '−' => result.push('-'),
                '…' => result.push_str("..."),
                '\u{a0}' => result.push(' '),
                c if c.is_ascii() => result.push(c),
                _ => result.push(' '),
            }
        }
        result
    }
}

impl Formatter for RdsText {
    fn name(&self) -> &'static str {
        "rds"
    }

    fn format(&self, text: &mut StructuredText) {
        text.prefix = Self::apply(&text.prefix);
        text.artist = Self::apply(&text.artist);
        text.separator = Self::apply(&text.separator);
        text.title = Self::apply(&text.title);
        text.suffix = Self::apply(&text.suffix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercase_leaves_affixes_alone() {
        let mut text = StructuredText::new("Queen", "One Vision");
        text.prefix = "np: ".to_string();

        Uppercase.format(&mut text);
        assert_eq!(text.to_string(), "np: QUEEN - ONE VISION");
    }

    #[test]
    fn lowercase() {
        let mut text = StructuredText::new("QUEEN", "ONE VISION");
        Lowercase.format(&mut text);
        assert_eq!(text.to_string(), "queen - one vision");
    }

    #[test]
    fn titlecase_rebuilds_every_word() {
        let mut text = StructuredText::new("the beatles", "ob-la-di, OB-LA-DA");
        TitleCase.format(&mut text);
        assert_eq!(text.to_string(), "The Beatles - Ob-la-di, Ob-la-da");
    }

    #[test]
    fn rds_folds_to_ascii() {
        let mut text = StructuredText::new("Beyoncé", "Déjà Vu — “live”");
        RdsText.format(&mut text);
        assert_eq!(text.to_string(), "Beyonce - Deja Vu - \"live\"");
    }

    #[test]
    fn rds_covers_affixes() {
        let mut text = StructuredText::new("Queen", "One Vision");
        text.prefix = "🎵 ".to_string();

        RdsText.format(&mut text);
        assert_eq!(text.to_string(), "  Queen - One Vision");
    }

    #[test]
    fn formatters_are_idempotent() {
        let mut once = StructuredText::new("Beyoncé", "déjà vu");
        for formatter in ["titlecase", "rds"] {
            formatter_by_name(formatter).unwrap().format(&mut once);
        }

        let mut twice = once.clone();
        for formatter in ["titlecase", "rds"] {
            formatter_by_name(formatter).unwrap().format(&mut twice);
        }
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(formatter_by_name("sparkles").is_err());
        assert!(chain_from_names(&["uppercase".to_string(), "sparkles".to_string()]).is_err());
    }
}

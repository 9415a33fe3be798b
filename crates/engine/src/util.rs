//! Internal helpers for input validation and normalization.
//!
//! These utilities are **not** part of the public API. They centralize the
//! text rules shared by accounts, categories, budgets and transactions so every
//! entity trims and compares descriptions the same way.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

/// Trim a required description and collapse inner whitespace.
pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let mut out = String::new();
    for token in value.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    if out.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} description must not be empty"
        )));
    }
    Ok(out)
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Comparison key for descriptions: accents stripped, lowercase, punctuation
/// folded into single spaces. "Café & Bar" and "cafe bar" share a key.
///
/// A description without a single letter or digit has no key and is rejected.
pub(crate) fn normalize_key(input: &str, label: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let key = out.trim_end().to_string();
    if key.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} description needs at least one letter or digit"
        )));
    }
    Ok(key)
}

/// Amounts on transactions, templates and budgets must be strictly positive;
/// direction is carried by the kind.
pub(crate) fn ensure_positive_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount_minor must be > 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_collapses_whitespace() {
        assert_eq!(
            normalize_required_text("  Daily   groceries ", "category").unwrap(),
            "Daily groceries"
        );
        assert!(normalize_required_text("   ", "category").is_err());
    }

    #[test]
    fn key_ignores_case_accents_and_punctuation() {
        assert_eq!(normalize_key("Café & Bar", "account").unwrap(), "cafe bar");
        assert_eq!(normalize_key("  CAFE-bar!! ", "account").unwrap(), "cafe bar");
        assert_eq!(normalize_key("Über", "account").unwrap(), "uber");
    }

    #[test]
    fn key_needs_a_letter_or_digit() {
        assert!(matches!(
            normalize_key("!!!", "category"),
            Err(EngineError::InvalidName(_))
        ));
        assert_eq!(normalize_key("#1", "category").unwrap(), "1");
    }
}

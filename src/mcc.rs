//! MCC token extraction from free-text statement fields.
//!
//! A candidate is a whitespace-separated token starting with `MCC`
//! (case-insensitive) whose remainder is all digits, e.g. `MCC5812`.
//! Tokens with a non-numeric remainder are not candidates and are dropped
//! silently; two or more valid candidates in one record are ambiguous and
//! abort the record's batch.

use anyhow::Result;

use crate::error::Error;

const CODE_PREFIX: &str = "MCC";

/// Extract the MCC from one free-text field.
pub fn extract(text: &str) -> Result<Option<u32>> {
    extract_from_fields([text])
}

/// Extract the MCC from a whole record, scanning the tokens of every field.
pub fn extract_from_fields<'a, I>(fields: I) -> Result<Option<u32>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidates = Vec::new();
    for field in fields {
        for word in field.split_whitespace() {
            if let Some(code) = parse_candidate(word) {
                candidates.push(code);
            }
        }
    }

    match candidates.len() {
        0 => Ok(None),
        1 => Ok(Some(candidates[0])),
        _ => Err(Error::AmbiguousCode(candidates).into()),
    }
}

/// `Some(code)` when the token is a syntactically valid MCC candidate.
fn parse_candidate(word: &str) -> Option<u32> {
    let prefix = word.get(..CODE_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(CODE_PREFIX) {
        return None;
    }

    let rest = &word[CODE_PREFIX.len()..];
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

//! Reference-site lookup for MCC codes missing from the local cache.
//!
//! One code maps to one page, `GET {base}/{code}`, whose single `<h1>`
//! heading carries the text `"{code}: {name}"`. A lookup is a single
//! attempt with the HTTP client's default timeout; retrying is the
//! caller's decision, not this module's.

use anyhow::{Context, Result};

use crate::error::Error;

pub const DEFAULT_REFERENCE_URL: &str = "https://mcc-codes.ru/code";

/// Where unresolved codes come from. The production implementation is
/// [`ReferenceSite`]; tests substitute an in-memory source.
pub trait CodeSource: Send + Sync {
    fn fetch(&self, code: u32) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ReferenceSite {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ReferenceSite {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_REFERENCE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("mcc-import/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }
}

impl CodeSource for ReferenceSite {
    fn fetch(&self, code: u32) -> Result<String> {
        let url = format!("{}/{}", self.base_url, code);
        eprintln!("[mcc-import] fetching MCC {code} from {url}");

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| Error::LookupUnavailable {
                code,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::LookupUnavailable {
                code,
                reason: format!("HTTP {status}"),
            }
            .into());
        }

        let body = response.text().map_err(|e| Error::LookupUnavailable {
            code,
            reason: e.to_string(),
        })?;

        parse_reference_page(code, &body)
    }
}

/// Pull the category name for `code` out of a reference page body.
pub fn parse_reference_page(code: u32, html: &str) -> Result<String> {
    let headings = tag_blocks(html, "h1");
    if headings.len() != 1 {
        return Err(Error::CodeNotFound { code }.into());
    }

    let text = strip_tags(headings[0]);
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(Error::MalformedPage {
            code,
            detail: format!("heading {text:?} does not have the form \"code: name\""),
        }
        .into());
    }

    let heading_code: u32 = parts[0].parse().map_err(|_| Error::MalformedPage {
        code,
        detail: format!("heading code {:?} is not numeric", parts[0]),
    })?;
    if heading_code != code {
        return Err(Error::MalformedPage {
            code,
            detail: format!("heading is for MCC {heading_code}"),
        }
        .into());
    }

    Ok(parts[1].to_string())
}

/// Inner content of every `<tag ...>...</tag>` block, case-insensitive.
fn tag_blocks<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    // ASCII lowercasing keeps byte offsets valid for the original string.
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut blocks = Vec::new();
    let mut from = 0;
    while let Some(rel) = lower[from..].find(&open) {
        let after_open = from + rel + open.len();
        // Require a real tag boundary so `<h1x>` is not a match.
        match lower.as_bytes().get(after_open).copied() {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') | Some(b'/') => {}
            _ => {
                from = after_open;
                continue;
            }
        }

        let Some(open_end) = lower[after_open..].find('>') else {
            break;
        };
        let inner_start = after_open + open_end + 1;
        let Some(close_rel) = lower[inner_start..].find(&close) else {
            break;
        };
        let inner_end = inner_start + close_rel;

        blocks.push(&html[inner_start..inner_end]);
        from = inner_end + close.len();
    }
    blocks
}

/// Drop markup from a tag's inner content and collapse whitespace.
fn strip_tags(block: &str) -> String {
    let mut out = String::with_capacity(block.len());
    let mut in_tag = false;
    for ch in block.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

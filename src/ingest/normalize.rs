// src/ingest/normalize.rs
//! Raw feed entry -> [`NewsItem`], plus the summary sanitizer.

use feed_rs::model::Entry;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::NewsItem;

/// Used when an entry has neither a summary nor a content body.
pub const SUMMARY_PLACEHOLDER: &str = "Summary not available";

/// An entry that cannot become a [`NewsItem`]. Only that entry is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("entry '{entry_id}' skipped: {reason}")]
pub struct MalformedEntry {
    pub entry_id: String,
    pub reason: &'static str,
}

fn re_script() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("script regex")
    })
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<[a-z!/?][^>]*>").expect("tag regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn sanitize_pass(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s);

    // 2) Drop script/style bodies, then every remaining tag
    let no_script = re_script().replace_all(&decoded, "");
    let no_tags = re_tags().replace_all(&no_script, "");

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    let quoted = no_tags
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    re_ws().replace_all(&quoted, " ").trim().to_string()
}

/// Input beyond this many chars is cut before sanitizing.
pub const MAX_SANITIZE_CHARS: usize = 8_192;

/// Upper bound on decode/strip passes for one text.
const MAX_SANITIZE_PASSES: usize = 8;

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Strip markup from feed text and return plain text.
///
/// Passes repeat until the text stops changing, so
/// `sanitize(&sanitize(s)) == sanitize(s)` also holds for doubly-escaped input
/// like `&amp;lt;b&amp;gt;`. Work per call is bounded: the input is cut to
/// [`MAX_SANITIZE_CHARS`] and at most `MAX_SANITIZE_PASSES` passes run. Text
/// still changing after that (escape nesting deeper than any real feed) loses
/// its remaining `&` and `<` characters, which leaves nothing to decode or
/// strip.
pub fn sanitize(s: &str) -> String {
    let mut cur = sanitize_pass(truncate_chars(s, MAX_SANITIZE_CHARS));
    for _ in 0..MAX_SANITIZE_PASSES {
        let next = sanitize_pass(&cur);
        if next == cur {
            return cur;
        }
        cur = next;
    }
    let scrubbed = cur.replace(['&', '<'], " ");
    re_ws().replace_all(&scrubbed, " ").trim().to_string()
}

/// Convert one raw entry into a [`NewsItem`] attributed to `source`.
///
/// Summary order: entry summary, then content body, then
/// [`SUMMARY_PLACEHOLDER`]. Candidates that are blank after sanitizing count
/// as absent. A missing publish time is not an error.
pub fn normalize(entry: &Entry, source: &str) -> Result<NewsItem, MalformedEntry> {
    let malformed = |reason| MalformedEntry {
        entry_id: entry.id.clone(),
        reason,
    };

    let title = entry
        .title
        .as_ref()
        .map(|t| sanitize(&t.content))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| malformed("missing title"))?;

    let link = entry
        .links
        .iter()
        .map(|l| l.href.trim())
        .find(|href| !href.is_empty())
        .ok_or_else(|| malformed("missing link"))?
        .to_string();

    let primary = entry.summary.as_ref().map(|t| t.content.as_str());
    let secondary = entry.content.as_ref().and_then(|c| c.body.as_deref());
    let summary = [primary, secondary]
        .into_iter()
        .flatten()
        .map(sanitize)
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string());

    Ok(NewsItem {
        title,
        summary,
        link,
        source: source.to_string(),
        published_at: entry.published,
    })
}

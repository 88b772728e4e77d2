//! WebVTT subtitle parsing.
//!
//! YouTube auto-captions are "rolling": each cue repeats the previous cue's last line
//! before adding a new one, and word-level timing is embedded as inline tags. Parsing
//! strips the markup and collapses a line that repeats its immediate predecessor.

use crate::models::CaptionItem;
use regex::Regex;
use std::sync::LazyLock;

static TIMING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\d+:)?\d{2}:\d{2}[.,]\d{3})\s+-->\s+((?:\d+:)?\d{2}:\d{2}[.,]\d{3})")
        .expect("timing regex is valid")
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

/// Parse WebVTT content into caption items.
///
/// The header block, NOTE/STYLE blocks, cue identifiers and timing lines are dropped.
/// A text line equal to the line right before it is skipped; the same phrase
/// appearing again later is kept.
pub fn parse_vtt(content: &str) -> Vec<CaptionItem> {
    let lines: Vec<&str> = content.lines().map(|l| l.trim_end_matches('\r')).collect();

    let mut items = Vec::new();
    let mut cue: Option<(f64, f64)> = None;
    let mut in_comment = false;
    let mut block_start = true;
    let mut previous: Option<String> = None;

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();

        if line.is_empty() {
            in_comment = false;
            block_start = true;
            continue;
        }

        if let Some(caps) = TIMING_REGEX.captures(line) {
            let start = parse_timestamp(&caps[1]).unwrap_or(0.0);
            let end = parse_timestamp(&caps[2]).unwrap_or(start);
            cue = Some((start, (end - start).max(0.0)));
            in_comment = false;
            block_start = false;
            continue;
        }

        // Comment and style blocks only open a block; inside a cue the same words are text.
        if std::mem::take(&mut block_start) && is_non_cue_block(line) {
            in_comment = true;
            continue;
        }

        if cue.is_none() || in_comment {
            // Header block ("WEBVTT", "Kind:", "Language:") and anything before the first cue.
            continue;
        }

        // Cue identifier: the line right before a timing line.
        let next_is_timing = lines
            .get(i + 1)
            .map(|next| TIMING_REGEX.is_match(next.trim()))
            .unwrap_or(false);
        if next_is_timing {
            continue;
        }

        let text = clean_line(line);
        if text.is_empty() {
            continue;
        }

        if previous.as_deref() == Some(text.as_str()) {
            continue;
        }
        previous = Some(text.clone());

        if let Some((start, duration)) = cue {
            items.push(CaptionItem::new(text, start, duration));
        }
    }

    items
}

fn is_non_cue_block(line: &str) -> bool {
    line == "NOTE"
        || line.starts_with("NOTE ")
        || line.starts_with("NOTE\t")
        || line == "STYLE"
        || line == "REGION"
}

/// Strip inline tags, decode entities and normalize whitespace.
fn clean_line(line: &str) -> String {
    let stripped = TAG_REGEX.replace_all(line, "");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the HTML entities that show up in caption text.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
fn parse_timestamp(ts: &str) -> Option<f64> {
    let ts = ts.replace(',', ".");
    let mut parts: Vec<&str> = ts.split(':').collect();
    let seconds: f64 = parts.pop()?.parse().ok()?;
    let minutes: f64 = parts.pop().map(str::parse).transpose().ok()?.unwrap_or(0.0);
    let hours: f64 = parts.pop().map(str::parse).transpose().ok()?.unwrap_or(0.0);
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

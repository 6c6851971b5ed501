// this_file: backends/t2p-hb/src/fallback.rs

//! Fallback font selection and coverage-driven run splitting.

use log::debug;
use std::ops::Range;
use std::sync::Arc;
use t2p_core::{FontKey, FontRole, MissingFontError, Result, TextRun};
use t2p_fontdb::{FontCache, ResolvedFont};
use t2p_unicode::is_default_ignorable;

/// Characters of `text` the primary face cannot render, in first-seen order.
pub fn missing_chars(text: &str, primary: &ResolvedFont) -> Vec<char> {
    let mut missing = Vec::new();
    for ch in text.chars() {
        if !is_default_ignorable(ch) && !primary.covers(ch) && !missing.contains(&ch) {
            missing.push(ch);
        }
    }
    missing
}

/// Pick the candidate covering the most of `missing`.
///
/// Stops early on full coverage. No candidate covering anything is a
/// [`MissingFontError`] naming the requested family and the characters.
pub fn select_fallback(
    cache: &FontCache,
    key: &FontKey,
    missing: &[char],
) -> Result<Arc<ResolvedFont>> {
    let mut best: Option<(usize, Arc<ResolvedFont>)> = None;
    for candidate in cache.fallbacks().candidates_for(missing) {
        let Some(font) = cache.resolve_fallback(candidate, key.weight, key.style)? else {
            continue;
        };
        let covered = font.coverage_count(missing);
        debug!(
            target: "t2p::shape",
            "fallback {candidate:?} -> {} covers {covered}/{}",
            font.family_name(),
            missing.len()
        );
        if best.as_ref().map_or(true, |(count, _)| covered > *count) {
            best = Some((covered, font));
        }
        if covered == missing.len() {
            break;
        }
    }
    match best {
        Some((covered, font)) if covered > 0 => Ok(font),
        _ => Err(MissingFontError::new(&key.family, key.weight, key.style, &key.stretch)
            .with_chars(missing.iter().copied())
            .into()),
    }
}

/// A slice of a run served by one face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageSpan {
    pub range: Range<usize>,
    pub role: FontRole,
}

/// Split `run` so every span uses a face that covers its characters.
///
/// Ignorable characters stay with the span they follow. Characters neither
/// face covers are appended to `uncovered`.
pub fn split_by_coverage(
    text: &str,
    run: &TextRun,
    primary: &ResolvedFont,
    fallback: Option<&ResolvedFont>,
    uncovered: &mut Vec<char>,
) -> Vec<CoverageSpan> {
    let mut spans: Vec<CoverageSpan> = Vec::new();
    for (offset, ch) in text[run.range.clone()].char_indices() {
        let start = run.range.start + offset;
        let end = start + ch.len_utf8();
        let role = if is_default_ignorable(ch) {
            spans.last().map(|s| s.role).unwrap_or(FontRole::Primary)
        } else if primary.covers(ch) {
            FontRole::Primary
        } else if fallback.is_some_and(|f| f.covers(ch)) {
            FontRole::Fallback
        } else {
            if !uncovered.contains(&ch) {
                uncovered.push(ch);
            }
            FontRole::Primary
        };
        match spans.last_mut() {
            Some(span) if span.role == role => span.range.end = end,
            _ => spans.push(CoverageSpan { range: start..end, role }),
        }
    }
    if spans.is_empty() {
        spans.push(CoverageSpan {
            range: run.range.clone(),
            role: FontRole::Primary,
        });
    }
    spans
}

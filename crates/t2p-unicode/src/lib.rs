// this_file: crates/t2p-unicode/src/lib.rs

//! Direction and script segmentation.
//!
//! Text is split into maximal runs that share one direction and one coarse
//! script bucket. Characters without a strong direction or script (digits,
//! punctuation, whitespace) inherit the values of the preceding character,
//! starting from the element's base direction and the Latin bucket.

use icu_properties::{
    maps::{self, CodePointMapDataBorrowed},
    sets::{self, CodePointSetDataBorrowed},
    Script,
};
use log::trace;
use t2p_core::{Direction, ScriptBucket, TextRun};
use unicode_bidi::{bidi_class, BidiClass};

/// Splits text into [`TextRun`]s.
pub struct Segmenter {
    script_map: CodePointMapDataBorrowed<'static, Script>,
    alphabetic: CodePointSetDataBorrowed<'static>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            script_map: maps::script(),
            alphabetic: sets::alphabetic(),
        }
    }

    /// Strong direction of a character, `None` for neutrals and weak types.
    pub fn direction_of(&self, ch: char) -> Option<Direction> {
        match bidi_class(ch) {
            BidiClass::R | BidiClass::AL | BidiClass::RLE | BidiClass::RLO => {
                Some(Direction::RightToLeft)
            }
            BidiClass::L | BidiClass::LRE | BidiClass::LRO => Some(Direction::LeftToRight),
            _ => None,
        }
    }

    pub fn script_of(&self, ch: char) -> ScriptBucket {
        if matches!(bidi_class(ch), BidiClass::R | BidiClass::AL)
            || ('\u{0600}'..='\u{06FF}').contains(&ch)
        {
            return ScriptBucket::Arabic;
        }
        match self.script_map.get(ch) {
            Script::Han | Script::Hiragana | Script::Katakana | Script::Hangul | Script::Bopomofo => {
                ScriptBucket::Cjk
            }
            _ if self.alphabetic.contains(ch) => ScriptBucket::Latin,
            _ => ScriptBucket::Neutral,
        }
    }

    /// Split `text` into direction+script runs.
    ///
    /// An empty string yields one zero-length run carrying `base`.
    pub fn segment(&self, text: &str, base: Direction) -> Vec<TextRun> {
        if text.is_empty() {
            return vec![TextRun {
                range: 0..0,
                direction: base,
                script: ScriptBucket::Latin,
            }];
        }

        let mut runs: Vec<TextRun> = Vec::new();
        let mut prev_dir = base;
        let mut prev_script = ScriptBucket::Latin;

        for (offset, ch) in text.char_indices() {
            let dir = self.direction_of(ch).unwrap_or(prev_dir);
            let script = match self.script_of(ch) {
                ScriptBucket::Neutral => prev_script,
                bucket => bucket,
            };
            let end = offset + ch.len_utf8();

            match runs.last_mut() {
                Some(run) if run.direction == dir && run.script == script => run.range.end = end,
                _ => runs.push(TextRun {
                    range: offset..end,
                    direction: dir,
                    script,
                }),
            }
            prev_dir = dir;
            prev_script = script;
        }

        trace!(target: "t2p::shape", "segmented {} bytes into {} runs", text.len(), runs.len());
        runs
    }
}

/// Embedding level of a run inside a paragraph of direction `base`.
pub fn bidi_level(direction: Direction, base: Direction) -> u8 {
    match (base, direction) {
        (Direction::LeftToRight, Direction::LeftToRight) => 0,
        (_, Direction::RightToLeft) => 1,
        (Direction::RightToLeft, Direction::LeftToRight) => 2,
    }
}

/// Visual order of items carrying the given embedding levels (UAX #9, rule L2).
///
/// Returns logical indices in left-to-right display order.
pub fn visual_order(levels: &[u8]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..levels.len()).collect();
    let Some(&highest) = levels.iter().max() else {
        return order;
    };
    let Some(lowest_odd) = levels.iter().copied().filter(|l| l % 2 == 1).min() else {
        return order;
    };

    let mut level = highest;
    while level >= lowest_odd {
        let mut i = 0;
        while i < order.len() {
            if levels[order[i]] >= level {
                let start = i;
                while i < order.len() && levels[order[i]] >= level {
                    i += 1;
                }
                order[start..i].reverse();
            } else {
                i += 1;
            }
        }
        if level == 0 {
            break;
        }
        level -= 1;
    }
    order
}

/// Characters that never need a glyph: controls, boundary neutrals and
/// explicit directional formatting.
pub fn is_default_ignorable(ch: char) -> bool {
    ch.is_control()
        || matches!(
            bidi_class(ch),
            BidiClass::BN
                | BidiClass::LRE
                | BidiClass::RLE
                | BidiClass::LRO
                | BidiClass::RLO
                | BidiClass::PDF
                | BidiClass::LRI
                | BidiClass::RLI
                | BidiClass::FSI
                | BidiClass::PDI
        )
}

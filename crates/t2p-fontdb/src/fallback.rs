// this_file: crates/t2p-fontdb/src/fallback.rs

//! Per-script fallback candidates.
//!
//! Names are platform specific, so the table is plain configuration. A
//! candidate starting with `:lang=` is a language query rather than a family.

use serde::{Deserialize, Serialize};
use std::path::Path;
use t2p_core::Result;

/// Candidates used for characters inside any of `ranges` (inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub name: String,
    pub ranges: Vec<(u32, u32)>,
    pub candidates: Vec<String>,
}

impl FallbackRule {
    pub fn matches(&self, ch: char) -> bool {
        let cp = ch as u32;
        self.ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackTable {
    pub rules: Vec<FallbackRule>,
    pub default: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for FallbackTable {
    fn default() -> Self {
        let generic = ["Apple Symbols", "Arial Unicode MS", "Last Resort"];
        Self {
            rules: vec![
                FallbackRule {
                    name: "arabic".into(),
                    ranges: vec![(0x0600, 0x06FF), (0x0750, 0x077F)],
                    candidates: names(&[
                        ":lang=ar",
                        "Geeza Pro",
                        "Noto Sans Arabic",
                        "Apple Symbols",
                        "Arial Unicode MS",
                        "Last Resort",
                    ]),
                },
                FallbackRule {
                    name: "cjk".into(),
                    ranges: vec![(0x4E00, 0x9FFF), (0x3400, 0x4DBF)],
                    candidates: names(&[
                        ":lang=zh-cn",
                        "Hiragino Sans GB",
                        "PingFang SC",
                        "Noto Sans CJK SC",
                        "Noto Sans SC",
                        "Arial Unicode MS",
                        "Last Resort",
                    ]),
                },
                FallbackRule {
                    name: "symbols".into(),
                    ranges: vec![(0x2600, 0x27FF), (0x1F300, 0x1FAFF)],
                    candidates: names(&[
                        "Apple Symbols",
                        "Symbola",
                        "Segoe UI Symbol",
                        "Arial Unicode MS",
                        "Last Resort",
                    ]),
                },
                FallbackRule {
                    name: "extended".into(),
                    ranges: vec![(0x1001, 0x10FFFF)],
                    candidates: names(&generic),
                },
            ],
            default: names(&generic),
        }
    }
}

impl FallbackTable {
    /// Read a JSON table, e.g. `{"rules": [...], "default": [...]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Candidate list selected by the first missing character that falls in a rule.
    pub fn candidates_for(&self, missing: &[char]) -> &[String] {
        missing
            .iter()
            .find_map(|&ch| self.rules.iter().find(|rule| rule.matches(ch)))
            .map(|rule| rule.candidates.as_slice())
            .unwrap_or(&self.default)
    }
}

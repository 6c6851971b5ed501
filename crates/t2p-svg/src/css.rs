// this_file: crates/t2p-svg/src/css.rs

//! Inline `style` attribute declarations.

use std::fmt;

/// Ordered `property: value` declarations of one `style` attribute.
///
/// Later duplicates win on lookup, as in CSS. Property names are compared
/// case-insensitively; values are kept verbatim (trimmed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    decls: Vec<(String, String)>,
}

impl StyleMap {
    pub fn parse(style: &str) -> Self {
        let mut decls = Vec::new();
        for decl in split_declarations(style) {
            let Some((name, value)) = decl.split_once(':') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            if name.is_empty() {
                continue;
            }
            decls.push((name, value.to_string()));
        }
        Self { decls }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.decls
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.decls.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.decls.push((name.to_ascii_lowercase(), value));
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let value = self.get(name).map(str::to_string);
        self.decls.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        value
    }

    /// Keep only the declarations whose name satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.decls.retain(|(n, _)| keep(n));
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.decls.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl fmt::Display for StyleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.decls.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{name}:{value}")?;
        }
        Ok(())
    }
}

/// Split on `;` outside quotes and parentheses.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in style.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                out.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&style[start..]);
    out.into_iter().filter(|d| !d.trim().is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_lookup() {
        let style = StyleMap::parse("font-size: 12px; FILL:red;;fill: blue ");
        assert_eq!(style.get("font-size"), Some("12px"));
        assert_eq!(style.get("fill"), Some("blue"));
        assert_eq!(style.get("stroke"), None);
    }

    #[test]
    fn test_quoted_semicolons_survive() {
        let style = StyleMap::parse("font-family:'A;B', serif;font-feature-settings:\"liga\" 0");
        assert_eq!(style.get("font-family"), Some("'A;B', serif"));
        assert_eq!(style.get("font-feature-settings"), Some("\"liga\" 0"));
    }

    #[test]
    fn test_set_remove_and_display() {
        let mut style = StyleMap::parse("fill:red;stroke:none;opacity:0.5");
        style.set("fill", "blue");
        assert_eq!(style.remove("stroke").as_deref(), Some("none"));
        assert_eq!(style.to_string(), "opacity:0.5;fill:blue");
        style.retain(|n| n == "fill");
        assert_eq!(style.to_string(), "fill:blue");
    }

    #[test]
    fn test_important_is_stripped() {
        let style = StyleMap::parse("text-anchor: middle !important");
        assert_eq!(style.get("text-anchor"), Some("middle"));
    }

    #[test]
    fn test_garbage_is_ignored() {
        let style = StyleMap::parse("nonsense; :value; a:b");
        assert_eq!(style.iter().count(), 1);
        assert!(StyleMap::parse("").is_empty());
    }
}

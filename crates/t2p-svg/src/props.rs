// this_file: crates/t2p-svg/src/props.rs

//! Typed text properties and their inheritance through text/tspan chains.

use crate::css::StyleMap;
use crate::document::{Element, XML_NS};
use std::str::FromStr;
use svgtypes::{Length, LengthListParser, LengthUnit};
use t2p_core::{
    Direction, FeatureSetting, FontKey, FontStyle, TextAnchor, TextDecoration, VariationSetting,
};
use t2p_layout::TextStyle;

pub const DEFAULT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

const VENDOR_SPEC: &str = "-inkscape-font-specification";

/// Value of `name` on `el`: the `style` declaration wins over the attribute.
pub fn declared<'a>(el: &'a Element, style: &'a StyleMap, name: &str) -> Option<&'a str> {
    style
        .get(name)
        .or_else(|| el.attr(name))
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("inherit"))
}

/// Convert a length to user units; relative units resolve against `font_size`.
pub fn to_user_units(length: Length, font_size: f64) -> f64 {
    let n = length.number;
    match length.unit {
        LengthUnit::None | LengthUnit::Px => n,
        LengthUnit::Pt => n * 4.0 / 3.0,
        LengthUnit::Pc => n * 16.0,
        LengthUnit::In => n * 96.0,
        LengthUnit::Cm => n * 96.0 / 2.54,
        LengthUnit::Mm => n * 96.0 / 25.4,
        LengthUnit::Em => n * font_size,
        LengthUnit::Ex => n * font_size / 2.0,
        LengthUnit::Percent => n * font_size / 100.0,
    }
}

pub fn parse_length(value: &str, font_size: f64) -> Option<f64> {
    Length::from_str(&value.trim().to_ascii_lowercase())
        .ok()
        .map(|l| to_user_units(l, font_size))
        .filter(|v| v.is_finite())
}

/// Whitespace/comma separated lengths along one viewport axis; parsing stops
/// at the first bad item. Percentages resolve against `extent`, other
/// relative units against `font_size`.
pub fn parse_coordinate_list(value: &str, font_size: f64, extent: f64) -> Vec<f64> {
    let lower = value.to_ascii_lowercase();
    LengthListParser::from(lower.as_str())
        .map_while(|item| item.ok())
        .map(|l| match l.unit {
            LengthUnit::Percent => l.number * extent / 100.0,
            _ => to_user_units(l, font_size),
        })
        .collect()
}

/// `font-size` relative to the inherited size.
pub fn parse_font_size(value: &str, parent: f64) -> Option<f64> {
    let keyword = match value.trim().to_ascii_lowercase().as_str() {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(16.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "smaller" => Some(parent / 1.2),
        "larger" => Some(parent * 1.2),
        _ => None,
    };
    keyword
        .or_else(|| parse_length(value, parent))
        .filter(|size| *size >= 0.0)
}

/// `font-weight`, with `bolder`/`lighter` relative to the inherited weight.
pub fn parse_weight(value: &str, parent: u16) -> Option<u16> {
    match value.trim().to_ascii_lowercase().as_str() {
        "normal" => Some(400),
        "bold" => Some(700),
        "bolder" => Some(match parent {
            0..=349 => 400,
            350..=549 => 700,
            550..=899 => 900,
            w => w,
        }),
        "lighter" => Some(match parent {
            0..=99 => parent,
            100..=549 => 100,
            550..=749 => 400,
            _ => 700,
        }),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite())
            .map(|w| w.round().clamp(1.0, 1000.0) as u16),
    }
}

/// First family of a `font-family` list, unquoted.
pub fn first_family(value: &str) -> Option<String> {
    value
        .split(',')
        .next()
        .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string())
        .filter(|f| !f.is_empty())
}

/// `letter-spacing` / `word-spacing`; `normal` is zero.
pub fn parse_spacing(value: &str, font_size: f64) -> f64 {
    if value.trim().eq_ignore_ascii_case("normal") {
        return 0.0;
    }
    parse_length(value, font_size).unwrap_or(0.0)
}

/// Split `'tag' rest` items of a settings list.
fn tagged_items(value: &str) -> impl Iterator<Item = (String, &str)> {
    value.split(',').filter_map(|item| {
        let item = item.trim();
        let quote = item.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let rest = &item[1..];
        let end = rest.find(quote)?;
        let tag = &rest[..end];
        if tag.len() != 4 || !tag.is_ascii() {
            return None;
        }
        Some((tag.to_string(), rest[end + 1..].trim()))
    })
}

/// `font-feature-settings`: `"liga" 0, "smcp", 'kern' off`.
pub fn parse_features(value: &str) -> Vec<FeatureSetting> {
    if value.trim().eq_ignore_ascii_case("normal") {
        return Vec::new();
    }
    tagged_items(value)
        .filter_map(|(tag, rest)| {
            let value = match rest.to_ascii_lowercase().as_str() {
                "" | "on" => 1,
                "off" => 0,
                n => n.parse::<u32>().ok()?,
            };
            Some(FeatureSetting { tag, value })
        })
        .collect()
}

/// `font-variation-settings`: `'wght' 650, "wdth" 80`.
pub fn parse_variations(value: &str) -> Vec<VariationSetting> {
    if value.trim().eq_ignore_ascii_case("normal") {
        return Vec::new();
    }
    tagged_items(value)
        .filter_map(|(tag, rest)| {
            let value = rest.parse::<f32>().ok().filter(|v| v.is_finite())?;
            Some(VariationSetting { tag, value })
        })
        .collect()
}

/// Collapse whitespace per `xml:space`.
///
/// Newlines and tabs always become spaces; without `preserve`, runs of spaces
/// also collapse into one.
pub fn normalize_space(text: &str, preserve: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let ch = if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch };
        if !preserve && ch == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Inherited text properties at one point of the text tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedText {
    pub family: String,
    pub vendor_spec: Option<String>,
    pub font_size: f64,
    pub weight: u16,
    pub style: FontStyle,
    pub stretch: String,
    pub letter_spacing: f64,
    pub word_spacing: f64,
    pub text_anchor: Option<TextAnchor>,
    pub text_align: Option<TextAnchor>,
    pub decoration: TextDecoration,
    pub features: Vec<FeatureSetting>,
    pub variations: Vec<VariationSetting>,
    pub lang: Option<String>,
    pub direction: Option<Direction>,
    pub preserve_space: bool,
}

impl Default for ComputedText {
    fn default() -> Self {
        Self {
            family: DEFAULT_FAMILY.to_string(),
            vendor_spec: None,
            font_size: DEFAULT_FONT_SIZE,
            weight: 400,
            style: FontStyle::Normal,
            stretch: "normal".to_string(),
            letter_spacing: 0.0,
            word_spacing: 0.0,
            text_anchor: None,
            text_align: None,
            decoration: TextDecoration::default(),
            features: Vec::new(),
            variations: Vec::new(),
            lang: None,
            direction: None,
            preserve_space: false,
        }
    }
}

impl ComputedText {
    /// Properties of `el` layered over `self`.
    pub fn child(&self, el: &Element) -> Self {
        let mut next = self.clone();
        next.apply(el);
        next
    }

    pub fn apply(&mut self, el: &Element) {
        let style = StyleMap::parse(el.attr("style").unwrap_or(""));
        let get = |name: &str| declared(el, &style, name);

        if let Some(family) = get("font-family").and_then(first_family) {
            self.family = family;
        }
        if let Some(spec) = get(VENDOR_SPEC) {
            let spec = spec.trim_matches(|c| c == '"' || c == '\'').trim();
            self.vendor_spec = (!spec.is_empty()).then(|| spec.to_string());
        }
        if let Some(size) = get("font-size").and_then(|v| parse_font_size(v, self.font_size)) {
            self.font_size = size;
        }
        if let Some(weight) = get("font-weight").and_then(|v| parse_weight(v, self.weight)) {
            self.weight = weight;
        }
        if let Some(v) = get("font-style") {
            self.style = FontStyle::parse(v);
        }
        if let Some(v) = get("font-stretch") {
            self.stretch = v.to_string();
        }
        if let Some(v) = get("letter-spacing") {
            self.letter_spacing = parse_spacing(v, self.font_size);
        }
        if let Some(v) = get("word-spacing") {
            self.word_spacing = parse_spacing(v, self.font_size);
        }
        if let Some(anchor) = get("text-anchor").and_then(TextAnchor::parse) {
            self.text_anchor = Some(anchor);
        }
        if let Some(anchor) = get("text-align").and_then(TextAnchor::from_text_align) {
            self.text_align = Some(anchor);
        }
        if let Some(v) = get("text-decoration") {
            let parsed = TextDecoration::parse(v);
            self.decoration.underline |= parsed.underline;
            self.decoration.line_through |= parsed.line_through;
        }
        if let Some(v) = get("font-feature-settings") {
            self.features = parse_features(v);
        }
        if let Some(v) = get("font-variation-settings") {
            self.variations = parse_variations(v);
        }
        if let Some(dir) = get("direction").and_then(Direction::parse) {
            self.direction = Some(dir);
        }
        if let Some(lang) = el.attr_ns(XML_NS, "lang").or_else(|| el.attr("lang")) {
            let lang = lang.trim();
            self.lang = (!lang.is_empty()).then(|| lang.to_string());
        }
        if let Some(space) = el.attr_ns(XML_NS, "space") {
            self.preserve_space = space.trim() == "preserve";
        }
    }

    /// `text-anchor` if any was declared, else the mapped `text-align`.
    pub fn anchor(&self) -> TextAnchor {
        self.text_anchor.or(self.text_align).unwrap_or_default()
    }

    /// Weight used for matching; a `wght` coordinate overrides `font-weight`.
    pub fn match_weight(&self) -> u16 {
        self.variations
            .iter()
            .find(|v| v.tag.eq_ignore_ascii_case("wght"))
            .map(|v| v.value.round().clamp(100.0, 900.0) as u16)
            .unwrap_or(self.weight)
    }

    pub fn font_key(&self) -> FontKey {
        let mut key = FontKey::new(self.family.as_str())
            .with_weight(self.match_weight())
            .with_style(self.style)
            .with_stretch(self.stretch.as_str());
        if let Some(spec) = &self.vendor_spec {
            key = key.with_vendor_spec(spec.as_str());
        }
        key
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font: self.font_key(),
            font_size: self.font_size,
            letter_spacing: self.letter_spacing,
            word_spacing: self.word_spacing,
            anchor: self.anchor(),
            decoration: self.decoration,
            features: self.features.clone(),
            variations: self.variations.clone(),
            lang: self.lang.clone(),
        }
    }
}

// this_file: tests/conversion.rs

//! End-to-end conversion scenarios over the bundled DejaVu fonts.

use approx::assert_relative_eq;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use t2p::layout::{LayoutEngine, TextLayout};
use t2p::render::{OutlineCache, DEFAULT_OUTLINE_CACHE};
use t2p::shaping::Shaper;
use t2p::svg::collect_spans;
use t2p::{
    ConversionOptions, Converter, Document, FallbackRule, FallbackTable, FontCache,
    FontCacheConfig, FontStyle, StaticMatcher, T2pError,
};

const HEBREW_ALEF: char = '\u{05D0}';
const HEBREW_BET: char = '\u{05D1}';

fn fonts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/fonts")
}

fn font_cache() -> Arc<FontCache> {
    let _ = env_logger::builder().is_test(true).try_init();
    let matcher = StaticMatcher::new();
    matcher
        .register("DejaVu Sans", fonts_dir().join("DejaVuSans.ttf"), 0)
        .register("DejaVu Serif", fonts_dir().join("DejaVuSerif.ttf"), 0);
    let mut config = FontCacheConfig::ephemeral();
    config.fallbacks = FallbackTable {
        rules: vec![FallbackRule {
            name: "hebrew".into(),
            ranges: vec![(0x0590, 0x05FF)],
            candidates: vec!["DejaVu Sans".into()],
        }],
        default: Vec::new(),
    };
    Arc::new(FontCache::with_matcher(config, Box::new(matcher)))
}

fn converter(cache: &Arc<FontCache>, precision: usize) -> Converter {
    let options = ConversionOptions {
        precision,
        ..Default::default()
    };
    Converter::with_cache(options, cache.clone())
}

fn svg(body: &str) -> String {
    format!(r#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="200">{body}</svg>"#)
}

/// Lay out the first text element of `svg` the way the converter does.
fn layout_of(cache: &Arc<FontCache>, svg: &str) -> anyhow::Result<TextLayout> {
    let doc = Document::parse(svg)?;
    let text = doc.elements_named("text")[0];
    let tree = collect_spans(&doc, text, None);
    let shaper = Shaper::new(cache.clone());
    let outlines = OutlineCache::new(DEFAULT_OUTLINE_CACHE);
    let layout = LayoutEngine::new(&shaper, &outlines).layout(&tree.block)?;
    Ok(layout)
}

fn count_elements(xml: &str, local: &str) -> usize {
    Document::parse(xml).map_or(0, |doc| doc.elements_named(local).len())
}

#[test]
fn middle_anchored_hi_becomes_single_two_decimal_path() -> anyhow::Result<()> {
    let cache = font_cache();
    let input = svg(
        r#"<text x="100" y="50" font-family="DejaVu Sans" font-size="16" text-anchor="middle">Hi</text>"#,
    );
    let (output, result) = converter(&cache, 2).convert_str(&input)?;

    assert_eq!(count_elements(&output, "text"), 0);
    assert_eq!(count_elements(&output, "path"), 1);
    assert_eq!(result.text_count, 1);

    let doc = Document::parse(&output)?;
    let path = doc.elements_named("path")[0];
    let d = doc.element(path).and_then(|el| el.attr("d")).unwrap_or_default();
    assert!(!d.is_empty());
    for number in d.split_whitespace().filter(|t| !t.chars().all(|c| c.is_ascii_alphabetic())) {
        let decimals = number.split_once('.').map(|(_, frac)| frac.len());
        assert_eq!(decimals, Some(2), "{number}");
    }

    let (again, rerun) = converter(&cache, 2).convert_str(&output)?;
    assert_eq!(again, output);
    assert_eq!(rerun.text_count, 0);
    Ok(())
}

#[test]
fn anchors_shift_leftmost_origin_by_measured_width() -> anyhow::Result<()> {
    let cache = font_cache();
    for (anchor, factor) in [("start", 0.0), ("middle", 0.5), ("end", 1.0)] {
        let layout = layout_of(
            &cache,
            &svg(&format!(
                r#"<text x="100" y="50" font-family="DejaVu Sans" text-anchor="{anchor}">Hi</text>"#
            )),
        )?;
        let line = &layout.lines[0];
        let leftmost = line
            .glyphs
            .iter()
            .map(|g| g.placement.origin.x)
            .fold(f64::INFINITY, f64::min);
        assert_relative_eq!(leftmost, 100.0 - factor * line.width, epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn trailing_letter_spacing_is_not_measured() -> anyhow::Result<()> {
    let cache = font_cache();
    let layout = layout_of(
        &cache,
        &svg(r#"<text x="100" font-family="DejaVu Sans" font-size="2048" letter-spacing="10" text-anchor="middle">Hi</text>"#),
    )?;
    let line = &layout.lines[0];
    // H + i advances in font units at scale 1, one gap of spacing
    assert_relative_eq!(line.width, 1540.0 + 569.0 + 10.0, epsilon = 1e-9);
    assert_relative_eq!(line.anchor_offset, -line.width / 2.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn underline_covers_line_across_tspans() -> anyhow::Result<()> {
    let cache = font_cache();
    let layout = layout_of(
        &cache,
        &svg(r#"<text x="0" y="50" font-family="DejaVu Sans" font-size="20" letter-spacing="5" text-decoration="underline">AB<tspan>CD</tspan></text>"#),
    )?;
    assert_eq!(layout.lines.len(), 1);
    let line = &layout.lines[0];
    assert_eq!(line.leaves.len(), 2);
    let deco = line.decoration.expect("underlined line");
    assert_relative_eq!(deco.run.start_x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(deco.run.end_x, line.width, epsilon = 1e-9);
    Ok(())
}

#[test]
fn mixed_direction_text_is_visually_ordered() -> anyhow::Result<()> {
    let cache = font_cache();
    let layout = layout_of(
        &cache,
        &svg(&format!(
            r#"<text x="10" y="50" font-family="DejaVu Sans">A{HEBREW_ALEF}{HEBREW_BET}B</text>"#
        )),
    )?;
    let mut glyphs = layout.lines[0].glyphs.clone();
    glyphs.sort_by(|a, b| a.placement.origin.x.total_cmp(&b.placement.origin.x));
    let visual: Vec<Option<char>> = glyphs.iter().map(|g| g.character).collect();
    assert_eq!(
        visual,
        vec![Some('A'), Some(HEBREW_BET), Some(HEBREW_ALEF), Some('B')]
    );
    Ok(())
}

#[test]
fn uncovered_script_resolves_through_fallback() -> anyhow::Result<()> {
    let cache = font_cache();
    let input = svg(&format!(
        r#"<text x="10" y="50" font-family="DejaVu Serif">x{HEBREW_ALEF}</text>"#
    ));

    let layout = layout_of(&cache, &input)?;
    let families: Vec<&str> = layout.runs[0]
        .shaped
        .segments
        .iter()
        .map(|s| s.font.family_name())
        .collect();
    assert_eq!(families, vec!["DejaVu Serif", "DejaVu Sans"]);

    let (output, result) = converter(&cache, 2).convert_str(&input)?;
    assert_eq!(count_elements(&output, "text"), 0);
    assert_eq!(result.glyph_count, 2);
    Ok(())
}

#[test]
fn missing_font_fails_and_leaves_input_untouched() -> anyhow::Result<()> {
    let cache = font_cache();
    let mut doc = Document::parse(&svg(
        r#"<text x="0" y="20" font-family="DejaVu Sans">fine</text><text font-family="Nowhere Grotesk" font-weight="700" font-style="italic">gone</text>"#,
    ))?;
    let before = doc.clone();

    let err = converter(&cache, 2)
        .convert_document(&mut doc)
        .expect_err("conversion must fail");
    match &err {
        T2pError::MissingFont(missing) => {
            assert_eq!(missing.family, "Nowhere Grotesk");
            assert_eq!(missing.weight, 700);
            assert_eq!(missing.style, FontStyle::Italic);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(doc, before);
    assert_eq!(doc.to_xml(), before.to_xml());
    Ok(())
}

#[test]
fn shared_cache_converts_in_parallel() -> anyhow::Result<()> {
    let cache = font_cache();
    let inputs: Vec<String> = (0..16)
        .map(|i| {
            svg(&format!(
                r#"<text x="{x}" y="40" font-family="DejaVu Sans" text-anchor="middle">Item {i}</text><text y="80" font-family="DejaVu Serif"><tspan>serif</tspan> <tspan fill="red">{i}</tspan></text>"#,
                x = 20 * i
            ))
        })
        .collect();

    let sequential: Vec<String> = inputs
        .iter()
        .map(|input| converter(&cache, 3).convert_str(input).map(|(xml, _)| xml))
        .collect::<Result<_, _>>()?;
    let parallel: Vec<String> = inputs
        .par_iter()
        .map(|input| converter(&cache, 3).convert_str(input).map(|(xml, _)| xml))
        .collect::<Result<_, _>>()?;

    assert_eq!(sequential, parallel);
    assert!(parallel.iter().all(|xml| count_elements(xml, "text") == 0));
    Ok(())
}

#[test]
fn blank_text_becomes_empty_group_in_place() -> anyhow::Result<()> {
    let cache = font_cache();
    let input = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="r" width="5" height="5"/><text id="blank" x="10" y="10" fill="navy">   </text><!-- kept --></svg>"#;
    let (output, result) = converter(&cache, 2).convert_str(input)?;
    assert_eq!(result.text_count, 1);
    assert_eq!(result.path_count, 0);
    insta::assert_snapshot!(output, @r###"
    <?xml version="1.0" encoding="UTF-8"?>
    <svg xmlns="http://www.w3.org/2000/svg"><rect id="r" width="5" height="5"/><g id="blank" fill="navy"/><!-- kept --></svg>
    "###);
    Ok(())
}

#[test]
fn file_conversion_writes_output_only_on_success() -> anyhow::Result<()> {
    let cache = font_cache();
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in.svg");
    let output = dir.path().join("out.svg");

    std::fs::write(&input, svg(r#"<text font-family="Nowhere Grotesk">x</text>"#))?;
    let err = converter(&cache, 2).convert_file(&input, &output);
    assert!(matches!(err, Err(T2pError::MissingFont(_))));
    assert!(!output.exists());

    std::fs::write(
        &input,
        svg(r#"<text x="5" y="30" font-family="DejaVu Serif">file</text>"#),
    )?;
    let result = converter(&cache, 2).convert_file(&input, &output)?;
    assert_eq!(result.text_count, 1);
    let written = std::fs::read_to_string(&output)?;
    assert_eq!(count_elements(&written, "text"), 0);
    assert_eq!(count_elements(&written, "path"), 1);
    Ok(())
}

// this_file: benches/convert_single.rs

//! Single document conversion benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::PathBuf;
use std::sync::Arc;
use t2p::{ConversionOptions, Converter, FontCache, FontCacheConfig, StaticMatcher};

fn converter(precision: usize) -> Converter {
    let fonts = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/fonts");
    let matcher = StaticMatcher::new();
    matcher
        .register("DejaVu Sans", fonts.join("DejaVuSans.ttf"), 0)
        .register("DejaVu Serif", fonts.join("DejaVuSerif.ttf"), 0);
    let cache = FontCache::with_matcher(FontCacheConfig::ephemeral(), Box::new(matcher));
    let options = ConversionOptions {
        precision,
        ..Default::default()
    };
    Converter::with_cache(options, Arc::new(cache))
}

fn document(body: &str) -> String {
    format!(r#"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="600">{body}</svg>"#)
}

fn bench_simple_latin(c: &mut Criterion) {
    let converter = converter(2);
    let svg = document(
        r#"<text x="400" y="50" font-family="DejaVu Sans" font-size="24" text-anchor="middle">The quick brown fox jumps over the lazy dog</text>"#,
    );

    c.bench_function("convert_simple_latin", |b| {
        b.iter(|| converter.convert_str(black_box(&svg)).unwrap());
    });
}

fn bench_complex_documents(c: &mut Criterion) {
    let converter = converter(2);
    let cases = vec![
        (
            "bidi",
            document("<text x=\"10\" y=\"50\" font-family=\"DejaVu Sans\">Hello \u{05E9}\u{05DC}\u{05D5}\u{05DD} world</text>"),
        ),
        (
            "tspans",
            document(
                r#"<text x="10" y="50" font-family="DejaVu Serif" text-decoration="underline"><tspan x="10" y="50">First line</tspan><tspan x="10" y="80" font-weight="bold" letter-spacing="2">Second line</tspan></text>"#,
            ),
        ),
        (
            "text_path",
            document(
                r##"<path id="curve" d="M 10 300 C 200 100 400 500 700 300"/><text font-family="DejaVu Sans" font-size="20"><textPath href="#curve" startOffset="10%">Text following a curve</textPath></text>"##,
            ),
        ),
        (
            "transform",
            document(
                r#"<text x="10" y="50" font-family="DejaVu Sans" transform="matrix(2 0 0 2 15 30)" stroke="black" stroke-width="0.5">Scaled text</text>"#,
            ),
        ),
    ];

    for (name, svg) in cases {
        c.bench_with_input(BenchmarkId::new("convert_document", name), &svg, |b, svg| {
            b.iter(|| converter.convert_str(black_box(svg)).unwrap());
        });
    }
}

fn bench_precision(c: &mut Criterion) {
    let svg = document(
        r#"<text x="10" y="50" font-family="DejaVu Sans" font-size="36">Precision</text>"#,
    );
    for precision in [0usize, 2, 6] {
        let converter = converter(precision);
        c.bench_with_input(BenchmarkId::new("precision", precision), &svg, |b, svg| {
            b.iter(|| converter.convert_str(black_box(svg)).unwrap());
        });
    }
}

criterion_group!(
    benches,
    bench_simple_latin,
    bench_complex_documents,
    bench_precision
);
criterion_main!(benches);

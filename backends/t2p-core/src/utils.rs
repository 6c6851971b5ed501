// this_file: backends/t2p-core/src/utils.rs

//! Utility functions shared by the t2p crates.

use std::fmt::Write;
use std::path::Path;

/// Append `value` with exactly `precision` decimals. Negative zero prints as zero.
pub fn write_number(out: &mut String, value: f64, precision: usize) {
    let start = out.len();
    let _ = write!(out, "{:.p$}", value, p = precision);
    let written = &out[start..];
    if written.starts_with('-') && written[1..].chars().all(|c| c == '0' || c == '.') {
        out.remove(start);
    }
}

/// Format a single number the way [`write_number`] does.
pub fn format_number(value: f64, precision: usize) -> String {
    let mut out = String::new();
    write_number(&mut out, value, precision);
    out
}

/// Lowercase, drop a leading dot and strip everything but ASCII alphanumerics.
pub fn normalize_font_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Whether a path looks like a font file we can index.
pub fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc" | "otc"))
        .unwrap_or(false)
}

/// System font directories for different platforms
pub fn system_font_dirs() -> Vec<String> {
    #[cfg(target_os = "macos")]
    {
        vec![
            "/System/Library/Fonts".to_string(),
            "/Library/Fonts".to_string(),
            "~/Library/Fonts".to_string(),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec!["C:\\Windows\\Fonts".to_string()]
    }

    #[cfg(target_os = "linux")]
    {
        vec![
            "/usr/share/fonts".to_string(),
            "/usr/local/share/fonts".to_string(),
            "~/.fonts".to_string(),
            "~/.local/share/fonts".to_string(),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_precision() {
        assert_eq!(format_number(1.23456, 2), "1.23");
        assert_eq!(format_number(10.0, 0), "10");
        assert_eq!(format_number(-0.5, 3), "-0.500");
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        assert_eq!(format_number(-0.0001, 2), "0.00");
        assert_eq!(format_number(-0.0, 0), "0");
    }

    #[test]
    fn test_normalize_font_name() {
        assert_eq!(normalize_font_name(".SF NS Text"), "sfnstext");
        assert_eq!(normalize_font_name("DejaVu Sans"), "dejavusans");
    }

    #[test]
    fn test_is_font_file() {
        assert!(is_font_file(Path::new("/a/b/Font.TTF")));
        assert!(is_font_file(Path::new("x.otc")));
        assert!(!is_font_file(Path::new("x.woff2")));
        assert!(!is_font_file(Path::new("README")));
    }

    #[test]
    fn test_system_font_dirs_not_empty_on_desktop() {
        #[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
        assert!(!system_font_dirs().is_empty());
    }
}

//! WCAG color and contrast math.
//!
//! Pure functions, no I/O. Luminance and ratio formulas follow
//! <https://www.w3.org/TR/WCAG21/#dfn-relative-luminance>.

use std::sync::OnceLock;

use regex::Regex;

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Parse any supported CSS color value.
///
/// Accepts `rgb()`/`rgba()`, 3- and 6-digit hex, and a small named-color
/// table. Unrecognized formats yield `None`; callers skip the element
/// rather than fail.
pub fn parse_color(value: &str) -> Option<Rgb> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.starts_with('#') {
        parse_hex_color(&trimmed)
    } else if trimmed.starts_with("rgb") {
        parse_rgb_color(&trimmed)
    } else {
        parse_named_color(&trimmed)
    }
}

/// Parse a CSS hex color (#rgb, #rrggbb).
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim_start_matches('#');
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(Rgb::new(r, g, b))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgb::new(r, g, b))
        }
        _ => None,
    }
}

/// Parse an rgb() or rgba() color. The alpha channel is ignored.
pub fn parse_rgb_color(value: &str) -> Option<Rgb> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)").unwrap()
    });
    let caps = re.captures(value)?;
    let r: u8 = caps[1].parse().ok()?;
    let g: u8 = caps[2].parse().ok()?;
    let b: u8 = caps[3].parse().ok()?;
    Some(Rgb::new(r, g, b))
}

/// Parse a named CSS color.
pub fn parse_named_color(name: &str) -> Option<Rgb> {
    let (r, g, b) = match name {
        "white" => (255, 255, 255),
        "black" => (0, 0, 0),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "lime" => (0, 255, 0),
        "aqua" | "cyan" => (0, 255, 255),
        "teal" => (0, 128, 128),
        "navy" => (0, 0, 128),
        "fuchsia" | "magenta" => (255, 0, 255),
        "purple" => (128, 0, 128),
        "orange" => (255, 165, 0),
        _ => return None,
    };
    Some(Rgb::new(r, g, b))
}

/// Relative luminance per WCAG 2.x.
pub fn relative_luminance(color: Rgb) -> f64 {
    let srgb = [color.r, color.g, color.b].map(|c| {
        let v = c as f64 / 255.0;
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    });
    0.2126 * srgb[0] + 0.7152 * srgb[1] + 0.0722 * srgb[2]
}

/// Contrast ratio between two colors. Symmetric, in [1.0, 21.0].
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let l1 = relative_luminance(a);
    let l2 = relative_luminance(b);
    let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Large text per WCAG: >= 24px, or >= 18.66px and bold.
pub fn is_large_text(font_size_px: f64, font_weight: &str) -> bool {
    if font_size_px >= 24.0 {
        return true;
    }
    let bold = font_weight.eq_ignore_ascii_case("bold")
        || font_weight.trim().parse::<u32>().map(|w| w >= 700).unwrap_or(false);
    font_size_px >= 18.66 && bold
}

/// AA minimum ratio: 3.0 for large text, 4.5 otherwise.
pub fn required_ratio(large_text: bool) -> f64 {
    if large_text {
        3.0
    } else {
        4.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#fff"), Some(Rgb::WHITE));
        assert_eq!(parse_hex_color("#000"), Some(Rgb::BLACK));
        assert_eq!(parse_hex_color("#ff0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_hex_color("#00ff00"), Some(Rgb::new(0, 255, 0)));
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn test_parse_rgb_color() {
        assert_eq!(parse_rgb_color("rgb(255, 0, 0)"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_rgb_color("rgba(0, 128, 0, 0.5)"), Some(Rgb::new(0, 128, 0)));
    }

    #[test]
    fn test_rgb_and_hex_agree() {
        assert_eq!(parse_color("rgb(0,0,0)"), parse_color("#000000"));
    }

    #[test]
    fn test_unrecognized_formats_yield_none() {
        assert_eq!(parse_color("hsl(120, 50%, 50%)"), None);
        assert_eq!(parse_color("var(--text-color)"), None);
        assert_eq!(parse_color("inherit"), None);
    }

    #[test]
    fn test_contrast_ratio_black_white() {
        let ratio = contrast_ratio(Rgb::BLACK, Rgb::WHITE);
        assert!((ratio - 21.0).abs() < 0.01, "black on white should be ~21:1, got {:.2}", ratio);
    }

    #[test]
    fn test_contrast_ratio_same_color() {
        let gray = Rgb::new(128, 128, 128);
        let ratio = contrast_ratio(gray, gray);
        assert!((ratio - 1.0).abs() < f64::EPSILON, "same color should be exactly 1:1");
    }

    #[test]
    fn test_contrast_ratio_symmetric() {
        let a = Rgb::new(50, 80, 200);
        let b = Rgb::new(240, 240, 240);
        assert_eq!(contrast_ratio(a, b), contrast_ratio(b, a));
    }

    #[test]
    fn test_relative_luminance_extremes() {
        assert!((relative_luminance(Rgb::WHITE) - 1.0).abs() < 0.01);
        assert!(relative_luminance(Rgb::BLACK).abs() < 0.01);
    }

    #[test]
    fn test_is_large_text() {
        assert!(is_large_text(24.0, "normal"));
        assert!(is_large_text(18.66, "bold"));
        assert!(is_large_text(19.0, "700"));
        assert!(!is_large_text(16.0, "normal"));
        assert!(!is_large_text(18.66, "400"));
    }

    #[test]
    fn test_required_ratio() {
        assert_eq!(required_ratio(true), 3.0);
        assert_eq!(required_ratio(false), 4.5);
    }
}

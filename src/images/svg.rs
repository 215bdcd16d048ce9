//! Text-level SVG minifier

use crate::config::SvgConfig;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static PROLOG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<\?xml.*?\?>").unwrap());
static DOCTYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<!DOCTYPE[^\[>]*(\[.*?\])?\s*>").unwrap());
static METADATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<metadata\b[^>]*/>|<metadata\b.*?</metadata>").unwrap());
static LINE_BREAK_BETWEEN_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r">[ \t\r]*\n\s*<").unwrap());
static ROOT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<svg\b[^>]*>").unwrap());
static VIEWBOX_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+viewBox\s*=\s*("[^"]*"|'[^']*')"#).unwrap());
static ID_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+id\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([A-Za-z_][\w.:-]*)").unwrap());

/// Minify an SVG document.
///
/// Removes comments, the XML prolog, doctype and `<metadata>`, and line breaks
/// between tags. Whitespace inside text content is left alone.
pub fn minify_svg(source: &str, config: &SvgConfig) -> String {
    let mut svg = COMMENT.replace_all(source, "").into_owned();
    svg = PROLOG.replace_all(&svg, "").into_owned();
    svg = DOCTYPE.replace_all(&svg, "").into_owned();
    svg = METADATA.replace_all(&svg, "").into_owned();
    svg = LINE_BREAK_BETWEEN_TAGS.replace_all(&svg, "><").into_owned();

    if config.remove_viewbox {
        svg = remove_redundant_viewbox(&svg);
    }
    if config.cleanup_ids {
        svg = remove_unreferenced_ids(&svg);
    }

    svg.trim().to_string()
}

/// Drop the root `viewBox` when it equals `0 0 <width> <height>`.
fn remove_redundant_viewbox(svg: &str) -> String {
    let Some(root) = ROOT_TAG.find(svg) else {
        return svg.to_string();
    };
    let tag = root.as_str();

    let width = attribute(tag, "width").and_then(|w| parse_length(&w));
    let height = attribute(tag, "height").and_then(|h| parse_length(&h));
    let view_box = attribute(tag, "viewBox").map(|v| {
        v.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().ok())
            .collect::<Option<Vec<f64>>>()
    });

    let redundant = match (width, height, view_box) {
        (Some(w), Some(h), Some(Some(parts))) => parts == [0.0, 0.0, w, h],
        _ => false,
    };
    if !redundant {
        return svg.to_string();
    }

    let stripped = VIEWBOX_ATTR.replace(tag, "");
    format!("{}{}{}", &svg[..root.start()], stripped, &svg[root.end()..])
}

/// Remove `id` attributes that no `#id` reference points at.
fn remove_unreferenced_ids(svg: &str) -> String {
    let referenced: HashSet<&str> =
        REFERENCE.captures_iter(svg).filter_map(|c| c.get(1)).map(|m| m.as_str()).collect();

    ID_ATTR
        .replace_all(svg, |caps: &Captures| {
            let id = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
            if referenced.contains(id) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Value of an attribute inside a single tag.
fn attribute(tag: &str, name: &str) -> Option<String> {
    let pattern = format!(r#"\s{}\s*=\s*(?:"([^"]*)"|'([^']*)')"#, regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(tag)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().trim().to_string())
}

/// Parse a unitless or `px` length.
fn parse_length(value: &str) -> Option<f64> {
    value.strip_suffix("px").unwrap_or(value).trim().parse().ok()
}

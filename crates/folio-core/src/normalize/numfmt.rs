use std::sync::LazyLock;

use regex::Regex;

static PRECISION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([0#]+)").expect("precision pattern is valid"));

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("literal pattern is valid"));

/// Render a numeric cell the way its number format displays it.
///
/// With a custom (non-`General`) format, the first `.000`/`.##` group fixes
/// the decimal places, and every non-empty quoted literal (`"Cr"`, `"Dr"`)
/// is appended after a space. Otherwise the value's plain form is used.
pub fn format_number(value: f64, format: Option<&str>) -> String {
    render(value, plain_number(value), format)
}

/// Same rule for integer cells. Without a precision group the integer is
/// printed exactly.
pub fn format_integer(value: i64, format: Option<&str>) -> String {
    render(value as f64, value.to_string(), format)
}

fn render(value: f64, plain: String, format: Option<&str>) -> String {
    let Some(fmt) = format.filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case("general")) else {
        return plain;
    };

    let mut out = match PRECISION.captures(fmt).and_then(|c| c.get(1)) {
        Some(places) => format!("{value:.prec$}", prec = places.as_str().len()),
        None => plain,
    };

    let literals: Vec<&str> = QUOTED
        .captures_iter(fmt)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    if !literals.is_empty() {
        out.push(' ');
        out.push_str(&literals.join(" "));
    }
    out
}

/// Shortest round-trip form; integral values print without a fraction.
pub fn plain_number(value: f64) -> String {
    format!("{value}")
}

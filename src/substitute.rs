//! Named-placeholder substitution over positional format slots
//!
//! Maps `{name}` placeholders onto printf-style positional slots: every
//! distinct argument key gets exactly one slot in encounter order, the
//! format string is rewritten token-by-token, and a positional formatter
//! produces the final text. Working in three passes keeps the required
//! behaviors separable:
//!
//! 1. every literal `%` is escaped to `%%` so template text can never be
//!    mistaken for a format directive;
//! 2. `{key}` tokens are replaced by `%N$s` in a single pass that tries
//!    keys longest-first, so `{row}` never matches inside `{rowgroup}`;
//! 3. the positional formatter substitutes `%N$s` and unescapes `%%`.
//!    Substituted values are emitted verbatim without rescanning, so
//!    argument values containing braces or percent signs pass through
//!    intact.
//!
//! Placeholders with no matching argument survive all three passes and
//! appear literally in the output; an over-specified template is not an
//! error.

use indexmap::IndexMap;

/// Substitute named placeholders in `format` with the stringified argument
/// values in `args`
pub fn vnsprintf(format: &str, args: &IndexMap<String, String>) -> String {
    let escaped = escape_literals(format);
    let tokenized = assign_positions(&escaped, args);
    let positions: Vec<&str> = args.values().map(|s| s.as_str()).collect();
    format_positional(&tokenized, &positions)
}

/// Escape format-control characters in raw template text
fn escape_literals(format: &str) -> String {
    format.replace('%', "%%")
}

/// Replace `{key}` tokens with positional `%N$s` tokens
///
/// Keys are tried longest-first; the sort is stable so keys of equal
/// length keep their encounter order. Single pass, left to right.
fn assign_positions(format: &str, args: &IndexMap<String, String>) -> String {
    let mut keys: Vec<(&str, usize)> = args
        .keys()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i + 1))
        .collect();
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    while !rest.is_empty() {
        if rest.starts_with('{') {
            let token = keys
                .iter()
                .find(|&&(k, _)| rest[1..].starts_with(k) && rest[1 + k.len()..].starts_with('}'));
            if let Some(&(key, position)) = token {
                out.push_str(&format!("%{position}$s"));
                rest = &rest[key.len() + 2..];
                continue;
            }
        }
        match rest.chars().next() {
            Some(ch) => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
            None => break,
        }
    }
    out
}

/// Expand `%N$s` slots and unescape `%%`
///
/// Slots referencing positions outside `positions` are copied verbatim, as
/// is any other text.
fn format_positional(format: &str, positions: &[&str]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("%%") {
            out.push('%');
            rest = stripped;
            continue;
        }
        if rest.starts_with('%') {
            let digits: String = rest[1..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !digits.is_empty() && rest[1 + digits.len()..].starts_with("$s") {
                if let Ok(n) = digits.parse::<usize>() {
                    if n >= 1 && n <= positions.len() {
                        out.push_str(positions[n - 1]);
                        rest = &rest[1 + digits.len() + 2..];
                        continue;
                    }
                }
            }
        }
        match rest.chars().next() {
            Some(ch) => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
            None => break,
        }
    }
    out
}

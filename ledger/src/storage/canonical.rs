//! # Canonical Encoding
//!
//! The block hash is taken over text, so the text has to be reproducible
//! byte for byte. This module owns that text.
//!
//! ## Payloads
//!
//! | Payload kind | Encoding                                        |
//! |--------------|-------------------------------------------------|
//! | mapping      | JSON, keys sorted at every level                |
//! | string       | the raw string, no quotes                       |
//! | anything else| canonical JSON                                  |
//!
//! Canonical JSON uses `", "` between items and `": "` between key and
//! value, and escapes everything outside printable ASCII as lowercase
//! `\uXXXX` (UTF-16 surrogate pairs above the BMP). Chains written by the
//! legacy service were hashed over exactly this text.
//!
//! Keys are sorted explicitly rather than trusting `serde_json::Map`
//! iteration order: enabling `preserve_order` anywhere in the dependency
//! graph would otherwise silently change every hash.
//!
//! ## Timestamps
//!
//! Timestamps and float payload values share one layout: shortest
//! round-trip digits, `.0` kept on integral values (`1700000000.0`, not
//! `1700000000`), and exponent form outside `1e-4 ..< 1e16` (`1e-05`,
//! `2.5e-07`, `1e+16`).

use std::fmt::Write;

use serde_json::Value;

/// Encode a block payload for hashing.
pub fn canonical_payload(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        other => canonical_json(other),
    }
}

/// Encode any JSON value as canonical JSON text.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::with_capacity(64);
    write_value(&mut out, value);
    out
}

/// Encode a timestamp for hashing.
///
/// Callers guarantee the value is finite; `Block` construction rejects
/// anything else.
pub fn format_timestamp(timestamp: f64) -> String {
    format_float(timestamp)
}

/// Shortest round-trip decimal for a finite float.
///
/// Positional notation when the decimal exponent is in `-4..16`, with `.0`
/// kept on integral values. Otherwise `d[.ddd]e±XX` with at least two
/// exponent digits.
pub fn format_float(value: f64) -> String {
    // `{:e}` yields the shortest round-trip digits, e.g. `-2.5e-7`.
    let scientific = format!("{value:e}");
    let (negative, body) = match scientific.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, scientific.as_str()),
    };
    let (mantissa, exponent) = body.split_once('e').unwrap_or((body, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let mut out = String::with_capacity(digits.len() + 8);
    if negative {
        out.push('-');
    }

    if !(-4..16).contains(&exponent) {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if exponent < 0 { '-' } else { '+' });
        let _ = write!(out, "{:02}", exponent.unsigned_abs());
    } else if exponent < 0 {
        out.push_str("0.");
        for _ in 1..-exponent {
            out.push('0');
        }
        out.push_str(&digits);
    } else {
        let point = exponent as usize + 1;
        if digits.len() <= point {
            out.push_str(&digits);
            for _ in digits.len()..point {
                out.push('0');
            }
            out.push_str(".0");
        } else {
            out.push_str(&digits[..point]);
            out.push('.');
            out.push_str(&digits[point..]);
        }
    }
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => match n.as_f64() {
            Some(float) if !n.is_i64() && !n.is_u64() => out.push_str(&format_float(float)),
            _ => {
                let _ = write!(out, "{n}");
            }
        },
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(out, key);
                out.push_str(": ");
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}

//! Canonical encoding of JSON values for signing.
//!
//! The canonical form is what gets authenticated, so its rules are part of
//! the wire protocol. Changing any of them requires bumping
//! [`FORMAT_VERSION`](crate::signature::FORMAT_VERSION).
//!
//! - The reserved top-level key is dropped before anything else happens.
//! - Object members are sorted byte-wise on the UTF-8 key text.
//! - No whitespace between tokens.
//! - Strings use exactly one escape per special character: `\"`, `\\`, the
//!   short forms `\b \f \n \r \t`, and `\u00xx` for the remaining control
//!   characters. Everything else is written as raw UTF-8.
//! - Numbers are encoded from their exact decimal text, never through a
//!   binary float. Magnitudes in `[1e-6, 1e21)` are plain decimal with no
//!   trailing fractional zeros (`1.0` and `1e0` are both `1`), everything
//!   else uses exponent form (`1e21`, `1.5e-7`), and zero is always `0`.

use crate::error::{Result, SignError};
use crate::signature::RESERVED_KEY;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

/// Maximum container nesting accepted by the encoder.
pub const MAX_DEPTH: usize = 128;

/// Numbers whose leading digit sits at a power of ten in
/// `PLAIN_LEAD_MIN..=PLAIN_LEAD_MAX` (magnitude in `[1e-6, 1e21)`) are
/// written without an exponent.
const PLAIN_LEAD_MIN: i64 = -6;
const PLAIN_LEAD_MAX: i64 = 20;

/// The canonical byte encoding of a document, ready to be authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPayload(Vec<u8>);

impl CanonicalPayload {
    /// Get the raw canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the payload, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty. Never true for a canonicalized value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 of the payload as lowercase hex, for diagnostics.
    pub fn digest_hex(&self) -> String {
        Sha256::digest(&self.0)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl AsRef<[u8]> for CanonicalPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Canonicalize a value, excluding the reserved signature key at the top level.
pub fn canonicalize(value: &Value) -> Result<CanonicalPayload> {
    let mut out = Vec::new();
    match value {
        Value::Object(map) => write_object(map, true, 0, &mut out)?,
        other => write_value(other, 0, &mut out)?,
    }
    Ok(CanonicalPayload(out))
}

fn write_value(value: &Value, depth: usize, out: &mut Vec<u8>) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(SignError::Encoding(format!(
            "nesting exceeds {} levels",
            MAX_DEPTH
        )));
    }

    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, depth + 1, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => write_object(map, false, depth, out)?,
    }
    Ok(())
}

fn write_object(
    map: &Map<String, Value>,
    skip_reserved: bool,
    depth: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    let mut members: Vec<(&String, &Value)> = map
        .iter()
        .filter(|(key, _)| !(skip_reserved && key.as_str() == RESERVED_KEY))
        .collect();
    members.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    out.push(b'{');
    for (i, (key, value)) in members.into_iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        write_string(key, out);
        out.push(b':');
        write_value(value, depth + 1, out)?;
    }
    out.push(b'}');
    Ok(())
}

fn write_number(n: &Number, out: &mut Vec<u8>) -> Result<()> {
    out.extend_from_slice(canonical_number(n)?.as_bytes());
    Ok(())
}

/// Canonical spelling of a number, computed from its exact decimal text.
///
/// The literal is reduced to `digits x 10^exponent` with no leading or
/// trailing zeros in `digits`, so two literals get the same spelling exactly
/// when they denote the same value.
pub(crate) fn canonical_number(n: &Number) -> Result<String> {
    let text = n.to_string();
    let invalid = || SignError::Encoding(format!("unrepresentable number {}", text));

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(at) => (
            &unsigned[..at],
            unsigned[at + 1..].parse::<i64>().map_err(|_| invalid())?,
        ),
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let all: String = whole.chars().chain(fraction.chars()).collect();
    let significant = all.trim_start_matches('0');
    if significant.is_empty() {
        return Ok("0".to_string());
    }
    let digits = significant.trim_end_matches('0');
    let exponent = exponent
        .checked_sub(fraction.len() as i64)
        .and_then(|e| e.checked_add((significant.len() - digits.len()) as i64))
        .ok_or_else(invalid)?;

    // The value lies in [10^lead, 10^(lead + 1)).
    let lead = exponent
        .checked_add(digits.len() as i64 - 1)
        .ok_or_else(invalid)?;

    let mut out = String::with_capacity(digits.len() + 24);
    if negative {
        out.push('-');
    }
    if (PLAIN_LEAD_MIN..=PLAIN_LEAD_MAX).contains(&lead) {
        if exponent >= 0 {
            out.push_str(digits);
            out.extend(std::iter::repeat('0').take(exponent as usize));
        } else {
            let point = digits.len() as i64 + exponent;
            if point > 0 {
                let (int_digits, frac_digits) = digits.split_at(point as usize);
                out.push_str(int_digits);
                out.push('.');
                out.push_str(frac_digits);
            } else {
                out.push_str("0.");
                out.extend(std::iter::repeat('0').take(point.unsigned_abs() as usize));
                out.push_str(digits);
            }
        }
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push_str(&lead.to_string());
    }
    Ok(out)
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for ch in s.chars() {
        match ch {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\u{0C}' => out.extend_from_slice(b"\\f"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

//! Reading documents from bytes and writing them back.
//!
//! Parsing is strict: besides ordinary JSON syntax errors, an object that
//! names the same key twice is rejected. Different JSON readers disagree on
//! which duplicate wins, so a signed document must not contain any.

use crate::error::{Result, SignError};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// How a signed document is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Keep the input text byte for byte and splice the block in before the
    /// final closing brace.
    #[default]
    Preserve,
    /// Re-render without whitespace.
    Compact,
    /// Re-render with two-space indentation and a trailing newline.
    Pretty,
}

/// Parse document bytes into a value.
pub fn parse(bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(SignError::EmptyDocument);
    }
    serde_json::from_slice::<UniqueKeys>(bytes).map_err(|e| SignError::Parse(e.to_string()))?;
    serde_json::from_slice(bytes).map_err(|e| SignError::Parse(e.to_string()))
}

/// Render a value. [`Layout::Preserve`] has no source text to keep here and
/// renders like [`Layout::Pretty`].
pub fn render(value: &Value, layout: Layout) -> Result<Vec<u8>> {
    let rendered = match layout {
        Layout::Compact => serde_json::to_vec(value),
        Layout::Pretty | Layout::Preserve => serde_json::to_vec_pretty(value).map(|mut out| {
            out.push(b'\n');
            out
        }),
    };
    rendered.map_err(|e| SignError::Encoding(e.to_string()))
}

/// Insert `"key": member` as the last member of the top-level object in
/// `original`, leaving every other byte untouched.
///
/// `original` must already have parsed as an object that does not contain
/// `key`; `was_empty` says whether that object had no members.
pub fn append_member(original: &[u8], key: &str, member: &Value, was_empty: bool) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(original).map_err(|e| SignError::Parse(e.to_string()))?;
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return Err(SignError::NotAnObject);
    }

    let close = trimmed.len() - 1;
    let head = trimmed[..close].trim_end();
    let tail = &text[close..];

    let key_text = serde_json::to_string(key).map_err(|e| SignError::Encoding(e.to_string()))?;
    let member_text =
        serde_json::to_string(member).map_err(|e| SignError::Encoding(e.to_string()))?;

    let mut out = String::with_capacity(text.len() + key_text.len() + member_text.len() + 8);
    out.push_str(head);
    if !was_empty {
        out.push(',');
    }

    if head.contains('\n') {
        let newline = if head.contains("\r\n") { "\r\n" } else { "\n" };
        out.push_str(newline);
        out.push_str(member_indent(head));
        out.push_str(&key_text);
        out.push_str(": ");
        out.push_str(&member_text);
        out.push_str(newline);
    } else {
        let spaced = head.contains(": ") || head.contains(", ");
        if spaced && !was_empty {
            out.push(' ');
        }
        out.push_str(&key_text);
        out.push_str(if spaced { ": " } else { ":" });
        out.push_str(&member_text);
    }

    out.push_str(tail);
    Ok(out.into_bytes())
}

/// Leading whitespace of the first member line after the opening brace.
fn member_indent(head: &str) -> &str {
    head.lines()
        .skip(1)
        .find(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start().len()])
        .unwrap_or("  ")
}

/// Walks a document without building it, failing on the first object that
/// repeats a key.
struct UniqueKeys;

impl<'de> Deserialize<'de> for UniqueKeys {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(UniqueKeysVisitor).map(|()| UniqueKeys)
    }
}

struct UniqueKeysVisitor;

impl<'de> Visitor<'de> for UniqueKeysVisitor {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any valid JSON value")
    }

    fn visit_bool<E>(self, _: bool) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_i64<E>(self, _: i64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_u64<E>(self, _: u64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_f64<E>(self, _: f64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_str<E>(self, _: &str) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_unit<E>(self) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element::<UniqueKeys>()?.is_some() {}
        Ok(())
    }

    // Exact numbers also arrive here, as a one-entry map holding their text.
    fn visit_map<A>(self, mut access: A) -> std::result::Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();
        while let Some(key) = access.next_key::<String>()? {
            if seen.contains(&key) {
                return Err(de::Error::custom(format!("duplicate key `{}`", key)));
            }
            access.next_value::<UniqueKeys>()?;
            seen.insert(key);
        }
        Ok(())
    }
}

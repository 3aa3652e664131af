//! Decoding of the JSON `holes` payload carried by each record.
//!
//! Payloads are written by Python's `json` module, which emits the bare
//! literals `NaN`, `Infinity` and `-Infinity` for non-finite floats. Those are
//! not JSON, so before decoding they are rewritten (outside string literals)
//! into marker strings that [`HoleDescriptor`] decodes back to the float.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::common::HoleDescriptor;

/// Why a payload could not be decoded at all.
#[derive(Debug, Error)]
#[error("invalid holes JSON: {0}")]
pub struct ParseIssue(#[from] serde_json::Error);

/// Accepted payload shapes: a list of holes, or one bare hole.
#[derive(Deserialize)]
#[serde(untagged)]
enum HolesPayload {
    Many(Vec<HoleDescriptor>),
    One(HoleDescriptor),
}

/// Marker prefix for non-finite literals. A NUL cannot appear unescaped in
/// JSON text, so no payload string collides with a marker by accident.
const NON_FINITE_MARKER: char = '\0';

/// Python's non-finite literals, the JSON string each is rewritten to, and the
/// value it decodes to. `-Infinity` must be matched before `Infinity`.
const NON_FINITE: [(&str, &str, f64); 3] = [
    ("-Infinity", r#""\u0000-Infinity""#, f64::NEG_INFINITY),
    ("Infinity", r#""\u0000Infinity""#, f64::INFINITY),
    ("NaN", r#""\u0000NaN""#, f64::NAN),
];

/// Replace bare `NaN` / `Infinity` / `-Infinity` tokens outside string
/// literals with their marker strings. Borrows when there is nothing to do.
fn rewrite_non_finite(raw: &str) -> Cow<'_, str> {
    if !raw.contains("NaN") && !raw.contains("Infinity") {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some((token, marker, _)) = NON_FINITE.iter().find(|(t, _, _)| rest.starts_with(t)) {
            out.push_str(marker);
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(out)
}

/// Read a measurement: numbers and non-finite markers; anything else is `0.0`.
fn measurement(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) if s.starts_with(NON_FINITE_MARKER) => NON_FINITE
            .iter()
            .find(|(token, _, _)| s[1..] == **token)
            .map_or(0.0, |(_, _, v)| *v),
        _ => 0.0,
    }
}

impl From<Value> for HoleDescriptor {
    fn from(value: Value) -> Self {
        Self {
            length: measurement(value.get("length")),
            radius: measurement(value.get("radius")),
        }
    }
}

/// Strictly decode a payload string.
///
/// A JSON array yields one descriptor per element; any other JSON value is
/// treated as a single hole. Only text that is not valid JSON (plus Python's
/// non-finite literals) is an error.
pub fn decode_holes(raw: &str) -> Result<Vec<HoleDescriptor>, ParseIssue> {
    let text = rewrite_non_finite(raw);
    Ok(match serde_json::from_str::<HolesPayload>(&text)? {
        HolesPayload::Many(holes) => holes,
        HolesPayload::One(hole) => vec![hole],
    })
}

/// Decode the payload of the record identified by `id`, never failing.
///
/// A null payload means the part has no holes. An undecodable payload is
/// logged once at `WARN` and also reads as no holes. The second element of the
/// result tells the caller whether the payload was malformed.
pub fn parse_holes(raw: Option<&str>, id: &str) -> (Vec<HoleDescriptor>, bool) {
    let Some(raw) = raw else {
        return (Vec::new(), false);
    };
    match decode_holes(raw) {
        Ok(holes) => (holes, false),
        Err(issue) => {
            warn!("UUID {id}: Could not parse holes JSON - {raw} ({})", issue.0);
            (Vec::new(), true)
        }
    }
}

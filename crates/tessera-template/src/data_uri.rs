/*
 * data_uri.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Post-processing of embedded `data:<mime>;base64,<payload>` values.
//!
//! | MIME | Rich mode | Raw mode |
//! |------|-----------|----------|
//! | `image/*` | URI unchanged | URI unchanged |
//! | `audio/*` | `<audio controls>` | URI unchanged |
//! | `video/*` | `<video controls>` | URI unchanged |
//! | `application/pdf` | `<embed>` | URI unchanged |
//! | anything else | download link | URI unchanged |
//!
//! The payload is validated in both modes; an invalid one is an error so the
//! caller can substitute the missing-file fallback.

use base64::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TemplateError, TemplateResult};
use crate::options::PresentationMode;
use crate::value::Value;

static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:([A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+);base64,(.*)$")
        .expect("data URI pattern is valid")
});

/// A parsed data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Parse `text` as a base64 data URI. Does not validate the payload.
    pub fn parse(text: &'a str) -> Option<Self> {
        let caps = DATA_URI.captures(text)?;
        let mime = caps.get(1)?.as_str();
        let payload = caps.get(2)?.as_str();
        Some(DataUri { mime, payload })
    }

    pub fn is_valid(&self) -> bool {
        !self.payload.is_empty() && BASE64_STANDARD.decode(self.payload).is_ok()
    }
}

/// File extension offered for downloads of `mime`.
pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "text/plain" => "txt",
        "application/json" => "json",
        "text/csv" => "csv",
        _ => "dat",
    }
}

/// Turn a resolved value into output text.
///
/// Objects and lists render empty, other non-string scalars render as-is.
pub fn post_process(value: &Value, mode: PresentationMode) -> TemplateResult<String> {
    match value {
        Value::String(text) => post_process_str(text, mode),
        other => Ok(other.render()),
    }
}

fn post_process_str(text: &str, mode: PresentationMode) -> TemplateResult<String> {
    let Some(uri) = DataUri::parse(text) else {
        return Ok(text.to_string());
    };
    if !uri.is_valid() {
        return Err(TemplateError::InvalidBase64 {
            mime: uri.mime.to_string(),
        });
    }
    if mode == PresentationMode::Raw {
        return Ok(text.to_string());
    }

    let html = match uri.mime.split('/').next().unwrap_or_default() {
        "image" => text.to_string(),
        "audio" => format!(r#"<audio controls src="{}"></audio>"#, text),
        "video" => format!(r#"<video controls src="{}"></video>"#, text),
        _ if uri.mime == "application/pdf" => format!(
            r#"<embed type="application/pdf" src="{}" width="100%" height="600">"#,
            text
        ),
        _ => format!(
            r#"<a href="{}" download="file.{}">Download</a>"#,
            text,
            extension_for(uri.mime)
        ),
    };
    Ok(html)
}

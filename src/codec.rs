//! # Mutation codec
//!
//! Turns a pending decrement into a scan URL and a QR image of that URL, and
//! turns the fields carried by a scanned URL back into a validated request.
//!
//! The URL itself is the token:
//!
//! ```text
//! {base}?binNo={bin}&sku={sku}&value={amount}
//! ```
//!
//! Bin and SKU are percent-encoded like a browser's `encodeURIComponent`.
//! Tokens are not signed and never expire; whoever holds the printed code can
//! apply it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use qrcode::{render::svg, QrCode};
use serde::{Deserialize, Deserializer, Serialize};
use url::{form_urlencoded, Url};

use crate::error::{DecodeError, EncodeError};

pub const FIELD_BIN: &str = "binNo";
pub const FIELD_SKU: &str = "sku";
pub const FIELD_VALUE: &str = "value";

/// Characters left alone by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const QR_MIN_DIMENSION: u32 = 200;

/// A decrement waiting to be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRequest {
    #[serde(rename = "binNo")]
    pub bin: String,
    pub sku: String,
    #[serde(rename = "value")]
    pub amount: u64,
}

impl MutationRequest {
    pub fn new(bin: impl Into<String>, sku: impl Into<String>, amount: u64) -> Self {
        Self {
            bin: bin.into(),
            sku: sku.into(),
            amount,
        }
    }
}

/// The scan URL and a QR code of it as a base64 `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannableArtifact {
    pub url: String,
    pub data_url: String,
}

/// Raw fields as they arrive from a scan, before validation.
///
/// Each field accepts a JSON string or number; query strings always give
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScanFields {
    #[serde(rename = "binNo", default, deserialize_with = "text_field")]
    pub bin_no: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub value: Option<String>,
}

impl From<&MutationRequest> for ScanFields {
    fn from(req: &MutationRequest) -> Self {
        Self {
            bin_no: Some(req.bin.clone()),
            sku: Some(req.sku.clone()),
            value: Some(req.amount.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Text {
    Str(String),
    UInt(u64),
    Int(i64),
    Float(f64),
}

impl From<Text> for String {
    fn from(text: Text) -> Self {
        match text {
            Text::Str(s) => s,
            Text::UInt(n) => n.to_string(),
            Text::Int(n) => n.to_string(),
            Text::Float(n) => n.to_string(),
        }
    }
}

/// Deserialize a string-or-number field into its text form.
pub(crate) fn text_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<Text> = Option::deserialize(deserializer)?;
    Ok(text.map(String::from))
}

/// Build the scan URL for `req` under `base_url`.
///
/// The fields go into the query; a `#fragment` on the base is kept after it.
pub fn scan_url(req: &MutationRequest, base_url: &str) -> Result<String, EncodeError> {
    Url::parse(base_url).map_err(|e| EncodeError::InvalidBaseUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })?;

    let (head, fragment) = match base_url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (base_url, None),
    };
    let sep = match head.rfind('?') {
        None => "?",
        Some(_) if head.ends_with('?') || head.ends_with('&') => "",
        Some(_) => "&",
    };
    let mut url = format!(
        "{head}{sep}{FIELD_BIN}={}&{FIELD_SKU}={}&{FIELD_VALUE}={}",
        utf8_percent_encode(&req.bin, COMPONENT),
        utf8_percent_encode(&req.sku, COMPONENT),
        req.amount
    );
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    Ok(url)
}

/// Render `text` as an SVG QR code wrapped in a base64 `data:` URL.
pub fn render_qr(text: &str) -> Result<String, EncodeError> {
    let code =
        QrCode::new(text.as_bytes()).map_err(|e| EncodeError::RenderFailure(e.to_string()))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .quiet_zone(true)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image.as_bytes())
    ))
}

/// Produce the scan URL and its QR code for `req`.
pub fn encode(req: &MutationRequest, base_url: &str) -> Result<ScannableArtifact, EncodeError> {
    let url = scan_url(req, base_url)?;
    let data_url = render_qr(&url)?;
    Ok(ScannableArtifact { url, data_url })
}

/// Validate scanned fields into a request.
///
/// Empty strings count as absent. The amount must be a positive base-10
/// integer.
pub fn decode(fields: &ScanFields) -> Result<MutationRequest, DecodeError> {
    let bin = required(&fields.bin_no, FIELD_BIN)?;
    let sku = required(&fields.sku, FIELD_SKU)?;
    let raw_value = required(&fields.value, FIELD_VALUE)?;
    let amount = parse_amount(raw_value)?;
    Ok(MutationRequest::new(bin, sku, amount))
}

/// Decode the query of a scanned URL. Accepts a bare query (`binNo=..`), one
/// with a leading `?`, or the full URL.
pub fn decode_query(input: &str) -> Result<MutationRequest, DecodeError> {
    let query = input.split_once('?').map_or(input, |(_, q)| q);
    let query = query.split_once('#').map_or(query, |(q, _)| q);

    let mut fields = ScanFields::default();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let slot = match key.as_ref() {
            FIELD_BIN => &mut fields.bin_no,
            FIELD_SKU => &mut fields.sku,
            FIELD_VALUE => &mut fields.value,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }
    decode(&fields)
}

fn required<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, DecodeError> {
    field
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(DecodeError::MissingField(name))
}

fn parse_amount(raw: &str) -> Result<u64, DecodeError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(DecodeError::InvalidAmount(raw.to_owned())),
    }
}

//! Request body encoding for a batch of event records
//!
//! Wire form: `data=<percent-encoded [base64 of] JSON array>`.

use base64::{engine::general_purpose::STANDARD, Engine};
use percent_encoding::{percent_decode_str, utf8_percent_encode};

use ogdlog_core::endpoint::COMPONENT_SET;
use ogdlog_core::prelude::*;
use ogdlog_core::{EventRecord, LogSettings};

const DATA_FIELD: &str = "data=";

/// Encode a batch into a form body.
///
/// `serde_json` already emits the escapes the legacy endpoint expects
/// (`\"`, `\\`, `\n`, `\r`, `\t`, `\b`, `\f`, `\u00XX`), so the JSON text is
/// used as-is before the optional base64 step.
pub fn encode_batch<'a, I>(records: I, settings: LogSettings) -> Result<String>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let batch: Vec<&EventRecord> = records.into_iter().collect();
    let json = serde_json::to_string(&batch)?;

    let data = if settings.base64_encode() {
        STANDARD.encode(json.as_bytes())
    } else {
        json
    };

    Ok(format!(
        "{}{}",
        DATA_FIELD,
        utf8_percent_encode(&data, COMPONENT_SET)
    ))
}

/// Decode a form body produced by [`encode_batch`].
///
/// Used by diagnostics and tests; the endpoint does the equivalent server-side.
pub fn decode_batch(body: &str, settings: LogSettings) -> Result<Vec<EventRecord>> {
    let encoded = body
        .strip_prefix(DATA_FIELD)
        .ok_or_else(|| Error::transport("body has no data field"))?;
    let data = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| Error::transport(format!("body is not UTF-8: {}", e)))?;

    let json = if settings.base64_encode() {
        let bytes = STANDARD
            .decode(data.as_bytes())
            .map_err(|e| Error::transport(format!("invalid base64 payload: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| Error::transport(format!("payload is not UTF-8: {}", e)))?
    } else {
        data.into_owned()
    };

    Ok(serde_json::from_str(&json)?)
}

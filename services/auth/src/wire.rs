//! Boundary parsing for browser-supplied WebAuthn payloads.
//!
//! Client libraries disagree on field casing: some serialize `rawId` and
//! `clientDataJSON`, others `raw_id` and `client_data_json`, and a few hoist
//! `transports` to the top level or omit `type` entirely. Every accepted
//! spelling is normalized here, once, before a typed value reaches any flow
//! logic. Nothing outside this module looks at raw credential JSON.

use serde_json::{Map, Value};
use webauthn_rs::prelude::{PublicKeyCredential, RegisterPublicKeyCredential};

/// A payload that could not be shaped into a typed credential.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct WireError(String);

/// Parses a registration (attestation) response in either casing.
pub fn parse_attestation(raw: Value) -> Result<RegisterPublicKeyCredential, WireError> {
    let mut top = as_object(raw, "credential")?;
    let (id, raw_id) = credential_ids(&mut top)?;
    let type_ = credential_type(&mut top);
    let hoisted_transports = top.remove("transports");

    let mut response = as_object(require(&mut top, "response", "response")?, "response")?;
    let client_data = require(&mut response, "clientDataJSON", "client_data_json")?;
    let attestation = require(&mut response, "attestationObject", "attestation_object")?;
    let transports = take_either(&mut response, "transports", "transports").or(hoisted_transports);

    let mut normalized_response = Map::new();
    normalized_response.insert("clientDataJSON".into(), client_data);
    normalized_response.insert("attestationObject".into(), attestation);
    if let Some(transports) = transports {
        normalized_response.insert("transports".into(), transports);
    }

    let mut normalized = Map::new();
    normalized.insert("id".into(), id);
    normalized.insert("rawId".into(), raw_id);
    normalized.insert("type".into(), type_);
    normalized.insert("response".into(), Value::Object(normalized_response));
    normalized.insert("extensions".into(), Value::Object(Map::new()));

    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| WireError(format!("malformed attestation response: {e}")))
}

/// Parses an authentication (assertion) response in either casing.
pub fn parse_assertion(raw: Value) -> Result<PublicKeyCredential, WireError> {
    let mut top = as_object(raw, "credential")?;
    let (id, raw_id) = credential_ids(&mut top)?;
    let type_ = credential_type(&mut top);

    let mut response = as_object(require(&mut top, "response", "response")?, "response")?;
    let client_data = require(&mut response, "clientDataJSON", "client_data_json")?;
    let authenticator_data = require(&mut response, "authenticatorData", "authenticator_data")?;
    let signature = require(&mut response, "signature", "signature")?;
    let user_handle =
        take_either(&mut response, "userHandle", "user_handle").unwrap_or(Value::Null);

    let mut normalized_response = Map::new();
    normalized_response.insert("clientDataJSON".into(), client_data);
    normalized_response.insert("authenticatorData".into(), authenticator_data);
    normalized_response.insert("signature".into(), signature);
    normalized_response.insert("userHandle".into(), user_handle);

    let mut normalized = Map::new();
    normalized.insert("id".into(), id);
    normalized.insert("rawId".into(), raw_id);
    normalized.insert("type".into(), type_);
    normalized.insert("response".into(), Value::Object(normalized_response));
    normalized.insert("extensions".into(), Value::Object(Map::new()));

    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| WireError(format!("malformed assertion response: {e}")))
}

fn as_object(value: Value, what: &str) -> Result<Map<String, Value>, WireError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(WireError(format!("{what} must be a JSON object"))),
    }
}

fn take_either(map: &mut Map<String, Value>, primary: &str, alt: &str) -> Option<Value> {
    map.remove(primary).or_else(|| map.remove(alt))
}

fn require(map: &mut Map<String, Value>, primary: &str, alt: &str) -> Result<Value, WireError> {
    take_either(map, primary, alt).ok_or_else(|| WireError(format!("{primary} is missing")))
}

/// Either spelling of the raw id; one may stand in for the other when a
/// client sends only a single form.
fn credential_ids(top: &mut Map<String, Value>) -> Result<(Value, Value), WireError> {
    let id = top.remove("id");
    let raw_id = take_either(top, "rawId", "raw_id");
    match (id, raw_id) {
        (Some(id), Some(raw_id)) => Ok((id, raw_id)),
        (Some(id), None) => Ok((id.clone(), id)),
        (None, Some(raw_id)) => Ok((raw_id.clone(), raw_id)),
        (None, None) => Err(WireError("credential id is missing".into())),
    }
}

fn credential_type(top: &mut Map<String, Value>) -> Value {
    top.remove("type")
        .filter(|v| v.is_string())
        .unwrap_or_else(|| Value::String("public-key".into()))
}

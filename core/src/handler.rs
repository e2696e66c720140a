//! Transport-independent request handling.
//!
//! Maps (method, study id, query, JSON body) onto the study service and
//! renders a status code plus JSON body. Every failure becomes a 400 with
//! a human-readable message; unknown methods get 405.

use crate::{
    error::{LiftError, LiftResult},
    study::{NewStudy, StudyUpdate},
    study_service::StudyService,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

const REQUIRED_CREATE_FIELDS: [&str; 4] = ["name", "start_date", "end_date", "sample_size"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiftRequest {
    pub method: String,
    #[serde(default)]
    pub study_id: Option<String>,
    #[serde(default)]
    pub query: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl LiftRequest {
    /// Build a request from a raw `a=1&b=2` query string. `id` becomes the
    /// study id; everything else stays in `query`.
    pub fn from_query_string(method: &str, query_string: &str, body: Option<Value>) -> Self {
        let mut query = parse_query_string(query_string);
        let study_id = query.remove("id");
        Self {
            method: method.to_string(),
            study_id,
            query,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiftResponse {
    pub status: u16,
    pub body: Value,
}

impl LiftResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: String) -> Self {
        Self {
            status,
            body: json!({ "message": message }),
        }
    }
}

/// `a=1&b=2` → map. Keys and values are percent-decoded (`+` is a space).
/// Pairs without `=` are ignored; later keys win.
pub fn parse_query_string(query_string: &str) -> HashMap<String, String> {
    query_string
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (percent_decode(k), percent_decode(v)))
        .collect()
}

/// Malformed escapes are kept literally; invalid UTF-8 is replaced.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let decoded = raw
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub fn handle_request(service: &StudyService<'_>, request: &LiftRequest) -> LiftResponse {
    match request.method.to_ascii_uppercase().as_str() {
        "POST" => respond(create(service, request), |e| {
            format!("Error while creating lift study: {e}")
        }),
        "GET" => match request.study_id.as_deref() {
            Some(study_id) => respond(results(service, study_id, request), |e| {
                format!("Error while getting lift study results for study {study_id}: {e}")
            }),
            None => respond(list(service), |e| {
                format!("Error while getting all lift studies: {e}")
            }),
        },
        "PATCH" => respond(update(service, request), |e| {
            format!("Error while updating lift study status: {e}")
        }),
        other => {
            log::warn!("rejected {other} request");
            LiftResponse::error(405, "Invalid HTTP method.".into())
        }
    }
}

fn respond(result: LiftResult<Value>, describe: impl FnOnce(&LiftError) -> String) -> LiftResponse {
    match result {
        Ok(body) => LiftResponse::ok(body),
        Err(e) => {
            log::warn!("request failed: {e}");
            LiftResponse::error(e.status_code(), describe(&e))
        }
    }
}

fn create(service: &StudyService<'_>, request: &LiftRequest) -> LiftResult<Value> {
    let body = request.body.clone().unwrap_or_else(|| json!({}));
    let has_all = REQUIRED_CREATE_FIELDS
        .iter()
        .all(|f| body.get(f).is_some_and(|v| !v.is_null()));
    if !has_all {
        return Err(LiftError::Validation(
            "Missing required fields in request body.".into(),
        ));
    }
    let new_study: NewStudy = serde_json::from_value(body)
        .map_err(|e| LiftError::Validation(format!("Malformed request body: {e}")))?;

    let study_id = service.create_study(new_study)?;
    Ok(json!({ "study_id": study_id }))
}

fn results(service: &StudyService<'_>, study_id: &str, request: &LiftRequest) -> LiftResult<Value> {
    let conversion_event = request
        .query
        .get("conversion_event")
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            LiftError::Validation(
                "Conversion event name must be specified in the format \
                 conversion_event=<your event>"
                    .into(),
            )
        })?;
    let results = service.study_results(study_id, conversion_event)?;
    Ok(serde_json::to_value(results)?)
}

fn list(service: &StudyService<'_>) -> LiftResult<Value> {
    Ok(serde_json::to_value(service.list_studies()?)?)
}

fn update(service: &StudyService<'_>, request: &LiftRequest) -> LiftResult<Value> {
    let study_id = request.study_id.as_deref().ok_or_else(|| {
        LiftError::Validation("Study ID must be specified in the format /study/{id}".into())
    })?;
    let update: StudyUpdate = match &request.body {
        Some(body) => serde_json::from_value(body.clone())
            .map_err(|e| LiftError::Validation(format!("Malformed request body: {e}")))?,
        None => StudyUpdate::default(),
    };
    let updated = service.update_study(study_id, &update)?;
    Ok(json!({ "updated_fields": updated }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_splits_out_study_id() {
        let req = LiftRequest::from_query_string("GET", "id=abc123&conversion_event=Purchase", None);
        assert_eq!(req.study_id.as_deref(), Some("abc123"));
        assert_eq!(req.query.get("conversion_event").map(String::as_str), Some("Purchase"));
        assert!(!req.query.contains_key("id"));
    }

    #[test]
    fn empty_query_string_is_empty_map() {
        assert!(parse_query_string("").is_empty());
        let q = parse_query_string("a=1=2&flag");
        assert_eq!(q.get("a").map(String::as_str), Some("1=2"));
        assert!(!q.contains_key("flag"));
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let q = parse_query_string("conversion_event=Add%20To%20Cart&other=a+b%2Bc");
        assert_eq!(q.get("conversion_event").map(String::as_str), Some("Add To Cart"));
        assert_eq!(q.get("other").map(String::as_str), Some("a b+c"));

        let q = parse_query_string("name=caf%C3%A9&bad=100%&odd=%zz&sign=%+1");
        assert_eq!(q.get("name").map(String::as_str), Some("café"));
        assert_eq!(q.get("bad").map(String::as_str), Some("100%"));
        assert_eq!(q.get("odd").map(String::as_str), Some("%zz"));
        assert_eq!(q.get("sign").map(String::as_str), Some("% 1"));
    }
}

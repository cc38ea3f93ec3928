use crate::timing::Durations;
use bytes::Bytes;
use http::HeaderMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timing {
    pub durations: Durations,
}

/// A completed request: what the server sent plus how long each phase took.
#[derive(Debug, Clone)]
pub struct TimedResponse {
    pub status_code: u16,
    pub headers: HeaderMap,
    /// Full response body; empty for `HEAD` and bodiless statuses.
    pub body: Bytes,
    pub timing: Timing,
}

impl TimedResponse {
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// `{statusCode, headers, body, timing: {durations}}`. Repeated headers
    /// become arrays; a non-UTF-8 body becomes an array of bytes.
    pub fn to_json(&self) -> Value {
        let mut headers = Map::new();
        for name in self.headers.keys() {
            let values: Vec<Value> = self
                .headers
                .get_all(name)
                .iter()
                .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
                .collect();
            let value = match <[Value; 1]>::try_from(values) {
                Ok([single]) => single,
                Err(values) => Value::Array(values),
            };
            headers.insert(name.as_str().to_string(), value);
        }

        let body = match self.body_text() {
            Some(text) => Value::String(text.to_string()),
            None => json!(self.body.as_ref()),
        };

        json!({
            "statusCode": self.status_code,
            "headers": headers,
            "body": body,
            "timing": self.timing,
        })
    }
}

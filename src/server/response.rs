use crate::core::ConfigServerError;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{error, info};

/// Envelope every operation answers with. `Code` mirrors the HTTP status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "Code")]
    pub code: u16,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Data")]
    pub data: Option<JsonValue>,
    #[serde(rename = "Trace")]
    pub trace_id: String,
    #[serde(rename = "Server")]
    pub server: String,
    /// Milliseconds spent in the handler.
    #[serde(rename = "Cost")]
    pub cost: i64,
}

impl ApiResponse {
    fn new(status: StatusCode, message: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            success: status.is_success(),
            data,
            trace_id: String::new(),
            server: String::new(),
            cost: 0,
        }
    }

    pub fn success<T: Serialize + ?Sized>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::new(StatusCode::OK, "successful", Some(value)),
            Err(err) => Self::from_error(&ConfigServerError::Serialization(format!(
                "encode response data: {err}"
            ))),
        }
    }

    pub fn from_error(err: &ConfigServerError) -> Self {
        let message = match err {
            ConfigServerError::IllegalArgument(msg) => format!("illegal argument: {msg}"),
            ConfigServerError::NotFound(msg) => format!("resource not found: {msg}"),
            ConfigServerError::Unsupported(msg) => format!("bad request: {msg}"),
            other => format!("got internal error: {other}"),
        };
        Self::new(err.status(), message, None)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, None)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn stamp(&mut self, trace_id: &str, server: &str, cost: i64) {
        self.trace_id = trace_id.to_string();
        self.server = server.to_string();
        self.cost = cost;
    }
}

impl From<ConfigServerError> for ApiResponse {
    fn from(err: ConfigServerError) -> Self {
        Self::from_error(&err)
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

impl ApiResponse {
    /// Encode with `encoder`. A response that cannot be encoded is replaced
    /// by an internal error of its own that keeps the trace stamp.
    pub(crate) fn encode_with<F>(self, encoder: F) -> Response
    where
        F: FnOnce(&ApiResponse) -> serde_json::Result<Vec<u8>>,
    {
        match encoder(&self) {
            Ok(body) => {
                info!(response = %String::from_utf8_lossy(&body), "response");
                json_response(self.status(), body)
            }
            Err(err) => {
                error!(error = %err, "response serialization error");
                let mut fallback = Self::from_error(&ConfigServerError::Serialization(format!(
                    "serialize response: {err}"
                )));
                fallback.stamp(&self.trace_id, &self.server, self.cost);
                let body = serde_json::to_vec(&fallback).unwrap_or_default();
                json_response(StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        self.encode_with(|response| serde_json::to_vec(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_wraps_payload() {
        let response = ApiResponse::success(&vec!["c1", "c2"]);
        assert_eq!(response.code, 200);
        assert!(response.success);
        assert_eq!(response.message, "successful");
        assert_eq!(response.data, Some(serde_json::json!(["c1", "c2"])));
    }

    #[test]
    fn errors_carry_prefixed_messages() {
        let response = ApiResponse::from_error(&ConfigServerError::not_found("no cluster c9"));
        assert_eq!(response.code, 404);
        assert!(!response.success);
        assert_eq!(response.message, "resource not found: no cluster c9");
        assert!(response.data.is_none());

        let response = ApiResponse::from(ConfigServerError::illegal_argument("invalid action"));
        assert_eq!(response.code, 400);
        assert_eq!(response.message, "illegal argument: invalid action");
    }

    #[test]
    fn envelope_uses_wire_field_names() {
        let mut response = ApiResponse::service_unavailable("draining");
        response.stamp("00000000000000ab", "10.0.0.1", 3);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["Code"], 503);
        assert_eq!(value["Success"], false);
        assert_eq!(value["Trace"], "00000000000000ab");
        assert_eq!(value["Server"], "10.0.0.1");
        assert_eq!(value["Cost"], 3);
        assert!(value["Data"].is_null());
    }

    #[tokio::test]
    async fn encoding_failure_becomes_a_stamped_internal_error() {
        use axum::body::to_bytes;
        use serde::ser::Error as _;

        let mut response = ApiResponse::success(&vec!["c1"]);
        response.stamp("00000000000000cd", "10.0.0.2", 4);

        let encoded =
            response.encode_with(|_| Err(serde_json::Error::custom("map key must be a string")));
        assert_eq!(encoded.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(encoded.into_body(), usize::MAX).await.unwrap();
        let value: JsonValue = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["Code"], 500);
        assert_eq!(value["Success"], false);
        assert_eq!(value["Trace"], "00000000000000cd");
        assert_eq!(value["Server"], "10.0.0.2");
        assert_eq!(value["Cost"], 4);
        assert!(value["Data"].is_null());
        let message = value["Message"].as_str().unwrap();
        assert!(message.starts_with("got internal error: serialization error"));
        assert!(message.contains("map key must be a string"));
    }

    #[tokio::test]
    async fn encoded_response_mirrors_its_code() {
        use axum::body::to_bytes;

        let encoded = ApiResponse::from_error(&ConfigServerError::not_found("c1")).into_response();
        assert_eq!(encoded.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            encoded.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = to_bytes(encoded.into_body(), usize::MAX).await.unwrap();
        let value: JsonValue = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["Code"], 404);
    }
}

//! Request and response envelopes for the line-delimited JSON protocol.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Request ID - can be string, number, or null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    #[default]
    Null,
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "delete")]
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// One request line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    #[serde(default)]
    pub id: RequestId,
    pub method: Method,
    pub path: String,
    #[serde(default)]
    pub query: Map<String, Value>,
    /// Raw `Authorization` value, e.g. `Bearer <key>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: RequestId::Null,
            method,
            path: path.into(),
            query: Map::new(),
            authorization: None,
            body: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn bearer(mut self, key: &str) -> Self {
        self.authorization = Some(format!("Bearer {}", key));
        self
    }

    /// Integer query parameter. Strings are read up to the first non-digit,
    /// so `"2.5"` is 2 and `"10abc"` is 10; no leading digits reads as absent.
    pub fn query_i64(&self, name: &str) -> Option<i64> {
        match self.query.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => leading_integer(s),
            _ => None,
        }
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len() - sign_len);
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}

/// Pagination metadata for row listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

/// Response body: `{ success, data?, error?, code?, meta? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl ApiResponse {
    pub fn success(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            code: None,
            meta: None,
        }
    }

    pub fn failure(error: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            code: code.map(String::from),
            meta: None,
        }
    }
}

/// One response line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub id: RequestId,
    pub status: u16,
    pub body: ApiResponse,
}

impl GatewayResponse {
    pub fn ok(id: RequestId, data: Value) -> Self {
        Self {
            id,
            status: 200,
            body: ApiResponse::success(Some(data)),
        }
    }

    /// Success without a payload.
    pub fn empty(id: RequestId) -> Self {
        Self {
            id,
            status: 200,
            body: ApiResponse::success(None),
        }
    }

    pub fn with_meta(mut self, meta: PageMeta) -> Self {
        self.body.meta = Some(meta);
        self
    }

    pub fn error(id: RequestId, err: &GatewayError) -> Self {
        Self {
            id,
            status: err.status_code(),
            body: ApiResponse::failure(err.to_string(), err.code()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, ValidationError};
    use serde_json::json;

    #[test]
    fn test_request_parsing() {
        let line = r#"{"id":1,"method":"POST","path":"/api/query","authorization":"Bearer k","body":{"sql":"SELECT 1"}}"#;
        let request: GatewayRequest = serde_json::from_str(line).unwrap();
        assert_eq!(request.id, RequestId::Number(1));
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.authorization.as_deref(), Some("Bearer k"));
        assert!(request.query.is_empty());
    }

    #[test]
    fn test_request_defaults() {
        let request: GatewayRequest =
            serde_json::from_str(r#"{"method":"get","path":"/api/tables"}"#).unwrap();
        assert_eq!(request.id, RequestId::Null);
        assert_eq!(request.method, Method::Get);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_query_i64() {
        let request = GatewayRequest::new(Method::Get, "/api/tables/t/rows")
            .with_query("page", "3")
            .with_query("limit", 20)
            .with_query("bad", "x");
        assert_eq!(request.query_i64("page"), Some(3));
        assert_eq!(request.query_i64("limit"), Some(20));
        assert_eq!(request.query_i64("bad"), None);
        assert_eq!(request.query_i64("missing"), None);
    }

    #[test]
    fn test_query_i64_reads_leading_digits() {
        let request = GatewayRequest::new(Method::Get, "/api/tables/t/rows")
            .with_query("page", "2.5")
            .with_query("limit", "10abc")
            .with_query("neg", " -4")
            .with_query("sign", "-");
        assert_eq!(request.query_i64("page"), Some(2));
        assert_eq!(request.query_i64("limit"), Some(10));
        assert_eq!(request.query_i64("neg"), Some(-4));
        assert_eq!(request.query_i64("sign"), None);
    }

    #[test]
    fn test_success_response_shape() {
        let response = GatewayResponse::ok(RequestId::from("a"), json!([1, 2])).with_meta(PageMeta {
            page: 1,
            limit: 50,
            total: 2,
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body"]["success"], true);
        assert_eq!(value["body"]["meta"]["total"], 2);
        assert!(value["body"].get("error").is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let err: GatewayError = ValidationError::CommentPresent.into();
        let value = serde_json::to_value(GatewayResponse::error(RequestId::Null, &err)).unwrap();
        assert_eq!(value["status"], 400);
        assert_eq!(value["body"]["success"], false);
        assert_eq!(value["body"]["code"], "comment_present");
        assert!(value["body"].get("data").is_none());

        let err: GatewayError = AuthError::Unauthorized.into();
        let response = GatewayResponse::error(RequestId::Number(9), &err);
        assert_eq!(response.status, 401);
        assert_eq!(response.body.error.as_deref(), Some("Unauthorized"));
        assert!(response.body.code.is_none());
    }
}

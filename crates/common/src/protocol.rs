//! Request and response bodies of the public HTTP API.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Register endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /api/register`.
///
/// No shape or type validation: every field accepts any JSON value and may be
/// absent. An explicit `null` is kept (`Some(Value::Null)`) and stored as such;
/// only a missing key is `None`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub ssn: Option<serde_json::Value>,
}

impl RegisterRequest {
    /// Present fields in declaration order, paired with their document key.
    pub fn fields(self) -> impl Iterator<Item = (&'static str, serde_json::Value)> {
        [
            ("name", self.name),
            ("email", self.email),
            ("password", self.password),
            ("ssn", self.ssn),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
    }
}

/// Maps any present value, `null` included, to `Some`. Missing keys never
/// reach this function and fall back to `default`.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Successful response body for `POST /api/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    /// Identifier generated for the inserted record.
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl RegisterResponse {
    pub const MESSAGE: &'static str = "User registered successfully";

    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            message: Self::MESSAGE.into(),
            user_id: user_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

/// Body returned with 5xx statuses: the raw underlying error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body returned with 404 statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process can answer.
    pub status: String,
    /// Crate version of the running binary.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_request_accepts_partial_and_untyped_bodies() {
        let req: RegisterRequest =
            serde_json::from_value(json!({"name": 42, "email": "a@b.c", "extra": true})).unwrap();
        let fields: Vec<_> = req.fields().collect();
        assert_eq!(
            fields,
            vec![("name", json!(42)), ("email", json!("a@b.c"))]
        );
    }

    #[test]
    fn register_request_keeps_explicit_null() {
        let req: RegisterRequest =
            serde_json::from_value(json!({"name": null, "email": "a@b.c"})).unwrap();
        assert_eq!(req.name, Some(serde_json::Value::Null));
        assert!(req.password.is_none());
        let fields: Vec<_> = req.fields().collect();
        assert_eq!(
            fields,
            vec![("name", serde_json::Value::Null), ("email", json!("a@b.c"))]
        );
    }

    #[test]
    fn register_response_uses_camel_case_id() {
        let body = serde_json::to_value(RegisterResponse::new("abc")).unwrap();
        assert_eq!(
            body,
            json!({"message": "User registered successfully", "userId": "abc"})
        );
    }

    #[test]
    fn error_and_message_shapes() {
        assert_eq!(
            serde_json::to_value(ErrorResponse::new("boom")).unwrap(),
            json!({"error": "boom"})
        );
        assert_eq!(
            serde_json::to_value(MessageResponse::new("User not found")).unwrap(),
            json!({"message": "User not found"})
        );
    }
}

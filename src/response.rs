use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// JSON envelope shared by every endpoint: `{status, message, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_data(code: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status: code.as_u16(),
            message: message.into(),
            data: Some(data),
            code,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: code.as_u16(),
            message: message.into(),
            data: None,
            code,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let code = self.code;
        (code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_only_omits_data() {
        let body = ApiResponse::message(StatusCode::NOT_FOUND, "User not found");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["message"], "User not found");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn data_is_nested_under_data_key() {
        let body = ApiResponse::with_data(StatusCode::CREATED, "created", serde_json::json!({ "id": 7 }));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], 201);
        assert_eq!(json["data"]["id"], 7);
    }
}

//! Success envelope shared by every handler.
//!
//! Records serialize their identifier under the storage key `_id`; the
//! envelope renames it to `id` everywhere in the outgoing document.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

pub const STORAGE_ID_KEY: &str = "_id";
pub const CLIENT_ID_KEY: &str = "id";

#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    body: Option<Map<String, Value>>,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Result<Self, AppError> {
        let data = serde_json::to_value(data).map_err(anyhow::Error::from)?;
        let mut body = Map::new();
        body.insert("status".into(), Value::from("success"));
        body.insert("data".into(), data);
        Ok(Self {
            status: StatusCode::OK,
            body: Some(body),
        })
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a top-level sibling of `data` (e.g. `token`, `totalPages`).
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Some(body) = self.body.as_mut() {
            body.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.with_field("message", message.into())
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => {
                let mut body = Value::Object(body);
                normalize_ids(&mut body);
                (self.status, Json(body)).into_response()
            }
            None => self.status.into_response(),
        }
    }
}

/// Renames every `_id` key to `id`, at any depth.
///
/// `Value` is an owned tree, so each node is reached through exactly one
/// parent and is visited once; the walk is iterative to keep deep documents
/// off the call stack.
pub fn normalize_ids(root: &mut Value) {
    let mut pending: Vec<&mut Value> = vec![root];
    while let Some(node) = pending.pop() {
        match node {
            Value::Object(map) => {
                if let Some(id) = map.remove(STORAGE_ID_KEY) {
                    map.insert(CLIENT_ID_KEY.to_string(), id);
                }
                pending.extend(map.values_mut());
            }
            Value::Array(items) => pending.extend(items.iter_mut()),
            _ => {}
        }
    }
}

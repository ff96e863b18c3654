//! Built-in view and view helpers.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::{header, StatusCode};
use serde_json::{json, Value as JsonValue};

use crate::core::{DataBag, LifecycleError, LifecycleResult, Request, Response, View, ViewHelper};

use super::response::content_type;

/// View that renders its data bag (and error, if any) as a JSON document.
///
/// A view carrying an error renders with a 500 status.
#[derive(Debug, Default)]
pub struct JsonView {
    data: DataBag,
    error: Option<String>,
    renders: usize,
}

impl JsonView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: DataBag) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of times the view was rendered
    pub fn render_count(&self) -> usize {
        self.renders
    }
}

#[async_trait]
impl View for JsonView {
    fn data(&self) -> &DataBag {
        &self.data
    }

    fn data_mut(&mut self) -> &mut DataBag {
        &mut self.data
    }

    fn set_data(&mut self, data: DataBag) {
        self.data = data;
    }

    fn set_error(&mut self, error: &LifecycleError) {
        self.error = Some(error.to_string());
    }

    async fn render(
        &mut self,
        response: &mut dyn Response,
        request: &dyn Request,
    ) -> LifecycleResult<()> {
        self.renders += 1;

        let document = json!({
            "route": request.route_path(),
            "data": self.data,
            "error": self.error,
        });
        let body = serde_json::to_vec(&document)?;

        let status = if self.error.is_some() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        };
        response.set_status(status);
        response.set_header(header::CONTENT_TYPE.as_str(), content_type::APPLICATION_JSON);
        response.write(Bytes::from(body));
        Ok(())
    }
}

/// Date/time helper exposed to views under `moment`
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockHelper;

impl ViewHelper for ClockHelper {
    fn name(&self) -> &str {
        "moment"
    }

    fn value(&self) -> JsonValue {
        let now = Utc::now();
        json!({
            "now": now.to_rfc3339(),
            "timestamp": now.timestamp(),
            "date": now.format("%Y-%m-%d").to_string(),
        })
    }
}

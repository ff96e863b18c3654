//! Response handling utilities.
//!
//! Lifecycles write into a [`BufferedResponse`]; the HTTP service flushes
//! the buffer to the pingora session once the lifecycle is over.

use bytes::{Bytes, BytesMut};
use http::{header, StatusCode};
use pingora_error::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::Session;

use crate::core::Response;

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const APPLICATION_JSON: &str = "application/json";
}

/// In-memory response sink
#[derive(Debug)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: BytesMut,
    finished: bool,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: BytesMut::new(),
            finished: false,
        }
    }
}

impl BufferedResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Build the response header, defaulting the content type to plain text
    pub fn build_header(&self) -> Result<ResponseHeader> {
        let mut resp = ResponseHeader::build(self.status, None)?;
        for (name, value) in &self.headers {
            resp.insert_header(name.clone(), value.clone())?;
        }
        if resp.headers.get(header::CONTENT_TYPE).is_none() {
            resp.insert_header(header::CONTENT_TYPE, content_type::TEXT_PLAIN)?;
        }
        resp.insert_header(header::CONTENT_LENGTH, self.body.len().to_string())?;
        Ok(resp)
    }

    /// Write the buffered response to the downstream session
    pub async fn flush_to(self, session: &mut Session) -> Result<()> {
        let resp = self.build_header()?;
        let body = self.body.freeze();
        let empty = body.is_empty();

        session.write_response_header(Box::new(resp), empty).await?;
        if !empty {
            session.write_response_body(Some(body), true).await?;
        }

        Ok(())
    }
}

impl Response for BufferedResponse {
    fn set_status(&mut self, status: StatusCode) {
        if self.finished {
            log::warn!("Response already finished, ignoring status {}", status);
            return;
        }
        self.status = status;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        if self.finished {
            log::warn!("Response already finished, ignoring header {}", name);
            return;
        }
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn write(&mut self, body: Bytes) {
        if self.finished {
            log::warn!("Response already finished, dropping {} body bytes", body.len());
            return;
        }
        self.body.extend_from_slice(&body);
    }

    fn end(&mut self) {
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_finish() {
        let mut response = BufferedResponse::default();
        response.send(StatusCode::INTERNAL_SERVER_ERROR, "boom");

        assert!(response.is_finished());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), b"boom");

        // writes after completion are ignored
        response.send(StatusCode::OK, "late");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_str(), "boom");
    }

    #[test]
    fn test_build_header() {
        let mut response = BufferedResponse::default();
        response.set_header("Content-Type", content_type::APPLICATION_JSON);
        response.set_header("content-type", content_type::APPLICATION_JSON);
        response.write(Bytes::from_static(b"{}"));

        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.header("CONTENT-TYPE"), Some(content_type::APPLICATION_JSON));

        let resp = response.build_header().unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(
            resp.headers.get(header::CONTENT_LENGTH).unwrap().to_str().unwrap(),
            "2"
        );
    }
}

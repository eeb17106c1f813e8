//! Exception listener rendering errors as responses.

use async_kernel_core::{BoxError, ExceptionEvent, ResponseExt, SyncListener, response};
use http::StatusCode;
use serde_json::json;

/// Answers every error with a response describing it.
///
/// The status comes from the error when it carries one, `500` otherwise.
/// Server errors hide their message unless [`verbose`](Self::verbose) is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorResponseListener {
    json: bool,
    verbose: bool,
}

impl ErrorResponseListener {
    /// Plain text bodies.
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON bodies of the form `{"status": 404, "error": "..."}`.
    pub fn json() -> Self {
        Self {
            json: true,
            verbose: false,
        }
    }

    /// Expose the message of server errors too.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl SyncListener<ExceptionEvent> for ErrorResponseListener {
    fn on_event_sync(&self, event: &mut ExceptionEvent) -> Result<(), BoxError> {
        let error = event.error();
        let status = error
            .status_code()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = if status.is_server_error() && !self.verbose {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            error.to_string()
        };

        let mut response = if self.json {
            response::json(&json!({ "status": status.as_u16(), "error": message }))
        } else {
            response::text(message)
        };
        *response.status_mut() = status;
        if let Some(headers) = error.headers() {
            response.merge_headers(headers);
        }
        event.set_response(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NullKernel;
    use async_kernel_core::{HttpError, KernelError, Request, RequestKind, ResponseExt};
    use std::sync::Arc;

    fn exception(error: KernelError) -> ExceptionEvent {
        ExceptionEvent::new(
            NullKernel::shared(),
            Arc::new(Request::get("/missing")),
            RequestKind::Main,
            error,
        )
    }

    #[test]
    fn uses_the_error_status() {
        let mut event = exception(KernelError::Http(HttpError::not_found("no such page")));

        ErrorResponseListener::new().on_event_sync(&mut event).unwrap();

        let response = event.into_parts().response.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "no such page");
    }

    #[test]
    fn hides_server_error_messages() {
        let mut event = exception(KernelError::msg("database password is hunter2"));

        ErrorResponseListener::json().on_event_sync(&mut event).unwrap();

        let response = event.into_parts().response.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.body_text(),
            r#"{"status":500,"error":"Internal Server Error"}"#
        );
    }

    #[test]
    fn verbose_exposes_server_error_messages() {
        let mut event = exception(KernelError::msg("E1"));

        ErrorResponseListener::new()
            .verbose()
            .on_event_sync(&mut event)
            .unwrap();

        assert_eq!(event.into_parts().response.unwrap().body_text(), "E1");
    }

    #[test]
    fn keeps_every_value_of_error_headers() {
        let mut headers = http::HeaderMap::new();
        headers.append(http::header::SET_COOKIE, http::HeaderValue::from_static("a=1"));
        headers.append(http::header::SET_COOKIE, http::HeaderValue::from_static("b=2"));
        let error = HttpError::new(StatusCode::FORBIDDEN, "forbidden").with_headers(headers);
        let mut event = exception(KernelError::Http(error));

        ErrorResponseListener::new().on_event_sync(&mut event).unwrap();

        let response = event.into_parts().response.unwrap();
        let cookies: Vec<_> = response
            .headers()
            .get_all(http::header::SET_COOKIE)
            .iter()
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }
}

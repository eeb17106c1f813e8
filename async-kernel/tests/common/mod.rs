#![allow(dead_code)]

use async_kernel::prelude::*;
use futures::future::BoxFuture;
use serde_json::json;

// ============================================================================
// Controllers
// ============================================================================

pub fn get_value(_request: Arc<Request>, _args: Arguments) -> Result<ControllerOutput, BoxError> {
    Ok(response::text("X").into())
}

pub fn get_promise(_request: Arc<Request>, _args: Arguments) -> Result<ControllerOutput, BoxError> {
    Ok(Deferred::fulfilled(response::text("Y")).into())
}

pub fn throw_exception(_request: Arc<Request>, _args: Arguments) -> Result<ControllerOutput, BoxError> {
    Err("E1".into())
}

pub fn get_promise_exception(
    _request: Arc<Request>,
    _args: Arguments,
) -> Result<ControllerOutput, BoxError> {
    Ok(Deferred::<Response>::rejected(KernelError::msg("E2")).into())
}

pub fn get_simple_result(
    _request: Arc<Request>,
    _args: Arguments,
) -> Result<ControllerOutput, BoxError> {
    Ok(ControllerOutput::Value(json!(["a", "b"])))
}

pub fn get_nothing(_request: Arc<Request>, _args: Arguments) -> Result<ControllerOutput, BoxError> {
    Ok(ControllerOutput::Value(serde_json::Value::Null))
}

pub fn get_deferred_value(
    _request: Arc<Request>,
    _args: Arguments,
) -> Result<ControllerOutput, BoxError> {
    Ok(ControllerOutput::Deferred(Deferred::new(async {
        Ok(ControllerOutput::Value(json!({ "late": true })))
    })))
}

pub fn echo_user(_request: Arc<Request>, args: Arguments) -> Result<ControllerOutput, BoxError> {
    let id = args.first().and_then(|id| id.as_str()).unwrap_or("?");
    Ok(response::text(format!("user {id}")).into())
}

pub fn echo_depth(request: Arc<Request>, _args: Arguments) -> Result<ControllerOutput, BoxError> {
    let depth = request
        .header(async_kernel::REQUEST_DEPTH_HEADER)
        .unwrap_or_default();
    Ok(response::text(depth).into())
}

pub fn invalid_request(_request: Arc<Request>, _args: Arguments) -> Result<ControllerOutput, BoxError> {
    Err(Box::new(KernelError::RequestValidation(
        "malformed query string".to_string(),
    )))
}

pub fn conflict(_request: Arc<Request>, _args: Arguments) -> Result<ControllerOutput, BoxError> {
    let mut headers = http::HeaderMap::new();
    headers.insert("retry-after", http::HeaderValue::from_static("5"));
    headers.append("set-cookie", http::HeaderValue::from_static("a=1"));
    headers.append("set-cookie", http::HeaderValue::from_static("b=2"));
    Err(Box::new(
        HttpError::new(http::StatusCode::CONFLICT, "already exists").with_headers(headers),
    ))
}

pub fn routes() -> RouteTable {
    RouteTable::builder()
        .route("/value", get_value)
        .unwrap()
        .route("/promise", get_promise)
        .unwrap()
        .route("/exception", throw_exception)
        .unwrap()
        .route("/promise-exception", get_promise_exception)
        .unwrap()
        .route("/simple-result", get_simple_result)
        .unwrap()
        .route("/nothing", get_nothing)
        .unwrap()
        .route("/deferred-value", get_deferred_value)
        .unwrap()
        .route("/users/{id}", echo_user)
        .unwrap()
        .route("/depth", echo_depth)
        .unwrap()
        .route("/invalid", invalid_request)
        .unwrap()
        .route("/conflict", conflict)
        .unwrap()
        .build()
}

pub fn kernel<D: EventDispatcher>(dispatcher: D) -> Kernel<D> {
    Kernel::builder().dispatcher(dispatcher).resolver(routes()).build()
}

pub fn get(path: &str) -> Request {
    Request::get(path)
}

// ============================================================================
// Listeners
// ============================================================================

pub fn respond_a(event: &mut RequestEvent) -> BoxFuture<'_, Result<(), BoxError>> {
    Box::pin(async move {
        event.set_response(response::text("A"));
        Ok(())
    })
}

pub fn respond_b(event: &mut RequestEvent) -> BoxFuture<'_, Result<(), BoxError>> {
    Box::pin(async move {
        event.set_response(response::text("B"));
        Ok(())
    })
}

pub fn do_nothing(_event: &mut RequestEvent) -> BoxFuture<'_, Result<(), BoxError>> {
    Box::pin(async { Ok(()) })
}

pub fn ignore_exception(_event: &mut ExceptionEvent) -> BoxFuture<'_, Result<(), BoxError>> {
    Box::pin(async { Ok(()) })
}

pub fn answer_exception(event: &mut ExceptionEvent) -> BoxFuture<'_, Result<(), BoxError>> {
    Box::pin(async move {
        event.set_response(response::with_status("EXC", http::StatusCode::NOT_FOUND));
        Ok(())
    })
}

pub fn answer_exception_ok(event: &mut ExceptionEvent) -> Result<(), BoxError> {
    event.set_response(response::text("rescued"));
    Ok(())
}

pub fn json_view(event: &mut ViewEvent) -> Result<(), BoxError> {
    let response = response::json(event.controller_result());
    event.set_response(response);
    Ok(())
}

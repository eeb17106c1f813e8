//! Path routing backed by `matchit`.
//!
//! Patterns use `matchit` syntax: `/users/{id}` captures one segment and
//! `/assets/{*path}` captures the rest of the path.
//!
//! On a match, [`RouteTable`] records three request attributes:
//!
//! | attribute | value |
//! |---|---|
//! | [`ROUTE_ATTRIBUTE`] | the matched pattern |
//! | [`ROUTE_PARAMS_ATTRIBUTE`] | an object of captured parameters, in pattern order |
//! | [`CONTROLLER_ATTRIBUTE`] | the controller name |
//!
//! [`RouteArgumentResolver`] then binds the captured parameters, in pattern
//! order, as the controller arguments.

use async_kernel_core::{
    ArgumentResolver, Arguments, Controller, ControllerRef, ControllerResolver, KernelError,
    Request,
};
use matchit::{InsertError, Match, Router as InnerRouter};
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::trace;

/// Attribute holding the matched route pattern.
pub const ROUTE_ATTRIBUTE: &str = "_route";
/// Attribute holding the captured route parameters.
pub const ROUTE_PARAMS_ATTRIBUTE: &str = "_route_params";
/// Attribute holding the resolved controller name.
pub const CONTROLLER_ATTRIBUTE: &str = "_controller";

/// Errors raised while building a [`RouteTable`].
#[derive(Error, Debug)]
pub enum RoutingError {
    /// The pattern is malformed or conflicts with another one.
    #[error("invalid route `{pattern}`: {source}")]
    InvalidRoute {
        /// The rejected pattern.
        pattern: String,
        /// Why `matchit` rejected it.
        #[source]
        source: InsertError,
    },
}

struct Route {
    pattern: String,
    controller: ControllerRef,
}

/// Resolves controllers by request path.
pub struct RouteTable {
    router: InnerRouter<Route>,
    patterns: Vec<String>,
}

impl RouteTable {
    /// Start building a table.
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Registered patterns, in registration order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl ControllerResolver for RouteTable {
    fn resolve(&self, request: &Request) -> Option<ControllerRef> {
        let Ok(Match { value, params }) = self.router.at(request.path()) else {
            trace!(path = request.path(), "no route matched");
            return None;
        };
        let params: Map<String, Value> = params
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();

        trace!(path = request.path(), route = %value.pattern, "route matched");
        request.set_attribute(ROUTE_ATTRIBUTE, Value::String(value.pattern.clone()));
        request.set_attribute(ROUTE_PARAMS_ATTRIBUTE, Value::Object(params));
        request.set_attribute(
            CONTROLLER_ATTRIBUTE,
            Value::String(value.controller.name()),
        );
        Some(Arc::clone(&value.controller))
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("patterns", &self.patterns)
            .finish()
    }
}

/// Builder for [`RouteTable`].
pub struct RouteTableBuilder {
    router: InnerRouter<Route>,
    patterns: Vec<String>,
}

impl Default for RouteTableBuilder {
    fn default() -> Self {
        Self {
            router: InnerRouter::new(),
            patterns: Vec::new(),
        }
    }
}

impl fmt::Debug for RouteTableBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTableBuilder")
            .field("patterns", &self.patterns)
            .finish()
    }
}

impl RouteTableBuilder {
    /// Register a controller for a pattern.
    pub fn route<C: Controller>(
        self,
        pattern: impl Into<String>,
        controller: C,
    ) -> Result<Self, RoutingError> {
        self.route_shared(pattern, Arc::new(controller))
    }

    /// Register an already shared controller for a pattern.
    pub fn route_shared(
        mut self,
        pattern: impl Into<String>,
        controller: ControllerRef,
    ) -> Result<Self, RoutingError> {
        let pattern = pattern.into();
        let route = Route {
            pattern: pattern.clone(),
            controller,
        };
        match self.router.insert(pattern.clone(), route) {
            Ok(()) => {
                self.patterns.push(pattern);
                Ok(self)
            }
            Err(source) => Err(RoutingError::InvalidRoute { pattern, source }),
        }
    }

    /// Freeze the table.
    pub fn build(self) -> RouteTable {
        RouteTable {
            router: self.router,
            patterns: self.patterns,
        }
    }
}

/// Binds captured route parameters as controller arguments.
///
/// Requests without route parameters get no arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteArgumentResolver;

impl ArgumentResolver for RouteArgumentResolver {
    fn resolve(
        &self,
        request: &Request,
        _controller: &ControllerRef,
    ) -> Result<Arguments, KernelError> {
        match request.attribute(ROUTE_PARAMS_ATTRIBUTE) {
            Some(Value::Object(params)) => Ok(params.into_iter().map(|(_, value)| value).collect()),
            Some(other) => Err(KernelError::RequestValidation(format!(
                "route parameters must be an object, got {other}"
            ))),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticController;
    use serde_json::json;

    fn table() -> RouteTable {
        RouteTable::builder()
            .route("/users/{id}/posts/{post}", StaticController::text("post"))
            .unwrap()
            .route("/users/{id}", StaticController::text("user"))
            .unwrap()
            .build()
    }

    #[test]
    fn resolves_and_records_attributes() {
        let request = Request::get("/users/42");

        let controller = table().resolve(&request).unwrap();

        assert_eq!(controller.name(), "static:user");
        assert_eq!(request.attribute(ROUTE_ATTRIBUTE), Some(json!("/users/{id}")));
        assert_eq!(
            request.attribute(ROUTE_PARAMS_ATTRIBUTE),
            Some(json!({ "id": "42" }))
        );
        assert_eq!(request.attribute(CONTROLLER_ATTRIBUTE), Some(json!("static:user")));
    }

    #[test]
    fn builder_debug_lists_patterns() {
        let builder = RouteTable::builder()
            .route("/users/{id}", StaticController::text("a"))
            .unwrap();

        assert_eq!(
            format!("{builder:?}"),
            r#"RouteTableBuilder { patterns: ["/users/{id}"] }"#
        );
    }

    #[test]
    fn unknown_path_resolves_nothing() {
        assert!(table().resolve(&Request::get("/nope")).is_none());
    }

    #[test]
    fn conflicting_routes_are_rejected() {
        let error = RouteTable::builder()
            .route("/users/{id}", StaticController::text("a"))
            .unwrap()
            .route("/users/{name}", StaticController::text("b"))
            .unwrap_err();

        assert!(matches!(error, RoutingError::InvalidRoute { ref pattern, .. } if pattern == "/users/{name}"));
    }

    #[test]
    fn binds_parameters_in_pattern_order() {
        let table = table();
        let request = Request::get("/users/7/posts/9");
        let controller = table.resolve(&request).unwrap();

        let arguments = RouteArgumentResolver.resolve(&request, &controller).unwrap();

        assert_eq!(arguments, vec![json!("7"), json!("9")]);
    }

    #[test]
    fn no_parameters_means_no_arguments() {
        let request = Request::get("/");
        let controller: ControllerRef = Arc::new(StaticController::text("x"));

        assert!(RouteArgumentResolver.resolve(&request, &controller).unwrap().is_empty());
    }

    #[test]
    fn malformed_parameters_are_a_validation_error() {
        let request = Request::get("/");
        request.set_attribute(ROUTE_PARAMS_ATTRIBUTE, json!("oops"));
        let controller: ControllerRef = Arc::new(StaticController::text("x"));

        let error = RouteArgumentResolver.resolve(&request, &controller).unwrap_err();

        assert!(error.is_request_validation());
    }
}

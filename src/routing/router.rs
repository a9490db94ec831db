//! Route table: (method, template) → operation bindings.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Reject structurally identical templates registered for the same method
//! - Resolve a request to a route, a method mismatch, or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) method lookup via HashMap, O(n) template scan per method
//! - First registered match wins
//! - Explicit NotFound rather than silent default

use axum::http::Method;
use std::collections::HashMap;
use thiserror::Error;

use crate::routing::matcher::{split_path, Captures, Pattern, PatternError};
use crate::routing::operation::OperationId;

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: Pattern,
    pub operation: OperationId,
}

/// Result of resolving a request.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A route matched; captures belong to this request only.
    Matched { route: &'a Route, captures: Captures },
    /// The path is registered, but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    /// No template matches the path.
    NotFound,
}

/// Errors raised while building the table. All of them are startup-fatal.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("duplicate route {method} {template}: already registered as {existing} for `{operation}`")]
    Duplicate {
        method: Method,
        template: String,
        existing: String,
        operation: OperationId,
    },
}

/// Insertion-ordered collection of routes, grouped by method.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<Route>>,
    len: usize,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-compiled pattern.
    pub fn register(
        &mut self,
        method: Method,
        pattern: Pattern,
        operation: OperationId,
    ) -> Result<(), RouteError> {
        let routes = self.routes.entry(method.clone()).or_default();

        if let Some(existing) = routes.iter().find(|r| r.pattern.same_shape(&pattern)) {
            return Err(RouteError::Duplicate {
                method,
                template: pattern.template().to_string(),
                existing: existing.pattern.template().to_string(),
                operation: existing.operation,
            });
        }

        tracing::debug!(
            method = %method,
            template = %pattern,
            operation = %operation,
            "Route registered"
        );

        routes.push(Route {
            method,
            pattern,
            operation,
        });
        self.len += 1;
        Ok(())
    }

    /// Compile and register a template string.
    pub fn register_template(
        &mut self,
        method: Method,
        template: &str,
        operation: OperationId,
    ) -> Result<(), RouteError> {
        let pattern = Pattern::compile(template)?;
        self.register(method, pattern, operation)
    }

    /// Register the built-in routes under `/<namespace>/<version>/`.
    pub fn with_builtin(namespace: &str, version: &str) -> Result<Self, RouteError> {
        let mut table = Self::new();
        let operations = OperationId::BACKEND
            .iter()
            .copied()
            .chain(std::iter::once(OperationId::Docs));

        for operation in operations {
            let mut segments = vec![namespace, version];
            segments.extend_from_slice(operation.default_suffix());
            let pattern = Pattern::literal(&segments)?;
            table.register(operation.default_method(), pattern, operation)?;
        }
        Ok(table)
    }

    /// Resolve a request path for the given method.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let segments = split_path(path);

        if let Some(routes) = self.routes.get(method) {
            for route in routes {
                if let Some(captures) = route.pattern.match_segments(&segments) {
                    return Resolution::Matched { route, captures };
                }
            }
        }

        let mut allowed: Vec<Method> = self
            .routes
            .iter()
            .filter(|(m, _)| *m != method)
            .filter(|(_, routes)| {
                routes
                    .iter()
                    .any(|r| r.pattern.match_segments(&segments).is_some())
            })
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Resolution::MethodNotAllowed { allowed }
        }
    }

    /// Total number of registered routes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Routes registered for a method, in registration order.
    pub fn routes_for(&self, method: &Method) -> &[Route] {
        self.routes.get(method).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> RouteTable {
        RouteTable::with_builtin("faiss", "1.0").unwrap()
    }

    fn resolved(table: &RouteTable, method: Method, path: &str) -> Option<OperationId> {
        match table.resolve(&method, path) {
            Resolution::Matched { route, .. } => Some(route.operation),
            _ => None,
        }
    }

    #[test]
    fn test_builtin_routes() {
        let table = builtin();
        assert_eq!(table.len(), 9);
        assert_eq!(resolved(&table, Method::POST, "/faiss/1.0/ping"), Some(OperationId::Ping));
        assert_eq!(resolved(&table, Method::POST, "/faiss/1.0/db/new"), Some(OperationId::DbNew));
        assert_eq!(resolved(&table, Method::POST, "/faiss/1.0/db/list"), Some(OperationId::DbList));
        assert_eq!(resolved(&table, Method::POST, "/faiss/1.0/db/del"), Some(OperationId::DbDel));
        assert_eq!(resolved(&table, Method::POST, "/faiss/1.0/hset"), Some(OperationId::HSet));
        assert_eq!(resolved(&table, Method::POST, "/faiss/1.0/hget"), Some(OperationId::HGet));
        assert_eq!(resolved(&table, Method::POST, "/faiss/1.0/hsearch"), Some(OperationId::HSearch));
        assert_eq!(resolved(&table, Method::POST, "/faiss/1.0/hdel"), Some(OperationId::HDel));
        assert_eq!(resolved(&table, Method::GET, "/faiss/1.0/swagger.json"), Some(OperationId::Docs));
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let table = builtin();
        assert!(matches!(table.resolve(&Method::POST, "/faiss/1.0/hsave"), Resolution::NotFound));
        assert!(matches!(table.resolve(&Method::POST, "/"), Resolution::NotFound));
        assert!(matches!(table.resolve(&Method::POST, ""), Resolution::NotFound));
        assert!(matches!(table.resolve(&Method::POST, "/faiss/2.0/ping"), Resolution::NotFound));
    }

    #[test]
    fn test_wrong_method_is_reported() {
        let table = builtin();
        match table.resolve(&Method::GET, "/faiss/1.0/ping") {
            Resolution::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::POST]),
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
        match table.resolve(&Method::POST, "/faiss/1.0/swagger.json") {
            Resolution::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::GET]),
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut table = builtin();
        let err = table
            .register_template(Method::POST, "/faiss/1.0/ping/", OperationId::HGet)
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { operation: OperationId::Ping, .. }));

        table
            .register_template(Method::POST, "/v1/db/{name}", OperationId::DbDel)
            .unwrap();
        assert!(table
            .register_template(Method::POST, "/v1/db/{db_name}", OperationId::DbNew)
            .is_err());

        // Same shape under another method is fine.
        table
            .register_template(Method::PUT, "/v1/db/{db_name}", OperationId::DbNew)
            .unwrap();
    }

    #[test]
    fn test_first_registered_wins() {
        let mut table = RouteTable::new();
        table
            .register_template(Method::POST, "/v1/{db_name}/hget", OperationId::HGet)
            .unwrap();
        table
            .register_template(Method::POST, "/v1/special/{action}", OperationId::Ping)
            .unwrap();

        // "/v1/special/hget" matches both; the earlier route wins every time.
        for _ in 0..3 {
            assert_eq!(
                resolved(&table, Method::POST, "/v1/special/hget"),
                Some(OperationId::HGet)
            );
        }
    }

    #[test]
    fn test_captures_are_returned() {
        let mut table = RouteTable::new();
        table
            .register_template(Method::POST, "/v1/{db_name}/vectors/{id}", OperationId::HGet)
            .unwrap();
        match table.resolve(&Method::POST, "/v1/testDB/vectors/9") {
            Resolution::Matched { route, captures } => {
                assert_eq!(route.operation, OperationId::HGet);
                assert_eq!(captures.get("db_name"), Some("testDB"));
                assert_eq!(captures.get("id"), Some("9"));
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_template_is_rejected() {
        let mut table = RouteTable::new();
        assert!(matches!(
            table.register_template(Method::POST, "/v1/{", OperationId::Ping),
            Err(RouteError::Pattern(_))
        ));
        assert!(table.is_empty());
    }
}

//! Router configuration: repositories are registered on a [`CrudRouter`] which
//! builds one `axum::Router` with a catch-all 404 and a request body limit.

mod crud;

pub use crud::{crud_routes, RouteOptions};

use crate::repository::CrudRepository;
use crate::response::page_not_found;
use axum::{extract::DefaultBodyLimit, http::StatusCode, response::Response, Router};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Default request body limit: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

type Registration = Box<dyn FnOnce(&RouteOptions) -> Router + Send>;

pub struct CrudRouter {
    options: RouteOptions,
    body_limit: usize,
    registrations: Vec<Registration>,
}

impl Default for CrudRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl CrudRouter {
    pub fn new() -> Self {
        CrudRouter {
            options: RouteOptions::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            registrations: Vec::new(),
        }
    }

    /// Status for successful GET responses; applies to every registered table.
    pub fn read_status(mut self, status: StatusCode) -> Self {
        self.options.read_status = status;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn register<R: CrudRepository>(mut self, repo: Arc<R>) -> Self {
        self.registrations
            .push(Box::new(move |options: &RouteOptions| crud_routes(repo, options)));
        self
    }

    pub fn build(self) -> Router {
        let mut router = Router::new();
        for registration in self.registrations {
            router = router.merge(registration(&self.options));
        }
        router
            .fallback(not_found)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.body_limit))
    }
}

async fn not_found() -> Response {
    page_not_found()
}

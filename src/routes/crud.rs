//! CRUD routes for one repository: POST /{table}, GET /{table}, GET|POST|DELETE /{table}/:id.
//! Handlers decode path and body, call the repository and map its result; no retries.

use crate::error::AppError;
use crate::repository::CrudRepository;
use crate::response::{created_id, empty_ok, json_response};
use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Per-registration settings.
#[derive(Clone, Copy, Debug)]
pub struct RouteOptions {
    /// Status of successful reads. `201 Created` by default for compatibility with existing clients.
    pub read_status: StatusCode,
}

impl Default for RouteOptions {
    fn default() -> Self {
        RouteOptions {
            read_status: StatusCode::CREATED,
        }
    }
}

struct Binding<R> {
    repo: Arc<R>,
    read_status: StatusCode,
}

impl<R> Clone for Binding<R> {
    fn clone(&self) -> Self {
        Binding {
            repo: Arc::clone(&self.repo),
            read_status: self.read_status,
        }
    }
}

/// Routes for `repo` under `/{table}`.
pub fn crud_routes<R: CrudRepository>(repo: Arc<R>, options: &RouteOptions) -> Router {
    let table = repo.table().to_string();
    tracing::info!(table = %table, "registering crud routes");
    let binding = Binding {
        repo,
        read_status: options.read_status,
    };
    Router::new()
        .route(&format!("/{}", table), get(get_all::<R>).post(create::<R>))
        .route(
            &format!("/{}/:id", table),
            get(get_one::<R>).post(update::<R>).delete(delete::<R>),
        )
        .with_state(binding)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(AppError::Decode)
}

/// Id from the `:id` segment. A segment that does not decode (bad percent-encoding) is an invalid param too.
fn parse_id(path: Result<Path<String>, PathRejection>) -> Result<i64, AppError> {
    let Path(raw) = path.map_err(|e| AppError::Param(e.body_text()))?;
    raw.parse().map_err(|_| AppError::Param(raw))
}

fn log_failure(table: &str, op: &'static str, e: &AppError) {
    tracing::debug!(table = %table, op, error = %e, "request failed");
}

async fn create<R: CrudRepository>(
    State(b): State<Binding<R>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let run = async {
        let record: R::Record = decode_body(&body)?;
        let id = b.repo.create(record).await?;
        Ok::<_, AppError>(created_id(id))
    };
    run.await.inspect_err(|e| log_failure(b.repo.table(), "create", e))
}

async fn get_one<R: CrudRepository>(
    State(b): State<Binding<R>>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let run = async {
        let id = parse_id(raw_id)?;
        let record = b.repo.get(id).await?;
        Ok::<_, AppError>(json_response(b.read_status, &record))
    };
    run.await.inspect_err(|e| log_failure(b.repo.table(), "get", e))
}

async fn get_all<R: CrudRepository>(State(b): State<Binding<R>>) -> Result<Response, AppError> {
    let run = async {
        let records = b.repo.get_all().await?;
        Ok::<_, AppError>(json_response(b.read_status, &records))
    };
    run.await.inspect_err(|e| log_failure(b.repo.table(), "get_all", e))
}

async fn update<R: CrudRepository>(
    State(b): State<Binding<R>>,
    raw_id: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<Response, AppError> {
    let run = async {
        let record: R::Record = decode_body(&body)?;
        let id = parse_id(raw_id)?;
        b.repo.update(record, id).await?;
        Ok::<_, AppError>(empty_ok())
    };
    run.await.inspect_err(|e| log_failure(b.repo.table(), "update", e))
}

async fn delete<R: CrudRepository>(
    State(b): State<Binding<R>>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let run = async {
        let id = parse_id(raw_id)?;
        b.repo.delete(id).await?;
        Ok::<_, AppError>(empty_ok())
    };
    run.await.inspect_err(|e| log_failure(b.repo.table(), "delete", e))
}

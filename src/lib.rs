//! Generic CRUD: a repository that builds SQL from a record's field mapping, and
//! route binding that exposes it as five REST endpoints.

pub mod config;
pub mod error;
pub mod executor;
pub mod record;
pub mod repository;
pub mod response;
pub mod routes;
pub mod sql;
pub mod telemetry;

pub use config::Settings;
pub use error::{AppError, ConfigError, RepoError};
pub use executor::{Dialect, ExecOutcome, Executor, RowSet, SqlExecutor};
pub use record::{Column, FieldMap, FieldRef, Record, Reflection};
pub use repository::{CrudRepository, Repository};
pub use routes::{crud_routes, CrudRouter, RouteOptions};
pub use sql::{SqlType, SqlValue, Statement};

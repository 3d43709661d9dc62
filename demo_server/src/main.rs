//! Demo server: one `item` table exposed as /item and /item/:id.
//!
//! Run from repo root: `cargo run -p demo-server`
//! Configure with DATABASE_URL, BIND_ADDR, READ_STATUS (see `Settings`).

use generic_crud::{
    impl_record, telemetry, CrudRouter, Dialect, Executor, Reflection, Repository, Settings,
    SqlExecutor, Statement,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Item {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(skip)]
    reflection: Reflection,
}

impl_record!(Item { id, name, kind, tags, reflection });

fn item_table_ddl(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            "CREATE TABLE IF NOT EXISTS item (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, kind TEXT NOT NULL, tags TEXT NOT NULL)"
        }
        Dialect::Postgres => {
            "CREATE TABLE IF NOT EXISTS item (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL, kind TEXT NOT NULL, tags TEXT NOT NULL)"
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init("generic_crud=info,demo_server=info");

    let settings = Settings::from_env()?;
    let executor = SqlExecutor::connect(&settings.database_url, settings.max_connections).await?;
    executor
        .execute(&Statement::new(item_table_ddl(executor.dialect())))
        .await?;

    let items: Repository<Item, _> = Repository::with_default(executor, "item")?;
    let app = CrudRouter::new()
        .read_status(settings.read_status)
        .body_limit(settings.max_body_bytes)
        .register(Arc::new(items))
        .build();

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
    }
}

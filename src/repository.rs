//! Generic repository: CRUD for any [`Record`] type against one table.
//!
//! Statements are built from the record's field mapping, so no per-type SQL is
//! needed. All five operations on one repository run one at a time.

use crate::error::RepoError;
use crate::executor::{Executor, RowSet};
use crate::record::{Record, ID_FIELD};
use crate::sql::{is_valid_identifier, Delete, Insert, Select, SqlValue, Update};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

/// The operations the route binder needs from a repository.
#[async_trait]
pub trait CrudRepository: Send + Sync + 'static {
    type Record: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Table name; also the first path segment of the routes.
    fn table(&self) -> &str;

    async fn create(&self, record: Self::Record) -> Result<i64, RepoError>;

    async fn get(&self, id: i64) -> Result<Self::Record, RepoError>;

    async fn get_all(&self) -> Result<Vec<Self::Record>, RepoError>;

    async fn update(&self, record: Self::Record, id: i64) -> Result<(), RepoError>;

    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

pub struct Repository<M, E> {
    lock: Mutex<()>,
    executor: E,
    table: String,
    blank: fn() -> M,
}

impl<M: Record, E: Executor> Repository<M, E> {
    /// Binds a table and a blank-record factory. Fails if the table name is not a
    /// plain identifier or the record type has no `id` field.
    pub fn new(executor: E, table: impl Into<String>, blank: fn() -> M) -> Result<Self, RepoError> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(crate::sql::BuildError::InvalidIdentifier(table).into());
        }
        let mut sample = blank();
        if !sample.describe().contains(ID_FIELD) {
            return Err(RepoError::TypeMismatch(format!(
                "record for table {} has no '{}' field",
                table, ID_FIELD
            )));
        }
        Ok(Repository {
            lock: Mutex::new(()),
            executor,
            table,
            blank,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Scan every row of `rows` into a fresh record. Columns without a matching field are skipped.
    fn scan_rows(&self, rows: RowSet) -> Result<Vec<M>, RepoError> {
        let columns: Vec<String> = rows.columns.iter().map(|c| c.to_lowercase()).collect();
        let mut out = Vec::with_capacity(rows.rows.len());
        for row in rows.rows {
            let mut model = (self.blank)();
            {
                let mut fields = model.describe();
                for (column, value) in columns.iter().zip(row) {
                    if let Some(field) = fields.get_mut(column) {
                        field
                            .scan(value)
                            .map_err(|e| RepoError::scan(&self.table, column, e))?;
                    }
                }
            }
            out.push(model);
        }
        Ok(out)
    }
}

impl<M: Record + Default, E: Executor> Repository<M, E> {
    pub fn with_default(executor: E, table: impl Into<String>) -> Result<Self, RepoError> {
        Self::new(executor, table, M::default)
    }
}

#[async_trait]
impl<M: Record, E: Executor> CrudRepository for Repository<M, E> {
    type Record = M;

    fn table(&self) -> &str {
        &self.table
    }

    /// The generated key comes back through `RETURNING "id"` on every dialect.
    async fn create(&self, mut record: M) -> Result<i64, RepoError> {
        let _guard = self.lock.lock().await;
        let pairs = record.describe().values_without_id();
        let stmt = Insert::into(self.table.as_str())
            .values(pairs)
            .returning(ID_FIELD)
            .to_sql(self.executor.dialect().placeholder())?;
        let rows = self.executor.query(&stmt).await?;
        match rows.rows.first().and_then(|r| r.first()) {
            Some(SqlValue::Int(id)) => Ok(*id),
            Some(other) => Err(RepoError::TypeMismatch(format!(
                "{}.{}: expected integer, found {}",
                self.table,
                ID_FIELD,
                other.kind()
            ))),
            None => Err(RepoError::Execution(sqlx::Error::Protocol(format!(
                "insert into {} returned no id",
                self.table
            )))),
        }
    }

    async fn get(&self, id: i64) -> Result<M, RepoError> {
        let _guard = self.lock.lock().await;
        let stmt = Select::from(self.table.as_str())
            .where_eq(ID_FIELD, SqlValue::Int(id))
            .limit(1)
            .to_sql(self.executor.dialect().placeholder())?;
        let rows = self.executor.query(&stmt).await?;
        if rows.is_empty() {
            return Err(RepoError::NotFound);
        }
        self.scan_rows(rows)?.into_iter().next().ok_or(RepoError::NotFound)
    }

    async fn get_all(&self) -> Result<Vec<M>, RepoError> {
        let _guard = self.lock.lock().await;
        let stmt = Select::from(self.table.as_str())
            .order_by(ID_FIELD)
            .to_sql(self.executor.dialect().placeholder())?;
        let rows = self.executor.query(&stmt).await?;
        self.scan_rows(rows)
    }

    async fn update(&self, mut record: M, id: i64) -> Result<(), RepoError> {
        let _guard = self.lock.lock().await;
        let pairs = record.describe().values_without_id();
        let stmt = Update::table(self.table.as_str())
            .set_all(pairs)
            .where_eq(ID_FIELD, SqlValue::Int(id))
            .to_sql(self.executor.dialect().placeholder())?;
        let outcome = self.executor.execute(&stmt).await?;
        if outcome.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let _guard = self.lock.lock().await;
        let stmt = Delete::from(self.table.as_str())
            .where_eq(ID_FIELD, SqlValue::Int(id))
            .to_sql(self.executor.dialect().placeholder())?;
        let outcome = self.executor.execute(&stmt).await?;
        if outcome.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

use async_trait::async_trait;
use generic_crud::record::{FieldMap, Record};
use generic_crud::{
    impl_record, CrudRepository, Dialect, ExecOutcome, Executor, Reflection, RepoError,
    Repository, RowSet, SqlValue, Statement,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct ModelWithReflection {
    id: i64,
    name: String,
    r#type: String,
    chip: String,
    board: String,
    ip: String,
    #[serde(skip)]
    reflection: Reflection,
}

impl_record!(ModelWithReflection { id, name, r#type, chip, board, ip, reflection });

/// Hand-written mapping; `actions` is a string list stored as JSON text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct ModelWithoutReflection {
    id: i64,
    name: String,
    actions: Vec<String>,
}

impl Record for ModelWithoutReflection {
    fn describe(&mut self) -> FieldMap<'_> {
        FieldMap::new()
            .with("id", &mut self.id)
            .with("name", &mut self.name)
            .with("actions", &mut self.actions)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct NoId {
    name: String,
}

impl_record!(NoId { name });

#[derive(Default)]
struct Script {
    statements: Vec<Statement>,
    rows: VecDeque<Result<RowSet, sqlx::Error>>,
    outcomes: VecDeque<Result<ExecOutcome, sqlx::Error>>,
}

#[derive(Clone)]
struct MockDb {
    dialect: Dialect,
    script: Arc<Mutex<Script>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockDb {
    fn new(dialect: Dialect) -> Self {
        MockDb {
            dialect,
            script: Arc::new(Mutex::new(Script::default())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    fn expect_rows(&self, rows: Result<RowSet, sqlx::Error>) {
        self.script.lock().unwrap().rows.push_back(rows);
    }

    fn expect_exec(&self, outcome: Result<ExecOutcome, sqlx::Error>) {
        self.script.lock().unwrap().outcomes.push_back(outcome);
    }

    fn statements(&self) -> Vec<Statement> {
        self.script.lock().unwrap().statements.clone()
    }

    async fn enter(&self, stmt: &Statement) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.script.lock().unwrap().statements.push(stmt.clone());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Executor for MockDb {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, stmt: &Statement) -> Result<ExecOutcome, sqlx::Error> {
        self.enter(stmt).await;
        self.script
            .lock()
            .unwrap()
            .outcomes
            .pop_front()
            .unwrap_or_else(|| Ok(ExecOutcome::default()))
    }

    async fn query(&self, stmt: &Statement) -> Result<RowSet, sqlx::Error> {
        self.enter(stmt).await;
        self.script
            .lock()
            .unwrap()
            .rows
            .pop_front()
            .unwrap_or_else(|| Ok(RowSet::default()))
    }
}

fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

fn rows(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> RowSet {
    RowSet {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

fn repo(db: &MockDb) -> Repository<ModelWithReflection, MockDb> {
    Repository::with_default(db.clone(), "table_name").unwrap()
}

/// Column names between the first pair of parentheses of an INSERT.
fn insert_columns(sql: &str) -> Vec<String> {
    let start = sql.find('(').unwrap() + 1;
    let end = sql[start..].find(')').unwrap() + start;
    sql[start..end]
        .split(", ")
        .map(|c| c.trim_matches('"').to_string())
        .collect()
}

#[tokio::test]
async fn get_selects_one_row_by_id() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Ok(rows(
        &["id", "name", "type", "chip", "board", "ip"],
        vec![vec![
            SqlValue::Int(1),
            text("test 1"),
            text("test"),
            text("chip"),
            text("board"),
            text("ip"),
        ]],
    )));

    let got = repo(&db).get(1).await.unwrap();

    assert_eq!(
        got,
        ModelWithReflection {
            id: 1,
            name: "test 1".into(),
            r#type: "test".into(),
            chip: "chip".into(),
            board: "board".into(),
            ip: "ip".into(),
            reflection: Reflection,
        }
    );
    let stmts = db.statements();
    assert_eq!(stmts[0].sql, r#"SELECT * FROM "table_name" WHERE "id" = ? LIMIT 1"#);
    assert_eq!(stmts[0].args, vec![SqlValue::Int(1)]);
}

#[tokio::test]
async fn get_matches_columns_case_insensitively_and_skips_unknown() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Ok(rows(
        &["legacy", "NAME", "Id"],
        vec![vec![text("ignored"), text("x"), SqlValue::Int(4)]],
    )));

    let got = repo(&db).get(4).await.unwrap();

    assert_eq!(got.id, 4);
    assert_eq!(got.name, "x");
    assert_eq!(got.chip, "");
}

#[tokio::test]
async fn get_without_rows_is_not_found() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Ok(RowSet::default()));
    assert!(matches!(repo(&db).get(2).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn executor_no_rows_is_not_found() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Err(sqlx::Error::RowNotFound));
    assert!(matches!(repo(&db).get(2).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn executor_failure_is_surfaced() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Err(sqlx::Error::PoolTimedOut));
    assert!(matches!(
        repo(&db).get(2).await,
        Err(RepoError::Execution(sqlx::Error::PoolTimedOut))
    ));
}

#[tokio::test]
async fn get_with_wrong_cell_type_is_type_mismatch() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Ok(rows(&["id", "name"], vec![vec![text("one"), text("x")]])));
    let err = repo(&db).get(1).await.unwrap_err();
    match err {
        RepoError::TypeMismatch(msg) => assert!(msg.contains("table_name.id"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn get_without_reflection_decodes_string_list() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Ok(rows(
        &["id", "name", "actions"],
        vec![vec![
            SqlValue::Int(1),
            text("test 1"),
            text(r#"["d7e949b8-5c41-4972-b484-9c33b89af32c","d7e949b8-5c41-4972-b484-9c33b89af123"]"#),
        ]],
    )));
    let repo: Repository<ModelWithoutReflection, _> =
        Repository::with_default(db.clone(), "table_name").unwrap();

    let got = repo.get(1).await.unwrap();

    assert_eq!(got.actions.len(), 2);
    assert_eq!(got.actions[1], "d7e949b8-5c41-4972-b484-9c33b89af123");
}

#[tokio::test]
async fn get_all_orders_by_id() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Ok(rows(
        &["id", "name"],
        vec![
            vec![SqlValue::Int(1), text("test 1")],
            vec![SqlValue::Int(2), text("test 2")],
        ],
    )));

    let got = repo(&db).get_all().await.unwrap();

    assert_eq!(got.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(got[1].name, "test 2");
    assert_eq!(db.statements()[0].sql, r#"SELECT * FROM "table_name" ORDER BY "id""#);
}

#[tokio::test]
async fn get_all_on_empty_table_is_empty() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Ok(RowSet::default()));
    assert!(repo(&db).get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_pairs_each_column_with_its_own_value() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_rows(Ok(rows(&["id"], vec![vec![SqlValue::Int(11)]])));
    // Every value equals its column name, so any column/value drift shows up.
    let model = ModelWithReflection {
        id: 99,
        name: "name".into(),
        r#type: "type".into(),
        chip: "chip".into(),
        board: "board".into(),
        ip: "ip".into(),
        reflection: Reflection,
    };

    let id = repo(&db).create(model).await.unwrap();

    assert_eq!(id, 11);
    let stmt = &db.statements()[0];
    assert!(stmt.sql.starts_with(r#"INSERT INTO "table_name" ("#), "{}", stmt.sql);
    assert!(stmt.sql.ends_with(r#"VALUES (?, ?, ?, ?, ?) RETURNING "id""#), "{}", stmt.sql);
    let columns = insert_columns(&stmt.sql);
    assert_eq!(columns.len(), 5);
    assert!(!columns.iter().any(|c| c == "id" || c == "reflection"));
    assert_eq!(columns.len(), stmt.args.len());
    for (column, arg) in columns.iter().zip(&stmt.args) {
        assert_eq!(arg, &text(column));
    }
}

#[tokio::test]
async fn create_on_postgres_reads_returned_id() {
    let db = MockDb::new(Dialect::Postgres);
    db.expect_rows(Ok(rows(&["id"], vec![vec![SqlValue::Int(5)]])));

    let id = repo(&db).create(ModelWithReflection::default()).await.unwrap();

    assert_eq!(id, 5);
    let stmt = &db.statements()[0];
    assert!(stmt.sql.ends_with(r#"VALUES ($1, $2, $3, $4, $5) RETURNING "id""#), "{}", stmt.sql);
}

#[tokio::test]
async fn create_without_returned_id_is_an_execution_error() {
    let db = MockDb::new(Dialect::Postgres);
    db.expect_rows(Ok(RowSet::default()));
    let err = repo(&db).create(ModelWithReflection::default()).await.unwrap_err();
    assert!(matches!(err, RepoError::Execution(sqlx::Error::Protocol(_))), "{:?}", err);
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn update_sets_every_field_but_id() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_exec(Ok(ExecOutcome { rows_affected: 1 }));
    let model = ModelWithoutReflection {
        id: 100,
        name: "n".into(),
        actions: vec!["a".into()],
    };
    let repo: Repository<ModelWithoutReflection, _> =
        Repository::with_default(db.clone(), "table_name").unwrap();

    repo.update(model, 3).await.unwrap();

    let stmt = &db.statements()[0];
    assert_eq!(
        stmt.sql,
        r#"UPDATE "table_name" SET "name" = ?, "actions" = ? WHERE "id" = ?"#
    );
    assert_eq!(
        stmt.args,
        vec![text("n"), text(r#"["a"]"#), SqlValue::Int(3)]
    );
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_exec(Ok(ExecOutcome::default()));
    assert!(matches!(
        repo(&db).update(ModelWithReflection::default(), 42).await,
        Err(RepoError::NotFound)
    ));
}

#[tokio::test]
async fn delete_by_id() {
    let db = MockDb::new(Dialect::Postgres);
    db.expect_exec(Ok(ExecOutcome { rows_affected: 1 }));
    repo(&db).delete(8).await.unwrap();
    let stmt = &db.statements()[0];
    assert_eq!(stmt.sql, r#"DELETE FROM "table_name" WHERE "id" = $1"#);
    assert_eq!(stmt.args, vec![SqlValue::Int(8)]);
}

#[tokio::test]
async fn delete_of_missing_row_is_not_found() {
    let db = MockDb::new(Dialect::Sqlite);
    db.expect_exec(Ok(ExecOutcome::default()));
    assert!(repo(&db).delete(8).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn construction_validates_table_and_record() {
    let db = MockDb::new(Dialect::Sqlite);
    let bad_table = Repository::<ModelWithReflection, _>::with_default(db.clone(), "item; --");
    assert!(matches!(bad_table, Err(RepoError::QueryBuild(_))));
    let no_id = Repository::<NoId, _>::with_default(db, "no_id");
    assert!(matches!(no_id, Err(RepoError::TypeMismatch(_))));
}

#[tokio::test]
async fn operations_run_one_at_a_time() {
    let mut db = MockDb::new(Dialect::Sqlite);
    db.delay = Some(Duration::from_millis(5));
    let repo = Arc::new(repo(&db));

    let mut handles = Vec::new();
    for i in 0..8 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                let _ = repo.get_all().await;
            } else {
                let _ = repo.delete(i).await;
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(db.statements().len(), 8);
    assert_eq!(db.max_in_flight.load(Ordering::SeqCst), 1);
}

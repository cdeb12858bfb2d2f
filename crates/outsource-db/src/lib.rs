// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod log;
pub mod model;
pub mod schema;
pub mod validation;
mod writer;

pub use log::{EventSink, FileLog};
pub use model::{TableView, TabularModel};
pub use schema::{
    CheckConstraint, CheckPredicate, ColumnDef, ColumnKind, ForeignKeyRef, TableDef,
    create_schema, drop_schema, reset_schema, table_def, tables,
};
pub use validation::{
    FieldError, FieldErrorReason, FieldValues, ValidationOutcome, validate,
};
pub use writer::RowWriter;

use postgres::config::SslMode;
use postgres::types::ToSql;
use postgres::{Client, NoTls};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DBNAME: &str = "outsource";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure taxonomy of the table-binding core. Validation failures are
/// resolved client-side and never reach the server; everything else carries
/// the underlying cause message verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum DbError {
    Connection(String),
    AlreadyConnected,
    Schema(String),
    Validation(Vec<FieldError>),
    Constraint(String),
    LinkInsert(String),
    Query(String),
    IndexOutOfRange { index: usize, len: usize },
    InvalidColumn { index: usize, len: usize },
    UnknownTable(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(cause) => write!(f, "connection failed: {cause}"),
            Self::AlreadyConnected => {
                f.write_str("already connected; disconnect before connecting again")
            }
            Self::Schema(cause) => write!(f, "schema operation failed: {cause}"),
            Self::Validation(errors) => {
                f.write_str("validation failed")?;
                for error in errors {
                    write!(f, "; {error}")?;
                }
                Ok(())
            }
            Self::Constraint(cause) => write!(f, "write rejected by the server: {cause}"),
            Self::LinkInsert(cause) => write!(f, "task/project link insert failed: {cause}"),
            Self::Query(cause) => write!(f, "query failed: {cause}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range (len {len})")
            }
            Self::InvalidColumn { index, len } => {
                write!(f, "column index {index} out of range ({len} columns)")
            }
            Self::UnknownTable(name) => write!(f, "unknown table {name:?}"),
        }
    }
}

impl std::error::Error for DbError {}

/// Parameters for one connection attempt. Passed explicitly to
/// `ConnectionManager::connect`; nothing in this crate is ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub sslmode: String,
    pub connect_timeout: Duration,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_PORT,
            dbname: DEFAULT_DBNAME.to_owned(),
            user: "postgres".to_owned(),
            password: String::new(),
            sslmode: "prefer".to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectParams {
    /// Ports arrive as text from config files and input forms; text that does
    /// not parse falls back to 5432 silently. Long-standing quirk, kept.
    pub fn parse_port(raw: &str) -> u16 {
        raw.trim().parse().unwrap_or(DEFAULT_PORT)
    }

    /// `host:port/dbname`, with no credentials, safe for the event log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.dbname)
    }

    pub(crate) fn ssl_mode(&self) -> SslMode {
        match self.sslmode.as_str() {
            "disable" => SslMode::Disable,
            "require" => SslMode::Require,
            _ => SslMode::Prefer,
        }
    }

    fn pg_config(&self) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .ssl_mode(self.ssl_mode())
            .connect_timeout(self.connect_timeout);
        config
    }
}

/// Live database session. Shared by every model and writer; access is
/// serialized through an internal mutex because overlapping operations on
/// one session are not assumed safe.
pub struct Database {
    client: Mutex<Client>,
    statements: AtomicU64,
    log: Arc<dyn EventSink>,
    endpoint: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("statements", &self.statements)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Database {
    fn connect(params: &ConnectParams, log: Arc<dyn EventSink>) -> Result<Self, DbError> {
        let mut client = params
            .pg_config()
            .connect(NoTls)
            .map_err(|error| DbError::Connection(describe(&error)))?;

        // Reachability probe: a handle is only handed out after one
        // successful round trip.
        client
            .simple_query("SELECT 1")
            .map_err(|error| DbError::Connection(describe(&error)))?;

        Ok(Self {
            client: Mutex::new(client),
            statements: AtomicU64::new(0),
            log,
            endpoint: params.endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of statements issued through this handle. Lets tests verify
    /// that rejected input never produced a round trip.
    pub fn statements_executed(&self) -> u64 {
        self.statements.load(Ordering::Relaxed)
    }

    pub(crate) fn log(&self, event: &str) {
        self.log.log(event);
    }

    pub(crate) fn count_statements(&self, count: u64) {
        self.statements.fetch_add(count, Ordering::Relaxed);
    }

    fn client(&self) -> MutexGuard<'_, Client> {
        match self.client.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<postgres::Row>, postgres::Error> {
        self.count_statements(1);
        self.client().query(sql, params)
    }

    pub(crate) fn batch_execute(&self, sql: &str) -> Result<(), postgres::Error> {
        self.count_statements(1);
        self.client().batch_execute(sql)
    }

    /// Runs `run` inside one transaction; commit happens only if the closure
    /// succeeds, otherwise the transaction rolls back on drop.
    pub(crate) fn with_transaction<T, E>(
        &self,
        run: impl FnOnce(&mut postgres::Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<postgres::Error>,
    {
        let mut client = self.client();
        let mut transaction = client.transaction()?;
        let value = run(&mut transaction)?;
        transaction.commit()?;
        Ok(value)
    }
}

/// Owns the single live handle. Connecting twice is refused rather than
/// silently replacing a handle other components may still be using.
pub struct ConnectionManager {
    log: Arc<dyn EventSink>,
    handle: Option<Database>,
}

impl ConnectionManager {
    pub fn new(log: Arc<dyn EventSink>) -> Self {
        Self { log, handle: None }
    }

    pub fn connect(&mut self, params: &ConnectParams) -> Result<&Database, DbError> {
        if self.handle.is_some() {
            self.log.log("connect refused: already connected");
            return Err(DbError::AlreadyConnected);
        }
        match Database::connect(params, Arc::clone(&self.log)) {
            Ok(database) => {
                self.log.log(&format!(
                    "connected to {} as {}",
                    params.endpoint(),
                    params.user
                ));
                Ok(self.handle.insert(database))
            }
            Err(error) => {
                self.log
                    .log(&format!("connect to {} failed: {error}", params.endpoint()));
                Err(error)
            }
        }
    }

    pub fn database(&self) -> Result<&Database, DbError> {
        self.handle
            .as_ref()
            .ok_or_else(|| DbError::Connection("not connected".to_owned()))
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Idempotent: disconnecting an already-disconnected manager is a no-op.
    pub fn disconnect(&mut self) {
        if let Some(database) = self.handle.take() {
            self.log
                .log(&format!("disconnected from {}", database.endpoint));
        }
    }
}

/// Prefers the server's own message when one exists; otherwise the driver
/// message plus its source, so network failures stay diagnosable.
pub(crate) fn describe(error: &postgres::Error) -> String {
    if let Some(db_error) = error.as_db_error() {
        return db_error.message().to_owned();
    }
    match std::error::Error::source(error) {
        Some(source) => format!("{error}: {source}"),
        None => error.to_string(),
    }
}

/// Maps a failed write. SQLSTATE class 23 is the server enforcing a
/// UNIQUE/CHECK/FK constraint the client chose not to pre-check.
pub(crate) fn write_error(error: postgres::Error) -> DbError {
    if error.is_closed() {
        return DbError::Connection(describe(&error));
    }
    if error
        .code()
        .is_some_and(|state| state.code().starts_with("23"))
    {
        return DbError::Constraint(describe(&error));
    }
    DbError::Query(describe(&error))
}

#[cfg(test)]
mod tests {
    use super::{ConnectParams, ConnectionManager, DEFAULT_PORT, DbError};
    use crate::log::EventSink;
    use postgres::config::SslMode;
    use std::sync::Arc;

    struct SilentLog;

    impl EventSink for SilentLog {
        fn log(&self, _event: &str) {}
    }

    #[test]
    fn default_params_match_documented_defaults() {
        let params = ConnectParams::default();
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, 5432);
        assert_eq!(params.dbname, "outsource");
        assert_eq!(params.user, "postgres");
        assert_eq!(params.sslmode, "prefer");
        assert_eq!(params.connect_timeout.as_secs(), 5);
    }

    #[test]
    fn unparsable_port_falls_back_silently() {
        assert_eq!(ConnectParams::parse_port("6543"), 6543);
        assert_eq!(ConnectParams::parse_port(" 6543 "), 6543);
        assert_eq!(ConnectParams::parse_port("five"), DEFAULT_PORT);
        assert_eq!(ConnectParams::parse_port(""), DEFAULT_PORT);
        assert_eq!(ConnectParams::parse_port("99999"), DEFAULT_PORT);
    }

    #[test]
    fn endpoint_omits_credentials() {
        let params = ConnectParams {
            password: "hunter2".to_owned(),
            ..ConnectParams::default()
        };
        let endpoint = params.endpoint();
        assert_eq!(endpoint, "localhost:5432/outsource");
        assert!(!endpoint.contains("hunter2"));
    }

    #[test]
    fn sslmode_strings_map_to_driver_modes() {
        let mut params = ConnectParams::default();
        assert!(matches!(params.ssl_mode(), SslMode::Prefer));
        params.sslmode = "disable".to_owned();
        assert!(matches!(params.ssl_mode(), SslMode::Disable));
        params.sslmode = "require".to_owned();
        assert!(matches!(params.ssl_mode(), SslMode::Require));
        params.sslmode = "whatever".to_owned();
        assert!(matches!(params.ssl_mode(), SslMode::Prefer));
    }

    #[test]
    fn database_access_before_connect_is_a_connection_error() {
        let manager = ConnectionManager::new(Arc::new(SilentLog));
        let error = manager.database().expect_err("no handle yet");
        assert!(matches!(error, DbError::Connection(_)));
    }

    #[test]
    fn disconnect_without_connection_is_a_no_op() {
        let mut manager = ConnectionManager::new(Arc::new(SilentLog));
        manager.disconnect();
        manager.disconnect();
        assert!(!manager.is_connected());
    }

    #[test]
    fn error_display_carries_the_cause() {
        let error = DbError::Constraint("duplicate key".to_owned());
        assert_eq!(
            error.to_string(),
            "write rejected by the server: duplicate key"
        );
        assert_eq!(
            DbError::UnknownTable("nope".to_owned()).to_string(),
            "unknown table \"nope\""
        );
        assert_eq!(
            DbError::InvalidColumn { index: 9, len: 6 }.to_string(),
            "column index 9 out of range (6 columns)"
        );
    }
}

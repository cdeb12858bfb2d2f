// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Shared test support: an in-memory event sink, canned row data, and a
//! fixture for integration tests that run against a live server. Live tests
//! are opt-in: they skip unless `OUTSOURCE_TEST_HOST` is set, so the suite
//! passes on machines with no database.

use outsource_app::{EmployeeId, Value};
use outsource_db::{
    ConnectParams, ConnectionManager, DbError, EventSink, FieldValues, reset_schema,
};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

pub const TEST_HOST_ENV: &str = "OUTSOURCE_TEST_HOST";

/// Event sink that records lines instead of writing a file, so tests can
/// assert on what was logged.
#[derive(Default)]
pub struct MemoryLog {
    events: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.events().iter().any(|event| event.contains(fragment))
    }
}

impl EventSink for MemoryLog {
    fn log(&self, event: &str) {
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.to_owned());
    }
}

/// Connection parameters for the test server, read from `OUTSOURCE_TEST_HOST`
/// plus optional `OUTSOURCE_TEST_PORT`, `OUTSOURCE_TEST_DB`,
/// `OUTSOURCE_TEST_USER` and `OUTSOURCE_TEST_PASSWORD`. Returns `None` when
/// no test server is configured.
pub fn test_params() -> Option<ConnectParams> {
    let host = std::env::var(TEST_HOST_ENV).ok()?;
    let mut params = ConnectParams {
        host,
        ..ConnectParams::default()
    };
    if let Ok(port) = std::env::var("OUTSOURCE_TEST_PORT") {
        params.port = ConnectParams::parse_port(&port);
    }
    if let Ok(dbname) = std::env::var("OUTSOURCE_TEST_DB") {
        params.dbname = dbname;
    }
    if let Ok(user) = std::env::var("OUTSOURCE_TEST_USER") {
        params.user = user;
    }
    if let Ok(password) = std::env::var("OUTSOURCE_TEST_PASSWORD") {
        params.password = password;
    }
    Some(params)
}

/// Tests sharing the live database run in one test binary, and cargo runs
/// `#[test]`s on parallel threads. Every fixture resets the schema, so two
/// concurrent tests would drop each other's tables mid-assertion. The lock
/// serializes them; it is held for the fixture's whole lifetime.
static DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn db_lock() -> MutexGuard<'static, ()> {
    let lock = DB_LOCK.get_or_init(|| Mutex::new(()));
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Connected manager plus the log it writes to, over a freshly reset schema.
/// Holds the database lock: only one fixture is live at a time.
pub struct LiveFixture {
    pub manager: ConnectionManager,
    pub log: Arc<MemoryLog>,
    _db_lock: MutexGuard<'static, ()>,
}

/// Connects to the configured test server and resets the schema. Returns
/// `None` when `OUTSOURCE_TEST_HOST` is unset; callers skip in that case.
pub fn live_fixture() -> Option<Result<LiveFixture, DbError>> {
    let params = test_params()?;
    let db_lock = db_lock();
    let log = Arc::new(MemoryLog::new());
    let mut manager = ConnectionManager::new(Arc::clone(&log) as Arc<dyn EventSink>);
    let result: Result<(), DbError> = (|| {
        let db = manager.connect(&params)?;
        reset_schema(db)?;
        Ok(())
    })();
    Some(result.map(|()| LiveFixture {
        manager,
        log,
        _db_lock: db_lock,
    }))
}

pub fn employee_fields() -> FieldValues {
    FieldValues::new()
        .with("full_name", Value::text("Иванов Иван Иванович"))
        .with("age", Value::Integer(30))
        .with("salary", Value::Integer(100_000))
        .with("duty", Value::text("Backend"))
        .with("skills", Value::text_array(["SQL", "Python"]))
}

pub fn task_fields(employee_id: EmployeeId) -> FieldValues {
    FieldValues::new()
        .with("employee_id", Value::Integer(employee_id.get()))
        .with("name", Value::text("Разгром"))
        .with("description", Value::text("Разобрать накопившиеся задачи"))
        .with("status", Value::text("Новая"))
}

pub fn project_fields() -> FieldValues {
    FieldValues::new()
        .with("name", Value::text("Переезд"))
        .with("prize", Value::Integer(500_000))
        .with("customer", Value::text("ООО Ромашка"))
        .with("finished", Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::{MemoryLog, db_lock};
    use outsource_db::EventSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn memory_log_records_in_order() {
        let log = MemoryLog::new();
        log.log("first");
        log.log("second");
        assert_eq!(log.events(), ["first", "second"]);
        assert!(log.contains("sec"));
        assert!(!log.contains("third"));
    }

    #[test]
    fn database_lock_admits_one_holder_at_a_time() {
        static INSIDE: AtomicUsize = AtomicUsize::new(0);

        let handles = (0..4)
            .map(|_| {
                thread::spawn(|| {
                    let _guard = db_lock();
                    assert_eq!(INSIDE.fetch_add(1, Ordering::SeqCst), 0);
                    thread::sleep(Duration::from_millis(10));
                    INSIDE.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("holder thread panicked");
        }
    }
}

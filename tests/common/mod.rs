#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pgcompare::{
    ColumnInfo, ConnectionSpec, FetchError, Instance, MetadataSource, RoutineInfo, TableInfo,
};

/// In-memory instance with per-phase delays and optional failures.
#[derive(Default)]
pub struct FakeSource {
    pub name: String,
    pub tables: Vec<TableInfo>,
    pub routines: Vec<RoutineInfo>,
    pub table_delay: Duration,
    pub routine_delay: Duration,
    pub fail_tables: bool,
    pub fail_routines: bool,
    pub fail_connect: bool,
    /// Listing calls that ran to completion, failed or not.
    pub finished: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn table(mut self, name: &str, columns: &[&str]) -> Self {
        let columns = columns
            .iter()
            .map(|c| ColumnInfo::new(name, *c, "integer"))
            .collect();
        self.tables.push(TableInfo::new(name).with_columns(columns));
        self
    }

    /// Routine whose definition is `CREATE FUNCTION public.<name>(int) <body>`.
    pub fn routine(mut self, name: &str, body: &str) -> Self {
        let id = 1000 + self.routines.len();
        let mut routine = RoutineInfo::new(name, format!("{name}_{id}"));
        routine.ddl = format!("CREATE FUNCTION public.{name}(int) {body}");
        self.routines.push(routine);
        self
    }

    pub fn into_instance(self) -> Instance {
        let spec = ConnectionSpec::new(self.name.clone(), "localhost", "app", "tester");
        Instance::new(spec, Arc::new(self))
    }

    fn failure(&self, what: &str) -> FetchError {
        if self.fail_connect {
            FetchError::connection(&self.name, "password authentication failed")
        } else {
            FetchError::query(&self.name, format!("{what} query failed"))
        }
    }
}

#[async_trait]
impl MetadataSource for FakeSource {
    async fn list_tables(&self, _schema: &str) -> Result<Vec<TableInfo>, FetchError> {
        tokio::time::sleep(self.table_delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        if self.fail_tables {
            return Err(self.failure("table"));
        }
        let tables = self.tables.iter().map(|t| TableInfo {
            columns: Vec::new(),
            ..t.clone()
        });
        Ok(tables.collect())
    }

    async fn list_columns(
        &self,
        _schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, FetchError> {
        Ok(self
            .tables
            .iter()
            .find(|t| t.table_name == table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn list_routines(&self, _schema: &str) -> Result<Vec<RoutineInfo>, FetchError> {
        tokio::time::sleep(self.routine_delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        if self.fail_routines {
            return Err(self.failure("routine"));
        }
        let routines = self.routines.iter().map(|r| RoutineInfo {
            ddl: String::new(),
            ..r.clone()
        });
        Ok(routines.collect())
    }

    async fn routine_ddl(&self, routine_id: &str) -> Result<String, FetchError> {
        self.routines
            .iter()
            .find(|r| r.routine_id() == routine_id)
            .map(|r| r.ddl.clone())
            .ok_or_else(|| FetchError::query(&self.name, format!("no routine {routine_id}")))
    }
}

/// xorshift64, enough to shuffle delays between trials.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn delay(&mut self, max_ms: u64) -> Duration {
        Duration::from_millis(self.next() % (max_ms + 1))
    }

    pub fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

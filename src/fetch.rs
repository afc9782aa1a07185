//! Four fetches run as independent tasks and report over one channel. The
//! join returns once every slot is filled or on the first failure.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::connection::ConnectionSpec;
use crate::error::{FetchError, JoinFailure};
use crate::progress::Progress;
use crate::routine::RoutineInfo;
use crate::source::{MetadataSource, PgMetadataSource};
use crate::table::TableInfo;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One of the four top-level fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    SourceTables,
    SourceRoutines,
    DestinationTables,
    DestinationRoutines,
}

impl FetchKind {
    pub const ALL: [FetchKind; 4] = [
        FetchKind::SourceTables,
        FetchKind::SourceRoutines,
        FetchKind::DestinationTables,
        FetchKind::DestinationRoutines,
    ];

    pub fn is_source(self) -> bool {
        matches!(self, FetchKind::SourceTables | FetchKind::SourceRoutines)
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            FetchKind::SourceTables => "source tables",
            FetchKind::SourceRoutines => "source routines",
            FetchKind::DestinationTables => "destination tables",
            FetchKind::DestinationRoutines => "destination routines",
        })
    }
}

/// A database instance: its settings and the metadata capability for it.
#[derive(Clone)]
pub struct Instance {
    pub spec: Arc<ConnectionSpec>,
    pub metadata: Arc<dyn MetadataSource>,
}

impl Instance {
    pub fn new(spec: ConnectionSpec, metadata: Arc<dyn MetadataSource>) -> Self {
        Self {
            spec: Arc::new(spec),
            metadata,
        }
    }

    pub fn postgres(spec: ConnectionSpec, acquire_timeout: Duration) -> Self {
        let metadata = Arc::new(PgMetadataSource::connect_lazy(&spec, acquire_timeout));
        Self::new(spec, metadata)
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableInfo>,
    pub routines: Vec<RoutineInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedSchemas {
    pub source: SchemaSnapshot,
    pub destination: SchemaSnapshot,
}

/// A failed column fetch fails the whole call.
pub async fn fetch_tables(
    metadata: &dyn MetadataSource,
    spec: &ConnectionSpec,
    progress: &Progress,
) -> Result<Vec<TableInfo>, FetchError> {
    progress.loading_schema(&spec.name);

    let mut tables = metadata.list_tables(&spec.schema).await?;
    tracing::debug!(
        instance = %spec.name,
        schema = %spec.schema,
        count = tables.len(),
        "Listed tables"
    );

    for table in &mut tables {
        table.columns = metadata
            .list_columns(&spec.schema, &table.table_name)
            .await?;
    }

    Ok(tables)
}

/// A failed definition fetch fails the whole call. Definitions whose routine
/// identity can't be read are kept with `full_name` unset.
pub async fn fetch_routines(
    metadata: &dyn MetadataSource,
    spec: &ConnectionSpec,
    progress: &Progress,
) -> Result<Vec<RoutineInfo>, FetchError> {
    progress.loading_routines(&spec.name);

    let mut routines = metadata.list_routines(&spec.schema).await?;
    tracing::debug!(
        instance = %spec.name,
        schema = %spec.schema,
        count = routines.len(),
        "Listed routines"
    );

    for routine in &mut routines {
        progress.getting_ddl(&routine.routine_name);
        let ddl = metadata.routine_ddl(routine.routine_id()).await?;
        if let Err(err) = routine.attach_ddl(ddl) {
            tracing::warn!(
                instance = %spec.name,
                routine = %routine.specific_name,
                error = %err,
                "Could not derive routine name from its definition"
            );
        }
    }

    Ok(routines)
}

enum Fetched {
    Tables(Vec<TableInfo>),
    Routines(Vec<RoutineInfo>),
}

/// One slot per fetch kind, each written at most once.
#[derive(Default)]
struct Slots {
    source_tables: Option<Vec<TableInfo>>,
    source_routines: Option<Vec<RoutineInfo>>,
    destination_tables: Option<Vec<TableInfo>>,
    destination_routines: Option<Vec<RoutineInfo>>,
}

impl Slots {
    /// Returns false when the slot was already filled or the payload doesn't
    /// belong to `kind`.
    fn fill(&mut self, kind: FetchKind, fetched: Fetched) -> bool {
        fn put<T>(slot: &mut Option<T>, value: T) -> bool {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        }

        match (kind, fetched) {
            (FetchKind::SourceTables, Fetched::Tables(t)) => put(&mut self.source_tables, t),
            (FetchKind::SourceRoutines, Fetched::Routines(r)) => put(&mut self.source_routines, r),
            (FetchKind::DestinationTables, Fetched::Tables(t)) => {
                put(&mut self.destination_tables, t)
            }
            (FetchKind::DestinationRoutines, Fetched::Routines(r)) => {
                put(&mut self.destination_routines, r)
            }
            _ => false,
        }
    }

    fn is_filled(&self, kind: FetchKind) -> bool {
        match kind {
            FetchKind::SourceTables => self.source_tables.is_some(),
            FetchKind::SourceRoutines => self.source_routines.is_some(),
            FetchKind::DestinationTables => self.destination_tables.is_some(),
            FetchKind::DestinationRoutines => self.destination_routines.is_some(),
        }
    }

    fn first_missing(&self) -> Option<FetchKind> {
        FetchKind::ALL
            .into_iter()
            .find(|kind| !self.is_filled(*kind))
    }

    fn finish(self) -> Option<FetchedSchemas> {
        Some(FetchedSchemas {
            source: SchemaSnapshot {
                tables: self.source_tables?,
                routines: self.source_routines?,
            },
            destination: SchemaSnapshot {
                tables: self.destination_tables?,
                routines: self.destination_routines?,
            },
        })
    }
}

/// Runs the four metadata fetches concurrently and joins their results.
#[derive(Debug, Clone)]
pub struct FetchJoin {
    timeout: Duration,
    progress: Progress,
}

impl Default for FetchJoin {
    fn default() -> Self {
        Self::new(Progress::silent())
    }
}

impl FetchJoin {
    pub fn new(progress: Progress) -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            progress,
        }
    }

    /// Bound each of the four fetches by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch both instances and return their snapshots, or the first failure.
    pub async fn run(
        &self,
        source: &Instance,
        destination: &Instance,
    ) -> Result<FetchedSchemas, JoinFailure> {
        let (tx, mut rx) = mpsc::channel(FetchKind::ALL.len());

        for kind in FetchKind::ALL {
            let instance = if kind.is_source() {
                source.clone()
            } else {
                destination.clone()
            };
            let progress = self.progress.clone();
            let timeout = self.timeout;
            let tx = tx.clone();

            tokio::spawn(async move {
                let result = fetch_one(kind, &instance, &progress, timeout).await;
                // The join may already have returned on an earlier failure.
                let _ = tx.send((kind, result)).await;
            });
        }
        drop(tx);

        let mut slots = Slots::default();
        while let Some(kind) = slots.first_missing() {
            let Some((done, result)) = rx.recv().await else {
                // Every sender is gone without reporting this kind: its task panicked.
                let instance = if kind.is_source() {
                    source.name()
                } else {
                    destination.name()
                };
                return Err(JoinFailure {
                    kind,
                    instance: instance.to_string(),
                    source: FetchError::query(instance, "fetch task ended without a result"),
                });
            };

            match result {
                Ok(fetched) => {
                    if !slots.fill(done, fetched) {
                        tracing::error!(kind = %done, "Discarding duplicate fetch result");
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        kind = %done,
                        instance = %err.instance(),
                        error = %err,
                        "Fetch failed"
                    );
                    return Err(JoinFailure {
                        kind: done,
                        instance: err.instance().to_string(),
                        source: err,
                    });
                }
            }
        }

        let fetched = slots.finish().unwrap_or_default();
        tracing::info!(
            source = %source.name(),
            destination = %destination.name(),
            source_tables = fetched.source.tables.len(),
            source_routines = fetched.source.routines.len(),
            destination_tables = fetched.destination.tables.len(),
            destination_routines = fetched.destination.routines.len(),
            "Fetched schema metadata"
        );
        Ok(fetched)
    }
}

async fn fetch_one(
    kind: FetchKind,
    instance: &Instance,
    progress: &Progress,
    timeout: Duration,
) -> Result<Fetched, FetchError> {
    let metadata = instance.metadata.as_ref();
    let spec = instance.spec.as_ref();

    let fetch = async {
        if matches!(kind, FetchKind::SourceTables | FetchKind::DestinationTables) {
            fetch_tables(metadata, spec, progress)
                .await
                .map(Fetched::Tables)
        } else {
            fetch_routines(metadata, spec, progress)
                .await
                .map(Fetched::Routines)
        }
    };

    match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::timeout(&spec.name, kind.to_string(), timeout)),
    }
}

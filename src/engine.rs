use std::time::Duration;

use crate::diff::{compare_routines, compare_tables};
use crate::error::JoinFailure;
use crate::fetch::{FetchJoin, FetchedSchemas, Instance};
use crate::progress::Progress;
use crate::report::Report;

#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    join: FetchJoin,
    progress: Progress,
}

impl ReconciliationEngine {
    pub fn new(progress: Progress) -> Self {
        Self {
            join: FetchJoin::new(progress.clone()),
            progress,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.join = self.join.with_timeout(timeout);
        self
    }

    /// Nothing is diffed unless all four fetches succeed.
    pub async fn compare(
        &self,
        source: &Instance,
        destination: &Instance,
    ) -> Result<Report, JoinFailure> {
        let fetched = self.fetch(source, destination).await?;
        Ok(self.reconcile(&fetched))
    }

    /// Fetch both snapshots without diffing, for callers that keep them.
    pub async fn fetch(
        &self,
        source: &Instance,
        destination: &Instance,
    ) -> Result<FetchedSchemas, JoinFailure> {
        tracing::info!(
            source = %source.name(),
            destination = %destination.name(),
            "Starting comparison"
        );
        self.join.run(source, destination).await
    }

    pub fn reconcile(&self, fetched: &FetchedSchemas) -> Report {
        for table in &fetched.source.tables {
            self.progress.comparing_table(&table.table_name);
        }

        let (source, destination) = (&fetched.source, &fetched.destination);
        let report = Report {
            table_comparisons: compare_tables(&source.tables, &destination.tables),
            routine_comparisons: compare_routines(&source.routines, &destination.routines),
        };

        let summary = report.summary();
        tracing::info!(
            tables = report.table_comparisons.len(),
            routines = report.routine_comparisons.len(),
            counts = ?summary.counts,
            "Comparison complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Status;
    use crate::fetch::SchemaSnapshot;
    use crate::routine::RoutineInfo;
    use crate::table::TableInfo;

    #[test]
    fn reconcile_reports_tables_and_routines_separately() {
        let ddl = "CREATE FUNCTION public.calc_total(int) RETURNS int";
        let mut routine = RoutineInfo::new("calc_total", "calc_total_1");
        let _ = routine.attach_ddl(ddl.to_string());

        let snapshot = SchemaSnapshot {
            tables: vec![TableInfo::new("users")],
            routines: vec![routine],
        };
        let fetched = FetchedSchemas {
            source: snapshot.clone(),
            destination: snapshot,
        };

        let (progress, mut rx) = Progress::channel();
        let report = ReconciliationEngine::new(progress).reconcile(&fetched);

        assert_eq!(report.table_comparisons.len(), 1);
        assert_eq!(report.routine_comparisons.len(), 1);
        assert!(report.entries().all(|e| e.status == Status::Equal));
        assert_eq!(rx.try_recv().unwrap(), "comparing table: users");
    }

    #[test]
    fn reconcile_of_empty_snapshots_is_empty() {
        let engine = ReconciliationEngine::default();
        let report = engine.reconcile(&FetchedSchemas::default());
        assert!(report.is_empty());
        assert!(report.is_identical());
    }
}

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::diff::{ComparisonEntry, ObjectType, Status};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub table_comparisons: Vec<ComparisonEntry>,
    pub routine_comparisons: Vec<ComparisonEntry>,
}

/// Number of entries per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub counts: BTreeMap<Status, usize>,
}

impl Summary {
    pub fn get(&self, status: Status) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl Report {
    pub fn entries(&self) -> impl Iterator<Item = &ComparisonEntry> {
        self.table_comparisons
            .iter()
            .chain(self.routine_comparisons.iter())
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut ComparisonEntry> {
        self.table_comparisons
            .iter_mut()
            .chain(self.routine_comparisons.iter_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.table_comparisons.is_empty() && self.routine_comparisons.is_empty()
    }

    pub fn is_identical(&self) -> bool {
        self.entries().all(|entry| !entry.is_change())
    }

    pub fn summary(&self) -> Summary {
        let mut counts: BTreeMap<_, usize> = Status::ALL.into_iter().map(|s| (s, 0)).collect();
        for entry in self.entries() {
            *counts.entry(entry.status).or_default() += 1;
        }
        Summary { counts }
    }

    /// Mark or unmark every entry of `object_type` named `short_name`.
    /// Returns how many entries were touched.
    pub fn select(&mut self, object_type: ObjectType, short_name: &str, selected: bool) -> usize {
        let mut touched = 0;
        for entry in self.entries_mut() {
            if entry.object_type == object_type && entry.short_name == short_name {
                entry.is_selected = selected;
                touched += 1;
            }
        }
        touched
    }

    pub fn selected(&self) -> impl Iterator<Item = &ComparisonEntry> {
        self.entries().filter(|entry| entry.is_selected)
    }

    pub fn retain_differences(&mut self) {
        self.table_comparisons.retain(ComparisonEntry::is_change);
        self.routine_comparisons.retain(ComparisonEntry::is_change);
    }

    /// Aligned one-line-per-entry listing.
    pub fn render_text(&self) -> String {
        let source_width = self
            .entries()
            .map(|e| or_dash(&e.source_object_name).len())
            .max()
            .unwrap_or(1);

        let mut out = String::new();
        for entry in self.entries() {
            let _ = writeln!(
                out,
                "{:<7} {:<2} {:<source_width$}  {}",
                entry.object_type,
                entry.status.symbol(),
                or_dash(&entry.source_object_name),
                or_dash(&entry.destination_object_name),
            );
        }

        let summary = self.summary();
        let _ = write!(
            out,
            "{} equal, {} source only, {} destination only, {} different",
            summary.get(Status::Equal),
            summary.get(Status::SourceOnly),
            summary.get(Status::DestOnly),
            summary.get(Status::Different),
        );
        out
    }
}

fn or_dash(name: &str) -> &str {
    if name.is_empty() {
        "-"
    } else {
        name
    }
}

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::routine::RoutineInfo;
use crate::table::TableInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Table,
    Routine,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ObjectType::Table => "table",
            ObjectType::Routine => "routine",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Equal,
    SourceOnly,
    DestOnly,
    Different,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Equal,
        Status::SourceOnly,
        Status::DestOnly,
        Status::Different,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Status::Equal => "=",
            Status::SourceOnly => "!>",
            Status::DestOnly => "!<",
            Status::Different => "!=",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Status::Equal => "EQUAL",
            Status::SourceOnly => "SOURCE_ONLY",
            Status::DestOnly => "DEST_ONLY",
            Status::Different => "DIFFERENT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ObjectSnapshot {
    Table(TableInfo),
    Routine(RoutineInfo),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub object_type: ObjectType,
    /// Empty when the object only exists in the destination.
    pub source_object_name: String,
    /// Empty when the object only exists in the source.
    pub destination_object_name: String,
    pub short_name: String,
    pub status: Status,
    pub is_selected: bool,
    pub source_object: Option<ObjectSnapshot>,
    pub destination_object: Option<ObjectSnapshot>,
}

impl ComparisonEntry {
    /// Key for order-independent comparison of entry collections.
    pub fn sort_key(&self) -> (ObjectType, &str, &str, Status) {
        (
            self.object_type,
            &self.source_object_name,
            &self.destination_object_name,
            self.status,
        )
    }

    pub fn is_change(&self) -> bool {
        self.status != Status::Equal
    }
}

/// Source tables come first in source order, followed by destination-only
/// tables in destination order. A name-matched pair is `Equal`; columns are
/// carried in the snapshots but not compared. With duplicate names the first
/// destination table wins.
pub fn compare_tables(source: &[TableInfo], destination: &[TableInfo]) -> Vec<ComparisonEntry> {
    let mut destination_by_name: HashMap<&str, &TableInfo> = HashMap::new();
    for table in destination {
        destination_by_name
            .entry(table.table_name.as_str())
            .or_insert(table);
    }

    let mut entries: Vec<ComparisonEntry> = source
        .iter()
        .map(|source_table| match destination_by_name.get(source_table.table_name.as_str()) {
            Some(destination_table) => ComparisonEntry {
                object_type: ObjectType::Table,
                source_object_name: source_table.table_name.clone(),
                destination_object_name: destination_table.table_name.clone(),
                short_name: source_table.table_name.clone(),
                status: Status::Equal,
                is_selected: false,
                source_object: Some(ObjectSnapshot::Table(source_table.clone())),
                destination_object: Some(ObjectSnapshot::Table((*destination_table).clone())),
            },
            None => ComparisonEntry {
                object_type: ObjectType::Table,
                source_object_name: source_table.table_name.clone(),
                destination_object_name: String::new(),
                short_name: source_table.table_name.clone(),
                status: Status::SourceOnly,
                is_selected: false,
                source_object: Some(ObjectSnapshot::Table(source_table.clone())),
                destination_object: None,
            },
        })
        .collect();

    let source_names: HashSet<&str> = source.iter().map(|t| t.table_name.as_str()).collect();
    entries.extend(
        destination
            .iter()
            .filter(|table| !source_names.contains(table.table_name.as_str()))
            .map(|table| ComparisonEntry {
                object_type: ObjectType::Table,
                source_object_name: String::new(),
                destination_object_name: table.table_name.clone(),
                short_name: table.table_name.clone(),
                status: Status::DestOnly,
                is_selected: false,
                source_object: None,
                destination_object: Some(ObjectSnapshot::Table(table.clone())),
            }),
    );

    entries
}

/// Routines are matched by full name and their definitions compared byte for
/// byte. Routines without a full name always come out one-sided.
pub fn compare_routines(
    source: &[RoutineInfo],
    destination: &[RoutineInfo],
) -> Vec<ComparisonEntry> {
    let mut destination_by_name: HashMap<&str, &RoutineInfo> = HashMap::new();
    for routine in destination {
        if let Some(full_name) = routine.full_name.as_deref() {
            destination_by_name.entry(full_name).or_insert(routine);
        }
    }

    let mut entries: Vec<ComparisonEntry> = source
        .iter()
        .map(|source_routine| {
            let matched = source_routine
                .full_name
                .as_deref()
                .and_then(|full_name| destination_by_name.get(full_name).copied());

            match matched {
                Some(destination_routine) => ComparisonEntry {
                    object_type: ObjectType::Routine,
                    source_object_name: source_routine.display_name().to_string(),
                    destination_object_name: destination_routine.display_name().to_string(),
                    short_name: source_routine.routine_name.clone(),
                    status: if source_routine.ddl == destination_routine.ddl {
                        Status::Equal
                    } else {
                        Status::Different
                    },
                    is_selected: false,
                    source_object: Some(ObjectSnapshot::Routine(source_routine.clone())),
                    destination_object: Some(ObjectSnapshot::Routine(destination_routine.clone())),
                },
                None => ComparisonEntry {
                    object_type: ObjectType::Routine,
                    source_object_name: source_routine.display_name().to_string(),
                    destination_object_name: String::new(),
                    short_name: source_routine.routine_name.clone(),
                    status: Status::SourceOnly,
                    is_selected: false,
                    source_object: Some(ObjectSnapshot::Routine(source_routine.clone())),
                    destination_object: None,
                },
            }
        })
        .collect();

    let source_names: HashSet<&str> = source
        .iter()
        .filter_map(|r| r.full_name.as_deref())
        .collect();
    entries.extend(
        destination
            .iter()
            .filter(|routine| match routine.full_name.as_deref() {
                Some(full_name) => !source_names.contains(full_name),
                None => true,
            })
            .map(|routine| ComparisonEntry {
                object_type: ObjectType::Routine,
                source_object_name: String::new(),
                destination_object_name: routine.display_name().to_string(),
                short_name: routine.routine_name.clone(),
                status: Status::DestOnly,
                is_selected: false,
                source_object: None,
                destination_object: Some(ObjectSnapshot::Routine(routine.clone())),
            }),
    );

    entries
}

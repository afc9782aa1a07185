pub mod connection;
pub mod diff;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod options;
pub mod progress;
pub mod report;
pub mod routine;
pub mod source;
pub mod table;

pub use connection::{ConnectionSpec, SslMode};
pub use diff::{
    compare_routines, compare_tables, ComparisonEntry, ObjectSnapshot, ObjectType, Status,
};
pub use engine::ReconciliationEngine;
pub use error::{DdlParseError, Error, FetchError, JoinFailure};
pub use fetch::{FetchJoin, FetchKind, FetchedSchemas, Instance, SchemaSnapshot};
pub use progress::Progress;
pub use report::{Report, Summary};
pub use routine::{extract_full_name, RoutineInfo};
pub use source::{MetadataSource, PgMetadataSource};
pub use table::{ColumnInfo, TableInfo};

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::connection::ConnectionSpec;
use crate::error::FetchError;
use crate::routine::RoutineInfo;
use crate::table::{ColumnInfo, TableInfo};

/// Ability to read table, column and routine metadata from one instance.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Tables in `schema`, without columns.
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableInfo>, FetchError>;

    /// Columns of one table, in ordinal order.
    async fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>, FetchError>;

    /// Routines in `schema` ordered by routine name, without DDL.
    async fn list_routines(&self, schema: &str) -> Result<Vec<RoutineInfo>, FetchError>;

    async fn routine_ddl(&self, routine_id: &str) -> Result<String, FetchError>;
}

const TABLE_LIST_SQL: &str = "
    SELECT table_catalog::text AS table_catalog,
           table_schema::text AS table_schema,
           table_name::text AS table_name,
           table_type::text AS table_type
    FROM information_schema.tables
    WHERE table_schema = $1";

const COLUMN_LIST_SQL: &str = "
    SELECT c.table_catalog::text AS table_catalog,
           c.table_schema::text AS table_schema,
           c.table_name::text AS table_name,
           c.column_name::text AS column_name,
           c.column_default::text AS column_default,
           c.is_nullable::text AS is_nullable,
           c.data_type::text AS data_type,
           c.character_maximum_length::int4 AS character_maximum_length,
           c.numeric_precision::int4 AS numeric_precision,
           c.numeric_precision_radix::int4 AS numeric_precision_radix,
           c.numeric_scale::int4 AS numeric_scale,
           c.datetime_precision::int4 AS datetime_precision,
           c.udt_name::text AS udt_name
    FROM information_schema.columns c
    WHERE c.table_schema = $1 AND c.table_name = $2
    ORDER BY c.ordinal_position ASC";

const ROUTINE_LIST_SQL: &str = "
    SELECT routine_name::text AS routine_name,
           specific_name::text AS specific_name,
           routine_type::text AS routine_type
    FROM information_schema.routines
    WHERE routine_schema = $1
    ORDER BY routine_name";

const ROUTINE_DDL_SQL: &str = "SELECT pg_get_functiondef($1::text::oid) AS ddl";

/// [`MetadataSource`] backed by a pool dedicated to one instance.
pub struct PgMetadataSource {
    instance: String,
    pool: PgPool,
}

impl PgMetadataSource {
    /// Connection failures surface from the first query.
    pub fn connect_lazy(spec: &ConnectionSpec, acquire_timeout: Duration) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(spec.connect_options());

        tracing::debug!(
            instance = %spec.name,
            host = %spec.host,
            port = spec.port,
            database = %spec.database,
            "Created connection pool"
        );

        Self {
            instance: spec.name.clone(),
            pool,
        }
    }

    fn map_err(&self, err: sqlx::Error) -> FetchError {
        let err = FetchError::from_sqlx(&self.instance, err);
        tracing::warn!(instance = %self.instance, error = %err, "Metadata query failed");
        err
    }
}

#[async_trait]
impl MetadataSource for PgMetadataSource {
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableInfo>, FetchError> {
        sqlx::query_as::<_, TableInfo>(TABLE_LIST_SQL)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn list_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, FetchError> {
        sqlx::query_as::<_, ColumnInfo>(COLUMN_LIST_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn list_routines(&self, schema: &str) -> Result<Vec<RoutineInfo>, FetchError> {
        sqlx::query_as::<_, RoutineInfo>(ROUTINE_LIST_SQL)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn routine_ddl(&self, routine_id: &str) -> Result<String, FetchError> {
        let row = sqlx::query(ROUTINE_DDL_SQL)
            .bind(routine_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;

        let ddl: Option<String> = row.try_get("ddl").map_err(|e| self.map_err(e))?;
        ddl.ok_or_else(|| {
            FetchError::query(
                &self.instance,
                format!("no definition returned for routine {routine_id}"),
            )
        })
    }
}

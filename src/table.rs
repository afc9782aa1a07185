use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct TableInfo {
    pub table_catalog: String,
    pub table_schema: String,
    pub table_name: String,
    pub table_type: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_catalog: String::new(),
            table_schema: String::new(),
            table_name: table_name.into(),
            table_type: "BASE TABLE".to_string(),
            columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnInfo>) -> Self {
        self.columns = columns;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table_catalog: String,
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    pub column_default: Option<String>,
    pub is_nullable: String,
    pub data_type: String,
    pub character_maximum_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_precision_radix: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub datetime_precision: Option<i32>,
    pub udt_name: String,
}

impl ColumnInfo {
    pub fn new(
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        let data_type = data_type.into();
        Self {
            table_catalog: String::new(),
            table_schema: String::new(),
            table_name: table_name.into(),
            column_name: column_name.into(),
            column_default: None,
            is_nullable: "YES".to_string(),
            udt_name: data_type.clone(),
            data_type,
            character_maximum_length: None,
            numeric_precision: None,
            numeric_precision_radix: None,
            numeric_scale: None,
            datetime_precision: None,
        }
    }
}

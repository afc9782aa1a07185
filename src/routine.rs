use serde::{Deserialize, Serialize};

use crate::error::DdlParseError;

/// `ddl` and `full_name` are filled in by the DDL phase of the routine fetch.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct RoutineInfo {
    pub routine_name: String,
    pub specific_name: String,
    pub routine_type: Option<String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub ddl: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub full_name: Option<String>,
}

impl RoutineInfo {
    pub fn new(routine_name: impl Into<String>, specific_name: impl Into<String>) -> Self {
        Self {
            routine_name: routine_name.into(),
            specific_name: specific_name.into(),
            routine_type: Some("FUNCTION".to_string()),
            ddl: String::new(),
            full_name: None,
        }
    }

    /// Internal identifier used to look up the definition: whatever follows
    /// the last `_` of the specific name (`calc_total_16384` -> `16384`).
    pub fn routine_id(&self) -> &str {
        self.specific_name
            .rsplit('_')
            .next()
            .unwrap_or(&self.specific_name)
    }

    /// A definition without the expected shape leaves `full_name` unset.
    pub fn attach_ddl(&mut self, ddl: String) -> Result<(), DdlParseError> {
        let full_name = extract_full_name(&ddl).map(str::to_string);
        self.ddl = ddl;
        match full_name {
            Ok(name) => {
                self.full_name = Some(name);
                Ok(())
            }
            Err(err) => {
                self.full_name = None;
                Err(err)
            }
        }
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.specific_name)
    }
}

/// Cut the routine identity out of its definition text.
///
/// Uses the first `.`, the first `(` and the first `)` in the text. The dot
/// must not be the first byte, and the three must appear in that order. The
/// result runs from just after the dot up to (not including) the `)`:
/// `CREATE FUNCTION public.foo(int) ...` gives `foo(int`.
pub fn extract_full_name(ddl: &str) -> Result<&str, DdlParseError> {
    let dot = match ddl.find('.') {
        Some(offset) if offset > 0 => offset,
        _ => return Err(DdlParseError::MissingDot),
    };
    let open = match ddl.find('(') {
        Some(offset) if offset > dot => offset,
        _ => return Err(DdlParseError::MissingOpenParen),
    };
    match ddl.find(')') {
        Some(close) if close > open => Ok(&ddl[dot + 1..close]),
        _ => Err(DdlParseError::MissingCloseParen),
    }
}

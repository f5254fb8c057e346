//! Insert/update payload validation.
//!
//! Only keys are checked: they become column names in generated SQL.
//! Values are always bound as parameters and left to the engine.

use crate::error::{ValidationError, ValidationResult};
use crate::security::identifier::{Identifier, IdentifierKind, validate_identifiers};
use serde_json::{Map, Value};

/// Maximum number of columns in one payload.
pub const MAX_ROW_COLUMNS: usize = 100;

/// Validate an insert/update payload.
pub fn validate_row_data(data: &Value) -> ValidationResult<()> {
    let Value::Object(map) = data else {
        return Err(ValidationError::NotAnObject);
    };
    validate_row_map(map)
}

fn validate_row_map(map: &Map<String, Value>) -> ValidationResult<()> {
    if map.is_empty() {
        return Err(ValidationError::EmptyPayload);
    }

    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    validate_identifiers(&keys, IdentifierKind::Column)?;

    if keys.len() > MAX_ROW_COLUMNS {
        return Err(ValidationError::TooManyColumns {
            max: MAX_ROW_COLUMNS,
        });
    }

    Ok(())
}

/// A validated row payload: column identifiers paired with their values.
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    fields: Vec<(Identifier, Value)>,
}

impl RowData {
    pub fn columns(&self) -> impl Iterator<Item = &Identifier> {
        self.fields.iter().map(|(column, _)| column)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a validated payload.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Value> for RowData {
    type Error = ValidationError;

    fn try_from(data: Value) -> ValidationResult<Self> {
        let Value::Object(map) = data else {
            return Err(ValidationError::NotAnObject);
        };
        Self::try_from(map)
    }
}

impl TryFrom<Map<String, Value>> for RowData {
    type Error = ValidationError;

    fn try_from(map: Map<String, Value>) -> ValidationResult<Self> {
        validate_row_map(&map)?;
        let fields = map
            .into_iter()
            .map(|(key, value)| {
                Identifier::parse(key, IdentifierKind::Column).map(|column| (column, value))
            })
            .collect::<ValidationResult<Vec<_>>>()?;
        Ok(Self { fields })
    }
}

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),
}

/// A typed scalar bound into a WHERE clause. Keeping the native type here
/// lets the Postgres backend bind uuids and booleans without casts.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Uuid(Uuid),
    Text(String),
    Bool(bool),
    Int(i64),
}

impl Scalar {
    /// JSON representation matching how rows are stored (uuids as strings).
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Uuid(u) => Value::String(u.to_string()),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::Number((*i).into()),
        }
    }
}

impl From<Uuid> for Scalar {
    fn from(u: Uuid) -> Self {
        Scalar::Uuid(u)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

#[derive(Debug, Clone)]
pub enum Predicate {
    /// column = value
    Eq(String, Scalar),
    /// LOWER(column) = LOWER(value), for case-insensitive text lookups
    EqCi(String, Scalar),
    /// column IN (values); an empty set matches nothing
    In(String, Vec<Scalar>),
    /// column IS NULL
    IsNull(String),
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq(c, _) => c,
            Predicate::EqCi(c, _) => c,
            Predicate::In(c, _) => c,
            Predicate::IsNull(c) => c,
        }
    }
}

/// Conjunction of predicates plus an optional column projection.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    predicates: Vec<Predicate>,
    columns: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.predicates.push(Predicate::Eq(column.into(), value.into()));
        self
    }

    pub fn eq_ci(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates
            .push(Predicate::EqCi(column.into(), Scalar::Text(value.into())));
        self
    }

    pub fn is_in(mut self, column: impl Into<String>, values: Vec<Scalar>) -> Self {
        self.predicates.push(Predicate::In(column.into(), values));
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.predicates.push(Predicate::IsNull(column.into()));
        self
    }

    /// Restrict the selected columns; the default is the whole row.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn selected_columns(&self) -> &[String] {
        &self.columns
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for p in &self.predicates {
            validate_column(p.column())?;
        }
        for c in &self.columns {
            validate_column(c)?;
        }
        Ok(())
    }
}

pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false);
    first_ok
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub fn validate_table(name: &str) -> Result<(), FilterError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(FilterError::InvalidTableName(name.to_string()))
    }
}

pub fn validate_column(name: &str) -> Result<(), FilterError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(FilterError::InvalidColumn(name.to_string()))
    }
}

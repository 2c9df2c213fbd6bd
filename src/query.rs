use rusqlite::types::Value;

/// A parameterized `IN (...)` list.
///
/// The SQL fragment only ever contains numbered placeholders; the values are
/// bound separately, so type names or content types never end up spliced
/// into the statement text.
#[derive(Debug, Clone)]
pub struct InClause {
    sql: String,
    values: Vec<Value>,
}

impl InClause {
    /// Build a clause whose first placeholder is `?first`.
    pub fn new<I, S>(values: I, first: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<Value> = values
            .into_iter()
            .map(|v| Value::Text(v.into()))
            .collect();
        let sql = placeholders(first, values.len());
        Self { sql, values }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// `(?first, ?first+1, ...)` for `count` parameters. An empty list renders as
/// `()`, which SQLite accepts and which matches nothing.
pub fn placeholders(first: usize, count: usize) -> String {
    let inner = (first..first + count)
        .map(|n| format!("?{}", n))
        .collect::<Vec<_>>()
        .join(", ");
    format!("({})", inner)
}

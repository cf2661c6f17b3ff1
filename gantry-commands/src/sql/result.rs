use serde_json::{Map, Value};
use std::collections::VecDeque;

/// One row, keyed by column name.
pub type Row = Map<String, Value>;

/// One result set produced by a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    /// Rows returned.
    Rows(Vec<Row>),
    /// The result set errored on a named constraint.
    Failed {
        /// Constraint name.
        constraint: String,
    },
}

impl ResultSet {
    /// The first row, or `null`.
    pub fn one_row(&self) -> Value {
        match self {
            Self::Rows(rows) => rows
                .first()
                .map(|row| Value::Object(row.clone()))
                .unwrap_or(Value::Null),
            Self::Failed { .. } => Value::Null,
        }
    }

    /// All rows as an array.
    pub fn all_rows(&self) -> Value {
        match self {
            Self::Rows(rows) => Value::Array(rows.iter().cloned().map(Value::Object).collect()),
            Self::Failed { .. } => Value::Array(Vec::new()),
        }
    }

    /// The failing constraint, if this set errored.
    pub fn failed_constraint(&self) -> Option<&str> {
        match self {
            Self::Failed { constraint } => Some(constraint),
            Self::Rows(_) => None,
        }
    }
}

/// Cursor over the result sets of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSets {
    sets: VecDeque<ResultSet>,
}

impl ResultSets {
    /// Wrap result sets in order.
    pub fn new(sets: Vec<ResultSet>) -> Self {
        Self { sets: sets.into() }
    }

    /// A single set of rows.
    pub fn rows(rows: Vec<Row>) -> Self {
        Self::new(vec![ResultSet::Rows(rows)])
    }

    /// Remaining result sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no result set remains.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl Iterator for ResultSets {
    type Item = ResultSet;

    fn next(&mut self) -> Option<Self::Item> {
        self.sets.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: i64) -> Row {
        json!({"id": id}).as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn one_and_all_rows() {
        let set = ResultSet::Rows(vec![row(1), row(2)]);
        assert_eq!(set.one_row(), json!({"id": 1}));
        assert_eq!(set.all_rows(), json!([{"id": 1}, {"id": 2}]));
        assert_eq!(ResultSet::Rows(vec![]).one_row(), Value::Null);
    }

    #[test]
    fn iterates_in_order() {
        let sets = ResultSets::new(vec![
            ResultSet::Rows(vec![row(1)]),
            ResultSet::Failed { constraint: "c".into() },
        ]);
        let collected: Vec<_> = sets.collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].failed_constraint(), Some("c"));
    }
}

use serde::Deserialize;

/// How many rows a result set yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Expect {
    /// The first row, or `null`.
    OneRow,
    /// Every row, as an array.
    Multiple,
}

/// Declared shape of one result set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResultSetSpec {
    /// Row expectation.
    pub expect: Expect,
}

/// Maps a constraint name to a safe public message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailureMapping {
    /// Constraint name (matched exactly, or as a substring of the driver message).
    pub constraint: String,
    /// Message returned to the caller.
    pub message: String,
}

/// What a query returns and how its failures read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryReturn {
    /// One entry per result set, by index.
    #[serde(default)]
    pub resultsets: Vec<ResultSetSpec>,
    /// Constraint failure table.
    #[serde(default)]
    pub failures: Vec<FailureMapping>,
}

/// A named query declared on a connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryDefinition {
    /// Statement text with positional placeholders.
    pub query: String,
    /// Result shape and failure table.
    #[serde(rename = "return", default)]
    pub returns: QueryReturn,
}

impl QueryDefinition {
    /// Expectation for the result set at `index`, if declared.
    pub fn expectation(&self, index: usize) -> Option<Expect> {
        self.returns.resultsets.get(index).map(|r| r.expect)
    }

    /// Find the failure mapping for a constraint name, falling back to a
    /// substring match against the driver message.
    pub fn failure_for(&self, name: &str, message: &str) -> Option<&FailureMapping> {
        let failures = &self.returns.failures;
        failures
            .iter()
            .find(|f| f.constraint == name)
            .or_else(|| failures.iter().find(|f| message.contains(&f.constraint)))
    }
}

use derive_more::derive::{Display, Error};
use serde_json::{Map, Number, Value};

/// Usage response of the retailer API for one requested date.
///
/// The body is kept as received and only interpreted through the accessors below, so that a
/// response with an unexpected shape surfaces as [`DocumentError`] instead of failing the fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageDocument {
    root: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum DocumentError {
    #[display("missing field {path}")]
    MissingField { path: String },

    #[display("field {path} is not {expected}")]
    WrongType { path: String, expected: &'static str },
}

impl UsageDocument {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn current_week_has_data(&self) -> Result<bool, DocumentError> {
        self.bool_at(&["current_week", "metadata", "has_data"])
    }

    pub fn previous_week_has_data(&self) -> Result<bool, DocumentError> {
        self.bool_at(&["previous_week", "has_data"])
    }

    pub fn previous_week_from(&self) -> Result<String, DocumentError> {
        let path = ["previous_week", "from"];
        self.field(&path)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| wrong_type(&path, "a string"))
    }

    pub fn weekly_total(&self) -> Result<Number, DocumentError> {
        let path = ["current_week", "insights", "weekly_total"];
        match self.field(&path)? {
            Value::Number(n) => Ok(n.clone()),
            _ => Err(wrong_type(&path, "a number")),
        }
    }

    //absent, null or an empty mapping all mean there is nothing to walk
    pub fn current_week_intervals(&self) -> Result<Option<&Map<String, Value>>, DocumentError> {
        let path = ["current_week", "intervals"];
        match self.field(&path) {
            Err(DocumentError::MissingField { .. }) => Ok(None),
            Err(e) => Err(e),
            Ok(Value::Null) => Ok(None),
            Ok(Value::Object(intervals)) if intervals.is_empty() => Ok(None),
            Ok(Value::Object(intervals)) => Ok(Some(intervals)),
            Ok(_) => Err(wrong_type(&path, "a mapping")),
        }
    }

    fn bool_at(&self, path: &[&str]) -> Result<bool, DocumentError> {
        self.field(path)?
            .as_bool()
            .ok_or_else(|| wrong_type(path, "a boolean"))
    }

    fn field(&self, path: &[&str]) -> Result<&Value, DocumentError> {
        let mut current = &self.root;

        for (depth, key) in path.iter().enumerate() {
            current = current.get(key).ok_or_else(|| DocumentError::MissingField {
                path: path[..=depth].join("."),
            })?;
        }

        Ok(current)
    }
}

fn wrong_type(path: &[&str], expected: &'static str) -> DocumentError {
    DocumentError::WrongType {
        path: path.join("."),
        expected,
    }
}

use crate::{err, error::VecgateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Arbitrary JSON object attached to a record.
pub type Metadata = serde_json::Map<String, Value>;

/// A single entry of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<Metadata>,
    pub document: Option<String>,
}

/// Record fields a query or a peek can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    Documents,
    Embeddings,
    Metadatas,
    Distances,
    Uris,
    Data,
}

impl Include {
    /// What search includes when the caller does not say otherwise.
    pub fn search_default() -> Vec<Include> {
        vec![Include::Metadatas, Include::Documents, Include::Distances]
    }
}

/// Results of a similarity query for a single query vector, closest first.
/// Columns that were not included are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub ids: Vec<String>,
    pub documents: Option<Vec<Option<String>>>,
    pub metadatas: Option<Vec<Option<Metadata>>>,
    pub embeddings: Option<Vec<Option<Vec<f32>>>>,
    pub distances: Option<Vec<f32>>,
    pub included: Vec<Include>,
}

/// Records fetched without ranking, in store order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GetResult {
    pub ids: Vec<String>,
    pub documents: Option<Vec<Option<String>>>,
    pub metadatas: Option<Vec<Option<Metadata>>>,
    pub embeddings: Option<Vec<Option<Vec<f32>>>>,
    pub uris: Option<Vec<Option<String>>>,
    pub data: Option<Vec<Option<Value>>>,
    pub included: Vec<Include>,
}

/// A scalar a metadata field can be matched against.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Bool(bool),
}

impl FilterValue {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FilterValue::String(a), Value::String(b)) => a == b,
            (FilterValue::Integer(a), Value::Number(b)) => b.as_i64() == Some(*a),
            (FilterValue::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

/// Conjunction of metadata equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    pub conditions: Vec<(String, FilterValue)>,
}

impl MetadataFilter {
    /// Parse a `where` object.
    ///
    /// Accepted forms are `{"key": value}`, `{"key": {"$eq": value}}`
    /// and `{"$and": [filter, ...]}`, where values are strings, integers or booleans.
    pub fn parse(input: &serde_json::Map<String, Value>) -> Result<Self, VecgateError> {
        let mut filter = MetadataFilter::default();
        filter.extend(input)?;
        Ok(filter)
    }

    fn extend(&mut self, input: &serde_json::Map<String, Value>) -> Result<(), VecgateError> {
        for (key, value) in input {
            if key == "$and" {
                let Value::Array(filters) = value else {
                    return err!(InvalidFilter, "`$and` expects a list of filters");
                };
                for filter in filters {
                    let Value::Object(filter) = filter else {
                        return err!(InvalidFilter, "`$and` expects a list of filters");
                    };
                    self.extend(filter)?;
                }
                continue;
            }

            if key.starts_with('$') {
                return err!(InvalidFilter, "unsupported operator '{key}'");
            }

            let value = match value {
                Value::Object(op) => match (op.len(), op.get("$eq")) {
                    (1, Some(value)) => value,
                    _ => return err!(InvalidFilter, "only `$eq` is supported for '{key}'"),
                },
                value => value,
            };

            let value = match value {
                Value::String(s) => FilterValue::String(s.clone()),
                Value::Bool(b) => FilterValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(n) => FilterValue::Integer(n),
                    None => return err!(InvalidFilter, "'{key}' must be an integer"),
                },
                v => return err!(InvalidFilter, "unsupported value for '{key}': {v}"),
            };

            self.conditions.push((key.clone(), value));
        }
        Ok(())
    }

    pub fn matches(&self, metadata: Option<&Metadata>) -> bool {
        self.conditions.iter().all(|(key, value)| {
            metadata
                .and_then(|m| m.get(key))
                .is_some_and(|v| value.matches(v))
        })
    }
}

/// Full text condition on the record document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentFilter {
    Contains(String),
}

impl DocumentFilter {
    /// Parse a `where_document` object, i.e. `{"$contains": "text"}`.
    pub fn parse(input: &serde_json::Map<String, Value>) -> Result<Self, VecgateError> {
        match (input.len(), input.get("$contains")) {
            (1, Some(Value::String(text))) => Ok(DocumentFilter::Contains(text.clone())),
            _ => err!(InvalidFilter, "`where_document` only supports `$contains` with a string"),
        }
    }

    pub fn matches(&self, document: Option<&str>) -> bool {
        match self {
            DocumentFilter::Contains(text) => document.is_some_and(|d| d.contains(text.as_str())),
        }
    }
}

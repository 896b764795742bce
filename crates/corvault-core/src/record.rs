//! Parsing framed payloads into record collections.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::catalog::Category;
use crate::error::{CollectError, Result};

/// Field holding the vendor's stable device identifier.
pub const DURABLE_ID: &str = "durable-id";

/// One controller or disk record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    durable_id: String,
    fields: Map<String, Value>,
}

impl Record {
    pub fn durable_id(&self) -> &str {
        &self.durable_id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Records of one category, in the order the CLI reported them.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordCollection {
    category: Category,
    records: Vec<Record>,
}

impl RecordCollection {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a RecordCollection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Parse a framed payload and extract the record array for `category`.
///
/// A single malformed record rejects the whole payload.
pub fn parse(payload: &str, category: Category) -> Result<RecordCollection> {
    let doc: Value = serde_json::from_str(payload)
        .map_err(|e| CollectError::parse(category, format!("invalid JSON: {e}")))?;

    let Value::Object(mut doc) = doc else {
        return Err(CollectError::parse(category, "payload is not a JSON object"));
    };

    let key = category.collection_key();
    let items = match doc.remove(key) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(CollectError::parse(category, format!("`{key}` is not an array")));
        }
        None => {
            return Err(CollectError::parse(category, format!("missing top-level key `{key}`")));
        }
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(fields) = item else {
            return Err(CollectError::parse(
                category,
                format!("record {index} is not an object"),
            ));
        };
        let durable_id = match fields.get(DURABLE_ID) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(_) => {
                return Err(CollectError::parse(
                    category,
                    format!("record {index}: `{DURABLE_ID}` is not a non-empty string"),
                ));
            }
            None => {
                return Err(CollectError::parse(
                    category,
                    format!("record {index}: missing `{DURABLE_ID}`"),
                ));
            }
        };
        if !seen.insert(durable_id.clone()) {
            return Err(CollectError::parse(
                category,
                format!("record {index}: duplicate `{DURABLE_ID}` {durable_id:?}"),
            ));
        }
        records.push(Record { durable_id, fields });
    }

    Ok(RecordCollection { category, records })
}

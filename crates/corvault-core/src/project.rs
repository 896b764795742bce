//! Projecting parsed records onto the metric catalog.

use serde_json::Value;

use crate::catalog::{Category, FieldSource, LABEL_CID, LABEL_HOST, LABEL_ID, MetricDef};
use crate::error::{CollectError, Result};
use crate::record::{Record, RecordCollection};

/// Which redundant controller path a disk counter was reported through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathIndex {
    One,
    Two,
}

impl PathIndex {
    pub const BOTH: [PathIndex; 2] = [PathIndex::One, PathIndex::Two];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
        }
    }
}

impl std::fmt::Display for PathIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label set of one observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Labels {
    pub host: String,
    pub id: String,
    pub cid: Option<PathIndex>,
}

impl Labels {
    /// `(name, value)` pairs in exposition order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![(LABEL_HOST, self.host.as_str()), (LABEL_ID, self.id.as_str())];
        if let Some(cid) = self.cid {
            pairs.push((LABEL_CID, cid.as_str()));
        }
        pairs
    }

    /// Label values in exposition order.
    pub fn values(&self) -> Vec<&str> {
        self.pairs().into_iter().map(|(_, v)| v).collect()
    }
}

/// One exported sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: &'static MetricDef,
    pub labels: Labels,
    pub value: f64,
}

/// Emit every catalog observation for every record in `records`.
///
/// Records are visited in array order and metrics in catalog order. The first
/// missing or non-numeric field aborts the projection.
pub fn project(records: &RecordCollection, host: &str) -> Result<Vec<Observation>> {
    let category = records.category();
    let per_record = crate::catalog::observations_per_record(category);
    let mut out = Vec::with_capacity(records.len() * per_record);

    for (index, record) in records.iter().enumerate() {
        for metric in category.metrics() {
            match metric.source {
                FieldSource::Single(field) => {
                    let value = field_value(category, index, record, field)?;
                    out.push(observation(metric, host, record, None, value));
                }
                FieldSource::PerPath(fields) => {
                    for (path, field) in PathIndex::BOTH.into_iter().zip(fields) {
                        let value = field_value(category, index, record, field)?;
                        out.push(observation(metric, host, record, Some(path), value));
                    }
                }
            }
        }
    }

    log::debug!(
        "{category}: projected {} records into {} observations",
        records.len(),
        out.len()
    );
    Ok(out)
}

fn observation(
    metric: &'static MetricDef,
    host: &str,
    record: &Record,
    cid: Option<PathIndex>,
    value: f64,
) -> Observation {
    Observation {
        metric,
        labels: Labels {
            host: host.to_string(),
            id: record.durable_id().to_string(),
            cid,
        },
        value,
    }
}

fn field_value(
    category: Category,
    index: usize,
    record: &Record,
    field: &'static str,
) -> Result<f64> {
    let fail = |reason: String| CollectError::Conversion {
        category,
        index,
        id: record.durable_id().to_string(),
        field,
        reason,
    };
    match record.get(field) {
        None => Err(fail("is missing".to_string())),
        Some(value) => to_f64(value).ok_or_else(|| fail(format!("is not numeric: {value}"))),
    }
}

/// The CLI reports numbers as JSON strings; bare JSON numbers are accepted too.
fn to_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

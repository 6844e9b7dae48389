use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::warehouse::{Record, RowSet, TableSpec};

/// Collects flattened records for one table, dropping the ones that lack a
/// natural-key value and remembering why.
pub struct Flattener {
    rows: RowSet,
    key: &'static [&'static str],
    received: usize,
    drop_reasons: BTreeMap<String, usize>,
}

impl Flattener {
    pub fn new(spec: TableSpec) -> Self {
        Self {
            rows: RowSet::empty(spec.name, spec.key),
            key: spec.key,
            received: 0,
            drop_reasons: BTreeMap::new(),
        }
    }

    /// Accept `record` if every key column holds a value.
    pub fn push(&mut self, record: Record) {
        self.received += 1;
        let missing = self
            .key
            .iter()
            .find(|k| record.get(k).map_or(true, |v| v.is_null()));
        match missing {
            Some(column) => self.count_drop(format!("missing {column}")),
            None => self.rows.push(record),
        }
    }

    /// Count a source record the adapter rejected before flattening it.
    pub fn drop(&mut self, reason: &str) {
        self.received += 1;
        self.count_drop(reason.to_string());
    }

    fn count_drop(&mut self, reason: String) {
        *self.drop_reasons.entry(reason).or_insert(0) += 1;
    }

    pub fn finish(self) -> Flattened {
        let dropped = self.drop_reasons.values().sum();
        if dropped > 0 {
            warn!(
                table = self.rows.table(),
                received = self.received,
                dropped,
                reasons = ?self.drop_reasons,
                "Dropped rows without a usable natural key"
            );
        } else {
            debug!(table = self.rows.table(), rows = self.rows.len(), "Flattened");
        }
        Flattened {
            rows: self.rows,
            received: self.received,
            dropped,
            drop_reasons: self.drop_reasons,
        }
    }
}

/// The outcome of flattening one response.
#[derive(Debug)]
pub struct Flattened {
    pub rows: RowSet,
    pub received: usize,
    pub dropped: usize,
    pub drop_reasons: BTreeMap<String, usize>,
}

impl Flattened {
    /// Zero usable rows is a failure of the whole work item, not a silent zero.
    pub fn require_rows(self, endpoint: &str) -> Result<Self, AdapterError> {
        if self.rows.is_empty() {
            return Err(AdapterError::NoUsableRows {
                endpoint: endpoint.to_string(),
                received: self.received,
                dropped: self.dropped,
            });
        }
        Ok(self)
    }
}

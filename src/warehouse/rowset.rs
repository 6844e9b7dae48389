use super::value::Value;

/// One flattened record: ordered named fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any earlier value under the same name.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// A named column of a row-set.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// A homogeneous batch of rows destined for one table.
///
/// Every column holds exactly `len` values; fields a record did not carry are
/// stored as [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    table: String,
    key_columns: Vec<String>,
    columns: Vec<Column>,
    len: usize,
}

impl RowSet {
    pub fn empty(table: &str, key_columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            key_columns: key_columns.iter().map(|k| k.to_string()).collect(),
            columns: Vec::new(),
            len: 0,
        }
    }

    /// Build from records. Columns appear in first-seen order.
    pub fn from_records(table: &str, key_columns: &[&str], records: Vec<Record>) -> Self {
        let mut set = Self::empty(table, key_columns);
        for record in records {
            set.push(record);
        }
        set
    }

    pub fn push(&mut self, record: Record) {
        let row = self.len;
        for (name, value) in record.fields {
            match self.columns.iter_mut().find(|c| c.name == name) {
                Some(column) => column.values.push(value),
                None => {
                    let mut values = vec![Value::Null; row];
                    values.push(value);
                    self.columns.push(Column { name, values });
                }
            }
        }
        self.len += 1;
        for column in &mut self.columns {
            if column.values.len() < self.len {
                column.values.push(Value::Null);
            }
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Values of row `i` in column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(move |c| &c.values[i])
    }
}

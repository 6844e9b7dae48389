use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// A single cell of a row-set.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Timezone-aware instant, normalised to UTC.
    Timestamp(DateTime<Utc>),
    NaiveTimestamp(NaiveDateTime),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::NaiveTimestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Storage type of a warehouse column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Double,
    Boolean,
    Timestamp,
    TimestampTz,
    Date,
    Text,
}

impl ColumnType {
    /// Declared SQL type used in DDL.
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::TimestampTz => "TIMESTAMPTZ",
            ColumnType::Date => "DATE",
            ColumnType::Text => "TEXT",
        }
    }

    /// Infer a column type from its values. Nulls carry no information; a
    /// column with nothing but nulls falls back to text.
    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut seen = Seen::default();
        for v in values {
            match v {
                Value::Null => {}
                Value::Integer(_) => seen.integer = true,
                Value::Float(_) => seen.float = true,
                Value::Boolean(_) => seen.boolean = true,
                Value::Timestamp(_) => seen.timestamp_tz = true,
                Value::NaiveTimestamp(_) => seen.timestamp = true,
                Value::Date(_) => seen.date = true,
                Value::Text(_) => seen.text = true,
            }
        }

        let numeric = seen.integer || seen.float;
        let temporal = seen.timestamp_tz || seen.timestamp || seen.date;

        if seen.text || (numeric as u8 + seen.boolean as u8 + temporal as u8) > 1 {
            return ColumnType::Text;
        }
        if seen.float {
            ColumnType::Double
        } else if seen.integer {
            ColumnType::Integer
        } else if seen.boolean {
            ColumnType::Boolean
        } else if seen.timestamp_tz {
            ColumnType::TimestampTz
        } else if seen.timestamp {
            ColumnType::Timestamp
        } else if seen.date {
            ColumnType::Date
        } else {
            ColumnType::Text
        }
    }

    /// Map a declared type read back from the store's catalog.
    pub fn from_declared(decl: &str) -> Self {
        let decl = decl.trim().to_ascii_uppercase();
        if decl.starts_with("TIMESTAMPTZ") || decl.contains("WITH TIME ZONE") {
            ColumnType::TimestampTz
        } else if decl.starts_with("TIMESTAMP") || decl.starts_with("DATETIME") {
            ColumnType::Timestamp
        } else if decl == "DATE" {
            ColumnType::Date
        } else if decl.starts_with("BOOL") {
            ColumnType::Boolean
        } else if decl.contains("INT") {
            ColumnType::Integer
        } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
            ColumnType::Double
        } else {
            ColumnType::Text
        }
    }
}

#[derive(Default)]
struct Seen {
    integer: bool,
    float: bool,
    boolean: bool,
    timestamp_tz: bool,
    timestamp: bool,
    date: bool,
    text: bool,
}

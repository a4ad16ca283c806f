use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::any::AnyRow;
use sqlx::{Column, Row as _, ValueRef};

/// A decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Integer(v) => serializer.serialize_i64(*v),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Text(v) => serializer.serialize_str(v),
            CellValue::Bool(v) => serializer.serialize_bool(*v),
        }
    }
}

/// Column name to value, in result-set order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Decodes every column of a driver row. Byte sequences become text, the
/// numeric kinds keep full precision.
pub fn decode(row: &AnyRow) -> sqlx::Result<Row> {
    let mut out = Row::new();
    for (i, col) in row.columns().iter().enumerate() {
        let col_name = col.name();
        if row.try_get_raw(i)?.is_null() {
            out.push(col_name, CellValue::Null);
            continue;
        }

        let value = if let Ok(v) = row.try_get::<i64, _>(i) {
            CellValue::Integer(v)
        } else if let Ok(v) = row.try_get::<f64, _>(i) {
            CellValue::Float(v)
        } else if let Ok(v) = row.try_get::<bool, _>(i) {
            CellValue::Bool(v)
        } else if let Ok(v) = text_at(row, i) {
            CellValue::Text(v)
        } else {
            return Err(sqlx::Error::ColumnDecode {
                index: col_name.to_string(),
                source: "column type has no JSON representation".into(),
            });
        };
        out.push(col_name, value);
    }
    Ok(out)
}

/// Reads a text column that some drivers hand back as raw bytes.
pub(crate) fn text_at(row: &AnyRow, index: usize) -> sqlx::Result<String> {
    match row.try_get::<String, _>(index) {
        Ok(v) => Ok(v),
        Err(_) => row
            .try_get::<Vec<u8>, _>(index)
            .map(|b| String::from_utf8_lossy(&b).into_owned()),
    }
}

//! Materialization of raw result rows into caller-shaped rows.

use std::collections::HashMap;

use crate::coerce;
use crate::column::Column;
use crate::error::{DbError, DbResult};
use crate::ffi;
use crate::value::{RawValue, Value};

/// Container form of a materialized row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RowShape {
    /// Ordered `(name, value)` pairs in column order.
    #[default]
    Pairs,
    /// Name-to-value map; a later duplicate column name overwrites an
    /// earlier one.
    Map,
}

/// A result row after per-column coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Ordered `(name, value)` pairs.
    Pairs(Vec<(String, Value)>),
    /// Name-to-value map.
    Map(HashMap<String, Value>),
}

impl Row {
    /// Decodes one raw row against its column descriptors.
    ///
    /// Columns and values are paired positionally.
    ///
    /// # Errors
    ///
    /// `SQLITE_MISMATCH` when the row does not have one value per column;
    /// otherwise the first column coercion failure.
    pub fn from_raw(columns: &[Column], raw: Vec<RawValue>, shape: RowShape) -> DbResult<Self> {
        if columns.len() != raw.len() {
            return Err(DbError::new(
                ffi::SQLITE_MISMATCH,
                format!("row has {} values for {} columns", raw.len(), columns.len()),
            ));
        }
        let decoded = columns.iter().zip(raw).map(|(column, value)| {
            coerce::decode(value, column).map(|v| (column.name().to_string(), v))
        });
        match shape {
            RowShape::Pairs => decoded.collect::<DbResult<Vec<_>>>().map(Self::Pairs),
            RowShape::Map => decoded.collect::<DbResult<HashMap<_, _>>>().map(Self::Map),
        }
    }

    /// Shape of this row.
    #[must_use]
    pub const fn shape(&self) -> RowShape {
        match self {
            Self::Pairs(_) => RowShape::Pairs,
            Self::Map(_) => RowShape::Map,
        }
    }

    /// Looks up a value by column name. For pairs, the last column with that
    /// name wins, matching map semantics.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Pairs(pairs) => pairs.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v),
            Self::Map(map) => map.get(name),
        }
    }

    /// Number of entries (columns for pairs, distinct names for maps).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Pairs(pairs) => pairs.len(),
            Self::Map(map) => map.len(),
        }
    }

    /// `true` for a row with no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered pairs; a map row yields its entries in arbitrary order.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        match self {
            Self::Pairs(pairs) => pairs,
            Self::Map(map) => map.into_iter().collect(),
        }
    }

    /// Name-to-value map; later duplicate names overwrite earlier ones.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, Value> {
        match self {
            Self::Pairs(pairs) => pairs.into_iter().collect(),
            Self::Map(map) => map,
        }
    }
}

/// Decodes every raw row, preserving row order.
///
/// Pure: no I/O, no shared state.
///
/// # Errors
///
/// Propagates the first arity mismatch or column coercion failure.
pub fn materialize(
    columns: &[Column],
    raw_rows: Vec<Vec<RawValue>>,
    shape: RowShape,
) -> DbResult<Vec<Row>> {
    raw_rows
        .into_iter()
        .map(|raw| Row::from_raw(columns, raw, shape))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::temporal::Date;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", Some("INTEGER")),
            Column::new("born", Some("DATE")),
            Column::new("active", Some("BOOLEAN")),
        ]
    }

    fn raw_rows() -> Vec<Vec<RawValue>> {
        vec![
            vec![
                RawValue::Integer(1),
                RawValue::Text("1988-02-14".into()),
                RawValue::Integer(1),
            ],
            vec![RawValue::Integer(2), RawValue::Null, RawValue::Integer(0)],
        ]
    }

    #[test]
    fn pairs_preserve_column_and_row_order() {
        let rows = materialize(&columns(), raw_rows(), RowShape::Pairs).expect("materialize");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            Row::Pairs(vec![
                ("id".into(), Value::Integer(1)),
                ("born".into(), Value::Date(Date::new(1988, 2, 14))),
                ("active".into(), Value::Boolean(true)),
            ])
        );
        assert_eq!(rows[1].get("born"), Some(&Value::Null));
        assert_eq!(rows[1].get("active"), Some(&Value::Boolean(false)));
    }

    #[test]
    fn shapes_hold_the_same_associations() {
        let pairs = materialize(&columns(), raw_rows(), RowShape::Pairs).expect("pairs");
        let maps = materialize(&columns(), raw_rows(), RowShape::Map).expect("maps");
        for (p, m) in pairs.into_iter().zip(maps) {
            assert_eq!(m.shape(), RowShape::Map);
            assert_eq!(p.into_map(), m.into_map());
        }
    }

    #[test]
    fn map_duplicate_names_keep_the_last_column() {
        let columns = vec![Column::new("x", None), Column::new("x", None)];
        let raw = vec![RawValue::Integer(1), RawValue::Integer(2)];
        let row = Row::from_raw(&columns, raw.clone(), RowShape::Map).expect("row");
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("x"), Some(&Value::Integer(2)));

        let pairs = Row::from_raw(&columns, raw, RowShape::Pairs).expect("row");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.get("x"), Some(&Value::Integer(2)));
    }

    #[test]
    fn coercion_failure_aborts_materialization() {
        let rows = vec![vec![
            RawValue::Integer(1),
            RawValue::Text("yesterday".into()),
            RawValue::Integer(1),
        ]];
        assert!(materialize(&columns(), rows, RowShape::Pairs).is_err());
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let short = vec![RawValue::Integer(1)];
        let err = Row::from_raw(&columns(), short, RowShape::Pairs).expect_err("short row");
        assert_eq!(err.category(), Some(ErrorCategory::Binding));

        let mut long = raw_rows();
        long[1].push(RawValue::Integer(9));
        assert!(materialize(&columns(), long, RowShape::Map).is_err());
    }

    #[test]
    fn empty_input_yields_no_rows() {
        let rows = materialize(&columns(), Vec::new(), RowShape::Map).expect("materialize");
        assert!(rows.is_empty());
    }
}

//! Translation between host [`Value`]s and engine [`RawValue`]s.
//!
//! Outbound (`encode`) runs before binding and is infallible. Inbound
//! (`decode`) runs per column after fetching and uses only that column's
//! [`ColumnType`]. Text that a temporal or decimal column cannot parse is an
//! error, never a silent passthrough.

use crate::column::{Column, ColumnType};
use crate::decimal::Decimal;
use crate::error::{DbError, DbResult};
use crate::temporal::{Date, DateTime, Time};
use crate::value::{RawValue, Value};

/// Converts a host value into the primitive the engine binds.
///
/// | Input | Bound as |
/// |---|---|
/// | `Null` | NULL |
/// | `Boolean` | integer 1 / 0 |
/// | `Date` | text `YYYY-MM-DD` |
/// | `Time` | text `HH:MM:SS.FFFFFF` |
/// | `DateTime` | text `YYYY-MM-DD HH:MM:SS.FFFFFF` |
/// | `Decimal` | nearest float |
/// | other | unchanged |
#[must_use]
pub fn encode(value: &Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Boolean(b) => RawValue::Integer(i64::from(*b)),
        Value::Integer(v) => RawValue::Integer(*v),
        Value::Float(v) => RawValue::Float(*v),
        Value::Text(v) => RawValue::Text(v.clone()),
        Value::Blob(v) => RawValue::Blob(v.clone()),
        Value::Date(d) => RawValue::Text(d.to_string()),
        Value::Time(t) => RawValue::Text(t.to_string()),
        Value::DateTime(dt) => RawValue::Text(dt.to_string()),
        Value::Decimal(d) => RawValue::Float(d.to_f64()),
    }
}

/// Converts an engine primitive into a host value according to the
/// column's declared type.
///
/// # Errors
///
/// Returns [`DbError::Coercion`] when text under a date, time, datetime or
/// decimal column does not parse.
pub fn decode(raw: RawValue, column: &Column) -> DbResult<Value> {
    match (column.kind(), raw) {
        (_, RawValue::Null) => Ok(Value::Null),

        (ColumnType::DateTime, RawValue::Text(text)) => DateTime::parse(&text)
            .map(Value::DateTime)
            .ok_or_else(|| coercion_error(column, text)),

        (ColumnType::Date, RawValue::Text(text)) => Date::parse(&text)
            .map(Value::Date)
            .ok_or_else(|| coercion_error(column, text)),

        (ColumnType::Time, RawValue::Text(text)) => Time::parse(&text)
            .map(Value::Time)
            .ok_or_else(|| coercion_error(column, text)),

        (ColumnType::Decimal { scale, .. }, raw) => {
            let decimal = match raw {
                RawValue::Integer(v) => Decimal::from(v),
                RawValue::Float(v) => match Decimal::from_f64(v) {
                    Some(d) => d,
                    None => return Ok(Value::Float(v)),
                },
                RawValue::Text(text) => match text.parse::<Decimal>() {
                    Ok(d) => d,
                    Err(_) => return Err(coercion_error(column, text)),
                },
                other => return Ok(other.into()),
            };
            Ok(Value::Decimal(
                scale.map_or(decimal, |scale| decimal.truncate(scale)),
            ))
        }

        (ColumnType::Boolean, RawValue::Integer(v)) => Ok(Value::Boolean(v != 0)),

        (_, raw) => Ok(raw.into()),
    }
}

fn coercion_error(column: &Column, value: String) -> DbError {
    DbError::Coercion {
        column: column.name().to_string(),
        declared: column.decl_type().unwrap_or_default().to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn col(decl: &str) -> Column {
        Column::new("c", Some(decl))
    }

    #[test]
    fn booleans_bind_as_integers() {
        assert_eq!(encode(&Value::Boolean(true)), RawValue::Integer(1));
        assert_eq!(encode(&Value::Boolean(false)), RawValue::Integer(0));
    }

    #[test]
    fn temporal_values_bind_as_padded_text() {
        assert_eq!(
            encode(&Value::Time(Time::new(1, 20, 0, 666))),
            RawValue::Text("01:20:00.000666".into())
        );
        assert_eq!(
            encode(&Value::Date(Date::new(988, 2, 4))),
            RawValue::Text("0988-02-04".into())
        );
        assert_eq!(
            encode(&Value::DateTime(DateTime::new(
                Date::new(1988, 2, 14),
                Time::new(15, 17, 11, 0)
            ))),
            RawValue::Text("1988-02-14 15:17:11.000000".into())
        );
        assert_eq!(
            Value::Time(Time::new(1, 20, 0, 666)).to_raw(),
            RawValue::Text("01:20:00.000666".into())
        );
    }

    #[test]
    fn decimal_binds_as_float() {
        let raw = encode(&Value::Decimal(Decimal::new(false, 1123, -3)));
        assert_eq!(raw, RawValue::Float(1.123));
    }

    #[test]
    fn other_values_pass_through() {
        assert_eq!(encode(&Value::Null), RawValue::Null);
        assert_eq!(encode(&Value::from("x")), RawValue::Text("x".into()));
        assert_eq!(encode(&Value::from(vec![1u8])), RawValue::Blob(vec![1]));
    }

    #[test_case("1988-02-14 15:17", 0, 0 ; "minutes")]
    #[test_case("1988-02-14 15:17:11", 11, 0 ; "seconds")]
    #[test_case("1988-02-14 15:17:11.123", 11, 123_000 ; "milliseconds")]
    #[test_case("1988-02-14 15:17:11.123456", 11, 123_456 ; "microseconds")]
    fn datetime_formats(text: &str, second: u32, microsecond: u32) {
        let value = decode(RawValue::Text(text.into()), &col("datetime")).expect("decode");
        assert_eq!(
            value,
            Value::DateTime(DateTime::new(
                Date::new(1988, 2, 14),
                Time::new(15, 17, second, microsecond)
            ))
        );
    }

    #[test_case("datetime")]
    #[test_case("date")]
    #[test_case("time")]
    #[test_case("decimal(3,2)")]
    #[test_case("boolean")]
    #[test_case("integer")]
    fn null_decodes_to_null(decl: &str) {
        assert_eq!(decode(RawValue::Null, &col(decl)).expect("decode"), Value::Null);
        assert_eq!(
            decode(RawValue::Null, &Column::new("c", None)).expect("decode"),
            Value::Null
        );
    }

    #[test]
    fn booleans_decode_from_integers() {
        let column = col("BOOLEAN");
        assert_eq!(decode(RawValue::Integer(1), &column).ok(), Some(Value::Boolean(true)));
        assert_eq!(decode(RawValue::Integer(0), &column).ok(), Some(Value::Boolean(false)));
        assert_eq!(decode(RawValue::Integer(-3), &column).ok(), Some(Value::Boolean(true)));
    }

    #[test]
    fn unrecognized_tags_pass_through() {
        assert_eq!(
            decode(RawValue::Integer(42), &col("integer")).ok(),
            Some(Value::Integer(42))
        );
        assert_eq!(
            decode(RawValue::Text("2024-01-01".into()), &col("text")).ok(),
            Some(Value::Text("2024-01-01".into()))
        );
    }

    #[test]
    fn decimal_truncates_to_declared_scale() {
        let column = col("DECIMAL(3,2)");
        assert_eq!(
            decode(RawValue::Float(1.123), &column).ok(),
            Some(Value::Decimal(Decimal::new(false, 112, -2)))
        );
        assert_eq!(
            decode(RawValue::Integer(7), &column).ok(),
            Some(Value::Decimal(Decimal::from(7)))
        );
        assert_eq!(
            decode(RawValue::Text("-2.509".into()), &column).ok(),
            Some(Value::Decimal(Decimal::new(true, 250, -2)))
        );
    }

    #[test]
    fn unparseable_text_is_an_error() {
        for decl in ["datetime", "date", "time", "decimal"] {
            let err = decode(RawValue::Text("not a value".into()), &col(decl))
                .expect_err("should fail");
            match err {
                DbError::Coercion {
                    column,
                    declared,
                    value,
                } => {
                    assert_eq!(column, "c");
                    assert_eq!(declared, decl);
                    assert_eq!(value, "not a value");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn non_text_under_temporal_tags_passes_through() {
        assert_eq!(
            decode(RawValue::Integer(1_700_000_000), &col("datetime")).ok(),
            Some(Value::Integer(1_700_000_000))
        );
    }

    #[test]
    fn date_round_trip() {
        for (y, m, d) in [(0, 1, 1), (1999, 12, 31), (2024, 2, 30), (9999, 1, 31)] {
            let date = Date::new(y, m, d);
            let raw = encode(&Value::Date(date));
            assert_eq!(decode(raw, &col("date")).ok(), Some(Value::Date(date)));
        }
    }
}

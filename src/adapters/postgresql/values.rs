//! Conversion between PostgreSQL rows and driver-independent values

use crate::adapters::database::traits::{SqlParam, SqlRow, SqlValue};
use crate::adapters::postgresql::ewkb;
use crate::domain::errors::DatabaseError;
use crate::domain::geometry::Geometry;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::Row;

type BoxError = Box<dyn Error + Sync + Send>;

/// PostGIS geometry decoded from EWKB
struct PostGisGeometry(Geometry);

impl<'a> FromSql<'a> for PostGisGeometry {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(PostGisGeometry(ewkb::decode(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "geometry"
    }
}

/// NUMERIC decoded to its exact decimal text
struct PgNumeric(String);

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode_numeric(raw).map(PgNumeric).map_err(Into::into)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Decodes the binary NUMERIC wire format into decimal text
///
/// The header is `ndigits`, `weight`, `sign`, `dscale`, followed by base-10000
/// digits. Digit `i` is worth `10000^(weight - i)`; the text carries exactly
/// `dscale` fractional digits.
fn decode_numeric(raw: &[u8]) -> Result<String, DatabaseError> {
    let word = |i: usize| -> Result<u16, DatabaseError> {
        raw.get(i * 2..i * 2 + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| DatabaseError::Decode("NUMERIC value truncated".to_string()))
    };

    let ndigits = word(0)? as usize;
    let weight = word(1)? as i16 as i64;
    let sign = word(2)?;
    let dscale = word(3)? as usize;

    match sign {
        NUMERIC_POS | NUMERIC_NEG => {}
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        other => {
            return Err(DatabaseError::Decode(format!(
                "Invalid NUMERIC sign {other:#06x}"
            )))
        }
    }

    let digits = (0..ndigits)
        .map(|i| word(4 + i))
        .collect::<Result<Vec<_>, _>>()?;
    let digit = |i: i64| -> u16 {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == NUMERIC_NEG {
        text.push('-');
    }

    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit(0).to_string());
        for i in 1..=weight {
            text.push_str(&format!("{:04}", digit(i)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut i = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(i)));
            i += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }

    Ok(text)
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>, DatabaseError> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| DatabaseError::Decode(format!("Column {idx}: {e}")))
}

fn decode_column(row: &Row, idx: usize) -> Result<SqlValue, DatabaseError> {
    let ty = row.columns()[idx].type_();

    let value = if *ty == Type::BOOL {
        get::<bool>(row, idx)?.map(SqlValue::Bool)
    } else if *ty == Type::INT2 {
        get::<i16>(row, idx)?.map(|v| SqlValue::Int(v as i64))
    } else if *ty == Type::INT4 {
        get::<i32>(row, idx)?.map(|v| SqlValue::Int(v as i64))
    } else if *ty == Type::INT8 {
        get::<i64>(row, idx)?.map(SqlValue::Int)
    } else if *ty == Type::FLOAT4 {
        get::<f32>(row, idx)?.map(|v| SqlValue::Float(v as f64))
    } else if *ty == Type::FLOAT8 {
        get::<f64>(row, idx)?.map(SqlValue::Float)
    } else if *ty == Type::NUMERIC {
        get::<PgNumeric>(row, idx)?.map(|v| SqlValue::Numeric(v.0))
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        get::<String>(row, idx)?.map(SqlValue::Text)
    } else if *ty == Type::DATE {
        get::<NaiveDate>(row, idx)?.map(SqlValue::Date)
    } else if *ty == Type::TIMESTAMP {
        get::<NaiveDateTime>(row, idx)?.map(|v| SqlValue::Timestamp(v.and_utc()))
    } else if *ty == Type::TIMESTAMPTZ {
        get::<DateTime<Utc>>(row, idx)?.map(SqlValue::Timestamp)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        get::<serde_json::Value>(row, idx)?.map(|v| SqlValue::Text(v.to_string()))
    } else if PostGisGeometry::accepts(ty) {
        get::<PostGisGeometry>(row, idx)?.map(|g| SqlValue::Geometry(g.0))
    } else {
        tracing::debug!(column = idx, pg_type = %ty.name(), "Unsupported column type, returning NULL");
        None
    };

    Ok(value.unwrap_or(SqlValue::Null))
}

/// Converts a driver row into a `SqlRow`
pub fn decode_row(row: &Row) -> Result<SqlRow, DatabaseError> {
    (0..row.len())
        .map(|idx| decode_column(row, idx))
        .collect::<Result<Vec<_>, _>>()
        .map(SqlRow::new)
}

/// Converts a parameter to the type the server inferred for it
pub fn encode_param(
    param: &SqlParam,
    ty: &Type,
) -> Result<Box<dyn ToSql + Sync + Send>, DatabaseError> {
    let mismatch = || {
        DatabaseError::Query(format!(
            "Parameter {param:?} does not fit server type {}",
            ty.name()
        ))
    };

    let encoded: Box<dyn ToSql + Sync + Send> = match param {
        SqlParam::Int(v) if *ty == Type::INT2 => {
            Box::new(i16::try_from(*v).map_err(|_| mismatch())?)
        }
        SqlParam::Int(v) if *ty == Type::INT4 => {
            Box::new(i32::try_from(*v).map_err(|_| mismatch())?)
        }
        SqlParam::Int(v) if *ty == Type::INT8 => Box::new(*v),
        SqlParam::Int(v) if *ty == Type::FLOAT8 => Box::new(*v as f64),
        SqlParam::Float(v) if *ty == Type::FLOAT8 => Box::new(*v),
        SqlParam::Float(v) if *ty == Type::FLOAT4 => Box::new(*v as f32),
        SqlParam::Text(v) if [Type::TEXT, Type::VARCHAR, Type::BPCHAR].contains(ty) => {
            Box::new(v.clone())
        }
        SqlParam::IntArray(v) if *ty == Type::INT4_ARRAY => Box::new(v.clone()),
        SqlParam::IntArray(v) if *ty == Type::INT8_ARRAY => {
            Box::new(v.iter().map(|i| *i as i64).collect::<Vec<i64>>())
        }
        _ => return Err(mismatch()),
    };

    Ok(encoded)
}

//! Extended well-known binary decoding
//!
//! PostGIS sends `geometry` columns as EWKB in binary result format. Only the
//! ordinates and part structure are needed downstream, so decoding flattens
//! every coordinate into one array and records vertex counts per part.

use crate::domain::errors::DatabaseError;
use crate::domain::geometry::{Geometry, GeometryKind};

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;
const EWKB_FLAGS: u32 = EWKB_Z | EWKB_M | EWKB_SRID;

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], DatabaseError> {
        let end = self.pos + N;
        let slice = self.buf.get(self.pos..end).ok_or_else(|| {
            DatabaseError::Decode(format!("EWKB truncated at byte {}", self.pos))
        })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, DatabaseError> {
        Ok(self.take::<1>()?[0])
    }

    fn read_u32(&mut self, little_endian: bool) -> Result<u32, DatabaseError> {
        let bytes = self.take::<4>()?;
        Ok(if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn read_f64(&mut self, little_endian: bool) -> Result<f64, DatabaseError> {
        let bytes = self.take::<8>()?;
        Ok(if little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }
}

struct Header {
    little_endian: bool,
    kind: GeometryKind,
    dimension: u8,
    srid: Option<i32>,
}

fn read_header(cur: &mut Cursor<'_>) -> Result<Header, DatabaseError> {
    let little_endian = match cur.read_u8()? {
        0 => false,
        1 => true,
        other => {
            return Err(DatabaseError::Decode(format!(
                "Invalid EWKB byte order marker {other}"
            )))
        }
    };
    let raw_type = cur.read_u32(little_endian)?;
    let mut has_z = raw_type & EWKB_Z != 0;
    let mut has_m = raw_type & EWKB_M != 0;
    let mut base = raw_type & !EWKB_FLAGS;

    // ISO WKB encodes dimensionality in the thousands
    if base >= 1000 {
        match base / 1000 {
            1 => has_z = true,
            2 => has_m = true,
            3 => {
                has_z = true;
                has_m = true;
            }
            _ => {}
        }
        base %= 1000;
    }

    let srid = if raw_type & EWKB_SRID != 0 {
        Some(cur.read_u32(little_endian)? as i32)
    } else {
        None
    };

    let kind = match base {
        1 => GeometryKind::Point,
        2 => GeometryKind::LineString,
        3 => GeometryKind::Polygon,
        4 => GeometryKind::MultiPoint,
        5 => GeometryKind::MultiLineString,
        6 => GeometryKind::MultiPolygon,
        7 => GeometryKind::Collection,
        other => {
            return Err(DatabaseError::Decode(format!(
                "Unsupported EWKB geometry type {other}"
            )))
        }
    };

    Ok(Header {
        little_endian,
        kind,
        dimension: 2 + has_z as u8 + has_m as u8,
        srid,
    })
}

fn read_points(
    cur: &mut Cursor<'_>,
    header: &Header,
    count: usize,
    ordinates: &mut Vec<f64>,
) -> Result<(), DatabaseError> {
    for _ in 0..count * header.dimension as usize {
        ordinates.push(cur.read_f64(header.little_endian)?);
    }
    Ok(())
}

fn read_body(
    cur: &mut Cursor<'_>,
    header: &Header,
    ordinates: &mut Vec<f64>,
    parts: &mut Vec<usize>,
) -> Result<(), DatabaseError> {
    match header.kind {
        GeometryKind::Point => {
            read_points(cur, header, 1, ordinates)?;
            parts.push(1);
        }
        GeometryKind::LineString => {
            let n = cur.read_u32(header.little_endian)? as usize;
            read_points(cur, header, n, ordinates)?;
            parts.push(n);
        }
        GeometryKind::Polygon => {
            let rings = cur.read_u32(header.little_endian)?;
            for _ in 0..rings {
                let n = cur.read_u32(header.little_endian)? as usize;
                read_points(cur, header, n, ordinates)?;
                parts.push(n);
            }
        }
        GeometryKind::MultiPoint
        | GeometryKind::MultiLineString
        | GeometryKind::MultiPolygon
        | GeometryKind::Collection => {
            let members = cur.read_u32(header.little_endian)?;
            for _ in 0..members {
                let inner = read_header(cur)?;
                if inner.dimension != header.dimension {
                    return Err(DatabaseError::Decode(
                        "Mixed dimensions inside EWKB collection".to_string(),
                    ));
                }
                read_body(cur, &inner, ordinates, parts)?;
            }
        }
    }
    Ok(())
}

/// Decodes an EWKB (or ISO WKB) byte string
///
/// # Errors
///
/// Returns `DatabaseError::Decode` for truncated input, unknown geometry types
/// or trailing bytes.
pub fn decode(bytes: &[u8]) -> Result<Geometry, DatabaseError> {
    let mut cur = Cursor { buf: bytes, pos: 0 };
    let header = read_header(&mut cur)?;
    let mut ordinates = Vec::new();
    let mut parts = Vec::new();
    read_body(&mut cur, &header, &mut ordinates, &mut parts)?;

    if cur.pos != bytes.len() {
        return Err(DatabaseError::Decode(format!(
            "{} trailing bytes after EWKB geometry",
            bytes.len() - cur.pos
        )));
    }

    Ok(Geometry {
        kind: header.kind,
        srid: header.srid,
        dimension: header.dimension,
        ordinates,
        parts,
    })
}

/// Decodes the hex form PostGIS uses in text output
pub fn decode_hex(hex: &str) -> Result<Geometry, DatabaseError> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(DatabaseError::Decode("Odd-length EWKB hex string".to_string()));
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| DatabaseError::Decode(format!("Invalid EWKB hex: {e}")))?;
    decode(&bytes)
}

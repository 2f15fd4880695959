//! Iceberg single-value binary encoding.
//!
//! Partition summary bounds in manifest lists are stored in Iceberg's binary
//! single-value serialization: little-endian numerics, UTF-8 strings, and
//! big-endian two's complement decimals.
//! See: https://iceberg.apache.org/spec/#appendix-d-single-value-serialization

use base64::prelude::*;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta};

use crate::error::{IcebergError, Result};
use crate::types::PrimitiveType;

/// A value decoded from Iceberg's binary encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Days since 1970-01-01
    Date(i32),
    /// Microseconds since midnight
    Time(i64),
    /// Microseconds since epoch (no zone)
    Timestamp(i64),
    /// Microseconds since epoch (UTC)
    TimestampTz(i64),
    String(String),
    Bytes(Vec<u8>),
    Uuid([u8; 16]),
    Decimal {
        unscaled: i128,
        precision: u8,
        scale: u8,
    },
}

impl TypedValue {
    /// Render the value the way Iceberg metadata tables display it.
    pub fn to_human_string(&self) -> String {
        match self {
            TypedValue::Boolean(v) => v.to_string(),
            TypedValue::Int32(v) => v.to_string(),
            TypedValue::Int64(v) => v.to_string(),
            TypedValue::Float32(v) => v.to_string(),
            TypedValue::Float64(v) => v.to_string(),
            TypedValue::Date(days) => human_date(*days),
            TypedValue::Time(micros) => human_time(*micros),
            TypedValue::Timestamp(micros) => human_timestamp(*micros),
            TypedValue::TimestampTz(micros) => format!("{}+00:00", human_timestamp(*micros)),
            TypedValue::String(v) => v.clone(),
            TypedValue::Bytes(v) => BASE64_STANDARD.encode(v),
            TypedValue::Uuid(v) => human_uuid(v),
            TypedValue::Decimal {
                unscaled, scale, ..
            } => human_decimal(*unscaled, *scale),
        }
    }
}

/// ISO-8601 date for days since epoch.
pub(crate) fn human_date(days: i32) -> String {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(TimeDelta::days(days as i64)))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| days.to_string())
}

fn human_time(micros: i64) -> String {
    let secs = micros.div_euclid(1_000_000);
    let nanos = micros.rem_euclid(1_000_000) * 1_000;
    u32::try_from(secs)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos as u32))
        .map(|t| t.format("%H:%M:%S%.f").to_string())
        .unwrap_or_else(|| micros.to_string())
}

fn human_timestamp(micros: i64) -> String {
    DateTime::from_timestamp_micros(micros)
        .map(|ts| ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        .unwrap_or_else(|| micros.to_string())
}

fn human_uuid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

fn human_decimal(unscaled: i128, scale: u8) -> String {
    if scale == 0 {
        return unscaled.to_string();
    }
    let digits = unscaled.unsigned_abs().to_string();
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let sign = if unscaled < 0 { "-" } else { "" };
    format!("{}{}.{}", sign, int_part, frac_part)
}

fn fixed<const N: usize>(bytes: &[u8], type_name: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        IcebergError::manifest(format!(
            "Invalid {} bytes length: expected {}, got {}",
            type_name,
            N,
            bytes.len()
        ))
    })
}

/// Decode Iceberg-encoded bytes for a primitive type.
pub fn decode_value(bytes: &[u8], ty: &PrimitiveType) -> Result<TypedValue> {
    let value = match ty {
        PrimitiveType::Boolean => {
            let first = bytes
                .first()
                .ok_or_else(|| IcebergError::manifest("Empty bytes for boolean"))?;
            TypedValue::Boolean(*first != 0)
        }
        PrimitiveType::Int => TypedValue::Int32(i32::from_le_bytes(fixed(bytes, "int")?)),
        PrimitiveType::Long => TypedValue::Int64(i64::from_le_bytes(fixed(bytes, "long")?)),
        PrimitiveType::Float => TypedValue::Float32(f32::from_le_bytes(fixed(bytes, "float")?)),
        PrimitiveType::Double => {
            TypedValue::Float64(f64::from_le_bytes(fixed(bytes, "double")?))
        }
        PrimitiveType::Date => TypedValue::Date(i32::from_le_bytes(fixed(bytes, "date")?)),
        PrimitiveType::Time => TypedValue::Time(i64::from_le_bytes(fixed(bytes, "time")?)),
        PrimitiveType::Timestamp => {
            TypedValue::Timestamp(i64::from_le_bytes(fixed(bytes, "timestamp")?))
        }
        PrimitiveType::Timestamptz => {
            TypedValue::TimestampTz(i64::from_le_bytes(fixed(bytes, "timestamptz")?))
        }
        PrimitiveType::String => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| IcebergError::manifest(format!("Invalid UTF-8 in string: {}", e)))?;
            TypedValue::String(s.to_string())
        }
        PrimitiveType::Uuid => TypedValue::Uuid(fixed(bytes, "uuid")?),
        PrimitiveType::Fixed(_) | PrimitiveType::Binary => TypedValue::Bytes(bytes.to_vec()),
        PrimitiveType::Decimal { precision, scale } => TypedValue::Decimal {
            unscaled: decode_decimal_bytes(bytes)?,
            precision: *precision,
            scale: *scale,
        },
    };
    Ok(value)
}

/// Decode decimal bytes (big-endian two's complement) to i128.
fn decode_decimal_bytes(bytes: &[u8]) -> Result<i128> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 16 {
        return Err(IcebergError::manifest(format!(
            "Decimal too large: {} bytes (max 16)",
            bytes.len()
        )));
    }

    // Sign-extend to 16 bytes
    let is_negative = (bytes[0] & 0x80) != 0;
    let mut padded = if is_negative { [0xFF; 16] } else { [0x00; 16] };
    let start = 16 - bytes.len();
    padded[start..].copy_from_slice(bytes);

    Ok(i128::from_be_bytes(padded))
}

/// Encode a typed value to Iceberg binary format.
///
/// Used to build manifest-list fixtures.
pub fn encode_value(value: &TypedValue) -> Vec<u8> {
    match value {
        TypedValue::Boolean(v) => vec![u8::from(*v)],
        TypedValue::Int32(v) | TypedValue::Date(v) => v.to_le_bytes().to_vec(),
        TypedValue::Int64(v)
        | TypedValue::Time(v)
        | TypedValue::Timestamp(v)
        | TypedValue::TimestampTz(v) => v.to_le_bytes().to_vec(),
        TypedValue::Float32(v) => v.to_le_bytes().to_vec(),
        TypedValue::Float64(v) => v.to_le_bytes().to_vec(),
        TypedValue::String(v) => v.as_bytes().to_vec(),
        TypedValue::Bytes(v) => v.clone(),
        TypedValue::Uuid(v) => v.to_vec(),
        TypedValue::Decimal { unscaled, .. } => {
            // Minimal big-endian two's complement
            let bytes = unscaled.to_be_bytes();
            let sign_byte = if *unscaled < 0 { 0xFF } else { 0x00 };
            let mut start = 0;
            while start < bytes.len() - 1
                && bytes[start] == sign_byte
                && (bytes[start + 1] & 0x80) == (sign_byte & 0x80)
            {
                start += 1;
            }
            bytes[start..].to_vec()
        }
    }
}

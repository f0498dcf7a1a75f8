//! Value coercion: turning a raw token into the semantic type of a
//! destination.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

/// Date profile accepted for [`ValueType::Date`] (ISO-8601 calendar date).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// ValueType
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    Date,
    /// Closed set of members, matched exactly and case-sensitively.
    Enum(Vec<String>),
    String,
}

impl ValueType {
    pub fn enumeration<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueType::Enum(members.into_iter().map(Into::into).collect())
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ValueType::Bool)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "boolean"),
            ValueType::I8 => write!(f, "8-bit integer"),
            ValueType::I16 => write!(f, "16-bit integer"),
            ValueType::I32 => write!(f, "32-bit integer"),
            ValueType::I64 => write!(f, "64-bit integer"),
            ValueType::U8 => write!(f, "unsigned 8-bit integer"),
            ValueType::U16 => write!(f, "unsigned 16-bit integer"),
            ValueType::U32 => write!(f, "unsigned 32-bit integer"),
            ValueType::U64 => write!(f, "unsigned 64-bit integer"),
            ValueType::F32 | ValueType::F64 => write!(f, "number"),
            ValueType::Decimal => write!(f, "decimal"),
            ValueType::Date => write!(f, "date (YYYY-MM-DD)"),
            ValueType::Enum(members) => write!(f, "one of {}", members.join("|")),
            ValueType::String => write!(f, "string"),
        }
    }
}

// ============================================================================
// Value
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    Enum(String),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Enum(s) | Value::Str(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// Decimal
// ============================================================================

/// Arbitrary-precision decimal: `(-1)^negative * digits * 10^-scale`.
///
/// Leading zeros of the unscaled digits are stripped, the scale is kept as
/// written, so `1.50` and `1.5` are different values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    digits: String,
    scale: i64,
}

impl Decimal {
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Unscaled digits, never empty, without leading zeros.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }
}

/// Largest magnitude accepted for a decimal's scale. Anything beyond it is
/// rejected rather than expanded digit by digit on display.
pub const MAX_DECIMAL_SCALE: i64 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError;

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal")
    }
}

impl std::error::Error for ParseDecimalError {}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(pos) => {
                let exp = rest[pos + 1..]
                    .parse::<i64>()
                    .map_err(|_| ParseDecimalError)?;
                (&rest[..pos], exp)
            }
            None => (rest, 0),
        };

        let (int_part, frac_part) = match mantissa.find('.') {
            Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseDecimalError);
        }
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(ParseDecimalError);
        }

        let frac_len = i64::try_from(frac_part.len()).map_err(|_| ParseDecimalError)?;
        let scale = frac_len
            .checked_sub(exponent)
            .filter(|scale| scale.abs() <= MAX_DECIMAL_SCALE)
            .ok_or(ParseDecimalError)?;

        let joined = format!("{}{}", int_part, frac_part);
        let trimmed = joined.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };

        Ok(Decimal {
            negative: negative && digits != "0",
            digits: digits.to_string(),
            scale,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        if self.scale <= 0 {
            write!(f, "{}", self.digits)?;
            if self.digits == "0" {
                return Ok(());
            }
            for _ in 0..self.scale.unsigned_abs() {
                write!(f, "0")?;
            }
            return Ok(());
        }
        let scale = usize::try_from(self.scale).map_err(|_| fmt::Error)?;
        if self.digits.len() > scale {
            let (int_part, frac_part) = self.digits.split_at(self.digits.len() - scale);
            write!(f, "{}.{}", int_part, frac_part)
        } else {
            write!(f, "0.")?;
            for _ in 0..scale - self.digits.len() {
                write!(f, "0")?;
            }
            write!(f, "{}", self.digits)
        }
    }
}

// ============================================================================
// Coercion
// ============================================================================

/// A raw token that could not be turned into the destination's type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{raw}` is not a valid {expected} for {destination}")]
pub struct CoercionError {
    pub raw: String,
    pub destination: String,
    pub expected: String,
}

/// Convert `raw` into a [`Value`] of type `value_type`. `destination` only
/// feeds the error.
pub fn coerce(raw: &str, value_type: &ValueType, destination: &str) -> Result<Value, CoercionError> {
    let fail = || CoercionError {
        raw: raw.to_string(),
        destination: destination.to_string(),
        expected: value_type.to_string(),
    };

    let value = match value_type {
        ValueType::Bool => {
            if raw.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if raw.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                return Err(fail());
            }
        }
        ValueType::I8 => Value::Int(raw.parse::<i8>().map_err(|_| fail())?.into()),
        ValueType::I16 => Value::Int(raw.parse::<i16>().map_err(|_| fail())?.into()),
        ValueType::I32 => Value::Int(raw.parse::<i32>().map_err(|_| fail())?.into()),
        ValueType::I64 => Value::Int(raw.parse::<i64>().map_err(|_| fail())?),
        ValueType::U8 => Value::UInt(raw.parse::<u8>().map_err(|_| fail())?.into()),
        ValueType::U16 => Value::UInt(raw.parse::<u16>().map_err(|_| fail())?.into()),
        ValueType::U32 => Value::UInt(raw.parse::<u32>().map_err(|_| fail())?.into()),
        ValueType::U64 => Value::UInt(raw.parse::<u64>().map_err(|_| fail())?),
        ValueType::F32 => Value::Float(raw.parse::<f32>().map_err(|_| fail())?.into()),
        ValueType::F64 => Value::Float(raw.parse::<f64>().map_err(|_| fail())?),
        ValueType::Decimal => Value::Decimal(raw.parse().map_err(|_| fail())?),
        ValueType::Date => {
            Value::Date(NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| fail())?)
        }
        ValueType::Enum(members) => {
            if !members.iter().any(|m| m == raw) {
                return Err(fail());
            }
            Value::Enum(raw.to_string())
        }
        ValueType::String => Value::Str(raw.to_string()),
    };
    Ok(value)
}

// ============================================================================
// FromValue
// ============================================================================

/// Conversion out of a parsed [`Value`], used by [`Values::get`](crate::Values::get).
pub trait FromValue: Sized {
    fn from_value(v: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

macro_rules! from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(v: &Value) -> Option<Self> {
                    match v {
                        Value::Int(n) => <$t>::try_from(*n).ok(),
                        Value::UInt(n) => <$t>::try_from(*n).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Float(x) => Some(*x as f32),
            _ => None,
        }
    }
}

impl FromValue for Decimal {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Decimal(d) => Some(d.clone()),
            _ => None,
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Str(s) | Value::Enum(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Value {
    fn from_value(v: &Value) -> Option<Self> {
        Some(v.clone())
    }
}

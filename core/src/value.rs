//! The decoded value of a data element.
//!
//! A [`Value`] variant is fixed once the value representation is known:
//! text VRs hold a string, numeric VRs hold a small vector of numbers,
//! binary VRs hold opaque bytes, and sequences hold items or pixel fragments.
//! Conversions into other types go through explicit accessors
//! which fail with a [`ConvertValueError`] on mismatch.

use crate::element::{Fragment, Item};
use crate::header::{Tag, VrKind, VR};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use num_traits::NumCast;
use smallvec::SmallVec;
use snafu::Snafu;
use std::borrow::Cow;
use std::fmt;

/// Storage for the numbers of a multi-valued element.
/// Most elements have a single value,
/// so two values are kept inline.
pub type C<T> = SmallVec<[T; 2]>;

/// The kind of a value, for error reporting.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ValueType {
    Empty,
    Str,
    Tags,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Bytes,
    Sequence,
    PixelSequence,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error raised when a value cannot be converted to the requested type.
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum ConvertValueError {
    /// the value is of a type that cannot be converted
    #[snafu(display("cannot convert {} value to {}", original, requested))]
    Mismatch {
        requested: &'static str,
        original: ValueType,
    },
    /// the value has no content
    #[snafu(display("cannot convert empty value to {}", requested))]
    NoValue { requested: &'static str },
    /// the textual value could not be parsed
    #[snafu(display("cannot parse {:?} as {}", value, requested))]
    Parse {
        requested: &'static str,
        value: String,
    },
    /// the number does not fit the requested type
    #[snafu(display("value out of range for {}", requested))]
    OutOfRange { requested: &'static str },
}

/// Error raised when a value is not compatible with
/// the value representation of the element receiving it.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(display("{} value is not compatible with VR {}", original, vr))]
pub struct IncompatibleValueError {
    pub vr: VR,
    pub original: ValueType,
}

/// A data element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value (zero length)
    Empty,
    /// Text, including any `\` separators and padding
    Str(String),
    /// Attribute tags (AT)
    Tags(C<Tag>),
    /// Unsigned 16-bit integers (US)
    U16(C<u16>),
    /// Signed 16-bit integers (SS)
    I16(C<i16>),
    /// Unsigned 32-bit integers (UL)
    U32(C<u32>),
    /// Signed 32-bit integers (SL)
    I32(C<i32>),
    /// Unsigned 64-bit integers (UV)
    U64(C<u64>),
    /// Signed 64-bit integers (SV)
    I64(C<i64>),
    /// Single precision floats (FL)
    F32(C<f32>),
    /// Double precision floats (FD)
    F64(C<f64>),
    /// Opaque bytes (OB, OW, UN, ...)
    Bytes(Vec<u8>),
    /// Items of a sequence
    Sequence(Vec<Item>),
    /// Fragments of encapsulated pixel data
    PixelSequence(Vec<Fragment>),
}

macro_rules! impl_from_number {
    ($t: ty, $variant: ident) => {
        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::$variant(smallvec::smallvec![value])
            }
        }
    };
}

impl_from_number!(u16, U16);
impl_from_number!(i16, I16);
impl_from_number!(u32, U32);
impl_from_number!(i32, I32);
impl_from_number!(u64, U64);
impl_from_number!(i64, I64);
impl_from_number!(f32, F32);
impl_from_number!(f64, F64);
impl_from_number!(Tag, Tags);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Item>> for Value {
    fn from(value: Vec<Item>) -> Self {
        Value::Sequence(value)
    }
}

impl Value {
    /// The kind of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Empty => ValueType::Empty,
            Value::Str(_) => ValueType::Str,
            Value::Tags(_) => ValueType::Tags,
            Value::U16(_) => ValueType::U16,
            Value::I16(_) => ValueType::I16,
            Value::U32(_) => ValueType::U32,
            Value::I32(_) => ValueType::I32,
            Value::U64(_) => ValueType::U64,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Sequence(_) => ValueType::Sequence,
            Value::PixelSequence(_) => ValueType::PixelSequence,
        }
    }

    /// The number of bytes this value takes once encoded,
    /// or `None` for sequences, whose size depends on the encoding.
    pub fn byte_len(&self) -> Option<usize> {
        Some(match self {
            Value::Empty => 0,
            Value::Str(s) => s.len(),
            Value::Tags(v) => v.len() * 4,
            Value::U16(v) => v.len() * 2,
            Value::I16(v) => v.len() * 2,
            Value::U32(v) => v.len() * 4,
            Value::I32(v) => v.len() * 4,
            Value::U64(v) => v.len() * 8,
            Value::I64(v) => v.len() * 8,
            Value::F32(v) => v.len() * 4,
            Value::F64(v) => v.len() * 8,
            Value::Bytes(v) => v.len(),
            Value::Sequence(_) | Value::PixelSequence(_) => return None,
        })
    }

    /// The number of individual values held.
    pub fn multiplicity(&self) -> usize {
        match self {
            Value::Empty => 0,
            Value::Str(s) => s.split('\\').count(),
            Value::Tags(v) => v.len(),
            Value::U16(v) => v.len(),
            Value::I16(v) => v.len(),
            Value::U32(v) => v.len(),
            Value::I32(v) => v.len(),
            Value::U64(v) => v.len(),
            Value::I64(v) => v.len(),
            Value::F32(v) => v.len(),
            Value::F64(v) => v.len(),
            Value::Bytes(_) => 1,
            Value::Sequence(v) => v.len(),
            Value::PixelSequence(v) => v.len(),
        }
    }

    /// Obtain the value as text,
    /// without trailing padding.
    /// Numbers are joined with `\`.
    pub fn to_str(&self) -> Result<Cow<'_, str>, ConvertValueError> {
        match self {
            Value::Empty => Ok(Cow::Borrowed("")),
            Value::Str(s) => Ok(Cow::Borrowed(trim_padding(s))),
            Value::Tags(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            Value::U16(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            Value::I16(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            Value::U32(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            Value::I32(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            Value::U64(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            Value::I64(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            Value::F32(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            Value::F64(v) => Ok(Cow::Owned(v.iter().join("\\"))),
            other => MismatchSnafu {
                requested: "string",
                original: other.value_type(),
            }
            .fail(),
        }
    }

    /// Obtain the individual text values, each without padding.
    pub fn to_multi_str(&self) -> Result<Vec<String>, ConvertValueError> {
        match self {
            Value::Empty => Ok(Vec::new()),
            Value::Str(s) => Ok(trim_padding(s)
                .split('\\')
                .map(|s| s.trim().to_string())
                .collect()),
            _ => Ok(vec![self.to_str()?.into_owned()]),
        }
    }

    /// Obtain the first value as an integer of type `T`.
    ///
    /// Numbers are converted with a range check,
    /// and text (IS, DS) is parsed.
    pub fn to_int<T>(&self) -> Result<T, ConvertValueError>
    where
        T: NumCast,
    {
        let requested = std::any::type_name::<T>();
        macro_rules! first {
            ($v: expr) => {{
                let n = $v.first().copied().ok_or(ConvertValueError::NoValue { requested })?;
                T::from(n).ok_or(ConvertValueError::OutOfRange { requested })
            }};
        }
        match self {
            Value::U16(v) => first!(v),
            Value::I16(v) => first!(v),
            Value::U32(v) => first!(v),
            Value::I32(v) => first!(v),
            Value::U64(v) => first!(v),
            Value::I64(v) => first!(v),
            Value::Str(s) => {
                let text = trim_padding(s).split('\\').next().unwrap_or("").trim();
                if text.is_empty() {
                    return NoValueSnafu { requested }.fail();
                }
                let n: i64 = text.parse().map_err(|_| ConvertValueError::Parse {
                    requested,
                    value: text.to_string(),
                })?;
                T::from(n).ok_or(ConvertValueError::OutOfRange { requested })
            }
            Value::Empty => NoValueSnafu { requested }.fail(),
            other => MismatchSnafu {
                requested,
                original: other.value_type(),
            }
            .fail(),
        }
    }

    /// Obtain the first value as a double precision float.
    pub fn to_float64(&self) -> Result<f64, ConvertValueError> {
        let requested = "f64";
        match self {
            Value::F32(v) => v
                .first()
                .map(|&f| <f64 as From<f32>>::from(f))
                .ok_or(ConvertValueError::NoValue { requested }),
            Value::F64(v) => v
                .first()
                .copied()
                .ok_or(ConvertValueError::NoValue { requested }),
            Value::Str(s) => {
                let text = trim_padding(s).split('\\').next().unwrap_or("").trim();
                text.parse().map_err(|_| ConvertValueError::Parse {
                    requested,
                    value: text.to_string(),
                })
            }
            other => other.to_int::<i64>().map(|n| n as f64),
        }
    }

    /// Obtain the raw bytes of a binary or text value.
    pub fn to_bytes(&self) -> Result<Cow<'_, [u8]>, ConvertValueError> {
        match self {
            Value::Empty => Ok(Cow::Borrowed(&[])),
            Value::Bytes(b) => Ok(Cow::Borrowed(b)),
            Value::Str(s) => Ok(Cow::Borrowed(s.as_bytes())),
            other => MismatchSnafu {
                requested: "bytes",
                original: other.value_type(),
            }
            .fail(),
        }
    }

    /// Obtain the first attribute tag of an AT value.
    pub fn to_tag(&self) -> Result<Tag, ConvertValueError> {
        match self {
            Value::Tags(v) => v
                .first()
                .copied()
                .ok_or(ConvertValueError::NoValue { requested: "tag" }),
            Value::Str(s) => s.parse().map_err(|_| ConvertValueError::Parse {
                requested: "tag",
                value: s.clone(),
            }),
            other => MismatchSnafu {
                requested: "tag",
                original: other.value_type(),
            }
            .fail(),
        }
    }

    /// Interpret the value as a date (DA, `YYYYMMDD`).
    /// The older `YYYY.MM.DD` form is also accepted.
    pub fn to_date(&self) -> Result<NaiveDate, ConvertValueError> {
        let text = self.first_text("date")?;
        NaiveDate::parse_from_str(&text, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(&text, "%Y.%m.%d"))
            .map_err(|_| ConvertValueError::Parse {
                requested: "date",
                value: text,
            })
    }

    /// Interpret the value as a time (TM, `HH[MM[SS[.F{1,6}]]]`).
    pub fn to_time(&self) -> Result<NaiveTime, ConvertValueError> {
        let text = self.first_text("time")?;
        parse_time(&text).ok_or(ConvertValueError::Parse {
            requested: "time",
            value: text,
        })
    }

    /// Interpret the value as a date-time (DT, `YYYYMMDDHHMMSS.FFFFFF`).
    /// A UTC offset suffix is accepted and ignored.
    pub fn to_datetime(&self) -> Result<NaiveDateTime, ConvertValueError> {
        let text = self.first_text("date-time")?;
        let fail = || ConvertValueError::Parse {
            requested: "date-time",
            value: text.clone(),
        };
        let local = text.split(|c: char| c == '+' || c == '-').next().unwrap_or("");
        if local.len() < 8 || !local.is_char_boundary(8) {
            return Err(fail());
        }
        let (date, time) = local.split_at(8);
        let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| fail())?;
        let time = if time.is_empty() {
            NaiveTime::MIN
        } else {
            parse_time(time).ok_or_else(fail)?
        };
        Ok(date.and_time(time))
    }

    /// The items of a sequence value.
    pub fn items(&self) -> Option<&[Item]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// The items of a sequence value, for modification.
    pub fn items_mut(&mut self) -> Option<&mut Vec<Item>> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// The fragments of an encapsulated pixel data value.
    pub fn fragments(&self) -> Option<&[Fragment]> {
        match self {
            Value::PixelSequence(fragments) => Some(fragments),
            _ => None,
        }
    }

    /// Adapt this value for an element of the given VR.
    ///
    /// Numbers are cast into the VR's number type with a range check,
    /// numbers become text for text VRs,
    /// and text and bytes are padded to an even length.
    pub fn coerce(self, vr: VR) -> Result<Value, IncompatibleValueError> {
        let original = self.value_type();
        let incompatible = || IncompatibleValueError { vr, original };
        match (vr.kind(), self) {
            (_, Value::Empty) => Ok(Value::Empty),
            (VrKind::Sequence, v @ Value::Sequence(_)) => Ok(v),
            (VrKind::Sequence, _) => Err(incompatible()),
            (_, v @ Value::PixelSequence(_)) if vr == VR::OB || vr == VR::OW => Ok(v),
            (VrKind::Text, Value::Str(mut s)) => {
                if s.len() % 2 == 1 {
                    s.push(vr.padding() as char);
                }
                Ok(Value::Str(s))
            }
            (VrKind::Text, v @ Value::Bytes(_)) => Err(IncompatibleValueError {
                vr,
                original: v.value_type(),
            }),
            (VrKind::Text, v) => {
                let text = v.to_str().map_err(|_| incompatible())?.into_owned();
                Value::Str(text).coerce(vr)
            }
            (VrKind::Binary, Value::Bytes(mut b)) => {
                if b.len() % 2 == 1 {
                    b.push(vr.padding());
                }
                Ok(Value::Bytes(b))
            }
            (VrKind::Binary, _) => Err(incompatible()),
            (VrKind::Numeric, v) => coerce_numeric(vr, v).ok_or_else(incompatible),
        }
    }
}

fn coerce_numeric(vr: VR, value: Value) -> Option<Value> {
    fn cast_all<S, T>(v: &[S]) -> Option<C<T>>
    where
        S: NumCast + Copy,
        T: NumCast,
    {
        v.iter().map(|&n| T::from(n)).collect()
    }
    macro_rules! cast_into {
        ($value: expr, $variant: ident) => {
            match $value {
                Value::$variant(v) => Some(Value::$variant(v)),
                Value::U16(v) => cast_all(&v).map(Value::$variant),
                Value::I16(v) => cast_all(&v).map(Value::$variant),
                Value::U32(v) => cast_all(&v).map(Value::$variant),
                Value::I32(v) => cast_all(&v).map(Value::$variant),
                Value::U64(v) => cast_all(&v).map(Value::$variant),
                Value::I64(v) => cast_all(&v).map(Value::$variant),
                Value::F32(v) => cast_all(&v).map(Value::$variant),
                Value::F64(v) => cast_all(&v).map(Value::$variant),
                _ => None,
            }
        };
    }
    match vr {
        VR::AT => match value {
            Value::Tags(v) => Some(Value::Tags(v)),
            Value::Str(s) => s.parse().ok().map(|t: Tag| Value::from(t)),
            _ => None,
        },
        VR::US => cast_into!(value, U16),
        VR::SS => cast_into!(value, I16),
        VR::UL => cast_into!(value, U32),
        VR::SL => cast_into!(value, I32),
        VR::UV => cast_into!(value, U64),
        VR::SV => cast_into!(value, I64),
        VR::FL => cast_into!(value, F32),
        VR::FD => cast_into!(value, F64),
        _ => None,
    }
}

fn trim_padding(s: &str) -> &str {
    s.trim_end_matches(|c: char| c == ' ' || c == '\0')
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let (hms, frac) = match text.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (text, None),
    };
    if !hms.is_ascii() || hms.len() % 2 == 1 || hms.is_empty() || hms.len() > 6 {
        return None;
    }
    let field = |i: usize| -> Option<u32> {
        hms.get(i..i + 2).map_or(Some(0), |s| s.parse().ok())
    };
    let micro = match frac {
        Some(f) if !f.is_empty() && f.len() <= 6 => {
            let n: u32 = f.parse().ok()?;
            n * 10u32.pow(6 - f.len() as u32)
        }
        Some(_) => return None,
        None => 0,
    };
    NaiveTime::from_hms_micro_opt(field(0)?, field(2)?, field(4)?, micro)
}

impl Value {
    fn first_text(&self, requested: &'static str) -> Result<String, ConvertValueError> {
        match self {
            Value::Str(s) => {
                let text = trim_padding(s).split('\\').next().unwrap_or("").trim();
                if text.is_empty() {
                    NoValueSnafu { requested }.fail()
                } else {
                    Ok(text.to_string())
                }
            }
            Value::Empty => NoValueSnafu { requested }.fail(),
            other => MismatchSnafu {
                requested,
                original: other.value_type(),
            }
            .fail(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bytes(b) => {
                let shown = b.iter().take(16).map(|b| format!("{:02x}", b)).join(" ");
                if b.len() > 16 {
                    write!(f, "{} ... ({} bytes)", shown, b.len())
                } else {
                    f.write_str(&shown)
                }
            }
            Value::Sequence(items) => write!(f, "<{} items>", items.len()),
            Value::PixelSequence(fragments) => write!(f, "<{} fragments>", fragments.len()),
            other => match other.to_str() {
                Ok(s) => f.write_str(&s),
                Err(_) => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;
    use smallvec::smallvec;

    #[test]
    fn text_accessors_trim_padding() {
        let v = Value::Str("1.2.840.10008.1.2\0".to_string());
        assert_eq!(v.to_str().unwrap(), "1.2.840.10008.1.2");

        let v = Value::Str("ORIGINAL\\PRIMARY ".to_string());
        assert_eq!(v.to_multi_str().unwrap(), vec!["ORIGINAL", "PRIMARY"]);
    }

    #[test]
    fn integers_are_range_checked() {
        let v = Value::U32(smallvec![70_000]);
        assert_eq!(v.to_int::<u32>(), Ok(70_000));
        assert_matches!(v.to_int::<i16>(), Err(ConvertValueError::OutOfRange { .. }));

        let v = Value::Str("42 ".to_string());
        assert_eq!(v.to_int::<i32>(), Ok(42));

        let v = Value::Bytes(vec![1, 2]);
        assert_matches!(
            v.to_int::<i32>(),
            Err(ConvertValueError::Mismatch {
                original: ValueType::Bytes,
                ..
            })
        );
    }

    #[test]
    fn dates_and_times() {
        let v = Value::from("20171017");
        assert_eq!(v.to_date(), Ok(NaiveDate::from_ymd_opt(2017, 10, 17).unwrap()));
        let v = Value::from("1995.01.31");
        assert_eq!(v.to_date(), Ok(NaiveDate::from_ymd_opt(1995, 1, 31).unwrap()));
        assert!(Value::from("2017").to_date().is_err());

        let v = Value::from("1330");
        assert_eq!(v.to_time(), Ok(NaiveTime::from_hms_opt(13, 30, 0).unwrap()));
        let v = Value::from("070907.0705 ");
        assert_eq!(
            v.to_time(),
            Ok(NaiveTime::from_hms_micro_opt(7, 9, 7, 70_500).unwrap())
        );

        let v = Value::from("20200102030405+0100");
        assert_eq!(
            v.to_datetime(),
            Ok(NaiveDate::from_ymd_opt(2020, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap())
        );
    }

    #[test]
    fn coerce_pads_and_casts() {
        let v = Value::from("ABC").coerce(VR::CS).unwrap();
        assert_eq!(v, Value::Str("ABC ".to_string()));

        let v = Value::from("1.2.3").coerce(VR::UI).unwrap();
        assert_eq!(v, Value::Str("1.2.3\0".to_string()));

        let v = Value::from(512_i32).coerce(VR::US).unwrap();
        assert_eq!(v, Value::U16(smallvec![512]));

        let v = Value::from(16_u16).coerce(VR::IS).unwrap();
        assert_eq!(v, Value::Str("16".to_string()));

        assert!(Value::from(-1_i32).coerce(VR::US).is_err());
        assert!(Value::from("x").coerce(VR::SQ).is_err());
        assert!(Value::from(vec![1_u8, 2]).coerce(VR::PN).is_err());
    }
}

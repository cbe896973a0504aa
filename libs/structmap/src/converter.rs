//! Scalar coercion rules.
//!
//! Two strengths:
//! - `convert`: the regular cascade. Lossless only: integers must fit,
//!   floats must be integral to become integers, strings stay strings.
//! - `cast`: raw conversion behind `Directive::Custom`. Truncating numeric
//!   casts, `bool` ↔ number, strings parsed, scalars rendered into strings.

use crate::value::Value;

/// Scalar that maps onto a single `Value` variant.
pub(crate) trait Scalar: Sized {
    fn to_value(&self) -> Value;
    fn convert(value: &Value) -> Option<Self>;
    fn cast(value: &Value) -> Option<Self>;
}

/// Integral `f64` in `i64` range.
fn integral(v: f64) -> Option<i64> {
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

macro_rules! integer_scalar {
    ($variant:ident as $wide:ty: $($t:ty),*) => {
        $(
            impl Scalar for $t {
                fn to_value(&self) -> Value {
                    Value::$variant(*self as $wide)
                }

                fn convert(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => Self::try_from(*v).ok(),
                        Value::UInt(v) => Self::try_from(*v).ok(),
                        Value::Float(v) => integral(*v).and_then(|v| Self::try_from(v).ok()),
                        _ => None,
                    }
                }

                fn cast(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => Some(*v as $t),
                        Value::UInt(v) => Some(*v as $t),
                        Value::Float(v) => Some(*v as $t),
                        Value::Bool(v) => Some(u8::from(*v) as $t),
                        Value::String(s) => s.trim().parse().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_scalar!(Int as i64: i8, i16, i32, i64, isize);
integer_scalar!(UInt as u64: u8, u16, u32, u64, usize);

macro_rules! float_scalar {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                fn to_value(&self) -> Value {
                    Value::Float(*self as f64)
                }

                fn convert(value: &Value) -> Option<Self> {
                    match value {
                        Value::Float(v) => Some(*v as $t),
                        Value::Int(v) => Some(*v as $t),
                        Value::UInt(v) => Some(*v as $t),
                        _ => None,
                    }
                }

                fn cast(value: &Value) -> Option<Self> {
                    match value {
                        Value::Bool(v) => Some(u8::from(*v) as $t),
                        Value::String(s) => s.trim().parse().ok(),
                        other => Self::convert(other),
                    }
                }
            }
        )*
    };
}

float_scalar!(f32, f64);

impl Scalar for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn convert(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::UInt(v) => Some(*v != 0),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Scalar for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn convert(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(v) => Some(v.to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::UInt(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

impl Scalar for char {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    fn convert(value: &Value) -> Option<Self> {
        let mut chars = value.as_str()?.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => s.chars().next(),
            Value::Int(v) => u32::try_from(*v).ok().and_then(char::from_u32),
            Value::UInt(v) => u32::try_from(*v).ok().and_then(char::from_u32),
            _ => None,
        }
    }
}

/// Strip module paths from a `std::any::type_name` string:
/// `core::option::Option<alloc::string::String>` → `Option<String>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            segment.clear();
        } else if c.is_alphanumeric() || c == '_' {
            segment.push(c);
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(&segment);
    out
}

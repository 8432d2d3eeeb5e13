//! Invariant text conversion for attribute values.
//!
//! [`XmlValue`] converts scalars to and from the text stored in `value` and
//! `count` attributes. The forms are locale independent: `.` as decimal
//! separator, no digit grouping, `true`/`false` for booleans and `NaN`,
//! `Infinity`, `-Infinity` for non-finite floats. Enums are written by variant
//! name; see [`xml_enum!`](crate::xml_enum).

use crate::error::{Result, XmlError};
use std::any::type_name;

/// A value that can be stored as attribute text.
pub trait XmlValue: Sized {
    /// Converts the value to its invariant textual form.
    fn to_xml_text(&self) -> Result<String>;

    /// Parses the invariant textual form.
    fn from_xml_text(text: &str) -> Result<Self>;
}

/// Returns the last path segment of a type's name, without generic arguments.
///
/// `my_app::config::Settings<u32>` becomes `Settings`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = match full.find('<') {
        Some(index) => &full[..index],
        None => full,
    };
    base.rsplit("::").next().unwrap_or(base)
}

fn parse_error<T>(text: &str, err: impl std::fmt::Display) -> XmlError {
    XmlError::format(format!(
        "'{}' is not a valid {} value: {}",
        text,
        type_name::<T>(),
        err
    ))
}

macro_rules! impl_xml_value_for_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl XmlValue for $ty {
                fn to_xml_text(&self) -> Result<String> {
                    Ok(self.to_string())
                }

                fn from_xml_text(text: &str) -> Result<Self> {
                    text.trim().parse().map_err(|e| parse_error::<$ty>(text, e))
                }
            }
        )*
    };
}

impl_xml_value_for_number!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! impl_xml_value_for_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl XmlValue for $ty {
                fn to_xml_text(&self) -> Result<String> {
                    if self.is_infinite() {
                        let text = if self.is_sign_positive() { "Infinity" } else { "-Infinity" };
                        Ok(text.to_string())
                    } else {
                        Ok(self.to_string())
                    }
                }

                fn from_xml_text(text: &str) -> Result<Self> {
                    text.trim().parse().map_err(|e| parse_error::<$ty>(text, e))
                }
            }
        )*
    };
}

impl_xml_value_for_float!(f32, f64);

impl XmlValue for bool {
    fn to_xml_text(&self) -> Result<String> {
        Ok(if *self { "true" } else { "false" }.to_string())
    }

    fn from_xml_text(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(parse_error::<bool>(text, "expected true or false"))
        }
    }
}

impl XmlValue for char {
    fn to_xml_text(&self) -> Result<String> {
        Ok(self.to_string())
    }

    fn from_xml_text(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(parse_error::<char>(text, "expected exactly one character")),
        }
    }
}

impl XmlValue for String {
    fn to_xml_text(&self) -> Result<String> {
        Ok(self.clone())
    }

    fn from_xml_text(text: &str) -> Result<Self> {
        Ok(text.to_string())
    }
}

/// `None` has no textual form and cannot be written.
impl<T: XmlValue> XmlValue for Option<T> {
    fn to_xml_text(&self) -> Result<String> {
        match self {
            Some(value) => value.to_xml_text(),
            None => Err(XmlError::conversion(
                type_name::<T>(),
                "no value present to convert to text",
            )),
        }
    }

    fn from_xml_text(text: &str) -> Result<Self> {
        T::from_xml_text(text).map(Some)
    }
}

/// Implements [`XmlValue`] for a fieldless enum using its variant names.
///
/// Parsing is an exact, case-sensitive name lookup; an unknown name is a
/// conversion error.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Default)]
/// enum Mode { #[default] Fast, Safe }
///
/// helios_xml_utils::xml_enum!(Mode { Fast, Safe });
/// ```
#[macro_export]
macro_rules! xml_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::XmlValue for $ty {
            fn to_xml_text(&self) -> $crate::Result<String> {
                let name = match self {
                    $($ty::$variant => stringify!($variant),)+
                };
                Ok(name.to_string())
            }

            fn from_xml_text(text: &str) -> $crate::Result<Self> {
                match text.trim() {
                    $(stringify!($variant) => Ok($ty::$variant),)+
                    other => Err($crate::XmlError::conversion(
                        ::std::any::type_name::<$ty>(),
                        format!("'{}' is not a variant name", other),
                    )),
                }
            }
        }
    };
}

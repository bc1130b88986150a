//! Single `"key":value` tokens of the outgoing envelope
//!
//! Text values are written quoted and escaped, numbers and booleans are written as is. Raw values
//! (already serialized arrays or objects) are inserted verbatim.
use core::fmt::{self, Write};

use crate::error::Error;

/// A value which can be written into a field
pub trait FieldValue {
    /// `true` when the value has to be quoted in a keyed field
    fn is_text(&self) -> bool;
    fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result;
}

impl<T: FieldValue + ?Sized> FieldValue for &T {
    fn is_text(&self) -> bool {
        (**self).is_text()
    }

    fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        (**self).write_to(out)
    }
}

macro_rules! plain_field_value {
    ($($t:ty),*) => {
        $(
            impl FieldValue for $t {
                fn is_text(&self) -> bool {
                    false
                }

                fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
                    write!(out, "{}", self)
                }
            }
        )*
    };
}

plain_field_value!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, bool);

impl FieldValue for str {
    fn is_text(&self) -> bool {
        true
    }

    fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        out.write_str(self)
    }
}

impl FieldValue for char {
    fn is_text(&self) -> bool {
        true
    }

    fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        out.write_char(*self)
    }
}

impl<const M: usize> FieldValue for heapless::String<M> {
    fn is_text(&self) -> bool {
        true
    }

    fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        out.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl FieldValue for std::string::String {
    fn is_text(&self) -> bool {
        true
    }

    fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        out.write_str(self.as_str())
    }
}

/// Escapes `"` and `\` of everything written through it
struct Escaped<'a, W: Write>(&'a mut W);

impl<W: Write> Write for Escaped<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            match c {
                '"' => self.0.write_str("\\\"")?,
                '\\' => self.0.write_str("\\\\")?,
                c => self.0.write_char(c)?,
            }
        }
        Ok(())
    }
}

/// One formatted field, at most `N` bytes long
#[derive(Clone, PartialEq)]
#[cfg_attr(any(feature = "std", test), derive(Debug))]
pub struct Field<const N: usize> {
    text: heapless::String<N>,
    /// length of the `"key":` prefix, 0 for a bare value
    key_len: usize,
}

impl<const N: usize> Field<N> {
    /// `"value"` with no key
    pub fn bare<V: FieldValue + ?Sized>(value: &V) -> Result<Self, Error> {
        let mut text = heapless::String::new();
        write_quoted(&mut text, value).map_err(|_| Error::FieldTooLong)?;
        Ok(Self { text, key_len: 0 })
    }

    /// `"key":"value"` for text, `"key":value` otherwise
    pub fn keyed<V: FieldValue + ?Sized>(key: &str, value: &V) -> Result<Self, Error> {
        let mut text = heapless::String::new();
        let key_len = write_key(&mut text, key)?;
        let written = if value.is_text() {
            write_quoted(&mut text, value)
        } else {
            value.write_to(&mut text)
        };
        written.map_err(|_| Error::FieldTooLong)?;
        Ok(Self { text, key_len })
    }

    /// `"key":"first second"` joined by [`crate::config::CMD_INTERSPACE`]
    pub fn triplet<A, B>(key: &str, first: &A, second: &B) -> Result<Self, Error>
    where
        A: FieldValue + ?Sized,
        B: FieldValue + ?Sized,
    {
        let mut text = heapless::String::new();
        let key_len = write_key(&mut text, key)?;
        (|| {
            text.write_char('"')?;
            first.write_to(&mut Escaped(&mut text))?;
            text.write_str(crate::config::CMD_INTERSPACE)?;
            second.write_to(&mut Escaped(&mut text))?;
            text.write_char('"')
        })()
        .map_err(|_| Error::FieldTooLong)?;
        Ok(Self { text, key_len })
    }

    /// `"key":raw` with `raw` inserted verbatim, used for arrays and objects
    pub fn raw(key: &str, raw: &str) -> Result<Self, Error> {
        let mut text = heapless::String::new();
        let key_len = write_key(&mut text, key)?;
        text.push_str(raw).map_err(|_| Error::FieldTooLong)?;
        Ok(Self { text, key_len })
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// The `"key":` prefix, `None` for bare values
    pub fn key_prefix(&self) -> Option<&str> {
        match self.key_len {
            0 => None,
            len => Some(&self.text.as_str()[..len]),
        }
    }
}

fn write_key<const N: usize>(text: &mut heapless::String<N>, key: &str) -> Result<usize, Error> {
    (|| {
        text.write_char('"')?;
        Escaped(&mut *text).write_str(key)?;
        text.write_str("\":")
    })()
    .map_err(|_| Error::FieldTooLong)?;
    Ok(text.len())
}

fn write_quoted<W: Write, V: FieldValue + ?Sized>(out: &mut W, value: &V) -> fmt::Result {
    out.write_char('"')?;
    value.write_to(&mut Escaped(&mut *out))?;
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestField = Field<64>;

    #[test]
    fn test_bare_value_is_quoted() {
        assert_eq!(TestField::bare("on").unwrap().as_str(), "\"on\"");
        assert_eq!(TestField::bare(&42u8).unwrap().as_str(), "\"42\"");
        assert_eq!(TestField::bare(&42u8).unwrap().key_prefix(), None);
        assert_eq!(TestField::bare("").unwrap().as_str(), "\"\"");
    }

    #[test]
    fn test_text_value_is_quoted() {
        let field = TestField::keyed("a", "1").unwrap();
        assert_eq!(field.as_str(), "\"a\":\"1\"");
        assert_eq!(field.key_prefix(), Some("\"a\":"));

        let field = TestField::keyed("btn", &'x').unwrap();
        assert_eq!(field.as_str(), "\"btn\":\"x\"");
    }

    #[test]
    fn test_every_number_type_is_written() {
        assert_eq!(TestField::keyed("n", &-7i32).unwrap().as_str(), "\"n\":-7");
        assert_eq!(TestField::keyed("n", &7u32).unwrap().as_str(), "\"n\":7");
        assert_eq!(TestField::keyed("n", &-70_000i64).unwrap().as_str(), "\"n\":-70000");
        assert_eq!(TestField::keyed("n", &70_000u64).unwrap().as_str(), "\"n\":70000");
        assert_eq!(TestField::keyed("n", &255u8).unwrap().as_str(), "\"n\":255");
        assert_eq!(TestField::keyed("t", &21.5f64).unwrap().as_str(), "\"t\":21.5");
        assert_eq!(TestField::keyed("b", &true).unwrap().as_str(), "\"b\":true");
    }

    #[test]
    fn test_quotes_are_escaped() {
        let field = TestField::keyed("msg", "say \"hi\"").unwrap();
        assert_eq!(field.as_str(), r#""msg":"say \"hi\"""#);
        let field = TestField::keyed("path", "a\\b").unwrap();
        assert_eq!(field.as_str(), r#""path":"a\\b""#);
    }

    #[test]
    fn test_triplet() {
        let field = TestField::triplet("rgb", &255u8, "on").unwrap();
        assert_eq!(field.as_str(), "\"rgb\":\"255 on\"");
    }

    #[test]
    fn test_raw_is_verbatim() {
        let field = TestField::raw("arr", "[1,2,3]").unwrap();
        assert_eq!(field.as_str(), "\"arr\":[1,2,3]");
        let field = TestField::raw("obj", "{\"x\":1}").unwrap();
        assert_eq!(field.as_str(), "\"obj\":{\"x\":1}");
    }

    #[test]
    fn test_field_too_long() {
        let long = "x".repeat(100);
        assert_eq!(
            Field::<16>::keyed("k", long.as_str()),
            Err(Error::FieldTooLong)
        );
        assert_eq!(Field::<16>::raw(long.as_str(), "1"), Err(Error::FieldTooLong));
    }
}

//! A `serde` deserializer that reads records straight out of wire values.
//!
//! Numbers stay decimal text until the target type asks for them: a `String`
//! field gets the stored digits unchanged, `i128`/`u128` parse the full text,
//! and only float targets go through `f64`.

use dynoschema_model::AttributeValue;
use serde::de::value::{BorrowedStrDeserializer, Error, MapAccessDeserializer, MapDeserializer, SeqDeserializer};
use serde::de::{self, Error as _, IntoDeserializer, Unexpected, Visitor};
use serde::forward_to_deserialize_any;

/// Stand-in for a nullable attribute the item does not carry.
pub(super) static ABSENT: AttributeValue = AttributeValue::Null(true);

/// Deserialize a record from its top-level `(name, value)` pairs.
pub(super) fn from_fields<'de, T, I>(fields: I) -> Result<T, Error>
where
    T: de::Deserialize<'de>,
    I: IntoIterator<Item = (&'de str, &'de AttributeValue)>,
{
    let access: MapDeserializer<'de, _, Error> = MapDeserializer::new(
        fields
            .into_iter()
            .map(|(name, value)| (name, WireDeserializer::new(value))),
    );
    T::deserialize(access)
}

/// Deserializer over one borrowed attribute value.
#[derive(Debug, Clone, Copy)]
pub(super) struct WireDeserializer<'de> {
    value: &'de AttributeValue,
}

impl<'de> WireDeserializer<'de> {
    pub(super) fn new(value: &'de AttributeValue) -> Self {
        Self { value }
    }

    fn number(&self) -> Option<&'de str> {
        match self.value {
            AttributeValue::N(n) => Some(n.as_str()),
            _ => None,
        }
    }
}

impl<'de> IntoDeserializer<'de, Error> for WireDeserializer<'de> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

fn unexpected(value: &AttributeValue) -> Unexpected<'_> {
    match value {
        AttributeValue::S(s) => Unexpected::Str(s),
        AttributeValue::N(n) => Unexpected::Other(n),
        AttributeValue::B(b) => Unexpected::Bytes(b),
        AttributeValue::Bool(b) => Unexpected::Bool(*b),
        AttributeValue::Null(_) => Unexpected::Unit,
        AttributeValue::L(_) => Unexpected::Seq,
        AttributeValue::M(_) => Unexpected::Map,
    }
}

fn parse<'de, N: std::str::FromStr, V: Visitor<'de>>(n: &str, visitor: &V) -> Result<N, Error> {
    n.parse()
        .map_err(|_| Error::invalid_value(Unexpected::Other(n), visitor))
}

fn visit_map<'de, V: Visitor<'de>>(
    map: &'de std::collections::HashMap<String, AttributeValue>,
    visitor: V,
) -> Result<V::Value, Error> {
    let mut access: MapDeserializer<'de, _, Error> = MapDeserializer::new(
        map.iter()
            .map(|(k, v)| (k.as_str(), WireDeserializer::new(v))),
    );
    let value = visitor.visit_map(&mut access)?;
    access.end()?;
    Ok(value)
}

impl<'de> de::Deserializer<'de> for WireDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            AttributeValue::S(s) => visitor.visit_borrowed_str(s),
            AttributeValue::N(n) => {
                if let Ok(i) = n.parse::<i64>() {
                    visitor.visit_i64(i)
                } else if let Ok(u) = n.parse::<u64>() {
                    visitor.visit_u64(u)
                } else {
                    let f: f64 = parse(n, &visitor)?;
                    visitor.visit_f64(f)
                }
            }
            AttributeValue::B(b) => {
                let mut access: SeqDeserializer<_, Error> = SeqDeserializer::new(b.iter().copied());
                let value = visitor.visit_seq(&mut access)?;
                access.end()?;
                Ok(value)
            }
            AttributeValue::Bool(b) => visitor.visit_bool(*b),
            AttributeValue::Null(_) => visitor.visit_unit(),
            AttributeValue::L(elems) => {
                let mut access: SeqDeserializer<_, Error> =
                    SeqDeserializer::new(elems.iter().map(WireDeserializer::new));
                let value = visitor.visit_seq(&mut access)?;
                access.end()?;
                Ok(value)
            }
            AttributeValue::M(map) => visit_map(map, visitor),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.number() {
            Some(n) => visitor.visit_borrowed_str(n),
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.number() {
            Some(n) => {
                let i = parse(n, &visitor)?;
                visitor.visit_i128(i)
            }
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.number() {
            Some(n) => {
                let u = parse(n, &visitor)?;
                visitor.visit_u128(u)
            }
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.number() {
            Some(n) => {
                let f = parse(n, &visitor)?;
                visitor.visit_f64(f)
            }
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            AttributeValue::B(b) => visitor.visit_borrowed_bytes(b),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            AttributeValue::Null(_) => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            AttributeValue::S(s) => {
                let variant: BorrowedStrDeserializer<'de, Error> = BorrowedStrDeserializer::new(s);
                visitor.visit_enum(variant)
            }
            AttributeValue::M(map) if map.len() == 1 => {
                let access: MapDeserializer<'de, _, Error> = MapDeserializer::new(
                    map.iter()
                        .map(|(k, v)| (k.as_str(), WireDeserializer::new(v))),
                );
                visitor.visit_enum(MapAccessDeserializer::new(access))
            }
            other => Err(Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 char unit unit_struct seq tuple
        tuple_struct map struct identifier
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;

    use super::*;

    fn read<T: de::DeserializeOwned>(value: &AttributeValue) -> Result<T, Error> {
        T::deserialize(WireDeserializer::new(value))
    }

    #[test]
    fn test_should_keep_number_text_for_string_targets() {
        let n = AttributeValue::N("12345678901234567890123.5".to_owned());
        assert_eq!(read::<String>(&n).unwrap(), "12345678901234567890123.5");
        assert_eq!(read::<String>(&AttributeValue::N("0.10".to_owned())).unwrap(), "0.10");
    }

    #[test]
    fn test_should_parse_wide_integers_without_floats() {
        let n = AttributeValue::N("18446744073709551616".to_owned());
        assert_eq!(read::<u128>(&n).unwrap(), 18_446_744_073_709_551_616);
        let n = AttributeValue::N("-170141183460469231731687303715884105728".to_owned());
        assert_eq!(read::<i128>(&n).unwrap(), i128::MIN);
        assert!(read::<u64>(&AttributeValue::N("18446744073709551616".to_owned())).is_err());
    }

    #[test]
    fn test_should_read_native_numbers() {
        assert_eq!(read::<u32>(&AttributeValue::N("25".to_owned())).unwrap(), 25);
        assert_eq!(read::<i64>(&AttributeValue::N("-7".to_owned())).unwrap(), -7);
        assert!((read::<f64>(&AttributeValue::N("19.99".to_owned())).unwrap() - 19.99).abs() < f64::EPSILON);
        assert_eq!(
            read::<serde_json::Value>(&AttributeValue::N("42".to_owned())).unwrap(),
            serde_json::json!(42)
        );
    }

    #[test]
    fn test_should_read_containers_and_enums() {
        #[derive(Debug, PartialEq, Deserialize)]
        enum Tier {
            Free,
            Paid { seats: u32 },
        }

        assert_eq!(read::<Tier>(&AttributeValue::S("Free".to_owned())).unwrap(), Tier::Free);
        let paid = AttributeValue::M(HashMap::from([(
            "Paid".to_owned(),
            AttributeValue::M(HashMap::from([(
                "seats".to_owned(),
                AttributeValue::N("5".to_owned()),
            )])),
        )]));
        assert_eq!(read::<Tier>(&paid).unwrap(), Tier::Paid { seats: 5 });

        let tags = AttributeValue::L(vec![AttributeValue::S("a".to_owned()), AttributeValue::S("b".to_owned())]);
        assert_eq!(read::<Vec<String>>(&tags).unwrap(), vec!["a", "b"]);
        assert_eq!(read::<Option<String>>(&ABSENT).unwrap(), None);
        assert_eq!(read::<Vec<u8>>(&AttributeValue::from(vec![1_u8, 2, 3])).unwrap(), vec![1, 2, 3]);
    }
}

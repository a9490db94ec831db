//! JSON field adapters shared by the message definitions.
//!
//! # Responsibilities
//! - Carry `bytes` fields as standard base64 strings
//! - Accept 64-bit integers either as JSON numbers or decimal strings
//!
//! Protobuf-JSON emits `int64`/`uint64` as strings while plain JSON clients
//! send numbers; both decode to the same value. Output is always numeric.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::{self, Deserializer, Visitor};
use serde::Serializer;
use std::fmt;

/// `#[serde(with = "base64_bytes")]` for opaque byte buffers.
pub mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        struct Base64Visitor;

        impl<'de> Visitor<'de> for Base64Visitor {
            type Value = Vec<u8>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base64 encoded string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                STANDARD.decode(v).map_err(E::custom)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Vec::new())
            }
        }

        deserializer.deserialize_any(Base64Visitor)
    }
}

macro_rules! lenient_int {
    ($name:ident, $ty:ty, $doc:literal) => {
        #[doc = $doc]
        pub mod $name {
            use super::*;

            pub fn serialize<S: Serializer>(value: &$ty, serializer: S) -> Result<S::Ok, S::Error> {
                serde::Serialize::serialize(value, serializer)
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<$ty, D::Error> {
                struct IntVisitor;

                impl<'de> Visitor<'de> for IntVisitor {
                    type Value = $ty;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str(concat!("a ", stringify!($ty), " as a number or decimal string"))
                    }

                    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                        <$ty>::try_from(v).map_err(|_| E::custom(format!("{v} is out of range")))
                    }

                    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                        <$ty>::try_from(v).map_err(|_| E::custom(format!("{v} is out of range")))
                    }

                    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                        if v.fract() == 0.0 && v >= <$ty>::MIN as f64 && v < <$ty>::MAX as f64 {
                            Ok(v as $ty)
                        } else {
                            Err(E::custom(format!("{v} is not an integer")))
                        }
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        v.trim().parse::<$ty>().map_err(E::custom)
                    }

                    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                        Ok(0)
                    }
                }

                deserializer.deserialize_any(IntVisitor)
            }
        }
    };
}

lenient_int!(lenient_u64, u64, "`#[serde(with = \"lenient_u64\")]` for `uint64` fields.");
lenient_int!(lenient_i64, i64, "`#[serde(with = \"lenient_i64\")]` for `int64` fields.");

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Fields {
        #[serde(default, with = "super::lenient_u64")]
        id: u64,
        #[serde(default, with = "super::lenient_i64")]
        code: i64,
        #[serde(default, with = "super::base64_bytes")]
        blob: Vec<u8>,
    }

    #[test]
    fn test_integers_accept_numbers_and_strings() {
        let a: Fields = serde_json::from_str(r#"{"id": 42, "code": -3}"#).unwrap();
        let b: Fields = serde_json::from_str(r#"{"id": "42", "code": "-3"}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id, 42);
        assert_eq!(a.code, -3);
    }

    #[test]
    fn test_integers_reject_garbage() {
        assert!(serde_json::from_str::<Fields>(r#"{"id": "forty"}"#).is_err());
        assert!(serde_json::from_str::<Fields>(r#"{"id": -1}"#).is_err());
        assert!(serde_json::from_str::<Fields>(r#"{"id": 1.5}"#).is_err());
        assert!(serde_json::from_str::<Fields>(r#"{"id": 18446744073709551616}"#).is_err());
        assert!(serde_json::from_str::<Fields>(r#"{"code": 9223372036854775808.0}"#).is_err());
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let p: Fields = serde_json::from_str(r#"{"id": null, "blob": null}"#).unwrap();
        assert_eq!(p, Fields::default());
    }

    #[test]
    fn test_bytes_are_standard_base64() {
        let p = Fields { blob: vec![0xff, 0x00, 0x10], ..Default::default() };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["blob"], "/wAQ");
        assert_eq!(json["id"], 0);

        let back: Fields = serde_json::from_value(json).unwrap();
        assert_eq!(back.blob, vec![0xff, 0x00, 0x10]);
    }

    #[test]
    fn test_bytes_reject_invalid_base64() {
        assert!(serde_json::from_str::<Fields>(r#"{"blob": "***"}"#).is_err());
    }
}

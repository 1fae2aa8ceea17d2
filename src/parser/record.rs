use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::extended::{kind_name, parse_f64, parse_i64, parse_object_id, parse_timestamp, parse_u64};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::schema::{Named, ObjectId, Opaque};

/// View over one JSON object of a document, with typed field accessors.
///
/// Every accessor reports failures against the full dotted path of the field
/// and the identifier of the enclosing document. `null` counts as absent.
#[derive(Clone)]
pub struct Record<'a> {
    map: &'a Map<String, Value>,
    path: String,
    document_id: Option<&'a str>,
}

pub type DecodeResult<T> = Result<T, DecodeError>;

impl<'a> Record<'a> {
    /// Wrap the document root
    pub fn root(value: &'a Value, document_id: Option<&'a str>) -> DecodeResult<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                map,
                path: String::new(),
                document_id,
            }),
            other => Err(DecodeError {
                document_id: document_id.map(str::to_string),
                field: "$".to_string(),
                kind: DecodeErrorKind::WrongType {
                    expected: "object",
                    found: kind_name(other),
                },
            }),
        }
    }

    /// Dotted path of `key` below this record
    pub fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    pub fn error_at(&self, field: String, kind: DecodeErrorKind) -> DecodeError {
        DecodeError {
            document_id: self.document_id.map(str::to_string),
            field,
            kind,
        }
    }

    fn error(&self, key: &str, kind: DecodeErrorKind) -> DecodeError {
        self.error_at(self.path_of(key), kind)
    }

    /// Raw value of `key`, `None` when missing or null
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        match self.map.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    fn required(&self, key: &str) -> DecodeResult<&'a Value> {
        self.get(key)
            .ok_or_else(|| self.error(key, DecodeErrorKind::Missing))
    }

    fn optional<T>(
        &self,
        key: &str,
        parse: impl Fn(&Value) -> Result<T, DecodeErrorKind>,
    ) -> DecodeResult<Option<T>> {
        self.get(key)
            .map(|v| parse(v).map_err(|kind| self.error(key, kind)))
            .transpose()
    }

    fn require<T>(
        &self,
        key: &str,
        parse: impl Fn(&Value) -> Result<T, DecodeErrorKind>,
    ) -> DecodeResult<T> {
        parse(self.required(key)?).map_err(|kind| self.error(key, kind))
    }

    pub fn str(&self, key: &str) -> DecodeResult<String> {
        self.require(key, as_string)
    }

    pub fn opt_str(&self, key: &str) -> DecodeResult<Option<String>> {
        self.optional(key, as_string)
    }

    pub fn u64(&self, key: &str) -> DecodeResult<u64> {
        self.require(key, parse_u64)
    }

    pub fn opt_u64(&self, key: &str) -> DecodeResult<Option<u64>> {
        self.optional(key, parse_u64)
    }

    pub fn u32(&self, key: &str) -> DecodeResult<u32> {
        self.require(key, as_u32)
    }

    pub fn opt_u32(&self, key: &str) -> DecodeResult<Option<u32>> {
        self.optional(key, as_u32)
    }

    pub fn u8(&self, key: &str) -> DecodeResult<u8> {
        self.require(key, |v| {
            let n = parse_i64(v)?;
            u8::try_from(n).map_err(|_| DecodeErrorKind::OutOfRange(n.to_string()))
        })
    }

    pub fn f64(&self, key: &str) -> DecodeResult<f64> {
        self.require(key, parse_f64)
    }

    pub fn opt_f64(&self, key: &str) -> DecodeResult<Option<f64>> {
        self.optional(key, parse_f64)
    }

    pub fn opt_bool(&self, key: &str) -> DecodeResult<Option<bool>> {
        self.optional(key, |v| {
            v.as_bool().ok_or(DecodeErrorKind::WrongType {
                expected: "boolean",
                found: kind_name(v),
            })
        })
    }

    pub fn object_id(&self, key: &str) -> DecodeResult<ObjectId> {
        self.require(key, parse_object_id)
    }

    pub fn opt_timestamp(&self, key: &str) -> DecodeResult<Option<DateTime<Utc>>> {
        self.optional(key, parse_timestamp)
    }

    /// Keep the value verbatim
    pub fn opaque(&self, key: &str) -> Option<Opaque> {
        self.get(key).cloned().map(Opaque::new)
    }

    /// Nested object, if present
    pub fn record(&self, key: &str) -> DecodeResult<Option<Record<'a>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(Record {
                map,
                path: self.path_of(key),
                document_id: self.document_id,
            })),
            Some(other) => Err(self.error(
                key,
                DecodeErrorKind::WrongType {
                    expected: "object",
                    found: kind_name(other),
                },
            )),
        }
    }

    /// Elements of an array field, empty when the field is absent
    pub fn array(&self, key: &str) -> DecodeResult<&'a [Value]> {
        match self.get(key) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(self.error(
                key,
                DecodeErrorKind::WrongType {
                    expected: "array",
                    found: kind_name(other),
                },
            )),
        }
    }

    /// Decode each object of an array field with `decode`
    pub fn each<T>(
        &self,
        key: &str,
        decode: impl Fn(Record<'a>) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        self.array(key)?
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let path = format!("{}[{}]", self.path_of(key), i);
                match item {
                    Value::Object(map) => decode(Record {
                        map,
                        path,
                        document_id: self.document_id,
                    }),
                    other => Err(self.error_at(
                        path,
                        DecodeErrorKind::WrongType {
                            expected: "object",
                            found: kind_name(other),
                        },
                    )),
                }
            })
            .collect()
    }

    pub fn strings(&self, key: &str) -> DecodeResult<Vec<String>> {
        self.array(key)?
            .iter()
            .enumerate()
            .map(|(i, item)| {
                as_string(item)
                    .map_err(|kind| self.error_at(format!("{}[{}]", self.path_of(key), i), kind))
            })
            .collect()
    }

    /// Object of name → number, in document order
    pub fn named<T>(
        &self,
        key: &str,
        parse: impl Fn(&Value) -> Result<T, DecodeErrorKind>,
    ) -> DecodeResult<Named<T>> {
        match self.get(key) {
            None => Ok(Named::default()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, v)| {
                    parse(v)
                        .map(|parsed| (name.clone(), parsed))
                        .map_err(|kind| self.error_at(format!("{}.{}", self.path_of(key), name), kind))
                })
                .collect::<DecodeResult<Vec<_>>>()
                .map(Named::new),
            Some(other) => Err(self.error(
                key,
                DecodeErrorKind::WrongType {
                    expected: "object",
                    found: kind_name(other),
                },
            )),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.map.iter()
    }
}

fn as_string(value: &Value) -> Result<String, DecodeErrorKind> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or(DecodeErrorKind::WrongType {
            expected: "string",
            found: kind_name(value),
        })
}

fn as_u32(value: &Value) -> Result<u32, DecodeErrorKind> {
    let n = parse_u64(value)?;
    u32::try_from(n).map_err(|_| DecodeErrorKind::OutOfRange(n.to_string()))
}

/// Best-effort identifier of a raw document for error reports
pub fn document_id(value: &Value) -> Option<String> {
    if let Some(id) = value.get("id64").and_then(|v| parse_u64(v).ok()) {
        return Some(id.to_string());
    }
    value
        .get("_id")
        .and_then(|v| parse_object_id(v).ok())
        .map(|oid| oid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_and_null_are_absent() {
        let doc = json!({"name": "Sol", "allegiance": null});
        let rec = Record::root(&doc, Some("10477373803")).unwrap();
        assert_eq!(rec.opt_str("allegiance").unwrap(), None);
        assert_eq!(rec.opt_str("government").unwrap(), None);

        let err = rec.str("security").unwrap_err();
        assert_eq!(err.field, "security");
        assert_eq!(err.kind, DecodeErrorKind::Missing);
        assert_eq!(err.document_id.as_deref(), Some("10477373803"));
    }

    #[test]
    fn test_nested_paths() {
        let doc = json!({"bodies": [{"rings": [{"mass": "heavy"}]}]});
        let rec = Record::root(&doc, None).unwrap();
        let err = rec
            .each("bodies", |body| {
                body.each("rings", |ring| ring.u64("mass"))
            })
            .unwrap_err();
        assert_eq!(err.field, "bodies[0].rings[0].mass");
    }

    #[test]
    fn test_named_keeps_order() {
        let doc = json!({"solidComposition": {"Rock": 70.1, "Metal": 29.9, "Ice": 0}});
        let rec = Record::root(&doc, None).unwrap();
        let weights = rec.named("solidComposition", parse_f64).unwrap();
        let names: Vec<_> = weights.names().collect();
        assert_eq!(names, ["Rock", "Metal", "Ice"]);
        assert_eq!(weights.get("Ice"), Some(&0.0));
    }

    #[test]
    fn test_document_id() {
        assert_eq!(
            document_id(&json!({"id64": {"$numberLong": "3107509212"}})).as_deref(),
            Some("3107509212")
        );
        assert_eq!(
            document_id(&json!({"_id": {"$oid": "65f0c0ffee0000000000abcd"}})).as_deref(),
            Some("65f0c0ffee0000000000abcd")
        );
        assert_eq!(document_id(&json!({"name": "Nowhere"})), None);
    }
}

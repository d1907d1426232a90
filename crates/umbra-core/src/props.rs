#![forbid(unsafe_code)]

//! Loosely-typed prop payloads with typed access.
//!
//! Application code hands the pipeline dictionaries of prop values. Rather
//! than threading stringly-typed lookups through the whole system, the
//! payload is a closed sum type ([`PropValue`]) held in a [`RawProps`] map,
//! and every read goes through a typed accessor that reports a
//! [`PropsError`] on a kind mismatch.
//!
//! Props are immutable once attached to a node: a node clone replaces the
//! whole [`SharedProps`] handle, never individual entries.

use std::sync::Arc;

use ahash::AHashMap;
use thiserror::Error;

/// Shared, immutable prop payload attached to a shadow node.
pub type SharedProps = Arc<RawProps>;

/// Errors from building or reading a prop payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropsError {
    /// The same key appeared twice while parsing a payload.
    #[error("duplicate prop key `{key}`")]
    DuplicateKey {
        /// The offending key.
        key: String,
    },

    /// A typed accessor found a value of a different kind.
    #[error("prop `{key}`: expected {expected}, found {actual}")]
    TypeMismatch {
        /// The key that was read.
        key: String,
        /// The kind the accessor wanted.
        expected: &'static str,
        /// The kind actually stored.
        actual: &'static str,
    },
}

/// One prop value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer quantity.
    Int(i64),
    /// Floating-point quantity.
    Double(f64),
    /// Text content.
    Text(String),
}

impl PropValue {
    /// Convenience constructor for text values.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// The kind name used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
        }
    }
}

/// An immutable map of prop names to [`PropValue`]s.
///
/// Built once via [`RawProps::parse`]; duplicate keys are rejected there so
/// downstream readers never have to think about shadowed entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawProps {
    values: AHashMap<String, PropValue>,
}

impl RawProps {
    /// An empty payload.
    pub fn empty() -> SharedProps {
        Arc::new(Self::default())
    }

    /// Parse a payload from `(key, value)` entries.
    ///
    /// Fails with [`PropsError::DuplicateKey`] if a key repeats; validation
    /// happens here, once, rather than at every read site.
    pub fn parse(
        entries: impl IntoIterator<Item = (String, PropValue)>,
    ) -> Result<Self, PropsError> {
        let mut values = AHashMap::default();
        for (key, value) in entries {
            if values.contains_key(&key) {
                return Err(PropsError::DuplicateKey { key });
            }
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the payload has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw access to a value, untyped.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.get(key)
    }

    /// Read a bool prop. `Ok(None)` when absent.
    pub fn bool_prop(&self, key: &str) -> Result<Option<bool>, PropsError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(PropValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Self::mismatch(key, "bool", other)),
        }
    }

    /// Read an int prop. `Ok(None)` when absent.
    pub fn int_prop(&self, key: &str) -> Result<Option<i64>, PropsError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(PropValue::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(Self::mismatch(key, "int", other)),
        }
    }

    /// Read a double prop. `Ok(None)` when absent. Ints widen losslessly.
    pub fn double_prop(&self, key: &str) -> Result<Option<f64>, PropsError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(PropValue::Double(d)) => Ok(Some(*d)),
            Some(PropValue::Int(i)) => Ok(Some(*i as f64)),
            Some(other) => Err(Self::mismatch(key, "double", other)),
        }
    }

    /// Read a text prop. `Ok(None)` when absent.
    pub fn text_prop(&self, key: &str) -> Result<Option<&str>, PropsError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(PropValue::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(Self::mismatch(key, "text", other)),
        }
    }

    fn mismatch(key: &str, expected: &'static str, actual: &PropValue) -> PropsError {
        PropsError::TypeMismatch {
            key: key.to_owned(),
            expected,
            actual: actual.kind_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(entries: &[(&str, PropValue)]) -> RawProps {
        RawProps::parse(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone())),
        )
        .expect("payload parses")
    }

    #[test]
    fn typed_accessors_round_trip() {
        let props = payload(&[
            ("visible", PropValue::Bool(true)),
            ("count", PropValue::Int(3)),
            ("opacity", PropValue::Double(0.5)),
            ("label", PropValue::text("hi")),
        ]);
        assert_eq!(props.bool_prop("visible"), Ok(Some(true)));
        assert_eq!(props.int_prop("count"), Ok(Some(3)));
        assert_eq!(props.double_prop("opacity"), Ok(Some(0.5)));
        assert_eq!(props.text_prop("label"), Ok(Some("hi")));
    }

    #[test]
    fn absent_keys_are_none_not_errors() {
        let props = payload(&[]);
        assert_eq!(props.bool_prop("missing"), Ok(None));
        assert_eq!(props.text_prop("missing"), Ok(None));
    }

    #[test]
    fn kind_mismatch_is_reported_with_both_kinds() {
        let props = payload(&[("label", PropValue::text("hi"))]);
        let err = props.int_prop("label").unwrap_err();
        assert_eq!(
            err,
            PropsError::TypeMismatch {
                key: "label".to_owned(),
                expected: "int",
                actual: "text",
            }
        );
    }

    #[test]
    fn ints_widen_to_double() {
        let props = payload(&[("weight", PropValue::Int(2))]);
        assert_eq!(props.double_prop("weight"), Ok(Some(2.0)));
    }

    #[test]
    fn duplicate_keys_are_rejected_at_parse_time() {
        let err = RawProps::parse(vec![
            ("k".to_owned(), PropValue::Int(1)),
            ("k".to_owned(), PropValue::Int(2)),
        ])
        .unwrap_err();
        assert_eq!(err, PropsError::DuplicateKey { key: "k".to_owned() });
    }
}

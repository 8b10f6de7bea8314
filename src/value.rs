// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use anyhow::{bail, Result};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// Literal operand of a comparison.
///
/// Only the json types the filter grammar can spell are represented. Numbers
/// keep serde_json's representation so integers stay integers on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for item in a {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl Value {
    /// Parses the text of a json number token.
    pub fn from_number_str(text: &str) -> Result<Value> {
        match serde_json::from_str::<serde_json::Number>(text) {
            Ok(n) => Ok(Value::Number(n)),
            Err(e) => bail!("invalid number `{text}`. {e}"),
        }
    }

    /// Visits every string in this value, descending into arrays.
    pub fn for_each_string_mut<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut String) -> Result<()>,
    {
        match self {
            Value::String(s) => f(s),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    item.for_each_string_mut(&mut *f)?;
                }
                Ok(())
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization() {
        let v = Value::Array(vec![
            Value::Null,
            true.into(),
            Value::from_number_str("2.5").unwrap(),
            Value::from_number_str("-10").unwrap(),
            "x\"y".into(),
            Value::Array(vec![]),
        ]);
        assert_eq!(v.to_string(), r#"[null,true,2.5,-10,"x\"y",[]]"#);
    }

    #[test]
    fn invalid_number() {
        assert!(Value::from_number_str("1.").is_err());
        assert!(Value::from_number_str("abc").is_err());
    }

    #[test]
    fn strings_are_visited_recursively() -> Result<()> {
        let mut v = Value::Array(vec!["a".into(), Value::Array(vec!["b".into(), 1i64.into()])]);
        v.for_each_string_mut(&mut |s| {
            s.make_ascii_uppercase();
            Ok(())
        })?;
        assert_eq!(v.to_string(), r#"["A",["B",1]]"#);
        Ok(())
    }
}

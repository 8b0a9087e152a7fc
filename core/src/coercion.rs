//! Conversion of raw environment strings into typed values.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::options::ParseOptions;
use crate::types::{TypeTag, Value};

/// Per-item transform for list, tuple and set variables.
pub type ItemMap = Arc<dyn Fn(&str) -> anyhow::Result<Value> + Send + Sync>;

/// Per-entry transform for dict variables, producing a new key/value pair.
pub type PairMap = Arc<dyn Fn(&str, &str) -> anyhow::Result<(String, Value)> + Send + Sync>;

/// Element transform applied while coercing collections.
#[derive(Clone)]
pub enum MapFn {
    /// Applied to every item of a list, tuple or set.
    Item(ItemMap),
    /// Applied to every key/value pair of a dict.
    Pair(PairMap),
}

impl MapFn {
    /// Wrap a per-item transform.
    #[must_use]
    pub fn items<F>(f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::Item(Arc::new(f))
    }

    /// Wrap a per-pair transform.
    #[must_use]
    pub fn pairs<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> anyhow::Result<(String, Value)> + Send + Sync + 'static,
    {
        Self::Pair(Arc::new(f))
    }
}

impl fmt::Debug for MapFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(_) => write!(f, "MapFn::Item(..)"),
            Self::Pair(_) => write!(f, "MapFn::Pair(..)"),
        }
    }
}

/// Coerce `raw` into a value of type `tag`.
///
/// `key` only names the variable in error messages. Custom parsers are not
/// handled here; the descriptor calls them before falling back to this.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] when `raw` cannot be converted, and
/// [`Error::Application`] when an element map fails.
pub fn coerce(
    key: &str,
    raw: &str,
    tag: &TypeTag,
    map: Option<&MapFn>,
    options: &ParseOptions,
) -> Result<Value> {
    match tag {
        TypeTag::Bool => Ok(Value::Bool(options.is_truthy(raw))),
        TypeTag::List => Ok(Value::List(split_items(key, raw, tag, map, options)?)),
        TypeTag::Tuple => Ok(Value::Tuple(split_items(key, raw, tag, map, options)?)),
        TypeTag::Set => Ok(Value::set(split_items(key, raw, tag, map, options)?)),
        TypeTag::Dict => split_pairs(key, raw, tag, map, options).map(Value::Dict),
        TypeTag::Any | TypeTag::Str => Ok(Value::Str(raw.to_string())),
        TypeTag::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| Error::type_mismatch(key, tag, format!("invalid value '{raw}': {e}"))),
        TypeTag::Float => raw
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| Error::type_mismatch(key, tag, format!("invalid value '{raw}': {e}"))),
        TypeTag::None => Err(Error::type_mismatch(
            key,
            tag,
            format!("cannot build None from '{raw}'"),
        )),
        TypeTag::Union(alternatives) => {
            for alternative in alternatives {
                match coerce(key, raw, alternative, map, options) {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        tracing::trace!(key, alternative = %alternative, error = %e, "union alternative rejected");
                    },
                }
            }
            Err(Error::type_mismatch(
                key,
                tag,
                format!("no alternative accepts '{raw}'"),
            ))
        },
    }
}

/// Split `raw` into collection items, mapping each one if requested.
fn split_items(
    key: &str,
    raw: &str,
    tag: &TypeTag,
    map: Option<&MapFn>,
    options: &ParseOptions,
) -> Result<Vec<Value>> {
    let items = raw.split(options.item_separator.as_str());
    match map {
        None => Ok(items.map(Value::from).collect()),
        Some(MapFn::Item(f)) => Ok(items.map(|item| f(item)).collect::<anyhow::Result<_>>()?),
        Some(MapFn::Pair(_)) => Err(Error::type_mismatch(
            key,
            tag,
            "a pair map cannot be applied to collection items",
        )),
    }
}

/// Split `raw` into mapping entries; later duplicate keys win.
fn split_pairs(
    key: &str,
    raw: &str,
    tag: &TypeTag,
    map: Option<&MapFn>,
    options: &ParseOptions,
) -> Result<IndexMap<String, Value>> {
    let mut entries: IndexMap<&str, &str> = IndexMap::new();
    for item in raw.split(options.item_separator.as_str()) {
        let (k, v) = item
            .split_once(options.value_separator.as_str())
            .ok_or_else(|| {
                Error::type_mismatch(
                    key,
                    tag,
                    format!(
                        "entry '{item}' has no '{}' separator",
                        options.value_separator
                    ),
                )
            })?;
        entries.insert(k, v);
    }

    match map {
        None => Ok(entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect()),
        Some(MapFn::Pair(f)) => {
            let mut mapped = IndexMap::with_capacity(entries.len());
            for (k, v) in entries {
                let (k, v) = f(k, v)?;
                mapped.insert(k, v);
            }
            Ok(mapped)
        },
        Some(MapFn::Item(_)) => Err(Error::type_mismatch(
            key,
            tag,
            "an item map cannot be applied to dict entries",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coerce_default(raw: &str, tag: &TypeTag) -> Result<Value> {
        coerce("KEY", raw, tag, None, &ParseOptions::default())
    }

    #[test]
    fn test_bool_any_case() {
        assert_eq!(coerce_default("YES", &TypeTag::Bool).unwrap(), Value::Bool(true));
        assert_eq!(coerce_default("oN", &TypeTag::Bool).unwrap(), Value::Bool(true));
        assert_eq!(coerce_default("nope", &TypeTag::Bool).unwrap(), Value::Bool(false));
        assert_eq!(coerce_default("", &TypeTag::Bool).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_list_keeps_order() {
        assert_eq!(
            coerce_default("a,b,c", &TypeTag::List).unwrap(),
            Value::from(vec!["a", "b", "c"])
        );
        assert_eq!(coerce_default("", &TypeTag::List).unwrap(), Value::from(vec![""]));
    }

    #[test]
    fn test_tuple_and_set() {
        assert_eq!(
            coerce_default("x,y", &TypeTag::Tuple).unwrap(),
            Value::Tuple(vec![Value::from("x"), Value::from("y")])
        );
        assert_eq!(
            coerce_default("b,a,b", &TypeTag::Set).unwrap(),
            Value::set(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_item_map() {
        let map = MapFn::items(|s| Ok(Value::Int(s.parse()?)));
        let value = coerce("KEY", "1,2,3", &TypeTag::List, Some(&map), &ParseOptions::default());
        assert_eq!(value.unwrap(), Value::from(vec![1i64, 2, 3]));

        let err = coerce("KEY", "1,x", &TypeTag::List, Some(&map), &ParseOptions::default());
        assert!(matches!(err, Err(Error::Application(_))));
    }

    #[test]
    fn test_dict_last_write_wins() {
        let mut expected = IndexMap::new();
        expected.insert("a".to_string(), Value::from("1"));
        expected.insert("b".to_string(), Value::from("2"));
        assert_eq!(
            coerce_default("a:1,b:2", &TypeTag::Dict).unwrap(),
            Value::Dict(expected)
        );

        let mut expected = IndexMap::new();
        expected.insert("a".to_string(), Value::from("2"));
        assert_eq!(
            coerce_default("a:1,a:2", &TypeTag::Dict).unwrap(),
            Value::Dict(expected)
        );
    }

    #[test]
    fn test_dict_splits_value_once() {
        let value = coerce_default("url:http://host:80", &TypeTag::Dict).unwrap();
        let Value::Dict(entries) = value else {
            panic!("expected dict");
        };
        assert_eq!(entries.get("url"), Some(&Value::from("http://host:80")));
    }

    #[test]
    fn test_dict_entry_without_separator() {
        let err = coerce_default("a:1,b", &TypeTag::Dict).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_pair_map() {
        let map = MapFn::pairs(|k, v| Ok((k.to_uppercase(), Value::Int(v.parse()?))));
        let value = coerce("KEY", "a:1,b:2", &TypeTag::Dict, Some(&map), &ParseOptions::default());
        let Value::Dict(entries) = value.unwrap() else {
            panic!("expected dict");
        };
        assert_eq!(entries.get("A"), Some(&Value::Int(1)));
        assert_eq!(entries.get("B"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_custom_separators() {
        let options = ParseOptions {
            item_separator: ";".to_string(),
            value_separator: "=".to_string(),
            ..ParseOptions::default()
        };
        let value = coerce("KEY", "a=1;b=2", &TypeTag::Dict, None, &options).unwrap();
        let Value::Dict(entries) = value else {
            panic!("expected dict");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(
            coerce("KEY", "a,b;c", &TypeTag::List, None, &options).unwrap(),
            Value::from(vec!["a,b", "c"])
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce_default(" 42 ", &TypeTag::Int).unwrap(), Value::Int(42));
        assert_eq!(coerce_default("2.5", &TypeTag::Float).unwrap(), Value::Float(2.5));
        assert!(matches!(
            coerce_default("forty", &TypeTag::Int),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_union_declared_order() {
        let int_first = TypeTag::union([TypeTag::Int, TypeTag::Str]);
        assert_eq!(coerce_default("42", &int_first).unwrap(), Value::Int(42));
        assert_eq!(coerce_default("abc", &int_first).unwrap(), Value::from("abc"));

        let str_first = TypeTag::union([TypeTag::Str, TypeTag::Int]);
        assert_eq!(coerce_default("42", &str_first).unwrap(), Value::from("42"));
    }

    #[test]
    fn test_union_all_alternatives_fail() {
        let tag = TypeTag::union([TypeTag::Int, TypeTag::Float]);
        let err = coerce_default("abc", &tag).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected, .. } if expected == "int | float"));
    }

    #[test]
    fn test_optional_never_builds_none() {
        let tag = TypeTag::optional(TypeTag::Int);
        assert_eq!(coerce_default("7", &tag).unwrap(), Value::Int(7));
        assert!(coerce_default("", &tag).is_err());
    }
}

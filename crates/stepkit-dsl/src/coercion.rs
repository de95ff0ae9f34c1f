// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Value coercion for step arguments.
//!
//! Callers hand arguments over as loosely-typed JSON (often strings read from
//! a form or a command line). Before a value is deserialized into a declared
//! argument type it is converted using the usual conventions:
//!
//! | From | To | Example |
//! |------|-----|---------|
//! | String | f64/f32 | `"1840"` → `1840.0` |
//! | String | i64/i32/etc | `"42"` → `42` |
//! | String | u64/u32/etc | `"100"` → `100` |
//! | String | bool | `"true"`, `"yes"`, `"on"`, `"1"` → `true`; `"false"`, `"no"`, `"off"`, `"0"` → `false` |
//! | Number/Bool | String | `42` → `"42"` |
//! | Number | bool | `1` → `true`, `0` → `false` |
//! | Float with no fraction | integer | `69.0` → `69` |
//!
//! Values that cannot be converted are returned unchanged; the subsequent
//! deserialization reports the mismatch.

use serde_json::{Number, Value};

use crate::step_meta::ArgumentMetadata;
use crate::type_names::{inner_type, normalize};

/// Coarse shape of a declared type, as far as coercion cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Float,
    Signed,
    Unsigned,
    Bool,
    Text,
    Optional(Box<TypeShape>),
    List(Box<TypeShape>),
    Other,
}

impl TypeShape {
    pub fn of(type_name: &str) -> Self {
        let name = normalize(type_name);
        if let Some(inner) = inner_type(&name, "Option") {
            return TypeShape::Optional(Box::new(TypeShape::of(inner)));
        }
        if let Some(inner) = inner_type(&name, "Vec") {
            return TypeShape::List(Box::new(TypeShape::of(inner)));
        }
        match name.as_str() {
            "f64" | "f32" => TypeShape::Float,
            "i64" | "i32" | "i16" | "i8" | "isize" | "i128" => TypeShape::Signed,
            "u64" | "u32" | "u16" | "u8" | "usize" | "u128" => TypeShape::Unsigned,
            "bool" => TypeShape::Bool,
            "String" | "str" | "&str" | "char" | "PathBuf" => TypeShape::Text,
            _ => TypeShape::Other,
        }
    }
}

/// Coerce a JSON value towards the declared type name.
///
/// ```
/// use serde_json::json;
/// use stepkit_dsl::coercion::coerce_to_type;
///
/// assert_eq!(coerce_to_type(json!("1840"), "f64"), json!(1840.0));
/// assert_eq!(coerce_to_type(json!(69), "String"), json!("69"));
/// ```
pub fn coerce_to_type(value: Value, type_name: &str) -> Value {
    coerce_to_shape(value, &TypeShape::of(type_name))
}

/// Coerce a JSON value towards an already computed shape
pub fn coerce_to_shape(value: Value, shape: &TypeShape) -> Value {
    if value.is_null() {
        return value;
    }

    match (shape, value) {
        (TypeShape::Optional(inner), value) => coerce_to_shape(value, inner),
        (TypeShape::List(inner), Value::Array(items)) => Value::Array(
            items
                .into_iter()
                .map(|item| coerce_to_shape(item, inner))
                .collect(),
        ),

        (TypeShape::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(s)),

        (TypeShape::Signed, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|i| Value::Number(Number::from(i)))
            .unwrap_or(Value::String(s)),
        (TypeShape::Signed, Value::Number(n)) => whole_number(&n)
            .map(|i| Value::Number(Number::from(i)))
            .unwrap_or(Value::Number(n)),

        (TypeShape::Unsigned, Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(|u| Value::Number(Number::from(u)))
            .unwrap_or(Value::String(s)),
        (TypeShape::Unsigned, Value::Number(n)) => whole_number(&n)
            .and_then(|i| u64::try_from(i).ok())
            .map(|u| Value::Number(Number::from(u)))
            .unwrap_or(Value::Number(n)),

        (TypeShape::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Value::Bool(true),
            "false" | "no" | "off" | "0" => Value::Bool(false),
            _ => Value::String(s),
        },
        (TypeShape::Bool, Value::Number(n)) => {
            let is_true = n
                .as_i64()
                .map(|i| i != 0)
                .unwrap_or_else(|| n.as_f64().is_some_and(|f| f != 0.0));
            Value::Bool(is_true)
        }

        (TypeShape::Text, Value::Number(n)) => Value::String(n.to_string()),
        (TypeShape::Text, Value::Bool(b)) => Value::String(b.to_string()),

        (_, value) => value,
    }
}

/// Integral value of a number, accepting floats without a fractional part
fn whole_number(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Coerce every named argument of a mapping according to its metadata.
///
/// Entries without metadata are left untouched.
pub fn coerce_arguments(
    mut arguments: serde_json::Map<String, Value>,
    metadata: &[ArgumentMetadata],
) -> serde_json::Map<String, Value> {
    for argument in metadata {
        if let Some(value) = arguments.remove(argument.name()) {
            arguments.insert(
                argument.name().to_string(),
                coerce_to_type(value, argument.declared_type()),
            );
        }
    }
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shapes() {
        assert_eq!(TypeShape::of("f32"), TypeShape::Float);
        assert_eq!(TypeShape::of("i32"), TypeShape::Signed);
        assert_eq!(TypeShape::of("usize"), TypeShape::Unsigned);
        assert_eq!(
            TypeShape::of("core::option::Option<alloc::string::String>"),
            TypeShape::Optional(Box::new(TypeShape::Text))
        );
        assert_eq!(
            TypeShape::of("Vec<bool>"),
            TypeShape::List(Box::new(TypeShape::Bool))
        );
        assert_eq!(TypeShape::of("ExampleContext"), TypeShape::Other);
    }

    #[test]
    fn test_string_to_numbers() {
        assert_eq!(coerce_to_type(json!("1840"), "f64"), json!(1840.0));
        assert_eq!(coerce_to_type(json!(" -42 "), "i32"), json!(-42));
        assert_eq!(coerce_to_type(json!("69"), "u8"), json!(69));
        assert_eq!(coerce_to_type(json!("1.5e-3"), "f64"), json!(0.0015));
    }

    #[test]
    fn test_unparseable_strings_are_left_alone() {
        assert_eq!(coerce_to_type(json!("abc"), "i64"), json!("abc"));
        assert_eq!(coerce_to_type(json!(""), "f64"), json!(""));
        assert_eq!(coerce_to_type(json!("-1"), "u32"), json!("-1"));
    }

    #[test]
    fn test_whole_floats_become_integers() {
        assert_eq!(coerce_to_type(json!(69.0), "i32"), json!(69));
        assert_eq!(coerce_to_type(json!(2.5), "i32"), json!(2.5));
        assert_eq!(coerce_to_type(json!(-3.0), "u16"), json!(-3.0));
    }

    #[test]
    fn test_scalars_to_text() {
        assert_eq!(coerce_to_type(json!(69), "String"), json!("69"));
        assert_eq!(coerce_to_type(json!(false), "Option<String>"), json!("false"));
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(coerce_to_type(json!("YES"), "bool"), json!(true));
        assert_eq!(coerce_to_type(json!(" 1 "), "bool"), json!(true));
        assert_eq!(coerce_to_type(json!("Off"), "bool"), json!(false));
        assert_eq!(coerce_to_type(json!("nope"), "bool"), json!("nope"));
        assert_eq!(coerce_to_type(json!(0), "bool"), json!(false));
        assert_eq!(coerce_to_type(json!(0.1), "bool"), json!(true));
    }

    #[test]
    fn test_null_and_objects_pass_through() {
        assert_eq!(coerce_to_type(Value::Null, "i32"), Value::Null);
        let obj = json!({"nested": "value"});
        assert_eq!(coerce_to_type(obj.clone(), "f64"), obj);
        assert_eq!(coerce_to_type(json!("x"), "Value"), json!("x"));
    }

    #[test]
    fn test_lists_coerce_each_item() {
        assert_eq!(
            coerce_to_type(json!(["1", "2", "x"]), "Vec<i64>"),
            json!([1, 2, "x"])
        );
        assert_eq!(coerce_to_type(json!("1"), "Vec<i64>"), json!("1"));
    }

    #[test]
    fn test_coerce_arguments_uses_metadata() {
        let metadata = vec![
            ArgumentMetadata::new("amount", "Amount", "", "i32"),
            ArgumentMetadata::new("name", "Name", "", "String"),
        ];
        let mut arguments = serde_json::Map::new();
        arguments.insert("amount".into(), json!("69"));
        arguments.insert("name".into(), json!(7));
        arguments.insert("extra".into(), json!("untouched"));

        let coerced = coerce_arguments(arguments, &metadata);
        assert_eq!(coerced["amount"], json!(69));
        assert_eq!(coerced["name"], json!("7"));
        assert_eq!(coerced["extra"], json!("untouched"));
    }
}

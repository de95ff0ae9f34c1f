// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Declared type names.
//!
//! Step metadata refers to types by their Rust spelling without module
//! paths (`String`, `Option<i32>`, `Vec<Value>`). Names coming from
//! `std::any::type_name` are normalized to that spelling.

/// The generic top type: an entry point returning it says nothing useful
/// about its result.
pub const TOP_TYPE: &str = "Value";

/// Normalized declared type name of `T`
pub fn of<T: ?Sized>() -> String {
    normalize(std::any::type_name::<T>())
}

/// Strips module paths and canonicalizes spacing.
///
/// `core::option::Option<alloc::string::String>` becomes `Option<String>`,
/// `HashMap<String,Value>` becomes `HashMap<String, Value>`.
pub fn normalize(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len());
    let mut token = String::new();
    let mut pending_space = false;

    let flush = |token: &mut String, out: &mut String, pending_space: &mut bool| {
        if token.is_empty() {
            return;
        }
        let last = token.rsplit("::").next().unwrap_or(token.as_str());
        if *pending_space && out.chars().last().is_some_and(|c| !"<([&, ".contains(c)) {
            out.push(' ');
        }
        out.push_str(last);
        token.clear();
        *pending_space = false;
    };

    for c in type_name.chars() {
        match c {
            ',' => {
                flush(&mut token, &mut out, &mut pending_space);
                out.push_str(", ");
                pending_space = false;
            }
            '<' | '>' | '(' | ')' | '[' | ']' | ';' | '&' => {
                flush(&mut token, &mut out, &mut pending_space);
                if c == '>' && out.ends_with(", ") {
                    out.truncate(out.len() - 2);
                }
                out.push(c);
                pending_space = false;
            }
            c if c.is_whitespace() => {
                flush(&mut token, &mut out, &mut pending_space);
                pending_space = true;
            }
            c => token.push(c),
        }
    }
    flush(&mut token, &mut out, &mut pending_space);
    out
}

/// Extracts `T` from `Wrapper<T>`.
pub fn inner_type<'a>(type_name: &'a str, wrapper: &str) -> Option<&'a str> {
    type_name
        .strip_prefix(wrapper)
        .and_then(|rest| rest.strip_prefix('<'))
        .and_then(|rest| rest.strip_suffix('>'))
        .map(str::trim)
}

/// Whether the name is the generic top type
pub fn is_top_type(type_name: &str) -> bool {
    normalize(type_name) == TOP_TYPE
}

const SCALARS: &[&str] = &[
    "bool", "char", "String", "str", "&str", "i8", "i16", "i32", "i64", "i128", "isize", "u8",
    "u16", "u32", "u64", "u128", "usize", "f32", "f64", "PathBuf", "()",
];

const MAPPINGS: &[&str] = &[
    "Value",
    "Map<String, Value>",
    "HashMap<String, Value>",
    "BTreeMap<String, Value>",
];

/// Whether the name denotes a type every registry understands without
/// asking a type loader: scalars, JSON values and mappings, and
/// `Option`/`Vec` of those.
pub fn is_builtin(type_name: &str) -> bool {
    let name = normalize(type_name);
    if SCALARS.contains(&name.as_str()) || MAPPINGS.contains(&name.as_str()) {
        return true;
    }
    ["Option", "Vec"]
        .iter()
        .find_map(|wrapper| inner_type(&name, wrapper))
        .is_some_and(is_builtin)
}

/// Whether a declared parameter type is a raw name→value mapping
pub fn is_mapping(type_name: &str) -> bool {
    MAPPINGS[1..].contains(&normalize(type_name).as_str())
}

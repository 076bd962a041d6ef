//! Output type naming.

use crate::options::TypeNaming;

/// Object name for a message declared in the compiled module.
pub fn object_name(type_name: &[String], naming: TypeNaming) -> String {
    match naming {
        TypeNaming::Pascal => type_name
            .iter()
            .map(|c| upper_first(c))
            .collect::<Vec<_>>()
            .join("_"),
        TypeNaming::Snake => snake_case(&type_name.join("_")),
    }
}

/// Object name for an inlined foreign message: `money` + `Money` -> `Money_Money`,
/// `google.type` + `LatLng` -> `GoogleType_LatLng`.
pub fn foreign_object_name(module: &str, type_name: &[String], naming: TypeNaming) -> String {
    let prefix: String = module.split('.').map(pascal_case).collect();
    let local = object_name(type_name, TypeNaming::Pascal);
    let joined = if prefix.is_empty() {
        local
    } else {
        format!("{prefix}_{local}")
    };
    match naming {
        TypeNaming::Pascal => joined,
        TypeNaming::Snake => snake_case(&joined),
    }
}

/// `LineItem` + `dish` -> `LineItemDish`.
///
/// `prefix` is the Pascal form of the owning object's name in every naming
/// mode, so snake-named schemas still get `LineItemDish`.
pub fn union_name(prefix: &str, group: &str) -> String {
    format!("{prefix}{}", pascal_case(group))
}

/// `payment_method` -> `PaymentMethod`.
pub fn pascal_case(s: &str) -> String {
    s.split('_').map(upper_first).collect()
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `LineItem` -> `line_item`, `HTTPServer` -> `http_server`.
///
/// An underscore goes before an upper-case letter that follows a lower-case
/// one or precedes one. Existing underscores are kept as they are, so
/// `Outer_Inner` becomes `outer__inner`.
pub fn snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev_lower = chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev_lower || next_lower {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

//! Naming conventions between record type names, URL path segments, and table names.
//!
//! `OrderItem` <-> `order-item` <-> `OrderItem`. Consecutive capitals each get a
//! separator on the way out, so ALL-CAPS names do not survive a round trip
//! (`ABC` -> `a-bc` -> `ABc`).

const SEPARATOR: char = '-';

/// Type name to URL path segment.
/// e.g. "OrderItem" -> "order-item", "Parent" -> "parent", "model.Parent" -> "model-parent"
pub fn to_path_name(type_name: &str) -> String {
    let chars: Vec<char> = type_name.chars().collect();
    let last = chars.len().saturating_sub(1);
    let mut out = String::with_capacity(type_name.len() + 4);
    for (i, c) in chars.into_iter().enumerate() {
        if c == '.' {
            out.push(SEPARATOR);
            continue;
        }
        if i > 0 && i < last && c.is_uppercase() {
            out.push(SEPARATOR);
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// URL path segment to type name (first character left lower-case).
/// e.g. "order-item" -> "orderItem", "parent" -> "parent"
pub fn to_type_name(path_name: &str) -> String {
    let mut out = String::with_capacity(path_name.len());
    let mut capitalize_next = false;
    for c in path_name.chars() {
        if c == SEPARATOR {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// URL path segment to storage table name.
/// e.g. "order-item" -> "OrderItem"
pub fn to_table_name(path_name: &str) -> String {
    let type_name = to_type_name(path_name);
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Simple name of a possibly qualified type name ("org.shop.OrderItem" -> "OrderItem").
pub fn simple_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_name_from_single_word() {
        assert_eq!(to_path_name("Parent"), "parent");
        assert_eq!(to_path_name("Child"), "child");
    }

    #[test]
    fn path_name_inserts_separator_before_inner_capitals() {
        assert_eq!(to_path_name("OrderItem"), "order-item");
        assert_eq!(to_path_name("PurchaseOrderLine"), "purchase-order-line");
    }

    #[test]
    fn path_name_rewrites_dots() {
        assert_eq!(to_path_name("shop.OrderItem"), "shop--order-item");
        assert_eq!(to_path_name("a.b"), "a-b");
    }

    #[test]
    fn path_name_never_prefixes_last_character() {
        assert_eq!(to_path_name("AbC"), "abc");
        assert_eq!(to_path_name("ABC"), "a-bc");
    }

    #[test]
    fn type_and_table_names() {
        assert_eq!(to_type_name("order-item"), "orderItem");
        assert_eq!(to_table_name("order-item"), "OrderItem");
        assert_eq!(to_table_name("parent"), "Parent");
        assert_eq!(to_table_name(""), "");
    }

    #[test]
    fn dashed_lowercase_names_round_trip() {
        for s in ["parent", "order-item", "ab-cd", "purchase-order-line", "x"] {
            assert_eq!(to_path_name(&to_table_name(s)), s, "round trip of {s}");
        }
    }

    #[test]
    fn all_caps_names_do_not_round_trip() {
        let path = to_path_name("ABC");
        assert_ne!(to_table_name(&path), "ABC");
    }

    #[test]
    fn simple_name_strips_qualifier() {
        assert_eq!(simple_name("org.shop.OrderItem"), "OrderItem");
        assert_eq!(simple_name("Parent"), "Parent");
    }
}

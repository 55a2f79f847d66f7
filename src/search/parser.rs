//! Query string -> filter expression.
//!
//! `?.search&name=p&name=q&name.1=LIKE&age=3&age.0=>=`
//! Plain keys add an EQUAL predicate per value. `column.N=op` sets the operator
//! of the N-th predicate (in arrival order) of that column.

use crate::config::TypeDescriptor;
use crate::error::AppError;
use crate::search::{FilterExpression, Operator, Predicate};
use std::collections::HashSet;

/// Query key that turns a collection GET into a search.
pub const SEARCH_MARKER: &str = ".search";

pub fn is_search(params: &[(String, String)]) -> bool {
    params.iter().any(|(k, _)| k.eq_ignore_ascii_case(SEARCH_MARKER))
}

/// `name.0` -> Some(("name", "0")). The second dot-separated part must be all digits.
fn split_operator_key(key: &str) -> Option<(&str, &str)> {
    let mut parts = key.split('.');
    let column = parts.next()?;
    let index = parts.next()?;
    index
        .chars()
        .all(|c| c.is_ascii_digit())
        .then_some((column, index))
}

pub fn parse(
    params: &[(String, String)],
    ty: &TypeDescriptor,
) -> Result<FilterExpression, AppError> {
    let mut columns: Vec<(String, Vec<Predicate>)> = Vec::new();

    for (key, value) in params {
        if key.eq_ignore_ascii_case(SEARCH_MARKER) || split_operator_key(key).is_some() {
            continue;
        }
        // hidden fields are not searchable either
        if !ty.column(key).is_some_and(|c| !c.json_ignore) {
            return Err(AppError::InvalidSearch(format!(
                "{} has no column {}",
                ty.type_name, key
            )));
        }
        let predicate = Predicate::new(key.as_str(), value.as_str());
        match columns.iter_mut().find(|(c, _)| c == key) {
            Some((_, list)) => list.push(predicate),
            None => columns.push((key.clone(), vec![predicate])),
        }
    }

    let mut applied: HashSet<&str> = HashSet::new();
    for (key, value) in params {
        let Some((column, index)) = split_operator_key(key) else {
            continue;
        };
        // a repeated operator key keeps its first value
        if !applied.insert(key.as_str()) {
            continue;
        }
        let list = columns
            .iter_mut()
            .find(|(c, _)| c == column)
            .map(|(_, list)| list)
            .ok_or_else(|| AppError::InvalidSearch(format!("{key}: no value given for {column}")))?;
        let occurrences = list.len();
        let i = index
            .parse::<usize>()
            .ok()
            .filter(|i| *i < occurrences)
            .ok_or_else(|| AppError::InvalidSearch(format!("{key}: no such occurrence of {column}")))?;
        list[i].operator = Operator::from_symbol(value)
            .ok_or_else(|| AppError::InvalidSearch(format!("{key}: unknown operator '{value}'")))?;
    }

    let predicates: Vec<Predicate> = columns.into_iter().flat_map(|(_, list)| list).collect();
    for p in &predicates {
        if p.operator == Operator::Like {
            continue;
        }
        if let Some(column) = ty.column(&p.column) {
            column.field_type.parse(&p.value).map_err(|e| {
                AppError::InvalidSearch(format!("{}: {}", p.column, e))
            })?;
        }
    }

    Ok(FilterExpression { predicates })
}

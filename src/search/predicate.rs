//! Filter predicates and their textual rendering.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    Like,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Like,
        Operator::Equal,
        Operator::Greater,
        Operator::Less,
        Operator::GreaterOrEqual,
        Operator::LessOrEqual,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Like => "LIKE",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
        }
    }

    /// Exact, case-sensitive match on the symbol; `None` for anything else.
    pub fn from_symbol(s: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.symbol() == s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub value: String,
}

impl Predicate {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate {
            column: column.into(),
            operator: Operator::Equal,
            value: value.into(),
        }
    }

    /// Bound parameter for this predicate: LIKE matches anywhere in the value.
    pub fn operand(&self) -> String {
        match self.operator {
            Operator::Like => format!("%{}%", self.value),
            _ => self.value.clone(),
        }
    }
}

/// ` name = 'p' ` / ` name LIKE '%p%' `. Quotes in values are doubled.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " {} {} '{}' ",
            self.column,
            self.operator,
            self.operand().replace('\'', "''")
        )
    }
}

/// Conjunction of predicates, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterExpression {
    pub predicates: Vec<Predicate>,
}

impl FilterExpression {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }
}

/// Diagnostic WHERE text: predicates are concatenated without `AND`.
/// Queries never use this text; see `sql::builder`.
impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return Ok(());
        }
        f.write_str(" WHERE ")?;
        for p in &self.predicates {
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

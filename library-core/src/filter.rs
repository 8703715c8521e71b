//! Filter parser for `filter[<field>]` / `filter[<field>][<op>]` query keys

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::pagination::Pagination;

static FILTER_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^filter\[(.+?)\](?:\[(.+?)\])?$").expect("invalid filter key regex")
});

/// Comparison operator of a filter predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Neq,
    /// Substring match; the value is bound as `%value%`
    Like,
    /// Unrecognized token, emitted verbatim as the SQL operator
    Raw(String),
}

impl Operator {
    /// Map a wire operator token to an operator.
    pub fn from_token(token: &str) -> Self {
        match token {
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "neq" => Self::Neq,
            "fuzzy" | "like" => Self::Like,
            other => Self::Raw(other.to_owned()),
        }
    }

    /// SQL spelling of the operator
    pub fn as_sql(&self) -> &str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Neq => "!=",
            Self::Like => "LIKE",
            Self::Raw(op) => op,
        }
    }
}

/// One parsed query predicate.
///
/// `field` keys stay in wire casing; the compiler converts them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDescriptor {
    /// `filter[field]=value`
    Equality(String),
    /// `filter[field][op]=value`
    Operator { op: Operator, value: String },
}

impl FilterDescriptor {
    pub fn operator(&self) -> Operator {
        match self {
            Self::Equality(_) => Operator::Eq,
            Self::Operator { op, .. } => op.clone(),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Equality(value) => value,
            Self::Operator { value, .. } => value,
        }
    }
}

/// Parsed request query: filters by field, plus every other key untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub filters: BTreeMap<String, FilterDescriptor>,
    /// Keys without the `filter[...]` wrapper (`page[number]`, `page[size]`, ...)
    pub params: BTreeMap<String, String>,
}

impl ParsedQuery {
    /// Pagination derived from `page[number]` / `page[size]`
    pub fn pagination(&self) -> Pagination {
        Pagination::from_params(&self.params)
    }
}

/// Parse raw query parameters into filter descriptors.
///
/// Later keys targeting the same field replace earlier ones.
pub fn parse<I, K, V>(raw: I) -> ParsedQuery
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut parsed = ParsedQuery::default();

    for (key, value) in raw {
        let key = key.as_ref();
        let value = value.into();

        match FILTER_KEY_RE.captures(key) {
            Some(caps) => {
                let field = caps[1].to_owned();
                let descriptor = match caps.get(2) {
                    Some(token) => FilterDescriptor::Operator {
                        op: Operator::from_token(token.as_str()),
                        value,
                    },
                    None => FilterDescriptor::Equality(value),
                };
                parsed.filters.insert(field, descriptor);
            }
            None => {
                parsed.params.insert(key.to_owned(), value);
            }
        }
    }

    parsed
}

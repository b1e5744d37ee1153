//! Filter clauses and the permissive `key:value` token parser.
//!
//! Parsing never fails. Tokens that reference unknown fields, or whose value
//! does not coerce to the field type, are dropped with a `warn!` diagnostic so
//! loosely-typed legacy query strings keep working.

use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

use crate::limits::QueryLimits;
use crate::schema::{EntitySchema, Record};
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Case-insensitive substring match on the textual value.
    Contains,
}

impl FilterOp {
    // Longest suffixes first so `_gte` is not read as `_gt` + "e".
    const SUFFIXES: [(&'static str, FilterOp); 5] = [
        ("_gte", FilterOp::Ge),
        ("_lte", FilterOp::Le),
        ("_gt", FilterOp::Gt),
        ("_lt", FilterOp::Lt),
        ("_ne", FilterOp::Ne),
    ];

    /// Split a comparison suffix off a filter key: `price_gte` -> (`price`, `Ge`).
    #[must_use]
    pub fn split_suffix(key: &str) -> Option<(&str, FilterOp)> {
        Self::SUFFIXES.iter().find_map(|(suffix, op)| {
            key.strip_suffix(suffix)
                .filter(|base| !base.is_empty())
                .map(|base| (base, *op))
        })
    }

    /// Apply the operator to a record value (`actual`) and a clause operand.
    ///
    /// Ordering operators are false whenever the two values are incomparable.
    #[must_use]
    pub fn test(self, actual: &Value, operand: &Value) -> bool {
        let ordered = |accept: fn(Ordering) -> bool| actual.compare(operand).is_some_and(accept);
        match self {
            FilterOp::Eq => ordered(Ordering::is_eq),
            FilterOp::Ne => ordered(Ordering::is_ne),
            FilterOp::Gt => ordered(Ordering::is_gt),
            FilterOp::Ge => ordered(Ordering::is_ge),
            FilterOp::Lt => ordered(Ordering::is_lt),
            FilterOp::Le => ordered(Ordering::is_le),
            FilterOp::Contains => contains_text(actual, operand),
        }
    }
}

fn contains_text(actual: &Value, operand: &Value) -> bool {
    let (Some(haystack), Some(needle)) = (actual.to_text(), operand.to_text()) else {
        return false;
    };
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Eq => write!(f, "eq"),
            FilterOp::Ne => write!(f, "ne"),
            FilterOp::Gt => write!(f, "gt"),
            FilterOp::Ge => write!(f, "gte"),
            FilterOp::Lt => write!(f, "lt"),
            FilterOp::Le => write!(f, "lte"),
            FilterOp::Contains => write!(f, "contains"),
        }
    }
}

/// One validated predicate: `field op value`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FilterClause {
    #[must_use]
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn matches<R: Record>(&self, row: &R) -> bool {
        self.op.test(&row.value(&self.field), &self.value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterNode {
    Clause(FilterClause),
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
}

impl FilterNode {
    #[must_use]
    pub fn clause(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        FilterNode::Clause(FilterClause::new(field, op, value))
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(field, FilterOp::Eq, value)
    }

    #[must_use]
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::And(children)
    }

    #[must_use]
    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Or(children)
    }

    /// `self AND other`, flattening nested conjunctions.
    #[must_use]
    pub fn and_with(self, other: FilterNode) -> Self {
        match (self, other) {
            (FilterNode::And(mut left), FilterNode::And(right)) => {
                left.extend(right);
                FilterNode::And(left)
            }
            (FilterNode::And(mut left), other) => {
                left.push(other);
                FilterNode::And(left)
            }
            (this, FilterNode::And(mut right)) => {
                right.insert(0, this);
                FilterNode::And(right)
            }
            (this, other) => FilterNode::And(vec![this, other]),
        }
    }

    /// An empty `And` matches everything; an empty `Or` matches nothing.
    #[must_use]
    pub fn matches<R: Record>(&self, row: &R) -> bool {
        match self {
            FilterNode::Clause(c) => c.matches(row),
            FilterNode::And(children) => children.iter().all(|c| c.matches(row)),
            FilterNode::Or(children) => children.iter().any(|c| c.matches(row)),
        }
    }

    #[must_use]
    pub fn clause_count(&self) -> usize {
        match self {
            FilterNode::Clause(_) => 1,
            FilterNode::And(children) | FilterNode::Or(children) => {
                children.iter().map(FilterNode::clause_count).sum()
            }
        }
    }
}

/// A raw filter parameter as received from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterParam {
    /// A single `key:value` or free-text token.
    Token(String),
    /// A list of raw values (GET-many semantics).
    Many(Vec<String>),
}

impl From<&str> for FilterParam {
    fn from(raw: &str) -> Self {
        FilterParam::Token(raw.to_owned())
    }
}

impl From<String> for FilterParam {
    fn from(raw: String) -> Self {
        FilterParam::Token(raw)
    }
}

impl From<Vec<String>> for FilterParam {
    fn from(values: Vec<String>) -> Self {
        FilterParam::Many(values)
    }
}

/// Translate raw filter parameters into a single conjunction.
///
/// Returns `None` when no parameter produced a valid clause, in which case
/// the query is unfiltered.
#[must_use]
pub fn parse_filters(
    schema: &EntitySchema,
    params: &[FilterParam],
    limits: &QueryLimits,
) -> Option<FilterNode> {
    if params.len() > limits.max_filter_tokens {
        warn!(
            entity = schema.name(),
            supplied = params.len(),
            max = limits.max_filter_tokens,
            "dropping filter tokens beyond the configured maximum"
        );
    }

    let mut nodes: Vec<FilterNode> = params
        .iter()
        .take(limits.max_filter_tokens)
        .filter_map(|param| match param {
            FilterParam::Token(raw) => parse_token(schema, raw),
            FilterParam::Many(values) => parse_many(schema, values),
        })
        .collect();

    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(FilterNode::And(nodes)),
    }
}

/// Parse one token. The token is split on its first `:`.
#[must_use]
pub fn parse_token(schema: &EntitySchema, raw: &str) -> Option<FilterNode> {
    match raw.split_once(':') {
        Some((key, value)) => parse_keyed(schema, key.trim(), value),
        None => free_text(schema, raw),
    }
}

fn parse_keyed(schema: &EntitySchema, key: &str, value: &str) -> Option<FilterNode> {
    if let Some((base, op)) = FilterOp::split_suffix(key)
        && let Some(def) = schema.field(base)
    {
        let Some(operand) = Value::coerce(def.kind, value) else {
            warn!(
                entity = schema.name(),
                field = def.name,
                kind = %def.kind,
                value,
                "dropping filter: value does not coerce to field type"
            );
            return None;
        };
        return Some(FilterNode::clause(def.name, op, operand));
    }

    if let Some(def) = schema.field(key) {
        return Some(FilterNode::clause(
            def.name,
            FilterOp::Contains,
            Value::String(value.to_owned()),
        ));
    }

    warn!(
        entity = schema.name(),
        field = key,
        "dropping filter on unknown field"
    );
    None
}

/// OR'd case-insensitive substring match across every field of the entity.
fn free_text(schema: &EntitySchema, raw: &str) -> Option<FilterNode> {
    let needle = raw.trim();
    if needle.is_empty() {
        return None;
    }
    let children = schema
        .fields()
        .iter()
        .map(|f| FilterNode::clause(f.name, FilterOp::Contains, needle))
        .collect();
    Some(FilterNode::Or(children))
}

/// GET-many: `id IN (values)` when the entity has a literal `id` field,
/// otherwise each value is a free-text token and the results are OR'd.
fn parse_many(schema: &EntitySchema, values: &[String]) -> Option<FilterNode> {
    if values.is_empty() {
        return None;
    }

    let Some(id) = schema.field_exact("id") else {
        let children: Vec<_> = values
            .iter()
            .filter_map(|raw| free_text(schema, raw))
            .collect();
        return (!children.is_empty()).then_some(FilterNode::Or(children));
    };

    let children = values
        .iter()
        .filter_map(|raw| {
            let coerced = Value::coerce(id.kind, raw);
            if coerced.is_none() {
                warn!(
                    entity = schema.name(),
                    value = raw.as_str(),
                    "dropping id from GET-many filter: not a valid identifier"
                );
            }
            coerced
        })
        .map(|v| FilterNode::clause(id.name, FilterOp::Eq, v))
        .collect();

    // All ids invalid: an empty OR matches nothing rather than everything.
    Some(FilterNode::Or(children))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldKind};
    use tracing_test::traced_test;
    use uuid::Uuid;

    const ITEM_FIELDS: &[FieldDef] = &[
        FieldDef::new("id", FieldKind::Uuid),
        FieldDef::new("name", FieldKind::String),
        FieldDef::new("price", FieldKind::F64),
        FieldDef::new("stock", FieldKind::I64),
    ];
    static ITEM: EntitySchema = EntitySchema::new("item", ITEM_FIELDS);

    struct Item {
        id: Uuid,
        name: &'static str,
        price: f64,
        stock: i64,
    }

    impl Record for Item {
        fn schema() -> &'static EntitySchema {
            &ITEM
        }

        fn value(&self, field: &str) -> Value {
            match field {
                "id" => self.id.into(),
                "name" => self.name.into(),
                "price" => self.price.into(),
                "stock" => self.stock.into(),
                _ => Value::Null,
            }
        }
    }

    // No `id` field, so GET-many falls back to free text.
    const TAG_FIELDS: &[FieldDef] = &[
        FieldDef::new("name", FieldKind::String),
        FieldDef::new("colour", FieldKind::String),
    ];
    static TAG: EntitySchema = EntitySchema::new("tag", TAG_FIELDS);

    struct Tag {
        name: &'static str,
        colour: &'static str,
    }

    impl Record for Tag {
        fn schema() -> &'static EntitySchema {
            &TAG
        }

        fn value(&self, field: &str) -> Value {
            match field {
                "name" => self.name.into(),
                "colour" => self.colour.into(),
                _ => Value::Null,
            }
        }
    }

    fn item(name: &'static str, price: f64, stock: i64) -> Item {
        Item {
            id: Uuid::new_v4(),
            name,
            price,
            stock,
        }
    }

    #[test]
    fn test_split_suffix_prefers_longest() {
        assert_eq!(
            FilterOp::split_suffix("price_gte"),
            Some(("price", FilterOp::Ge))
        );
        assert_eq!(
            FilterOp::split_suffix("price_gt"),
            Some(("price", FilterOp::Gt))
        );
        assert_eq!(FilterOp::split_suffix("_ne"), None);
        assert_eq!(FilterOp::split_suffix("price"), None);
    }

    #[test]
    fn test_bare_field_becomes_contains() {
        let node = parse_token(&ITEM, "NAME:Wid").unwrap();
        assert_eq!(node, FilterNode::clause("name", FilterOp::Contains, "Wid"));
        assert!(node.matches(&item("blue widget", 1.0, 1)));
        assert!(!node.matches(&item("gadget", 1.0, 1)));
    }

    #[test]
    fn test_value_is_split_on_first_colon_only() {
        let node = parse_token(&ITEM, "name:a:b").unwrap();
        assert_eq!(node, FilterNode::clause("name", FilterOp::Contains, "a:b"));
    }

    #[test]
    fn test_suffix_comparisons() {
        let gte = parse_token(&ITEM, "price_gte:2.5").unwrap();
        let lt = parse_token(&ITEM, "stock_lt:10").unwrap();
        let ne = parse_token(&ITEM, "stock_ne:3").unwrap();

        let cheap = item("a", 1.0, 3);
        let dear = item("b", 2.5, 12);
        assert!(!gte.matches(&cheap));
        assert!(gte.matches(&dear));
        assert!(lt.matches(&cheap));
        assert!(!lt.matches(&dear));
        assert!(!ne.matches(&cheap));
        assert!(ne.matches(&dear));
    }

    #[test]
    #[traced_test]
    fn test_unknown_field_is_dropped_with_warning() {
        assert!(parse_token(&ITEM, "colour:red").is_none());
        assert!(logs_contain("dropping filter on unknown field"));
    }

    #[test]
    #[traced_test]
    fn test_uncoercible_comparison_is_dropped() {
        assert!(parse_token(&ITEM, "price_gt:cheap").is_none());
        assert!(logs_contain("does not coerce"));
    }

    #[test]
    fn test_free_text_matches_any_field() {
        let node = parse_token(&ITEM, "idg").unwrap();
        assert!(matches!(node, FilterNode::Or(_)));
        assert_eq!(node.clause_count(), 4);
        assert!(node.matches(&item("widget", 1.0, 1)));
        assert!(!node.matches(&item("gadget", 1.0, 1)));

        let by_stock = parse_token(&ITEM, "42").unwrap();
        assert!(by_stock.matches(&item("x", 1.0, 420)));
    }

    #[test]
    fn test_many_matches_ids() {
        let a = item("a", 1.0, 1);
        let b = item("b", 1.0, 1);
        let c = item("c", 1.0, 1);
        let node = parse_many(&ITEM, &[a.id.to_string(), b.id.to_string()]).unwrap();
        assert!(node.matches(&a));
        assert!(node.matches(&b));
        assert!(!node.matches(&c));
    }

    #[test]
    fn test_many_without_id_field_ors_free_text() {
        let node = parse_many(&TAG, &["red".to_owned(), "blue".to_owned()]).unwrap();
        let tag = |name, colour| Tag { name, colour };
        assert!(node.matches(&tag("sale", "red")));
        assert!(node.matches(&tag("bluebell", "green")));
        assert!(!node.matches(&tag("sale", "green")));
    }

    #[test]
    fn test_many_with_only_invalid_ids_matches_nothing() {
        let node = parse_many(&ITEM, &["nope".to_owned()]).unwrap();
        assert!(!node.matches(&item("a", 1.0, 1)));
    }

    #[test]
    fn test_parse_filters_ands_tokens_and_skips_invalid() {
        let params = vec![
            FilterParam::from("name:w"),
            FilterParam::from("bogus:1"),
            FilterParam::from("price_lte:5"),
        ];
        let node = parse_filters(&ITEM, &params, &QueryLimits::default()).unwrap();
        assert_eq!(node.clause_count(), 2);
        assert!(node.matches(&item("widget", 5.0, 1)));
        assert!(!node.matches(&item("widget", 5.5, 1)));
        assert!(!node.matches(&item("gadget", 1.0, 1)));
    }

    #[test]
    fn test_parse_filters_only_invalid_is_none() {
        let params = vec![FilterParam::from("bogus:1")];
        let limits = QueryLimits::default();
        assert!(parse_filters(&ITEM, &params, &limits).is_none());
    }

    #[test]
    fn test_parse_filters_respects_token_cap() {
        let limits = QueryLimits::default().with_max_filter_tokens(1);
        let params = vec![FilterParam::from("name:w"), FilterParam::from("stock_gt:1")];
        let node = parse_filters(&ITEM, &params, &limits).unwrap();
        assert_eq!(node.clause_count(), 1);
    }

    #[test]
    fn test_and_with_flattens() {
        let a = FilterNode::eq("name", "a");
        let b = FilterNode::eq("name", "b");
        let c = FilterNode::eq("name", "c");
        let combined = FilterNode::and(vec![a, b]).and_with(c);
        assert!(matches!(combined, FilterNode::And(_)));
        assert_eq!(combined.clause_count(), 3);
    }

    #[test]
    fn test_null_never_matches_comparisons() {
        assert!(!FilterOp::Ne.test(&Value::Null, &Value::I64(1)));
        assert!(!FilterOp::Contains.test(&Value::Null, &Value::from("x")));
    }

    #[test]
    fn test_operators_on_comparable_values() {
        let five = Value::I64(5);
        assert!(FilterOp::Eq.test(&five, &Value::F64(5.0)));
        assert!(FilterOp::Le.test(&five, &Value::I64(5)));
        assert!(!FilterOp::Gt.test(&five, &Value::I64(5)));

        let text = Value::from("Blue Widget");
        assert!(FilterOp::Contains.test(&text, &Value::from("WIDG")));
    }
}

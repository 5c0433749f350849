//! Declarative filter and sort intents.
//!
//! # Responsibility
//! - Compose typed predicates with logical AND.
//! - Render predicates and orderings into SQL fragments plus bind values.
//!
//! # Invariants
//! - Every literal is bound as a parameter; only column names from
//!   [`EntityField`] are spliced into SQL text.
//! - Join clauses are deduplicated and emitted in first-use order.

use crate::model::entity::EntityField;
use rusqlite::types::Value;

/// Conversion into a bound SQL value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One filter condition over a typed field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<F> {
    Eq(F, Value),
    Ne(F, Value),
    Gt(F, Value),
    Ge(F, Value),
    Lt(F, Value),
    Le(F, Value),
    Between(F, Value, Value),
    In(F, Vec<Value>),
    IsNull(F),
    IsNotNull(F),
    Like(F, String),
}

impl<F: EntityField> Predicate<F> {
    pub fn field(&self) -> F {
        match self {
            Self::Eq(field, _)
            | Self::Ne(field, _)
            | Self::Gt(field, _)
            | Self::Ge(field, _)
            | Self::Lt(field, _)
            | Self::Le(field, _)
            | Self::Between(field, _, _)
            | Self::In(field, _)
            | Self::IsNull(field)
            | Self::IsNotNull(field)
            | Self::Like(field, _) => *field,
        }
    }

    fn render(&self, sql: &mut String, binds: &mut Vec<Value>) {
        let column = self.field().column();
        match self {
            // `= NULL` never matches; a missing value compares with IS [NOT] NULL.
            Self::Eq(_, Value::Null) => sql.push_str(&format!("{column} IS NULL")),
            Self::Ne(_, Value::Null) => sql.push_str(&format!("{column} IS NOT NULL")),
            Self::Eq(_, value) => push_comparison(sql, binds, column, "=", value),
            Self::Ne(_, value) => push_comparison(sql, binds, column, "<>", value),
            Self::Gt(_, value) => push_comparison(sql, binds, column, ">", value),
            Self::Ge(_, value) => push_comparison(sql, binds, column, ">=", value),
            Self::Lt(_, value) => push_comparison(sql, binds, column, "<", value),
            Self::Le(_, value) => push_comparison(sql, binds, column, "<=", value),
            Self::Between(_, low, high) => {
                sql.push_str(&format!("{column} BETWEEN ? AND ?"));
                binds.push(low.clone());
                binds.push(high.clone());
            }
            Self::In(_, values) if values.is_empty() => {
                // `IN ()` is invalid SQL; an empty collection matches nothing.
                sql.push_str("0 = 1");
            }
            Self::In(_, values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{column} IN ({placeholders})"));
                binds.extend(values.iter().cloned());
            }
            Self::IsNull(_) => sql.push_str(&format!("{column} IS NULL")),
            Self::IsNotNull(_) => sql.push_str(&format!("{column} IS NOT NULL")),
            Self::Like(_, pattern) => {
                sql.push_str(&format!("{column} LIKE ?"));
                binds.push(Value::Text(pattern.clone()));
            }
        }
    }
}

fn push_comparison(sql: &mut String, binds: &mut Vec<Value>, column: &str, op: &str, value: &Value) {
    sql.push_str(&format!("{column} {op} ?"));
    binds.push(value.clone());
}

/// Logical AND of predicates. Empty criteria match every row.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria<F> {
    predicates: Vec<Predicate<F>>,
}

impl<F> Default for Criteria<F> {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }
}

impl<F: EntityField> Criteria<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate<F>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn eq(self, field: F, value: impl IntoValue) -> Self {
        self.and(Predicate::Eq(field, value.into_value()))
    }

    pub fn ne(self, field: F, value: impl IntoValue) -> Self {
        self.and(Predicate::Ne(field, value.into_value()))
    }

    pub fn gt(self, field: F, value: impl IntoValue) -> Self {
        self.and(Predicate::Gt(field, value.into_value()))
    }

    pub fn ge(self, field: F, value: impl IntoValue) -> Self {
        self.and(Predicate::Ge(field, value.into_value()))
    }

    pub fn lt(self, field: F, value: impl IntoValue) -> Self {
        self.and(Predicate::Lt(field, value.into_value()))
    }

    pub fn le(self, field: F, value: impl IntoValue) -> Self {
        self.and(Predicate::Le(field, value.into_value()))
    }

    pub fn between(self, field: F, low: impl IntoValue, high: impl IntoValue) -> Self {
        self.and(Predicate::Between(field, low.into_value(), high.into_value()))
    }

    pub fn in_list<V: IntoValue>(self, field: F, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(IntoValue::into_value).collect();
        self.and(Predicate::In(field, values))
    }

    pub fn is_null(self, field: F) -> Self {
        self.and(Predicate::IsNull(field))
    }

    pub fn is_not_null(self, field: F) -> Self {
        self.and(Predicate::IsNotNull(field))
    }

    pub fn like(self, field: F, pattern: impl Into<String>) -> Self {
        self.and(Predicate::Like(field, pattern.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate<F>] {
        &self.predicates
    }

    /// Renders ` WHERE ...` (leading space) or an empty string.
    pub fn render_where(&self, binds: &mut Vec<Value>) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }

        let mut sql = String::from(" WHERE ");
        for (index, predicate) in self.predicates.iter().enumerate() {
            if index > 0 {
                sql.push_str(" AND ");
            }
            predicate.render(&mut sql, binds);
        }
        sql
    }

    pub(crate) fn collect_joins(&self, joins: &mut Vec<&'static str>) {
        for predicate in &self.predicates {
            push_join(joins, predicate.field().join());
        }
    }

    pub fn needs_join(&self) -> bool {
        self.predicates
            .iter()
            .any(|predicate| predicate.field().join().is_some())
    }
}

/// One ordering term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order<F> {
    pub field: F,
    pub direction: Direction,
}

/// Ordered list of sort terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort<F> {
    orders: Vec<Order<F>>,
}

impl<F> Default for Sort<F> {
    fn default() -> Self {
        Self { orders: Vec::new() }
    }
}

impl<F: EntityField> Sort<F> {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(field: F, direction: Direction) -> Self {
        Self::unsorted().then(field, direction)
    }

    pub fn asc(field: F) -> Self {
        Self::by(field, Direction::Asc)
    }

    pub fn desc(field: F) -> Self {
        Self::by(field, Direction::Desc)
    }

    pub fn then(mut self, field: F, direction: Direction) -> Self {
        self.orders.push(Order { field, direction });
        self
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn orders(&self) -> &[Order<F>] {
        &self.orders
    }

    /// Renders ` ORDER BY ...` ending with `tie_break ASC` unless the sort
    /// already names that column.
    pub fn render_order_by(&self, tie_break: &str) -> String {
        let mut terms: Vec<String> = self
            .orders
            .iter()
            .map(|order| format!("{} {}", order.field.column(), order.direction.sql()))
            .collect();
        if !self
            .orders
            .iter()
            .any(|order| order.field.column() == tie_break)
        {
            terms.push(format!("{tie_break} ASC"));
        }
        format!(" ORDER BY {}", terms.join(", "))
    }

    pub(crate) fn collect_joins(&self, joins: &mut Vec<&'static str>) {
        for order in &self.orders {
            push_join(joins, order.field.join());
        }
    }
}

pub(crate) fn push_join(joins: &mut Vec<&'static str>, join: Option<&'static str>) {
    if let Some(join) = join {
        if !joins.contains(&join) {
            joins.push(join);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Criteria, Direction, Sort};
    use crate::model::member::MemberField;
    use rusqlite::types::Value;

    #[test]
    fn empty_criteria_render_nothing() {
        let mut binds = Vec::new();
        let criteria: Criteria<MemberField> = Criteria::new();
        assert_eq!(criteria.render_where(&mut binds), "");
        assert!(binds.is_empty());
    }

    #[test]
    fn predicates_are_joined_with_and() {
        let mut binds = Vec::new();
        let criteria = Criteria::new()
            .eq(MemberField::Username, "AAA")
            .gt(MemberField::Age, 15);

        let sql = criteria.render_where(&mut binds);
        assert_eq!(sql, " WHERE m.username = ? AND m.age > ?");
        assert_eq!(
            binds,
            vec![Value::Text("AAA".to_string()), Value::Integer(15)]
        );
    }

    #[test]
    fn missing_value_compares_with_is_null() {
        let mut binds = Vec::new();
        let criteria = Criteria::new()
            .eq(MemberField::TeamId, None::<i64>)
            .ne(MemberField::Username, None::<String>);
        assert_eq!(
            criteria.render_where(&mut binds),
            " WHERE m.team_id IS NULL AND m.username IS NOT NULL"
        );
        assert!(binds.is_empty());
    }

    #[test]
    fn range_and_pattern_predicates() {
        let mut binds = Vec::new();
        let criteria = Criteria::new()
            .lt(MemberField::Age, 30)
            .le(MemberField::Age, 20)
            .like(MemberField::Username, "mem%");
        assert_eq!(
            criteria.render_where(&mut binds),
            " WHERE m.age < ? AND m.age <= ? AND m.username LIKE ?"
        );
        assert_eq!(
            binds,
            vec![
                Value::Integer(30),
                Value::Integer(20),
                Value::Text("mem%".to_string())
            ]
        );
    }

    #[test]
    fn null_checks_bind_nothing() {
        let mut binds = Vec::new();
        let criteria = Criteria::new()
            .is_null(MemberField::TeamId)
            .is_not_null(MemberField::CreatedAt);
        assert_eq!(
            criteria.render_where(&mut binds),
            " WHERE m.team_id IS NULL AND m.created_at IS NOT NULL"
        );
        assert!(binds.is_empty());
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let mut binds = Vec::new();
        let criteria = Criteria::new().in_list(MemberField::Username, Vec::<String>::new());
        assert_eq!(criteria.render_where(&mut binds), " WHERE 0 = 1");
    }

    #[test]
    fn join_is_collected_once() {
        let criteria = Criteria::new()
            .eq(MemberField::TeamName, "teamA")
            .ne(MemberField::TeamName, "teamB");
        let mut joins = Vec::new();
        criteria.collect_joins(&mut joins);
        Sort::asc(MemberField::TeamName).collect_joins(&mut joins);
        assert_eq!(joins.len(), 1);
        assert!(criteria.needs_join());
    }

    #[test]
    fn order_by_appends_id_tie_break() {
        let sort = Sort::by(MemberField::Username, Direction::Desc);
        assert_eq!(
            sort.render_order_by("m.id"),
            " ORDER BY m.username DESC, m.id ASC"
        );

        let by_id = Sort::desc(MemberField::Id);
        assert_eq!(by_id.render_order_by("m.id"), " ORDER BY m.id DESC");
    }
}

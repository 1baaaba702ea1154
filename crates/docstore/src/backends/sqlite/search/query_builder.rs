//! SQL query builder for structured searches.
//!
//! Translates a [`Search`] into parameterized SQL against `doc_values` and
//! `doc_keys`. Operands are always bound, never spliced into the statement.
//! Placeholders are positional (`?`), so a fragment's parameters must stay in
//! the same order as its placeholders.
//!
//! Every expression is evaluated against its own alias of `doc_values`
//! (`v0`, `v1`, ...), joined on `doc_key`, so each expression must be
//! satisfied by a single stored row while different expressions may be
//! satisfied by different rows of the same document.

use chrono::{Duration, NaiveTime, TimeZone, Utc};

use crate::document::codec::{format_date, Datatype};
use crate::error::QueryError;
use crate::search::DatatypeRegistry;
use crate::types::{
    AggregateFunction, Column, Connective, DateMatch, Expression, MatchType, Number, Predicate,
    Search, Value,
};

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, Default)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }

    /// Creates a float parameter.
    pub fn float(f: f64) -> Self {
        SqlParam::Float(f)
    }
}

impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            SqlParam::String(s) => s.to_sql(),
            SqlParam::Integer(i) => i.to_sql(),
            SqlParam::Float(f) => f.to_sql(),
        }
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Combines with another fragment using AND.
    pub fn and(mut self, other: SqlFragment) -> Self {
        if !self.sql.is_empty() && !other.sql.is_empty() {
            self.sql = format!("({}) AND ({})", self.sql, other.sql);
        } else if !other.sql.is_empty() {
            self.sql = other.sql;
        }
        self.params.extend(other.params);
        self
    }

    /// Combines with another fragment using OR.
    pub fn or(mut self, other: SqlFragment) -> Self {
        if !self.sql.is_empty() && !other.sql.is_empty() {
            self.sql = format!("({}) OR ({})", self.sql, other.sql);
        } else if !other.sql.is_empty() {
            self.sql = other.sql;
        }
        self.params.extend(other.params);
        self
    }

    /// Combines with another fragment using the given connective.
    pub fn join(self, connective: Connective, other: SqlFragment) -> Self {
        match connective {
            Connective::And => self.and(other),
            Connective::Or => self.or(other),
        }
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escapes `*`, `?` and `[` for a `GLOB` pattern.
pub fn escape_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '*' => out.push_str("[*]"),
            '?' => out.push_str("[?]"),
            '[' => out.push_str("[[]"),
            other => out.push(other),
        }
    }
    out
}

/// Builds SQL queries from structured searches.
pub struct QueryBuilder<'a> {
    registry: &'a DatatypeRegistry,
}

impl<'a> QueryBuilder<'a> {
    /// Creates a builder that coerces text operands with `registry`.
    pub fn new(registry: &'a DatatypeRegistry) -> Self {
        Self { registry }
    }

    /// Builds the statement selecting matching keys in ascending key order.
    ///
    /// The single result column is named `doc_key`. Pagination is appended
    /// only when `paginate` is true.
    pub fn build_keys(&self, search: &Search, paginate: bool) -> Result<SqlFragment, QueryError> {
        let grouped = search.is_grouped() && search.mentions_attribute();
        let mut query = self.build_selection(search, grouped)?;
        query.sql.push_str(" ORDER BY doc_key");
        if paginate {
            append_pagination(&mut query, search.offset(), search.limit());
        }
        Ok(query)
    }

    /// Builds a subquery yielding every matching key, or `None` when the
    /// search matches every document.
    pub fn build_key_filter(&self, search: &Search) -> Result<Option<SqlFragment>, QueryError> {
        let unrestricted = !search.has_criteria()
            && search.scope().is_none()
            && search.class_name().is_none()
            && search.date_added().is_none();
        if unrestricted {
            return Ok(None);
        }
        self.build_selection(search, false).map(Some)
    }

    /// Builds a single-value aggregate over `attribute` within the documents
    /// matched by `search`.
    pub fn build_aggregate(
        &self,
        function: AggregateFunction,
        attribute: &str,
        search: &Search,
    ) -> Result<SqlFragment, QueryError> {
        let mut query = match function {
            AggregateFunction::Count => SqlFragment::with_params(
                format!(
                    "SELECT COUNT(a.value) FROM doc_values a WHERE a.attribute = ? AND a.datatype NOT IN ('{}', '{}')",
                    Datatype::Mapping,
                    Datatype::Sequence
                ),
                vec![SqlParam::string(attribute)],
            ),
            other => SqlFragment::with_params(
                format!(
                    "SELECT {}(CAST(a.value AS REAL)) FROM doc_values a WHERE a.attribute = ? AND a.datatype = '{}'",
                    other.sql_name(),
                    Datatype::Number
                ),
                vec![SqlParam::string(attribute)],
            ),
        };

        if let Some(filter) = self.build_key_filter(search)? {
            query.sql.push_str(&format!(" AND a.doc_key IN ({})", filter.sql));
            query.params.extend(filter.params);
        }
        Ok(query)
    }

    fn build_selection(&self, search: &Search, grouped: bool) -> Result<SqlFragment, QueryError> {
        // A key-only loose search must also find documents with no values.
        let key_only = search.uses_loose_fields()
            && search.attribute().is_none()
            && search.value().is_none();
        let groups = if key_only {
            Vec::new()
        } else {
            self.criteria_groups(search)?
        };

        if groups.is_empty() {
            let mut conditions = SqlFragment::default();
            if key_only {
                for predicate in search.loose_predicates()? {
                    conditions = conditions.and(with_alias(compile_predicate(&predicate), "d"));
                }
            }
            conditions = conditions.and(self.modifier_conditions(search, "d.doc_key", false));

            let mut query = SqlFragment::new("SELECT d.doc_key AS doc_key FROM doc_keys d");
            if !conditions.is_empty() {
                query.sql.push_str(&format!(" WHERE {}", conditions.sql));
                query.params.extend(conditions.params);
            }
            return Ok(query);
        }

        let group_alias = groups
            .iter()
            .position(|(mentions_attribute, _)| *mentions_attribute)
            .unwrap_or(0);

        let mut from = String::from("doc_values v0");
        for index in 1..groups.len() {
            from.push_str(&format!(
                " JOIN doc_values v{index} ON v{index}.doc_key = v0.doc_key"
            ));
        }

        let mut conditions = SqlFragment::default();
        for (index, (_, condition)) in groups.into_iter().enumerate() {
            conditions = conditions.and(with_alias(condition, &format!("v{index}")));
        }
        conditions = conditions.and(self.modifier_conditions(search, "v0.doc_key", true));

        let select = if grouped {
            format!(
                "SELECT MIN(v0.doc_key) AS doc_key FROM {from} WHERE {} GROUP BY v{group_alias}.value",
                conditions.sql
            )
        } else {
            format!(
                "SELECT DISTINCT v0.doc_key AS doc_key FROM {from} WHERE {}",
                conditions.sql
            )
        };
        Ok(SqlFragment::with_params(select, conditions.params))
    }

    /// Compiles each expression (or the loose fields) into a condition over
    /// the placeholder alias `{a}`, flagging those that test an attribute.
    fn criteria_groups(&self, search: &Search) -> Result<Vec<(bool, SqlFragment)>, QueryError> {
        if !search.expressions().is_empty() {
            let mut groups = Vec::with_capacity(search.expressions().len());
            for expression in search.expressions() {
                let mentions = predicates(expression).any(|p| p.column() == Column::Attribute);
                groups.push((mentions, self.compile_expression(expression)?));
            }
            return Ok(groups);
        }

        if !search.uses_loose_fields() {
            return Ok(Vec::new());
        }

        let mut condition = SqlFragment::default();
        for predicate in search.loose_predicates()? {
            condition = condition.and(compile_predicate(&self.coerced(search.attribute(), &predicate)?));
        }
        Ok(vec![(search.attribute().is_some(), condition)])
    }

    /// Compiles an expression left to right: `((p1 AND p2) OR p3)`.
    ///
    /// Value operands follow the registered datatype of the attribute the
    /// expression pins with an exact attribute match, as on the loose path.
    fn compile_expression(&self, expression: &Expression) -> Result<SqlFragment, QueryError> {
        let attribute = predicates(expression).find_map(|p| {
            match (p.column(), p.match_type(), p.operand()) {
                (Column::Attribute, MatchType::EqualTo, Value::Text(name)) => Some(name.as_str()),
                _ => None,
            }
        });
        let mut condition = compile_predicate(&self.coerced(attribute, expression.first())?);
        for (connective, predicate) in expression.rest() {
            condition =
                condition.join(*connective, compile_predicate(&self.coerced(attribute, predicate)?));
        }
        Ok(condition)
    }

    /// Coerces a value predicate's text operand to the registered datatype
    /// of `attribute`.
    fn coerced(&self, attribute: Option<&str>, predicate: &Predicate) -> Result<Predicate, QueryError> {
        match (predicate.column(), attribute) {
            (Column::Value, Some(attribute)) => {
                let coerced = self.registry.coerce(attribute, predicate.operand());
                if &coerced == predicate.operand() {
                    Ok(predicate.clone())
                } else {
                    Predicate::new(Column::Value, predicate.match_type(), coerced)
                }
            }
            _ => Ok(predicate.clone()),
        }
    }

    fn modifier_conditions(&self, search: &Search, key_column: &str, via_keys: bool) -> SqlFragment {
        let mut out = SqlFragment::default();

        if let Some(scope) = search.scope() {
            if scope.is_empty() {
                out = out.and(SqlFragment::new("1 = 0"));
            } else {
                let placeholders = vec!["?"; scope.len()].join(", ");
                out = out.and(SqlFragment::with_params(
                    format!("{key_column} IN ({placeholders})"),
                    scope.iter().map(SqlParam::string).collect(),
                ));
            }
        }

        let mut key_conditions = SqlFragment::default();
        if let Some(class_name) = search.class_name() {
            key_conditions = key_conditions.and(SqlFragment::with_params(
                "class_name = ?",
                vec![SqlParam::string(class_name)],
            ));
        }
        if let Some((date_match, date)) = search.date_added() {
            let condition = match date_match {
                DateMatch::Before => SqlFragment::with_params(
                    "created_at < ?",
                    vec![SqlParam::string(format_date(&date))],
                ),
                DateMatch::After => SqlFragment::with_params(
                    "created_at > ?",
                    vec![SqlParam::string(format_date(&date))],
                ),
                DateMatch::On => {
                    let start = Utc.from_utc_datetime(&date.date_naive().and_time(NaiveTime::MIN));
                    let end = start + Duration::days(1);
                    SqlFragment::with_params(
                        "created_at >= ? AND created_at < ?",
                        vec![
                            SqlParam::string(format_date(&start)),
                            SqlParam::string(format_date(&end)),
                        ],
                    )
                }
            };
            key_conditions = key_conditions.and(condition);
        }

        if !key_conditions.is_empty() {
            let condition = if via_keys {
                SqlFragment::with_params(
                    format!(
                        "{key_column} IN (SELECT doc_key FROM doc_keys WHERE {})",
                        key_conditions.sql
                    ),
                    key_conditions.params,
                )
            } else {
                key_conditions
            };
            out = out.and(condition);
        }

        out
    }
}

fn append_pagination(query: &mut SqlFragment, offset: Option<usize>, limit: Option<usize>) {
    match (limit, offset) {
        (None, None) => {}
        (Some(limit), offset) => {
            query.sql.push_str(" LIMIT ? OFFSET ?");
            query.params.push(SqlParam::integer(to_sql_count(limit)));
            query.params.push(SqlParam::integer(to_sql_count(offset.unwrap_or(0))));
        }
        (None, Some(offset)) => {
            query.sql.push_str(" LIMIT -1 OFFSET ?");
            query.params.push(SqlParam::integer(to_sql_count(offset)));
        }
    }
}

/// Saturates counts that do not fit SQLite's signed 64-bit integers.
fn to_sql_count(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn predicates(expression: &Expression) -> impl Iterator<Item = &Predicate> {
    std::iter::once(expression.first()).chain(expression.rest().iter().map(|(_, p)| p))
}

fn with_alias(fragment: SqlFragment, alias: &str) -> SqlFragment {
    SqlFragment::with_params(fragment.sql.replace("{a}", alias), fragment.params)
}

/// Compiles one predicate over the placeholder alias `{a}`.
fn compile_predicate(predicate: &Predicate) -> SqlFragment {
    let match_type = predicate.match_type();
    match (predicate.column(), predicate.operand()) {
        (Column::Key, operand) => compare_text("{a}.doc_key", match_type, &operand.to_string()),
        (Column::Attribute, operand) => {
            compare_text("{a}.attribute", match_type, &operand.to_string())
        }
        (Column::Value, Value::Number(n)) => {
            let guard = SqlFragment::new(format!("{{a}}.datatype = '{}'", Datatype::Number));
            let test = if match_type.is_pattern() {
                compare_text("{a}.value", match_type.sensitive(), &n.to_string())
            } else {
                let op = comparison_operator(match_type);
                let param = match n {
                    Number::Integer(i) => SqlParam::integer(*i),
                    Number::Float(f) => SqlParam::float(*f),
                };
                // NUMERIC keeps integral text as INTEGER, so large integers
                // compare exactly.
                SqlFragment::with_params(format!("CAST({{a}}.value AS NUMERIC) {op} ?"), vec![param])
            };
            guard.and(test)
        }
        (Column::Value, Value::Date(d)) => {
            let guard = SqlFragment::new(format!("{{a}}.datatype = '{}'", Datatype::Date));
            guard.and(compare_text("{a}.value", match_type.sensitive(), &format_date(d)))
        }
        (Column::Value, operand) => {
            let guard = SqlFragment::new(format!(
                "{{a}}.datatype IN ('{}', '{}', '{}')",
                Datatype::Text,
                Datatype::Number,
                Datatype::Date
            ));
            guard.and(compare_text("{a}.value", match_type, &operand.to_string()))
        }
    }
}

fn comparison_operator(match_type: MatchType) -> &'static str {
    match match_type.sensitive() {
        MatchType::NotEqualTo => "<>",
        MatchType::GreaterThan => ">",
        MatchType::LessThan => "<",
        _ => "=",
    }
}

/// Text comparison. Case-sensitive patterns use `GLOB`; case-insensitive
/// ones use `LIKE` over `lower()` of both sides.
fn compare_text(column: &str, match_type: MatchType, operand: &str) -> SqlFragment {
    let insensitive = match_type.is_insensitive();
    if match_type.is_pattern() {
        let (prefix, suffix) = match match_type.sensitive() {
            MatchType::BeginsWith => ("", "*"),
            MatchType::EndsWith => ("*", ""),
            _ => ("*", "*"),
        };
        if insensitive {
            let pattern = format!(
                "{}{}{}",
                prefix.replace('*', "%"),
                escape_like(operand),
                suffix.replace('*', "%")
            );
            SqlFragment::with_params(
                format!("lower({column}) LIKE lower(?) ESCAPE '\\'"),
                vec![SqlParam::string(pattern)],
            )
        } else {
            let pattern = format!("{}{}{}", prefix, escape_glob(operand), suffix);
            SqlFragment::with_params(
                format!("{column} GLOB ?"),
                vec![SqlParam::string(pattern)],
            )
        }
    } else {
        let op = comparison_operator(match_type);
        let sql = if insensitive {
            format!("lower({column}) {op} lower(?)")
        } else {
            format!("{column} {op} ?")
        };
        SqlFragment::with_params(sql, vec![SqlParam::string(operand)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortDescriptor;

    fn registry() -> DatatypeRegistry {
        let mut registry = DatatypeRegistry::new();
        registry.register("Salary", Datatype::Number);
        registry
    }

    fn strings(fragment: &SqlFragment) -> Vec<String> {
        fragment
            .params
            .iter()
            .filter_map(|p| match p {
                SqlParam::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_sql_fragment_and() {
        let f1 = SqlFragment::with_params("a = ?", vec![SqlParam::string("x")]);
        let f2 = SqlFragment::with_params("b = ?", vec![SqlParam::string("y")]);
        let combined = f1.and(f2);
        assert_eq!(combined.sql, "(a = ?) AND (b = ?)");
        assert_eq!(combined.params.len(), 2);
    }

    #[test]
    fn test_sql_fragment_or_with_empty() {
        let combined = SqlFragment::default().or(SqlFragment::new("b = 1"));
        assert_eq!(combined.sql, "b = 1");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_glob("a*b?[c]"), "a[*]b[?][[]c]");
    }

    #[test]
    fn test_no_criteria_selects_from_keys_table() {
        let registry = registry();
        let query = QueryBuilder::new(&registry)
            .build_keys(&Search::new(), true)
            .unwrap();
        assert_eq!(query.sql, "SELECT d.doc_key AS doc_key FROM doc_keys d ORDER BY doc_key");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_key_only_search_uses_keys_table() {
        let registry = registry();
        let search = Search::new().with_key("doc-").with_match(MatchType::BeginsWith);
        let query = QueryBuilder::new(&registry).build_keys(&search, true).unwrap();
        assert_eq!(
            query.sql,
            "SELECT d.doc_key AS doc_key FROM doc_keys d WHERE d.doc_key GLOB ? ORDER BY doc_key"
        );
        assert_eq!(strings(&query), vec!["doc-*"]);
    }

    #[test]
    fn test_expressions_get_their_own_alias() {
        let city = Expression::new(Predicate::equal(Column::Attribute, "City").unwrap())
            .and(Predicate::equal(Column::Value, "Madrid").unwrap());
        let country = Expression::new(Predicate::equal(Column::Attribute, "Country").unwrap())
            .and(Predicate::equal(Column::Value, "Spain").unwrap());
        let search = Search::new().with_expression(&city).with_expression(&country);

        let registry = registry();
        let query = QueryBuilder::new(&registry).build_keys(&search, true).unwrap();
        assert!(query.sql.contains("JOIN doc_values v1 ON v1.doc_key = v0.doc_key"));
        assert!(query.sql.contains("v0.attribute = ?"));
        assert!(query.sql.contains("v1.attribute = ?"));
        assert!(!query.sql.contains("{a}"));
        assert_eq!(strings(&query), vec!["City", "Madrid", "Country", "Spain"]);
    }

    #[test]
    fn test_connectives_apply_left_to_right() {
        let expr = Expression::new(Predicate::equal(Column::Value, "a").unwrap())
            .and(Predicate::equal(Column::Value, "b").unwrap())
            .or(Predicate::equal(Column::Value, "c").unwrap());
        let registry = registry();
        let sql = QueryBuilder::new(&registry).compile_expression(&expr).unwrap().sql;
        assert!(sql.starts_with("(((") || sql.starts_with("(("));
        let or_at = sql.rfind(") OR (").unwrap();
        let and_at = sql.find(") AND (").unwrap();
        assert!(and_at < or_at);
    }

    #[test]
    fn test_insensitive_contains_uses_lower_like() {
        let predicate =
            Predicate::new(Column::Value, MatchType::InsensitiveContains, "Cat").unwrap();
        let fragment = compile_predicate(&predicate);
        assert!(fragment.sql.contains("lower({a}.value) LIKE lower(?) ESCAPE '\\'"));
        assert_eq!(strings(&fragment), vec!["%Cat%"]);
    }

    #[test]
    fn test_sensitive_begins_with_uses_glob() {
        let predicate = Predicate::new(Column::Key, MatchType::BeginsWith, "doc*").unwrap();
        let fragment = compile_predicate(&predicate);
        assert_eq!(fragment.sql, "{a}.doc_key GLOB ?");
        assert_eq!(strings(&fragment), vec!["doc[*]*"]);
    }

    #[test]
    fn test_numeric_operand_casts_and_guards() {
        let predicate = Predicate::new(Column::Value, MatchType::GreaterThan, 15).unwrap();
        let fragment = compile_predicate(&predicate);
        assert!(fragment.sql.contains("{a}.datatype = 'NUMBER'"));
        assert!(fragment.sql.contains("CAST({a}.value AS NUMERIC) > ?"));
        assert_eq!(fragment.params.last(), Some(&SqlParam::Integer(15)));

        let predicate = Predicate::new(Column::Value, MatchType::LessThan, 2.5).unwrap();
        let fragment = compile_predicate(&predicate);
        assert_eq!(fragment.params.last(), Some(&SqlParam::Float(2.5)));
    }

    #[test]
    fn test_large_integer_operand_is_bound_exactly() {
        let big = (1i64 << 53) + 1;
        let predicate = Predicate::new(Column::Value, MatchType::EqualTo, big).unwrap();
        let fragment = compile_predicate(&predicate);
        assert_eq!(fragment.params.last(), Some(&SqlParam::Integer(big)));
    }

    #[test]
    fn test_loose_value_is_coerced_by_registry() {
        let search = Search::new()
            .with_attribute("Salary")
            .with_value("20")
            .with_match(MatchType::GreaterThan);
        let registry = registry();
        let query = QueryBuilder::new(&registry).build_keys(&search, true).unwrap();
        assert!(query.sql.contains("CAST(v0.value AS NUMERIC) > ?"));
        assert!(query.params.contains(&SqlParam::Integer(20)));
    }

    #[test]
    fn test_expression_value_is_coerced_by_pinned_attribute() {
        let expression = Expression::new(
            Predicate::new(Column::Attribute, MatchType::EqualTo, "Salary").unwrap(),
        )
        .and(Predicate::new(Column::Value, MatchType::GreaterThan, "25").unwrap());
        let search = Search::new().with_expression(&expression);
        let registry = registry();
        let query = QueryBuilder::new(&registry).build_keys(&search, true).unwrap();
        assert!(query.sql.contains("CAST(v0.value AS NUMERIC) > ?"));
        assert!(query.params.contains(&SqlParam::Integer(25)));
    }

    #[test]
    fn test_grouping_by_value() {
        let search = Search::new().with_attribute("City").grouped_by_value();
        let registry = registry();
        let query = QueryBuilder::new(&registry).build_keys(&search, true).unwrap();
        assert!(query.sql.starts_with("SELECT MIN(v0.doc_key) AS doc_key"));
        assert!(query.sql.contains("GROUP BY v0.value"));

        let search = Search::new().with_value("x").grouped_by_value();
        let query = QueryBuilder::new(&registry).build_keys(&search, true).unwrap();
        assert!(query.sql.starts_with("SELECT DISTINCT v0.doc_key"));
    }

    #[test]
    fn test_pagination_is_bound() {
        let search = Search::new()
            .with_attribute("Name")
            .with_offset(2)
            .with_limit(2)
            .with_sort(SortDescriptor::ascending("Name"));
        let registry = registry();
        let query = QueryBuilder::new(&registry).build_keys(&search, true).unwrap();
        assert!(query.sql.ends_with("ORDER BY doc_key LIMIT ? OFFSET ?"));
        assert_eq!(
            &query.params[query.params.len() - 2..],
            &[SqlParam::Integer(2), SqlParam::Integer(2)]
        );

        let huge = Search::new().with_attribute("Name").with_limit(usize::MAX);
        let query = QueryBuilder::new(&registry).build_keys(&huge, true).unwrap();
        assert_eq!(
            &query.params[query.params.len() - 2..],
            &[SqlParam::Integer(i64::MAX), SqlParam::Integer(0)]
        );

        let unpaged = QueryBuilder::new(&registry).build_keys(&search, false).unwrap();
        assert!(!unpaged.sql.contains("LIMIT"));
    }

    #[test]
    fn test_scope_and_class_modifiers() {
        let search = Search::new()
            .with_attribute("Name")
            .in_scope(["a", "b"])
            .with_class("Person");
        let registry = registry();
        let query = QueryBuilder::new(&registry).build_keys(&search, false).unwrap();
        assert!(query.sql.contains("v0.doc_key IN (?, ?)"));
        assert!(query
            .sql
            .contains("v0.doc_key IN (SELECT doc_key FROM doc_keys WHERE class_name = ?)"));
    }

    #[test]
    fn test_aggregate_scopes_by_key_filter() {
        let registry = registry();
        let builder = QueryBuilder::new(&registry);
        let query = builder
            .build_aggregate(AggregateFunction::Average, "Salary", &Search::new())
            .unwrap();
        assert_eq!(
            query.sql,
            "SELECT AVG(CAST(a.value AS REAL)) FROM doc_values a WHERE a.attribute = ? AND a.datatype = 'NUMBER'"
        );

        let search = Search::new().with_class("Employee");
        let query = builder
            .build_aggregate(AggregateFunction::Count, "Salary", &search)
            .unwrap();
        assert!(query.sql.contains("AND a.doc_key IN (SELECT d.doc_key AS doc_key FROM doc_keys d WHERE class_name = ?)"));
    }
}

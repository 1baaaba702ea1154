//! Search parameter types.
//!
//! A [`Search`] carries either loose key/attribute/value fields or a list of
//! [`Expression`]s, plus modifiers: scope, class filter, date added,
//! grouping, sorting, pagination and an attribute allow-list.
//!
//! Predicates validate their operand on construction and never change
//! afterwards. Expressions are the only mutable query part, and a search
//! takes its own copy of each expression it is given.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::QueryError;

use super::value::Value;

/// The `doc_values` column a predicate tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    /// The document key.
    Key,
    /// The flattened attribute path.
    Attribute,
    /// The stored value.
    Value,
}

impl Column {
    /// Returns the column name used in descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Key => "key",
            Column::Attribute => "attribute",
            Column::Value => "value",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a predicate compares a column with its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Equal.
    #[default]
    EqualTo,
    /// Equal, ignoring case.
    InsensitiveEqualTo,
    /// Not equal.
    NotEqualTo,
    /// Not equal, ignoring case.
    InsensitiveNotEqualTo,
    /// Starts with the operand.
    BeginsWith,
    /// Starts with the operand, ignoring case.
    InsensitiveBeginsWith,
    /// Ends with the operand.
    EndsWith,
    /// Ends with the operand, ignoring case.
    InsensitiveEndsWith,
    /// Contains the operand.
    Contains,
    /// Contains the operand, ignoring case.
    InsensitiveContains,
    /// Greater than the operand.
    GreaterThan,
    /// Greater than the operand, ignoring case.
    InsensitiveGreaterThan,
    /// Less than the operand.
    LessThan,
    /// Less than the operand, ignoring case.
    InsensitiveLessThan,
}

impl MatchType {
    /// Returns true for the case-insensitive variants.
    pub fn is_insensitive(&self) -> bool {
        matches!(
            self,
            MatchType::InsensitiveEqualTo
                | MatchType::InsensitiveNotEqualTo
                | MatchType::InsensitiveBeginsWith
                | MatchType::InsensitiveEndsWith
                | MatchType::InsensitiveContains
                | MatchType::InsensitiveGreaterThan
                | MatchType::InsensitiveLessThan
        )
    }

    /// Returns the case-sensitive variant of this match type.
    pub fn sensitive(&self) -> MatchType {
        match self {
            MatchType::InsensitiveEqualTo => MatchType::EqualTo,
            MatchType::InsensitiveNotEqualTo => MatchType::NotEqualTo,
            MatchType::InsensitiveBeginsWith => MatchType::BeginsWith,
            MatchType::InsensitiveEndsWith => MatchType::EndsWith,
            MatchType::InsensitiveContains => MatchType::Contains,
            MatchType::InsensitiveGreaterThan => MatchType::GreaterThan,
            MatchType::InsensitiveLessThan => MatchType::LessThan,
            other => *other,
        }
    }

    /// Returns true for the `LIKE`-based match types.
    pub fn is_pattern(&self) -> bool {
        matches!(
            self.sensitive(),
            MatchType::BeginsWith | MatchType::EndsWith | MatchType::Contains
        )
    }

    /// Returns the operator used in descriptions.
    pub fn symbol(&self) -> &'static str {
        match self.sensitive() {
            MatchType::EqualTo => "==",
            MatchType::NotEqualTo => "!=",
            MatchType::BeginsWith => "BEGINSWITH",
            MatchType::EndsWith => "ENDSWITH",
            MatchType::Contains => "CONTAINS",
            MatchType::GreaterThan => ">",
            _ => "<",
        }
    }

    /// Returns the snake_case name of this match type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::EqualTo => "equal_to",
            MatchType::InsensitiveEqualTo => "insensitive_equal_to",
            MatchType::NotEqualTo => "not_equal_to",
            MatchType::InsensitiveNotEqualTo => "insensitive_not_equal_to",
            MatchType::BeginsWith => "begins_with",
            MatchType::InsensitiveBeginsWith => "insensitive_begins_with",
            MatchType::EndsWith => "ends_with",
            MatchType::InsensitiveEndsWith => "insensitive_ends_with",
            MatchType::Contains => "contains",
            MatchType::InsensitiveContains => "insensitive_contains",
            MatchType::GreaterThan => "greater_than",
            MatchType::InsensitiveGreaterThan => "insensitive_greater_than",
            MatchType::LessThan => "less_than",
            MatchType::InsensitiveLessThan => "insensitive_less_than",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())?;
        if self.is_insensitive() {
            f.write_str("[c]")?;
        }
        Ok(())
    }
}

/// Boolean connective between predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connective {
    /// Both sides must hold.
    #[default]
    And,
    /// Either side must hold.
    Or,
}

impl Connective {
    /// Returns the SQL keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(column, match, operand)` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    column: Column,
    match_type: MatchType,
    operand: Value,
}

impl Predicate {
    /// Creates a predicate, validating the operand.
    ///
    /// Operands must be atomic and not blobs. The key and attribute columns
    /// only accept text.
    ///
    /// # Examples
    ///
    /// ```
    /// use helios_docstore::types::{Column, MatchType, Predicate, Value};
    ///
    /// let p = Predicate::new(Column::Value, MatchType::GreaterThan, 10).unwrap();
    /// assert_eq!(p.to_string(), "value > 10");
    ///
    /// assert!(Predicate::new(Column::Key, MatchType::EqualTo, 10).is_err());
    /// assert!(Predicate::new(Column::Value, MatchType::EqualTo, Value::blob(vec![1u8])).is_err());
    /// ```
    pub fn new(
        column: Column,
        match_type: MatchType,
        operand: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        let operand = operand.into();
        let invalid = |message: String| QueryError::InvalidPredicate { message };

        match &operand {
            Value::Sequence(_) | Value::Mapping(_) | Value::Blob(_) => {
                return Err(invalid(format!(
                    "{} operands cannot be compared",
                    operand.type_name()
                )));
            }
            Value::Number(n) if !n.is_finite() => {
                return Err(invalid("non-finite numbers cannot be compared".to_string()));
            }
            _ => {}
        }
        if column != Column::Value && operand.as_text().is_none() {
            return Err(invalid(format!(
                "the {} column only accepts text, got {}",
                column,
                operand.type_name()
            )));
        }

        Ok(Self {
            column,
            match_type,
            operand,
        })
    }

    /// Shorthand for an equality predicate.
    pub fn equal(column: Column, operand: impl Into<Value>) -> Result<Self, QueryError> {
        Self::new(column, MatchType::EqualTo, operand)
    }

    /// Returns the tested column.
    pub fn column(&self) -> Column {
        self.column
    }

    /// Returns the match type.
    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    /// Returns the operand.
    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// Describes this predicate as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "column": self.column.as_str(),
            "match": self.match_type.as_str(),
            "operand": self.operand.to_json(),
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Value::Text(s) => write!(f, "{} {} {:?}", self.column, self.match_type, s),
            other => write!(f, "{} {} {}", self.column, self.match_type, other),
        }
    }
}

/// Predicates joined left to right by connectives.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    first: Predicate,
    rest: Vec<(Connective, Predicate)>,
}

impl Expression {
    /// Creates an expression holding one predicate.
    pub fn new(predicate: Predicate) -> Self {
        Self {
            first: predicate,
            rest: Vec::new(),
        }
    }

    /// Creates an expression joining every predicate with the same connective.
    pub fn from_predicates(
        predicates: Vec<Predicate>,
        connective: Connective,
    ) -> Result<Self, QueryError> {
        let mut iter = predicates.into_iter();
        let first = iter.next().ok_or_else(|| QueryError::InvalidPredicate {
            message: "an expression needs at least one predicate".to_string(),
        })?;
        Ok(Self {
            first,
            rest: iter.map(|p| (connective, p)).collect(),
        })
    }

    /// Appends a predicate.
    pub fn add_predicate(&mut self, predicate: Predicate, connective: Connective) {
        self.rest.push((connective, predicate));
    }

    /// Builder form of [`Expression::add_predicate`].
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.add_predicate(predicate, Connective::And);
        self
    }

    /// Builder form of [`Expression::add_predicate`].
    pub fn or(mut self, predicate: Predicate) -> Self {
        self.add_predicate(predicate, Connective::Or);
        self
    }

    /// Returns the first predicate.
    pub fn first(&self) -> &Predicate {
        &self.first
    }

    /// Returns the remaining predicates with the connective joining each.
    pub fn rest(&self) -> &[(Connective, Predicate)] {
        &self.rest
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.rest.len() + 1
    }

    /// Always false; an expression holds at least one predicate.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Describes this expression as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let mut items = vec![json!({ "predicate": self.first.to_json() })];
        items.extend(self.rest.iter().map(|(connective, predicate)| {
            json!({
                "connective": connective.as_str(),
                "predicate": predicate.to_json(),
            })
        }));
        serde_json::Value::Array(items)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.first)?;
        for (connective, predicate) in &self.rest {
            write!(f, " {} ({})", connective, predicate)?;
        }
        Ok(())
    }
}

/// Sort order on a dotted key path of each record's sort root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    /// Dotted key path; numeric segments index sequences.
    pub key_path: String,
    /// Sort direction.
    pub ascending: bool,
}

impl SortDescriptor {
    /// Creates a sort descriptor.
    pub fn new(key_path: impl Into<String>, ascending: bool) -> Self {
        Self {
            key_path: key_path.into(),
            ascending,
        }
    }

    /// Ascending order on `key_path`.
    pub fn ascending(key_path: impl Into<String>) -> Self {
        Self::new(key_path, true)
    }

    /// Descending order on `key_path`.
    pub fn descending(key_path: impl Into<String>) -> Self {
        Self::new(key_path, false)
    }

    /// Describes this descriptor as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        json!({ "key_path": self.key_path, "ascending": self.ascending })
    }
}

impl fmt::Display for SortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.key_path,
            if self.ascending { "ASC" } else { "DESC" }
        )
    }
}

/// Comparison applied to the date a document was first stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMatch {
    /// Strictly before the given instant.
    Before,
    /// On the same UTC calendar day.
    On,
    /// Strictly after the given instant.
    After,
}

/// What a search returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnShape {
    /// Key to record mapping.
    #[default]
    Records,
    /// Keys only.
    Keys,
}

/// Aggregate functions over one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    /// Number of matching rows.
    Count,
    /// Arithmetic mean of numeric values.
    Average,
    /// Smallest numeric value.
    Minimum,
    /// Largest numeric value.
    Maximum,
    /// Sum of numeric values.
    Sum,
}

impl AggregateFunction {
    /// Returns the SQL function name.
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Average => "AVG",
            AggregateFunction::Minimum => "MIN",
            AggregateFunction::Maximum => "MAX",
            AggregateFunction::Sum => "SUM",
        }
    }
}

/// A structured search.
///
/// # Examples
///
/// ```
/// use helios_docstore::types::{Column, Expression, MatchType, Predicate, Search, SortDescriptor};
///
/// let city = Predicate::new(Column::Attribute, MatchType::EqualTo, "City").unwrap();
/// let madrid = Predicate::new(Column::Value, MatchType::EqualTo, "Madrid").unwrap();
/// let expr = Expression::new(city).and(madrid);
///
/// let search = Search::new()
///     .with_expression(&expr)
///     .with_sort(SortDescriptor::ascending("Name"))
///     .with_limit(10);
///
/// assert_eq!(search.expressions().len(), 1);
/// assert!(search.has_criteria());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Search {
    key: Option<String>,
    attribute: Option<String>,
    value: Option<Value>,
    match_type: MatchType,
    expressions: Vec<Expression>,
    scope: Option<Vec<String>>,
    class_name: Option<String>,
    date_added: Option<(DateMatch, DateTime<Utc>)>,
    group_by_value: bool,
    sort: Vec<SortDescriptor>,
    offset: Option<usize>,
    limit: Option<usize>,
    attributes_to_return: Option<Vec<String>>,
}

impl Search {
    /// Creates an empty search matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the loose key field.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the loose attribute field.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Sets the loose value field.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the match type for the loose fields.
    pub fn with_match(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    /// Adds a copy of an expression. Later changes to `expression` do not
    /// affect this search.
    pub fn with_expression(mut self, expression: &Expression) -> Self {
        self.expressions.push(expression.clone());
        self
    }

    /// Adds copies of several expressions.
    pub fn with_expressions(mut self, expressions: &[Expression]) -> Self {
        self.expressions.extend(expressions.iter().cloned());
        self
    }

    /// Restricts the search to a set of keys.
    pub fn in_scope<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts the search to documents saved with a class tag.
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Restricts the search by the date documents were first stored.
    pub fn added(mut self, date_match: DateMatch, date: DateTime<Utc>) -> Self {
        self.date_added = Some((date_match, date));
        self
    }

    /// Returns one key per distinct matched value.
    pub fn grouped_by_value(mut self) -> Self {
        self.group_by_value = true;
        self
    }

    /// Appends a sort descriptor.
    pub fn with_sort(mut self, descriptor: SortDescriptor) -> Self {
        self.sort.push(descriptor);
        self
    }

    /// Skips the first `offset` results.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns at most `limit` results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Clears every field, leaving a search that matches every document.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Keeps only these attribute paths in returned records.
    pub fn returning<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes_to_return = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Loose key field.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Loose attribute field.
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Loose value field.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Match type for the loose fields.
    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    /// Expressions, combined with AND.
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Key scope, if any.
    pub fn scope(&self) -> Option<&[String]> {
        self.scope.as_deref()
    }

    /// Class filter, if any.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Date added filter, if any.
    pub fn date_added(&self) -> Option<(DateMatch, DateTime<Utc>)> {
        self.date_added
    }

    /// Whether results are grouped by matched value.
    pub fn is_grouped(&self) -> bool {
        self.group_by_value
    }

    /// Sort descriptors.
    pub fn sort(&self) -> &[SortDescriptor] {
        &self.sort
    }

    /// Result offset.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Result limit.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Attribute allow-list, if any.
    pub fn attributes_to_return(&self) -> Option<&[String]> {
        self.attributes_to_return.as_deref()
    }

    /// Returns true if the loose fields are in use. Expressions take
    /// precedence over them.
    pub fn uses_loose_fields(&self) -> bool {
        self.expressions.is_empty()
            && (self.key.is_some() || self.attribute.is_some() || self.value.is_some())
    }

    /// Returns true if any key, attribute or value criterion is set.
    pub fn has_criteria(&self) -> bool {
        !self.expressions.is_empty() || self.uses_loose_fields()
    }

    /// Returns true if an attribute is part of the criteria.
    pub fn mentions_attribute(&self) -> bool {
        if self.expressions.is_empty() {
            return self.attribute.is_some();
        }
        self.expressions.iter().any(|e| {
            std::iter::once(e.first())
                .chain(e.rest().iter().map(|(_, p)| p))
                .any(|p| p.column() == Column::Attribute)
        })
    }

    /// Turns the loose fields into predicates.
    ///
    /// The match type applies to the most specific field given (value, else
    /// attribute, else key); the other fields compare for equality.
    pub fn loose_predicates(&self) -> Result<Vec<Predicate>, QueryError> {
        let target = if self.value.is_some() {
            Column::Value
        } else if self.attribute.is_some() {
            Column::Attribute
        } else {
            Column::Key
        };
        let match_for = |column: Column| {
            if column == target {
                self.match_type
            } else {
                MatchType::EqualTo
            }
        };

        let mut predicates = Vec::new();
        if let Some(key) = &self.key {
            predicates.push(Predicate::new(Column::Key, match_for(Column::Key), key.as_str())?);
        }
        if let Some(attribute) = &self.attribute {
            predicates.push(Predicate::new(
                Column::Attribute,
                match_for(Column::Attribute),
                attribute.as_str(),
            )?);
        }
        if let Some(value) = &self.value {
            predicates.push(Predicate::new(
                Column::Value,
                match_for(Column::Value),
                value.clone(),
            )?);
        }
        Ok(predicates)
    }

    /// Describes this search as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        if let Some(key) = &self.key {
            out.insert("key".into(), json!(key));
        }
        if let Some(attribute) = &self.attribute {
            out.insert("attribute".into(), json!(attribute));
        }
        if let Some(value) = &self.value {
            out.insert("value".into(), value.to_json());
        }
        if self.uses_loose_fields() {
            out.insert("match".into(), json!(self.match_type.as_str()));
        }
        if !self.expressions.is_empty() {
            out.insert(
                "expressions".into(),
                self.expressions.iter().map(Expression::to_json).collect(),
            );
        }
        if let Some(scope) = &self.scope {
            out.insert("scope".into(), json!(scope));
        }
        if let Some(class_name) = &self.class_name {
            out.insert("class_name".into(), json!(class_name));
        }
        if let Some((date_match, date)) = &self.date_added {
            out.insert(
                "date_added".into(),
                json!({ "match": date_match, "date": date.to_rfc3339() }),
            );
        }
        if self.group_by_value {
            out.insert("group_by_value".into(), json!(true));
        }
        if !self.sort.is_empty() {
            out.insert(
                "sort".into(),
                self.sort.iter().map(SortDescriptor::to_json).collect(),
            );
        }
        if let Some(offset) = self.offset {
            out.insert("offset".into(), json!(offset));
        }
        if let Some(limit) = self.limit {
            out.insert("limit".into(), json!(limit));
        }
        if let Some(attributes) = &self.attributes_to_return {
            out.insert("attributes_to_return".into(), json!(attributes));
        }
        serde_json::Value::Object(out)
    }
}

impl fmt::Display for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.expressions.is_empty() {
            if let Ok(predicates) = self.loose_predicates() {
                parts.extend(predicates.iter().map(|p| format!("({})", p)));
            }
        } else {
            parts.extend(self.expressions.iter().map(|e| format!("[{}]", e)));
        }
        if parts.is_empty() {
            f.write_str("ALL")?;
        } else {
            f.write_str(&parts.join(" AND "))?;
        }
        if let Some(class_name) = &self.class_name {
            write!(f, " CLASS {}", class_name)?;
        }
        if !self.sort.is_empty() {
            let sort: Vec<String> = self.sort.iter().map(ToString::to_string).collect();
            write!(f, " SORT BY {}", sort.join(", "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

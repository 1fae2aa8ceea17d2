use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::QueryBuildError;
use crate::parser::extended::{parse_f64, parse_i64};
use crate::schema::{get_field, FieldSchema, FieldType};

/// A literal compared against a document field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl FilterValue {
    fn kind_name(&self) -> &'static str {
        match self {
            FilterValue::Text(_) => "text",
            FilterValue::Integer(_) => "integer",
            FilterValue::Real(_) => "real",
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FilterValue::Text(s) => json!(s),
            FilterValue::Integer(i) => json!(i),
            FilterValue::Real(f) => json!(f),
        }
    }

    /// Whether a raw document value equals this literal
    fn matches(&self, value: &Value) -> bool {
        match self {
            FilterValue::Text(s) => value.as_str() == Some(s.as_str()),
            FilterValue::Integer(i) => parse_i64(value).ok() == Some(*i),
            FilterValue::Real(f) => parse_f64(value).ok() == Some(*f),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        FilterValue::Integer(i)
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        FilterValue::Real(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(FilterValue),
    In(Vec<FilterValue>),
}

impl Predicate {
    pub fn values(&self) -> &[FilterValue] {
        match self {
            Predicate::Eq(v) => std::slice::from_ref(v),
            Predicate::In(vs) => vs,
        }
    }
}

/// One validated (field, predicate) pair
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub field: &'static FieldSchema,
    pub predicate: Predicate,
}

/// Conjunction of constraints over recognized system fields.
///
/// Evaluated by the store; callers never re-filter the results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryFilter {
    constraints: Vec<Constraint>,
}

impl QueryFilter {
    pub fn builder() -> QueryFilterBuilder {
        QueryFilterBuilder::default()
    }

    /// Systems held by `power` in any of `states`
    pub fn power_control<S: AsRef<str>>(power: &str, states: &[S]) -> Result<Self, QueryBuildError> {
        Self::builder()
            .eq("controllingPower", power)
            .is_in("powerState", states.iter().map(|s| s.as_ref()))
            .build()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Evaluate against a raw document. Used by stores that hold documents
    /// in process rather than pushing the predicate into a query language.
    pub fn matches(&self, doc: &Value) -> bool {
        self.constraints.iter().all(|c| {
            field_values(doc, c.field)
                .iter()
                .any(|v| c.predicate.values().iter().any(|lit| lit.matches(v)))
        })
    }

    /// Query in the document store's own notation,
    /// e.g. `{"controllingPower": "X", "powerState": {"$in": [...]}}`
    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        for c in &self.constraints {
            let value = match &c.predicate {
                Predicate::Eq(v) => v.to_json(),
                Predicate::In(vs) => json!({ "$in": vs.iter().map(FilterValue::to_json).collect::<Vec<_>>() }),
            };
            map.insert(c.field.path.to_string(), value);
        }
        Value::Object(map)
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}

/// Values a constraint is compared against. Array fields fan out over the
/// array at their first segment, where a lone non-null value counts as a
/// one-element array; nothing else fans out.
fn field_values<'v>(doc: &'v Value, field: &FieldSchema) -> Vec<&'v Value> {
    let segments: Vec<&str> = field.segments().collect();
    if !field.multi {
        return lookup(doc, &segments).into_iter().collect();
    }

    let Some((head, rest)) = segments.split_first() else {
        return Vec::new();
    };
    match doc.get(*head) {
        Some(Value::Array(items)) => items.iter().filter_map(|item| lookup(item, rest)).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => lookup(single, rest).into_iter().collect(),
    }
}

fn lookup<'v>(value: &'v Value, segments: &[&str]) -> Option<&'v Value> {
    segments.iter().try_fold(value, |v, key| v.get(*key))
}

#[derive(Debug, Default)]
pub struct QueryFilterBuilder {
    pending: Vec<(String, Predicate)>,
}

impl QueryFilterBuilder {
    pub fn eq(mut self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.pending
            .push((field.to_string(), Predicate::Eq(value.into())));
        self
    }

    pub fn is_in<V: Into<FilterValue>>(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.pending.push((field.to_string(), Predicate::In(values)));
        self
    }

    /// Validate every constraint against the field table
    pub fn build(self) -> Result<QueryFilter, QueryBuildError> {
        let mut constraints = Vec::with_capacity(self.pending.len());

        for (path, predicate) in self.pending {
            let field =
                get_field(&path).ok_or_else(|| QueryBuildError::UnknownField(path.clone()))?;

            if let Predicate::In(values) = &predicate {
                if values.is_empty() {
                    return Err(QueryBuildError::EmptySet(path));
                }
            }

            let predicate = coerce(field, predicate)?;
            constraints.push(Constraint { field, predicate });
        }

        Ok(QueryFilter { constraints })
    }
}

/// Check literal types against the field, widening integers on real fields
fn coerce(field: &FieldSchema, predicate: Predicate) -> Result<Predicate, QueryBuildError> {
    let convert = |value: FilterValue| match (field.field_type, value) {
        (FieldType::Text, v @ FilterValue::Text(_)) => Ok(v),
        (FieldType::Integer, v @ FilterValue::Integer(_)) => Ok(v),
        (FieldType::Real, v @ FilterValue::Real(_)) => Ok(v),
        (FieldType::Real, FilterValue::Integer(i)) => Ok(FilterValue::Real(i as f64)),
        (expected, other) => Err(QueryBuildError::TypeMismatch {
            field: field.path.to_string(),
            expected,
            found: other.kind_name(),
        }),
    };

    match predicate {
        Predicate::Eq(v) => Ok(Predicate::Eq(convert(v)?)),
        Predicate::In(vs) => vs
            .into_iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()
            .map(Predicate::In),
    }
}

//! Filter criteria for paged collection requests.
//!
//! A [`FilterCriteria`] always carries the paging and search parameters the
//! backend understands (`startIndex`, `limit`, `q`, `totalCount`, `v`) plus
//! any domain fields a screen declares. Domain fields are checked against a
//! closed list of [`FilterField`]s so a screen can only filter on what it
//! declared, with the declared kind.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;
use url::form_urlencoded;

use crate::error::FilterError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Candidate page sizes offered to the page size selector.
pub const PAGE_SIZES: [u32; 5] = [10, 20, 30, 40, 50];

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

const START_INDEX: &str = "startIndex";
const LIMIT: &str = "limit";
const SEARCH: &str = "q";
const TOTAL_COUNT: &str = "totalCount";
const REPRESENTATION: &str = "v";

/// How much nested data the server includes in each returned record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Representation {
  #[default]
  Default,
  Full,
  /// Custom field list, passed through verbatim.
  Custom(String),
}

impl Representation {
  pub fn as_param(&self) -> &str {
    match self {
      Representation::Default => "default",
      Representation::Full => "full",
      Representation::Custom(fields) => fields,
    }
  }

  pub fn parse(value: &str) -> Self {
    match value {
      "default" => Representation::Default,
      "full" => Representation::Full,
      other => Representation::Custom(other.to_string()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Int,
  Bool,
  Date,
  DateTime,
}

impl fmt::Display for FieldKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      FieldKind::Text => "text",
      FieldKind::Int => "integer",
      FieldKind::Bool => "boolean",
      FieldKind::Date => "date",
      FieldKind::DateTime => "date-time",
    };
    f.write_str(name)
  }
}

/// A domain filter field a screen supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
  pub name: &'static str,
  pub kind: FieldKind,
}

impl FilterField {
  pub const fn text(name: &'static str) -> Self {
    Self {
      name,
      kind: FieldKind::Text,
    }
  }

  pub const fn int(name: &'static str) -> Self {
    Self {
      name,
      kind: FieldKind::Int,
    }
  }

  pub const fn flag(name: &'static str) -> Self {
    Self {
      name,
      kind: FieldKind::Bool,
    }
  }

  pub const fn date(name: &'static str) -> Self {
    Self {
      name,
      kind: FieldKind::Date,
    }
  }

  pub const fn date_time(name: &'static str) -> Self {
    Self {
      name,
      kind: FieldKind::DateTime,
    }
  }
}

/// Look up a declared field by name.
pub fn find_field<'a>(schema: &'a [FilterField], name: &str) -> Option<&'a FilterField> {
  schema.iter().find(|field| field.name == name)
}

/// Scalar or date value of a domain filter field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
  Text(String),
  Int(i64),
  Bool(bool),
  Date(NaiveDate),
  DateTime(DateTime<Utc>),
}

impl FilterValue {
  pub fn kind(&self) -> FieldKind {
    match self {
      FilterValue::Text(_) => FieldKind::Text,
      FilterValue::Int(_) => FieldKind::Int,
      FilterValue::Bool(_) => FieldKind::Bool,
      FilterValue::Date(_) => FieldKind::Date,
      FilterValue::DateTime(_) => FieldKind::DateTime,
    }
  }

  /// Render the value the way the server expects it in a query string.
  pub fn to_param(&self) -> String {
    match self {
      FilterValue::Text(s) => s.clone(),
      FilterValue::Int(n) => n.to_string(),
      FilterValue::Bool(b) => b.to_string(),
      FilterValue::Date(d) => d.format(DATE_FORMAT).to_string(),
      FilterValue::DateTime(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
    }
  }

  /// Parse a query-string value for a field of the given kind.
  pub fn parse(field: &str, kind: FieldKind, raw: &str) -> Result<Self, FilterError> {
    let invalid = || FilterError::InvalidValue {
      field: field.to_string(),
      value: raw.to_string(),
    };
    let value = match kind {
      FieldKind::Text => FilterValue::Text(raw.to_string()),
      FieldKind::Int => FilterValue::Int(raw.parse().map_err(|_| invalid())?),
      FieldKind::Bool => FilterValue::Bool(parse_bool(raw).ok_or_else(invalid)?),
      FieldKind::Date => {
        FilterValue::Date(NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())?)
      }
      FieldKind::DateTime => FilterValue::DateTime(
        DateTime::parse_from_str(raw, DATE_TIME_FORMAT)
          .map_err(|_| invalid())?
          .with_timezone(&Utc),
      ),
    };
    Ok(value)
  }
}

fn parse_bool(raw: &str) -> Option<bool> {
  match raw {
    "true" => Some(true),
    "false" => Some(false),
    _ => None,
  }
}

/// Query parameters describing which page, search text and domain
/// constraints apply to a collection request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
  /// Zero-based page offset, always `current_page - 1`.
  pub start_index: u32,
  pub limit: u32,
  pub q: String,
  /// Ask the server to also return the total row count.
  pub total_count: bool,
  pub v: Representation,
  /// Domain fields that currently hold a value. Unset fields are absent.
  pub fields: BTreeMap<String, FilterValue>,
}

impl Default for FilterCriteria {
  fn default() -> Self {
    Self {
      start_index: 0,
      limit: DEFAULT_PAGE_SIZE,
      q: String::new(),
      total_count: true,
      v: Representation::Default,
      fields: BTreeMap::new(),
    }
  }
}

impl FilterCriteria {
  pub fn with_start_index(mut self, start_index: u32) -> Self {
    self.start_index = start_index;
    self
  }

  pub fn with_limit(mut self, limit: u32) -> Self {
    self.limit = limit;
    self
  }

  pub fn with_search(mut self, q: impl Into<String>) -> Self {
    self.q = q.into();
    self
  }

  pub fn with_total_count(mut self, total_count: bool) -> Self {
    self.total_count = total_count;
    self
  }

  pub fn with_representation(mut self, v: Representation) -> Self {
    self.v = v;
    self
  }

  pub fn with_field(mut self, name: impl Into<String>, value: FilterValue) -> Self {
    self.fields.insert(name.into(), value);
    self
  }

  pub fn field(&self, name: &str) -> Option<&FilterValue> {
    self.fields.get(name)
  }

  /// Check every domain field against the declared schema.
  ///
  /// Also rejects a `startIndex` with no one-based page number.
  pub fn validate(&self, schema: &[FilterField]) -> Result<(), FilterError> {
    if self.start_index == u32::MAX {
      return Err(FilterError::InvalidValue {
        field: START_INDEX.to_string(),
        value: self.start_index.to_string(),
      });
    }
    for (name, value) in &self.fields {
      check_field(schema, name, value)?;
    }
    Ok(())
  }

  /// Serialize into query-string form.
  ///
  /// Paging parameters come first in a fixed order, followed by domain
  /// fields in name order, so equal criteria always produce the same string.
  /// An empty search string is omitted.
  pub fn to_query_string(&self) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair(START_INDEX, &self.start_index.to_string());
    query.append_pair(LIMIT, &self.limit.to_string());
    if !self.q.is_empty() {
      query.append_pair(SEARCH, &self.q);
    }
    query.append_pair(TOTAL_COUNT, &self.total_count.to_string());
    query.append_pair(REPRESENTATION, self.v.as_param());
    for (name, value) in &self.fields {
      query.append_pair(name, &value.to_param());
    }
    query.finish()
  }

  /// Parse a query string produced by [`to_query_string`](Self::to_query_string).
  ///
  /// Missing paging parameters take their defaults. Parameters that are not
  /// paging parameters must be declared in `schema`.
  pub fn from_query_string(query: &str, schema: &[FilterField]) -> Result<Self, FilterError> {
    let mut criteria = FilterCriteria::default();
    for (name, raw) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
      let invalid = || FilterError::InvalidValue {
        field: name.to_string(),
        value: raw.to_string(),
      };
      match name.as_ref() {
        START_INDEX => criteria.start_index = raw.parse().map_err(|_| invalid())?,
        LIMIT => criteria.limit = raw.parse().map_err(|_| invalid())?,
        SEARCH => criteria.q = raw.into_owned(),
        TOTAL_COUNT => criteria.total_count = parse_bool(&raw).ok_or_else(invalid)?,
        REPRESENTATION => criteria.v = Representation::parse(&raw),
        other => {
          let field =
            find_field(schema, other).ok_or_else(|| FilterError::UndeclaredField(other.into()))?;
          let value = FilterValue::parse(other, field.kind, &raw)?;
          criteria.fields.insert(other.to_string(), value);
        }
      }
    }
    Ok(criteria)
  }

  /// Cache/request key for this filter against an endpoint path.
  pub fn request_key(&self, path: &str) -> String {
    format!("{}?{}", path, self.to_query_string())
  }
}

/// Ensure `name` is declared and `value` has the declared kind.
pub fn check_field(schema: &[FilterField], name: &str, value: &FilterValue) -> Result<(), FilterError> {
  let field = find_field(schema, name).ok_or_else(|| FilterError::UndeclaredField(name.into()))?;
  if field.kind != value.kind() {
    return Err(FilterError::KindMismatch {
      field: name.to_string(),
      expected: field.kind,
      found: value.kind(),
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  const SCHEMA: &[FilterField] = &[
    FilterField::text("status"),
    FilterField::date("minActivatedDate"),
    FilterField::date_time("collectedAfter"),
    FilterField::flag("referredIn"),
    FilterField::int("priority"),
  ];

  #[test]
  fn test_defaults() {
    let filter = FilterCriteria::default();
    assert_eq!(filter.start_index, 0);
    assert_eq!(filter.limit, 10);
    assert_eq!(filter.q, "");
    assert!(filter.total_count);
    assert_eq!(filter.v, Representation::Default);
  }

  #[test]
  fn test_query_string_order_and_format() {
    let filter = FilterCriteria::default()
      .with_start_index(2)
      .with_limit(20)
      .with_search("hb a1c")
      .with_field("status", FilterValue::Text("PENDING".into()))
      .with_field(
        "minActivatedDate",
        FilterValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
      )
      .with_field("referredIn", FilterValue::Bool(false));

    assert_eq!(
      filter.to_query_string(),
      "startIndex=2&limit=20&q=hb+a1c&totalCount=true&v=default\
       &minActivatedDate=2024-03-01&referredIn=false&status=PENDING"
    );
  }

  #[test]
  fn test_empty_search_is_omitted() {
    let qs = FilterCriteria::default().to_query_string();
    assert_eq!(qs, "startIndex=0&limit=10&totalCount=true&v=default");
  }

  #[test]
  fn test_round_trip_paging_fields() {
    let filter = FilterCriteria::default()
      .with_start_index(2)
      .with_limit(20)
      .with_search("abc")
      .with_total_count(true);

    let parsed = FilterCriteria::from_query_string(&filter.to_query_string(), SCHEMA).unwrap();
    assert_eq!(parsed.start_index, 2);
    assert_eq!(parsed.limit, 20);
    assert_eq!(parsed.q, "abc");
    assert!(parsed.total_count);
    assert_eq!(parsed, filter);
  }

  #[test]
  fn test_round_trip_ignores_key_order() {
    let parsed =
      FilterCriteria::from_query_string("q=abc&totalCount=true&limit=20&startIndex=2", SCHEMA)
        .unwrap();
    let expected = FilterCriteria::default()
      .with_start_index(2)
      .with_limit(20)
      .with_search("abc");
    assert_eq!(parsed, expected);
  }

  #[test]
  fn test_date_time_round_trip() {
    let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    let filter = FilterCriteria::default()
      .with_field("collectedAfter", FilterValue::DateTime(at))
      .with_representation(Representation::Custom("custom:(uuid,display)".into()));

    assert!(filter
      .to_query_string()
      .contains("collectedAfter=2024-05-06T07%3A08%3A09.000%2B0000"));
    let parsed = FilterCriteria::from_query_string(&filter.to_query_string(), SCHEMA).unwrap();
    assert_eq!(parsed, filter);
  }

  #[test]
  fn test_undeclared_field_rejected() {
    let err = FilterCriteria::from_query_string("location=abc", SCHEMA).unwrap_err();
    assert_eq!(err, FilterError::UndeclaredField("location".into()));
  }

  #[test]
  fn test_kind_mismatch_rejected() {
    let filter = FilterCriteria::default().with_field("referredIn", FilterValue::Text("yes".into()));
    assert_eq!(
      filter.validate(SCHEMA),
      Err(FilterError::KindMismatch {
        field: "referredIn".into(),
        expected: FieldKind::Bool,
        found: FieldKind::Text,
      })
    );
  }

  #[test]
  fn test_invalid_bool_value() {
    let err = FilterCriteria::from_query_string("referredIn=maybe", SCHEMA).unwrap_err();
    assert!(matches!(err, FilterError::InvalidValue { .. }));
  }

  #[test]
  fn test_start_index_without_page_number_rejected() {
    let filter = FilterCriteria::from_query_string("startIndex=4294967295", SCHEMA).unwrap();
    assert_eq!(
      filter.validate(SCHEMA),
      Err(FilterError::InvalidValue {
        field: "startIndex".into(),
        value: "4294967295".into(),
      })
    );
    assert!(FilterCriteria::default()
      .with_start_index(u32::MAX - 1)
      .validate(SCHEMA)
      .is_ok());
  }

  #[test]
  fn test_request_key() {
    let key = FilterCriteria::default()
      .with_start_index(2)
      .request_key("/labmanagement/sample");
    assert_eq!(
      key,
      "/labmanagement/sample?startIndex=2&limit=10&totalCount=true&v=default"
    );
  }
}

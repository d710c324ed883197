// Query payload generation
//
// Builds the `search` filter trees understood by the data service:
//   single field:  {"部门": {"$like": "%技术部%"}}
//   union:         {"$or": [{"姓名": {"$like": "%张%"}}, {"员工编号": {"$like": "%1042%"}}]}
//
// All randomness comes from the caller's RNG so tests can seed it.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::config::Vocabulary;
use crate::error::LoadTestError;

/// Page numbers drawn by paginated queries
pub const PAGE_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
/// Page sizes drawn by paginated queries
pub const PAGE_SIZES: [u32; 4] = [10, 20, 50, 100];
/// Page size for simple queries
pub const SIMPLE_PAGE_SIZE: u32 = 100;
/// Page size for complex queries
pub const COMPLEX_PAGE_SIZE: u32 = 50;

/// Column of the annual-leave table a condition can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryField {
    Department,
    Name,
    EmployeeId,
    VacationDays,
}

impl QueryField {
    pub const ALL: [QueryField; 4] = [
        QueryField::Department,
        QueryField::Name,
        QueryField::EmployeeId,
        QueryField::VacationDays,
    ];

    /// Column name as stored in the spreadsheet
    pub fn column(&self) -> &'static str {
        match self {
            QueryField::Department => "部门",
            QueryField::Name => "姓名",
            QueryField::EmployeeId => "员工编号",
            QueryField::VacationDays => "当前剩余年休假_天",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }
}

/// `$like` filter on one column; `pattern` is already wildcard-wrapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeMatch {
    pub field: QueryField,
    pub pattern: String,
}

impl LikeMatch {
    pub fn contains(field: QueryField, value: &str) -> Self {
        Self {
            field,
            pattern: format!("%{}%", value),
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            self.field.column().to_string(),
            json!({ "$like": self.pattern }),
        );
        Value::Object(map)
    }
}

/// Structured filter sent in the `search` query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCondition {
    Like(LikeMatch),
    /// Logical union of single-field matches
    Or(Vec<LikeMatch>),
}

impl QueryCondition {
    pub fn to_value(&self) -> Value {
        match self {
            QueryCondition::Like(m) => m.to_value(),
            QueryCondition::Or(matches) => {
                json!({ "$or": matches.iter().map(LikeMatch::to_value).collect::<Vec<_>>() })
            }
        }
    }

    /// JSON text for the `search` parameter. Non-ASCII is kept as-is.
    pub fn to_search_string(&self) -> String {
        self.to_value().to_string()
    }

    /// Fields referenced by this condition, in order
    pub fn fields(&self) -> Vec<QueryField> {
        match self {
            QueryCondition::Like(m) => vec![m.field],
            QueryCondition::Or(matches) => matches.iter().map(|m| m.field).collect(),
        }
    }
}

impl Serialize for QueryCondition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Query shape requested for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Simple,
    Complex,
    Paginated,
    /// Picks one of the other three per request
    Mixed,
}

impl QueryCategory {
    pub const CONCRETE: [QueryCategory; 3] = [
        QueryCategory::Simple,
        QueryCategory::Complex,
        QueryCategory::Paginated,
    ];

    /// Resolve `Mixed` to a concrete category; others are returned unchanged
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> QueryCategory {
        match self {
            QueryCategory::Mixed => Self::CONCRETE[rng.gen_range(0..Self::CONCRETE.len())],
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::Simple => "simple",
            QueryCategory::Complex => "complex",
            QueryCategory::Paginated => "paginated",
            QueryCategory::Mixed => "mixed",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryCategory {
    type Err = LoadTestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(QueryCategory::Simple),
            "complex" => Ok(QueryCategory::Complex),
            "paginated" | "pagination" => Ok(QueryCategory::Paginated),
            "mixed" | "" => Ok(QueryCategory::Mixed),
            _ => Err(LoadTestError::UnknownCategory(s.to_string())),
        }
    }
}

/// Query-string values for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestParameters {
    pub page: u32,
    pub limit: u32,
    pub search: QueryCondition,
    /// Concrete category this request was generated for
    #[serde(skip)]
    pub category: QueryCategory,
}

impl RequestParameters {
    /// `page`, `limit` and `search` as sent on the wire
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("search", self.search.to_search_string()),
        ]
    }
}

/// Generates randomized query payloads from a fixed vocabulary
#[derive(Debug, Clone, Default)]
pub struct QueryGenerator {
    vocabulary: Vocabulary,
}

impl QueryGenerator {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// One field, one value, substring match
    pub fn generate_simple<R: Rng + ?Sized>(&self, rng: &mut R) -> QueryCondition {
        let field = QueryField::ALL[rng.gen_range(0..QueryField::ALL.len())];
        QueryCondition::Like(self.like_for(field, rng))
    }

    /// `$or` over 2 or 3 distinct fields
    pub fn generate_complex<R: Rng + ?Sized>(&self, rng: &mut R) -> QueryCondition {
        let field_count = rng.gen_range(2..=3);
        self.generate_complex_with(rng, field_count)
    }

    /// `$or` over exactly `field_count` distinct fields (capped at the field set size)
    pub fn generate_complex_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        field_count: usize,
    ) -> QueryCondition {
        let fields: Vec<QueryField> = QueryField::ALL
            .choose_multiple(rng, field_count.min(QueryField::ALL.len()))
            .copied()
            .collect();
        let matches = fields
            .into_iter()
            .map(|field| self.like_for(field, rng))
            .collect();
        QueryCondition::Or(matches)
    }

    /// Random page and page size wrapping a simple or complex condition
    pub fn generate_paginated<R: Rng + ?Sized>(&self, rng: &mut R) -> RequestParameters {
        let page = rng.gen_range(PAGE_RANGE);
        let limit = PAGE_SIZES[rng.gen_range(0..PAGE_SIZES.len())];
        let search = if rng.gen_bool(0.5) {
            self.generate_simple(rng)
        } else {
            self.generate_complex(rng)
        };

        RequestParameters {
            page,
            limit,
            search,
            category: QueryCategory::Paginated,
        }
    }

    /// Build the parameters for one request, resolving `Mixed` first
    pub fn build<R: Rng + ?Sized>(&self, category: QueryCategory, rng: &mut R) -> RequestParameters {
        match category.resolve(rng) {
            QueryCategory::Simple => RequestParameters {
                page: 1,
                limit: SIMPLE_PAGE_SIZE,
                search: self.generate_simple(rng),
                category: QueryCategory::Simple,
            },
            QueryCategory::Complex => RequestParameters {
                page: 1,
                limit: COMPLEX_PAGE_SIZE,
                search: self.generate_complex(rng),
                category: QueryCategory::Complex,
            },
            QueryCategory::Paginated | QueryCategory::Mixed => self.generate_paginated(rng),
        }
    }

    fn like_for<R: Rng + ?Sized>(&self, field: QueryField, rng: &mut R) -> LikeMatch {
        let vocab = &self.vocabulary;
        let value = match field {
            QueryField::Department => vocab.departments.choose(rng).cloned(),
            QueryField::Name => vocab.names.choose(rng).cloned(),
            QueryField::EmployeeId => Some(
                rng.gen_range(vocab.employee_id_start..vocab.employee_id_end)
                    .to_string(),
            ),
            QueryField::VacationDays => vocab.vacation_days.choose(rng).cloned(),
        };
        LikeMatch::contains(field, &value.unwrap_or_default())
    }
}

//! Search query builder for the Zendesk search DSL.
//!
//! Zendesk's `/search.json` takes a single `query` string of comma-joined
//! `field<op>"value"` clauses led by a `type:` tag, for example
//! `type:ticket,status:"open",`. The trailing comma is accepted by Zendesk.
//!
//! [`SearchQuery`] is the generic builder; [`TicketFilter`] is the typed
//! request object for ticket searches; [`build_query`] is the string-keyed
//! entry point for callers holding loose parameters.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::BridgeError;

/// Operator used when a parameter has no explicit condition.
pub const DEFAULT_CONDITION: &str = ":";

/// Entity types the search endpoint can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchType {
    /// Tickets.
    Ticket,
    /// Users.
    User,
    /// Organizations.
    Organization,
    /// Groups.
    Group,
}

impl SearchType {
    /// Returns the tag used in `type:<tag>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Ticket => "ticket",
            SearchType::User => "user",
            SearchType::Organization => "organization",
            SearchType::Group => "group",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ticket" => Ok(SearchType::Ticket),
            "user" => Ok(SearchType::User),
            "organization" => Ok(SearchType::Organization),
            "group" => Ok(SearchType::Group),
            other => Err(BridgeError::validation(format!(
                "unsupported search type: {:?}",
                other
            ))),
        }
    }
}

/// Returns true for values the search engine cannot match on.
///
/// `null`, `false`, `0`, `""`, `"0"` and empty arrays or objects.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Renders a parameter value without JSON quoting.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

/// Builder for one search query.
///
/// Parameters keep their insertion order.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    search_type: SearchType,
    params: Vec<(String, Value)>,
    aliases: HashMap<String, String>,
    conditions: HashMap<String, String>,
    exclude: Vec<String>,
}

impl SearchQuery {
    /// Starts a query for the given entity type.
    pub fn new(search_type: SearchType) -> Self {
        Self {
            search_type,
            params: Vec::new(),
            aliases: HashMap::new(),
            conditions: HashMap::new(),
            exclude: Vec::new(),
        }
    }

    /// Starts a ticket query.
    pub fn tickets() -> Self {
        Self::new(SearchType::Ticket)
    }

    /// Returns the entity type.
    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    /// Adds a parameter. Setting the same key twice replaces its value in place.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Emits `field` instead of `key` for this parameter.
    pub fn alias(mut self, key: impl Into<String>, field: impl Into<String>) -> Self {
        self.aliases.insert(key.into(), field.into());
        self
    }

    /// Uses `operator` (e.g. `>`, `<`, `:`) instead of `:` for this parameter.
    pub fn condition(mut self, key: impl Into<String>, operator: impl Into<String>) -> Self {
        self.conditions.insert(key.into(), operator.into());
        self
    }

    /// Drops this parameter from the output even if it is set.
    pub fn exclude(mut self, key: impl Into<String>) -> Self {
        self.exclude.push(key.into());
        self
    }

    /// Renders the query string.
    pub fn build(&self) -> String {
        let mut query = format!("type:{},", self.search_type);

        for (key, value) in &self.params {
            if self.exclude.contains(key) || is_falsy(value) {
                continue;
            }

            let field = self.aliases.get(key).unwrap_or(key);
            let condition = self
                .conditions
                .get(key)
                .map(String::as_str)
                .unwrap_or(DEFAULT_CONDITION);

            query.push_str(&format!("{}{}\"{}\",", field, condition, render_value(value)));
        }

        query
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// Builds a query from loose, string-keyed parameters.
///
/// Returns an empty string when `entity_type` is not one of `ticket`,
/// `user`, `organization` or `group`.
pub fn build_query(
    entity_type: &str,
    params: &[(&str, Value)],
    aliases: &HashMap<&str, &str>,
    conditions: &HashMap<&str, &str>,
    exclude_keys: &[&str],
) -> String {
    let Ok(search_type) = entity_type.parse::<SearchType>() else {
        return String::new();
    };

    let mut query = SearchQuery::new(search_type);
    for (key, value) in params {
        query = query.param(*key, value.clone());
    }
    for (key, field) in aliases {
        query = query.alias(*key, *field);
    }
    for (key, operator) in conditions {
        query = query.condition(*key, *operator);
    }
    for key in exclude_keys {
        query = query.exclude(*key);
    }

    query.build()
}

/// Typed filter for ticket searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    /// Exact status, e.g. `open`.
    pub status: Option<String>,
    /// Exact priority, e.g. `high`.
    pub priority: Option<String>,
    /// Words in the subject.
    pub subject: Option<String>,
    /// Brand id.
    pub brand_id: Option<u64>,
    /// Created strictly after this date (`YYYY-MM-DD`).
    pub created_after: Option<String>,
    /// Created strictly before this date (`YYYY-MM-DD`).
    pub created_before: Option<String>,
    /// Updated strictly after this date (`YYYY-MM-DD`).
    pub updated_after: Option<String>,
    /// Updated strictly before this date (`YYYY-MM-DD`).
    pub updated_before: Option<String>,
}

impl TicketFilter {
    /// Creates an empty filter (matches every ticket in scope).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Filters by priority.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Filters by subject words.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Filters by brand.
    pub fn with_brand(mut self, brand_id: u64) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    /// Filters by creation date range; either bound may be omitted.
    pub fn with_created_between(mut self, after: Option<String>, before: Option<String>) -> Self {
        self.created_after = after;
        self.created_before = before;
        self
    }

    /// Filters by update date range; either bound may be omitted.
    pub fn with_updated_between(mut self, after: Option<String>, before: Option<String>) -> Self {
        self.updated_after = after;
        self.updated_before = before;
        self
    }

    /// Converts the filter into a ticket query.
    ///
    /// Double quotes are stripped from text values so each one stays a
    /// single quoted term.
    pub fn to_query(&self) -> SearchQuery {
        fn opt(value: &Option<String>) -> Value {
            value
                .as_deref()
                .map(|v| v.replace('"', "").trim().to_string())
                .filter(|v| !v.is_empty())
                .map_or(Value::Null, Value::String)
        }

        SearchQuery::tickets()
            .param("status", opt(&self.status))
            .param("priority", opt(&self.priority))
            .param("subject", opt(&self.subject))
            .param("brand_id", self.brand_id.map(Value::from).unwrap_or(Value::Null))
            .alias("brand_id", "brand")
            .param("created_after", opt(&self.created_after))
            .alias("created_after", "created")
            .condition("created_after", ">")
            .param("created_before", opt(&self.created_before))
            .alias("created_before", "created")
            .condition("created_before", "<")
            .param("updated_after", opt(&self.updated_after))
            .alias("updated_after", "updated")
            .condition("updated_after", ">")
            .param("updated_before", opt(&self.updated_before))
            .alias("updated_before", "updated")
            .condition("updated_before", "<")
    }
}

impl From<&TicketFilter> for SearchQuery {
    fn from(filter: &TicketFilter) -> Self {
        filter.to_query()
    }
}

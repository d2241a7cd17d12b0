//! On-demand generation of activity cube queries.
//!
//! A [`QueryRequest`] is validated into an [`ActivityPlan`] before any tree is
//! built, so every user error surfaces without partial output.

mod cube;
mod selector;

use crate::{
    dimension::Dimension,
    error::{Result, ServiceError},
    time::TimeRange,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Dashboard stand-in for a label that is missing or empty on the series.
pub const BLANK_PLACEHOLDER: &str = "<empty>";

/// Legend value for backends that are not waiting on anything.
pub const CPU_WAIT_EVENT: &str = "CPU";

/// Raw dashboard parameters. Absent fields are empty strings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryRequest {
    #[serde(alias = "database-list")]
    pub database_list: String,
    pub start: String,
    pub end: String,
    pub step: String,
    pub legend: String,
    pub dim: String,
    #[serde(alias = "filter-dim")]
    pub filter_dim: String,
    #[serde(alias = "filter-dim-selected")]
    pub filter_dim_selected: String,
    pub limit: String,
    #[serde(alias = "limit-legend")]
    pub limit_legend: String,
    pub offset: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Number of ranked entries that must survive the first `topk` pass.
    pub fn depth(&self) -> i64 {
        self.limit.saturating_add(self.offset)
    }
}

/// A fully validated request.
#[derive(Debug, Clone)]
pub struct ActivityPlan {
    pub databases: Vec<String>,
    pub range: TimeRange,
    pub dim: Dimension,
    pub legend: Dimension,
    pub filter: Vec<(&'static str, String)>,
    pub page: Option<Page>,
    pub limit_legend: Option<i64>,
}

impl ActivityPlan {
    pub fn from_request(request: &QueryRequest, now: DateTime<Utc>) -> Result<Self> {
        let databases: Vec<String> = split_values(&request.database_list)
            .map(str::to_string)
            .collect();

        let missing: Vec<_> = [
            ("database_list", databases.is_empty()),
            ("start", optional(&request.start).is_none()),
            ("dim", optional(&request.dim).is_none()),
            ("legend", optional(&request.legend).is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        if !missing.is_empty() {
            return Err(ServiceError::MissingParameters(missing.join(", ")));
        }

        let range = TimeRange::resolve(&request.start, &request.end, now)?;

        let dim: Dimension = request.dim.trim().parse()?;
        let legend: Dimension = request.legend.trim().parse()?;
        let filter_dim = optional(&request.filter_dim)
            .map(str::parse::<Dimension>)
            .transpose()?;

        if !dim.is_time() && range.seconds() <= 0 {
            return Err(ServiceError::InvalidTime(format!(
                "time range must be positive to build a window, got {}s",
                range.seconds()
            )));
        }

        let limit = parse_count("limit", &request.limit, 1)?;
        let offset = parse_count("offset", &request.offset, 0)?;
        let limit_legend = parse_count("limit_legend", &request.limit_legend, 1)?;

        let filter = match (filter_dim, optional(&request.filter_dim_selected)) {
            (Some(filter_dim), Some(selected)) => {
                selector::filter_matchers(filter_dim, selected)?
            }
            _ => Vec::new(),
        };

        Ok(Self {
            databases,
            range,
            dim,
            legend,
            filter,
            page: limit.map(|limit| Page {
                limit,
                offset: offset.unwrap_or(0),
            }),
            limit_legend,
        })
    }
}

/// Execution options handed alongside the query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOptions {
    pub start: i64,
    pub end: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub dim: Dimension,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_legend: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    pub query: String,
    pub options: QueryOptions,
}

/// Builds the query text for one dashboard request.
pub fn generate(request: &QueryRequest) -> Result<String> {
    generate_at(request, Utc::now())
}

/// Like [`generate`], resolving relative times against `now`.
pub fn generate_at(request: &QueryRequest, now: DateTime<Utc>) -> Result<String> {
    let plan = ActivityPlan::from_request(request, now)?;
    Ok(render(&plan))
}

/// Query text plus the options the executing collaborator needs.
pub fn translate(request: &QueryRequest) -> Result<TranslateResponse> {
    translate_at(request, Utc::now())
}

pub fn translate_at(request: &QueryRequest, now: DateTime<Utc>) -> Result<TranslateResponse> {
    let plan = ActivityPlan::from_request(request, now)?;
    let query = render(&plan);

    Ok(TranslateResponse {
        query,
        options: QueryOptions {
            start: plan.range.start.timestamp(),
            end: plan.range.end.timestamp(),
            step: optional(&request.step).map(str::to_string),
            dim: plan.dim,
            limit_legend: plan.limit_legend,
        },
    })
}

fn render(plan: &ActivityPlan) -> String {
    let query = cube::build(plan).render();
    debug!(dim = %plan.dim, legend = %plan.legend, %query, "generated activity query");
    query
}

fn optional(raw: &str) -> Option<&str> {
    let value = raw.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_count(name: &str, raw: &str, min: i64) -> Result<Option<i64>> {
    let Some(value) = optional(raw) else {
        return Ok(None);
    };
    let parsed = value.parse::<i64>().map_err(|_| {
        ServiceError::InvalidNumber(format!("{name} must be an integer, got '{value}'"))
    })?;
    if parsed < min {
        return Err(ServiceError::InvalidNumber(format!(
            "{name} must be at least {min}"
        )));
    }
    Ok(Some(parsed))
}

/// Comma-separated list entries, trimmed, empties dropped.
fn split_values(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

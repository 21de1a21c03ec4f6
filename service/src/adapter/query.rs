use crate::adapter::AdapterError;
use crate::connect::{Backend, unwrap_field};
use crate::intention::Intentions;
use crate::query::{Comparator, QuerySpec, QuerySpecWithSource};
use crate::segment::{ApproximationResults, Segment};

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Attribute name → comparator between the compared selections.
pub type Comparison = FxHashMap<String, Comparator>;

#[derive(Serialize)]
struct ParseRequest<'a> {
    nl_query: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpecRequest<'a> {
    query_spec: &'a QuerySpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefineRequest {
    pub old_queryspec_with_source: Option<QuerySpecWithSource>,
    pub segments: Vec<Segment>,
    pub intentions: Intentions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRequest {
    pub segments: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<[usize; 2]>>,
}

pub async fn parse_nl_query(
    backend: &Backend,
    nl_query: &str,
) -> Result<QuerySpecWithSource, AdapterError> {
    if nl_query.trim().is_empty() {
        return Err(AdapterError::InvalidRequest("Query text is empty".to_string()));
    }

    let response = backend
        .post_json("/api/parse_nl_query", &ParseRequest { nl_query })
        .await
        .inspect_err(|e| log::error!("parse_nl_query failed: {e}"))?;

    unwrap_field(response, "results")
}

pub async fn query_by_specification(
    backend: &Backend,
    query_spec: &QuerySpec,
) -> Result<ApproximationResults, AdapterError> {
    let response = backend
        .post_json("/api/query_by_specification", &SpecRequest { query_spec })
        .await
        .inspect_err(|e| log::error!("query_by_specification failed: {e}"))?;

    unwrap_field(response, "results")
}

pub async fn modify_nl_query(
    backend: &Backend,
    request: &RefineRequest,
) -> Result<QuerySpecWithSource, AdapterError> {
    let response = backend
        .post_json("/api/modify_nl_query", request)
        .await
        .inspect_err(|e| log::error!("modify_nl_query failed: {e}"))?;

    unwrap_field(response, "results")
}

pub async fn segment_comparison(
    backend: &Backend,
    request: &ComparisonRequest,
) -> Result<Comparison, AdapterError> {
    let response = backend
        .post_json("/api/segment_comparison", request)
        .await
        .inspect_err(|e| log::error!("segment_comparison failed: {e}"))?;

    unwrap_field(response, "results")
}

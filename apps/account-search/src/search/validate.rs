//! Caller-side validation of search requests.
//!
//! Endpoint handlers run these checks before handing criteria to the
//! executor, which itself never validates or clamps.

use super::{ExternalIdSearch, SearchCriteria};
use crate::config::SearchConfig;
use crate::{Error, Result};

/// Parse a request payload into criteria.
///
/// Structurally invalid payloads, such as a negative `offsetBy`, are reported
/// as `MalformedFilterValue`. `orgMembership` in the payload is ignored.
pub fn parse_criteria(payload: &str) -> Result<SearchCriteria> {
    serde_json::from_str(payload).map_err(|e| Error::MalformedFilterValue(e.to_string()))
}

/// Parse a request payload into an external id search.
pub fn parse_external_id_search(payload: &str) -> Result<ExternalIdSearch> {
    serde_json::from_str(payload).map_err(|e| Error::MalformedFilterValue(e.to_string()))
}

pub fn validate_criteria(criteria: &SearchCriteria, config: &SearchConfig) -> Result<()> {
    validate_page_size(criteria.page_size(), config)?;

    if let (Some(start), Some(end)) = (criteria.start_time(), criteria.end_time()) {
        if start > end {
            return Err(Error::MalformedFilterValue(format!(
                "startTime ({}) is after endTime ({})",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
    }

    let overlap: Vec<&str> = criteria
        .all_of_groups()
        .intersection(criteria.none_of_groups())
        .map(String::as_str)
        .collect();
    if !overlap.is_empty() {
        return Err(Error::MalformedFilterValue(format!(
            "allOfGroups and noneOfGroups both contain: {}",
            overlap.join(", ")
        )));
    }

    Ok(())
}

pub fn validate_external_id_search(search: &ExternalIdSearch, config: &SearchConfig) -> Result<()> {
    validate_page_size(search.page_size, config)
}

fn validate_page_size(page_size: u32, config: &SearchConfig) -> Result<()> {
    if page_size < config.min_page_size || page_size > config.max_page_size {
        return Err(Error::MalformedFilterValue(format!(
            "pageSize must be from {}-{} records",
            config.min_page_size, config.max_page_size
        )));
    }
    Ok(())
}

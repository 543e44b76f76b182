//! Account search criteria.
//!
//! `SearchCriteria` is an immutable value assembled through
//! `SearchCriteriaBuilder`. Every filter is optional; an empty criteria matches
//! every account in the tenant. Equality and hashing compare the creation-time
//! bounds by their canonical RFC 3339 form, so values that went through a
//! serialize/deserialize round-trip (or were built from a different time zone
//! type) still compare equal.

use crate::config::DEFAULT_PAGE_SIZE;
use crate::models::AccountStatus;
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// The "no filters" search: first page, default page size, every account.
pub static EMPTY_SEARCH: SearchCriteria = SearchCriteria {
    offset_by: 0,
    page_size: DEFAULT_PAGE_SIZE,
    email_filter: None,
    phone_filter: None,
    all_of_groups: BTreeSet::new(),
    none_of_groups: BTreeSet::new(),
    language: None,
    start_time: None,
    end_time: None,
    status: None,
    org_membership: None,
    exclude_org_members: false,
    admin_only: AdminFilter::Unset,
};

/// Tri-state administrator filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum AdminFilter {
    /// Only accounts holding at least one role.
    Yes,
    /// Only accounts holding no role.
    No,
    #[default]
    Unset,
}

impl From<Option<bool>> for AdminFilter {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Yes,
            Some(false) => Self::No,
            None => Self::Unset,
        }
    }
}

impl From<bool> for AdminFilter {
    fn from(value: bool) -> Self {
        Some(value).into()
    }
}

impl From<AdminFilter> for Option<bool> {
    fn from(value: AdminFilter) -> Self {
        match value {
            AdminFilter::Yes => Some(true),
            AdminFilter::No => Some(false),
            AdminFilter::Unset => None,
        }
    }
}

/// Filters and paging for one account search.
///
/// `org_membership` is internal: it is never read from or written to external
/// payloads. Endpoint handlers inject it through the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SearchCriteriaBuilder")]
pub struct SearchCriteria {
    offset_by: u32,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_filter: Option<String>,
    all_of_groups: BTreeSet<String>,
    none_of_groups: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<AccountStatus>,
    #[serde(skip)]
    org_membership: Option<String>,
    exclude_org_members: bool,
    admin_only: AdminFilter,
}

impl SearchCriteria {
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    pub fn offset_by(&self) -> u32 {
        self.offset_by
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn email_filter(&self) -> Option<&str> {
        self.email_filter.as_deref()
    }

    pub fn phone_filter(&self) -> Option<&str> {
        self.phone_filter.as_deref()
    }

    pub fn all_of_groups(&self) -> &BTreeSet<String> {
        &self.all_of_groups
    }

    pub fn none_of_groups(&self) -> &BTreeSet<String> {
        &self.none_of_groups
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn start_time(&self) -> Option<&DateTime<FixedOffset>> {
        self.start_time.as_ref()
    }

    pub fn end_time(&self) -> Option<&DateTime<FixedOffset>> {
        self.end_time.as_ref()
    }

    pub fn status(&self) -> Option<AccountStatus> {
        self.status
    }

    pub fn org_membership(&self) -> Option<&str> {
        self.org_membership.as_deref()
    }

    pub fn exclude_org_members(&self) -> bool {
        self.exclude_org_members
    }

    pub fn admin_only(&self) -> AdminFilter {
        self.admin_only
    }

    pub fn is_empty_search(&self) -> bool {
        *self == EMPTY_SEARCH
    }
}

impl Default for SearchCriteria {
    fn default() -> Self {
        EMPTY_SEARCH.clone()
    }
}

/// Canonical form used for equality and hashing of creation-time bounds.
fn canonical_time(value: &Option<DateTime<FixedOffset>>) -> Option<String> {
    value
        .as_ref()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

impl PartialEq for SearchCriteria {
    fn eq(&self, other: &Self) -> bool {
        self.offset_by == other.offset_by
            && self.page_size == other.page_size
            && self.email_filter == other.email_filter
            && self.phone_filter == other.phone_filter
            && self.all_of_groups == other.all_of_groups
            && self.none_of_groups == other.none_of_groups
            && self.language == other.language
            && canonical_time(&self.start_time) == canonical_time(&other.start_time)
            && canonical_time(&self.end_time) == canonical_time(&other.end_time)
            && self.status == other.status
            && self.org_membership == other.org_membership
            && self.exclude_org_members == other.exclude_org_members
            && self.admin_only == other.admin_only
    }
}

impl Eq for SearchCriteria {}

impl Hash for SearchCriteria {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset_by.hash(state);
        self.page_size.hash(state);
        self.email_filter.hash(state);
        self.phone_filter.hash(state);
        self.all_of_groups.hash(state);
        self.none_of_groups.hash(state);
        self.language.hash(state);
        canonical_time(&self.start_time).hash(state);
        canonical_time(&self.end_time).hash(state);
        self.status.hash(state);
        self.org_membership.hash(state);
        self.exclude_org_members.hash(state);
        self.admin_only.hash(state);
    }
}

/// Field-by-field assembly of a `SearchCriteria`.
///
/// Unset paging fields are filled in by `build()`. This is also the shape
/// request payloads are deserialized into; `orgMembership` is not accepted
/// from payloads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCriteriaBuilder {
    offset_by: Option<u32>,
    page_size: Option<u32>,
    email_filter: Option<String>,
    phone_filter: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    all_of_groups: BTreeSet<String>,
    #[serde(deserialize_with = "null_as_empty")]
    none_of_groups: BTreeSet<String>,
    language: Option<String>,
    start_time: Option<DateTime<FixedOffset>>,
    end_time: Option<DateTime<FixedOffset>>,
    status: Option<AccountStatus>,
    #[serde(skip)]
    org_membership: Option<String>,
    exclude_org_members: bool,
    admin_only: AdminFilter,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SearchCriteriaBuilder {
    /// Start from an existing criteria, including its internal-only fields.
    pub fn copy_of(criteria: &SearchCriteria) -> Self {
        Self {
            offset_by: Some(criteria.offset_by),
            page_size: Some(criteria.page_size),
            email_filter: criteria.email_filter.clone(),
            phone_filter: criteria.phone_filter.clone(),
            all_of_groups: criteria.all_of_groups.clone(),
            none_of_groups: criteria.none_of_groups.clone(),
            language: criteria.language.clone(),
            start_time: criteria.start_time,
            end_time: criteria.end_time,
            status: criteria.status,
            org_membership: criteria.org_membership.clone(),
            exclude_org_members: criteria.exclude_org_members,
            admin_only: criteria.admin_only,
        }
    }

    pub fn with_offset_by(mut self, offset_by: u32) -> Self {
        self.offset_by = Some(offset_by);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_email_filter(mut self, filter: impl Into<String>) -> Self {
        self.email_filter = Some(filter.into());
        self
    }

    pub fn with_phone_filter(mut self, filter: impl Into<String>) -> Self {
        self.phone_filter = Some(filter.into());
        self
    }

    pub fn with_all_of_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all_of_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_none_of_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.none_of_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_start_time<Tz: TimeZone>(mut self, start_time: DateTime<Tz>) -> Self {
        self.start_time = Some(start_time.fixed_offset());
        self
    }

    pub fn with_end_time<Tz: TimeZone>(mut self, end_time: DateTime<Tz>) -> Self {
        self.end_time = Some(end_time.fixed_offset());
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to members of one organization. Set only by trusted callers.
    pub fn with_org_membership(mut self, org_id: Option<impl Into<String>>) -> Self {
        self.org_membership = org_id.map(Into::into);
        self
    }

    /// Restrict to accounts with no organization; wins over `org_membership`.
    pub fn with_exclude_org_members(mut self, exclude: bool) -> Self {
        self.exclude_org_members = exclude;
        self
    }

    pub fn with_admin_only(mut self, admin_only: impl Into<AdminFilter>) -> Self {
        self.admin_only = admin_only.into();
        self
    }

    pub fn build(self) -> SearchCriteria {
        SearchCriteria {
            offset_by: self.offset_by.unwrap_or(0),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            email_filter: self.email_filter,
            phone_filter: self.phone_filter,
            all_of_groups: self.all_of_groups,
            none_of_groups: self.none_of_groups,
            language: self.language,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            org_membership: self.org_membership,
            exclude_org_members: self.exclude_org_members,
            admin_only: self.admin_only,
        }
    }
}

impl From<SearchCriteriaBuilder> for SearchCriteria {
    fn from(builder: SearchCriteriaBuilder) -> Self {
        builder.build()
    }
}

/// Search over external identifiers.
///
/// Results hold one row per (account, external id) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalIdSearch {
    pub offset_by: u32,
    pub page_size: u32,
    /// Substring of the external identifier, matched case-insensitively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_id: Option<String>,
}

impl Default for ExternalIdSearch {
    fn default() -> Self {
        Self {
            offset_by: 0,
            page_size: DEFAULT_PAGE_SIZE,
            id_filter: None,
            study_id: None,
        }
    }
}

impl ExternalIdSearch {
    pub fn with_id_filter(mut self, filter: impl Into<String>) -> Self {
        self.id_filter = Some(filter.into());
        self
    }

    pub fn with_study_id(mut self, study_id: impl Into<String>) -> Self {
        self.study_id = Some(study_id.into());
        self
    }

    pub fn with_offset_by(mut self, offset_by: u32) -> Self {
        self.offset_by = offset_by;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

//! Search execution: predicate assembly, count query, then page query.

use super::predicate::like_contains;
use super::{ExternalIdSearch, GroupOperator, PredicateBuilder, SearchCriteria};
use crate::db::AccountReader;
use crate::models::{AccountSummary, ExternalIdentifierInfo};
use crate::paging::PagedResult;
use crate::Result;

const ACCOUNT_ALIAS: &str = "acct";

const ACCOUNT_COLUMNS: &str = "SELECT acct.id, acct.app_id, acct.email, acct.phone_number, \
     acct.status, acct.org_membership, acct.data_groups, acct.created_on";

const EXTERNAL_ID_COLUMNS: &str = "SELECT ext.account_id, ext.external_id, ext.study_id";

/// Runs account searches for one tenant at a time.
///
/// Count and page are two sequential round-trips without a shared snapshot;
/// under concurrent writes `total` and `items` may briefly disagree.
pub struct SearchExecutor<R> {
    reader: R,
}

impl<R: AccountReader> SearchExecutor<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Search accounts of `app_id` matching `criteria`.
    ///
    /// An offset past the last match yields an empty page whose `total` is
    /// still the full match count.
    #[tracing::instrument(skip_all, fields(app_id = %app_id))]
    pub async fn search(
        &self,
        app_id: &str,
        criteria: &SearchCriteria,
    ) -> Result<PagedResult<AccountSummary>> {
        let predicate = account_predicate(app_id, criteria);
        let rendered = predicate.render();

        tracing::debug!(
            predicate = %rendered.sql,
            params = ?predicate.param_names(),
            "Executing account search"
        );

        let total = self
            .reader
            .count(&rendered.wrap("SELECT COUNT(*)", ""))
            .await?;

        let page = rendered.paginate(
            ACCOUNT_COLUMNS,
            "ORDER BY acct.created_on DESC, acct.id",
            criteria.page_size(),
            criteria.offset_by(),
        );
        let items = self.reader.fetch_accounts(&page).await?;

        tracing::debug!(total, returned = items.len(), "Account search complete");

        Ok(PagedResult::new(
            items,
            total,
            criteria.offset_by(),
            criteria.page_size(),
        ))
    }

    /// Search (account, external id) pairs of `app_id`.
    ///
    /// An account with several matching external ids appears once per id;
    /// rows are not de-duplicated by account.
    #[tracing::instrument(skip_all, fields(app_id = %app_id))]
    pub async fn search_external_ids(
        &self,
        app_id: &str,
        search: &ExternalIdSearch,
    ) -> Result<PagedResult<ExternalIdentifierInfo>> {
        let predicate = external_id_predicate(app_id, search);
        let rendered = predicate.render();

        tracing::debug!(
            predicate = %rendered.sql,
            params = ?predicate.param_names(),
            "Executing external id search"
        );

        let total = self
            .reader
            .count(&rendered.wrap("SELECT COUNT(*)", ""))
            .await?;

        let page = rendered.paginate(
            EXTERNAL_ID_COLUMNS,
            "ORDER BY ext.external_id, ext.account_id",
            search.page_size,
            search.offset_by,
        );
        let items = self.reader.fetch_external_ids(&page).await?;

        tracing::debug!(total, returned = items.len(), "External id search complete");

        Ok(PagedResult::new(
            items,
            total,
            search.offset_by,
            search.page_size,
        ))
    }
}

/// Build the filtering predicate shared by the count and page queries.
pub(crate) fn account_predicate(app_id: &str, criteria: &SearchCriteria) -> PredicateBuilder {
    let mut builder = PredicateBuilder::new(ACCOUNT_ALIAS);
    builder.append_param(
        "FROM accounts acct WHERE acct.app_id = :appId",
        "appId",
        app_id,
    );

    if let Some(email) = criteria.email_filter() {
        builder.append_param("AND acct.email ILIKE :email", "email", like_contains(email));
    }
    if let Some(phone) = criteria.phone_filter() {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            builder.append_param(
                "AND regexp_replace(acct.phone_number, '[^0-9]', '', 'g') LIKE :phone",
                "phone",
                format!("%{digits}%"),
            );
        }
    }
    if let Some(language) = criteria.language() {
        builder.append_param(
            "AND :language = ANY(acct.languages)",
            "language",
            language,
        );
    }
    if let Some(start) = criteria.start_time() {
        builder.append_param("AND acct.created_on >= :startTime", "startTime", *start);
    }
    if let Some(end) = criteria.end_time() {
        builder.append_param("AND acct.created_on <= :endTime", "endTime", *end);
    }
    if let Some(status) = criteria.status() {
        builder.append_param("AND acct.status = :status", "status", status.as_str());
    }

    builder.append_groups(criteria.all_of_groups(), GroupOperator::In);
    builder.append_groups(criteria.none_of_groups(), GroupOperator::NotIn);
    builder.append_admin_filter(criteria.admin_only());
    builder.append_org_filter(criteria.exclude_org_members(), criteria.org_membership());

    builder
}

pub(crate) fn external_id_predicate(app_id: &str, search: &ExternalIdSearch) -> PredicateBuilder {
    let mut builder = PredicateBuilder::new(ACCOUNT_ALIAS);
    builder.append_param(
        "FROM account_external_ids ext JOIN accounts acct ON acct.id = ext.account_id \
         WHERE acct.app_id = :appId",
        "appId",
        app_id,
    );

    if let Some(filter) = search.id_filter.as_deref() {
        builder.append_param(
            "AND ext.external_id ILIKE :idFilter",
            "idFilter",
            like_contains(filter),
        );
    }
    if let Some(study_id) = search.study_id.as_deref() {
        builder.append_param("AND ext.study_id = :studyId", "studyId", study_id);
    }

    builder
}

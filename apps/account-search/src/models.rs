//! Row projections returned by account searches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of an account, stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Enabled,
    Disabled,
    Unverified,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Unverified => "unverified",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown account status: {0}")]
pub struct UnknownAccountStatus(String);

impl TryFrom<String> for AccountStatus {
    type Error = UnknownAccountStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "unverified" => Ok(Self::Unverified),
            _ => Err(UnknownAccountStatus(value)),
        }
    }
}

/// Summary projection of an account, as listed by searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: AccountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_membership: Option<String>,
    pub data_groups: Vec<String>,
    pub created_on: DateTime<Utc>,
}

/// One (account, external id) pair.
///
/// An account holding several matching external ids yields one of these per id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdentifierInfo {
    pub account_id: String,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_id: Option<String>,
}

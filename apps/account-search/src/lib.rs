//! Account search for a multi-tenant research platform.
//!
//! Provides:
//! - An immutable, builder-constructed search criteria model
//! - Safe, parameterized predicate composition (data groups, organization
//!   and administrator tri-state policies, date ranges, substring filters)
//! - Count + page execution against Postgres wrapped in a paged result
//! - External identifier search with one row per (account, external id)

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod paging;
pub mod search;

pub use config::Config;
pub use error::{Error, Result};
pub use paging::PagedResult;
pub use search::{SearchCriteria, SearchExecutor};

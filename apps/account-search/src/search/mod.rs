//! Account search - criteria model, predicate construction and execution

pub mod criteria;
pub mod executor;
pub mod predicate;
pub mod validate;

pub use criteria::{
    AdminFilter, ExternalIdSearch, SearchCriteria, SearchCriteriaBuilder, EMPTY_SEARCH,
};
pub use executor::SearchExecutor;
pub use predicate::{BindValue, GroupOperator, PredicateBuilder, RenderedQuery};
pub use validate::{
    parse_criteria, parse_external_id_search, validate_criteria, validate_external_id_search,
};

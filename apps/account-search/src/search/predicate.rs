//! Incremental construction of parameterized account predicates.
//!
//! Fragments are written with named placeholders (`:email`, `:IN1`). Each
//! placeholder is rewritten to a positional `$n` the moment its value is
//! bound, so fragment text never carries a filter value. Rendering joins the
//! fragments with single spaces; the same rendered predicate is then used for
//! both the count query and the page query.

use super::AdminFilter;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Bind values for `sqlx` queries.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Timestamp(DateTime<Utc>),
    Int(i64),
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for BindValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Timestamp(value.with_timezone(&Utc))
    }
}

/// Containment operator for data group clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOperator {
    /// The group must be present on the account.
    In,
    /// The group must be absent from the account.
    NotIn,
}

impl GroupOperator {
    fn param_prefix(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::NotIn => "NOTIN",
        }
    }

    fn clause(self, alias: &str, param: &str) -> String {
        match self {
            Self::In => format!(":{param} = ANY({alias}.data_groups)"),
            Self::NotIn => format!("NOT (:{param} = ANY({alias}.data_groups))"),
        }
    }
}

/// A bound parameter together with the name it was appended under.
#[derive(Debug, Clone, PartialEq)]
struct NamedBind {
    name: String,
    value: BindValue,
}

/// Query text plus positional bind values (`$1` is `params[0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl RenderedQuery {
    /// Surround the predicate with a select list and trailing clauses.
    pub fn wrap(&self, prefix: &str, suffix: &str) -> RenderedQuery {
        let mut sql = String::with_capacity(prefix.len() + self.sql.len() + suffix.len() + 2);
        sql.push_str(prefix);
        sql.push(' ');
        sql.push_str(&self.sql);
        if !suffix.is_empty() {
            sql.push(' ');
            sql.push_str(suffix);
        }
        RenderedQuery {
            sql,
            params: self.params.clone(),
        }
    }

    /// Surround the predicate with a select list and an ordered page window.
    ///
    /// `LIMIT` and `OFFSET` are bound after the predicate's own parameters, so
    /// every page of a search shares one statement text.
    pub fn paginate(&self, prefix: &str, order_by: &str, limit: u32, offset: u32) -> RenderedQuery {
        let limit_at = self.params.len() + 1;
        let mut page = self.wrap(
            prefix,
            &format!("{order_by} LIMIT ${limit_at} OFFSET ${}", limit_at + 1),
        );
        page.params.push(BindValue::Int(i64::from(limit)));
        page.params.push(BindValue::Int(i64::from(offset)));
        page
    }
}

/// Accumulates predicate fragments and their named parameters.
///
/// One builder serves exactly one search call. Data group parameters are named
/// from a single counter shared by every `append_groups` call, so inclusion and
/// exclusion sets in the same query never collide.
#[derive(Debug)]
pub struct PredicateBuilder {
    alias: String,
    fragments: Vec<String>,
    params: Vec<NamedBind>,
    group_counter: usize,
}

impl PredicateBuilder {
    /// `alias` is the SQL alias of the account table used by the policy helpers.
    pub fn new(alias: &str) -> Self {
        assert!(
            !alias.is_empty() && alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "account alias must be a plain SQL identifier"
        );
        Self {
            alias: alias.to_string(),
            fragments: Vec::new(),
            params: Vec::new(),
            group_counter: 0,
        }
    }

    /// Add a fragment that carries no parameters.
    pub fn append_plain(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Add a fragment containing the placeholder `:name`, bound to `value`.
    pub fn append_param(
        &mut self,
        fragment: &str,
        name: &str,
        value: impl Into<BindValue>,
    ) -> &mut Self {
        let fragment = self.bind(fragment, name, value.into());
        self.fragments.push(fragment);
        self
    }

    /// Add a fragment containing two named placeholders.
    pub fn append_params(
        &mut self,
        fragment: &str,
        first: (&str, BindValue),
        second: (&str, BindValue),
    ) -> &mut Self {
        let fragment = self.bind(fragment, first.0, first.1);
        let fragment = self.bind(&fragment, second.0, second.1);
        self.fragments.push(fragment);
        self
    }

    /// AND together one containment clause per group. Empty sets add nothing.
    pub fn append_groups(&mut self, groups: &BTreeSet<String>, op: GroupOperator) -> &mut Self {
        if groups.is_empty() {
            return self;
        }

        let mut clauses = Vec::with_capacity(groups.len());
        for group in groups {
            self.group_counter += 1;
            let name = format!("{}{}", op.param_prefix(), self.group_counter);
            let clause = op.clause(&self.alias, &name);
            clauses.push(self.bind(&clause, &name, BindValue::Text(group.clone())));
        }

        self.fragments.push(format!("AND ({})", clauses.join(" AND ")));
        self
    }

    /// `Yes` requires at least one role, `No` requires none, `Unset` adds nothing.
    pub fn append_admin_filter(&mut self, admin_only: AdminFilter) -> &mut Self {
        let alias = &self.alias;
        let fragment = match admin_only {
            AdminFilter::Yes => format!("AND cardinality({alias}.roles) > 0"),
            AdminFilter::No => format!("AND cardinality({alias}.roles) = 0"),
            AdminFilter::Unset => return self,
        };
        self.fragments.push(fragment);
        self
    }

    /// Organization membership policy.
    ///
    /// `exclude_members` restricts to unassigned accounts and ignores `org_id`
    /// entirely. Otherwise a present `org_id` restricts to that organization,
    /// and when both are unset organization state is not filtered.
    pub fn append_org_filter(&mut self, exclude_members: bool, org_id: Option<&str>) -> &mut Self {
        if exclude_members {
            let fragment = format!("AND {}.org_membership IS NULL", self.alias);
            self.fragments.push(fragment);
        } else if let Some(org_id) = org_id {
            let fragment = format!("AND {}.org_membership = :orgId", self.alias);
            self.append_param(&fragment, "orgId", org_id);
        }
        self
    }

    /// Names of the bound parameters, in positional order.
    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    /// Value bound under `name`, if any.
    pub fn param(&self, name: &str) -> Option<&BindValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn render(&self) -> RenderedQuery {
        RenderedQuery {
            sql: self.fragments.join(" "),
            params: self.params.iter().map(|p| p.value.clone()).collect(),
        }
    }

    fn bind(&mut self, fragment: &str, name: &str, value: BindValue) -> String {
        debug_assert!(
            self.param(name).is_none(),
            "parameter :{name} bound twice in one predicate"
        );
        self.params.push(NamedBind {
            name: name.to_string(),
            value,
        });
        let position = self.params.len();
        let (rewritten, replaced) = replace_placeholder(fragment, name, position);
        debug_assert!(replaced > 0, "fragment has no :{name} placeholder: {fragment}");
        rewritten
    }
}

/// Rewrite every `:name` token in `fragment` to `$position`.
///
/// `::type` casts and longer names sharing the prefix (`:IN1` vs `:IN10`) are
/// left alone. Returns the rewritten text and the number of replacements.
fn replace_placeholder(fragment: &str, name: &str, position: usize) -> (String, usize) {
    let token = format!(":{name}");
    let mut out = String::with_capacity(fragment.len());
    let mut rest = fragment;
    let mut replaced = 0;

    while let Some(at) = rest.find(&token) {
        out.push_str(&rest[..at]);
        let after = &rest[at + token.len()..];
        let is_cast = out.ends_with(':');
        let continues_name = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');

        if is_cast || continues_name {
            out.push_str(&token);
        } else {
            out.push('$');
            out.push_str(&position.to_string());
            replaced += 1;
        }
        rest = after;
    }
    out.push_str(rest);

    (out, replaced)
}

/// Escape `LIKE` metacharacters and wrap the value for a substring match.
pub fn like_contains(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

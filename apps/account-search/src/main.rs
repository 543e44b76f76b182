//! Account search - command line entry point
//!
//! Runs one account search (or external id search) for a tenant and prints
//! the paged result as JSON on stdout.

use account_search::{
    config::Config,
    db::{self, PostgresAccountReader},
    logging,
    search::{self, ExternalIdSearch, SearchCriteriaBuilder},
    SearchExecutor,
};
use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "account-search", version, about = "Search accounts of one tenant")]
struct Args {
    /// Tenant (app) identifier to search within
    #[arg(long)]
    tenant: String,

    /// JSON file with search criteria; reads stdin when omitted
    #[arg(long)]
    criteria: Option<PathBuf>,

    /// Restrict to members of this organization
    #[arg(long, conflicts_with = "exclude_org_members")]
    org: Option<String>,

    /// Restrict to accounts without an organization
    #[arg(long)]
    exclude_org_members: bool,

    /// Search external identifiers instead of accounts, optionally containing
    /// this value; without a value the payload's `idFilter` applies
    #[arg(long, value_name = "FILTER", num_args = 0..=1)]
    external_ids: Option<Option<String>>,

    /// Study to restrict an external id search to; overrides the payload's `studyId`
    #[arg(long, requires = "external_ids")]
    study: Option<String>,

    /// Apply database migrations before searching
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _logging_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    let pool = db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    if args.migrate || config.database.run_migrations {
        db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    let executor = SearchExecutor::new(PostgresAccountReader::new(pool));

    let output = if let Some(filter) = args.external_ids {
        let payload = read_payload(args.criteria.as_ref())?;
        let request = external_id_request(payload.as_deref(), filter, args.study)?;
        search::validate_external_id_search(&request, &config.search)?;

        let page = executor
            .search_external_ids(&args.tenant, &request)
            .await
            .context("External id search failed")?;
        serde_json::to_string_pretty(&page)?
    } else {
        let payload = match read_payload(args.criteria.as_ref())? {
            Some(payload) => payload,
            None => read_stdin()?,
        };
        let parsed = search::parse_criteria(&payload)?;
        let criteria = SearchCriteriaBuilder::copy_of(&parsed)
            .with_org_membership(args.org)
            .with_exclude_org_members(args.exclude_org_members || parsed.exclude_org_members())
            .build();
        search::validate_criteria(&criteria, &config.search)?;

        let page = executor
            .search(&args.tenant, &criteria)
            .await
            .context("Account search failed")?;
        serde_json::to_string_pretty(&page)?
    };

    println!("{output}");
    Ok(())
}

/// Merge the optional payload with command line overrides.
fn external_id_request(
    payload: Option<&str>,
    id_filter: Option<String>,
    study: Option<String>,
) -> anyhow::Result<ExternalIdSearch> {
    let mut request = match payload {
        Some(payload) => search::parse_external_id_search(payload)
            .context("Invalid external id search payload")?,
        None => ExternalIdSearch::default(),
    };
    if let Some(filter) = id_filter {
        request = request.with_id_filter(filter);
    }
    if let Some(study) = study {
        request = request.with_study_id(study);
    }
    Ok(request)
}

fn read_payload(path: Option<&PathBuf>) -> anyhow::Result<Option<String>> {
    path.map(|p| {
        std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))
    })
    .transpose()
}

fn read_stdin() -> anyhow::Result<String> {
    let mut payload = String::new();
    std::io::stdin()
        .read_to_string(&mut payload)
        .context("Failed to read criteria from stdin")?;
    if payload.trim().is_empty() {
        payload = "{}".to_string();
    }
    Ok(payload)
}

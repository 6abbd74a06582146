use anyhow::Context;
use autocat::{logging, run, Config, RunOptions};
use autocat_categorize::{
    Categorizer, DuckDuckGoSearch, EnrichmentLookup, OpenAiCompatClient, PromptBuilder,
    RateLimiter,
};
use autocat_storage::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    logging::init(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    let mut store = SqliteStore::open(&config.ledger_path)
        .await
        .with_context(|| format!("Failed to open ledger {}", config.ledger_path.display()))?;

    let model =
        OpenAiCompatClient::new(config.model.clone()).context("Failed to build model client")?;
    let search = DuckDuckGoSearch::new().context("Failed to build search client")?;
    let prompt = PromptBuilder::new(&config.prompt_template).context("Invalid PROMPT_TEMPLATE")?;

    let mut categorizer = Categorizer::new(
        model,
        EnrichmentLookup::new(search, config.search_timeout),
        RateLimiter::new(config.search_request_delay),
        prompt,
        config.categorizer_settings(),
    );

    tracing::info!(
        ledger = %config.ledger_path.display(),
        model = %config.model.model,
        search = config.enable_search,
        dry_run = config.dry_run,
        "Starting categorization run"
    );

    let summary = run(
        &mut store,
        &mut categorizer,
        RunOptions {
            confidence_threshold: config.confidence_threshold,
            dry_run: config.dry_run,
        },
    )
    .await?;

    tracing::info!(
        examined = summary.examined,
        skipped = summary.skipped,
        accepted = summary.accepted,
        low_confidence = summary.low_confidence,
        unresolved = summary.unresolved,
        failed = summary.failed,
        "Run complete"
    );

    Ok(())
}

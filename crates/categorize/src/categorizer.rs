use std::time::Duration;

use autocat_core::{CategorizationDecision, Category, SearchResult, Transaction};
use thiserror::Error;
use tracing::{debug, warn};

use crate::extract::ResponseExtractor;
use crate::model::ModelClient;
use crate::prompt::{PromptBuilder, PromptContext, PromptError};
use crate::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::resolver::CategoryResolver;
use crate::search::{EnrichmentLookup, SearchProvider};

#[derive(Debug, Error)]
pub enum CategorizeError {
    #[error("Category catalog is empty")]
    EmptyCatalog,
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

#[derive(Debug, Clone)]
pub struct CategorizerSettings {
    pub enable_search: bool,
    pub search_result_limit: usize,
    pub model_timeout: Duration,
}

impl Default for CategorizerSettings {
    fn default() -> Self {
        Self {
            enable_search: true,
            search_result_limit: 3,
            model_timeout: Duration::from_secs(120),
        }
    }
}

/// Turns one transaction into one categorization decision:
/// rate limit → search → prompt → model → resolve.
pub struct Categorizer<M, P, C = SystemClock> {
    model: M,
    lookup: EnrichmentLookup<P>,
    limiter: RateLimiter<C>,
    prompt: PromptBuilder,
    extractor: ResponseExtractor,
    resolver: CategoryResolver,
    settings: CategorizerSettings,
}

impl<M, P, C> Categorizer<M, P, C>
where
    M: ModelClient,
    P: SearchProvider,
    C: Clock,
{
    pub fn new(
        model: M,
        lookup: EnrichmentLookup<P>,
        limiter: RateLimiter<C>,
        prompt: PromptBuilder,
        settings: CategorizerSettings,
    ) -> Self {
        Self {
            model,
            lookup,
            limiter,
            prompt,
            extractor: ResponseExtractor::new(settings.model_timeout),
            resolver: CategoryResolver::default(),
            settings,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn lookup(&self) -> &EnrichmentLookup<P> {
        &self.lookup
    }

    /// `Ok(None)` means the model gave nothing usable; the transaction
    /// should be left alone. Errors are configuration problems that would
    /// repeat for every transaction.
    pub async fn categorize(
        &mut self,
        transaction: &Transaction,
        catalog: &[Category],
    ) -> Result<Option<CategorizationDecision>, CategorizeError> {
        if catalog.is_empty() {
            return Err(CategorizeError::EmptyCatalog);
        }

        let search_results = self.enrich(&transaction.payee).await;
        debug!(payee = %transaction.payee, results = search_results.len(), "enrichment fetched");

        let context = PromptContext::new(
            catalog,
            transaction,
            &search_results,
            self.settings.enable_search,
        );
        let prompt = self.prompt.render(&context)?;

        let Some(raw) = self.extractor.extract(&self.model, &prompt).await else {
            return Ok(None);
        };
        debug!(guess = %raw.category, confidence = raw.confidence, "model answered");

        let Some(category) = self.resolver.resolve(&raw.category, catalog) else {
            warn!(guess = %raw.category, "no catalog entry to resolve against");
            return Ok(None);
        };

        Ok(Some(CategorizationDecision {
            reasoning: raw.reasoning,
            category: category.clone(),
            confidence: raw.confidence,
            raw_category_guess: raw.category,
        }))
    }

    async fn enrich(&mut self, payee: &str) -> Vec<SearchResult> {
        if !self.settings.enable_search {
            return Vec::new();
        }
        self.limiter.await_turn().await;
        self.lookup
            .search(payee, self.settings.search_result_limit)
            .await
    }
}

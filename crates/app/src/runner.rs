use autocat_categorize::{CategorizeError, Categorizer, Clock, ModelClient, SearchProvider};
use autocat_core::{CategorizationDecision, Category, StoreError, Transaction, TransactionStore};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to load {what}: {source}")]
    Load {
        what: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("No categories in the budget; nothing to categorize into")]
    EmptyCatalog,
    #[error(transparent)]
    Categorize(#[from] CategorizeError),
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub confidence_threshold: f64,
    pub dry_run: bool,
}

/// Counts of what happened to each transaction examined in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub examined: usize,
    pub skipped: usize,
    pub accepted: usize,
    pub low_confidence: usize,
    pub unresolved: usize,
    pub failed: usize,
}

enum Outcome {
    Skipped,
    Accepted,
    LowConfidence,
    Unresolved,
    Failed,
}

/// Walks every on-budget account and categorizes each transaction that
/// still needs a category. One transaction's failure never stops the run.
pub async fn run<S, M, P, C>(
    store: &mut S,
    categorizer: &mut Categorizer<M, P, C>,
    options: RunOptions,
) -> Result<RunSummary, RunError>
where
    S: TransactionStore,
    M: ModelClient,
    P: SearchProvider,
    C: Clock,
{
    let catalog = store
        .categories()
        .await
        .map_err(|source| RunError::Load { what: "categories", source })?;
    if catalog.is_empty() {
        return Err(RunError::EmptyCatalog);
    }
    info!(categories = catalog.len(), "Loaded category catalog");

    let accounts = store
        .accounts()
        .await
        .map_err(|source| RunError::Load { what: "accounts", source })?;

    let mut summary = RunSummary::default();
    for account in accounts.iter().filter(|a| !a.offbudget) {
        let transactions = match store.transactions(account).await {
            Ok(txs) => txs,
            Err(e) => {
                error!(account = %account.name, error = %e, "Failed to load transactions");
                continue;
            }
        };

        for transaction in &transactions {
            summary.examined += 1;
            match process(store, categorizer, transaction, &catalog, options).await? {
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Accepted => summary.accepted += 1,
                Outcome::LowConfidence => summary.low_confidence += 1,
                Outcome::Unresolved => summary.unresolved += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }
    }

    Ok(summary)
}

async fn process<S, M, P, C>(
    store: &mut S,
    categorizer: &mut Categorizer<M, P, C>,
    transaction: &Transaction,
    catalog: &[Category],
    options: RunOptions,
) -> Result<Outcome, RunError>
where
    S: TransactionStore,
    M: ModelClient,
    P: SearchProvider,
    C: Clock,
{
    if let Some(reason) = transaction.skip_reason() {
        debug!(payee = %transaction.payee, %reason, "Skipping transaction");
        return Ok(Outcome::Skipped);
    }

    info!(
        payee = %transaction.payee,
        amount = %transaction.amount,
        date = %transaction.date,
        "Categorizing transaction"
    );

    let Some(decision) = categorizer.categorize(transaction, catalog).await? else {
        warn!(payee = %transaction.payee, "Could not categorize transaction");
        return Ok(Outcome::Unresolved);
    };

    if !decision.meets_threshold(options.confidence_threshold) {
        warn!(
            payee = %transaction.payee,
            category = %decision.category,
            confidence = decision.confidence,
            "Low confidence; leaving transaction uncategorized"
        );
        return Ok(Outcome::LowConfidence);
    }

    if options.dry_run {
        log_accepted(transaction, &decision, true);
        return Ok(Outcome::Accepted);
    }

    let applied = match store.set_category(transaction, &decision.category).await {
        Ok(()) => store.commit().await,
        Err(e) => Err(e),
    };
    if let Err(e) = applied {
        error!(payee = %transaction.payee, error = %e, "Failed to save category");
        return Ok(Outcome::Failed);
    }

    log_accepted(transaction, &decision, false);
    Ok(Outcome::Accepted)
}

fn log_accepted(transaction: &Transaction, decision: &CategorizationDecision, dry_run: bool) {
    info!(
        payee = %transaction.payee,
        category = %decision.category,
        confidence = decision.confidence,
        reasoning = %decision.reasoning,
        dry_run,
        "Categorized transaction"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use autocat_categorize::{
        CategorizerSettings, EnrichmentLookup, ManualClock, MockModel, MockSearch, PromptBuilder,
        RateLimiter,
    };
    use autocat_core::{
        catalog_from_names, Account, AccountId, CategoryId, CompactDate, Money, TransactionId,
        STARTING_BALANCE_PAYEE,
    };
    use std::sync::Arc;
    use std::time::Duration;

    /// In-memory ledger recording every write.
    #[derive(Default)]
    struct MemoryStore {
        catalog: Vec<Category>,
        accounts: Vec<Account>,
        transactions: Vec<Transaction>,
        staged: Vec<(TransactionId, CategoryId)>,
        committed: Vec<(TransactionId, CategoryId)>,
        commits: usize,
        fail_writes: bool,
        fail_commit_of: Option<TransactionId>,
    }

    #[async_trait]
    impl TransactionStore for MemoryStore {
        async fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
            Ok(self.catalog.clone())
        }

        async fn accounts(&mut self) -> Result<Vec<Account>, StoreError> {
            Ok(self.accounts.clone())
        }

        async fn transactions(&mut self, account: &Account) -> Result<Vec<Transaction>, StoreError> {
            Ok(self
                .transactions
                .iter()
                .filter(|t| t.account_id == account.id)
                .cloned()
                .collect())
        }

        async fn set_category(
            &mut self,
            transaction: &Transaction,
            category: &Category,
        ) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::TransactionNotFound(transaction.id));
            }
            self.staged.push((transaction.id, category.id));
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), StoreError> {
            self.commits += 1;
            let staged = std::mem::take(&mut self.staged);
            if let Some(bad) = staged.iter().find(|(id, _)| Some(*id) == self.fail_commit_of) {
                return Err(StoreError::TransactionNotFound(bad.0));
            }
            self.committed.extend(staged);
            Ok(())
        }
    }

    fn tx(id: i64, account: i64, payee: &str, cents: i64) -> Transaction {
        Transaction {
            id: TransactionId(id),
            account_id: AccountId(account),
            payee: payee.to_string(),
            amount: Money::from_cents(cents),
            date: CompactDate(20240307),
            notes: Some(String::new()),
            category: None,
        }
    }

    fn store(transactions: Vec<Transaction>) -> MemoryStore {
        MemoryStore {
            catalog: catalog_from_names(&["Groceries", "Cash Transactions", "Income"]),
            accounts: vec![
                Account::new(AccountId(1), "Checking"),
                Account::new(AccountId(2), "Brokerage").off_budget(),
            ],
            transactions,
            ..Default::default()
        }
    }

    fn categorizer(model: MockModel) -> Categorizer<MockModel, MockSearch, Arc<ManualClock>> {
        Categorizer::new(
            model,
            EnrichmentLookup::new(MockSearch::new(vec![]), Duration::from_secs(1)),
            RateLimiter::with_clock(Duration::from_secs(5), Arc::new(ManualClock::new())),
            PromptBuilder::default(),
            CategorizerSettings {
                enable_search: false,
                search_result_limit: 3,
                model_timeout: Duration::from_secs(1),
            },
        )
    }

    fn answer(category: &str, confidence: f64) -> String {
        serde_json::json!({
            "reasoning": "because",
            "category": category,
            "confidence": confidence,
        })
        .to_string()
    }

    const OPTIONS: RunOptions = RunOptions {
        confidence_threshold: 5.0,
        dry_run: false,
    };

    #[tokio::test]
    async fn venmo_transfer_is_accepted_and_committed() {
        let mut s = store(vec![tx(1, 1, "Venmo", -4200)]);
        let mut c = categorizer(MockModel::new().with_text(answer("Cash Transactions", 9.0)));

        let summary = run(&mut s, &mut c, OPTIONS).await.unwrap();

        assert_eq!(summary.accepted, 1);
        assert_eq!(s.committed, vec![(TransactionId(1), CategoryId(2))]);
        assert_eq!(s.commits, 1);
        assert!(c.model().prompts().iter().all(|p| !p.contains("Search Results:")));
    }

    #[tokio::test]
    async fn threshold_gates_acceptance() {
        let mut s = store(vec![tx(1, 1, "KROGER", -3000), tx(2, 1, "ALDI", -2000)]);
        let model = MockModel::new()
            .with_text(answer("Groceries", 4.9))
            .with_text(answer("Groceries", 5.0));
        let mut c = categorizer(model);

        let summary = run(&mut s, &mut c, OPTIONS).await.unwrap();

        assert_eq!(summary.low_confidence, 1);
        assert_eq!(summary.accepted, 1);
        assert_eq!(s.committed, vec![(TransactionId(2), CategoryId(1))]);
    }

    #[tokio::test]
    async fn skip_rules_never_reach_the_model() {
        let mut categorized = tx(3, 1, "Rent Co", -150_000);
        categorized.category = Some(CategoryId(1));
        let mut s = store(vec![
            tx(1, 1, STARTING_BALANCE_PAYEE, 100_000),
            tx(2, 1, "Refund", 0),
            categorized,
        ]);
        let mut c = categorizer(MockModel::new());

        let summary = run(&mut s, &mut c, OPTIONS).await.unwrap();

        assert_eq!(summary.examined, 3);
        assert_eq!(summary.skipped, 3);
        assert!(c.model().prompts().is_empty());
        assert_eq!(s.commits, 0);
    }

    #[tokio::test]
    async fn offbudget_accounts_are_ignored() {
        let mut s = store(vec![tx(1, 2, "Vanguard", -50_000)]);
        let mut c = categorizer(MockModel::new());

        let summary = run(&mut s, &mut c, OPTIONS).await.unwrap();

        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn unresolvable_answer_leaves_transaction_and_continues() {
        let mut s = store(vec![tx(1, 1, "???", -100), tx(2, 1, "Venmo", -4200)]);
        let model = MockModel::new()
            .with_text("no idea")
            .with_text(answer("Cash Transactions", 8.0));
        let mut c = categorizer(model);

        let summary = run(&mut s, &mut c, OPTIONS).await.unwrap();

        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.accepted, 1);
        assert_eq!(s.committed, vec![(TransactionId(2), CategoryId(2))]);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let mut s = store(vec![tx(1, 1, "Venmo", -4200)]);
        let mut c = categorizer(MockModel::new().with_text(answer("Cash Transactions", 9.0)));

        let options = RunOptions {
            dry_run: true,
            ..OPTIONS
        };
        let summary = run(&mut s, &mut c, options).await.unwrap();

        assert_eq!(summary.accepted, 1);
        assert!(s.committed.is_empty());
        assert_eq!(s.commits, 0);
    }

    #[tokio::test]
    async fn write_failure_is_counted_not_fatal() {
        let mut s = store(vec![tx(1, 1, "Venmo", -4200)]);
        s.fail_writes = true;
        let mut c = categorizer(MockModel::new().with_text(answer("Cash Transactions", 9.0)));

        let summary = run(&mut s, &mut c, OPTIONS).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(s.commits, 0);
    }

    #[tokio::test]
    async fn commit_failure_only_affects_its_own_transaction() {
        let mut s = store(vec![tx(1, 1, "Venmo", -4200), tx(2, 1, "KROGER", -3000)]);
        s.fail_commit_of = Some(TransactionId(1));
        let model = MockModel::new()
            .with_text(answer("Cash Transactions", 9.0))
            .with_text(answer("Groceries", 9.0));
        let mut c = categorizer(model);

        let summary = run(&mut s, &mut c, OPTIONS).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.accepted, 1);
        assert_eq!(s.commits, 2);
        assert_eq!(s.committed, vec![(TransactionId(2), CategoryId(1))]);
    }

    #[tokio::test]
    async fn empty_catalog_aborts_run() {
        let mut s = store(vec![tx(1, 1, "Venmo", -4200)]);
        s.catalog.clear();
        let mut c = categorizer(MockModel::new());

        assert!(matches!(
            run(&mut s, &mut c, OPTIONS).await,
            Err(RunError::EmptyCatalog)
        ));
    }
}

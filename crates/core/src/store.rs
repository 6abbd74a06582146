use async_trait::async_trait;
use thiserror::Error;

use super::account::Account;
use super::category::Category;
use super::transaction::{Transaction, TransactionId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),
}

/// The budget ledger the run loop reads from and writes accepted
/// categories back to.
///
/// `set_category` stages a change; nothing is durable until `commit`.
/// A failed `commit` still discards what was staged.
#[async_trait]
pub trait TransactionStore: Send {
    async fn categories(&mut self) -> Result<Vec<Category>, StoreError>;

    async fn accounts(&mut self) -> Result<Vec<Account>, StoreError>;

    async fn transactions(&mut self, account: &Account) -> Result<Vec<Transaction>, StoreError>;

    async fn set_category(
        &mut self,
        transaction: &Transaction,
        category: &Category,
    ) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;
}

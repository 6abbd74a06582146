use std::path::Path;

use async_trait::async_trait;
use autocat_core::{
    Account, Category, CategoryId, StoreError, Transaction, TransactionId, TransactionStore,
};
use tracing::debug;

use crate::db::{self, DbPool};

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(Box::new(e))
}

/// [`TransactionStore`] over the local SQLite ledger. Category changes are
/// held in memory until `commit` writes them in one SQL transaction.
pub struct SqliteStore {
    pool: DbPool,
    pending: Vec<(TransactionId, CategoryId)>,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let pool = db::create_db(path).await.map_err(backend)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self {
            pool,
            pending: Vec::new(),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl TransactionStore for SqliteStore {
    async fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
        db::get_categories(&self.pool).await.map_err(backend)
    }

    async fn accounts(&mut self) -> Result<Vec<Account>, StoreError> {
        db::get_accounts(&self.pool).await.map_err(backend)
    }

    async fn transactions(&mut self, account: &Account) -> Result<Vec<Transaction>, StoreError> {
        db::get_transactions(&self.pool, account.id)
            .await
            .map_err(backend)
    }

    async fn set_category(
        &mut self,
        transaction: &Transaction,
        category: &Category,
    ) -> Result<(), StoreError> {
        self.pending.push((transaction.id, category.id));
        Ok(())
    }

    /// Staged changes are consumed whether or not the write succeeds, so a
    /// bad entry cannot poison later commits.
    async fn commit(&mut self) -> Result<(), StoreError> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }

        let mut sql_tx = self.pool.begin().await.map_err(backend)?;
        for (tx_id, category_id) in &pending {
            let result = sqlx::query("UPDATE transactions SET category_id = ? WHERE id = ?")
                .bind(category_id.0)
                .bind(tx_id.0)
                .execute(&mut *sql_tx)
                .await
                .map_err(backend)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::TransactionNotFound(*tx_id));
            }
        }
        sql_tx.commit().await.map_err(backend)?;

        debug!(count = pending.len(), "committed category changes");
        Ok(())
    }
}

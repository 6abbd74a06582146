pub mod account;
pub mod category;
pub mod date;
pub mod decision;
pub mod money;
pub mod store;
pub mod transaction;

pub use account::{Account, AccountId};
pub use category::{catalog_from_names, Category, CategoryId};
pub use date::CompactDate;
pub use decision::{CategorizationDecision, SearchResult, DEFAULT_CONFIDENCE_THRESHOLD};
pub use money::Money;
pub use store::{StoreError, TransactionStore};
pub use transaction::{SkipReason, Transaction, TransactionId, STARTING_BALANCE_PAYEE};

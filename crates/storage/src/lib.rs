pub mod db;
pub mod store;

pub use db::{
    create_db, get_accounts, get_categories, get_transaction, get_transactions, insert_account,
    insert_category, insert_transaction, DbPool, NewTransaction,
};
pub use store::SqliteStore;

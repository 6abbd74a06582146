use autocat_core::{
    Account, AccountId, Category, CategoryId, CompactDate, Money, Transaction, TransactionId,
};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            offbudget INTEGER NOT NULL DEFAULT 0,
            closed INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL DEFAULT 0,
            hidden INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            payee_id INTEGER,
            amount_cents INTEGER NOT NULL,
            date INTEGER NOT NULL,
            notes TEXT,
            category_id INTEGER,
            tombstone INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (account_id) REFERENCES accounts(id),
            FOREIGN KEY (payee_id) REFERENCES payees(id),
            FOREIGN KEY (category_id) REFERENCES categories(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id, date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_account(pool: &DbPool, name: &str, offbudget: bool) -> Result<AccountId, sqlx::Error> {
    let result = sqlx::query("INSERT INTO accounts (name, offbudget) VALUES (?, ?)")
        .bind(name)
        .bind(offbudget as i64)
        .execute(pool)
        .await?;
    Ok(AccountId(result.last_insert_rowid()))
}

pub async fn insert_category(
    pool: &DbPool,
    name: &str,
    description: &str,
) -> Result<CategoryId, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO categories (name, description, sort_order) \
         VALUES (?, ?, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM categories))",
    )
    .bind(name)
    .bind(description)
    .execute(pool)
    .await?;
    Ok(CategoryId(result.last_insert_rowid()))
}

async fn payee_id(pool: &DbPool, name: &str) -> Result<i64, sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO payees (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    sqlx::query_scalar::<_, i64>("SELECT id FROM payees WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
}

pub struct NewTransaction<'a> {
    pub account_id: AccountId,
    pub payee: &'a str,
    pub amount: Money,
    pub date: CompactDate,
    pub notes: Option<&'a str>,
    pub category_id: Option<CategoryId>,
}

pub async fn insert_transaction(
    pool: &DbPool,
    tx: &NewTransaction<'_>,
) -> Result<TransactionId, sqlx::Error> {
    let cents = tx.amount.to_cents().ok_or_else(|| {
        sqlx::Error::Encode(format!("amount {} overflows cents", tx.amount).into())
    })?;
    let payee = payee_id(pool, tx.payee).await?;
    let result = sqlx::query(
        "INSERT INTO transactions (account_id, payee_id, amount_cents, date, notes, category_id) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(tx.account_id.0)
    .bind(payee)
    .bind(cents)
    .bind(tx.date.0 as i64)
    .bind(tx.notes)
    .bind(tx.category_id.map(|c| c.0))
    .execute(pool)
    .await?;
    Ok(TransactionId(result.last_insert_rowid()))
}

pub async fn get_categories(pool: &DbPool) -> Result<Vec<Category>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, name, description FROM categories WHERE hidden = 0 ORDER BY sort_order, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Category {
            id: CategoryId(r.0),
            name: r.1,
            description: r.2,
        })
        .collect())
}

pub async fn get_accounts(pool: &DbPool) -> Result<Vec<Account>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, i64)>(
        "SELECT id, name, offbudget FROM accounts WHERE closed = 0 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Account {
            id: AccountId(r.0),
            name: r.1,
            offbudget: r.2 != 0,
        })
        .collect())
}

type TransactionRow = (i64, i64, Option<String>, i64, i64, Option<String>, Option<i64>);

const SELECT_TRANSACTIONS: &str = r#"
    SELECT t.id, t.account_id, p.name, t.amount_cents, t.date, t.notes, t.category_id
    FROM transactions t
    LEFT JOIN payees p ON p.id = t.payee_id
"#;

fn transaction_from_row(r: TransactionRow) -> Result<Transaction, sqlx::Error> {
    let date = u32::try_from(r.4).map_err(|e| sqlx::Error::ColumnDecode {
        index: "date".to_string(),
        source: Box::new(e),
    })?;
    Ok(Transaction {
        id: TransactionId(r.0),
        account_id: AccountId(r.1),
        payee: r.2.unwrap_or_default(),
        amount: Money::from_cents(r.3),
        date: CompactDate(date),
        notes: r.5,
        category: r.6.map(CategoryId),
    })
}

/// Live transactions of one account, newest first.
pub async fn get_transactions(
    pool: &DbPool,
    account_id: AccountId,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let sql = format!(
        "{SELECT_TRANSACTIONS} WHERE t.account_id = ? AND t.tombstone = 0 ORDER BY t.date DESC, t.id"
    );
    let rows = sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(account_id.0)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(transaction_from_row).collect()
}

pub async fn get_transaction(
    pool: &DbPool,
    id: TransactionId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let sql = format!("{SELECT_TRANSACTIONS} WHERE t.id = ?");
    let row = sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(id.0)
        .fetch_optional(pool)
        .await?;

    row.map(transaction_from_row).transpose()
}

use std::fmt;
use std::sync::Arc;

use autocat_core::{Category, SearchResult, Transaction};
use minijinja::value::{Enumerator, Object, Value};
use minijinja::{context, Environment, ErrorKind, State};
use thiserror::Error;

const TEMPLATE_NAME: &str = "categorize";

/// Jinja template used when `PROMPT_TEMPLATE` is not set.
pub const DEFAULT_TEMPLATE: &str = r#"
You are an expert at categorizing transactions.
Using the given categories, the bank transaction, and a web search of the payee, make a best-guess attempt to categorize the transaction.
Utilize all information given, including payee name, web search, notes, and amount.

The categories are as follows:
{% for category in categories %}
{{ category.name }}: {{ category.description -}}
{% endfor %}

Note that if the transaction is a transfer, especially one from Venmo or an external account, categorize it as "Cash Transactions" if category available, or "Income" if category is available.
If a transaction is an investment, such as a transfer to a stock brokerage, and there is an "Investment" or "Savings" category available, use that.
If a transaction is a payment to a credit card, set the category to "Nothing".

Here is the transaction:
Name: {{ transaction.payee }}
Amount: ${{ transaction.amount }}
Date: {{ transaction.date // 10000 }} - {{ transaction.date % 10000 // 100 }} - {{ transaction.date % 100 }}
Notes: {{ transaction.notes }}

{% if ENABLE_SEARCH %}
Search Results:
{% for result in search_results %}
Title: {{ result.title }}
Snippet: {{ result.snippet }}

{% endfor %}
{% endif %}

You must respond with a valid JSON, with a category and a confidence.
The category must be exactly one of these categories: {{ category_names }}.

The confidence should be on a scale of 0 (least confident) to 10 (most confident).
If you cannot justify exactly one category, return a lower confidence.
Here is an example JSON response:
{
    "reasoning": "All information you used to justify your categorization",
    "category": "Category Name",
    "confidence": 7
}
Model your response after this example, and do not include any other text.
"#;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Invalid prompt template: {0}")]
    Template(#[from] minijinja::Error),
}

/// The payee as the template sees it: `{{ transaction.payee }}` and
/// `{{ transaction.payee.name }}` both render the name.
#[derive(Debug, Clone)]
struct PayeeView {
    name: String,
}

impl Object for PayeeView {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "name" => Some(Value::from(self.name.clone())),
            _ => None,
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&["name"])
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The transaction as the template sees it. Besides the flat fields it
/// answers `transaction.payee.name` and `transaction.get_amount()`.
#[derive(Debug, Clone)]
pub struct TransactionView {
    pub payee: String,
    pub amount: String,
    /// Packed `YYYYMMDD`, so templates can split it with integer arithmetic.
    pub date: u32,
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub notes: String,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        TransactionView {
            payee: tx.payee.clone(),
            amount: tx.amount.to_string(),
            date: tx.date.0,
            year: tx.date.year(),
            month: tx.date.month(),
            day: tx.date.day(),
            notes: tx.notes.clone().unwrap_or_default(),
        }
    }
}

impl Object for TransactionView {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let value = match key.as_str()? {
            "payee" => Value::from_object(PayeeView {
                name: self.payee.clone(),
            }),
            "amount" => Value::from(self.amount.clone()),
            "date" => Value::from(self.date),
            "year" => Value::from(self.year),
            "month" => Value::from(self.month),
            "day" => Value::from(self.day),
            "notes" => Value::from(self.notes.clone()),
            _ => return None,
        };
        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&["payee", "amount", "date", "year", "month", "day", "notes"])
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, minijinja::Error> {
        match method {
            "get_amount" if args.is_empty() => Ok(Value::from(self.amount.clone())),
            "get_amount" => Err(minijinja::Error::new(
                ErrorKind::TooManyArguments,
                "get_amount() takes no arguments",
            )),
            _ => Err(minijinja::Error::new(
                ErrorKind::UnknownMethod,
                format!("transaction has no method named {method}"),
            )),
        }
    }
}

/// Everything a prompt template may reference.
#[derive(Debug)]
pub struct PromptContext<'a> {
    pub categories: &'a [Category],
    pub category_names: String,
    pub transaction: TransactionView,
    pub search_results: &'a [SearchResult],
    pub enable_search: bool,
}

impl<'a> PromptContext<'a> {
    pub fn new(
        categories: &'a [Category],
        transaction: &Transaction,
        search_results: &'a [SearchResult],
        enable_search: bool,
    ) -> Self {
        let category_names = categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        PromptContext {
            categories,
            category_names,
            transaction: TransactionView::from(transaction),
            search_results,
            enable_search,
        }
    }

    fn to_value(&self) -> Value {
        context! {
            categories => self.categories,
            category_names => &self.category_names,
            transaction => Value::from_object(self.transaction.clone()),
            search_results => self.search_results,
            ENABLE_SEARCH => self.enable_search,
        }
    }
}

pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    /// Compiles `template`, reporting syntax errors up front.
    pub fn new(template: &str) -> Result<Self, PromptError> {
        let mut env = Environment::new();
        env.add_template_owned(TEMPLATE_NAME, template.trim().to_string())?;
        Ok(Self { env })
    }

    pub fn render(&self, context: &PromptContext<'_>) -> Result<String, PromptError> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        Ok(template.render(context.to_value())?)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE).expect("default prompt template compiles")
    }
}

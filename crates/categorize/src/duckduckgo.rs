use std::sync::OnceLock;

use async_trait::async_trait;
use autocat_core::SearchResult;
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::search::{SearchError, SearchProvider};

pub const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_result,
    r#"(?s)class="result__a"[^>]*>(.*?)</a>.*?class="result__snippet"[^>]*>(.*?)</(?:a|td|div)>"#);
re!(re_tag, r"<[^>]+>");
re!(re_space, r"\s+");

/// Scrapes the DuckDuckGo HTML results page. Needs no API key.
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self, SearchError> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self, SearchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;

        // A throttled client gets 202 with a challenge page instead of results.
        let status = response.status();
        if status != StatusCode::OK {
            return Err(SearchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        let results = parse_results(&html);
        debug!(query, count = results.len(), "search results parsed");
        Ok(results)
    }
}

/// Pulls `(title, snippet)` pairs out of a results page, in page order.
pub fn parse_results(html: &str) -> Vec<SearchResult> {
    re_result()
        .captures_iter(html)
        .map(|caps| SearchResult::new(clean_fragment(&caps[1]), clean_fragment(&caps[2])))
        .filter(|r| !r.title.is_empty())
        .collect()
}

/// Strips inline markup, decodes common entities and collapses whitespace.
fn clean_fragment(fragment: &str) -> String {
    let text = re_tag().replace_all(fragment, "");
    let text = decode_entities(&text);
    re_space().replace_all(text.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

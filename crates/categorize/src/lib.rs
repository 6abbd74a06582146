pub mod categorizer;
pub mod duckduckgo;
pub mod extract;
pub mod model;
pub mod openai;
pub mod prompt;
pub mod rate_limit;
pub mod resolver;
pub mod search;
pub mod similarity;
pub(crate) mod util;

pub use categorizer::{CategorizeError, Categorizer, CategorizerSettings};
pub use duckduckgo::DuckDuckGoSearch;
pub use extract::{RawCategorization, ResponseExtractor};
pub use model::{FallbackNeeded, MockModel, ModelClient, ModelError};
pub use openai::{OpenAiCompatClient, OpenAiConfig};
pub use prompt::{PromptBuilder, PromptContext, PromptError, DEFAULT_TEMPLATE};
pub use rate_limit::{Clock, ManualClock, RateLimiter, SystemClock};
pub use resolver::CategoryResolver;
pub use search::{EnrichmentLookup, MockSearch, SearchError, SearchProvider};
pub use similarity::{EditRatio, IndelRatio, Similarity};

//! Web search for learning resources and skill trends (Exa).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One ranked hit, as returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: Option<String>,
    pub url: String,
    pub snippet: String,
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub num_results: u32,
    pub max_characters: u32,
}

impl SearchQuery {
    pub fn learning_resources(skills: &[String]) -> Self {
        Self {
            query: format!(
                "best online courses tutorials to learn {} for career growth",
                skills.join(" ")
            ),
            num_results: 8,
            max_characters: 300,
        }
    }

    /// `current_year` keeps the query pointed at the present job market.
    pub fn skill_trends(industry: &str, current_year: i32) -> Self {
        Self {
            query: format!(
                "trending skills {industry} {} {current_year} most in-demand skills hiring job market",
                current_year - 1
            ),
            num_results: 10,
            max_characters: 400,
        }
    }
}

#[async_trait]
pub trait ResourceSearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    #[serde(rename = "type")]
    search_type: &'static str,
    use_autoprompt: bool,
    num_results: u32,
    contents: ExaContents,
}

#[derive(Serialize)]
struct ExaContents {
    text: ExaTextOptions,
    highlights: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextOptions {
    max_characters: u32,
}

#[derive(Debug, Deserialize)]
pub struct ExaResponse {
    #[serde(default)]
    pub results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaResult {
    pub title: Option<String>,
    pub url: String,
    pub text: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub published_date: Option<String>,
}

impl From<ExaResult> for SearchResult {
    fn from(r: ExaResult) -> Self {
        let snippet = r
            .text
            .filter(|t| !t.is_empty())
            .or_else(|| r.highlights.into_iter().next())
            .unwrap_or_default();
        SearchResult {
            title: r.title,
            url: r.url,
            snippet,
            published_date: r.published_date,
        }
    }
}

pub struct ExaClient {
    client: Client,
    api_key: String,
}

impl ExaClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl ResourceSearch for ExaClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        let request = ExaRequest {
            query: &query.query,
            search_type: "neural",
            use_autoprompt: true,
            num_results: query.num_results,
            contents: ExaContents {
                text: ExaTextOptions {
                    max_characters: query.max_characters,
                },
                highlights: true,
            },
        };

        let response = self
            .client
            .post(EXA_SEARCH_URL)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ExaResponse = serde_json::from_str(&body)?;
        debug!("Exa returned {} results", parsed.results.len());
        Ok(parsed.results.into_iter().map(SearchResult::from).collect())
    }
}

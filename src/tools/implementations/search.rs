//! Web search tool
//!
//! Queries the configured providers in order (Tavily, then Serper) and
//! returns the first non-empty result. A provider that errors or finds
//! nothing hands over to the next one.

use crate::errors::{AgentError, Result};
use crate::tools::registry::Tool;
use crate::tools::types::ToolInput;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Registry name of the search tool
pub const SEARCH_TOOL: &str = "search";

/// Tavily search endpoint
pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Serper (Google search) endpoint
pub const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";

/// Results requested per query
const DEFAULT_MAX_RESULTS: usize = 3;

/// Request timeout (30 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Search API a source talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProvider {
    Tavily,
    Serper,
}

impl SearchProvider {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            SearchProvider::Tavily => TAVILY_SEARCH_URL,
            SearchProvider::Serper => SERPER_SEARCH_URL,
        }
    }
}

impl fmt::Display for SearchProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchProvider::Tavily => write!(f, "Tavily"),
            SearchProvider::Serper => write!(f, "Serper"),
        }
    }
}

#[derive(Debug, Clone)]
struct SearchSource {
    provider: SearchProvider,
    api_key: String,
    endpoint: String,
}

/// Web search tool
#[derive(Debug, Clone)]
pub struct SearchTool {
    client: Client,
    sources: Vec<SearchSource>,
    max_results: usize,
}

impl SearchTool {
    /// Create search tool backed by Tavily
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_provider(SearchProvider::Tavily, api_key)
    }

    /// Create search tool with a single provider
    pub fn with_provider(provider: SearchProvider, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            client,
            sources: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
        }
        .with_fallback(provider, api_key))
    }

    /// Build from environment variables; `None` when no key is set
    ///
    /// Tavily is tried first when both keys are present.
    pub fn from_env(tavily_var: &str, serper_var: &str) -> Option<Self> {
        let key = |var: &str| std::env::var(var).ok().filter(|k| !k.trim().is_empty());

        let mut providers = Vec::new();
        if let Some(k) = key(tavily_var) {
            providers.push((SearchProvider::Tavily, k));
        }
        if let Some(k) = key(serper_var) {
            providers.push((SearchProvider::Serper, k));
        }

        let mut providers = providers.into_iter();
        let (provider, api_key) = providers.next()?;
        let tool = Self::with_provider(provider, api_key).ok()?;
        Some(providers.fold(tool, |tool, (provider, api_key)| {
            tool.with_fallback(provider, api_key)
        }))
    }

    /// Add a provider tried after the existing ones
    pub fn with_fallback(mut self, provider: SearchProvider, api_key: impl Into<String>) -> Self {
        self.sources.push(SearchSource {
            provider,
            api_key: api_key.into(),
            endpoint: provider.default_endpoint().to_string(),
        });
        self
    }

    /// Point every source of `provider` at another endpoint
    pub fn with_endpoint(mut self, provider: SearchProvider, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        for source in self.sources.iter_mut().filter(|s| s.provider == provider) {
            source.endpoint = endpoint.clone();
        }
        self
    }

    /// Set number of results requested
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Providers in the order they are tried
    pub fn providers(&self) -> Vec<SearchProvider> {
        self.sources.iter().map(|s| s.provider).collect()
    }

    /// Query one source; `Ok(None)` when it found nothing
    async fn query(&self, source: &SearchSource, query: &str) -> Result<Option<String>> {
        let request = match source.provider {
            SearchProvider::Tavily => self.client.post(&source.endpoint).json(&TavilyRequest {
                api_key: &source.api_key,
                query,
                max_results: self.max_results,
                include_answer: true,
            }),
            SearchProvider::Serper => self
                .client
                .post(&source.endpoint)
                .header("X-API-KEY", &source.api_key)
                .json(&SerperRequest {
                    q: query,
                    num: self.max_results,
                }),
        };

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::tool(SEARCH_TOOL, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AgentError::tool(SEARCH_TOOL, format!("HTTP {}", status)));
        }

        let rendered = match source.provider {
            SearchProvider::Tavily => response
                .json::<TavilyResponse>()
                .await
                .map(|body| body.render()),
            SearchProvider::Serper => response
                .json::<SerperResponse>()
                .await
                .map(|body| body.render(self.max_results)),
        }
        .map_err(|e| AgentError::tool(SEARCH_TOOL, format!("bad response: {}", e)))?;

        Ok(rendered)
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information. Params: query=..."
    }

    async fn invoke(&self, input: &ToolInput) -> Result<String> {
        let query = input
            .get("query")
            .or(input.text())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AgentError::tool(SEARCH_TOOL, "query cannot be empty"))?;

        let mut failures = Vec::new();
        for source in &self.sources {
            match self.query(source, query).await {
                Ok(Some(text)) => {
                    debug!(provider = %source.provider, "search answered");
                    return Ok(format!("{} results:\n{}", source.provider, text));
                }
                Ok(None) => debug!(provider = %source.provider, "search found nothing"),
                Err(e) => {
                    warn!(provider = %source.provider, error = %e, "search provider failed");
                    failures.push(format!("{}: {}", source.provider, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(format!("No results for '{}'", query))
        } else {
            Err(AgentError::tool(
                SEARCH_TOOL,
                format!("all search sources failed ({})", failures.join("; ")),
            ))
        }
    }
}

/// Tavily search request
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    include_answer: bool,
}

/// Tavily search response
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilyResponse {
    fn render(&self) -> Option<String> {
        if self.answer.is_none() && self.results.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if let Some(answer) = &self.answer {
            parts.push(format!("Answer: {}", answer));
        }
        for (i, hit) in self.results.iter().enumerate() {
            parts.push(format!("{}. {} ({})\n   {}", i + 1, hit.title, hit.url, hit.content));
        }
        Some(parts.join("\n"))
    }
}

/// Serper search request
#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

/// Serper search response
#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default, rename = "answerBox")]
    answer_box: Option<SerperAnswer>,
    #[serde(default)]
    organic: Vec<SerperHit>,
}

#[derive(Debug, Deserialize)]
struct SerperAnswer {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerperHit {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SerperResponse {
    fn render(&self, max_results: usize) -> Option<String> {
        let answer = self
            .answer_box
            .as_ref()
            .and_then(|b| b.answer.as_ref().or(b.snippet.as_ref()));
        if answer.is_none() && self.organic.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if let Some(answer) = answer {
            parts.push(format!("Answer: {}", answer));
        }
        for (i, hit) in self.organic.iter().take(max_results).enumerate() {
            parts.push(format!("{}. {} ({})\n   {}", i + 1, hit.title, hit.link, hit.snippet));
        }
        Some(parts.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one HTTP request with `body` as JSON, returning the base URL
    ///
    /// `None` when the sandbox does not allow a local listener.
    async fn serve_once(body: &'static str) -> Option<String> {
        let listener = match TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => return None,
            Err(err) => panic!("failed to bind local test listener: {err}"),
        };
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        Some(format!("http://{}", addr))
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    #[test]
    fn test_render_tavily_results() {
        let body: TavilyResponse = serde_json::from_value(serde_json::json!({
            "answer": "Rust is a systems language",
            "results": [
                {"title": "Rust", "url": "https://www.rust-lang.org", "content": "A language"}
            ]
        }))
        .unwrap();

        let text = body.render().unwrap();
        assert!(text.starts_with("Answer: Rust is a systems language"));
        assert!(text.contains("1. Rust (https://www.rust-lang.org)"));
    }

    #[test]
    fn test_render_empty() {
        let tavily: TavilyResponse = serde_json::from_str("{}").unwrap();
        assert!(tavily.render().is_none());
        let serper: SerperResponse = serde_json::from_str("{}").unwrap();
        assert!(serper.render(3).is_none());
    }

    #[test]
    fn test_render_serper_results() {
        let body: SerperResponse = serde_json::from_value(serde_json::json!({
            "answerBox": {"snippet": "Rust 1.0 was released in May 2015"},
            "organic": [
                {"title": "Rust", "link": "https://www.rust-lang.org", "snippet": "A language"},
                {"title": "Blog", "link": "https://blog.rust-lang.org", "snippet": "News"},
                {"title": "Wiki", "link": "https://en.wikipedia.org/wiki/Rust", "snippet": "Article"}
            ]
        }))
        .unwrap();

        let text = body.render(2).unwrap();
        assert!(text.starts_with("Answer: Rust 1.0 was released in May 2015"));
        assert!(text.contains("2. Blog (https://blog.rust-lang.org)"));
        assert!(!text.contains("Wiki"));
    }

    #[test]
    fn test_from_env_missing() {
        assert!(SearchTool::from_env(
            "TOOLBUDDY_TEST_UNSET_SEARCH_KEY",
            "TOOLBUDDY_TEST_UNSET_SERPER_KEY"
        )
        .is_none());
    }

    #[test]
    fn test_provider_order() {
        let tool = SearchTool::new("t")
            .unwrap()
            .with_fallback(SearchProvider::Serper, "s");
        assert_eq!(
            tool.providers(),
            [SearchProvider::Tavily, SearchProvider::Serper]
        );
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let tool = SearchTool::new("key").unwrap();
        let err = tool
            .invoke(&ToolInput::named([("query", " ")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("query cannot be empty"));
    }

    #[tokio::test]
    async fn test_falls_back_to_serper() {
        let Some(serper) = serve_once(
            r#"{"organic":[{"title":"Rust","link":"https://www.rust-lang.org","snippet":"A language"}]}"#,
        )
        .await
        else {
            return;
        };
        let tool = SearchTool::new("t")
            .unwrap()
            .with_fallback(SearchProvider::Serper, "s")
            .with_endpoint(SearchProvider::Tavily, "http://127.0.0.1:1/search")
            .with_endpoint(SearchProvider::Serper, format!("{}/search", serper));

        let text = tool.invoke(&ToolInput::from("rust")).await.unwrap();
        assert!(text.starts_with("Serper results:\n"));
        assert!(text.contains("1. Rust (https://www.rust-lang.org)"));
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_tool_error() {
        let tool = SearchTool::new("t")
            .unwrap()
            .with_fallback(SearchProvider::Serper, "s")
            .with_endpoint(SearchProvider::Tavily, "http://127.0.0.1:1/search")
            .with_endpoint(SearchProvider::Serper, "http://127.0.0.1:1/search");

        let err = tool.invoke(&ToolInput::from("rust")).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("all search sources failed"));
        assert!(text.contains("Tavily:"));
        assert!(text.contains("Serper:"));
    }
}

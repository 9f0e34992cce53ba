/// GitHub repository as a JSON document source
///
/// Documents live as files in a repository and are read and written
/// through the contents API. Every write is a commit.
use crate::{
    config::GithubStorageConfig,
    error::{QuizError, QuizResult},
    store::json::DocumentSource,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

const GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Document source backed by the GitHub contents API
pub struct GithubDocuments {
    config: GithubStorageConfig,
    api_url: String,
    http_client: Client,
}

impl GithubDocuments {
    pub fn new(config: GithubStorageConfig) -> QuizResult<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("quiz-server/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| QuizError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_url: GITHUB_API_URL.to_string(),
            http_client,
        })
    }

    fn contents_url(&self, name: &str) -> String {
        let prefix = self.config.path_prefix.trim_matches('/');
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };

        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url, self.config.owner, self.config.repo, path
        )
    }

    async fn fetch(&self, name: &str) -> QuizResult<Option<ContentsResponse>> {
        let mut request = self
            .http_client
            .get(self.contents_url(name))
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(branch) = &self.config.branch {
            request = request.query(&[("ref", branch)]);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(QuizError::Internal(format!(
                "GitHub read error for {}: {}",
                name,
                response.status()
            )));
        }

        Ok(Some(response.json().await?))
    }
}

/// Decode the base64 payload GitHub returns, which is wrapped with newlines
fn decode_content(encoded: &str) -> QuizResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| QuizError::Internal(format!("Invalid base64 from GitHub: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| QuizError::Internal(format!("Document is not UTF-8: {}", e)))
}

#[async_trait]
impl DocumentSource for GithubDocuments {
    async fn read(&self, name: &str) -> QuizResult<Option<String>> {
        match self.fetch(name).await? {
            Some(contents) => decode_content(&contents.content).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, name: &str, contents: &str) -> QuizResult<()> {
        // Updating an existing file requires its current blob sha
        let sha = self.fetch(name).await?.map(|existing| existing.sha);

        let body = PutContentsRequest {
            message: format!("Update {}", name),
            content: STANDARD.encode(contents),
            sha,
            branch: self.config.branch.as_deref(),
        };

        let response = self
            .http_client
            .put(self.contents_url(name))
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github.v3+json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuizError::Internal(format!(
                "GitHub write error for {}: {}",
                name,
                response.status()
            )));
        }

        debug!(document = name, "committed document to GitHub");
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "github:{}/{}/{}",
            self.config.owner,
            self.config.repo,
            self.config.path_prefix.trim_matches('/')
        )
    }
}

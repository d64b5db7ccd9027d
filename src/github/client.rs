//! GitHub REST client
//!
//! Maps HTTP status codes onto `GitHubErrorKind` so callers can tell
//! permanent failures from transient ones without reading messages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{CodeHost, PullRequestState};
use crate::errors::{GitHubError, GitHubErrorKind};

const USER_AGENT: &str = concat!("lgtm/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    state: String,
    #[serde(default)]
    merged: bool,
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(token: String, api_url: &str) -> Result<Self, GitHubError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Login of the account behind the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    pub async fn authenticated_user(&self) -> Result<String, GitHubError> {
        let resp = self.request(Method::GET, "/user").send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp, "authentication failed").await);
        }
        let user: UserResponse = resp.json().await?;
        Ok(user.login)
    }

    /// # Errors
    ///
    /// Returns an error if the repository is missing or not visible to the token.
    pub async fn check_repository(&self, owner: &str, repo: &str) -> Result<(), GitHubError> {
        let resp = self
            .request(Method::GET, &format!("/repos/{owner}/{repo}"))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(
                resp,
                &format!("insufficient permissions for repository {owner}/{repo}"),
            )
            .await);
        }
        Ok(())
    }
}

#[async_trait]
impl CodeHost for GitHubClient {
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestState, GitHubError> {
        debug!(owner, repo, pr_number = number, "Fetching pull request");

        let resp = self
            .request(Method::GET, &format!("/repos/{owner}/{repo}/pulls/{number}"))
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(GitHubError::new(
                GitHubErrorKind::NotFound,
                format!("PR #{number} not found in {owner}/{repo}"),
            )
            .with_status(404)),
            StatusCode::FORBIDDEN if !rate_limit_exhausted(resp.headers()) => Err(GitHubError::new(
                GitHubErrorKind::Forbidden,
                format!("insufficient permissions to access PR #{number} in {owner}/{repo}"),
            )
            .with_status(403)),
            status if status.is_success() => {
                let pr: PullRequestResponse = resp.json().await?;
                Ok(PullRequestState {
                    state: pr.state,
                    merged: pr.merged,
                })
            }
            _ => Err(error_from_response(resp, &format!("failed to get PR #{number}")).await),
        }
    }

    async fn create_approval_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Option<u64>, GitHubError> {
        debug!(owner, repo, pr_number = number, "Submitting approval review");

        let resp = self
            .request(
                Method::POST,
                &format!("/repos/{owner}/{repo}/pulls/{number}/reviews"),
            )
            .json(&json!({ "event": "APPROVE" }))
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(GitHubError::new(
                GitHubErrorKind::NotFound,
                format!("PR #{number} not found in {owner}/{repo}"),
            )
            .with_status(404)),
            StatusCode::FORBIDDEN if !rate_limit_exhausted(resp.headers()) => Err(GitHubError::new(
                GitHubErrorKind::Forbidden,
                format!("insufficient permissions to approve PR #{number}"),
            )
            .with_status(403)),
            StatusCode::UNPROCESSABLE_ENTITY => Err(GitHubError::new(
                GitHubErrorKind::Unprocessable,
                format!("PR #{number} cannot be approved (already merged or closed)"),
            )
            .with_status(422)),
            // A 2xx means the review exists, readable body or not.
            status if status.is_success() => match resp.json::<ReviewResponse>().await {
                Ok(review) => Ok(Some(review.id)),
                Err(e) => {
                    warn!(
                        owner,
                        repo,
                        pr_number = number,
                        error = %e,
                        "Approval accepted but review id unreadable"
                    );
                    Ok(None)
                }
            },
            _ => Err(error_from_response(resp, &format!("failed to approve PR #{number}")).await),
        }
    }
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

fn kind_for_status(status: StatusCode, headers: &HeaderMap) -> GitHubErrorKind {
    match status.as_u16() {
        401 => GitHubErrorKind::Unauthorized,
        403 if rate_limit_exhausted(headers) => GitHubErrorKind::RateLimited,
        403 => GitHubErrorKind::Forbidden,
        404 => GitHubErrorKind::NotFound,
        422 => GitHubErrorKind::Unprocessable,
        429 => GitHubErrorKind::RateLimited,
        500..=599 => GitHubErrorKind::Server,
        _ => GitHubErrorKind::Other,
    }
}

async fn error_from_response(resp: Response, context: &str) -> GitHubError {
    let status = resp.status();
    let kind = kind_for_status(status, resp.headers());
    let body = resp.text().await.unwrap_or_default();

    // GitHub error bodies look like {"message": "Bad credentials", ...}
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);

    GitHubError::new(kind, format!("{context}: {status} {detail}")).with_status(status.as_u16())
}

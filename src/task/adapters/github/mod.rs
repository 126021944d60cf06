//! GitHub REST adapter for the repository forge port.

use crate::task::{
    domain::{GithubLogin, RepositoryName, ReviewVerdict},
    ports::{CreatedRepository, ForgeError, ForgeResult, RepositoryForge},
};
use async_trait::async_trait;
use minijinja::{Environment, context};
use reqwest::{Response, StatusCode, header};
use serde_json::{Value, json};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "gitfreelas-lifecycle-service";

const APPROVED_TEMPLATE: &str = "\
**Submission approved.** The escrowed funds have been released to your \
wallet. Thank you for completing this task!";

const REJECTED_TEMPLATE: &str = "\
**Submission rejected.** This task has been cancelled.\
{% if reason %}\n\nReviewer notes:\n\n> {{ reason }}{% endif %}";

const REVISION_TEMPLATE: &str = "\
**Changes requested.** The task is back in progress; please address the \
feedback below and update this pull request.\n\n> {{ feedback }}";

/// Connection settings for the GitHub client.
#[derive(Debug, Clone)]
pub struct GithubClientConfig {
    /// REST API base URL.
    pub api_url: String,
    /// Token with repository administration scope.
    pub token: String,
    /// Organisation or user owning the task repositories.
    pub owner: String,
}

impl GithubClientConfig {
    /// Creates a config against the public GitHub API.
    #[must_use]
    pub fn new(token: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            api_url: "https://api.github.com".to_owned(),
            token: token.into(),
            owner: owner.into(),
        }
    }
}

/// Repository forge backed by the GitHub REST API.
pub struct GithubForge {
    http: reqwest::Client,
    config: GithubClientConfig,
    templates: Environment<'static>,
}

impl GithubForge {
    /// Creates a forge client.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Api`] when the comment templates fail to
    /// compile, which indicates a build-time defect rather than a runtime
    /// condition.
    pub fn new(config: GithubClientConfig) -> ForgeResult<Self> {
        let mut templates = Environment::new();
        for (name, source) in [
            ("approved", APPROVED_TEMPLATE),
            ("rejected", REJECTED_TEMPLATE),
            ("revision", REVISION_TEMPLATE),
        ] {
            templates
                .add_template(name, source)
                .map_err(|err| ForgeError::Api {
                    status: 0,
                    message: format!("template {name} failed to compile: {err}"),
                })?;
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            templates,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    fn repo_url(&self, name: &RepositoryName, path: &str) -> String {
        self.url(&format!("/repos/{}/{name}{path}", self.config.owner))
    }

    async fn request(
        &self,
        method: reqwest::Method,
        url: String,
        body: Option<Value>,
    ) -> ForgeResult<Response> {
        let mut request = self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(json_body) = body {
            request = request.json(&json_body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| ForgeError::Network(err.to_string()))?;
        Self::check_status(response).await
    }

    /// Maps error statuses onto the port's discriminants. Rate limiting is
    /// detected from the `x-ratelimit-remaining` header, not message text.
    async fn check_status(response: Response) -> ForgeResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|remaining| remaining == "0");
        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| status.to_string());

        Err(match status {
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            StatusCode::FORBIDDEN if rate_limited => ForgeError::RateLimited,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ForgeError::Permission(message)
            }
            _ => ForgeError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn render_verdict(&self, verdict: &ReviewVerdict) -> ForgeResult<String> {
        let render = |name: &str, ctx: minijinja::Value| {
            self.templates
                .get_template(name)
                .and_then(|template| template.render(ctx))
                .map_err(|err| ForgeError::Api {
                    status: 0,
                    message: format!("comment rendering failed: {err}"),
                })
        };
        match verdict {
            ReviewVerdict::Approved => render("approved", context! {}),
            ReviewVerdict::Rejected { reason } => {
                render("rejected", context! { reason => reason })
            }
            ReviewVerdict::RevisionRequested { feedback } => {
                render("revision", context! { feedback => feedback })
            }
        }
    }
}

#[async_trait]
impl RepositoryForge for GithubForge {
    async fn create_repository(
        &self,
        name: &RepositoryName,
        description: &str,
    ) -> ForgeResult<CreatedRepository> {
        let url = self.url(&format!("/orgs/{}/repos", self.config.owner));
        let body = json!({
            "name": name.as_str(),
            "description": description,
            "private": true,
            "auto_init": true,
        });
        let response = self.request(reqwest::Method::POST, url, Some(body)).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|err| ForgeError::Network(err.to_string()))?;

        let github_repo_id = payload
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| ForgeError::Api {
                status: 0,
                message: "repository response missing id".to_owned(),
            })?;
        let repo_url = payload
            .get("html_url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Ok(CreatedRepository {
            name: name.clone(),
            url: repo_url,
            github_repo_id,
        })
    }

    async fn delete_repository(&self, name: &RepositoryName) -> ForgeResult<()> {
        let url = self.repo_url(name, "");
        self.request(reqwest::Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn repository_exists(&self, name: &RepositoryName) -> ForgeResult<bool> {
        let url = self.repo_url(name, "");
        match self.request(reqwest::Method::GET, url, None).await {
            Ok(_) => Ok(true),
            Err(ForgeError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn add_collaborator(
        &self,
        name: &RepositoryName,
        login: &GithubLogin,
    ) -> ForgeResult<()> {
        let url = self.repo_url(name, &format!("/collaborators/{login}"));
        let body = json!({ "permission": "push" });
        self.request(reqwest::Method::PUT, url, Some(body)).await?;
        Ok(())
    }

    async fn remove_collaborator(
        &self,
        name: &RepositoryName,
        login: &GithubLogin,
    ) -> ForgeResult<()> {
        let url = self.repo_url(name, &format!("/collaborators/{login}"));
        self.request(reqwest::Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn post_review_comment(
        &self,
        name: &RepositoryName,
        pull_request_number: u64,
        verdict: &ReviewVerdict,
    ) -> ForgeResult<()> {
        let body_text = self.render_verdict(verdict)?;
        let url = self.repo_url(name, &format!("/issues/{pull_request_number}/comments"));
        let body = json!({ "body": body_text });
        self.request(reqwest::Method::POST, url, Some(body)).await?;
        Ok(())
    }

    async fn merge_pull_request(
        &self,
        name: &RepositoryName,
        pull_request_number: u64,
    ) -> ForgeResult<()> {
        let url = self.repo_url(name, &format!("/pulls/{pull_request_number}/merge"));
        let body = json!({ "merge_method": "squash" });
        self.request(reqwest::Method::PUT, url, Some(body)).await?;
        Ok(())
    }

    async fn transfer_access(
        &self,
        name: &RepositoryName,
        from: &GithubLogin,
        to: &GithubLogin,
    ) -> ForgeResult<()> {
        let grant_url = self.repo_url(name, &format!("/collaborators/{to}"));
        let body = json!({ "permission": "admin" });
        self.request(reqwest::Method::PUT, grant_url, Some(body))
            .await?;
        self.remove_collaborator(name, from).await
    }

    async fn verify_connection(&self) -> ForgeResult<String> {
        let url = self.url("/user");
        let response = self.request(reqwest::Method::GET, url, None).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|err| ForgeError::Network(err.to_string()))?;
        payload
            .get("login")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ForgeError::Api {
                status: 0,
                message: "user response missing login".to_owned(),
            })
    }
}

use vigil_core::{GithubConfig, VigilError};

/// HTML marker embedded in vigil's PR comments so a later run can find
/// and update its own comment instead of stacking new ones.
pub const COMMENT_MARKER: &str = "<!-- vigil-report -->";

/// GitHub client for pull-request diffs, comments, and labels.
///
/// # Examples
///
/// ```
/// use vigil_notify::parse_pr_reference;
///
/// let (owner, repo, number) = parse_pr_reference("acme/burst#42").unwrap();
/// assert_eq!(owner, "acme");
/// assert_eq!(repo, "burst");
/// assert_eq!(number, 42);
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
}

impl GitHubClient {
    /// Create a client from an explicit token or the `GITHUB_TOKEN` /
    /// `GH_TOKEN` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Config`] if no token is available, or
    /// [`VigilError::Git`] if the client cannot be built.
    pub fn new(token: Option<&str>) -> Result<Self, VigilError> {
        let token = match token {
            Some(t) => t.to_string(),
            None => std::env::var("GITHUB_TOKEN")
                .or_else(|_| std::env::var("GH_TOKEN"))
                .map_err(|_| {
                    VigilError::Config(
                        "GITHUB_TOKEN not set. Pass --github-token or set GITHUB_TOKEN env var"
                            .into(),
                    )
                })?,
        };

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.clone())
            .build()
            .map_err(|e| VigilError::Git(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::new();

        Ok(Self {
            octocrab,
            http,
            token,
        })
    }

    /// Fetch the unified diff for a pull request.
    ///
    /// Uses a raw request with the diff media type; octocrab only
    /// exposes the structured file listing.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Git`] on network or API errors.
    pub async fn get_pr_diff(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<String, VigilError> {
        let url = format!("https://api.github.com/repos/{owner}/{repo}/pulls/{pr_number}");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github.v3.diff")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "vigil")
            .send()
            .await
            .map_err(|e| VigilError::Git(format!("failed to fetch PR diff: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VigilError::Git(format!("GitHub API error {status}: {body}")));
        }

        response
            .text()
            .await
            .map_err(|e| VigilError::Git(format!("failed to read diff response: {e}")))
    }

    /// Post or update the run's marker-tagged comment on a pull request.
    ///
    /// Looks for an existing comment carrying [`COMMENT_MARKER`] and
    /// edits it in place; otherwise a new comment is created. Returns
    /// `true` when an existing comment was updated.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Git`] on API errors.
    pub async fn upsert_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        markdown: &str,
    ) -> Result<bool, VigilError> {
        let body = format!("{COMMENT_MARKER}\n{markdown}");
        let issues = self.octocrab.issues(owner, repo);

        let existing = issues
            .list_comments(pr_number)
            .per_page(100)
            .send()
            .await
            .map_err(|e| VigilError::Git(format!("failed to list PR comments: {e}")))?;

        let previous = existing
            .items
            .iter()
            .find(|c| {
                c.body
                    .as_deref()
                    .is_some_and(|b| b.contains(COMMENT_MARKER))
            })
            .map(|c| c.id);

        match previous {
            Some(id) => {
                issues
                    .update_comment(id, &body)
                    .await
                    .map_err(|e| VigilError::Git(format!("failed to update PR comment: {e}")))?;
                Ok(true)
            }
            None => {
                issues
                    .create_comment(pr_number, &body)
                    .await
                    .map_err(|e| VigilError::Git(format!("failed to create PR comment: {e}")))?;
                Ok(false)
            }
        }
    }

    /// Add labels to a pull request. Labels already present are left
    /// alone by the API, so applying is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Git`] on API errors.
    pub async fn apply_labels(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<(), VigilError> {
        if labels.is_empty() {
            return Ok(());
        }
        self.octocrab
            .issues(owner, repo)
            .add_labels(pr_number, labels)
            .await
            .map_err(|e| VigilError::Git(format!("failed to apply labels: {e}")))?;
        Ok(())
    }
}

/// Parse a PR reference string (`owner/repo#number`) into its components.
///
/// # Errors
///
/// Returns [`VigilError::Config`] if the format is invalid.
///
/// # Examples
///
/// ```
/// use vigil_notify::parse_pr_reference;
///
/// let (owner, repo, num) = parse_pr_reference("octocat/hello-world#42").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// assert_eq!(num, 42);
/// ```
pub fn parse_pr_reference(pr_ref: &str) -> Result<(String, String, u64), VigilError> {
    let Some((owner_repo, number_str)) = pr_ref.split_once('#') else {
        return Err(VigilError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        )));
    };
    let Some((owner, repo)) = owner_repo.split_once('/') else {
        return Err(VigilError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        )));
    };
    let number: u64 = number_str
        .parse()
        .map_err(|_| VigilError::Config(format!("invalid PR number: {number_str}")))?;
    Ok((owner.to_string(), repo.to_string(), number))
}

/// Resolve a PR reference that may be a bare number, using the
/// configured default repository.
///
/// # Errors
///
/// Returns [`VigilError::Config`] when a bare number is given without
/// a configured repository, or when the reference is malformed.
///
/// # Examples
///
/// ```
/// use vigil_core::GithubConfig;
/// use vigil_notify::resolve_pr_reference;
///
/// let config = GithubConfig {
///     repository: Some("acme/burst".into()),
/// };
/// let (owner, repo, num) = resolve_pr_reference("17", &config).unwrap();
/// assert_eq!((owner.as_str(), repo.as_str(), num), ("acme", "burst", 17));
/// ```
pub fn resolve_pr_reference(
    pr_ref: &str,
    config: &GithubConfig,
) -> Result<(String, String, u64), VigilError> {
    if pr_ref.contains('#') {
        return parse_pr_reference(pr_ref);
    }
    let number: u64 = pr_ref.parse().map_err(|_| {
        VigilError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number or a number"
        ))
    })?;
    let Some(repository) = &config.repository else {
        return Err(VigilError::Config(
            "bare PR number given but [github].repository is not configured".into(),
        ));
    };
    let Some((owner, repo)) = repository.split_once('/') else {
        return Err(VigilError::Config(format!(
            "invalid [github].repository '{repository}', expected owner/repo"
        )));
    };
    Ok((owner.to_string(), repo.to_string(), number))
}

//! Read-only snapshots of a pull request.
//!
//! A [`PullContext`] answers every question the signal matchers, the decision functions and
//! the merge and update loops ask about a pull request. Create a new snapshot for every
//! evaluation: the cached data goes stale as soon as anyone touches the pull request.

use async_trait::async_trait;
use github_client::models::PullRequest;
use github_client::GitHubClient;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::MergeRollerResult;

#[cfg(test)]
#[path = "pull_context_tests.rs"]
mod tests;

/// GitHub's current view of whether a pull request can be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeState {
    /// The pull request is closed or already merged
    pub closed: bool,
    /// `None` while GitHub is still computing mergeability
    pub mergeable: Option<bool>,
}

/// The branches of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branches {
    /// The target branch
    pub base: String,
    /// The source branch; `owner:branch` when it lives in a fork
    pub head: String,
}

impl Branches {
    /// Returns `true` when the head branch lives in a fork.
    pub fn head_is_fork(&self) -> bool {
        self.head.contains(':')
    }
}

/// A commit of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
}

/// Read-only access to the state of one pull request.
///
/// The synchronous accessors return data captured when the snapshot was created. The async
/// accessors may go to GitHub and can fail; implementations may cache their answers for the
/// lifetime of the snapshot, except for [`PullContext::merge_state`] which is always read
/// fresh because the merge loop polls it.
#[async_trait]
pub trait PullContext: Send + Sync {
    fn owner(&self) -> &str;

    fn repo(&self) -> &str;

    fn number(&self) -> u64;

    /// A human readable identifier, `owner/repo#number`.
    fn locator(&self) -> String {
        format!("{}/{}#{}", self.owner(), self.repo(), self.number())
    }

    fn title(&self) -> &str;

    /// The pull request description; empty when there is none.
    fn body(&self) -> &str;

    /// The head commit when the snapshot was created.
    fn head_sha(&self) -> &str;

    fn branches(&self) -> Branches;

    fn is_draft(&self) -> bool;

    /// Whether GitHub's native auto-merge is enabled.
    fn auto_merge(&self) -> bool;

    /// Re-reads the closed flag and mergeability from GitHub.
    async fn merge_state(&self) -> MergeRollerResult<MergeState>;

    /// Status checks required by branch protection on the target branch.
    async fn required_statuses(&self) -> MergeRollerResult<Vec<String>>;

    /// Whether the target branch restricts who may push to it.
    async fn push_restrictions(&self) -> MergeRollerResult<bool>;

    /// Names of the statuses and check runs that succeeded on the head commit.
    async fn current_successful_statuses(&self) -> MergeRollerResult<Vec<String>>;

    /// Issue comment bodies, oldest first. The pull request body is not included.
    async fn comments(&self) -> MergeRollerResult<Vec<String>>;

    /// Commits, oldest first.
    async fn commits(&self) -> MergeRollerResult<Vec<CommitInfo>>;

    async fn labels(&self) -> MergeRollerResult<Vec<String>>;

    /// Whether another open pull request uses this pull request's head branch as its target.
    async fn is_targeted(&self) -> MergeRollerResult<bool>;
}

/// A [`PullContext`] backed by the GitHub API.
///
/// Everything except the merge state is loaded on first use and cached.
#[derive(Debug)]
pub struct GitHubPullContext {
    client: GitHubClient,
    owner: String,
    repo: String,
    pull_request: PullRequest,
    comments: OnceCell<Vec<String>>,
    commits: OnceCell<Vec<CommitInfo>>,
    labels: OnceCell<Vec<String>>,
    required_statuses: OnceCell<Vec<String>>,
    push_restrictions: OnceCell<bool>,
    successful_statuses: OnceCell<Vec<String>>,
    is_targeted: OnceCell<bool>,
}

impl GitHubPullContext {
    pub fn new(client: GitHubClient, owner: &str, repo: &str, pull_request: PullRequest) -> Self {
        Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
            pull_request,
            comments: OnceCell::new(),
            commits: OnceCell::new(),
            labels: OnceCell::new(),
            required_statuses: OnceCell::new(),
            push_restrictions: OnceCell::new(),
            successful_statuses: OnceCell::new(),
            is_targeted: OnceCell::new(),
        }
    }

    /// Fetches the pull request and wraps it in a fresh snapshot.
    pub async fn load(
        client: GitHubClient,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MergeRollerResult<Self> {
        let pull_request = client.get_pull_request(owner, repo, number).await?;
        Ok(Self::new(client, owner, repo, pull_request))
    }

    pub fn pull_request(&self) -> &PullRequest {
        &self.pull_request
    }

    fn base_branch(&self) -> &str {
        &self.pull_request.base.ref_name
    }
}

#[async_trait]
impl PullContext for GitHubPullContext {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    fn number(&self) -> u64 {
        self.pull_request.number
    }

    fn title(&self) -> &str {
        &self.pull_request.title
    }

    fn body(&self) -> &str {
        self.pull_request.body.as_deref().unwrap_or_default()
    }

    fn head_sha(&self) -> &str {
        &self.pull_request.head.sha
    }

    fn branches(&self) -> Branches {
        let head = &self.pull_request.head;
        let head_name = if self.pull_request.is_from_fork() {
            if head.label.contains(':') {
                head.label.clone()
            } else {
                let owner = head
                    .repo
                    .as_ref()
                    .map(|r| r.owner.login.as_str())
                    .unwrap_or("unknown");
                format!("{owner}:{}", head.ref_name)
            }
        } else {
            head.ref_name.clone()
        };

        Branches {
            base: self.pull_request.base.ref_name.clone(),
            head: head_name,
        }
    }

    fn is_draft(&self) -> bool {
        self.pull_request.draft
    }

    fn auto_merge(&self) -> bool {
        self.pull_request.auto_merge_enabled()
    }

    async fn merge_state(&self) -> MergeRollerResult<MergeState> {
        let current = self
            .client
            .get_pull_request(&self.owner, &self.repo, self.pull_request.number)
            .await?;
        Ok(MergeState {
            closed: current.is_closed() || current.merged,
            mergeable: current.mergeable,
        })
    }

    async fn required_statuses(&self) -> MergeRollerResult<Vec<String>> {
        let statuses = self
            .required_statuses
            .get_or_try_init(|| async {
                self.client
                    .get_required_status_checks(&self.owner, &self.repo, self.base_branch())
                    .await
            })
            .await?;
        Ok(statuses.clone())
    }

    async fn push_restrictions(&self) -> MergeRollerResult<bool> {
        let restricted = self
            .push_restrictions
            .get_or_try_init(|| async {
                self.client
                    .has_push_restrictions(&self.owner, &self.repo, self.base_branch())
                    .await
            })
            .await?;
        Ok(*restricted)
    }

    async fn current_successful_statuses(&self) -> MergeRollerResult<Vec<String>> {
        let statuses = self
            .successful_statuses
            .get_or_try_init(|| async {
                let sha = self.head_sha();
                let combined = self
                    .client
                    .get_combined_status(&self.owner, &self.repo, sha)
                    .await?;
                let runs = self
                    .client
                    .list_check_runs(&self.owner, &self.repo, sha)
                    .await?;

                let mut names: Vec<String> = Vec::new();
                let succeeded = combined
                    .statuses
                    .into_iter()
                    .filter(|s| s.state == "success")
                    .map(|s| s.context)
                    .chain(
                        runs.into_iter()
                            .filter(|r| r.conclusion.as_deref() == Some("success"))
                            .map(|r| r.name),
                    );
                for name in succeeded {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                debug!(sha = sha, statuses = ?names, "Loaded successful statuses");
                Ok::<_, github_client::Error>(names)
            })
            .await?;
        Ok(statuses.clone())
    }

    async fn comments(&self) -> MergeRollerResult<Vec<String>> {
        let comments = self
            .comments
            .get_or_try_init(|| async {
                let comments = self
                    .client
                    .list_issue_comments(&self.owner, &self.repo, self.pull_request.number)
                    .await?;
                Ok::<_, github_client::Error>(comments.into_iter().map(|c| c.body).collect())
            })
            .await?;
        Ok(comments.clone())
    }

    async fn commits(&self) -> MergeRollerResult<Vec<CommitInfo>> {
        let commits = self
            .commits
            .get_or_try_init(|| async {
                let commits = self
                    .client
                    .list_pull_request_commits(&self.owner, &self.repo, self.pull_request.number)
                    .await?;
                Ok::<_, github_client::Error>(
                    commits
                        .into_iter()
                        .map(|c| CommitInfo {
                            sha: c.sha,
                            message: c.commit.message,
                        })
                        .collect(),
                )
            })
            .await?;
        Ok(commits.clone())
    }

    async fn labels(&self) -> MergeRollerResult<Vec<String>> {
        let labels = self
            .labels
            .get_or_try_init(|| async {
                let labels = self
                    .client
                    .list_issue_labels(&self.owner, &self.repo, self.pull_request.number)
                    .await?;
                Ok::<_, github_client::Error>(labels.into_iter().map(|l| l.name).collect())
            })
            .await?;
        Ok(labels.clone())
    }

    async fn is_targeted(&self) -> MergeRollerResult<bool> {
        if self.pull_request.is_from_fork() {
            return Ok(false);
        }

        let targeted = self
            .is_targeted
            .get_or_try_init(|| async {
                let dependents = self
                    .client
                    .list_open_pull_requests(
                        &self.owner,
                        &self.repo,
                        Some(&self.pull_request.head.ref_name),
                    )
                    .await?;
                Ok::<_, github_client::Error>(!dependents.is_empty())
            })
            .await?;
        Ok(*targeted)
    }
}

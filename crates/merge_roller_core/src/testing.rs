//! In-memory test doubles shared by the unit tests of this crate.

use async_trait::async_trait;
use github_client::MergeMethod;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::merge::{CommitMessages, Merger};
use crate::pull_context::{Branches, CommitInfo, MergeState, PullContext};
use crate::update::Updater;
use crate::{MergeRollerError, MergeRollerResult};

fn fetch_error() -> MergeRollerError {
    MergeRollerError::PullRequestData(github_client::Error::ApiError())
}

pub(crate) fn request_failed(status: u16) -> MergeRollerError {
    MergeRollerError::PullRequestData(github_client::Error::RequestFailed {
        status,
        message: format!("status {status}"),
    })
}

/// A pull request snapshot whose every answer is set by the test.
#[derive(Debug)]
pub(crate) struct FakePullContext {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub head_sha: String,
    pub base: String,
    pub head: String,
    pub draft: bool,
    pub auto_merge: bool,
    pub labels: Vec<String>,
    pub comments: Vec<String>,
    pub commits: Vec<CommitInfo>,
    pub required_statuses: Vec<String>,
    pub successful_statuses: Vec<String>,
    pub push_restricted: bool,
    pub targeted: bool,
    pub labels_error: bool,
    pub comments_error: bool,
    pub commits_error: bool,
    pub statuses_error: bool,
    pub targeted_error: bool,
    /// Consumed one per call; the last state is repeated once the queue runs out
    pub merge_states: Mutex<VecDeque<MergeRollerResult<MergeState>>>,
    pub last_merge_state: Mutex<MergeState>,
}

impl Default for FakePullContext {
    fn default() -> Self {
        Self {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            number: 42,
            title: "Add widget support".to_string(),
            body: String::new(),
            head_sha: "abc123".to_string(),
            base: "main".to_string(),
            head: "feature/widgets".to_string(),
            draft: false,
            auto_merge: false,
            labels: Vec::new(),
            comments: Vec::new(),
            commits: Vec::new(),
            required_statuses: Vec::new(),
            successful_statuses: Vec::new(),
            push_restricted: false,
            targeted: false,
            labels_error: false,
            comments_error: false,
            commits_error: false,
            statuses_error: false,
            targeted_error: false,
            merge_states: Mutex::new(VecDeque::new()),
            last_merge_state: Mutex::new(MergeState {
                closed: false,
                mergeable: Some(true),
            }),
        }
    }
}

impl FakePullContext {
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_commit_count(count: usize) -> Self {
        Self {
            commits: (0..count)
                .map(|i| CommitInfo {
                    sha: format!("c{i}"),
                    message: format!("Commit {i}"),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn queue_merge_states(&self, states: Vec<MergeRollerResult<MergeState>>) {
        let mut queue = self.merge_states.lock().unwrap();
        queue.extend(states);
    }
}

#[async_trait]
impl PullContext for FakePullContext {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    fn number(&self) -> u64 {
        self.number
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn head_sha(&self) -> &str {
        &self.head_sha
    }

    fn branches(&self) -> Branches {
        Branches {
            base: self.base.clone(),
            head: self.head.clone(),
        }
    }

    fn is_draft(&self) -> bool {
        self.draft
    }

    fn auto_merge(&self) -> bool {
        self.auto_merge
    }

    async fn merge_state(&self) -> MergeRollerResult<MergeState> {
        let next = self.merge_states.lock().unwrap().pop_front();
        match next {
            Some(Ok(state)) => {
                *self.last_merge_state.lock().unwrap() = state;
                Ok(state)
            }
            Some(Err(e)) => Err(e),
            None => Ok(*self.last_merge_state.lock().unwrap()),
        }
    }

    async fn required_statuses(&self) -> MergeRollerResult<Vec<String>> {
        if self.statuses_error {
            return Err(fetch_error());
        }
        Ok(self.required_statuses.clone())
    }

    async fn push_restrictions(&self) -> MergeRollerResult<bool> {
        Ok(self.push_restricted)
    }

    async fn current_successful_statuses(&self) -> MergeRollerResult<Vec<String>> {
        if self.statuses_error {
            return Err(fetch_error());
        }
        Ok(self.successful_statuses.clone())
    }

    async fn comments(&self) -> MergeRollerResult<Vec<String>> {
        if self.comments_error {
            return Err(fetch_error());
        }
        Ok(self.comments.clone())
    }

    async fn commits(&self) -> MergeRollerResult<Vec<CommitInfo>> {
        if self.commits_error {
            return Err(fetch_error());
        }
        Ok(self.commits.clone())
    }

    async fn labels(&self) -> MergeRollerResult<Vec<String>> {
        if self.labels_error {
            return Err(fetch_error());
        }
        Ok(self.labels.clone())
    }

    async fn is_targeted(&self) -> MergeRollerResult<bool> {
        if self.targeted_error {
            return Err(fetch_error());
        }
        Ok(self.targeted)
    }
}

/// A merge call captured by [`FakeMerger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedMerge {
    pub method: MergeMethod,
    pub messages: CommitMessages,
}

/// A merger that records its calls and replays queued results.
#[derive(Debug, Default)]
pub(crate) struct FakeMerger {
    /// Consumed one per merge call; an empty queue merges successfully
    pub results: Mutex<VecDeque<MergeRollerResult<String>>>,
    pub merges: Mutex<Vec<RecordedMerge>>,
    pub deletes: Mutex<u32>,
    pub delete_error: bool,
}

impl FakeMerger {
    pub fn with_results(results: Vec<MergeRollerResult<String>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    pub fn merge_count(&self) -> usize {
        self.merges.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> u32 {
        *self.deletes.lock().unwrap()
    }
}

#[async_trait]
impl Merger for FakeMerger {
    async fn merge(
        &self,
        _ctx: &dyn PullContext,
        method: &MergeMethod,
        messages: &CommitMessages,
    ) -> MergeRollerResult<String> {
        self.merges.lock().unwrap().push(RecordedMerge {
            method: method.clone(),
            messages: messages.clone(),
        });
        let next = self.results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok("merged-sha".to_string()))
    }

    async fn delete_head(&self, _ctx: &dyn PullContext) -> MergeRollerResult<()> {
        *self.deletes.lock().unwrap() += 1;
        if self.delete_error {
            return Err(request_failed(422));
        }
        Ok(())
    }
}

/// An updater that replays queued answers.
#[derive(Debug, Default)]
pub(crate) struct FakeUpdater {
    /// Consumed one per `behind_by` call; an empty queue reports up to date
    pub behind: Mutex<VecDeque<MergeRollerResult<u64>>>,
    /// Consumed one per `merge_forward` call; an empty queue succeeds
    pub forward_results: Mutex<VecDeque<MergeRollerResult<()>>>,
    pub forwards: Mutex<Vec<String>>,
    pub compares: Mutex<u32>,
}

impl FakeUpdater {
    pub fn new(
        behind: Vec<MergeRollerResult<u64>>,
        forward_results: Vec<MergeRollerResult<()>>,
    ) -> Self {
        Self {
            behind: Mutex::new(behind.into()),
            forward_results: Mutex::new(forward_results.into()),
            ..Default::default()
        }
    }

    pub fn forward_count(&self) -> usize {
        self.forwards.lock().unwrap().len()
    }

    pub fn compare_count(&self) -> u32 {
        *self.compares.lock().unwrap()
    }
}

#[async_trait]
impl Updater for FakeUpdater {
    async fn behind_by(&self, _ctx: &dyn PullContext, _base_ref: &str) -> MergeRollerResult<u64> {
        *self.compares.lock().unwrap() += 1;
        let next = self.behind.lock().unwrap().pop_front();
        next.unwrap_or(Ok(0))
    }

    async fn merge_forward(&self, _ctx: &dyn PullContext, base_ref: &str) -> MergeRollerResult<()> {
        self.forwards.lock().unwrap().push(base_ref.to_string());
        let next = self.forward_results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }
}

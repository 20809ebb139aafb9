//! The sync run controller.
//!
//! A run walks the remote definitions in manifest order. For each one it
//! builds a patch, applies it with `git am` on a topic branch cut from the
//! staging branch, and merges the topic back into staging with a marker
//! commit. When every definition is done, staging is merged into the branch
//! the run started from.
//!
//! A conflict pauses the run: state is persisted and the process exits. A
//! later invocation picks it up with [`Workflow::resume`], [`Workflow::skip`]
//! or [`Workflow::abort`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use subsync_git::{ApplyOutcome, CommitFilter, GitOid, GitRepo, ObjectKind};
use tracing::{info, instrument, warn};

use crate::config::{SubsyncConfig, Squashing};
use crate::error::SyncError;
use crate::history;
use crate::marker;
use crate::matcher;
use crate::patch::{self, Patch, PatchRequest, display_path};
use crate::remote::{RemoteDefinition, RemoteResolver};
use crate::workflow_state::{WorkflowPhase, WorkflowState, WorkflowStateStore, now_secs};

/// Options fixed when a run starts and kept across invocations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Preview only; leave the original branch untouched.
    pub dry_run: bool,
    /// Anchor prefix overriding markers and content matching.
    pub since: Option<String>,
    pub squashing: Squashing,
}

/// How an invocation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Staging was merged into the original branch.
    Merged {
        /// Non-merge commits brought in.
        patches: usize,
    },
    /// Every definition was already up to date.
    NothingToApply,
    /// Preview printed; nothing merged.
    DryRun {
        /// Non-merge commits that would be brought in.
        patches: usize,
    },
    /// `git am` stopped on a conflict; the run waits for the user.
    Paused {
        /// `remote ref => path` of the definition that conflicted.
        definition: String,
        /// Output of the failed `git am`.
        detail: String,
    },
    /// The run was rolled back.
    Aborted,
}

enum Step {
    Advanced,
    Paused(RunOutcome),
}

fn label(def: &RemoteDefinition) -> String {
    format!(
        "{} {} => {}",
        def.remote_name,
        def.remote_ref,
        display_path(&def.local_path)
    )
}

/// Scan, match and assemble the patch bringing `dest_path` (on HEAD) up to
/// `source_path` at `source_rev`.
///
/// # Errors
/// History failures, [`SyncError::NoCommonAncestor`], git failures.
pub fn build_patch(
    repo: &dyn GitRepo,
    source_rev: &GitOid,
    source_path: &str,
    dest_path: &str,
    since: Option<&str>,
    squashing: Squashing,
) -> Result<Patch, SyncError> {
    let source = history::scan(repo, source_rev.as_str(), source_path)?;
    let dest = match history::scan(repo, "HEAD", dest_path) {
        Ok(records) => records,
        // Not imported yet: only `--since` can anchor it.
        Err(SyncError::EmptyHistory { .. }) => Vec::new(),
        Err(e) => return Err(e),
    };
    let anchor = matcher::find_anchor(&source, &dest, since).ok_or_else(|| {
        SyncError::NoCommonAncestor {
            source_rev: source_rev.to_string(),
            source_path: display_path(source_path).to_owned(),
            dest_path: display_path(dest_path).to_owned(),
        }
    })?;
    info!(anchor = %anchor.anchor, reason = ?anchor.reason, pending = anchor.pending.len(), "anchor found");
    if anchor.is_up_to_date() {
        return Ok(Patch::Empty);
    }

    let request = PatchRequest {
        anchor: &anchor.anchor,
        source_rev,
        source_path,
        source_kind: source.first().map_or(ObjectKind::Tree, |r| r.kind),
        dest_path,
        pending: anchor.pending.len(),
        squashing,
    };
    patch::assemble(repo, &request)
}

/// Drives one sync run against a repository.
pub struct Workflow<'a> {
    repo: &'a dyn GitRepo,
    config: SubsyncConfig,
    store: WorkflowStateStore,
    resolver: RemoteResolver,
    interrupt: Arc<AtomicBool>,
}

impl<'a> Workflow<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn GitRepo, config: SubsyncConfig) -> Self {
        Self {
            store: WorkflowStateStore::new(repo.git_dir()),
            repo,
            config,
            resolver: RemoteResolver::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use `flag` (set by a signal handler) to request a rollback.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &WorkflowStateStore {
        &self.store
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    fn staging(&self) -> &str {
        &self.config.branches.staging
    }

    fn topic(&self) -> &str {
        &self.config.branches.topic
    }

    /// The persisted state, if a run is in progress.
    ///
    /// # Errors
    /// Unreadable or incompatible state file.
    pub fn status(&self) -> Result<Option<WorkflowState>, SyncError> {
        Ok(self.store.load()?)
    }

    fn load_required(&self) -> Result<WorkflowState, SyncError> {
        self.store.load()?.ok_or(SyncError::NoRunInProgress)
    }

    fn require_branch(&self, expected: &str) -> Result<(), SyncError> {
        let actual = self.repo.current_branch()?;
        if actual.as_deref() == Some(expected) {
            Ok(())
        } else {
            Err(SyncError::BranchState {
                expected: expected.to_owned(),
                actual,
            })
        }
    }

    fn save(&self, state: &WorkflowState) -> Result<(), SyncError> {
        Ok(self.store.save(state)?)
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Start a new run over `definitions`.
    ///
    /// # Errors
    /// A run already in progress, a dirty tree, a detached HEAD, ref
    /// resolution failures (all before any branch is touched), and anything
    /// that fails while processing.
    #[instrument(skip_all, fields(definitions = definitions.len()))]
    pub fn start(
        &mut self,
        mut definitions: Vec<RemoteDefinition>,
        options: &RunOptions,
    ) -> Result<RunOutcome, SyncError> {
        if self.store.exists() {
            return Err(SyncError::RunInProgress {
                state_dir: self.store.dir().to_owned(),
            });
        }
        if self.repo.is_dirty()? {
            return Err(SyncError::DirtyWorktree);
        }
        let original_branch =
            self.repo
                .current_branch()?
                .ok_or_else(|| SyncError::BranchState {
                    expected: "a local branch".to_owned(),
                    actual: None,
                })?;
        let initial_head = self.repo.rev_parse("HEAD")?;
        for branch in [self.staging(), self.topic()] {
            if self.repo.branch_exists(branch)? {
                return Err(SyncError::BranchExists {
                    branch: branch.to_owned(),
                });
            }
        }

        self.resolver.resolve_all(self.repo, &mut definitions)?;

        let mut state = WorkflowState::new(definitions, original_branch, initial_head, now_secs());
        state.dry_run = options.dry_run;
        state.squashing = options.squashing;
        state.since.clone_from(&options.since);
        self.save(&state)?;
        info!(branch = %state.original_branch, head = %state.initial_head, "run started");

        let created = self
            .repo
            .checkout_new_branch(self.staging(), state.initial_head.as_str())
            .map_err(SyncError::from);
        self.guard(&mut state, created)?;
        state.advance(WorkflowPhase::Staging, now_secs())?;
        self.save(&state)?;
        self.run_loop(state)
    }

    /// Continue after the user resolved a conflict (`--continue`).
    ///
    /// # Errors
    /// No run, wrong phase, wrong branch, or `git am` still stopped. State
    /// is left unchanged in each of those cases.
    #[instrument(skip_all)]
    pub fn resume(&mut self) -> Result<RunOutcome, SyncError> {
        let mut state = self.load_required()?;
        if state.phase != WorkflowPhase::AmPending {
            return Err(SyncError::InvalidPhase {
                operation: "continue",
                phase: state.phase,
            });
        }
        self.require_branch(self.topic())?;
        if self.repo.apply_in_progress()? {
            return Err(SyncError::ApplyInProgress);
        }
        let merged = self.merge_topic(&mut state);
        self.guard(&mut state, merged)?;
        state.advance(WorkflowPhase::Staging, now_secs())?;
        self.save(&state)?;
        self.run_loop(state)
    }

    /// Drop the current definition and carry on (`--skip`).
    ///
    /// Valid after a conflict (on the topic branch) and after a definition
    /// failed mid-run (on the staging or topic branch).
    ///
    /// # Errors
    /// No run, wrong phase, or wrong branch (state unchanged).
    #[instrument(skip_all)]
    pub fn skip(&mut self) -> Result<RunOutcome, SyncError> {
        let mut state = self.load_required()?;
        match state.phase {
            WorkflowPhase::AmPending => self.require_branch(self.topic())?,
            WorkflowPhase::Staging => {
                let actual = self.repo.current_branch()?;
                let on = |b: &str| actual.as_deref() == Some(b);
                if !on(self.staging()) && !on(self.topic()) {
                    return Err(SyncError::BranchState {
                        expected: self.staging().to_owned(),
                        actual,
                    });
                }
            }
            phase => {
                return Err(SyncError::InvalidPhase {
                    operation: "skip",
                    phase,
                });
            }
        }

        let dropped = self.drop_topic();
        self.guard(&mut state, dropped)?;
        if let Some(def) = state.current() {
            println!("{}: skipped", label(def));
        }
        state.next_definition(now_secs());
        if state.phase == WorkflowPhase::AmPending {
            state.advance(WorkflowPhase::Staging, now_secs())?;
        }
        self.save(&state)?;
        self.run_loop(state)
    }

    /// Roll the run back and restore the original branch (`--abort`).
    ///
    /// # Errors
    /// No run in progress, or a git failure while restoring.
    #[instrument(skip_all)]
    pub fn abort(&mut self) -> Result<RunOutcome, SyncError> {
        match self.store.load()? {
            Some(mut state) => self.rollback(&mut state)?,
            None if self.store.exists() => {
                // Lock directory without a state file: nothing was touched yet.
                warn!(dir = %self.store.dir().display(), "state directory has no state file");
                self.repo.abort_apply()?;
                self.store.clear()?;
            }
            None => return Err(SyncError::NoRunInProgress),
        }
        println!("Aborted; original branch restored.");
        Ok(RunOutcome::Aborted)
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    fn run_loop(&mut self, mut state: WorkflowState) -> Result<RunOutcome, SyncError> {
        loop {
            if self.interrupted() {
                return self.interrupt_abort(&mut state);
            }
            if state.is_exhausted() {
                let finished = self.finish(&mut state);
                return self.guard(&mut state, finished);
            }
            let step = self.process_next(&mut state);
            match self.guard(&mut state, step)? {
                Step::Advanced => {}
                Step::Paused(_) if self.interrupted() => {
                    return self.interrupt_abort(&mut state);
                }
                Step::Paused(outcome) => return Ok(outcome),
            }
        }
    }

    fn interrupt_abort(&self, state: &mut WorkflowState) -> Result<RunOutcome, SyncError> {
        warn!("interrupted; rolling back");
        self.rollback(state)?;
        Err(SyncError::Interrupted)
    }

    /// Turn a failure that coincides with an interrupt into a rollback.
    ///
    /// A signal reaches the git child as well, so the step usually fails
    /// before the loop sees the flag.
    fn guard<T>(
        &self,
        state: &mut WorkflowState,
        result: Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        match result {
            Err(e) if self.interrupted() => {
                warn!(error = %e, "step failed after interrupt");
                self.rollback(state)?;
                Err(SyncError::Interrupted)
            }
            other => other,
        }
    }

    /// Process the definition at `state.current_index`.
    #[instrument(skip_all, fields(index = state.current_index))]
    fn process_next(&mut self, state: &mut WorkflowState) -> Result<Step, SyncError> {
        let idx = state.current_index;
        let Some(def) = state.definitions.get_mut(idx) else {
            return Ok(Step::Advanced);
        };
        let source_rev = self.resolver.resolve(self.repo, def)?;
        let def = def.clone();
        let name = label(&def);

        let since = match &state.since {
            Some(since) => Some(since.clone()),
            None => self.marker_since(&def)?,
        };

        let patch = build_patch(
            self.repo,
            &source_rev,
            &def.remote_path,
            &def.local_path,
            since.as_deref(),
            state.squashing,
        )?;
        let (bytes, commits, squashed) = match patch {
            Patch::Empty => {
                println!("{name}: no changes");
                state.next_definition(now_secs());
                self.save(state)?;
                return Ok(Step::Advanced);
            }
            Patch::Mailbox {
                bytes,
                commits,
                squashed,
            } => (bytes, commits, squashed),
        };

        let mailbox = self.store.write_patch(&bytes)?;
        state.patch_commits = commits;
        self.save(state)?;
        info!(definition = %name, commits, squashed, "applying patch");

        self.repo.checkout_new_branch(self.topic(), self.staging())?;
        match self.repo.apply_mailbox(&mailbox, self.config.patch.three_way)? {
            ApplyOutcome::Applied => {
                self.merge_topic(state)?;
                self.save(state)?;
                Ok(Step::Advanced)
            }
            ApplyOutcome::Conflict { detail, .. } => {
                state.advance(WorkflowPhase::AmPending, now_secs())?;
                self.save(state)?;
                Ok(Step::Paused(RunOutcome::Paused {
                    definition: name,
                    detail,
                }))
            }
        }
    }

    /// Sha recorded by the newest marker for `def` on HEAD.
    fn marker_since(&self, def: &RemoteDefinition) -> Result<Option<String>, SyncError> {
        let subjects = self
            .repo
            .subjects("HEAD", self.config.patch.marker_search_depth)?;
        Ok(marker::find_last(&subjects, def).map(|sha| {
            info!(%sha, "found previous sync marker");
            sha.to_string()
        }))
    }

    /// Merge the topic branch into staging with the marker message and move
    /// to the next definition. The caller persists.
    ///
    /// A topic with no commits of its own (the user ran `git am --skip` or
    /// `--abort`) is dropped without a marker, so a later run retries it.
    fn merge_topic(&self, state: &mut WorkflowState) -> Result<(), SyncError> {
        if let Some(def) = state.current() {
            let range = format!("{}..{}", self.staging(), self.topic());
            if self.repo.count_commits(&range, None, CommitFilter::NoMerges)? == 0 {
                warn!(definition = %label(def), "topic branch has no new commits");
                self.drop_topic()?;
                println!("{}: nothing was applied; skipped", label(def));
            } else {
                let sha = def
                    .resolved_path_head
                    .clone()
                    .or_else(|| def.resolved_ref_head.clone())
                    .unwrap_or_else(|| state.initial_head.clone());
                self.repo.checkout(self.staging())?;
                self.repo
                    .merge_no_ff(self.topic(), &marker::message(def, &sha, state.patch_commits))?;
                self.repo.delete_branch(self.topic(), true)?;
                println!("{}: applied {} commit(s)", label(def), state.patch_commits);
            }
        }
        state.next_definition(now_secs());
        Ok(())
    }

    /// Leave the topic branch (and any stopped `git am`) behind and delete it.
    fn drop_topic(&self) -> Result<(), SyncError> {
        self.repo.abort_apply()?;
        if self.repo.is_dirty()? {
            self.repo.reset_hard()?;
        }
        self.repo.checkout(self.staging())?;
        self.repo.delete_branch(self.topic(), true)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Finish and rollback
    // -----------------------------------------------------------------------

    fn finish(&self, state: &mut WorkflowState) -> Result<RunOutcome, SyncError> {
        let range = format!("{}..{}", state.initial_head, self.staging());
        let patches = self.repo.count_commits(&range, None, CommitFilter::NoMerges)?;

        if patches == 0 {
            println!("nothing to apply");
            self.restore(state)?;
            return Ok(RunOutcome::NothingToApply);
        }

        if state.dry_run {
            println!("{patches} patch(es) would be applied:");
            print!("{}", self.repo.log_oneline(&range)?);
            print!(
                "{}",
                self.repo
                    .diff_stat(state.initial_head.as_str(), self.staging())?
            );
            self.restore(state)?;
            return Ok(RunOutcome::DryRun { patches });
        }

        self.repo.checkout(&state.original_branch)?;
        self.repo
            .merge_no_ff(self.staging(), &marker::summary(patches))?;
        self.repo.delete_branch(self.staging(), true)?;
        state.advance(WorkflowPhase::Done, now_secs())?;
        self.store.clear()?;
        println!("{patches} patch(es) merged into {}", state.original_branch);
        Ok(RunOutcome::Merged { patches })
    }

    /// Back to the original branch without merging.
    fn restore(&self, state: &mut WorkflowState) -> Result<(), SyncError> {
        self.repo.checkout(&state.original_branch)?;
        self.repo.delete_branch(self.staging(), true)?;
        state.advance(WorkflowPhase::Done, now_secs())?;
        self.store.clear()?;
        Ok(())
    }

    fn rollback(&self, state: &mut WorkflowState) -> Result<(), SyncError> {
        self.repo.abort_apply()?;
        if self.repo.is_dirty()? {
            self.repo.reset_hard()?;
        }
        if self.repo.current_branch()?.as_deref() != Some(state.original_branch.as_str()) {
            self.repo.checkout(&state.original_branch)?;
        }
        self.repo.delete_branch(self.topic(), true)?;
        self.repo.delete_branch(self.staging(), true)?;
        if !state.phase.is_terminal() {
            state.advance(WorkflowPhase::Aborted, now_secs())?;
        }
        self.store.clear()?;
        info!(branch = %state.original_branch, "run aborted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;
    use crate::mock_repo::{MockRepo, oid};

    const STAGING: &str = "subsync/staging";
    const TOPIC: &str = "subsync/topic";

    fn with_branches(repo: &MockRepo, current: &str, names: &[&str]) {
        *repo.branch.borrow_mut() = Some(current.to_owned());
        *repo.branches.borrow_mut() = names.iter().map(|n| (*n).to_owned()).collect();
    }

    /// One-definition state in `phase`, persisted in the repo's store.
    fn save_state(wf: &Workflow<'_>, phase: WorkflowPhase) -> WorkflowState {
        let def = RemoteDefinition::new("foolib", "master", "lib/foo", "/");
        let mut state = WorkflowState::new(vec![def], "main".to_owned(), oid(0xaaaa), 1);
        if phase != WorkflowPhase::Initial {
            state.advance(WorkflowPhase::Staging, 1).unwrap();
        }
        if phase == WorkflowPhase::AmPending {
            state.advance(WorkflowPhase::AmPending, 1).unwrap();
        }
        wf.store().save(&state).unwrap();
        state
    }

    fn interrupting(repo: &mut MockRepo, method: &'static str) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        repo.fail_on = Some(method);
        repo.interrupt = Some(Arc::clone(&flag));
        flag
    }

    // -- start ---------------------------------------------------------------

    #[test]
    fn interrupt_during_final_merge_rolls_back() {
        let mut repo = MockRepo::new();
        repo.counts.insert(format!("{}..{STAGING}", oid(0xaaaa)), 2);
        let flag = interrupting(&mut repo, "merge_no_ff");
        let mut wf = Workflow::new(&repo, SubsyncConfig::default()).with_interrupt(flag);

        let err = wf.start(Vec::new(), &RunOptions::default()).unwrap_err();

        assert!(matches!(err, SyncError::Interrupted), "{err}");
        assert!(!wf.store().exists());
        assert_eq!(repo.branch.borrow().as_deref(), Some("main"));
        assert!(!repo.has_branch(STAGING));
    }

    #[test]
    fn final_merge_failure_without_interrupt_keeps_run() {
        let mut repo = MockRepo::new();
        repo.counts.insert(format!("{}..{STAGING}", oid(0xaaaa)), 2);
        repo.fail_on = Some("merge_no_ff");
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());

        let err = wf.start(Vec::new(), &RunOptions::default()).unwrap_err();

        assert!(matches!(err, SyncError::Git(_)), "{err}");
        assert!(wf.store().exists());
        assert!(repo.has_branch(STAGING));
    }

    #[test]
    fn existing_branch_refused_before_anything_runs() {
        let repo = MockRepo::new();
        with_branches(&repo, "main", &["main", TOPIC]);
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());
        let defs = vec![RemoteDefinition::new("foolib", "master", "lib/foo", "/")];

        let err = wf.start(defs, &RunOptions::default()).unwrap_err();

        match err {
            SyncError::BranchExists { branch } => assert_eq!(branch, TOPIC),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!wf.store().exists());
        assert_eq!(repo.count("ls_remote"), 0);
        assert_eq!(repo.count("checkout_new_branch"), 0);
    }

    // -- resume --------------------------------------------------------------

    #[test]
    fn interrupt_while_merging_resolved_topic() {
        let mut repo = MockRepo::new();
        with_branches(&repo, TOPIC, &["main", STAGING, TOPIC]);
        repo.counts.insert(format!("{STAGING}..{TOPIC}"), 1);
        let flag = interrupting(&mut repo, "merge_no_ff");
        let mut wf = Workflow::new(&repo, SubsyncConfig::default()).with_interrupt(flag);
        save_state(&wf, WorkflowPhase::AmPending);

        let err = wf.resume().unwrap_err();

        assert!(matches!(err, SyncError::Interrupted), "{err}");
        assert!(!wf.store().exists());
        assert_eq!(repo.branch.borrow().as_deref(), Some("main"));
        assert!(!repo.has_branch(STAGING));
        assert!(!repo.has_branch(TOPIC));
    }

    #[test]
    fn empty_topic_is_dropped_without_marker() {
        let repo = MockRepo::new();
        with_branches(&repo, TOPIC, &["main", STAGING, TOPIC]);
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());
        save_state(&wf, WorkflowPhase::AmPending);

        let outcome = wf.resume().unwrap();

        assert_eq!(outcome, RunOutcome::NothingToApply);
        assert_eq!(repo.count("merge_no_ff"), 0);
        assert!(!repo.has_branch(TOPIC));
        assert!(!wf.store().exists());
    }

    #[test]
    fn continue_refused_in_staging_phase() {
        let repo = MockRepo::new();
        with_branches(&repo, STAGING, &["main", STAGING]);
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());
        let before = save_state(&wf, WorkflowPhase::Staging);

        let err = wf.resume().unwrap_err();

        assert!(matches!(
            err,
            SyncError::InvalidPhase {
                operation: "continue",
                phase: WorkflowPhase::Staging
            }
        ));
        assert_eq!(wf.store().load().unwrap(), Some(before));
    }

    // -- skip ----------------------------------------------------------------

    #[test]
    fn skip_after_failed_definition_in_staging() {
        let repo = MockRepo::new();
        with_branches(&repo, STAGING, &["main", STAGING]);
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());
        save_state(&wf, WorkflowPhase::Staging);

        let outcome = wf.skip().unwrap();

        assert_eq!(outcome, RunOutcome::NothingToApply);
        assert_eq!(repo.count("apply_mailbox"), 0);
        assert_eq!(repo.branch.borrow().as_deref(), Some("main"));
        assert!(!repo.has_branch(STAGING));
        assert!(!wf.store().exists());
    }

    #[test]
    fn skip_in_staging_refused_from_original_branch() {
        let repo = MockRepo::new();
        with_branches(&repo, "main", &["main", STAGING]);
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());
        let before = save_state(&wf, WorkflowPhase::Staging);

        let err = wf.skip().unwrap_err();

        assert!(matches!(err, SyncError::BranchState { .. }), "{err}");
        assert_eq!(wf.store().load().unwrap(), Some(before));
        assert!(repo.has_branch(STAGING));
    }

    #[test]
    fn skip_refused_before_staging_exists() {
        let repo = MockRepo::new();
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());
        save_state(&wf, WorkflowPhase::Initial);

        let err = wf.skip().unwrap_err();

        assert!(matches!(
            err,
            SyncError::InvalidPhase {
                operation: "skip",
                phase: WorkflowPhase::Initial
            }
        ));
        assert!(wf.store().exists());
    }

    // -- abort ---------------------------------------------------------------

    #[test]
    fn abort_from_initial_phase() {
        let repo = MockRepo::new();
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());
        save_state(&wf, WorkflowPhase::Initial);

        assert_eq!(wf.abort().unwrap(), RunOutcome::Aborted);

        assert!(!wf.store().exists());
        assert_eq!(repo.branch.borrow().as_deref(), Some("main"));
        assert_eq!(repo.count("checkout:"), 0);
        assert_eq!(repo.count(&format!("delete_branch:{STAGING}")), 1);
    }

    #[test]
    fn abort_from_paused_run_returns_to_original_branch() {
        let repo = MockRepo::new();
        with_branches(&repo, TOPIC, &["main", STAGING, TOPIC]);
        let mut wf = Workflow::new(&repo, SubsyncConfig::default());
        save_state(&wf, WorkflowPhase::AmPending);

        assert_eq!(wf.abort().unwrap(), RunOutcome::Aborted);

        assert_eq!(repo.count("abort_apply"), 1);
        assert_eq!(repo.branch.borrow().as_deref(), Some("main"));
        assert_eq!(*repo.branches.borrow(), vec!["main".to_owned()]);
        assert!(!wf.store().exists());
    }
}

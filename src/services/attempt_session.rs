use std::collections::HashSet;
use std::slice;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::errors::{AppError, AppResult};
use crate::gateways::RemoteAttemptGateway;
use crate::models::domain::answer::{AnswerEdit, AnswerRecord, AnswerState};
use crate::models::domain::attempt::{Attempt, AttemptMode, AttemptStatus, SessionStatus};
use crate::models::domain::progress::ProgressSnapshot;
use crate::models::domain::question::AttemptQuestion;
use crate::models::dto::request::{AnswerSubmission, BatchSubmission};
use crate::models::dto::response::{
    AnswerSubmissionResult, AttemptReview, AttemptStats, CompletionSummary,
};
use crate::services::answer_store::AnswerStore;
use crate::services::progress_tracker::ProgressTracker;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub auto_save_interval: Duration,
    /// Ask the server to grade each ONE_BY_ONE submission immediately.
    pub grade_on_submit: bool,
    pub refresh_stats_after_submit: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_save_interval: Duration::from_secs(30),
            grade_on_submit: false,
            refresh_stats_after_submit: true,
        }
    }
}

/// Result of completing an attempt. `unanswered` lists questions the server
/// will score as incorrect.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub summary: CompletionSummary,
    pub unanswered: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub result: AnswerSubmissionResult,
    /// Present when this submission answered the last question.
    pub completion: Option<CompletionOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(usize),
    NothingToSave,
}

struct SessionInner {
    status: SessionStatus,
    attempt: Option<Attempt>,
    questions: Vec<AttemptQuestion>,
    current_question: Option<AttemptQuestion>,
    store: AnswerStore,
    progress: ProgressTracker,
    last_save_error: Option<AppError>,
}

impl SessionInner {
    fn require(&self, expected: SessionStatus, action: &str) -> AppResult<()> {
        if self.status != expected {
            return Err(AppError::InvalidState(format!(
                "Cannot {} while the attempt is {}",
                action, self.status
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidState(format!(
                "Cannot move from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    fn attempt_id(&self) -> AppResult<String> {
        self.attempt
            .as_ref()
            .map(|a| a.attempt_id.clone())
            .ok_or_else(|| AppError::InvalidState("Attempt has not been started".to_string()))
    }

    fn mode(&self) -> AppResult<AttemptMode> {
        self.attempt
            .as_ref()
            .map(|a| a.mode)
            .ok_or_else(|| AppError::InvalidState("Attempt has not been started".to_string()))
    }

    /// Registers questions with the store. A question the client cannot
    /// decode stays listed; answering or submitting it fails with the decode
    /// error and completion reports it as unanswered.
    fn hydrate(&mut self, questions: &[AttemptQuestion]) {
        for question in questions {
            if let Err(e) = self.store.register(question) {
                log::error!("Question {} cannot be answered: {}", question.id, e);
            }
            match self.questions.iter_mut().find(|q| q.id == question.id) {
                Some(existing) => *existing = question.clone(),
                None => self.questions.push(question.clone()),
            }
        }
    }

    /// The server's terminal state always wins over the local one.
    fn force_terminal(&mut self, status: AttemptStatus) {
        log::warn!("Attempt forced to {} by the server", status);
        self.status = SessionStatus::from(status);
        self.current_question = None;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.status = status;
        }
    }

    fn apply_server_status(&mut self, status: AttemptStatus) -> AppResult<()> {
        if status.is_terminal() {
            self.force_terminal(status);
            return Ok(());
        }
        self.transition(SessionStatus::from(status))?;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.status = status;
        }
        Ok(())
    }

    fn record_local_progress(&mut self) {
        let answered = u32::try_from(self.store.answered_count()).unwrap_or(u32::MAX);
        self.progress.record_local(answered);
    }
}

/// Drives one attempt from start to completion.
///
/// Mutating gateway calls are serialized through `ops`, so at most one write
/// is in flight per attempt. Session data sits behind its own lock that is
/// never held across a gateway call; the UI keeps reading and editing while a
/// save is running.
pub struct AttemptSession {
    gateway: Arc<dyn RemoteAttemptGateway>,
    config: SessionConfig,
    ops: Mutex<()>,
    inner: RwLock<SessionInner>,
}

impl AttemptSession {
    pub fn new(
        gateway: Arc<dyn RemoteAttemptGateway>,
        store: AnswerStore,
        config: SessionConfig,
    ) -> Self {
        Self {
            gateway,
            config,
            ops: Mutex::new(()),
            inner: RwLock::new(SessionInner {
                status: SessionStatus::NotStarted,
                attempt: None,
                questions: Vec::new(),
                current_question: None,
                store,
                progress: ProgressTracker::new(),
                last_save_error: None,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates the attempt on the server. Nothing changes locally until the
    /// server confirms it.
    pub async fn start(&self, quiz_id: &str, mode: AttemptMode) -> AppResult<Attempt> {
        let _guard = self.ops.lock().await;
        self.inner
            .read()
            .await
            .require(SessionStatus::NotStarted, "start")?;

        log::info!("Starting {} attempt for quiz {}", mode, quiz_id);
        let started = self
            .gateway
            .start_attempt(quiz_id, mode)
            .await
            .map_err(|e| {
                log::warn!("Failed to start attempt for quiz {}: {}", quiz_id, e);
                e
            })?;

        let attempt = Attempt::from(&started);
        let mut inner = self.inner.write().await;
        inner.transition(SessionStatus::InProgress)?;
        inner.attempt = Some(attempt.clone());
        inner.progress.reset();
        inner.progress.set_total_questions(started.total_questions);
        inner.progress.set_current_question_number(1);

        if let Some(first) = &started.first_question {
            inner.hydrate(slice::from_ref(first));
            if !started.mode.is_batched() {
                inner.current_question = Some(first.clone());
            }
        }
        inner.hydrate(&started.questions);

        log::info!(
            "Attempt {} started with {} questions",
            attempt.attempt_id,
            attempt.total_questions
        );
        Ok(attempt)
    }

    /// Flushes unsaved answers, then pauses on the server.
    pub async fn pause(&self) -> AppResult<()> {
        let _guard = self.ops.lock().await;
        let (attempt_id, has_unsynced) = {
            let inner = self.inner.read().await;
            inner.require(SessionStatus::InProgress, "pause")?;
            let mode = inner.mode()?;
            if !mode.supports_pause() {
                return Err(AppError::InvalidState(format!(
                    "{} attempts cannot be paused",
                    mode
                )));
            }
            (inner.attempt_id()?, inner.store.has_unsynced())
        };

        if has_unsynced {
            log::info!("Saving answers before pausing attempt {}", attempt_id);
            self.flush_locked().await?;
        }

        let update = self
            .guard_conflict(self.gateway.pause_attempt(&attempt_id).await)
            .await?;
        self.inner.write().await.apply_server_status(update.status)?;

        log::info!("Paused attempt {}", attempt_id);
        Ok(())
    }

    /// Resumes on the server and reloads where the attempt left off.
    ///
    /// An attempt the server already finished moves the session straight to
    /// that terminal state instead of failing.
    pub async fn resume(&self) -> AppResult<SessionStatus> {
        let _guard = self.ops.lock().await;
        let (attempt_id, mode) = {
            let inner = self.inner.read().await;
            inner.require(SessionStatus::Paused, "resume")?;
            (inner.attempt_id()?, inner.mode()?)
        };

        let update = match self.gateway.resume_attempt(&attempt_id).await {
            Ok(update) => update,
            Err(err) => match err.conflicting_terminal_status() {
                Some(status) => {
                    self.inner.write().await.force_terminal(status);
                    return Ok(SessionStatus::from(status));
                }
                None => return Err(err),
            },
        };

        {
            let mut inner = self.inner.write().await;
            inner.apply_server_status(update.status)?;
            if inner.status.is_terminal() {
                return Ok(inner.status);
            }
        }

        self.rehydrate(&attempt_id, mode).await?;
        log::info!("Resumed attempt {}", attempt_id);
        Ok(self.inner.read().await.status)
    }

    async fn rehydrate(&self, attempt_id: &str, mode: AttemptMode) -> AppResult<()> {
        if mode.is_batched() {
            let questions = self.gateway.get_attempt_questions(attempt_id).await?;
            self.inner.write().await.hydrate(&questions);
            let stats = self.gateway.get_attempt_stats(attempt_id).await?;
            self.apply_stats(stats).await;
            return Ok(());
        }

        let current = self
            .guard_conflict(self.gateway.get_current_question(attempt_id).await)
            .await?;
        let mut inner = self.inner.write().await;
        inner.progress.set_total_questions(current.total_questions);
        inner
            .progress
            .set_current_question_number(current.question_number);
        if current.attempt_status.is_terminal() {
            inner.force_terminal(current.attempt_status);
            return Ok(());
        }
        if let Some(question) = &current.question {
            inner.hydrate(slice::from_ref(question));
        }
        inner.current_question = current.question;
        Ok(())
    }

    /// Submits the current ONE_BY_ONE question. The last submission completes
    /// the attempt.
    pub async fn submit_current(&self) -> AppResult<SubmitOutcome> {
        let _guard = self.ops.lock().await;
        let (attempt_id, submission) = {
            let inner = self.inner.read().await;
            inner.require(SessionStatus::InProgress, "submit")?;
            if inner.mode()?.is_batched() {
                return Err(AppError::InvalidState(
                    "Batched attempts are submitted together".to_string(),
                ));
            }
            let question = inner.current_question.as_ref().ok_or_else(|| {
                AppError::InvalidState("No question is awaiting an answer".to_string())
            })?;
            inner.store.ensure_supported(&question.id)?;
            if !inner.store.is_answered(&question.id) {
                return Err(AppError::Validation(format!(
                    "Question {} has not been answered",
                    question.id
                )));
            }
            let response = inner.store.encode(&question.id)?;
            (
                inner.attempt_id()?,
                AnswerSubmission {
                    question_id: question.id.clone(),
                    response,
                },
            )
        };

        let result = self
            .guard_conflict(
                self.gateway
                    .submit_answer(&attempt_id, &submission, self.config.grade_on_submit)
                    .await,
            )
            .await?;
        log::info!(
            "Submitted answer for question {} in attempt {}",
            submission.question_id,
            attempt_id
        );

        {
            let mut inner = self.inner.write().await;
            inner
                .store
                .mark_synced(&submission.question_id, submission.response.clone())?;
            inner.record_local_progress();
            match &result.next_question {
                Some(next) => {
                    inner.hydrate(slice::from_ref(next));
                    inner.current_question = Some(next.clone());
                    inner.progress.advance_question();
                }
                None => inner.current_question = None,
            }
        }

        if self.config.refresh_stats_after_submit {
            self.refresh_after_write(&attempt_id).await;
        }

        let still_open = self.inner.read().await.status == SessionStatus::InProgress;
        let completion = if result.next_question.is_none() && still_open {
            Some(self.complete_locked().await?)
        } else {
            None
        };

        Ok(SubmitOutcome { result, completion })
    }

    /// Sends every unsaved answer of a batched attempt. Does not complete it.
    pub async fn submit_batch(&self) -> AppResult<usize> {
        let _guard = self.ops.lock().await;
        {
            let inner = self.inner.read().await;
            inner.require(SessionStatus::InProgress, "submit answers")?;
            if !inner.mode()?.is_batched() {
                return Err(AppError::InvalidState(
                    "One-by-one attempts are submitted per question".to_string(),
                ));
            }
            if !inner.store.has_unsynced() {
                return Err(AppError::Validation(
                    "There are no unsaved answers to submit".to_string(),
                ));
            }
        }
        self.flush_locked().await
    }

    /// Waits for any in-flight operation, then saves.
    pub async fn save_now(&self) -> AppResult<SaveOutcome> {
        let _guard = self.ops.lock().await;
        self.save_locked().await
    }

    /// Auto-save entry point. Returns `None` when the tick is skipped.
    pub async fn try_auto_save(&self) -> Option<AppResult<SaveOutcome>> {
        let _guard = self.ops.try_lock().ok()?;
        if !self.auto_save_eligible().await {
            return None;
        }
        Some(self.save_locked().await)
    }

    /// True while a mutating gateway call holds the operation lock.
    pub fn is_busy(&self) -> bool {
        self.ops.try_lock().is_err()
    }

    pub async fn auto_save_due(&self) -> bool {
        !self.is_busy() && self.auto_save_eligible().await
    }

    async fn auto_save_eligible(&self) -> bool {
        let inner = self.inner.read().await;
        inner.status == SessionStatus::InProgress
            && inner.mode().is_ok_and(|m| m.is_batched())
            && inner.store.has_unsynced()
    }

    async fn save_locked(&self) -> AppResult<SaveOutcome> {
        {
            let inner = self.inner.read().await;
            if !inner.store.has_unsynced() {
                return Ok(SaveOutcome::NothingToSave);
            }
            inner.require(SessionStatus::InProgress, "save answers")?;
        }
        Ok(SaveOutcome::Saved(self.flush_locked().await?))
    }

    /// Sends the dirty diff as one batch. Callers hold `ops`.
    ///
    /// Answers edited while the request is in flight stay dirty. On failure no
    /// flag is cleared, so the next save retries the same diff.
    async fn flush_locked(&self) -> AppResult<usize> {
        let (attempt_id, encoded) = {
            let inner = self.inner.read().await;
            (inner.attempt_id()?, inner.store.encode_dirty())
        };
        let answers = match encoded {
            Ok(answers) => answers,
            Err(err) => {
                log::warn!("Answers for attempt {} cannot be encoded: {}", attempt_id, err);
                self.inner.write().await.last_save_error = Some(err.clone());
                return Err(err);
            }
        };
        if answers.is_empty() {
            return Ok(0);
        }

        let batch = BatchSubmission { answers };
        let results = match self.gateway.submit_batch_answers(&attempt_id, &batch).await {
            Ok(results) => results,
            Err(err) => {
                log::warn!(
                    "Saving {} answers for attempt {} failed: {}",
                    batch.len(),
                    attempt_id,
                    err
                );
                let mut inner = self.inner.write().await;
                inner.last_save_error = Some(err.clone());
                if let Some(status) = err.conflicting_terminal_status() {
                    inner.force_terminal(status);
                }
                return Err(err);
            }
        };

        let accepted: HashSet<&str> = results.iter().map(|r| r.question_id.as_str()).collect();
        let synced = {
            let mut inner = self.inner.write().await;
            let now = Utc::now();
            let mut synced = 0;
            for answer in batch
                .answers
                .iter()
                .filter(|a| accepted.contains(a.question_id.as_str()))
            {
                inner
                    .store
                    .mark_synced_at(&answer.question_id, answer.response.clone(), now)?;
                synced += 1;
            }
            inner.last_save_error = None;
            inner.record_local_progress();
            synced
        };

        log::info!(
            "Saved {} of {} answers for attempt {}",
            synced,
            batch.len(),
            attempt_id
        );
        if self.config.refresh_stats_after_submit {
            self.refresh_after_write(&attempt_id).await;
        }
        Ok(synced)
    }

    /// Completes the attempt. Partial completion is allowed; unanswered
    /// questions are reported back rather than blocking.
    pub async fn complete(&self) -> AppResult<CompletionOutcome> {
        let _guard = self.ops.lock().await;
        self.complete_locked().await
    }

    async fn complete_locked(&self) -> AppResult<CompletionOutcome> {
        let (attempt_id, needs_flush) = {
            let inner = self.inner.read().await;
            inner.require(SessionStatus::InProgress, "complete")?;
            let mode = inner.mode()?;
            if !mode.is_batched() && inner.current_question.is_some() {
                return Err(AppError::InvalidState(
                    "The current question has not been submitted yet".to_string(),
                ));
            }
            (
                inner.attempt_id()?,
                mode.is_batched() && inner.store.has_unsynced(),
            )
        };

        if needs_flush {
            self.flush_locked().await?;
        }

        let (unanswered, unsupported) = {
            let inner = self.inner.read().await;
            (inner.store.unanswered(), inner.store.unsupported())
        };
        if !unsupported.is_empty() {
            log::warn!(
                "Attempt {} has questions this client cannot answer: {:?}",
                attempt_id,
                unsupported
            );
        }
        if !unanswered.is_empty() {
            log::warn!(
                "Completing attempt {} with {} unanswered questions",
                attempt_id,
                unanswered.len()
            );
        }

        let summary = self
            .guard_conflict(self.gateway.complete_attempt(&attempt_id).await)
            .await?;

        {
            let mut inner = self.inner.write().await;
            inner.transition(SessionStatus::Completed)?;
            inner.current_question = None;
            if let Some(attempt) = inner.attempt.as_mut() {
                attempt.status = AttemptStatus::Completed;
                attempt.completed_at = summary.completed_at.or_else(|| Some(Utc::now()));
            }
        }

        log::info!("Completed attempt {}", attempt_id);
        Ok(CompletionOutcome {
            summary,
            unanswered,
        })
    }

    /// Deletes the attempt on the server. Irreversible.
    pub async fn abandon(&self) -> AppResult<()> {
        let _guard = self.ops.lock().await;
        let attempt_id = {
            let inner = self.inner.read().await;
            if inner.status == SessionStatus::NotStarted || inner.status.is_terminal() {
                return Err(AppError::InvalidState(format!(
                    "Cannot abandon an attempt that is {}",
                    inner.status
                )));
            }
            inner.attempt_id()?
        };

        self.guard_conflict(self.gateway.delete_attempt(&attempt_id).await)
            .await?;
        self.inner
            .write()
            .await
            .force_terminal(AttemptStatus::Abandoned);

        log::info!("Abandoned attempt {}", attempt_id);
        Ok(())
    }

    pub async fn review(&self) -> AppResult<AttemptReview> {
        let attempt_id = {
            let inner = self.inner.read().await;
            inner.require(SessionStatus::Completed, "review")?;
            inner.attempt_id()?
        };
        self.gateway.get_attempt_review(&attempt_id).await
    }

    /// Waits for in-flight writes so a stale figure cannot land after them.
    pub async fn refresh_stats(&self) -> AppResult<ProgressSnapshot> {
        let _guard = self.ops.lock().await;
        let attempt_id = self.inner.read().await.attempt_id()?;
        let stats = self
            .guard_conflict(self.gateway.get_attempt_stats(&attempt_id).await)
            .await?;
        Ok(self.apply_stats(stats).await)
    }

    async fn refresh_after_write(&self, attempt_id: &str) {
        match self.gateway.get_attempt_stats(attempt_id).await {
            Ok(stats) => {
                self.apply_stats(stats).await;
            }
            Err(e) => log::warn!("Keeping local progress for attempt {}: {}", attempt_id, e),
        }
    }

    async fn apply_stats(&self, stats: AttemptStats) -> ProgressSnapshot {
        let mut inner = self.inner.write().await;
        if let Some(status) = stats.status.filter(|s| s.is_terminal()) {
            inner.force_terminal(status);
        }
        inner.progress.apply_server_stats(stats);
        inner.progress.snapshot()
    }

    async fn guard_conflict<T>(&self, result: AppResult<T>) -> AppResult<T> {
        if let Err(err) = &result {
            if let Some(status) = err.conflicting_terminal_status() {
                self.inner.write().await.force_terminal(status);
            }
        }
        result
    }

    pub async fn set_answer(&self, question_id: &str, answer: AnswerState) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.require(SessionStatus::InProgress, "edit answers")?;
        inner.store.set(question_id, answer)
    }

    pub async fn edit_answer(&self, question_id: &str, edit: AnswerEdit) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.require(SessionStatus::InProgress, "edit answers")?;
        inner.store.apply(question_id, edit)
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.read().await.status
    }

    pub async fn attempt(&self) -> Option<Attempt> {
        self.inner.read().await.attempt.clone()
    }

    pub async fn current_question(&self) -> Option<AttemptQuestion> {
        self.inner.read().await.current_question.clone()
    }

    pub async fn questions(&self) -> Vec<AttemptQuestion> {
        self.inner.read().await.questions.clone()
    }

    pub async fn answer(&self, question_id: &str) -> Option<AnswerState> {
        self.inner.read().await.store.response(question_id).cloned()
    }

    pub async fn answer_record(&self, question_id: &str) -> Option<AnswerRecord> {
        self.inner.read().await.store.record(question_id).cloned()
    }

    /// Untouched UI state for a question, for rendering.
    pub async fn blank_answer(&self, question_id: &str) -> AppResult<AnswerState> {
        self.inner.read().await.store.blank(question_id)
    }

    pub async fn is_answered(&self, question_id: &str) -> bool {
        self.inner.read().await.store.is_answered(question_id)
    }

    pub async fn progress(&self) -> ProgressSnapshot {
        self.inner.read().await.progress.snapshot()
    }

    pub async fn has_unsynced_answers(&self) -> bool {
        self.inner.read().await.store.has_unsynced()
    }

    pub async fn last_save_error(&self) -> Option<AppError> {
        self.inner.read().await.last_save_error.clone()
    }

    /// Questions whose type this client cannot encode.
    pub async fn unsupported_questions(&self) -> Vec<String> {
        self.inner.read().await.store.unsupported()
    }

    pub async fn unanswered_questions(&self) -> Vec<String> {
        self.inner.read().await.store.unanswered()
    }

    /// Informational countdown for TIMED attempts; the server enforces it.
    pub async fn remaining_time(&self) -> Option<chrono::Duration> {
        self.inner
            .read()
            .await
            .attempt
            .as_ref()
            .and_then(|a| a.remaining_time(Utc::now()))
    }
}

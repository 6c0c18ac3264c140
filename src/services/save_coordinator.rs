use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::errors::{AppError, AppResult};
use crate::services::attempt_session::{AttemptSession, SaveOutcome};

/// Periodic and manual saving for batched attempts.
///
/// The timer only decides whether a save is due. Each save runs as its own
/// task, so stopping the timer (or dropping the coordinator) never cancels a
/// request that is already on the wire.
pub struct SaveCoordinator {
    session: Arc<AttemptSession>,
    timer: Option<JoinHandle<()>>,
}

impl SaveCoordinator {
    pub fn spawn(session: Arc<AttemptSession>, interval: Duration) -> Self {
        let ticking = Arc::clone(&session);
        let timer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !ticking.auto_save_due().await {
                    log::debug!("Auto-save skipped");
                    continue;
                }

                let saving = Arc::clone(&ticking);
                tokio::spawn(async move {
                    match saving.try_auto_save().await {
                        Some(Ok(SaveOutcome::Saved(n))) => log::info!("Auto-saved {} answers", n),
                        Some(Ok(SaveOutcome::NothingToSave)) | None => {}
                        Some(Err(e)) => log::warn!("Auto-save failed: {}", e),
                    }
                });
            }
        });

        log::info!("Auto-save every {:?}", interval);
        Self {
            session,
            timer: Some(timer),
        }
    }

    /// Uses the interval from the session's own config.
    pub fn spawn_default(session: Arc<AttemptSession>) -> Self {
        let interval = session.config().auto_save_interval;
        Self::spawn(session, interval)
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancels the timer only.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            log::info!("Auto-save stopped");
        }
    }

    /// Saves right away, after any in-flight save finishes.
    pub async fn save_now(&self) -> AppResult<SaveOutcome> {
        self.session.save_now().await
    }

    pub async fn last_save_error(&self) -> Option<AppError> {
        self.session.last_save_error().await
    }
}

impl Drop for SaveCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::gateways::attempt_gateway::MockRemoteAttemptGateway;
    use crate::models::domain::answer::AnswerState;
    use crate::models::domain::attempt::AttemptMode;
    use crate::services::answer_store::AnswerStore;
    use crate::services::attempt_session::SessionConfig;
    use crate::test_utils::fixtures;

    async fn started_session(batches: Arc<AtomicUsize>, fail: bool) -> Arc<AttemptSession> {
        let mut gateway = MockRemoteAttemptGateway::new();
        let started = fixtures::started(
            AttemptMode::AllAtOnce,
            vec![fixtures::open("q1"), fixtures::true_false("q2")],
        );
        gateway
            .expect_start_attempt()
            .returning(move |_, _| Ok(started.clone()));
        gateway.expect_submit_batch_answers().returning(move |_, batch| {
            batches.fetch_add(1, Ordering::SeqCst);
            if fail {
                return Err(AppError::Network("offline".into()));
            }
            Ok(batch
                .answers
                .iter()
                .map(|a| fixtures::submission_result(&a.question_id, None))
                .collect())
        });

        let session = Arc::new(AttemptSession::new(
            Arc::new(gateway),
            AnswerStore::new(),
            SessionConfig {
                refresh_stats_after_submit: false,
                ..SessionConfig::default()
            },
        ));
        session.start("quiz-1", AttemptMode::AllAtOnce).await.unwrap();
        session
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn auto_save_flushes_dirty_answers_on_tick() {
        let batches = Arc::new(AtomicUsize::new(0));
        let session = started_session(Arc::clone(&batches), false).await;
        let coordinator = SaveCoordinator::spawn(Arc::clone(&session), Duration::from_secs(30));

        session
            .set_answer("q1", AnswerState::Open("lifetimes".into()))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;

        assert_eq!(batches.load(Ordering::SeqCst), 1);
        assert!(!session.has_unsynced_answers().await);
        assert!(coordinator.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_without_dirty_answers_send_nothing() {
        let batches = Arc::new(AtomicUsize::new(0));
        let session = started_session(Arc::clone(&batches), false).await;
        let _coordinator = SaveCoordinator::spawn(Arc::clone(&session), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(95)).await;
        settle().await;

        assert_eq!(batches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_auto_save_is_retried_on_next_tick() {
        let batches = Arc::new(AtomicUsize::new(0));
        let session = started_session(Arc::clone(&batches), true).await;
        let coordinator = SaveCoordinator::spawn(Arc::clone(&session), Duration::from_secs(30));

        session
            .set_answer("q2", AnswerState::TrueFalse(Some(true)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(batches.load(Ordering::SeqCst), 1);
        assert!(session.has_unsynced_answers().await);
        assert!(matches!(
            coordinator.last_save_error().await,
            Some(AppError::Network(_))
        ));

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_coordinator_no_longer_saves_but_save_now_works() {
        let batches = Arc::new(AtomicUsize::new(0));
        let session = started_session(Arc::clone(&batches), false).await;
        let mut coordinator =
            SaveCoordinator::spawn(Arc::clone(&session), Duration::from_secs(30));

        coordinator.stop();
        assert!(!coordinator.is_running());

        session
            .set_answer("q1", AnswerState::Open("traits".into()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(90)).await;
        settle().await;
        assert_eq!(batches.load(Ordering::SeqCst), 0);

        assert_eq!(coordinator.save_now().await.unwrap(), SaveOutcome::Saved(1));
        assert_eq!(batches.load(Ordering::SeqCst), 1);
    }
}

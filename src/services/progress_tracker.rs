use crate::models::domain::progress::ProgressSnapshot;
use crate::models::dto::response::AttemptStats;

/// Reconciles locally counted progress with server-reported stats.
///
/// Server stats win whenever present. A local count only stands in between a
/// submit and the next stats response. Estimated totals are computed on read
/// and never stored.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    known_total: Option<u32>,
    server: Option<AttemptStats>,
    optimistic_answered: Option<u32>,
    current_question_number: u32,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authoritative total, from the start response.
    pub fn set_total_questions(&mut self, total: u32) {
        self.known_total = Some(total);
    }

    pub fn set_current_question_number(&mut self, number: u32) {
        self.current_question_number = number;
    }

    pub fn advance_question(&mut self) {
        self.current_question_number = self.current_question_number.max(1) + 1;
    }

    /// Placeholder count shown until the next stats response lands.
    pub fn record_local(&mut self, answered: u32) {
        self.optimistic_answered = Some(answered);
    }

    pub fn has_pending_local(&self) -> bool {
        self.optimistic_answered.is_some()
    }

    pub fn apply_server_stats(&mut self, stats: AttemptStats) {
        if let Some(number) = stats.current_question_number {
            self.current_question_number = number;
        }
        self.optimistic_answered = None;
        self.server = Some(stats);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `round(answered / (percentage / 100))`, when the inputs allow it.
    pub fn estimate_total(questions_answered: u32, completion_percentage: f64) -> Option<u32> {
        if questions_answered == 0 || !(completion_percentage > 0.0) {
            return None;
        }
        let estimate = (f64::from(questions_answered) / (completion_percentage / 100.0)).round();
        (estimate.is_finite() && estimate >= 1.0).then(|| estimate as u32)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let server_answered = self.server.as_ref().map(|s| s.questions_answered);
        let questions_answered = self
            .optimistic_answered
            .or(server_answered)
            .unwrap_or(0);

        let server_total = self.server.as_ref().and_then(|s| s.total_questions);
        let (total_questions, total_is_estimate) = match server_total.or(self.known_total) {
            Some(total) => (total, false),
            None => match self.server.as_ref().and_then(|s| {
                Self::estimate_total(s.questions_answered, s.completion_percentage)
            }) {
                Some(estimate) => (estimate, true),
                None => (0, false),
            },
        };

        let completion_percentage = match (&self.server, self.optimistic_answered) {
            (Some(stats), None) => stats.completion_percentage,
            _ if total_questions > 0 => {
                f64::from(questions_answered) / f64::from(total_questions) * 100.0
            }
            _ => 0.0,
        };

        ProgressSnapshot {
            questions_answered,
            total_questions,
            completion_percentage: completion_percentage.clamp(0.0, 100.0),
            current_question_number: self.current_question_number.max(1),
            total_is_estimate,
        }
    }
}

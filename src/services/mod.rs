pub mod answer_store;
pub mod attempt_session;
pub mod progress_tracker;
pub mod question_codec;
pub mod save_coordinator;

pub use answer_store::AnswerStore;
pub use attempt_session::{
    AttemptSession, CompletionOutcome, SaveOutcome, SessionConfig, SubmitOutcome,
};
pub use progress_tracker::ProgressTracker;
pub use question_codec::{codec_for, DecodedQuestion, QuestionCodec};
pub use save_coordinator::SaveCoordinator;

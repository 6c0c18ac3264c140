pub mod answer;
pub mod attempt;
pub mod progress;
pub mod question;
pub use answer::{AnswerEdit, AnswerRecord, AnswerState};
pub use attempt::{Attempt, AttemptMode, AttemptStatus, SessionStatus};
pub use progress::ProgressSnapshot;
pub use question::{AttemptQuestion, QuestionType};

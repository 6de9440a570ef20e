pub mod question;
pub mod submission;

pub use question::{DictationSentence, Question, QuestionOptions, QuestionType};
pub use submission::{Answer, PersonalInfo, Submission};

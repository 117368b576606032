pub mod mentorship;
pub mod module;
pub mod opportunity;
pub mod quiz;
pub mod user;

pub use mentorship::{MentorshipRequest, MentorshipStatus};
pub use module::{Difficulty, Module};
pub use opportunity::{Match, Opportunity, OpportunityStatus, ResponseDecision};
pub use quiz::{GradeResult, PublicQuiz, Question, Quiz, SubmittedAnswers};
pub use user::{User, UserRole};

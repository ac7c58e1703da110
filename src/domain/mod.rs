pub mod candidate;
pub mod item;

pub use candidate::{Candidate, CandidateItem, CandidateScore, PriorityReason};
pub use item::{Attempt, AttemptContext, ContextEntry, ItemState, ItemType, KnowledgeLevel};

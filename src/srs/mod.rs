pub mod attempt;
pub mod forgetting;
pub mod ranker;
pub mod scheduler;
pub mod session_selector;
pub mod sm2;

pub use attempt::process_attempt;
pub use forgetting::ForgettingCurve;
pub use ranker::rank;
pub use scheduler::reschedule;
pub use session_selector::{items_due_for_review, select_session, shuffle_for_variety};

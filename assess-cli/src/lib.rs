pub mod session;

pub use session::{Outcome, OutcomeValue, SessionError, SessionLoader, SessionOp, SessionRecord};

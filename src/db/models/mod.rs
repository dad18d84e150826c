pub mod interruption;
pub mod session;

pub use interruption::Interruption;
pub use session::{HistoryEntry, NewSession, Session, SessionStatus, SessionView};

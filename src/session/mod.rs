mod manager;

pub use manager::{Session, SessionError, SessionManager, SessionStatus};

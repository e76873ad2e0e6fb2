pub mod config;
pub mod error;
pub mod history;
pub mod session;
pub mod snapshot;

pub use config::{DEFAULT_ERROR_MESSAGE, SeedMessage, SessionConfig};
pub use error::{Result, SessionError};
pub use session::{ChatSession, Direction, TurnOutcome};
pub use snapshot::{SessionSnapshot, SessionStatus};

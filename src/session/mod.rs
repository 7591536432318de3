//! Per-user wizard state, the request throttle and the transition logic.

pub mod rate_limit;
pub mod state;
pub mod wizard;

pub use rate_limit::{RateLimitExceeded, RateLimiter};
pub use state::{SessionState, Stage};
pub use wizard::{Action, Wizard, WizardError};

//! MinApp Navigation Policy
//!
//! Decides what happens to every navigation a mini-app surface attempts:
//! 1. Malformed target → block
//! 2. MFA challenge on a trusted auth host → allow, unless it is looping
//! 3. Error page on a trusted auth host → block
//! 4. Anything else on a trusted auth host → allow
//! 5. Same origin → allow
//! 6. Cross origin → popups load in place, everything else is cancelled and reloaded

mod config;
mod error;
mod loop_guard;
mod policy;

pub use config::PolicyConfig;
pub use error::NavigationError;
pub use loop_guard::{LoopState, LoopUpdate};
pub use policy::{BlockReason, Decision, NavigationAction, NavigationPolicy, NavigationTrigger};

pub type Result<T> = std::result::Result<T, NavigationError>;

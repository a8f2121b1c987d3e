pub mod email;
pub mod hasher;
pub mod rate_limit;
pub mod reset_flow;
pub mod secret;

pub use email::{CodeNotifier, EmailService};
pub use rate_limit::ResendPolicy;
pub use reset_flow::{ResetFlowService, ResetPolicy, VerifiedSession};

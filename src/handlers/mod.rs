pub mod health;
pub mod password_reset;

pub use health::health_check;
pub use password_reset::{request_password_reset, reset_password, verify_reset_code};

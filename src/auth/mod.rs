//! Authentication
//!
//! - `session`: session registry with sliding expiry
//! - `password`: argon2 password hashing
//! - `middleware`: session check for protected routes

mod middleware;
mod password;
mod session;

pub use middleware::{require_session, session_token};
pub use password::{hash_password, verify_password};
pub use session::*;

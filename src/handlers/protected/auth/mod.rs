// handlers/protected/auth/mod.rs - Session endpoints for authenticated callers

pub mod session;

pub use session::{logout_post, whoami_get};

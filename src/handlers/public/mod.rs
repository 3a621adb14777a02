// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: trace + CORS only

pub mod auth;
pub mod profiles;
pub mod system;

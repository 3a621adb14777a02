// handlers/protected/mod.rs - Protected handlers (bearer authentication required)
//
// Security Level: verified bearer token
// Middleware: require_auth injects AuthUser and BearerToken

pub mod auth; // Session endpoints for the caller
pub mod entries; // Journal, moon and relationship-check CRUD
pub mod keys; // Pre-key bundle registration and claims
pub mod profiles; // Caller's own profile

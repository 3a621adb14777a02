// handlers/public/auth/mod.rs - Identity provider passthrough
//
// Payloads from the provider are returned unchanged; only failures are
// translated into the API error envelope.

pub mod login; // POST /login - password sign-in
pub mod refresh; // POST /refresh - trade a refresh token for a new session
pub mod register; // POST /register - sign-up, optionally creating a profile

pub use login::login_post;
pub use refresh::refresh_post;
pub use register::register_post;

pub mod auth;
pub mod entries;
pub mod keys;
pub mod profiles;
pub mod session;

// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer token verified per request)
pub mod public; // Tier 1: provider passthrough, profile listing, service info
pub mod protected; // Tier 2: entries, own profile, pre-key bundles, session

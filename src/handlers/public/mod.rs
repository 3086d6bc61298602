// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition endpoints. Every input is untrusted here.

pub mod auth;

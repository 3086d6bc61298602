// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (bearer token, resolved Identity in extensions)

pub mod protected; // /api/auth/me, /api/assets/*
pub mod public; // /api/auth/register, /api/auth/login

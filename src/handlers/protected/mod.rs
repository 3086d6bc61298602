// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Routes here sit behind jwt_auth_middleware, which rejects the request with
// 401 before the handler runs unless the token resolves to an Identity.
// Handlers read that Identity with `Extension<Identity>`.

pub mod assets; // Asset catalogue and file endpoints
pub mod auth; // Session introspection

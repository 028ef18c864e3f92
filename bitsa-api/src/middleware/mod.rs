/// Middleware for the API server
///
/// Authentication runs as an axum `from_fn` layer in `app`; this module
/// holds the tower layers.

pub mod security;

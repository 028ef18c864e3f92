//! # BITSA API Server Library
//!
//! HTTP API of the BITSA student association backend: accounts, blog posts,
//! events with RSVP, and the photo gallery.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Authentication and validated-JSON extractors
//! - `middleware`: Security headers
//! - `routes`: API route handlers
//! - `seed`: Demo accounts and events for local development

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod seed;

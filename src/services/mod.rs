// src/services/mod.rs
pub mod dispatcher;
pub mod gemini;
pub mod relay_client;
pub mod retry;

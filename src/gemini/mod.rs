//! Gemini Vision API 連携

pub mod auth;
mod client;

pub use client::{GeminiClient, GeminiError};

//! PDF Learning Assistant.
//!
//! Upload a PDF, have Gemini write a multiple-choice quiz about it, take the
//! quiz, and get a simplified explanation of the questions you missed.

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod media;
pub mod quiz;
pub mod session;
pub mod web;
pub mod wizard;

pub use config::Config;
pub use error::Error;

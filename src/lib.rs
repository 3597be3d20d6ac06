//! Transcription task lifecycle engine library.
//!
//! Exports the modules shared by the server binary: admission, dispatch,
//! execution, normalization, billing, and the storage/provider
//! abstractions they're built on.

pub mod admission;
pub mod billing;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod executor;
pub mod http;
pub mod normalizer;
pub mod providers;
pub mod storage;
pub mod subtitles;
pub mod sweeper;

pub use config::AppSettings;
pub use error::AppError;
pub use http::AppState;

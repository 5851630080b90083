//! External service clients for Ensemble.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`]: chat-completion abstraction used by agents
//! - [`registry`]: static specs for the supported LLM backends + matching
//! - [`http_provider::HttpProvider`]: OpenAI-compatible HTTP client
//! - [`openweathermap`]: One Call 3.0 + geocoding client and the weather provider
//! - [`transcription`]: Whisper model presets and the lazy-loading transcription client

pub mod http_provider;
pub mod openweathermap;
pub mod registry;
pub mod traits;
pub mod transcription;

pub use http_provider::{create_provider, HttpProvider};
pub use registry::{ProviderConfig, ProviderSpec, PROVIDERS};
pub use traits::{LlmProvider, LlmRequestConfig};
pub use transcription::{HttpWhisperBackend, ModelInfo, WhisperClient, WhisperResponse};

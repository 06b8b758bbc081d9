// Adapters layer: concrete implementations of the domain ports.

pub mod groq;
pub mod storage;

pub use groq::GroqAssistant;
pub use storage::LocalStorage;

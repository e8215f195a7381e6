pub mod groq;
pub mod registry;
pub mod retry;

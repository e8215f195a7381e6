/// Groq model ids this deployment accepts.
///
/// Requests naming any other model are rejected before a network call is made.
pub const SUPPORTED_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-guard-3-8b",
    "gemma2-9b-it",
    "mixtral-8x7b-32768",
];

pub fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

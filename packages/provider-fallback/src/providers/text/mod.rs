//! Text generation adapters.

pub mod gemini;
pub mod huggingface;
pub mod openai;

pub use gemini::GeminiGenerator;
pub use huggingface::HuggingFaceGenerator;
pub use openai::OpenAiCompatibleGenerator;

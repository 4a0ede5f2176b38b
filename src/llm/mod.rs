pub mod gemini;
pub mod provider;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use gemini::GeminiProvider;
pub use provider::{LlmProvider, TextStream};
#[cfg(any(test, feature = "testing"))]
pub use scripted::{ScriptedProvider, ScriptedReply};

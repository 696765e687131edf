//! Title translation and tag generation.

mod category;
mod error;
mod llm_translator;
mod parse;
mod traits;

pub use category::{resolve_category, CATEGORIES, DEFAULT_CATEGORY_ID};
pub use error::TranslateError;
pub use llm_translator::LlmTranslator;
pub use parse::{parse_translation, DEFAULT_TAG};
pub use traits::{Translation, Translator};

//! Contextual enrichment for titles before translation.
//!
//! A title is reduced to entity keywords (the work and any characters),
//! then the keywords are looked up in the Bangumi knowledge base and
//! rendered as a free-text background block for the translation prompt.
//! Every failure degrades to an empty context.

mod bangumi;
mod config;
mod context;
mod error;
mod title;
mod traits;
mod types;

pub use bangumi::{BangumiCharacter, BangumiClient, BangumiSubject};
pub use config::BangumiConfig;
pub use context::ContextEnricher;
pub use error::EnrichmentError;
pub use title::extract_work_name;
pub use traits::Enricher;
pub use types::{parse_entities, Entities};

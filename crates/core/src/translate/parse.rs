use super::category::{resolve_category, DEFAULT_CATEGORY_ID};
use super::error::TranslateError;
use super::traits::Translation;

/// Tag used when the model returns an empty tag line.
pub const DEFAULT_TAG: &str = "YouTube搬运";

const TITLE_PREFIX: &str = "翻译：";
const TAGS_PREFIX: &str = "标签：";
const CATEGORY_PREFIX: &str = "分区：";

/// Parse the `翻译：` / `标签：` / optional `分区：` answer format.
///
/// The first line carrying each prefix wins; other lines are ignored.
pub fn parse_translation(raw: &str) -> Result<Translation, TranslateError> {
    let mut title = None;
    let mut tags = None;
    let mut category = None;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix(TITLE_PREFIX) {
            title.get_or_insert_with(|| rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(TAGS_PREFIX) {
            tags.get_or_insert_with(|| rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(CATEGORY_PREFIX) {
            category.get_or_insert_with(|| resolve_category(rest));
        }
    }

    let (Some(title), Some(tags)) = (title, tags) else {
        return Err(TranslateError::Malformed {
            raw: raw.to_string(),
        });
    };
    if title.is_empty() {
        return Err(TranslateError::EmptyTitle);
    }

    Ok(Translation {
        title,
        tags: if tags.is_empty() {
            DEFAULT_TAG.to_string()
        } else {
            tags
        },
        category_id: category.unwrap_or(DEFAULT_CATEGORY_ID),
    })
}

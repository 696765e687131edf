use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Upload categories the publisher accepts, by display name.
pub const CATEGORIES: [(&str, u32); 5] = [
    ("单机游戏", 4),
    ("手机游戏", 172),
    ("网络游戏", 65),
    ("动画资讯", 51),
    ("音乐", 130),
];

pub const DEFAULT_CATEGORY_ID: u32 = 51;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Map a `分区：` value to a category id.
///
/// A value containing digits is read as an id and must be one of the known
/// ids; otherwise the value is looked up by name. Anything else gets the default.
pub fn resolve_category(value: &str) -> u32 {
    let value = value.trim();
    if let Some(m) = NUMBER_RE.find(value) {
        return m
            .as_str()
            .parse::<u32>()
            .ok()
            .filter(|id| CATEGORIES.iter().any(|(_, known)| known == id))
            .unwrap_or(DEFAULT_CATEGORY_ID);
    }
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, id)| *id)
        .unwrap_or(DEFAULT_CATEGORY_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_id() {
        assert_eq!(resolve_category("172"), 172);
        assert_eq!(resolve_category("音乐(130)"), 130);
        assert_eq!(resolve_category("999"), DEFAULT_CATEGORY_ID);
    }

    #[test]
    fn test_resolve_by_name() {
        assert_eq!(resolve_category(" 单机游戏 "), 4);
        assert_eq!(resolve_category("网络游戏"), 65);
        assert_eq!(resolve_category("科技"), DEFAULT_CATEGORY_ID);
    }
}

use serde::{Deserialize, Serialize};

/// Entity keywords found in a title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    pub work: Option<String>,
    pub characters: Vec<String>,
}

impl Entities {
    pub fn work(name: impl Into<String>) -> Self {
        Self {
            work: Some(name.into()),
            characters: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_none() && self.characters.is_empty()
    }
}

/// Parse the `作品：`/`角色：` answer format. `无可提取实体` clears everything.
pub fn parse_entities(raw: &str) -> Entities {
    let mut entities = Entities::default();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(work) = line.strip_prefix("作品：") {
            let work = work.trim();
            entities.work = (!work.is_empty()).then(|| work.to_string());
        } else if let Some(names) = line.strip_prefix("角色：") {
            entities.characters = names
                .split([',', '，', '、'])
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
        } else if line.contains("无可提取实体") {
            return Entities::default();
        }
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_lines() {
        let parsed = parse_entities("作品：最終防衛学園\n角色：澄野拓海, 霧藤希");
        assert_eq!(parsed.work.as_deref(), Some("最終防衛学園"));
        assert_eq!(parsed.characters, vec!["澄野拓海", "霧藤希"]);
    }

    #[test]
    fn test_parse_characters_only() {
        let parsed = parse_entities("角色：初音ミク");
        assert!(parsed.work.is_none());
        assert_eq!(parsed.characters, vec!["初音ミク"]);
    }

    #[test]
    fn test_parse_nothing_extractable() {
        let parsed = parse_entities("作品：X\n无可提取实体");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parse_ignores_chatter() {
        let parsed = parse_entities("好的，结果如下：\n作品： \n");
        assert!(parsed.is_empty());
    }
}

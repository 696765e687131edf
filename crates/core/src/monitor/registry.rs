//! Per-source last-seen state.

use std::collections::HashMap;

/// What a poll saw for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First time the source answered; the item becomes the baseline.
    First,
    /// Same newest item as last time.
    Unchanged,
    /// A different newest item. The state has already been advanced.
    New { previous: String },
}

/// The static source list plus the last item id seen on each source.
///
/// Owned by the monitor's polling loop; nothing else mutates it.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<String>,
    last_seen: HashMap<String, String>,
}

impl SourceRegistry {
    /// Build from configuration, dropping blanks and duplicates while
    /// keeping the configured order.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique = Vec::new();
        for source in sources {
            let source = source.into().trim().to_string();
            if !source.is_empty() && !unique.contains(&source) {
                unique.push(source);
            }
        }
        Self {
            sources: unique,
            last_seen: HashMap::new(),
        }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn last_seen(&self, source: &str) -> Option<&str> {
        self.last_seen.get(source).map(String::as_str)
    }

    /// Number of sources with a baseline.
    pub fn tracked(&self) -> usize {
        self.last_seen.len()
    }

    /// Record `item_id` as the newest item of `source`.
    pub fn observe(&mut self, source: &str, item_id: &str) -> Observation {
        match self.last_seen.get_mut(source) {
            None => {
                self.last_seen
                    .insert(source.to_string(), item_id.to_string());
                Observation::First
            }
            Some(last) if last == item_id => Observation::Unchanged,
            Some(last) => {
                let previous = std::mem::replace(last, item_id.to_string());
                Observation::New { previous }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_and_blank_sources() {
        let registry = SourceRegistry::new(vec!["a", " a ", "", "b", "a"]);
        assert_eq!(registry.sources(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_observation_sequence() {
        let mut registry = SourceRegistry::new(vec!["src"]);
        assert_eq!(registry.last_seen("src"), None);

        assert_eq!(registry.observe("src", "X"), Observation::First);
        assert_eq!(registry.observe("src", "X"), Observation::Unchanged);
        assert_eq!(
            registry.observe("src", "Y"),
            Observation::New {
                previous: "X".to_string()
            }
        );
        assert_eq!(registry.last_seen("src"), Some("Y"));
        assert_eq!(registry.observe("src", "Y"), Observation::Unchanged);
    }

    #[test]
    fn test_sources_are_independent() {
        let mut registry = SourceRegistry::new(vec!["a", "b"]);
        registry.observe("a", "1");
        assert_eq!(registry.tracked(), 1);
        assert_eq!(registry.observe("b", "1"), Observation::First);
        assert_eq!(registry.last_seen("a"), Some("1"));
        assert_eq!(registry.last_seen("b"), Some("1"));
    }
}

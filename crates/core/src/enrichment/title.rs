use once_cell::sync::Lazy;
use regex_lite::Regex;

static BRACKET_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"《(.+?)》", r"【(.+?)】", r"「(.+?)」"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static EPISODE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(.+?)第[\d一二三四五六七八九十]+[话話]",
        r"(?i)^(.+?)EP\s?\d+",
        r"(?i)^(.+?)Episode\s?\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TRAILING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d、。．.!\s-]+$").unwrap());

const SEPARATORS: [char; 4] = [':', '：', '-', '—'];

/// Best-effort guess at the work a title is about.
///
/// Tries bracketed names first, then the text before a separator, then
/// the text before an episode marker, and finally the whole title with
/// trailing numbering stripped. Returns an empty string when nothing is left.
pub fn extract_work_name(title: &str) -> String {
    for re in BRACKET_RES.iter() {
        if let Some(caps) = re.captures(title) {
            return caps[1].trim().to_string();
        }
    }

    for sep in SEPARATORS {
        if let Some((head, _)) = title.split_once(sep) {
            let head = head.trim();
            if !head.is_empty() {
                return head.to_string();
            }
        }
    }

    for re in EPISODE_RES.iter() {
        if let Some(caps) = re.captures(title) {
            return caps[1].trim().to_string();
        }
    }

    TRAILING_RE.replace(title.trim(), "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brackets_in_priority_order() {
        assert_eq!(extract_work_name("【PV】《葬送のフリーレン》第2期"), "葬送のフリーレン");
        assert_eq!(extract_work_name("TVアニメ【薬屋のひとりごと】PV"), "薬屋のひとりごと");
        assert_eq!(extract_work_name("「ぼっち・ざ・ろっく！」 ライブ"), "ぼっち・ざ・ろっく！");
    }

    #[test]
    fn test_separator() {
        assert_eq!(extract_work_name("Blue Archive: New Student"), "Blue Archive");
        assert_eq!(extract_work_name("原神 - 新角色PV"), "原神");
    }

    #[test]
    fn test_episode_markers() {
        assert_eq!(extract_work_name("ダンジョン飯 第3話 予告"), "ダンジョン飯");
        assert_eq!(extract_work_name("Frieren EP 12 preview"), "Frieren");
        assert_eq!(extract_work_name("Frieren episode3"), "Frieren");
    }

    #[test]
    fn test_trailing_numbering_stripped() {
        assert_eq!(extract_work_name("Oshi no Ko 2"), "Oshi no Ko");
        assert_eq!(extract_work_name("  123 "), "");
    }
}

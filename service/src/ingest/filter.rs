//! 测试传真识别与黑/白名单

use crate::config::FaxConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// 命中的测试关键字
    TestFax(String),
    /// 命中的黑名单条目
    Blacklisted(String),
    NotWhitelisted,
}

#[derive(Debug, Clone, Default)]
pub struct FaxFilter {
    test_keywords: Vec<String>,
    blacklist: Vec<String>,
    whitelist: Vec<String>,
}

fn prepare(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn first_hit(text: &str, entries: &[String]) -> Option<String> {
    entries.iter().find(|e| text.contains(e.as_str())).cloned()
}

impl FaxFilter {
    pub fn from_config(config: &FaxConfig) -> Self {
        Self {
            test_keywords: prepare(&config.test_fax_keywords),
            blacklist: prepare(&config.fax_blacklist),
            whitelist: prepare(&config.fax_whitelist),
        }
    }

    /// 按 测试传真 -> 黑名单 -> 白名单 的顺序检查，比较忽略大小写
    pub fn check(&self, lines: &[String]) -> Verdict {
        let text = lines.join("\n").to_lowercase();

        if let Some(keyword) = first_hit(&text, &self.test_keywords) {
            return Verdict::TestFax(keyword);
        }
        if let Some(entry) = first_hit(&text, &self.blacklist) {
            return Verdict::Blacklisted(entry);
        }
        if !self.whitelist.is_empty() && first_hit(&text, &self.whitelist).is_none() {
            return Verdict::NotWhitelisted;
        }
        Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn filter(test: &[&str], black: &[&str], white: &[&str]) -> FaxFilter {
        FaxFilter::from_config(&FaxConfig {
            test_fax_keywords: lines(test),
            fax_blacklist: lines(black),
            fax_whitelist: lines(white),
            ..FaxConfig::default()
        })
    }

    #[test]
    fn test_empty_filter_accepts() {
        assert_eq!(filter(&[], &[], &[]).check(&lines(&["EINSATZ"])), Verdict::Accept);
    }

    #[test]
    fn test_test_fax_wins() {
        let f = filter(&["Probealarm"], &["probe"], &[]);
        assert_eq!(
            f.check(&lines(&["Dies ist ein PROBEALARM"])),
            Verdict::TestFax("probealarm".to_string())
        );
    }

    #[test]
    fn test_black_and_white_lists() {
        let f = filter(&[], &["Werbung"], &["ILS Musterstadt", ""]);
        assert_eq!(
            f.check(&lines(&["Absender: ILS Musterstadt", "Werbung"])),
            Verdict::Blacklisted("werbung".to_string())
        );
        assert_eq!(f.check(&lines(&["Absender: unbekannt"])), Verdict::NotWhitelisted);
        assert_eq!(
            f.check(&lines(&["absender: ils musterstadt"])),
            Verdict::Accept
        );
    }
}

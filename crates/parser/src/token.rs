//! 行内分词
//!
//! 在一行中查找所有已知关键字（忽略大小写），按出现位置排序后，
//! 每个关键字的值取自其后到下一个关键字开始之前的文本。
//! 一行中没有任何关键字时，整行作为一个标识为空的透传 token。

use std::collections::HashSet;

/// 一行中识别出的 (关键字, 值)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaToken {
    /// 配置中的关键字原文，透传 token 为空
    pub identifier: String,
    pub value: String,
    /// 来源行
    pub line: String,
    /// 关键字在行内的字节偏移
    pub offset: usize,
}

impl AreaToken {
    pub fn passthrough(line: &str) -> Self {
        Self {
            identifier: String::new(),
            value: line.to_string(),
            line: line.to_string(),
            offset: 0,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.identifier.is_empty()
    }
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// 忽略大小写查找，返回命中部分在 `haystack` 中的字节区间
///
/// 区间以 `haystack` 为准，大小写变换导致字节长度不同时依然正确。
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }

    for (start, _) in haystack.char_indices() {
        let mut rest = haystack[start..].char_indices();
        let mut end = start;
        let mut matched = true;

        for expected in needle.chars() {
            match rest.next() {
                Some((index, actual)) if chars_eq(actual, expected) => {
                    end = start + index + actual.len_utf8();
                }
                _ => {
                    matched = false;
                    break;
                }
            }
        }

        if matched {
            return Some((start, end));
        }
    }
    None
}

/// 清理提取出的值：去掉开头的冒号与两侧空白
pub fn clean_value(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(':')
        .map(str::trim)
        .unwrap_or(trimmed)
        .to_string()
}

struct Hit<'k> {
    keyword: &'k str,
    start: usize,
    end: usize,
}

/// 对一行分词
///
/// 同一位置命中多个关键字时保留最长的；落在前一个关键字内部的命中被丢弃，
/// 因此相邻 token 的值互不包含。
pub fn tokenize_line(line: &str, keywords: &[String]) -> Vec<AreaToken> {
    let mut seen = HashSet::new();
    let mut hits: Vec<Hit<'_>> = keywords
        .iter()
        .map(String::as_str)
        .filter(|k| !k.is_empty() && seen.insert(*k))
        .filter_map(|keyword| {
            find_ignore_case(line, keyword).map(|(start, end)| Hit {
                keyword,
                start,
                end,
            })
        })
        .collect();

    if hits.is_empty() {
        return vec![AreaToken::passthrough(line)];
    }

    hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<Hit<'_>> = Vec::with_capacity(hits.len());
    for hit in hits {
        if kept.last().map_or(false, |prev| hit.start < prev.end) {
            continue;
        }
        kept.push(hit);
    }

    kept.iter()
        .enumerate()
        .map(|(index, hit)| {
            let value_end = kept.get(index + 1).map_or(line.len(), |next| next.start);
            AreaToken {
                identifier: hit.keyword.to_string(),
                value: clean_value(&line[hit.end..value_end]),
                line: line.to_string(),
                offset: hit.start,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_ignore_case() {
        assert_eq!(find_ignore_case("Ort: X", "ort"), Some((0, 3)));
        assert_eq!(find_ignore_case("STRASSE", "strasse"), Some((0, 7)));
        assert_eq!(find_ignore_case("ab STRAẞE", "straße"), Some((3, 11)));
        assert_eq!(find_ignore_case("abc", ""), None);
        assert_eq!(find_ignore_case("ab", "abc"), None);
    }

    #[test]
    fn test_single_keyword() {
        let tokens = tokenize_line("Straße: Hauptstr. 5", &keywords(&["Straße"]));
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].identifier, "Straße");
        assert_eq!(tokens[0].value, "Hauptstr. 5");
        assert_eq!(tokens[0].offset, 0);
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let tokens = tokenize_line("  ort :   Springfield ", &keywords(&["Ort"]));
        assert_eq!(tokens[0].identifier, "Ort");
        assert_eq!(tokens[0].value, "Springfield");
    }

    #[test]
    fn test_no_keyword_passthrough() {
        let line = "Bitte Zufahrt freihalten: Tor 2";
        let tokens = tokenize_line(line, &keywords(&["Straße", "Ort"]));
        assert_eq!(tokens, vec![AreaToken::passthrough(line)]);
        assert!(tokens[0].is_passthrough());
        assert_eq!(tokens[0].value, line);
    }

    #[test]
    fn test_multiple_keywords_do_not_bleed() {
        let line = "Straße : Hauptstr.  Haus-Nr.: 5 Ort: Springfield";
        let tokens = tokenize_line(line, &keywords(&["Ort", "Haus-Nr.", "Straße"]));

        let pairs: Vec<(&str, &str)> = tokens
            .iter()
            .map(|t| (t.identifier.as_str(), t.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Straße", "Hauptstr."),
                ("Haus-Nr.", "5"),
                ("Ort", "Springfield")
            ]
        );
        for pair in tokens.windows(2) {
            assert!(!pair[0].value.contains(&pair[1].identifier));
        }
    }

    #[test]
    fn test_overlapping_keywords_keep_longest() {
        let tokens = tokenize_line(
            "Stichwort B: B 3 Brand",
            &keywords(&["Stichwort", "Stichwort B", "Stichwort"]),
        );
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].identifier, "Stichwort B");
        assert_eq!(tokens[0].value, "B 3 Brand");
    }

    #[test]
    fn test_keyword_at_end_of_line_has_empty_value() {
        let tokens = tokenize_line("Objekt:", &keywords(&["Objekt"]));
        assert_eq!(tokens[0].value, "");
    }

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value(" : a:b "), "a:b");
        assert_eq!(clean_value("x"), "x");
        assert_eq!(clean_value("::"), ":");
    }
}

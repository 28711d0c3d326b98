//! 文本规范化
//!
//! OCR 对同一份传真模板会反复出现相同的误识别（如 `Stra8e` -> `Straße`），
//! 这里用一张有序的替换表逐行修正。默认按字面量替换，
//! 打开 `interpretAsRegex` 后每一对都按正则表达式编译与替换。

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 替换表中的一项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplacePair {
    pub old: String,
    pub new: String,
}

/// 替换表（配置形式）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplaceDictionary {
    /// 按正则表达式解释每一项
    pub interpret_as_regex: bool,
    /// 按顺序应用
    pub pairs: Vec<ReplacePair>,
}

impl ReplaceDictionary {
    pub fn push(&mut self, old: &str, new: &str) {
        self.pairs.push(ReplacePair {
            old: old.to_string(),
            new: new.to_string(),
        });
    }

    /// 编译为可执行的规范化器
    ///
    /// 空的 `old` 会被跳过；正则模式下任一表达式非法即返回错误。
    pub fn compile(&self) -> Result<Normalizer> {
        let mut replacements = Vec::with_capacity(self.pairs.len());

        for (index, pair) in self.pairs.iter().enumerate() {
            if pair.old.is_empty() {
                log::debug!("[Normalizer] 跳过第 {} 项：空的匹配串", index);
                continue;
            }

            let replacement = if self.interpret_as_regex {
                let pattern = Regex::new(&pair.old)
                    .with_context(|| format!("替换表第 {} 项正则无效: {}", index, pair.old))?;
                Replacement::Pattern(pattern, pair.new.clone())
            } else {
                Replacement::Literal(pair.old.clone(), pair.new.clone())
            };
            replacements.push(replacement);
        }

        Ok(Normalizer { replacements })
    }
}

#[derive(Debug, Clone)]
enum Replacement {
    Literal(String, String),
    Pattern(Regex, String),
}

impl Replacement {
    fn apply(&self, line: &str) -> String {
        match self {
            Replacement::Literal(old, new) => line.replace(old.as_str(), new),
            Replacement::Pattern(pattern, new) => pattern.replace_all(line, new.as_str()).into_owned(),
        }
    }
}

/// 编译后的替换表
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    replacements: Vec<Replacement>,
}

impl Normalizer {
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// 规范化单行；纯空白行原样返回
    pub fn normalize_line(&self, line: &str) -> String {
        if line.trim().is_empty() {
            return line.to_string();
        }
        self.replacements
            .iter()
            .fold(line.to_string(), |text, replacement| replacement.apply(&text))
    }

    /// 逐行规范化，行数与顺序不变
    pub fn normalize(&self, lines: &[String]) -> Vec<String> {
        lines.iter().map(|line| self.normalize_line(line)).collect()
    }
}

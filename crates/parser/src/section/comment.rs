use alarm_core::Operation;

use super::{SectionOptions, SectionParser};
use crate::token::AreaToken;

/// 备注区段：无关键字的行逐行追加到 `comment`，保留换行
pub struct CommentSectionParser {
    separator: String,
}

impl Default for CommentSectionParser {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
        }
    }
}

impl SectionParser for CommentSectionParser {
    fn on_load(&mut self, options: &SectionOptions) {
        // 分隔符可能只含空白，不能按普通选项裁剪
        if let Some(separator) = options.get("Separator").filter(|s| !s.is_empty()) {
            self.separator = separator.replace("\\n", "\n");
        }
    }

    fn tokens(&self) -> Vec<String> {
        Vec::new()
    }

    fn on_enter_section(&mut self, operation: &mut Operation) {
        if !operation.comment.is_empty() {
            operation.comment.push_str(&self.separator);
        }
    }

    fn populate(&mut self, token: &AreaToken, operation: &mut Operation) {
        if !token.is_passthrough() {
            return;
        }
        operation.comment.push_str(&token.value);
        operation.comment.push_str(&self.separator);
    }

    fn on_leave_section(&mut self, operation: &mut Operation) {
        while !self.separator.is_empty() && operation.comment.ends_with(&self.separator) {
            let len = operation.comment.len() - self.separator.len();
            operation.comment.truncate(len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(parser: &mut CommentSectionParser, op: &mut Operation, lines: &[&str]) {
        parser.on_enter_section(op);
        for line in lines {
            parser.populate(&AreaToken::passthrough(line), op);
        }
        parser.on_leave_section(op);
    }

    #[test]
    fn test_lines_are_joined_with_newlines() {
        let mut parser = CommentSectionParser::default();
        let mut op = Operation::new();
        section(&mut parser, &mut op, &["Rauch aus Dach", "Zufahrt über Hof"]);
        assert_eq!(op.comment, "Rauch aus Dach\nZufahrt über Hof");

        section(&mut parser, &mut op, &["Nachtrag"]);
        assert_eq!(op.comment, "Rauch aus Dach\nZufahrt über Hof\nNachtrag");
    }

    #[test]
    fn test_custom_separator() {
        let mut parser = CommentSectionParser::default();
        let mut options = SectionOptions::new();
        options.insert("Separator".to_string(), " | ".to_string());
        parser.on_load(&options);

        let mut op = Operation::new();
        section(&mut parser, &mut op, &["a", "b"]);
        assert_eq!(op.comment, "a | b");
    }

    #[test]
    fn test_keyed_tokens_are_ignored() {
        let mut parser = CommentSectionParser::default();
        let mut op = Operation::new();
        let keyed = AreaToken {
            identifier: "Objekt".to_string(),
            value: "Schule".to_string(),
            line: "Objekt: Schule".to_string(),
            offset: 0,
        };
        parser.populate(&keyed, &mut op);
        assert_eq!(op.comment, "");
    }
}

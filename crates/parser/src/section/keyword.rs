use alarm_core::Operation;

use super::{option, SectionOptions, SectionParser};
use crate::token::AreaToken;

/// 关键字（Stichwort）区段：通用关键字与 B/R/S/T 分类关键字
pub struct KeywordSectionParser {
    keyword: String,
    b: String,
    r: String,
    s: String,
    t: String,
}

impl Default for KeywordSectionParser {
    fn default() -> Self {
        Self {
            keyword: "Schlagw".to_string(),
            b: "Stichwort B".to_string(),
            r: "Stichwort R".to_string(),
            s: "Stichwort S".to_string(),
            t: "Stichwort T".to_string(),
        }
    }
}

impl SectionParser for KeywordSectionParser {
    fn on_load(&mut self, options: &SectionOptions) {
        self.keyword = option(options, "KeywordKeyword", &self.keyword);
        self.b = option(options, "KeywordB", &self.b);
        self.r = option(options, "KeywordR", &self.r);
        self.s = option(options, "KeywordS", &self.s);
        self.t = option(options, "KeywordT", &self.t);
    }

    fn tokens(&self) -> Vec<String> {
        vec![
            self.keyword.clone(),
            self.b.clone(),
            self.r.clone(),
            self.s.clone(),
            self.t.clone(),
        ]
    }

    fn populate(&mut self, token: &AreaToken, operation: &mut Operation) {
        let keywords = &mut operation.keywords;
        let id = token.identifier.as_str();
        let target = if id == self.keyword {
            &mut keywords.keyword
        } else if id == self.b {
            &mut keywords.b
        } else if id == self.r {
            &mut keywords.r
        } else if id == self.s {
            &mut keywords.s
        } else if id == self.t {
            &mut keywords.t
        } else {
            return;
        };
        *target = token.value.clone();
    }
}

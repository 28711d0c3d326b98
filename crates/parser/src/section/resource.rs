use alarm_core::{Operation, OperationResource};

use super::{option, SectionOptions, SectionParser};
use crate::token::AreaToken;

/// 资源区段：每个区段（或区段内每个新名称）产生一条资源
///
/// 进入区段时分配新条目，离开时写入 Operation；无名称的条目会被集合丢弃。
pub struct ResourceSectionParser {
    name: String,
    timestamp: String,
    equipment: String,
    current: Option<OperationResource>,
}

impl Default for ResourceSectionParser {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            timestamp: "Alarmiert".to_string(),
            equipment: "gef. Gerät".to_string(),
            current: None,
        }
    }
}

impl ResourceSectionParser {
    fn flush(&mut self, operation: &mut Operation) {
        if let Some(resource) = self.current.take() {
            operation.resources.add(resource);
        }
    }
}

impl SectionParser for ResourceSectionParser {
    fn on_load(&mut self, options: &SectionOptions) {
        self.name = option(options, "KeywordName", &self.name);
        self.timestamp = option(options, "KeywordTimestamp", &self.timestamp);
        self.equipment = option(options, "KeywordEquipment", &self.equipment);
    }

    fn tokens(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.timestamp.clone(),
            self.equipment.clone(),
        ]
    }

    fn on_enter_section(&mut self, _operation: &mut Operation) {
        self.current = Some(OperationResource::default());
    }

    fn populate(&mut self, token: &AreaToken, operation: &mut Operation) {
        let id = token.identifier.as_str();

        if id == self.name {
            // 同一区段出现第二个名称：先提交上一条
            if self
                .current
                .as_ref()
                .map_or(false, |r| !r.full_name.is_empty())
            {
                self.flush(operation);
            }
            self.current
                .get_or_insert_with(OperationResource::default)
                .full_name = token.value.clone();
        } else if id == self.timestamp {
            if let Some(resource) = self.current.as_mut() {
                resource.timestamp = token.value.clone();
            }
        } else if id == self.equipment {
            if let Some(resource) = self.current.as_mut() {
                resource.requested_equipment.extend(
                    token
                        .value
                        .split(',')
                        .map(str::trim)
                        .filter(|e| !e.is_empty())
                        .map(str::to_string),
                );
            }
        }
    }

    fn on_leave_section(&mut self, operation: &mut Operation) {
        self.flush(operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize_line;

    fn section(parser: &mut ResourceSectionParser, op: &mut Operation, lines: &[&str]) {
        let tokens = parser.tokens();
        parser.on_enter_section(op);
        for line in lines {
            for token in tokenize_line(line, &tokens) {
                parser.populate(&token, op);
            }
        }
        parser.on_leave_section(op);
    }

    #[test]
    fn test_one_resource_per_section() {
        let mut parser = ResourceSectionParser::default();
        let mut op = Operation::new();
        section(&mut parser, &mut op, &["Name: FF Nord", "Alarmiert: 12:03", "gef. Gerät: LF 20, DLK"]);
        section(&mut parser, &mut op, &["Name: FF Süd", "gef. Gerät: RW"]);

        let names: Vec<_> = op.resources.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["FF Nord", "FF Süd"]);
        let first = op.resources.iter().next().unwrap();
        assert_eq!(first.timestamp, "12:03");
        assert_eq!(first.requested_equipment, vec!["LF 20", "DLK"]);
    }

    #[test]
    fn test_nameless_section_adds_nothing() {
        let mut parser = ResourceSectionParser::default();
        let mut op = Operation::new();
        section(&mut parser, &mut op, &["gef. Gerät: LF", "sonstiges"]);
        assert!(op.resources.is_empty());
    }

    #[test]
    fn test_repeated_name_merges() {
        let mut parser = ResourceSectionParser::default();
        let mut op = Operation::new();
        section(
            &mut parser,
            &mut op,
            &["Name: FF Nord", "gef. Gerät: LF", "Name: FF Nord", "gef. Gerät: TLF"],
        );
        assert_eq!(op.resources.len(), 1);
        assert_eq!(
            op.resources.iter().next().unwrap().requested_equipment,
            vec!["LF", "TLF"]
        );
    }
}

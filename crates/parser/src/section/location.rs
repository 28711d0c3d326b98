use alarm_core::{Operation, PropertyLocation};

use super::{option, SectionOptions, SectionParser};
use crate::token::{clean_value, find_ignore_case, AreaToken};

/// 写入事发地还是目的地
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AffectedLocation {
    Location,
    Destination,
}

/// 地点区段：街道、门牌号、邮编与城市、交叉路口、建筑物
pub struct PropertyLocationSectionParser {
    affected: AffectedLocation,
    street: String,
    street_number: String,
    city: String,
    intersection: String,
    property: String,
}

impl Default for PropertyLocationSectionParser {
    fn default() -> Self {
        Self {
            affected: AffectedLocation::Location,
            street: "Straße".to_string(),
            street_number: "Haus-Nr".to_string(),
            city: "Ort".to_string(),
            intersection: "Kreuzung".to_string(),
            property: "Objekt".to_string(),
        }
    }
}

impl PropertyLocationSectionParser {
    fn target<'o>(&self, operation: &'o mut Operation) -> &'o mut PropertyLocation {
        match self.affected {
            AffectedLocation::Location => &mut operation.location,
            AffectedLocation::Destination => &mut operation.destination,
        }
    }
}

impl SectionParser for PropertyLocationSectionParser {
    fn on_load(&mut self, options: &SectionOptions) {
        self.affected = match option(options, "AffectedLocation", "Einsatzort")
            .to_lowercase()
            .as_str()
        {
            "zielort" | "destination" => AffectedLocation::Destination,
            _ => AffectedLocation::Location,
        };
        self.street = option(options, "KeywordStreet", &self.street);
        self.street_number = option(options, "KeywordStreetNumber", &self.street_number);
        self.city = option(options, "KeywordCity", &self.city);
        self.intersection = option(options, "KeywordIntersection", &self.intersection);
        self.property = option(options, "KeywordProperty", &self.property);
    }

    fn tokens(&self) -> Vec<String> {
        vec![
            self.street.clone(),
            self.street_number.clone(),
            self.city.clone(),
            self.intersection.clone(),
            self.property.clone(),
        ]
    }

    fn populate(&mut self, token: &AreaToken, operation: &mut Operation) {
        let id = token.identifier.as_str();
        let value = token.value.as_str();

        if id == self.city {
            parse_city(value, self.target(operation));
        } else if id == self.street {
            parse_street(value, &self.street_number, self.target(operation));
        } else if id == self.street_number {
            self.target(operation).street_number = clean_number(value);
        } else if id == self.intersection {
            self.target(operation).intersection = value.to_string();
        } else if id == self.property {
            self.target(operation).property = value.to_string();
        }
    }
}

/// 拆分 "12345 Springfield - Ortsteil"：开头连续数字为邮编，
/// 余下部分去空白后从第一个 '-' 起截断
fn parse_city(value: &str, location: &mut PropertyLocation) {
    let zip: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    if zip.is_empty() {
        log::warn!("[Parser] 无法从 '{}' 中识别邮编", value);
    }

    let rest = value[zip.len()..].trim();
    let city = match rest.find('-') {
        Some(dash) => &rest[..dash],
        None => rest,
    };

    location.zip_code = zip;
    location.city = city.to_string();
}

/// 街道值中若还带有门牌号关键字，则在此拆开
///
/// OCR 读丢关键字时，门牌号通常仍跟在最后一个冒号之后。
fn parse_street(value: &str, street_number_keyword: &str, location: &mut PropertyLocation) {
    if let Some((start, end)) = find_ignore_case(value, street_number_keyword) {
        location.street = value[..start].trim().to_string();
        location.street_number = clean_number(&value[end..]);
    } else if let Some(colon) = value.rfind(':') {
        location.street = value[..colon].trim().to_string();
        location.street_number = value[colon + 1..].trim().to_string();
    } else {
        location.street = value.to_string();
    }
}

/// 门牌号关键字常写作 "Haus-Nr.:"，去掉残留的点
fn clean_number(raw: &str) -> String {
    clean_value(raw.trim_start().trim_start_matches('.'))
}

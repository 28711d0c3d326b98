//! 出动资源集合
//!
//! 保持插入顺序，按名称去重：同名资源合并装备清单而不是重复追加，
//! 名称为空的资源在插入时直接丢弃。

use serde::{Deserialize, Serialize};

/// 单个被请求的资源（车辆、分队等）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationResource {
    /// 资源全称
    pub full_name: String,
    /// 报警时间（原文保留）
    pub timestamp: String,
    /// 请求的装备
    pub requested_equipment: Vec<String>,
}

impl OperationResource {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Self::default()
        }
    }

    fn merge_from(&mut self, other: OperationResource) {
        if self.timestamp.is_empty() {
            self.timestamp = other.timestamp;
        }
        for equipment in other.requested_equipment {
            self.push_equipment(&equipment);
        }
    }

    fn push_equipment(&mut self, equipment: &str) {
        let equipment = equipment.trim();
        if equipment.is_empty() || self.requested_equipment.iter().any(|e| e == equipment) {
            return;
        }
        self.requested_equipment.push(equipment.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<OperationResource>", into = "Vec<OperationResource>")]
pub struct OperationResourceCollection {
    items: Vec<OperationResource>,
}

impl OperationResourceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加资源
    ///
    /// # 返回
    /// - `false`: 名称为空白，未添加
    /// - `true`: 新增或已合并到同名资源
    pub fn add(&mut self, mut resource: OperationResource) -> bool {
        let name = resource.full_name.trim();
        if name.is_empty() {
            log::debug!("[Resources] 忽略无名称的资源");
            return false;
        }
        resource.full_name = name.to_string();

        match self.find_mut(&resource.full_name) {
            Some(existing) => existing.merge_from(resource),
            None => {
                let equipment = std::mem::take(&mut resource.requested_equipment);
                let mut fresh = resource;
                for item in &equipment {
                    fresh.push_equipment(item);
                }
                self.items.push(fresh);
            }
        }
        true
    }

    /// 按名称取得资源，不存在则创建
    pub fn get_or_create(&mut self, full_name: &str) -> Option<&mut OperationResource> {
        let name = full_name.trim();
        if name.is_empty() {
            return None;
        }
        match self.items.iter().position(|r| r.full_name == name) {
            Some(index) => self.items.get_mut(index),
            None => {
                self.items.push(OperationResource::new(name));
                self.items.last_mut()
            }
        }
    }

    /// 为指定资源追加装备
    pub fn add_equipment(&mut self, full_name: &str, equipment: &str) -> bool {
        match self.get_or_create(full_name) {
            Some(resource) => {
                resource.push_equipment(equipment);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OperationResource> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 单行摘要，格式 `名称; 时间; 装备 | `
    pub fn to_single_line(&self) -> String {
        self.items
            .iter()
            .map(|r| {
                format!(
                    "{}; {}; {} | ",
                    r.full_name,
                    r.timestamp,
                    r.requested_equipment.join(", ")
                )
            })
            .collect()
    }

    fn find_mut(&mut self, full_name: &str) -> Option<&mut OperationResource> {
        self.items.iter_mut().find(|r| r.full_name == full_name)
    }
}

impl From<Vec<OperationResource>> for OperationResourceCollection {
    fn from(items: Vec<OperationResource>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.add(item);
        }
        collection
    }
}

impl From<OperationResourceCollection> for Vec<OperationResource> {
    fn from(collection: OperationResourceCollection) -> Self {
        collection.items
    }
}

impl<'a> IntoIterator for &'a OperationResourceCollection {
    type Item = &'a OperationResource;
    type IntoIter = std::slice::Iter<'a, OperationResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

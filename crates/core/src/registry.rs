//! 能力注册表（Capability Registry）
//!
//! 启动时由显式注册表构建：每个条目是 (接口, 别名, 工厂函数)。
//! 接口以 trait object 类型区分，例如 `dyn FaxParser`、`dyn Job`。
//! 构建完成后只读，查询无需加锁。
//!
//! 同一接口下重复的别名会被拒绝并记录警告，先注册者生效。
//! 工厂函数失败不在注册表内吞掉，由调用方决定跳过还是中止。

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{CoreError, Result};

type Factory<T> = Arc<dyn Fn() -> Result<Box<T>> + Send + Sync>;

struct Export<T: ?Sized> {
    alias: String,
    factory: Factory<T>,
}

struct ExportTable<T: ?Sized> {
    exports: Vec<Export<T>>,
}

/// 已注册条目的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInfo {
    pub interface: &'static str,
    pub alias: String,
}

#[derive(Default)]
pub struct ExportRegistry {
    tables: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    infos: Vec<ExportInfo>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个导出
    ///
    /// # 返回
    /// - `true`: 注册成功
    /// - `false`: 该接口下别名已存在，本次注册被忽略
    pub fn register<T, F>(&mut self, alias: &str, factory: F) -> bool
    where
        T: ?Sized + 'static,
        F: Fn() -> Result<Box<T>> + Send + Sync + 'static,
    {
        let table = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                Box::new(ExportTable::<T> {
                    exports: Vec::new(),
                }) as Box<dyn Any + Send + Sync>
            });

        let Some(table) = table.downcast_mut::<ExportTable<T>>() else {
            log::error!("[Registry] 接口表类型不一致: {}", type_name::<T>());
            return false;
        };

        if table.exports.iter().any(|e| e.alias == alias) {
            log::warn!(
                "[Registry] 接口 {} 下别名 '{}' 已注册，忽略重复注册",
                type_name::<T>(),
                alias
            );
            return false;
        }

        table.exports.push(Export {
            alias: alias.to_string(),
            factory: Arc::new(factory),
        });
        self.infos.push(ExportInfo {
            interface: type_name::<T>(),
            alias: alias.to_string(),
        });
        log::debug!("[Registry] 注册 {} => '{}'", type_name::<T>(), alias);
        true
    }

    /// 创建该接口下第一个注册的实现
    pub fn resolve<T: ?Sized + 'static>(&self) -> Result<Option<Box<T>>> {
        match self.table::<T>().and_then(|t| t.exports.first()) {
            Some(export) => instantiate(export).map(Some),
            None => Ok(None),
        }
    }

    /// 按别名创建实现（精确匹配）
    pub fn resolve_named<T: ?Sized + 'static>(&self, alias: &str) -> Result<Option<Box<T>>> {
        match self
            .table::<T>()
            .and_then(|t| t.exports.iter().find(|e| e.alias == alias))
        {
            Some(export) => instantiate(export).map(Some),
            None => Ok(None),
        }
    }

    /// 按别名创建实现，不存在时返回 `ExportNotFound`
    pub fn require<T: ?Sized + 'static>(&self, alias: &str) -> Result<Box<T>> {
        self.resolve_named::<T>(alias)?
            .ok_or_else(|| CoreError::ExportNotFound {
                interface: type_name::<T>(),
                alias: alias.to_string(),
            })
    }

    /// 按注册顺序创建全部实现，任一失败即返回错误
    pub fn resolve_all<T: ?Sized + 'static>(&self) -> Result<Vec<Box<T>>> {
        self.table::<T>()
            .map(|t| t.exports.iter().map(instantiate).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// 该接口下的全部别名（注册顺序）
    pub fn aliases<T: ?Sized + 'static>(&self) -> Vec<&str> {
        self.table::<T>()
            .map(|t| t.exports.iter().map(|e| e.alias.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn contains<T: ?Sized + 'static>(&self, alias: &str) -> bool {
        self.aliases::<T>().contains(&alias)
    }

    /// 全部已注册条目
    pub fn exports(&self) -> &[ExportInfo] {
        &self.infos
    }

    fn table<T: ?Sized + 'static>(&self) -> Option<&ExportTable<T>> {
        self.tables
            .get(&TypeId::of::<T>())
            .and_then(|t| t.downcast_ref::<ExportTable<T>>())
    }
}

fn instantiate<T: ?Sized>(export: &Export<T>) -> Result<Box<T>> {
    (export.factory)().map_err(|err| CoreError::Instantiate {
        alias: export.alias.clone(),
        reason: err.to_string(),
    })
}

// ==========================================
// 非营利运营平台 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含存储实现）
// 红线: 不包含配置写入、不包含导入流程逻辑
// ==========================================

use crate::domain::ImportKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

/// 配置读取错误（导入运行在 tokio 上，要求可跨线程）
pub type ConfigError = Box<dyn Error + Send + Sync>;

/// 默认批大小
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// 自动生成客户编码的默认前缀
pub const DEFAULT_CUSTOMER_CODE_PREFIX: &str = "CUST";
/// 默认界面语言
pub const DEFAULT_LOCALE: &str = "en";

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ImportSettings（进程内）, ConfigManager（config_kv 表）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取批写入大小
    ///
    /// # 默认值
    /// - 50（小于 1 时按 1 处理）
    async fn get_batch_size(&self) -> Result<usize, ConfigError>;

    /// 获取自动生成客户编码的前缀
    ///
    /// # 默认值
    /// - CUST
    async fn get_customer_code_prefix(&self) -> Result<String, ConfigError>;

    /// 获取行级错误消息的语言
    async fn get_locale(&self) -> Result<String, ConfigError>;

    /// 获取某导入种类的附加列名别名
    ///
    /// # 返回
    /// - 规范字段名 → 候选列名（优先于内置别名）
    async fn get_alias_overrides(
        &self,
        kind: ImportKind,
    ) -> Result<HashMap<String, Vec<String>>, ConfigError>;
}

#[async_trait]
impl<T: ImportConfigReader + ?Sized> ImportConfigReader for Arc<T> {
    async fn get_batch_size(&self) -> Result<usize, ConfigError> {
        (**self).get_batch_size().await
    }

    async fn get_customer_code_prefix(&self) -> Result<String, ConfigError> {
        (**self).get_customer_code_prefix().await
    }

    async fn get_locale(&self) -> Result<String, ConfigError> {
        (**self).get_locale().await
    }

    async fn get_alias_overrides(
        &self,
        kind: ImportKind,
    ) -> Result<HashMap<String, Vec<String>>, ConfigError> {
        (**self).get_alias_overrides(kind).await
    }
}

// ==========================================
// ImportSettings - 进程内配置
// ==========================================
// 用途: CLI 参数覆写、测试
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub customer_code_prefix: String,
    pub locale: String,
    aliases: HashMap<ImportKind, HashMap<String, Vec<String>>>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            customer_code_prefix: DEFAULT_CUSTOMER_CODE_PREFIX.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            aliases: HashMap::new(),
        }
    }
}

impl ImportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_customer_code_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.customer_code_prefix = prefix.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// 追加一个列名别名（同一字段多次调用按调用顺序排列）
    pub fn with_alias(mut self, kind: ImportKind, field: &str, header: &str) -> Self {
        self.aliases
            .entry(kind)
            .or_default()
            .entry(field.to_string())
            .or_default()
            .push(header.to_string());
        self
    }
}

#[async_trait]
impl ImportConfigReader for ImportSettings {
    async fn get_batch_size(&self) -> Result<usize, ConfigError> {
        Ok(self.batch_size.max(1))
    }

    async fn get_customer_code_prefix(&self) -> Result<String, ConfigError> {
        Ok(self.customer_code_prefix.clone())
    }

    async fn get_locale(&self) -> Result<String, ConfigError> {
        Ok(self.locale.clone())
    }

    async fn get_alias_overrides(
        &self,
        kind: ImportKind,
    ) -> Result<HashMap<String, Vec<String>>, ConfigError> {
        Ok(self.aliases.get(&kind).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settings_defaults() {
        let settings = ImportSettings::new();
        assert_eq!(settings.get_batch_size().await.unwrap(), 50);
        assert_eq!(settings.get_customer_code_prefix().await.unwrap(), "CUST");
        assert!(settings
            .get_alias_overrides(ImportKind::Donors)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_settings_builder_clamps_and_collects_aliases() {
        let settings = ImportSettings::new()
            .with_batch_size(0)
            .with_alias(ImportKind::Donors, "email", "Correo")
            .with_alias(ImportKind::Donors, "email", "Mail");

        assert_eq!(settings.get_batch_size().await.unwrap(), 1);
        let overrides = settings.get_alias_overrides(ImportKind::Donors).await.unwrap();
        assert_eq!(overrides["email"], vec!["Correo", "Mail"]);
    }
}

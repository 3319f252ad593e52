//! 配置
//!
//! [`Environment`] 按优先级聚合多个配置源，负责解析表达式中的 `${key:default}` 占位符；
//! [`ResolverSettings`] 提供 Bean 定义的解析默认值

use std::collections::HashMap;
use std::fmt;

use anyhow::Context;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::Deserialize;

use crate::constants::{AUTOWIRE_MODE_KEY, LENIENT_RESOLUTION_KEY, NON_PUBLIC_ACCESS_KEY};
use crate::definition::AutowireMode;
use crate::error::{ContainerError, ContainerResult};
use crate::logging::LoggingSettings;
use crate::value::Value;

/// `${key}` 或 `${key:default}`
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("placeholder pattern is valid")
});

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
}

impl ConfigValue {
    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// 文本形式，用于字符串插值
    fn render(&self) -> String {
        match self {
            ConfigValue::String(s) => s.clone(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Array(items) => items
                .iter()
                .map(ConfigValue::render)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<ConfigValue> for Value {
    fn from(value: ConfigValue) -> Self {
        match value {
            ConfigValue::String(s) => Value::Str(s),
            ConfigValue::Int(i) => Value::Long(i),
            ConfigValue::Float(f) => Value::Double(f),
            ConfigValue::Bool(b) => Value::Bool(b),
            ConfigValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置管理器
pub struct Environment {
    /// 配置源列表（按优先级降序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.sources.read().iter().map(|s| s.name().to_string()).collect();
        f.debug_struct("Environment").field("sources", &names).finish()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        tracing::debug!(
            "Adding property source '{}' with priority {}",
            source.name(),
            source.priority()
        );
        sources.push(source);
        // 稳定排序，同优先级按添加顺序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        tracing::trace!("Config '{}' not found in any source", key);
        None
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.render())
    }

    /// 获取布尔值配置（带默认值）
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    /// 替换文本中的所有占位符
    ///
    /// 没有默认值且找不到配置的占位符返回错误
    pub fn resolve_required_placeholders(&self, text: &str) -> ContainerResult<String> {
        let mut missing = None;
        let resolved = PLACEHOLDER.replace_all(text, |caps: &regex::Captures<'_>| {
            let key = caps[1].trim();
            match (self.get(key), caps.get(2)) {
                (Some(value), _) => value.render(),
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => {
                    missing.get_or_insert_with(|| key.to_string());
                    caps[0].to_string()
                }
            }
        });
        match missing {
            Some(key) => Err(ContainerError::Other(anyhow::anyhow!(
                "Could not resolve placeholder '{}' in value \"{}\"",
                key,
                text
            ))),
            None => Ok(resolved.into_owned()),
        }
    }

    /// 解析表达式
    ///
    /// 整个表达式恰好是一个占位符时保留配置值的类型，否则按字符串插值
    pub fn resolve_expression(&self, expression: &str) -> ContainerResult<Value> {
        if let Some(caps) = PLACEHOLDER.captures(expression) {
            if caps[0].len() == expression.len() {
                if let Some(value) = self.get(caps[1].trim()) {
                    return Ok(value.into());
                }
            }
        }
        self.resolve_required_placeholders(expression).map(Value::Str)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Property Sources ==========

/// TOML 配置源，嵌套表展平为点分隔的键
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从字符串解析 TOML 配置
    pub fn parse(content: &str, name: impl Into<String>) -> anyhow::Result<Self> {
        let table: toml::Table = toml::from_str(content).context("Failed to parse TOML")?;
        let mut properties = HashMap::new();
        for (key, value) in &table {
            Self::flatten(value, key.clone(), &mut properties);
        }
        Ok(Self {
            name: name.into(),
            properties,
            priority: 0,
        })
    }

    fn flatten(value: &toml::Value, key: String, result: &mut HashMap<String, ConfigValue>) {
        match value {
            toml::Value::Table(table) => {
                for (child, val) in table {
                    Self::flatten(val, format!("{}.{}", key, child), result);
                }
            }
            other => {
                result.insert(key, Self::convert(other));
            }
        }
    }

    fn convert(value: &toml::Value) -> ConfigValue {
        match value {
            toml::Value::String(s) => ConfigValue::String(s.clone()),
            toml::Value::Integer(i) => ConfigValue::Int(*i),
            toml::Value::Float(f) => ConfigValue::Float(*f),
            toml::Value::Boolean(b) => ConfigValue::Bool(*b),
            toml::Value::Array(items) => ConfigValue::Array(items.iter().map(Self::convert).collect()),
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
            toml::Value::Table(table) => ConfigValue::String(table.to_string()),
        }
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

// ========== Resolver Settings ==========

/// 构造函数解析的全局默认值
///
/// 对应配置文件中的 `[chimera.beans]` 段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverSettings {
    /// 宽松模式（默认：true）
    pub lenient_constructor_resolution: bool,

    /// 是否允许非公有构造函数和方法（默认：true）
    pub non_public_access_allowed: bool,

    /// 自动装配模式（默认：no）
    pub autowire_mode: AutowireMode,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            lenient_constructor_resolution: true,
            non_public_access_allowed: true,
            autowire_mode: AutowireMode::No,
        }
    }
}

/// 配置文件中的 `[chimera]` 段，解析与日志设置共用
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SettingsDocument {
    #[serde(default)]
    pub(crate) chimera: ChimeraSection,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChimeraSection {
    #[serde(default)]
    pub(crate) beans: ResolverSettings,

    #[serde(default)]
    pub(crate) logging: LoggingSettings,
}

impl SettingsDocument {
    pub(crate) fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse chimera settings")
    }
}

impl ResolverSettings {
    /// 从 TOML 文本读取，缺失的段和键使用默认值
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(SettingsDocument::parse(content)?.chimera.beans)
    }

    /// 从 Environment 读取
    pub fn from_environment(environment: &Environment) -> ContainerResult<Self> {
        let defaults = Self::default();
        let autowire_mode = match environment.get_string(AUTOWIRE_MODE_KEY) {
            None => defaults.autowire_mode,
            Some(mode) => match mode.trim().to_lowercase().as_str() {
                "no" => AutowireMode::No,
                "constructor" => AutowireMode::Constructor,
                other => {
                    return Err(ContainerError::Other(anyhow::anyhow!(
                        "Invalid value '{}' for '{}': expected 'no' or 'constructor'",
                        other,
                        AUTOWIRE_MODE_KEY
                    )))
                }
            },
        };
        Ok(Self {
            lenient_constructor_resolution: environment
                .get_bool_or(LENIENT_RESOLUTION_KEY, defaults.lenient_constructor_resolution),
            non_public_access_allowed: environment
                .get_bool_or(NON_PUBLIC_ACCESS_KEY, defaults.non_public_access_allowed),
            autowire_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> Environment {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("defaults")
                .with_property("app.name", ConfigValue::String("demo".into()))
                .with_property("app.port", ConfigValue::Int(8080)),
        ));
        env.add_property_source(Box::new(
            MapPropertySource::new("overrides")
                .with_priority(60)
                .with_property("app.name", ConfigValue::String("prod".into())),
        ));
        env
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(environment().get_string("app.name"), Some("prod".to_string()));
    }

    #[test]
    fn test_placeholder_interpolation() {
        let env = environment();
        assert_eq!(
            env.resolve_required_placeholders("${app.name}:${app.port}").unwrap(),
            "prod:8080"
        );
        assert_eq!(
            env.resolve_required_placeholders("${app.missing:fallback}").unwrap(),
            "fallback"
        );
        assert!(env.resolve_required_placeholders("${app.missing}").is_err());
    }

    #[test]
    fn test_single_placeholder_keeps_type() {
        let env = environment();
        assert_eq!(env.resolve_expression("${app.port}").unwrap(), Value::Long(8080));
        assert_eq!(
            env.resolve_expression("port ${app.port}").unwrap(),
            Value::from("port 8080")
        );
        assert_eq!(env.resolve_expression("${x:7}").unwrap(), Value::from("7"));
    }

    #[test]
    fn test_toml_source_flattens_tables() {
        let source = TomlPropertySource::parse(
            "[chimera.beans]\nlenient-constructor-resolution = false\n",
            "app.toml",
        )
        .unwrap();
        assert_eq!(
            source.get("chimera.beans.lenient-constructor-resolution"),
            Some(ConfigValue::Bool(false))
        );
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = ResolverSettings::from_toml_str(
            "[chimera.beans]\nlenient-constructor-resolution = false\nautowire-mode = \"constructor\"\n",
        )
        .unwrap();
        assert!(!settings.lenient_constructor_resolution);
        assert!(settings.non_public_access_allowed);
        assert_eq!(settings.autowire_mode, AutowireMode::Constructor);

        assert_eq!(ResolverSettings::from_toml_str("").unwrap(), ResolverSettings::default());
    }

    #[test]
    fn test_settings_from_environment() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property(NON_PUBLIC_ACCESS_KEY, ConfigValue::String("no".into()))
                .with_property(AUTOWIRE_MODE_KEY, ConfigValue::String("Constructor".into())),
        ));
        let settings = ResolverSettings::from_environment(&env).unwrap();
        assert!(settings.lenient_constructor_resolution);
        assert!(!settings.non_public_access_allowed);
        assert_eq!(settings.autowire_mode, AutowireMode::Constructor);

        let bad = Environment::new();
        bad.add_property_source(Box::new(
            MapPropertySource::new("bad").with_property(AUTOWIRE_MODE_KEY, ConfigValue::String("byName".into())),
        ));
        assert!(ResolverSettings::from_environment(&bad).is_err());
    }
}

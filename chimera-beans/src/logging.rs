//! 日志初始化
//!
//! 解析器在 `trace` 级别输出候选者的权重，在 `debug` 级别输出缓存命中和
//! 自动装配关系，在 `warn` 级别输出被吞掉的候选者失败原因。
//! 对应配置文件中的 `[chimera.logging]` 段

use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Environment, SettingsDocument};
use crate::constants::{LOG_JSON_KEY, LOG_LEVEL_KEY, TRACE_RESOLUTION_KEY};

/// 候选者比较与类型推断所在的日志目标
const RESOLUTION_TARGETS: &[&str] = &["chimera_beans::resolver", "chimera_beans::bean_factory"];

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingSettings {
    /// 全局级别（默认：info）
    pub level: String,

    /// 单独打开解析过程的 trace 输出（默认：false）
    pub trace_resolution: bool,

    /// JSON 格式输出（默认：false）
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            trace_resolution: false,
            json: false,
        }
    }
}

impl LoggingSettings {
    /// 从 TOML 文本读取，与 [`ResolverSettings`](crate::ResolverSettings) 共用同一份文档
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let document = SettingsDocument::parse(content)?;
        Ok(document.chimera.logging)
    }

    /// 从 Environment 读取
    pub fn from_environment(environment: &Environment) -> Self {
        let defaults = Self::default();
        Self {
            level: environment.get_string(LOG_LEVEL_KEY).unwrap_or(defaults.level),
            trace_resolution: environment.get_bool_or(TRACE_RESOLUTION_KEY, defaults.trace_resolution),
            json: environment.get_bool_or(LOG_JSON_KEY, defaults.json),
        }
    }

    /// 过滤指令，例如 `warn,chimera_beans::resolver=trace`
    pub fn directives(&self) -> anyhow::Result<String> {
        let level = tracing::Level::from_str(self.level.trim())
            .map_err(|_| anyhow!("Invalid log level '{}'", self.level))?;
        let mut directives = level.to_string().to_lowercase();
        if self.trace_resolution {
            for target in RESOLUTION_TARGETS {
                directives.push_str(&format!(",{}=trace", target));
            }
        }
        Ok(directives)
    }

    fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        let directives = self.directives()?;
        EnvFilter::try_new(&directives).with_context(|| format!("Invalid log filter '{}'", directives))
    }

    /// 初始化全局日志订阅者，重复初始化返回错误
    pub fn init(&self) -> anyhow::Result<()> {
        let builder = fmt().with_env_filter(self.env_filter()?);
        let result = if self.json {
            builder.json().try_init()
        } else {
            builder.compact().try_init()
        };
        result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

        tracing::debug!("Logging initialized: level={}, trace_resolution={}", self.level, self.trace_resolution);
        Ok(())
    }

    /// 测试用：输出交给测试框架捕获，已经初始化过则忽略
    pub fn init_for_tests(&self) {
        if let Ok(filter) = self.env_filter() {
            let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
        }
    }
}

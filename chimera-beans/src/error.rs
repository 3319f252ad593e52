//! 统一的错误处理类型
//!
//! 解析器内部的失败分为两类：
//! - 单个候选者的绑定失败（`UnsatisfiedArgument`），可以在候选者之间恢复
//! - 选择阶段的失败（`NoMatchingCandidate`、`AmbiguousCandidates`），直接终止本次实例化
//!
//! 协作方（实例化策略等）返回的不透明错误通过 `anyhow::Error` 携带。

use crate::conversion::ConversionError;
use thiserror::Error;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 指定名称的 Bean 不存在
    #[error("No bean named '{0}' available")]
    BeanNotFound(String),

    /// Bean 已经注册
    #[error("Bean '{0}' already exists")]
    BeanAlreadyExists(String),

    /// 按类型查找时没有任何候选 Bean
    #[error("No qualifying bean of type '{required_type}' available")]
    NoSuchBeanOfType { required_type: String },

    /// 按类型查找时存在多个候选 Bean 且没有 primary
    #[error(
        "No qualifying bean of type '{required_type}' available: expected single matching bean but found {}: {}",
        candidates.len(),
        candidates.join(", ")
    )]
    NoUniqueBean {
        required_type: String,
        candidates: Vec<String>,
    },

    /// 循环依赖
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// 没有任何候选者满足参数数量和绑定规则
    #[error("Error creating bean '{bean_name}': {message}")]
    NoMatchingCandidate { bean_name: String, message: String },

    /// 严格模式下多个候选者权重相同
    #[error(
        "Error creating bean '{bean_name}': Ambiguous {kind} matches found (hint: specify index/type/name arguments for simple parameters to avoid type ambiguities): [{}]",
        candidates.join(", ")
    )]
    AmbiguousCandidates {
        bean_name: String,
        kind: &'static str,
        candidates: Vec<String>,
    },

    /// 某个参数无法绑定或转换
    ///
    /// `suppressed` 保存此前被吞掉的其他候选者的失败原因
    #[error(
        "Error creating bean '{bean_name}': Unsatisfied dependency expressed through {kind} parameter {index} of type [{parameter_type}] in {candidate}: {message}"
    )]
    UnsatisfiedArgument {
        bean_name: String,
        kind: &'static str,
        index: usize,
        parameter_type: String,
        candidate: String,
        message: String,
        suppressed: Vec<ContainerError>,
    },

    /// Bean 定义本身不合法
    #[error("Invalid bean definition '{bean_name}': {message}")]
    InvalidDefinition { bean_name: String, message: String },

    /// 实例化委托执行失败
    #[error("Instantiation of bean '{bean_name}' failed: {message}")]
    InstantiationFailed { bean_name: String, message: String },

    /// 类型转换失败
    #[error(transparent)]
    TypeMismatch(#[from] ConversionError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContainerError {
    /// 是否为单个候选者级别、可以通过尝试下一个候选者恢复的错误
    pub fn is_unsatisfied_argument(&self) -> bool {
        matches!(self, ContainerError::UnsatisfiedArgument { .. })
    }

    /// 附加被吞掉的候选者错误
    pub(crate) fn with_suppressed(self, causes: Vec<ContainerError>) -> Self {
        match self {
            ContainerError::UnsatisfiedArgument {
                bean_name,
                kind,
                index,
                parameter_type,
                candidate,
                message,
                mut suppressed,
            } => {
                suppressed.extend(causes);
                ContainerError::UnsatisfiedArgument {
                    bean_name,
                    kind,
                    index,
                    parameter_type,
                    candidate,
                    message,
                    suppressed,
                }
            }
            other => other,
        }
    }

    /// 获取被吞掉的候选者错误
    pub fn suppressed(&self) -> &[ContainerError] {
        match self {
            ContainerError::UnsatisfiedArgument { suppressed, .. } => suppressed,
            _ => &[],
        }
    }
}

pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn unsatisfied(index: usize) -> ContainerError {
        ContainerError::UnsatisfiedArgument {
            bean_name: "logger".to_string(),
            kind: "constructor",
            index,
            parameter_type: "i32".to_string(),
            candidate: "Logger(i32)".to_string(),
            message: "boom".to_string(),
            suppressed: Vec::new(),
        }
    }

    #[test]
    fn test_with_suppressed_only_touches_unsatisfied() {
        let err = unsatisfied(1).with_suppressed(vec![unsatisfied(0)]);
        assert_eq!(err.suppressed().len(), 1);

        let other = ContainerError::BeanNotFound("x".to_string()).with_suppressed(vec![unsatisfied(0)]);
        assert!(other.suppressed().is_empty());
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = ContainerError::AmbiguousCandidates {
            bean_name: "logger".to_string(),
            kind: "constructor",
            candidates: vec!["Logger(A)".to_string(), "Logger(B)".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Logger(A), Logger(B)"));
        assert!(!err.is_unsatisfied_argument());
    }
}

//! 切面配置错误
//!
//! 这些错误都表示切面声明本身有缺陷，构建时立即报告，不会重试

use chimera_beans::ContainerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AopConfigError {
    /// 通知注解出现在非切面类型上
    #[error("Advice must be declared inside an aspect type: offending method '{method}' in class [{class}]")]
    NotAnAspect { method: String, class: String },

    /// 引入声明缺少默认实现
    #[error("defaultImpl must be set on DeclareParents: field '{field}' in aspect [{class}]")]
    MissingDefaultImplementation { field: String, class: String },

    /// 切面继承自具体（非抽象）切面
    #[error("[{class}] cannot extend concrete aspect [{superclass}]")]
    ConcreteAspectInheritance { class: String, superclass: String },

    #[error("{model} instantiation model is not supported on aspect [{class}]")]
    UnsupportedInstantiationModel { class: String, model: String },

    /// 单例 Bean 使用了非单例的切面实例化模型
    #[error("Bean with name '{bean_name}' is a singleton, but aspect instantiation model is not singleton")]
    SingletonWithNonSingletonModel { bean_name: String },

    #[error("Invalid pointcut expression '{expression}': {reason}")]
    InvalidPointcut { expression: String, reason: String },

    #[error(transparent)]
    Container(#[from] ContainerError),
}

pub type AopResult<T> = std::result::Result<T, AopConfigError>;

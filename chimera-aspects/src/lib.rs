//! Chimera Aspects - 切面 Advisor 构建
//!
//! 把标注了通知的切面类型转换为有序的 Advisor 列表：
//! - 通知方法按通知类型和方法名排序，保证顺序确定
//! - 非单例切面在第一次匹配时才创建实例
//! - 字段上的引入声明生成类型引入 Advisor
//! - 单例切面的 Advisor 按 Bean 名称缓存

pub mod advice;
pub mod advisor;
pub mod advisor_factory;
pub mod builder;
pub mod error;
pub mod instance_factory;
pub mod joinpoint;
pub mod metadata;
pub mod pointcut;
pub mod registration;

// 重新导出核心类型
pub use advice::{AdviceConfig, AdviceKind};
pub use advisor::{
    sort_advisors, Advisor, DeclareParentsAdvisor, InstantiationModelAwareAdvisor, SyntheticInstantiationAdvisor,
};
pub use advisor_factory::ReflectiveAdvisorFactory;
pub use builder::AspectAdvisorsBuilder;
pub use error::{AopConfigError, AopResult};
pub use instance_factory::{
    AspectInstanceFactory, BeanFactoryAspectInstanceFactory, LazySingletonAspectInstanceFactory,
    PrototypeAspectInstanceFactory,
};
pub use joinpoint::JoinPoint;
pub use metadata::{
    AnnotationKind, AspectAnnotation, AspectClass, DeclareParents, FieldMeta, MethodMeta, PerClause,
};
pub use pointcut::{PointcutExpression, WildcardPattern};
pub use registration::{AspectBeanRegistry, AspectRegistration, StaticAspectBeans};

// 导出 inventory 供注册使用
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::AdviceKind;
    pub use crate::advisor::Advisor;
    pub use crate::builder::AspectAdvisorsBuilder;
    pub use crate::error::{AopConfigError, AopResult};
    pub use crate::joinpoint::JoinPoint;
    pub use crate::metadata::{AspectAnnotation, AspectClass, DeclareParents, FieldMeta, MethodMeta, PerClause};
    pub use crate::pointcut::PointcutExpression;
    pub use crate::registration::{AspectRegistration, StaticAspectBeans};
}

//! 解析器的协作方
//!
//! 构造函数解析器不持有 Bean 注册表，通过 [`BeanFactory`] 获取依赖、
//! 类型元数据和转换能力，通过 [`InstantiationStrategy`] 完成实际的实例化

use std::fmt;
use std::sync::Arc;

use crate::config::Environment;
use crate::conversion::TypeConverter;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;
use crate::executable::{Executable, MethodParameter, ParameterNameDiscoverer};
use crate::types::{TypeRef, TypeRegistry};
use crate::value::Value;

/// 自动装配的注入点描述
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    /// 需要的类型
    pub required_type: TypeRef,

    /// 形参名称（可能未知）
    pub parameter_name: Option<String>,

    /// 形参位置
    pub parameter_index: usize,

    /// 所在的构造函数或方法
    pub declaring_executable: String,

    /// 是否必须存在
    pub required: bool,
}

impl DependencyDescriptor {
    pub fn for_parameter(parameter: &MethodParameter<'_>, parameter_name: Option<&str>) -> Self {
        Self {
            required_type: parameter
                .parameter_type()
                .cloned()
                .unwrap_or_else(|| TypeRef::new(crate::constants::ANY_TYPE)),
            parameter_name: parameter_name.filter(|n| !n.is_empty()).map(str::to_string),
            parameter_index: parameter.index,
            declaring_executable: parameter.executable.to_string(),
            required: true,
        }
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter {} of type [{}] in {}",
            self.parameter_index, self.required_type, self.declaring_executable
        )
    }
}

/// Bean 工厂
///
/// 解析器通过该 trait 回调容器：获取引用的 Bean、按类型解析依赖、
/// 登记依赖关系，以及获取类型注册表等共享组件
pub trait BeanFactory: Send + Sync {
    /// 按名称获取 Bean，可能触发实例化
    fn get_bean(&self, name: &str) -> ContainerResult<Value>;

    /// 获取 Bean 的类型（不触发实例化）
    fn get_type(&self, name: &str) -> Option<TypeRef>;

    /// 按类型解析依赖
    ///
    /// 被选中的候选 Bean 名称追加到 `autowired_bean_names`
    fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_bean_name: &str,
        autowired_bean_names: &mut Vec<String>,
    ) -> ContainerResult<Value>;

    /// 登记依赖关系：`dependent_bean_name` 依赖 `bean_name`
    fn register_dependent_bean(&self, bean_name: &str, dependent_bean_name: &str);

    /// 创建内嵌 Bean
    fn create_inner_bean(&self, outer_bean_name: &str, definition: &BeanDefinition) -> ContainerResult<Value>;

    fn type_registry(&self) -> &TypeRegistry;

    fn type_converter(&self) -> Arc<dyn TypeConverter>;

    fn parameter_name_discoverer(&self) -> Arc<dyn ParameterNameDiscoverer>;

    fn instantiation_strategy(&self) -> Arc<dyn InstantiationStrategy>;

    fn environment(&self) -> &Environment;
}

/// 实例化策略
pub trait InstantiationStrategy: Send + Sync {
    /// 通过构造函数实例化
    fn instantiate_with_constructor(
        &self,
        definition: &BeanDefinition,
        constructor: &Executable,
        args: &[Value],
    ) -> anyhow::Result<Value>;

    /// 通过工厂方法实例化，静态工厂方法的 `factory_bean` 为 `None`
    fn instantiate_with_factory_method(
        &self,
        definition: &BeanDefinition,
        factory_bean: Option<&Value>,
        factory_method: &Executable,
        args: &[Value],
    ) -> anyhow::Result<Value>;
}

/// 默认实例化策略：直接调用可执行体上登记的调用函数
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleInstantiationStrategy;

impl InstantiationStrategy for SimpleInstantiationStrategy {
    fn instantiate_with_constructor(
        &self,
        definition: &BeanDefinition,
        constructor: &Executable,
        args: &[Value],
    ) -> anyhow::Result<Value> {
        tracing::trace!(
            "Instantiating bean '{}' via constructor {}",
            definition.name(),
            constructor
        );
        constructor.invoke(None, args)
    }

    fn instantiate_with_factory_method(
        &self,
        definition: &BeanDefinition,
        factory_bean: Option<&Value>,
        factory_method: &Executable,
        args: &[Value],
    ) -> anyhow::Result<Value> {
        tracing::trace!(
            "Instantiating bean '{}' via factory method {}",
            definition.name(),
            factory_method
        );
        factory_method.invoke(factory_bean, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_for_parameter() {
        let ctor = Executable::constructor(vec!["String".into(), "Repository".into()]);
        let descriptor = DependencyDescriptor::for_parameter(&MethodParameter::new(&ctor, 1), Some(""));
        assert_eq!(descriptor.required_type, TypeRef::new("Repository"));
        assert_eq!(descriptor.parameter_name, None);
        assert_eq!(descriptor.parameter_index, 1);
        assert!(descriptor.to_string().contains("parameter 1 of type [Repository]"));
    }

    #[test]
    fn test_simple_strategy_rejects_factory_method_without_invoker() {
        let definition = BeanDefinition::new("widget");
        let method = Executable::static_method("create", vec![]).returns("Widget");
        let result = SimpleInstantiationStrategy.instantiate_with_factory_method(&definition, None, &method, &[]);
        assert!(result.is_err());
    }
}

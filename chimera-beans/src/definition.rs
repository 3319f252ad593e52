//! Bean 定义
//!
//! 描述如何创建一个 Bean：类型、构造参数、工厂方法以及解析策略，
//! 同时携带构造函数解析结果的缓存槽

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::argument_values::{ConstructorArgumentValues, ValueHolder};
use crate::arguments::PreparedArgument;
use crate::config::ResolverSettings;
use crate::executable::Executable;
use crate::types::TypeRef;
use crate::value::Value;

/// Bean 的作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// 单例模式 - 容器中只有一个实例
    #[default]
    Singleton,

    /// 原型模式 - 每次请求都创建新实例
    Prototype,
}

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutowireMode {
    /// 不自动装配，参数只来自显式声明
    #[default]
    No,

    /// 按构造函数参数类型自动装配
    Constructor,
}

/// 构造函数解析结果缓存
///
/// 首次解析成功后写入，之后的请求直接复用
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    /// 已选定的构造函数或工厂方法
    pub resolved_executable: Option<Arc<Executable>>,

    /// 参数是否已经解析
    pub arguments_resolved: bool,

    /// 完全解析的参数
    pub resolved_arguments: Option<Vec<Value>>,

    /// 需要在每次请求时重新解析的参数模板
    pub prepared_arguments: Option<Vec<PreparedArgument>>,
}

/// Bean 定义
pub struct BeanDefinition {
    /// Bean 的名称
    name: String,

    /// Bean 的类型；使用实例工厂方法时可以为空
    bean_type: Option<TypeRef>,

    /// Bean 的作用域
    scope: Scope,

    /// 是否为同类型候选者中的首选
    primary: bool,

    /// 构造参数声明
    constructor_arguments: ConstructorArgumentValues,

    autowire_mode: AutowireMode,

    /// 宽松模式：按类型差异权重选择，权重相同时取第一个
    lenient_constructor_resolution: bool,

    /// 是否允许使用非公有的构造函数和方法
    non_public_access_allowed: bool,

    factory_bean_name: Option<String>,
    factory_method_name: Option<String>,

    /// 显式指定的候选构造函数
    preferred_constructors: Option<Vec<Arc<Executable>>>,

    resolution: Mutex<ResolutionCache>,
}

impl BeanDefinition {
    /// 创建新的 Bean 定义
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bean_type: None,
            scope: Scope::default(),
            primary: false,
            constructor_arguments: ConstructorArgumentValues::new(),
            autowire_mode: AutowireMode::default(),
            lenient_constructor_resolution: true,
            non_public_access_allowed: true,
            factory_bean_name: None,
            factory_method_name: None,
            preferred_constructors: None,
            resolution: Mutex::new(ResolutionCache::default()),
        }
    }

    /// 以给定类型创建 Bean 定义
    pub fn of_type(name: impl Into<String>, bean_type: impl Into<TypeRef>) -> Self {
        Self::new(name).with_type(bean_type)
    }

    /// 以类型名推导的默认名称创建 Bean 定义
    pub fn for_type(bean_type: impl Into<TypeRef>) -> Self {
        let bean_type = bean_type.into();
        Self::of_type(crate::utils::naming::default_bean_name(bean_type.name()), bean_type)
    }

    /// 应用全局解析配置作为默认值
    pub fn with_settings(mut self, settings: &ResolverSettings) -> Self {
        self.lenient_constructor_resolution = settings.lenient_constructor_resolution;
        self.non_public_access_allowed = settings.non_public_access_allowed;
        self.autowire_mode = settings.autowire_mode;
        self
    }

    pub fn with_type(mut self, bean_type: impl Into<TypeRef>) -> Self {
        self.bean_type = Some(bean_type.into());
        self
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// 添加位置参数
    pub fn with_indexed_argument(mut self, index: usize, holder: ValueHolder) -> Self {
        self.constructor_arguments.add_indexed(index, holder);
        self
    }

    /// 添加通用参数
    pub fn with_generic_argument(mut self, holder: ValueHolder) -> Self {
        self.constructor_arguments.add_generic(holder);
        self
    }

    pub fn with_constructor_arguments(mut self, arguments: ConstructorArgumentValues) -> Self {
        self.constructor_arguments = arguments;
        self
    }

    pub fn with_autowire_mode(mut self, mode: AutowireMode) -> Self {
        self.autowire_mode = mode;
        self
    }

    pub fn with_lenient_constructor_resolution(mut self, lenient: bool) -> Self {
        self.lenient_constructor_resolution = lenient;
        self
    }

    pub fn with_non_public_access_allowed(mut self, allowed: bool) -> Self {
        self.non_public_access_allowed = allowed;
        self
    }

    /// 使用工厂 Bean 上的实例方法创建
    pub fn with_factory_bean(mut self, factory_bean_name: impl Into<String>) -> Self {
        self.factory_bean_name = Some(factory_bean_name.into());
        self
    }

    /// 设置工厂方法名称；未设置工厂 Bean 时为 Bean 类型上的静态方法
    pub fn with_factory_method(mut self, factory_method_name: impl Into<String>) -> Self {
        self.factory_method_name = Some(factory_method_name.into());
        self
    }

    /// 限定候选构造函数，同时启用自动装配
    pub fn with_preferred_constructors(mut self, constructors: Vec<Arc<Executable>>) -> Self {
        self.preferred_constructors = Some(constructors);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bean_type(&self) -> Option<&TypeRef> {
        self.bean_type.as_ref()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == Scope::Singleton
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn constructor_arguments(&self) -> &ConstructorArgumentValues {
        &self.constructor_arguments
    }

    pub fn has_constructor_arguments(&self) -> bool {
        !self.constructor_arguments.is_empty()
    }

    pub fn autowire_mode(&self) -> AutowireMode {
        self.autowire_mode
    }

    pub fn is_lenient_constructor_resolution(&self) -> bool {
        self.lenient_constructor_resolution
    }

    pub fn is_non_public_access_allowed(&self) -> bool {
        self.non_public_access_allowed
    }

    pub fn factory_bean_name(&self) -> Option<&str> {
        self.factory_bean_name.as_deref()
    }

    pub fn factory_method_name(&self) -> Option<&str> {
        self.factory_method_name.as_deref()
    }

    pub fn uses_factory_method(&self) -> bool {
        self.factory_method_name.is_some()
    }

    pub fn preferred_constructors(&self) -> Option<&[Arc<Executable>]> {
        self.preferred_constructors.as_deref()
    }

    /// 锁定解析缓存槽
    ///
    /// 持有期间不得解析依赖或实例化其他 Bean
    pub fn resolution(&self) -> MutexGuard<'_, ResolutionCache> {
        self.resolution.lock()
    }

    /// 当前缓存的可执行体
    pub fn resolved_executable(&self) -> Option<Arc<Executable>> {
        self.resolution.lock().resolved_executable.clone()
    }

    /// 清空解析缓存
    pub fn reset_resolution(&self) {
        *self.resolution.lock() = ResolutionCache::default();
    }
}

impl Clone for BeanDefinition {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            bean_type: self.bean_type.clone(),
            scope: self.scope,
            primary: self.primary,
            constructor_arguments: self.constructor_arguments.clone(),
            autowire_mode: self.autowire_mode,
            lenient_constructor_resolution: self.lenient_constructor_resolution,
            non_public_access_allowed: self.non_public_access_allowed,
            factory_bean_name: self.factory_bean_name.clone(),
            factory_method_name: self.factory_method_name.clone(),
            preferred_constructors: self.preferred_constructors.clone(),
            resolution: Mutex::new(self.resolution.lock().clone()),
        }
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("bean_type", &self.bean_type)
            .field("scope", &self.scope)
            .field("autowire_mode", &self.autowire_mode)
            .field("lenient", &self.lenient_constructor_resolution)
            .field("factory_bean_name", &self.factory_bean_name)
            .field("factory_method_name", &self.factory_method_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let definition = BeanDefinition::of_type("logger", "Logger");
        assert!(definition.is_singleton());
        assert!(definition.is_lenient_constructor_resolution());
        assert!(definition.is_non_public_access_allowed());
        assert_eq!(definition.autowire_mode(), AutowireMode::No);
        assert!(!definition.has_constructor_arguments());
        assert!(definition.resolved_executable().is_none());
    }

    #[test]
    fn test_default_name_from_type() {
        let definition = BeanDefinition::for_type("app::aspects::AuditAspect");
        assert_eq!(definition.name(), "auditAspect");
        assert_eq!(definition.bean_type(), Some(&TypeRef::new("app::aspects::AuditAspect")));
    }

    #[test]
    fn test_settings_override_defaults() {
        let settings = ResolverSettings {
            lenient_constructor_resolution: false,
            non_public_access_allowed: false,
            autowire_mode: AutowireMode::Constructor,
        };
        let definition = BeanDefinition::new("x").with_settings(&settings);
        assert!(!definition.is_lenient_constructor_resolution());
        assert!(!definition.is_non_public_access_allowed());
        assert_eq!(definition.autowire_mode(), AutowireMode::Constructor);
    }

    #[test]
    fn test_reset_resolution_clears_cache() {
        let definition = BeanDefinition::of_type("logger", "Logger");
        {
            let mut cache = definition.resolution();
            cache.arguments_resolved = true;
            cache.resolved_arguments = Some(vec![Value::from("svc")]);
        }
        let copy = definition.clone();
        assert!(copy.resolution().arguments_resolved);

        definition.reset_resolution();
        assert!(!definition.resolution().arguments_resolved);
        assert!(copy.resolution().resolved_arguments.is_some());
    }
}

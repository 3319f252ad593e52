//! 切面 Bean 的来源
//!
//! 构建器通过 [`AspectBeanRegistry`] 查看容器中的 Bean 及其切面描述符。
//! 描述符可以手动登记，也可以用 inventory 在编译期收集

use std::collections::HashMap;
use std::sync::Arc;

use chimera_beans::{BeanFactory, ContainerResult, DefaultBeanFactory, TypeRef, Value};
use parking_lot::RwLock;

use crate::metadata::AspectClass;

/// 构建器所需的容器视图
pub trait AspectBeanRegistry: Send + Sync {
    /// 按注册顺序返回所有 Bean 名称
    fn bean_names(&self) -> Vec<String>;

    /// Bean 的类型，未知时返回 None
    fn bean_type(&self, name: &str) -> Option<TypeRef>;

    /// 类型对应的切面描述符
    fn aspect_metadata(&self, bean_type: &TypeRef) -> Option<Arc<AspectClass>>;

    fn is_singleton(&self, name: &str) -> bool;

    fn get_bean(&self, name: &str) -> ContainerResult<Value>;
}

/// 编译期注册的切面描述符
///
/// ```ignore
/// chimera_aspects::inventory::submit! {
///     AspectRegistration::new("AuditAspect", audit_aspect_metadata)
/// }
/// ```
pub struct AspectRegistration {
    /// 切面类型名称
    pub type_name: &'static str,

    /// 生成描述符的函数
    pub metadata: fn() -> AspectClass,
}

impl AspectRegistration {
    pub const fn new(type_name: &'static str, metadata: fn() -> AspectClass) -> Self {
        Self { type_name, metadata }
    }
}

inventory::collect!(AspectRegistration);

/// 获取所有注册的切面描述符
pub fn get_all_aspect_registrations() -> impl Iterator<Item = &'static AspectRegistration> {
    inventory::iter::<AspectRegistration>()
}

/// 基于 [`DefaultBeanFactory`] 的切面 Bean 视图
pub struct StaticAspectBeans {
    factory: Arc<DefaultBeanFactory>,

    /// 类型名称 -> 切面描述符
    metadata: RwLock<HashMap<String, Arc<AspectClass>>>,
}

impl StaticAspectBeans {
    pub fn new(factory: Arc<DefaultBeanFactory>) -> Self {
        Self {
            factory,
            metadata: RwLock::new(HashMap::new()),
        }
    }

    /// 同时载入 inventory 收集的描述符
    pub fn with_registered_aspects(self) -> Self {
        for registration in get_all_aspect_registrations() {
            tracing::debug!("Loading aspect metadata for '{}'", registration.type_name);
            self.register_metadata((registration.metadata)());
        }
        self
    }

    /// 登记类型描述符，同名类型后登记的覆盖先登记的
    pub fn register_metadata(&self, class: AspectClass) {
        let name = class.name().to_string();
        self.metadata.write().insert(name, Arc::new(class));
    }

    pub fn factory(&self) -> &Arc<DefaultBeanFactory> {
        &self.factory
    }
}

impl AspectBeanRegistry for StaticAspectBeans {
    fn bean_names(&self) -> Vec<String> {
        self.factory.bean_definition_names()
    }

    fn bean_type(&self, name: &str) -> Option<TypeRef> {
        self.factory.get_type(name)
    }

    fn aspect_metadata(&self, bean_type: &TypeRef) -> Option<Arc<AspectClass>> {
        self.metadata.read().get(bean_type.name()).cloned()
    }

    fn is_singleton(&self, name: &str) -> bool {
        self.factory
            .get_bean_definition(name)
            .map(|definition| definition.is_singleton())
            .unwrap_or(false)
    }

    fn get_bean(&self, name: &str) -> ContainerResult<Value> {
        self.factory.get_bean(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AspectAnnotation, MethodMeta};
    use chimera_beans::{BeanDefinition, Executable, Scope, TypeInfo, TypeRegistry};

    fn metrics_aspect() -> AspectClass {
        AspectClass::aspect("MetricsAspect")
            .method(MethodMeta::annotated("count", AspectAnnotation::after_returning("within(*Service)")))
    }

    inventory::submit! {
        AspectRegistration::new("MetricsAspect", metrics_aspect)
    }

    fn factory() -> Arc<DefaultBeanFactory> {
        let mut registry = TypeRegistry::with_builtins();
        registry.register(TypeInfo::class("MetricsAspect").constructor(Executable::constructor(vec![])));
        let factory = DefaultBeanFactory::new(registry);
        factory.register_bean_definition(BeanDefinition::for_type("MetricsAspect")).unwrap();
        factory
            .register_bean_definition(BeanDefinition::of_type("scratch", "MetricsAspect").with_scope(Scope::Prototype))
            .unwrap();
        Arc::new(factory)
    }

    #[test]
    fn test_registered_aspects_are_loaded() {
        assert!(get_all_aspect_registrations().any(|r| r.type_name == "MetricsAspect"));

        let beans = StaticAspectBeans::new(factory()).with_registered_aspects();
        let bean_type = beans.bean_type("metricsAspect").unwrap();
        let metadata = beans.aspect_metadata(&bean_type).unwrap();
        assert_eq!(metadata.name(), "MetricsAspect");
        assert_eq!(metadata.methods.len(), 1);
    }

    #[test]
    fn test_bean_view_reports_scope() {
        let beans = StaticAspectBeans::new(factory());
        assert_eq!(beans.bean_names(), vec!["metricsAspect".to_string(), "scratch".to_string()]);
        assert!(beans.is_singleton("metricsAspect"));
        assert!(!beans.is_singleton("scratch"));
        assert!(!beans.is_singleton("missing"));
        assert!(beans.aspect_metadata(&TypeRef::new("MetricsAspect")).is_none());
        assert!(beans.get_bean("missing").is_err());
    }
}

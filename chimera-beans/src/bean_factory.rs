//! 默认 Bean 工厂
//!
//! 保存 Bean 定义和单例缓存，按类型解析依赖，并通过 [`ConstructorResolver`] 完成实例化

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Environment;
use crate::conversion::{SimpleTypeConverter, TypeConverter};
use crate::definition::BeanDefinition;
use crate::error::{ContainerError, ContainerResult};
use crate::executable::{DefaultParameterNameDiscoverer, ParameterNameDiscoverer};
use crate::factory::{BeanFactory, DependencyDescriptor, InstantiationStrategy, SimpleInstantiationStrategy};
use crate::resolver::ConstructorResolver;
use crate::types::{TypeRef, TypeRegistry};
use crate::utils::dependency::CreationTracker;
use crate::value::Value;

/// 默认 Bean 工厂实现
pub struct DefaultBeanFactory {
    /// 类型注册表
    registry: Arc<TypeRegistry>,

    type_converter: Arc<dyn TypeConverter>,

    parameter_name_discoverer: Arc<dyn ParameterNameDiscoverer>,

    instantiation_strategy: Arc<dyn InstantiationStrategy>,

    environment: Environment,

    /// Bean 定义存储
    definitions: RwLock<HashMap<String, Arc<BeanDefinition>>>,

    /// 定义的注册顺序，按类型查找时保持确定的顺序
    definition_names: RwLock<Vec<String>>,

    /// 单例 Bean 缓存
    singletons: RwLock<HashMap<String, Value>>,

    /// 依赖关系：Bean 名称 -> 依赖它的 Bean 名称
    dependent_beans: RwLock<HashMap<String, BTreeSet<String>>>,

    /// 正在创建的 Bean（用于检测循环依赖）
    creation_tracker: CreationTracker,

    /// 正在推断类型的 Bean，工厂 Bean 互相引用时中止推断
    type_prediction: CreationTracker,
}

impl DefaultBeanFactory {
    /// 创建 Bean 工厂
    pub fn new(registry: TypeRegistry) -> Self {
        let registry = Arc::new(registry);
        Self {
            type_converter: Arc::new(SimpleTypeConverter::new(Arc::clone(&registry))),
            registry,
            parameter_name_discoverer: Arc::new(DefaultParameterNameDiscoverer),
            instantiation_strategy: Arc::new(SimpleInstantiationStrategy),
            environment: Environment::new(),
            definitions: RwLock::new(HashMap::new()),
            definition_names: RwLock::new(Vec::new()),
            singletons: RwLock::new(HashMap::new()),
            dependent_beans: RwLock::new(HashMap::new()),
            creation_tracker: CreationTracker::new(),
            type_prediction: CreationTracker::new(),
        }
    }

    pub fn with_type_converter(mut self, converter: Arc<dyn TypeConverter>) -> Self {
        self.type_converter = converter;
        self
    }

    pub fn with_parameter_name_discoverer(mut self, discoverer: Arc<dyn ParameterNameDiscoverer>) -> Self {
        self.parameter_name_discoverer = discoverer;
        self
    }

    pub fn with_instantiation_strategy(mut self, strategy: Arc<dyn InstantiationStrategy>) -> Self {
        self.instantiation_strategy = strategy;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// 注册 Bean 定义
    pub fn register_bean_definition(&self, definition: BeanDefinition) -> ContainerResult<()> {
        let name = definition.name().to_string();
        tracing::trace!("Registering bean definition '{}': {:?}", name, definition);

        let mut definitions = self.definitions.write();
        if definitions.contains_key(&name) {
            tracing::warn!("Bean '{}' already exists, registration failed", name);
            return Err(ContainerError::BeanAlreadyExists(name));
        }
        definitions.insert(name.clone(), Arc::new(definition));
        self.definition_names.write().push(name.clone());

        tracing::debug!("Bean definition registered successfully: '{}'", name);
        Ok(())
    }

    pub fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// 按注册顺序返回所有 Bean 名称
    pub fn bean_definition_names(&self) -> Vec<String> {
        self.definition_names.read().clone()
    }

    /// 使用显式参数创建新实例，不经过单例缓存和解析缓存
    pub fn get_bean_with_args(&self, name: &str, args: &[Value]) -> ContainerResult<Value> {
        let definition = self.get_bean_definition(name)?;
        self.create_bean(name, &definition, Some(args))
    }

    /// 依赖指定 Bean 的所有 Bean
    pub fn dependent_beans(&self, name: &str) -> Vec<String> {
        self.dependent_beans
            .read()
            .get(name)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 按类型查找 Bean 名称
    pub fn bean_names_for_type(&self, required_type: &TypeRef) -> Vec<String> {
        self.bean_definition_names()
            .into_iter()
            .filter(|name| {
                self.get_type(name)
                    .map(|ty| self.registry.is_assignable(required_type, &ty))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// 预先实例化所有单例
    pub fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let names: Vec<String> = self
            .bean_definition_names()
            .into_iter()
            .filter(|name| {
                self.definitions
                    .read()
                    .get(name)
                    .map(|d| d.is_singleton())
                    .unwrap_or(false)
            })
            .collect();

        tracing::debug!("Pre-instantiating {} singleton beans", names.len());
        for name in names {
            self.get_bean(&name)?;
        }
        Ok(())
    }

    /// 推断 Bean 的类型；工厂方法创建的 Bean 取唯一候选工厂方法的返回类型
    fn predict_type(&self, definition: &BeanDefinition) -> Option<TypeRef> {
        if !definition.uses_factory_method() {
            return definition.bean_type().cloned();
        }
        if let Some(method) = definition.resolved_executable() {
            return Some(method.return_type());
        }
        let Ok(_guard) = self.type_prediction.start_creating(definition.name()) else {
            tracing::debug!("Factory bean chain of '{}' refers back to itself, type unknown", definition.name());
            return None;
        };
        ConstructorResolver::new(self).resolve_factory_method_if_possible(definition);
        definition.resolved_executable().map(|method| method.return_type())
    }

    fn create_bean(
        &self,
        name: &str,
        definition: &BeanDefinition,
        explicit_args: Option<&[Value]>,
    ) -> ContainerResult<Value> {
        let _guard = self.creation_tracker.start_creating(name).map_err(|chain| {
            tracing::debug!("Circular reference while creating '{}'", name);
            ContainerError::CircularDependency(chain.join(" -> "))
        })?;

        let resolver = ConstructorResolver::new(self);
        if definition.uses_factory_method() {
            resolver.instantiate_using_factory_method(name, definition, explicit_args)
        } else {
            resolver.autowire_constructor(name, definition, definition.preferred_constructors(), explicit_args)
        }
    }

    /// 在多个候选者中选择：唯一的 primary 优先，其次参数名称与 Bean 名称相同者
    fn determine_autowire_candidate(
        &self,
        candidates: &[String],
        descriptor: &DependencyDescriptor,
    ) -> Option<String> {
        let definitions = self.definitions.read();
        let primaries: Vec<&String> = candidates
            .iter()
            .filter(|name| definitions.get(name.as_str()).map(|d| d.is_primary()).unwrap_or(false))
            .collect();
        if primaries.len() == 1 {
            return Some(primaries[0].clone());
        }
        let parameter_name = descriptor.parameter_name.as_deref()?;
        candidates.iter().find(|name| name.as_str() == parameter_name).cloned()
    }
}

impl BeanFactory for DefaultBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<Value> {
        tracing::trace!("Requesting bean: '{}'", name);

        let definition = self.get_bean_definition(name).map_err(|e| {
            tracing::debug!("Bean '{}' not found in container", name);
            e
        })?;

        if !definition.is_singleton() {
            tracing::debug!("Creating new instance of prototype bean '{}'", name);
            return self.create_bean(name, &definition, None);
        }

        if let Some(bean) = self.singletons.read().get(name) {
            tracing::debug!("Returning cached instance of singleton bean '{}'", name);
            return Ok(bean.clone());
        }

        tracing::info!("Creating shared instance of singleton bean '{}'", name);
        let bean = self.create_bean(name, &definition, None)?;

        // 并发创建时保留先写入的实例
        let mut singletons = self.singletons.write();
        let cached = singletons.entry(name.to_string()).or_insert(bean).clone();
        tracing::debug!("Singleton bean '{}' created and cached", name);
        Ok(cached)
    }

    fn get_type(&self, name: &str) -> Option<TypeRef> {
        if let Some(bean) = self.singletons.read().get(name) {
            return bean.type_ref();
        }
        let definition = self.definitions.read().get(name).cloned()?;
        self.predict_type(&definition)
    }

    fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_bean_name: &str,
        autowired_bean_names: &mut Vec<String>,
    ) -> ContainerResult<Value> {
        let candidates: Vec<String> = self
            .bean_names_for_type(&descriptor.required_type)
            .into_iter()
            .filter(|name| name != requesting_bean_name)
            .collect();

        let chosen = match candidates.len() {
            0 if descriptor.required => {
                return Err(ContainerError::NoSuchBeanOfType {
                    required_type: descriptor.required_type.to_string(),
                })
            }
            0 => return Ok(Value::Null),
            1 => candidates[0].clone(),
            _ => self
                .determine_autowire_candidate(&candidates, descriptor)
                .ok_or_else(|| ContainerError::NoUniqueBean {
                    required_type: descriptor.required_type.to_string(),
                    candidates: candidates.clone(),
                })?,
        };

        tracing::trace!(
            "Resolved {} of bean '{}' to bean '{}'",
            descriptor,
            requesting_bean_name,
            chosen
        );
        let bean = self.get_bean(&chosen)?;
        autowired_bean_names.push(chosen);
        Ok(bean)
    }

    fn register_dependent_bean(&self, bean_name: &str, dependent_bean_name: &str) {
        self.dependent_beans
            .write()
            .entry(bean_name.to_string())
            .or_default()
            .insert(dependent_bean_name.to_string());
    }

    fn create_inner_bean(&self, outer_bean_name: &str, definition: &BeanDefinition) -> ContainerResult<Value> {
        let bean = self.create_bean(definition.name(), definition, None)?;
        self.register_dependent_bean(definition.name(), outer_bean_name);
        Ok(bean)
    }

    fn type_registry(&self) -> &TypeRegistry {
        &self.registry
    }

    fn type_converter(&self) -> Arc<dyn TypeConverter> {
        Arc::clone(&self.type_converter)
    }

    fn parameter_name_discoverer(&self) -> Arc<dyn ParameterNameDiscoverer> {
        Arc::clone(&self.parameter_name_discoverer)
    }

    fn instantiation_strategy(&self) -> Arc<dyn InstantiationStrategy> {
        Arc::clone(&self.instantiation_strategy)
    }

    fn environment(&self) -> &Environment {
        &self.environment
    }
}

impl Default for DefaultBeanFactory {
    fn default() -> Self {
        Self::new(TypeRegistry::with_builtins())
    }
}

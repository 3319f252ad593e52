//! 构造函数与工厂方法解析
//!
//! 给定 Bean 定义中的参数声明和一组重载的构造函数/工厂方法，
//! 逐个尝试绑定参数，按权重选出唯一的最佳候选者并缓存结果。
//!
//! 选择规则：
//! - 候选者按公有优先、参数多的优先排序
//! - 参数数量少于最小参数数量的候选者直接跳过
//! - 单个候选者绑定失败时尝试下一个，最后一个也失败且尚无选中者时报告失败
//! - 权重严格更小的候选者替换当前最佳者，权重相同的记为歧义
//! - 严格模式下存在歧义时报错，宽松模式取第一个

use std::collections::HashSet;
use std::sync::Arc;

use crate::argument_values::{ConstructorArgumentValues, ValueDescriptor, ValueHolder};
use crate::arguments::{ArgumentsHolder, PreparedArgument};
use crate::constants::{ANY_TYPE, MAX_WEIGHT};
use crate::definition::{AutowireMode, BeanDefinition};
use crate::error::{ContainerError, ContainerResult};
use crate::executable::{sort_candidates, Executable, MethodParameter};
use crate::factory::{BeanFactory, DependencyDescriptor};
use crate::types::TypeRef;
use crate::value::Value;
use crate::value_resolver::BeanDefinitionValueResolver;

/// 参数来源
enum ArgumentSource<'v> {
    /// 由参数声明解析得到
    Resolved(&'v ConstructorArgumentValues),
    /// 调用方显式传入，参数数量必须完全一致
    Explicit(&'v [Value]),
}

/// 当前最佳候选者
struct Selection {
    executable: Arc<Executable>,
    holder: ArgumentsHolder,
    ambiguous: Vec<Arc<Executable>>,
}

/// 构造函数解析器
///
/// 每次实例化时创建，所有状态都在 Bean 定义的缓存槽和工厂中
pub struct ConstructorResolver<'a> {
    factory: &'a dyn BeanFactory,
}

impl<'a> ConstructorResolver<'a> {
    pub fn new(factory: &'a dyn BeanFactory) -> Self {
        Self { factory }
    }

    /// 通过构造函数实例化
    ///
    /// `chosen_constructors` 不为空时只在其中选择，并启用自动装配；
    /// `explicit_args` 不为空时跳过缓存，参数数量必须与候选者完全一致
    pub fn autowire_constructor(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
        chosen_constructors: Option<&[Arc<Executable>]>,
        explicit_args: Option<&[Value]>,
    ) -> ContainerResult<Value> {
        let (mut constructor_to_use, mut args_to_use) = match explicit_args {
            Some(args) => (None, Some(args.to_vec())),
            None => self.cached_resolution(bean_name, definition)?,
        };

        if constructor_to_use.is_none() || args_to_use.is_none() {
            let autowiring = chosen_constructors.is_some()
                || definition.autowire_mode() == AutowireMode::Constructor;

            let resolved_values;
            let (source, min_args) = match explicit_args {
                Some(args) => (ArgumentSource::Explicit(args), args.len()),
                None => {
                    let (values, min_args) = self.resolve_constructor_arguments(bean_name, definition)?;
                    resolved_values = values;
                    (ArgumentSource::Resolved(&resolved_values), min_args)
                }
            };

            let mut candidates: Vec<Arc<Executable>> = match chosen_constructors {
                Some(chosen) => chosen.to_vec(),
                None => {
                    let bean_type = definition.bean_type().ok_or_else(|| ContainerError::InvalidDefinition {
                        bean_name: bean_name.to_string(),
                        message: "bean definition declares neither a bean type nor a factory method".to_string(),
                    })?;
                    self.factory
                        .type_registry()
                        .candidate_constructors(bean_type, definition.is_non_public_access_allowed())
                }
            };
            sort_candidates(&mut candidates);
            tracing::trace!(
                "Resolving constructor of bean '{}' among {} candidate(s), at least {} argument(s)",
                bean_name,
                candidates.len(),
                min_args
            );

            let selection = self
                .select_candidate(bean_name, definition, &candidates, &source, min_args, autowiring)?
                .ok_or_else(|| ContainerError::NoMatchingCandidate {
                    bean_name: bean_name.to_string(),
                    message: "Could not resolve matching constructor (hint: specify index/type/name arguments for simple parameters to avoid type ambiguities)".to_string(),
                })?;

            if !selection.ambiguous.is_empty() {
                if !definition.is_lenient_constructor_resolution() {
                    return Err(ContainerError::AmbiguousCandidates {
                        bean_name: bean_name.to_string(),
                        kind: "constructor",
                        candidates: selection.ambiguous.iter().map(|c| c.to_string()).collect(),
                    });
                }
                tracing::debug!(
                    "Lenient resolution of bean '{}' picked {} among {} equally weighted constructors",
                    bean_name,
                    selection.executable,
                    selection.ambiguous.len()
                );
            }

            if explicit_args.is_none() {
                selection.holder.store_cache(definition, &selection.executable);
            }
            args_to_use = Some(selection.holder.arguments);
            constructor_to_use = Some(selection.executable);
        }

        let (Some(constructor), Some(args)) = (constructor_to_use, args_to_use) else {
            return Err(ContainerError::NoMatchingCandidate {
                bean_name: bean_name.to_string(),
                message: "Could not resolve matching constructor".to_string(),
            });
        };

        self.factory
            .instantiation_strategy()
            .instantiate_with_constructor(definition, &constructor, &args)
            .map_err(|e| ContainerError::InstantiationFailed {
                bean_name: bean_name.to_string(),
                message: format!("{:#}", e),
            })
    }

    /// 通过工厂方法实例化
    ///
    /// 设置了工厂 Bean 时在其类型上查找同名实例方法，否则在 Bean 类型上查找同名静态方法
    pub fn instantiate_using_factory_method(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
        explicit_args: Option<&[Value]>,
    ) -> ContainerResult<Value> {
        let (factory_bean, factory_type, is_static) = match definition.factory_bean_name() {
            Some(factory_bean_name) => {
                if factory_bean_name == bean_name {
                    return Err(ContainerError::InvalidDefinition {
                        bean_name: bean_name.to_string(),
                        message: "factory-bean reference points back to the same bean definition".to_string(),
                    });
                }
                let factory_bean = self.factory.get_bean(factory_bean_name)?;
                let factory_type = factory_bean.type_ref().ok_or_else(|| ContainerError::InstantiationFailed {
                    bean_name: bean_name.to_string(),
                    message: format!("factory-bean '{}' returned null", factory_bean_name),
                })?;
                (Some(factory_bean), factory_type, false)
            }
            None => {
                let bean_type = definition.bean_type().ok_or_else(|| ContainerError::InvalidDefinition {
                    bean_name: bean_name.to_string(),
                    message: "bean definition declares neither a bean type nor a factory-bean reference".to_string(),
                })?;
                (None, bean_type.clone(), true)
            }
        };

        let (mut factory_method_to_use, mut args_to_use) = match explicit_args {
            Some(args) => (None, Some(args.to_vec())),
            None => self.cached_resolution(bean_name, definition)?,
        };

        if factory_method_to_use.is_none() || args_to_use.is_none() {
            let mut candidates = self.factory_method_candidates(definition, &factory_type, is_static);
            sort_candidates(&mut candidates);
            let autowiring = definition.autowire_mode() == AutowireMode::Constructor;

            let resolved_values;
            let (source, min_args) = match explicit_args {
                Some(args) => (ArgumentSource::Explicit(args), args.len()),
                None => {
                    let (values, min_args) = self.resolve_constructor_arguments(bean_name, definition)?;
                    resolved_values = values;
                    (ArgumentSource::Resolved(&resolved_values), min_args)
                }
            };
            tracing::trace!(
                "Resolving factory method '{}' of bean '{}' among {} candidate(s)",
                definition.factory_method_name().unwrap_or_default(),
                bean_name,
                candidates.len()
            );

            let selection = self.select_candidate(bean_name, definition, &candidates, &source, min_args, autowiring)?;
            let Some(selection) = selection else {
                return Err(self.no_matching_factory_method(bean_name, definition, &source, min_args, is_static));
            };

            if selection.executable.returns_unit() {
                return Err(ContainerError::InvalidDefinition {
                    bean_name: bean_name.to_string(),
                    message: format!(
                        "Invalid factory method '{}': needs to have a non-unit return type",
                        definition.factory_method_name().unwrap_or_default()
                    ),
                });
            }
            if !selection.ambiguous.is_empty() {
                return Err(ContainerError::AmbiguousCandidates {
                    bean_name: bean_name.to_string(),
                    kind: "factory method",
                    candidates: selection.ambiguous.iter().map(|c| c.to_string()).collect(),
                });
            }

            if explicit_args.is_none() {
                selection.holder.store_cache(definition, &selection.executable);
            }
            args_to_use = Some(selection.holder.arguments);
            factory_method_to_use = Some(selection.executable);
        }

        let (Some(factory_method), Some(args)) = (factory_method_to_use, args_to_use) else {
            return Err(ContainerError::NoMatchingCandidate {
                bean_name: bean_name.to_string(),
                message: "No matching factory method found".to_string(),
            });
        };

        self.factory
            .instantiation_strategy()
            .instantiate_with_factory_method(definition, factory_bean.as_ref(), &factory_method, &args)
            .map_err(|e| ContainerError::InstantiationFailed {
                bean_name: bean_name.to_string(),
                message: format!("{:#}", e),
            })
    }

    /// 所有同名候选工厂方法签名相同时，把它记录到缓存槽中
    ///
    /// 只记录可执行体，参数仍需在实例化时解析
    pub fn resolve_factory_method_if_possible(&self, definition: &BeanDefinition) {
        let (factory_type, is_static) = match definition.factory_bean_name() {
            Some(factory_bean_name) if factory_bean_name == definition.name() => return,
            Some(factory_bean_name) => (self.factory.get_type(factory_bean_name), false),
            None => (definition.bean_type().cloned(), true),
        };
        let Some(factory_type) = factory_type else {
            return;
        };

        let mut unique: Option<Arc<Executable>> = None;
        for candidate in self.factory_method_candidates(definition, &factory_type, is_static) {
            match &unique {
                None => unique = Some(candidate),
                Some(existing) if existing.parameter_types() != candidate.parameter_types() => {
                    unique = None;
                    break;
                }
                Some(_) => {}
            }
        }

        if let Some(method) = &unique {
            tracing::debug!("Unique factory method {} found for bean '{}'", method, definition.name());
        }
        // 并发实例化可能已经写入了缓存
        let mut cache = definition.resolution();
        if cache.resolved_executable.is_none() {
            cache.resolved_executable = unique;
        }
    }

    /// 读取缓存；参数模板在释放锁之后重新解析
    fn cached_resolution(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
    ) -> ContainerResult<(Option<Arc<Executable>>, Option<Vec<Value>>)> {
        let (executable, resolved, prepared) = {
            let cache = definition.resolution();
            match &cache.resolved_executable {
                Some(executable) if cache.arguments_resolved => (
                    Some(Arc::clone(executable)),
                    cache.resolved_arguments.clone(),
                    cache.prepared_arguments.clone(),
                ),
                other => (other.clone(), None, None),
            }
        };

        let args = match (&executable, resolved, prepared) {
            (Some(_), Some(args), _) => Some(args),
            (Some(executable), None, Some(prepared)) => {
                Some(self.resolve_prepared_arguments(bean_name, executable, &prepared)?)
            }
            _ => None,
        };
        if let (Some(executable), Some(_)) = (&executable, &args) {
            tracing::debug!("Using cached {} for bean '{}'", executable, bean_name);
        }
        Ok((executable, args))
    }

    fn factory_method_candidates(
        &self,
        definition: &BeanDefinition,
        factory_type: &TypeRef,
        is_static: bool,
    ) -> Vec<Arc<Executable>> {
        let Some(method_name) = definition.factory_method_name() else {
            return Vec::new();
        };
        self.factory
            .type_registry()
            .candidate_methods(factory_type, definition.is_non_public_access_allowed())
            .into_iter()
            .filter(|m| m.is_static() == is_static && m.name() == method_name)
            .collect()
    }

    /// 遍历排序后的候选者，返回权重最小的一个
    fn select_candidate(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
        candidates: &[Arc<Executable>],
        source: &ArgumentSource<'_>,
        min_args: usize,
        autowiring: bool,
    ) -> ContainerResult<Option<Selection>> {
        let registry = self.factory.type_registry();
        let lenient = definition.is_lenient_constructor_resolution();
        let mut best: Option<Selection> = None;
        let mut min_weight = MAX_WEIGHT;
        let mut causes: Vec<ContainerError> = Vec::new();

        for (i, candidate) in candidates.iter().enumerate() {
            let param_count = candidate.parameter_count();

            // 已经选中的构造函数比剩下的都贪婪
            if candidate.is_constructor() {
                if let Some(selected) = &best {
                    if selected.holder.arguments.len() > param_count {
                        break;
                    }
                }
            }
            if param_count < min_args {
                continue;
            }

            let holder = match source {
                ArgumentSource::Resolved(values) => {
                    let attempt = self.parameter_names(bean_name, candidate).and_then(|names| {
                        self.create_argument_array(bean_name, values, candidate, names.as_deref(), autowiring)
                    });
                    match attempt {
                        Ok(holder) => holder,
                        Err(err) if err.is_unsatisfied_argument() => {
                            tracing::trace!("Ignoring {} of bean '{}': {}", candidate, bean_name, err);
                            if i == candidates.len() - 1 && best.is_none() {
                                for cause in &causes {
                                    tracing::warn!("Suppressed while creating bean '{}': {}", bean_name, cause);
                                }
                                return Err(err.with_suppressed(causes));
                            }
                            causes.push(err);
                            continue;
                        }
                        Err(err) => return Err(err),
                    }
                }
                ArgumentSource::Explicit(args) => {
                    if param_count != args.len() {
                        continue;
                    }
                    ArgumentsHolder::from_arguments(args.to_vec())
                }
            };

            let weight = if lenient {
                holder.type_difference_weight(registry, candidate.parameter_types())
            } else {
                holder.assignability_weight(registry, candidate.parameter_types())
            };
            tracing::trace!("Candidate {} of bean '{}' has weight {}", candidate, bean_name, weight);

            if weight < min_weight {
                min_weight = weight;
                best = Some(Selection {
                    executable: Arc::clone(candidate),
                    holder,
                    ambiguous: Vec::new(),
                });
            } else if let Some(selected) = best.as_mut() {
                if weight == min_weight && Self::is_ambiguous(&selected.executable, candidate, lenient) {
                    if selected.ambiguous.is_empty() {
                        selected.ambiguous.push(Arc::clone(&selected.executable));
                    }
                    selected.ambiguous.push(Arc::clone(candidate));
                }
            }
        }

        Ok(best)
    }

    /// 同权重的构造函数总是记为歧义；
    /// 工厂方法只在严格模式下、参数数量相同且参数类型不同时记为歧义
    fn is_ambiguous(selected: &Executable, candidate: &Executable, lenient: bool) -> bool {
        if candidate.is_constructor() {
            return true;
        }
        !lenient
            && selected.parameter_count() == candidate.parameter_count()
            && selected.parameter_types() != candidate.parameter_types()
    }

    /// 显式声明的参数名称优先，否则使用参数名发现
    fn parameter_names(&self, bean_name: &str, candidate: &Executable) -> ContainerResult<Option<Vec<String>>> {
        if let Some(names) = candidate.constructor_properties() {
            if names.len() != candidate.parameter_count() {
                return Err(ContainerError::InvalidDefinition {
                    bean_name: bean_name.to_string(),
                    message: format!(
                        "{} declares {} constructor property name(s) but has {} parameter(s)",
                        candidate,
                        names.len(),
                        candidate.parameter_count()
                    ),
                });
            }
            return Ok(Some(names.to_vec()));
        }
        Ok(self.factory.parameter_name_discoverer().parameter_names(candidate))
    }

    /// 解析参数声明中的所有值，返回解析后的声明和最小参数数量
    fn resolve_constructor_arguments(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
    ) -> ContainerResult<(ConstructorArgumentValues, usize)> {
        let declared = definition.constructor_arguments();
        let value_resolver = BeanDefinitionValueResolver::new(self.factory, bean_name);
        let resolve = |holder: &ValueHolder| -> ContainerResult<ValueHolder> {
            if holder.is_converted() {
                return Ok(holder.clone());
            }
            let value = value_resolver.resolve_value_if_necessary(holder.value())?;
            Ok(ValueHolder::resolved_from(holder, value))
        };

        let mut min_args = declared.argument_count();
        let mut resolved = ConstructorArgumentValues::new();
        for (&index, holder) in declared.indexed_values() {
            // 只有严格大于当前最小值的位置才会抬高最小值
            if index > min_args {
                min_args = index + 1;
            }
            resolved.add_indexed(index, resolve(holder)?);
        }
        for holder in declared.generic_values() {
            resolved.add_generic(resolve(holder)?);
        }
        Ok((resolved, min_args))
    }

    /// 为单个候选者绑定参数
    fn create_argument_array(
        &self,
        bean_name: &str,
        resolved: &ConstructorArgumentValues,
        candidate: &Executable,
        param_names: Option<&[String]>,
        autowiring: bool,
    ) -> ContainerResult<ArgumentsHolder> {
        let registry = self.factory.type_registry();
        let converter = self.factory.type_converter();
        let mut args = ArgumentsHolder::with_size(candidate.parameter_count());
        let mut used = HashSet::new();
        let mut autowired_bean_names: Vec<String> = Vec::new();

        for (index, param_type) in candidate.parameter_types().iter().enumerate() {
            let param = MethodParameter::new(candidate, index);
            let param_name = param_names.and_then(|names| names.get(index)).map(String::as_str);

            let mut found = resolved.get_argument_value(index, param_type, param_name, &used, registry);
            if found.is_none() && !autowiring {
                found = resolved.next_untyped_generic(&used);
            }

            match found {
                Some((slot, holder)) => {
                    used.insert(slot);
                    let original = holder.resolved_value().cloned().unwrap_or(Value::Null);
                    match holder.converted_value() {
                        Some(converted) => {
                            args.prepared[index] = PreparedArgument::Converted(converted.clone());
                            args.arguments[index] = converted.clone();
                        }
                        None => {
                            let converted = converter
                                .convert_if_necessary(&original, param_type, Some(&param))
                                .map_err(|e| {
                                    unsatisfied(
                                        bean_name,
                                        &param,
                                        format!(
                                            "Could not convert {} argument value of type [{}] to required type [{}]: {}",
                                            param.kind(),
                                            original.type_name(),
                                            param_type,
                                            e
                                        ),
                                    )
                                })?;
                            let source = holder
                                .source()
                                .cloned()
                                .unwrap_or_else(|| ValueDescriptor::Literal(original.clone()));
                            args.prepared[index] = PreparedArgument::Deferred(source);
                            args.resolve_necessary = true;
                            args.arguments[index] = converted;
                        }
                    }
                    args.raw[index] = original;
                }
                None if !autowiring => {
                    return Err(unsatisfied(
                        bean_name,
                        &param,
                        format!(
                            "Ambiguous {kind} argument types - did you specify the correct bean references as {kind} arguments?",
                            kind = param.kind()
                        ),
                    ));
                }
                None => {
                    let autowired = self
                        .resolve_autowired_argument(&param, param_name, bean_name, &mut autowired_bean_names)
                        .map_err(|e| unsatisfied(bean_name, &param, e.to_string()))?;
                    args.raw[index] = autowired.clone();
                    args.arguments[index] = autowired;
                    args.prepared[index] = PreparedArgument::Autowired;
                    args.resolve_necessary = true;
                }
            }
        }

        let mut registered = HashSet::new();
        for autowired in autowired_bean_names.iter().filter(|n| registered.insert(n.as_str())) {
            self.factory.register_dependent_bean(autowired, bean_name);
            tracing::debug!(
                "Autowiring by type from bean name '{}' via {} to bean named '{}'",
                bean_name,
                if candidate.is_constructor() { "constructor" } else { "factory method" },
                autowired
            );
        }

        Ok(args)
    }

    /// 按缓存的参数模板重新解析参数
    fn resolve_prepared_arguments(
        &self,
        bean_name: &str,
        executable: &Executable,
        prepared: &[PreparedArgument],
    ) -> ContainerResult<Vec<Value>> {
        let value_resolver = BeanDefinitionValueResolver::new(self.factory, bean_name);
        let converter = self.factory.type_converter();
        let names = executable
            .constructor_properties()
            .or_else(|| executable.parameter_names());
        let any = TypeRef::new(ANY_TYPE);

        prepared
            .iter()
            .enumerate()
            .map(|(index, argument)| {
                let param = MethodParameter::new(executable, index);
                let param_type = param.parameter_type().unwrap_or(&any);
                let value = match argument {
                    PreparedArgument::Autowired => {
                        let param_name = names.and_then(|n| n.get(index)).map(String::as_str);
                        self.resolve_autowired_argument(&param, param_name, bean_name, &mut Vec::new())?
                    }
                    PreparedArgument::Deferred(descriptor) => value_resolver.resolve_value_if_necessary(descriptor)?,
                    PreparedArgument::Converted(Value::Str(s)) if s.contains("${") => {
                        self.factory.environment().resolve_expression(s)?
                    }
                    PreparedArgument::Converted(value) => value.clone(),
                };
                converter
                    .convert_if_necessary(&value, param_type, Some(&param))
                    .map_err(|e| {
                        unsatisfied(
                            bean_name,
                            &param,
                            format!(
                                "Could not convert {} argument value of type [{}] to required type [{}]: {}",
                                param.kind(),
                                value.type_name(),
                                param_type,
                                e
                            ),
                        )
                    })
            })
            .collect()
    }

    fn resolve_autowired_argument(
        &self,
        param: &MethodParameter<'_>,
        param_name: Option<&str>,
        bean_name: &str,
        autowired_bean_names: &mut Vec<String>,
    ) -> ContainerResult<Value> {
        let descriptor = DependencyDescriptor::for_parameter(param, param_name);
        self.factory
            .resolve_dependency(&descriptor, bean_name, autowired_bean_names)
    }

    fn no_matching_factory_method(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
        source: &ArgumentSource<'_>,
        min_args: usize,
        is_static: bool,
    ) -> ContainerError {
        let arg_types: Vec<String> = match source {
            ArgumentSource::Explicit(args) => args
                .iter()
                .map(|a| a.type_ref().map(|t| t.simple_name().to_string()).unwrap_or_else(|| "null".to_string()))
                .collect(),
            ArgumentSource::Resolved(values) => values
                .indexed_values()
                .values()
                .chain(values.generic_values())
                .map(|holder| match (holder.declared_type(), holder.resolved_value()) {
                    (Some(declared), _) => TypeRef::new(declared).simple_name().to_string(),
                    (None, Some(value)) => value
                        .type_ref()
                        .map(|t| t.simple_name().to_string())
                        .unwrap_or_else(|| "null".to_string()),
                    (None, None) => "null".to_string(),
                })
                .collect(),
        };

        let factory_bean = definition
            .factory_bean_name()
            .map(|name| format!("factory bean '{}'; ", name))
            .unwrap_or_default();
        ContainerError::NoMatchingCandidate {
            bean_name: bean_name.to_string(),
            message: format!(
                "No matching factory method found: {}factory method '{}({})'. Check that a method with the specified name {}exists and that it is {}.",
                factory_bean,
                definition.factory_method_name().unwrap_or_default(),
                arg_types.join(","),
                if min_args > 0 { "and arguments " } else { "" },
                if is_static { "static" } else { "non-static" }
            ),
        }
    }
}

fn unsatisfied(bean_name: &str, param: &MethodParameter<'_>, message: String) -> ContainerError {
    ContainerError::UnsatisfiedArgument {
        bean_name: bean_name.to_string(),
        kind: param.kind(),
        index: param.index,
        parameter_type: param
            .parameter_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| ANY_TYPE.to_string()),
        candidate: param.executable.to_string(),
        message,
        suppressed: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::bean_factory::DefaultBeanFactory;
    use crate::config::{ConfigValue, MapPropertySource};
    use crate::definition::Scope;
    use crate::executable::{ConstructedInstance, ParameterNameDiscoverer};
    use crate::types::{TypeInfo, TypeRegistry};

    fn client(args: &[Value]) -> anyhow::Result<Value> {
        Ok(Value::object("Client", args.to_vec()))
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::with_builtins();
        registry
            .register(
                TypeInfo::class("Logger")
                    .constructor(Executable::constructor(vec!["String".into()]))
                    .constructor(Executable::constructor(vec!["String".into(), "String".into()])),
            )
            .register(
                TypeInfo::class("Printer")
                    .constructor(Executable::constructor(vec!["Any".into(), "String".into()]))
                    .constructor(Executable::constructor(vec!["String".into(), "Any".into()])),
            )
            .register(
                TypeInfo::class("Parser")
                    .constructor(Executable::constructor(vec!["i32".into()]))
                    .constructor(Executable::constructor(vec!["String".into()])),
            )
            .register(
                TypeInfo::class("Vault")
                    .constructor(Executable::constructor(vec![]))
                    .constructor(Executable::constructor(vec!["String".into()]).non_public()),
            )
            .register(
                TypeInfo::class("Broken")
                    .constructor(Executable::constructor(vec!["String".into()]).with_constructor_properties(["a", "b"])),
            )
            .register(TypeInfo::class("Client"))
            .register(
                TypeInfo::class("Clients")
                    .method(
                        Executable::static_method("create", vec!["String".into()])
                            .returns("Client")
                            .with_invoker(|_, args| client(args)),
                    )
                    .method(
                        Executable::static_method("create", vec!["Any".into()])
                            .returns("Client")
                            .with_invoker(|_, args| client(args)),
                    )
                    .method(Executable::static_method("init", vec![])),
            )
            .register(
                TypeInfo::class("ClientFactory")
                    .constructor(Executable::constructor(vec![]))
                    .method(Executable::method("build", vec![]).returns("Client").with_invoker(|target, args| {
                        anyhow::ensure!(target.is_some(), "factory instance missing");
                        client(args)
                    })),
            );
        registry
    }

    fn factory() -> DefaultBeanFactory {
        DefaultBeanFactory::new(registry())
    }

    fn constructed_args(bean: &Value) -> Vec<Value> {
        bean.as_object()
            .and_then(|o| o.downcast_ref::<ConstructedInstance>())
            .map(|instance| instance.arguments.clone())
            .unwrap_or_default()
    }

    fn client_args(bean: &Value) -> Vec<Value> {
        bean.as_object()
            .and_then(|o| o.downcast_ref::<Vec<Value>>())
            .cloned()
            .unwrap_or_default()
    }

    fn logger() -> BeanDefinition {
        BeanDefinition::of_type("logger", "Logger")
            .with_indexed_argument(0, ValueHolder::literal("svc"))
            .with_generic_argument(ValueHolder::literal("v2"))
    }

    struct CountingDiscoverer(AtomicUsize);

    impl ParameterNameDiscoverer for CountingDiscoverer {
        fn parameter_names(&self, executable: &Executable) -> Option<Vec<String>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            executable.parameter_names().map(<[String]>::to_vec)
        }
    }

    #[test]
    fn test_greediest_matching_constructor_wins() {
        let factory = factory();
        factory.register_bean_definition(logger()).unwrap();

        let bean = factory.get_bean("logger").unwrap();
        assert_eq!(bean.type_name(), "Logger");
        assert_eq!(constructed_args(&bean), vec![Value::from("svc"), Value::from("v2")]);

        let cached = factory.get_bean_definition("logger").unwrap().resolved_executable().unwrap();
        assert_eq!(cached.parameter_count(), 2);
    }

    #[test]
    fn test_index_equal_to_argument_count_does_not_raise_minimum() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("logger", "Logger").with_indexed_argument(1, ValueHolder::literal("x")),
            )
            .unwrap();

        // 两个候选者都会被尝试，最后一个的失败带上前一个的失败原因
        let err = factory.get_bean("logger").unwrap_err();
        assert!(err.is_unsatisfied_argument());
        assert_eq!(err.suppressed().len(), 1);
        match &err {
            ContainerError::UnsatisfiedArgument { candidate, message, .. } => {
                assert_eq!(candidate, "Logger(String)");
                assert!(message.contains("Ambiguous constructor argument types"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_candidates_below_minimum_are_skipped() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("logger", "Logger").with_indexed_argument(3, ValueHolder::literal("x")),
            )
            .unwrap();

        let err = factory.get_bean("logger").unwrap_err();
        assert!(matches!(err, ContainerError::NoMatchingCandidate { .. }));
        assert!(err.to_string().contains("Could not resolve matching constructor"));
    }

    #[test]
    fn test_lenient_tie_picks_first_candidate() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("printer", "Printer")
                    .with_generic_argument(ValueHolder::literal("a"))
                    .with_generic_argument(ValueHolder::literal("b")),
            )
            .unwrap();

        factory.get_bean("printer").unwrap();
        let chosen = factory.get_bean_definition("printer").unwrap().resolved_executable().unwrap();
        assert_eq!(chosen.to_string(), "Printer(Any, String)");
    }

    #[test]
    fn test_strict_tie_is_ambiguous() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("printer", "Printer")
                    .with_lenient_constructor_resolution(false)
                    .with_generic_argument(ValueHolder::literal("a"))
                    .with_generic_argument(ValueHolder::literal("b")),
            )
            .unwrap();

        match factory.get_bean("printer").unwrap_err() {
            ContainerError::AmbiguousCandidates { kind, candidates, .. } => {
                assert_eq!(kind, "constructor");
                assert_eq!(candidates, vec!["Printer(Any, String)", "Printer(String, Any)"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_raw_type_match_beats_conversion() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("parser", "Parser").with_generic_argument(ValueHolder::literal("42")),
            )
            .unwrap();

        let bean = factory.get_bean("parser").unwrap();
        assert_eq!(constructed_args(&bean), vec![Value::from("42")]);
    }

    #[test]
    fn test_typed_argument_is_converted() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("parser", "Parser")
                    .with_generic_argument(ValueHolder::literal("42").with_type("i32")),
            )
            .unwrap();

        let bean = factory.get_bean("parser").unwrap();
        assert_eq!(constructed_args(&bean), vec![Value::Int(42)]);
    }

    #[test]
    fn test_cached_resolution_skips_scan() {
        let discoverer = Arc::new(CountingDiscoverer(AtomicUsize::new(0)));
        let factory = factory().with_parameter_name_discoverer(discoverer.clone());
        factory.register_bean_definition(logger().with_scope(Scope::Prototype)).unwrap();

        let first = factory.get_bean("logger").unwrap();
        let second = factory.get_bean("logger").unwrap();
        assert_ne!(first, second);
        assert_eq!(constructed_args(&first), constructed_args(&second));
        assert_eq!(discoverer.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cached_template_re_resolves_expressions() {
        let factory = factory();
        factory.environment().add_property_source(Box::new(
            MapPropertySource::new("defaults").with_property("app.name", ConfigValue::String("demo".to_string())),
        ));
        factory
            .register_bean_definition(
                BeanDefinition::of_type("logger", "Logger")
                    .with_scope(Scope::Prototype)
                    .with_indexed_argument(0, ValueHolder::new(ValueDescriptor::expression("${app.name}"))),
            )
            .unwrap();

        let first = factory.get_bean("logger").unwrap();
        assert_eq!(constructed_args(&first), vec![Value::from("demo")]);

        factory.environment().add_property_source(Box::new(
            MapPropertySource::new("overrides")
                .with_priority(90)
                .with_property("app.name", ConfigValue::String("prod".to_string())),
        ));
        let second = factory.get_bean("logger").unwrap();
        assert_eq!(constructed_args(&second), vec![Value::from("prod")]);
    }

    #[test]
    fn test_explicit_arguments_need_exact_arity_and_are_not_cached() {
        let factory = factory();
        factory.register_bean_definition(BeanDefinition::of_type("logger", "Logger")).unwrap();

        let bean = factory.get_bean_with_args("logger", &[Value::from("a")]).unwrap();
        assert_eq!(constructed_args(&bean), vec![Value::from("a")]);
        assert!(factory.get_bean_definition("logger").unwrap().resolved_executable().is_none());

        let err = factory
            .get_bean_with_args("logger", &[Value::from("a"), Value::from("b"), Value::from("c")])
            .unwrap_err();
        assert!(matches!(err, ContainerError::NoMatchingCandidate { .. }));
    }

    #[test]
    fn test_non_public_constructors_can_be_excluded() {
        let factory = factory();
        factory
            .register_bean_definition(BeanDefinition::of_type("open", "Vault").with_generic_argument(ValueHolder::literal("k")))
            .unwrap();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("sealed", "Vault")
                    .with_non_public_access_allowed(false)
                    .with_generic_argument(ValueHolder::literal("k")),
            )
            .unwrap();

        assert_eq!(constructed_args(&factory.get_bean("open").unwrap()), vec![Value::from("k")]);
        assert!(matches!(
            factory.get_bean("sealed"),
            Err(ContainerError::NoMatchingCandidate { .. })
        ));
    }

    #[test]
    fn test_constructor_properties_must_match_parameters() {
        let factory = factory();
        factory
            .register_bean_definition(BeanDefinition::of_type("broken", "Broken").with_generic_argument(ValueHolder::literal("x")))
            .unwrap();
        assert!(matches!(
            factory.get_bean("broken"),
            Err(ContainerError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_missing_bean_type() {
        let factory = factory();
        factory.register_bean_definition(BeanDefinition::new("nothing")).unwrap();
        assert!(matches!(
            factory.get_bean("nothing"),
            Err(ContainerError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_static_factory_method() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("client", "Clients")
                    .with_factory_method("create")
                    .with_generic_argument(ValueHolder::literal("http")),
            )
            .unwrap();

        let bean = factory.get_bean("client").unwrap();
        assert_eq!(bean.type_name(), "Client");
        assert_eq!(client_args(&bean), vec![Value::from("http")]);
        let chosen = factory.get_bean_definition("client").unwrap().resolved_executable().unwrap();
        assert_eq!(chosen.to_string(), "static Clients::create(String)");
    }

    #[test]
    fn test_strict_factory_method_tie_is_ambiguous() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("client", "Clients")
                    .with_factory_method("create")
                    .with_lenient_constructor_resolution(false)
                    .with_generic_argument(ValueHolder::literal("http")),
            )
            .unwrap();

        match factory.get_bean("client").unwrap_err() {
            ContainerError::AmbiguousCandidates { kind, candidates, .. } => {
                assert_eq!(kind, "factory method");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_instance_factory_method() {
        let factory = factory();
        factory.register_bean_definition(BeanDefinition::of_type("factory", "ClientFactory")).unwrap();
        factory
            .register_bean_definition(BeanDefinition::new("client").with_factory_bean("factory").with_factory_method("build"))
            .unwrap();

        assert_eq!(factory.get_type("client"), Some(TypeRef::new("Client")));
        let bean = factory.get_bean("client").unwrap();
        assert_eq!(bean.type_name(), "Client");
    }

    #[test]
    fn test_factory_bean_pointing_to_itself() {
        let factory = factory();
        factory
            .register_bean_definition(BeanDefinition::new("client").with_factory_bean("client").with_factory_method("build"))
            .unwrap();
        assert!(matches!(
            factory.get_bean("client"),
            Err(ContainerError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_unit_factory_method_is_rejected() {
        let factory = factory();
        factory
            .register_bean_definition(BeanDefinition::of_type("init", "Clients").with_factory_method("init"))
            .unwrap();
        let err = factory.get_bean("init").unwrap_err();
        assert!(matches!(err, ContainerError::InvalidDefinition { .. }));
        assert!(err.to_string().contains("non-unit return type"));
    }

    #[test]
    fn test_missing_factory_method_message() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("client", "Clients")
                    .with_factory_method("missing")
                    .with_generic_argument(ValueHolder::literal("a")),
            )
            .unwrap();

        let message = factory.get_bean("client").unwrap_err().to_string();
        assert!(message.contains("factory method 'missing(String)'"));
        assert!(message.contains("and arguments exists and that it is static"));
    }

    #[test]
    fn test_resolve_factory_method_if_possible() {
        let factory = factory();
        let overloaded = BeanDefinition::of_type("client", "Clients").with_factory_method("create");
        let unique = BeanDefinition::new("built").with_factory_bean("factory").with_factory_method("build");
        factory.register_bean_definition(BeanDefinition::of_type("factory", "ClientFactory")).unwrap();

        let resolver = ConstructorResolver::new(&factory);
        resolver.resolve_factory_method_if_possible(&overloaded);
        resolver.resolve_factory_method_if_possible(&unique);

        assert!(overloaded.resolved_executable().is_none());
        assert_eq!(unique.resolved_executable().map(|m| m.to_string()), Some("ClientFactory::build()".to_string()));
        // 只记录可执行体，参数尚未解析
        assert!(!unique.resolution().arguments_resolved);
    }

    #[test]
    fn test_resolve_factory_method_keeps_cached_executable() {
        let factory = factory();
        factory
            .register_bean_definition(
                BeanDefinition::of_type("client", "Clients")
                    .with_factory_method("create")
                    .with_generic_argument(ValueHolder::literal("http")),
            )
            .unwrap();
        factory.get_bean("client").unwrap();

        let definition = factory.get_bean_definition("client").unwrap();
        ConstructorResolver::new(&factory).resolve_factory_method_if_possible(&definition);

        // 重载的 create 没有唯一签名，但已缓存的选择不受影响
        assert_eq!(
            definition.resolved_executable().map(|m| m.to_string()),
            Some("static Clients::create(String)".to_string())
        );
        assert!(definition.resolution().arguments_resolved);
    }

    #[test]
    fn test_self_referencing_factory_bean_has_no_type() {
        let factory = factory();
        let definition = BeanDefinition::new("client").with_factory_bean("client").with_factory_method("build");
        ConstructorResolver::new(&factory).resolve_factory_method_if_possible(&definition);
        assert!(definition.resolved_executable().is_none());

        factory.register_bean_definition(definition).unwrap();
        assert_eq!(factory.get_type("client"), None);
        assert!(matches!(
            factory.get_bean("client"),
            Err(ContainerError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_mutual_factory_beans_have_no_type() {
        let factory = factory();
        factory
            .register_bean_definition(BeanDefinition::new("left").with_factory_bean("right").with_factory_method("build"))
            .unwrap();
        factory
            .register_bean_definition(BeanDefinition::new("right").with_factory_bean("left").with_factory_method("build"))
            .unwrap();

        assert_eq!(factory.get_type("left"), None);
        assert_eq!(factory.get_type("right"), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_prototype_resolution() {
        let factory = Arc::new(factory());
        factory.register_bean_definition(logger().with_scope(Scope::Prototype)).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let factory = Arc::clone(&factory);
                tokio::task::spawn_blocking(move || factory.get_bean("logger"))
            })
            .collect();

        for handle in handles {
            let bean = handle.await.unwrap().unwrap();
            assert_eq!(constructed_args(&bean), vec![Value::from("svc"), Value::from("v2")]);
        }
        let cached = factory.get_bean_definition("logger").unwrap().resolved_executable().unwrap();
        assert_eq!(cached.parameter_count(), 2);
    }
}

//! 构造参数声明
//!
//! 一组按位置索引的参数槽加一组无序的通用参数槽，
//! 每个槽保存原始值描述、可选的声明类型和名称

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::definition::BeanDefinition;
use crate::types::{TypeRef, TypeRegistry};
use crate::value::Value;

/// 原始值描述
#[derive(Debug, Clone)]
pub enum ValueDescriptor {
    /// 字面量
    Literal(Value),
    /// 带目标类型的字符串，在解析时转换
    TypedString { value: String, target_type: TypeRef },
    /// 对另一个 Bean 的引用
    Reference(String),
    /// 内嵌的 Bean 定义
    Nested(Arc<BeanDefinition>),
    /// 包含 `${...}` 占位符的表达式
    Expression(String),
    /// 元素逐个解析的列表
    List(Vec<ValueDescriptor>),
}

impl ValueDescriptor {
    pub fn literal(value: impl Into<Value>) -> Self {
        ValueDescriptor::Literal(value.into())
    }

    pub fn reference(bean_name: impl Into<String>) -> Self {
        ValueDescriptor::Reference(bean_name.into())
    }

    pub fn expression(expression: impl Into<String>) -> Self {
        ValueDescriptor::Expression(expression.into())
    }

    pub fn typed_string(value: impl Into<String>, target_type: impl Into<TypeRef>) -> Self {
        ValueDescriptor::TypedString {
            value: value.into(),
            target_type: target_type.into(),
        }
    }
}

impl fmt::Display for ValueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDescriptor::Literal(value) => write!(f, "{}", value),
            ValueDescriptor::TypedString { value, target_type } => {
                write!(f, "\"{}\" as {}", value, target_type)
            }
            ValueDescriptor::Reference(name) => write!(f, "ref '{}'", name),
            ValueDescriptor::Nested(definition) => write!(f, "inner bean '{}'", definition.name()),
            ValueDescriptor::Expression(expression) => f.write_str(expression),
            ValueDescriptor::List(items) => write!(f, "list of {} element(s)", items.len()),
        }
    }
}

/// 参数槽
#[derive(Debug, Clone)]
pub struct ValueHolder {
    value: ValueDescriptor,
    declared_type: Option<String>,
    name: Option<String>,
    converted_value: Option<Value>,
    source: Option<ValueDescriptor>,
}

impl ValueHolder {
    pub fn new(value: ValueDescriptor) -> Self {
        Self {
            value,
            declared_type: None,
            name: None,
            converted_value: None,
            source: None,
        }
    }

    /// 字面量参数
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(ValueDescriptor::literal(value))
    }

    /// 已经转换好的参数，绑定时不再转换
    pub fn converted(value: impl Into<Value>) -> Self {
        let value = value.into();
        let mut holder = Self::new(ValueDescriptor::Literal(value.clone()));
        holder.converted_value = Some(value);
        holder
    }

    /// 声明参数类型
    pub fn with_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    /// 声明参数名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 由原始槽解析得到的新槽，保留声明信息并记录来源
    pub(crate) fn resolved_from(original: &ValueHolder, value: Value) -> Self {
        Self {
            value: ValueDescriptor::Literal(value),
            declared_type: original.declared_type.clone(),
            name: original.name.clone(),
            converted_value: None,
            source: Some(original.value.clone()),
        }
    }

    pub fn value(&self) -> &ValueDescriptor {
        &self.value
    }

    /// 已解析的值；只有字面量槽有值
    pub fn resolved_value(&self) -> Option<&Value> {
        match &self.value {
            ValueDescriptor::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_converted(&self) -> bool {
        self.converted_value.is_some()
    }

    pub fn converted_value(&self) -> Option<&Value> {
        self.converted_value.as_ref()
    }

    /// 解析前的原始描述
    pub fn source(&self) -> Option<&ValueDescriptor> {
        self.source.as_ref()
    }

    fn name_matches(&self, required_name: Option<&str>) -> bool {
        match (&self.name, required_name) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(name), Some(required)) => required.is_empty() || required == name,
        }
    }
}

/// 参数槽标识，用于记录已被占用的槽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    Indexed(usize),
    Generic(usize),
}

/// 声明的类型是否与形参类型兼容：名称相同，或任一方向可赋值
pub fn matches_declared_type(registry: &TypeRegistry, required: &TypeRef, declared: &str) -> bool {
    if registry.matches_type_name(required, declared) {
        return true;
    }
    let declared = TypeRef::new(declared);
    registry.is_assignable(required, &declared) || registry.is_assignable(&declared, required)
}

/// 构造参数声明
#[derive(Debug, Clone, Default)]
pub struct ConstructorArgumentValues {
    indexed: BTreeMap<usize, ValueHolder>,
    generic: Vec<ValueHolder>,
}

impl ConstructorArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加位置参数，同一位置重复添加时后者覆盖前者
    pub fn add_indexed(&mut self, index: usize, holder: ValueHolder) {
        self.indexed.insert(index, holder);
    }

    pub fn add_generic(&mut self, holder: ValueHolder) {
        self.generic.push(holder);
    }

    pub fn indexed_values(&self) -> &BTreeMap<usize, ValueHolder> {
        &self.indexed
    }

    pub fn generic_values(&self) -> &[ValueHolder] {
        &self.generic
    }

    /// 声明的参数总数
    pub fn argument_count(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.argument_count() == 0
    }

    /// 查找指定位置的位置参数
    pub fn get_indexed(
        &self,
        index: usize,
        required_type: &TypeRef,
        required_name: Option<&str>,
        registry: &TypeRegistry,
    ) -> Option<&ValueHolder> {
        let holder = self.indexed.get(&index)?;
        let type_ok = holder
            .declared_type()
            .map(|declared| matches_declared_type(registry, required_type, declared))
            .unwrap_or(true);
        (type_ok && holder.name_matches(required_name)).then_some(holder)
    }

    /// 查找第一个匹配的未占用通用参数
    ///
    /// 声明了名称的槽按名称匹配，声明了类型的槽按类型匹配，
    /// 两者都未声明时要求值可以直接赋给形参类型
    pub fn get_generic(
        &self,
        required_type: &TypeRef,
        required_name: Option<&str>,
        used: &HashSet<SlotId>,
        registry: &TypeRegistry,
    ) -> Option<(SlotId, &ValueHolder)> {
        self.generic
            .iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(&SlotId::Generic(*i)))
            .find(|(_, holder)| {
                if !holder.name_matches(required_name) {
                    return false;
                }
                if let Some(declared) = holder.declared_type() {
                    return matches_declared_type(registry, required_type, declared);
                }
                if holder.name().is_none() {
                    return match holder.resolved_value() {
                        Some(value) => registry.is_assignable_value(required_type, value),
                        None => false,
                    };
                }
                true
            })
            .map(|(i, holder)| (SlotId::Generic(i), holder))
    }

    /// 位置参数优先，其次通用参数
    pub fn get_argument_value(
        &self,
        index: usize,
        required_type: &TypeRef,
        required_name: Option<&str>,
        used: &HashSet<SlotId>,
        registry: &TypeRegistry,
    ) -> Option<(SlotId, &ValueHolder)> {
        match self.get_indexed(index, required_type, required_name, registry) {
            Some(holder) => Some((SlotId::Indexed(index), holder)),
            None => self.get_generic(required_type, required_name, used, registry),
        }
    }

    /// 未占用且既无名称也无类型的下一个通用参数，用于非自动装配时的兜底
    pub fn next_untyped_generic(&self, used: &HashSet<SlotId>) -> Option<(SlotId, &ValueHolder)> {
        self.generic
            .iter()
            .enumerate()
            .find(|(i, holder)| {
                !used.contains(&SlotId::Generic(*i))
                    && holder.name().is_none()
                    && holder.declared_type().is_none()
            })
            .map(|(i, holder)| (SlotId::Generic(i), holder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInfo;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::with_builtins();
        registry
            .register(TypeInfo::interface("Repository"))
            .register(TypeInfo::class("app::JdbcRepository").implements("Repository"));
        registry
    }

    #[test]
    fn test_indexed_slot_checks_declared_name_and_type() {
        let registry = registry();
        let mut args = ConstructorArgumentValues::new();
        args.add_indexed(0, ValueHolder::literal("svc").with_type("String").with_name("service"));

        let string = TypeRef::new("String");
        assert!(args.get_indexed(0, &string, Some("service"), &registry).is_some());
        // 参数名称未知时接受
        assert!(args.get_indexed(0, &string, Some(""), &registry).is_some());
        assert!(args.get_indexed(0, &string, Some("other"), &registry).is_none());
        assert!(args.get_indexed(0, &string, None, &registry).is_none());
        assert!(args.get_indexed(0, &TypeRef::new("i32"), Some("service"), &registry).is_none());
        assert!(args.get_indexed(1, &string, Some("service"), &registry).is_none());
    }

    #[test]
    fn test_generic_slots_are_consumed_in_order() {
        let registry = registry();
        let mut args = ConstructorArgumentValues::new();
        args.add_generic(ValueHolder::literal("a"));
        args.add_generic(ValueHolder::literal("b"));

        let string = TypeRef::new("String");
        let mut used = HashSet::new();
        let (first, holder) = args.get_generic(&string, None, &used, &registry).unwrap();
        assert_eq!(holder.resolved_value(), Some(&Value::from("a")));
        used.insert(first);
        let (_, holder) = args.get_generic(&string, None, &used, &registry).unwrap();
        assert_eq!(holder.resolved_value(), Some(&Value::from("b")));
    }

    #[test]
    fn test_generic_untyped_slot_requires_assignable_value() {
        let registry = registry();
        let mut args = ConstructorArgumentValues::new();
        args.add_generic(ValueHolder::literal("42"));

        let used = HashSet::new();
        assert!(args.get_generic(&TypeRef::new("i32"), None, &used, &registry).is_none());
        // 兜底规则不检查可赋值性
        assert!(args.next_untyped_generic(&used).is_some());
    }

    #[test]
    fn test_declared_type_matches_by_simple_name_or_hierarchy() {
        let registry = registry();
        let jdbc = TypeRef::new("app::JdbcRepository");
        assert!(matches_declared_type(&registry, &jdbc, "JdbcRepository"));
        assert!(matches_declared_type(&registry, &TypeRef::new("Repository"), "app::JdbcRepository"));
        assert!(matches_declared_type(&registry, &jdbc, "Repository"));
        assert!(!matches_declared_type(&registry, &jdbc, "String"));
    }

    #[test]
    fn test_named_generic_slot() {
        let registry = registry();
        let mut args = ConstructorArgumentValues::new();
        args.add_generic(ValueHolder::literal("v2").with_name("version"));
        let used = HashSet::new();
        let string = TypeRef::new("String");

        assert!(args.get_generic(&string, Some("version"), &used, &registry).is_some());
        assert!(args.get_generic(&string, Some("name"), &used, &registry).is_none());
        assert!(args.get_generic(&string, None, &used, &registry).is_none());
        assert!(args.next_untyped_generic(&used).is_none());
        assert_eq!(args.argument_count(), 1);
    }
}

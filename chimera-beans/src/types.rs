//! 类型注册表
//!
//! Rust 没有运行时反射，解析器所需的类型信息（父类、接口、构造函数、方法）
//! 在加载 Bean 定义时一次性登记到 [`TypeRegistry`]，之后的每次解析只查询注册表。

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::constants::{
    self, ANY_TYPE, INTERFACE_WEIGHT, LIST_TYPE, MAX_WEIGHT, STRING_TYPE, SUPERCLASS_HOP_WEIGHT,
};
use crate::executable::{Executable, Visibility};
use crate::value::Value;

/// 类型标识
///
/// 以完整类型名称标识一个类型，例如 `app::service::UserService`
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(Arc<str>);

impl TypeRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// 完整类型名称
    pub fn name(&self) -> &str {
        &self.0
    }

    /// 去掉模块路径后的简单名称
    pub fn simple_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    pub fn is_primitive(&self) -> bool {
        constants::is_primitive_type_name(&self.0)
    }

    /// 泛型类型的元素类型，例如 `List<i32>` 的 `i32`
    pub fn type_argument(&self) -> Option<TypeRef> {
        let start = self.0.find('<')?;
        let inner = self.0.strip_suffix('>')?.get(start + 1..)?;
        (!inner.is_empty()).then(|| TypeRef::new(inner.trim()))
    }

    /// 去掉泛型参数后的原始类型
    fn raw(&self) -> Option<TypeRef> {
        self.0.find('<').map(|start| TypeRef::new(&self.0[..start]))
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::new(name)
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::new(name)
    }
}

impl From<&TypeRef> for TypeRef {
    fn from(ty: &TypeRef) -> Self {
        ty.clone()
    }
}

/// 类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Primitive,
}

/// 类型描述符
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: TypeRef,
    pub kind: TypeKind,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub constructors: Vec<Arc<Executable>>,
    pub methods: Vec<Arc<Executable>>,
}

impl TypeInfo {
    /// 创建类描述符，未显式指定父类时继承自根类型
    pub fn class(name: impl Into<TypeRef>) -> Self {
        let name = name.into();
        let superclass = if name.name() == ANY_TYPE {
            None
        } else {
            Some(TypeRef::new(ANY_TYPE))
        };
        Self {
            name,
            kind: TypeKind::Class,
            superclass,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// 创建接口描述符
    pub fn interface(name: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Interface,
            superclass: None,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        }
    }

    fn primitive(name: &str) -> Self {
        Self {
            name: TypeRef::new(name),
            kind: TypeKind::Primitive,
            superclass: None,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// 设置父类
    pub fn extends(mut self, superclass: impl Into<TypeRef>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// 添加实现的接口（对接口而言是父接口）
    pub fn implements(mut self, interface: impl Into<TypeRef>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// 添加构造函数
    pub fn constructor(mut self, constructor: Executable) -> Self {
        let constructor = constructor.declared_by(self.name.clone());
        self.constructors.push(Arc::new(constructor));
        self
    }

    /// 添加方法
    pub fn method(mut self, method: Executable) -> Self {
        let method = method.declared_by(self.name.clone());
        self.methods.push(Arc::new(method));
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

/// 类型注册表
///
/// 提供可赋值性判断、类型差异权重以及候选构造函数/方法的枚举
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<TypeRef, TypeInfo>,
}

impl TypeRegistry {
    /// 创建仅包含内置类型的注册表
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            types: HashMap::new(),
        };
        registry.register(TypeInfo::class(ANY_TYPE));
        registry.register(TypeInfo::class(STRING_TYPE));
        registry.register(TypeInfo::class(LIST_TYPE));
        for (primitive, wrapper) in constants::PRIMITIVE_WRAPPERS {
            registry.register(TypeInfo::primitive(primitive));
            registry.register(TypeInfo::class(*wrapper));
        }
        registry
    }

    /// 登记类型描述符，同名类型会被覆盖
    pub fn register(&mut self, info: TypeInfo) -> &mut Self {
        tracing::trace!("Registering type descriptor '{}'", info.name);
        self.types.insert(info.name.clone(), info);
        self
    }

    pub fn get(&self, ty: &TypeRef) -> Option<&TypeInfo> {
        self.types.get(ty)
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.types.contains_key(ty)
    }

    fn is_interface(&self, ty: &TypeRef) -> bool {
        self.get(ty).map(TypeInfo::is_interface).unwrap_or(false)
    }

    fn superclass_of(&self, ty: &TypeRef) -> Option<TypeRef> {
        if ty.is_primitive() {
            return None;
        }
        match self.get(ty) {
            Some(info) => info.superclass.clone(),
            // 未登记的类型视为直接继承根类型
            None if ty.name() != ANY_TYPE => Some(TypeRef::new(ANY_TYPE)),
            None => None,
        }
    }

    /// `lhs` 是否与 `rhs` 相同，或是 `rhs` 的父类/接口
    fn is_assignable_from(&self, lhs: &TypeRef, rhs: &TypeRef) -> bool {
        if lhs == rhs {
            return true;
        }
        if rhs.is_primitive() || lhs.is_primitive() {
            return false;
        }
        if lhs.name() == ANY_TYPE {
            return true;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([rhs.clone()]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if &current == lhs {
                return true;
            }
            if let Some(superclass) = self.superclass_of(&current) {
                queue.push_back(superclass);
            }
            if let Some(info) = self.get(&current) {
                queue.extend(info.interfaces.iter().cloned());
            }
        }
        false
    }

    /// 未登记的泛型类型按原始类型参与可赋值性检查，装箱类型保持原样
    fn erase(&self, ty: &TypeRef) -> TypeRef {
        if self.contains(ty) {
            return ty.clone();
        }
        ty.raw().unwrap_or_else(|| ty.clone())
    }

    /// 可赋值性检查，考虑基本类型与装箱类型的等价关系
    pub fn is_assignable(&self, lhs: &TypeRef, rhs: &TypeRef) -> bool {
        let lhs = &self.erase(lhs);
        let rhs = &self.erase(rhs);
        if self.is_assignable_from(lhs, rhs) {
            return true;
        }
        if lhs.is_primitive() {
            constants::wrapper_of(lhs.name()) == Some(rhs.name())
        } else {
            match constants::wrapper_of(rhs.name()) {
                Some(wrapper) => self.is_assignable_from(lhs, &TypeRef::new(wrapper)),
                None => false,
            }
        }
    }

    /// 值是否可以直接赋给指定类型；null 可以赋给任何非基本类型
    pub fn is_assignable_value(&self, ty: &TypeRef, value: &Value) -> bool {
        match value.type_ref() {
            Some(value_type) => self.is_assignable(ty, &value_type),
            None => !ty.is_primitive(),
        }
    }

    /// 声明的类型名称是否与类型匹配（完整名称或简单名称）
    pub fn matches_type_name(&self, ty: &TypeRef, type_name: &str) -> bool {
        type_name == ty.name() || type_name == ty.simple_name()
    }

    /// 计算参数类型与实际参数之间的类型差异权重
    ///
    /// 完全匹配为 0，每经过一层父类加 2，参数类型为接口时加 1，
    /// 任一参数不可赋值时返回 [`MAX_WEIGHT`]
    pub fn type_difference_weight(&self, param_types: &[TypeRef], args: &[Value]) -> i64 {
        let mut result = 0;
        for (param_type, arg) in param_types.iter().zip(args) {
            if !self.is_assignable_value(param_type, arg) {
                return MAX_WEIGHT;
            }
            let Some(arg_type) = arg.type_ref() else {
                continue;
            };

            let mut superclass = self.superclass_of(&arg_type);
            while let Some(current) = superclass {
                if param_type == &current {
                    result += SUPERCLASS_HOP_WEIGHT;
                    superclass = None;
                } else if self.is_assignable(param_type, &current) {
                    result += SUPERCLASS_HOP_WEIGHT;
                    superclass = self.superclass_of(&current);
                } else {
                    superclass = None;
                }
            }
            if self.is_interface(param_type) {
                result += INTERFACE_WEIGHT;
            }
        }
        result
    }

    /// 枚举类型声明的构造函数
    ///
    /// `non_public_allowed` 为 false 时只返回公有构造函数
    pub fn candidate_constructors(
        &self,
        ty: &TypeRef,
        non_public_allowed: bool,
    ) -> Vec<Arc<Executable>> {
        self.get(ty)
            .map(|info| {
                info.constructors
                    .iter()
                    .filter(|c| non_public_allowed || c.visibility() == Visibility::Public)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 枚举类型及其祖先声明的方法
    ///
    /// 允许非公有访问时沿父类链收集所有声明的方法；
    /// 否则只收集公有方法，同时包含接口上声明的方法
    pub fn candidate_methods(&self, ty: &TypeRef, non_public_allowed: bool) -> Vec<Arc<Executable>> {
        let mut methods = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([ty.clone()]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.get(&current) else {
                continue;
            };
            methods.extend(
                info.methods
                    .iter()
                    .filter(|m| non_public_allowed || m.visibility() == Visibility::Public)
                    .cloned(),
            );
            if let Some(superclass) = &info.superclass {
                queue.push_back(superclass.clone());
            }
            if !non_public_allowed {
                queue.extend(info.interfaces.iter().cloned());
            }
        }
        methods
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BOXED_I32_TYPE, I32_TYPE};

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::with_builtins();
        registry
            .register(TypeInfo::interface("Named"))
            .register(TypeInfo::class("Animal").implements("Named"))
            .register(TypeInfo::class("Dog").extends("Animal"))
            .register(TypeInfo::class("Puppy").extends("Dog"));
        registry
    }

    fn object(type_name: &str) -> Value {
        Value::object(type_name, ())
    }

    #[test]
    fn test_assignability_through_hierarchy() {
        let registry = registry();
        assert!(registry.is_assignable(&"Animal".into(), &"Puppy".into()));
        assert!(registry.is_assignable(&"Named".into(), &"Dog".into()));
        assert!(registry.is_assignable(&"Any".into(), &"Named".into()));
        assert!(!registry.is_assignable(&"Dog".into(), &"Animal".into()));
    }

    #[test]
    fn test_primitive_wrapper_equivalence() {
        let registry = registry();
        assert!(registry.is_assignable(&I32_TYPE.into(), &BOXED_I32_TYPE.into()));
        assert!(registry.is_assignable(&BOXED_I32_TYPE.into(), &I32_TYPE.into()));
        assert!(registry.is_assignable(&ANY_TYPE.into(), &I32_TYPE.into()));
        assert!(!registry.is_assignable(&"i64".into(), &I32_TYPE.into()));
    }

    #[test]
    fn test_null_is_not_assignable_to_primitive() {
        let registry = registry();
        assert!(!registry.is_assignable_value(&I32_TYPE.into(), &Value::Null));
        assert!(registry.is_assignable_value(&BOXED_I32_TYPE.into(), &Value::Null));
        assert!(registry.is_assignable_value(&"Dog".into(), &Value::Null));
    }

    #[test]
    fn test_type_difference_weight() {
        let registry = registry();
        let puppy = object("Puppy");

        assert_eq!(registry.type_difference_weight(&["Puppy".into()], &[puppy.clone()]), 0);
        assert_eq!(registry.type_difference_weight(&["Dog".into()], &[puppy.clone()]), 2);
        assert_eq!(registry.type_difference_weight(&["Animal".into()], &[puppy.clone()]), 4);
        // 接口：父类链上 Dog、Animal 可赋值给 Named，各加 2，再加接口权重 1
        assert_eq!(registry.type_difference_weight(&["Named".into()], &[puppy.clone()]), 9);
        assert_eq!(
            registry.type_difference_weight(&["String".into()], &[puppy]),
            MAX_WEIGHT
        );
    }

    #[test]
    fn test_generic_types_are_erased() {
        let registry = registry();
        let list_of_ints = TypeRef::new("List<i32>");
        assert_eq!(list_of_ints.type_argument(), Some(TypeRef::new("i32")));
        assert!(registry.is_assignable(&list_of_ints, &LIST_TYPE.into()));
        assert!(registry.is_assignable_value(&list_of_ints, &Value::List(vec![])));
        // 装箱类型已登记，不会被擦除为 Option
        assert!(!registry.is_assignable(&BOXED_I32_TYPE.into(), &"Option<i64>".into()));
    }

    #[test]
    fn test_simple_name_matching() {
        let registry = registry();
        let ty = TypeRef::new("app::service::UserService");
        assert_eq!(ty.simple_name(), "UserService");
        assert!(registry.matches_type_name(&ty, "UserService"));
        assert!(registry.matches_type_name(&ty, "app::service::UserService"));
        assert!(!registry.matches_type_name(&ty, "Service"));
    }

    #[test]
    fn test_candidate_enumeration_respects_access_policy() {
        let mut registry = registry();
        registry.register(
            TypeInfo::class("Widget")
                .constructor(Executable::constructor(vec![]))
                .constructor(Executable::constructor(vec!["i32".into()]).non_public())
                .method(Executable::static_method("create", vec![]).returns("Widget")),
        );
        registry.register(
            TypeInfo::class("FancyWidget")
                .extends("Widget")
                .method(Executable::method("tune", vec![]).non_public()),
        );

        assert_eq!(registry.candidate_constructors(&"Widget".into(), false).len(), 1);
        assert_eq!(registry.candidate_constructors(&"Widget".into(), true).len(), 2);
        assert_eq!(registry.candidate_methods(&"FancyWidget".into(), false).len(), 1);
        assert_eq!(registry.candidate_methods(&"FancyWidget".into(), true).len(), 2);
    }
}

//! 可执行体描述符
//!
//! 构造函数与工厂方法统一用 [`Executable`] 描述，解析器只依赖这里登记的元数据

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::constants::UNIT_TYPE;
use crate::types::TypeRef;
use crate::value::{ObjectRef, Value};

/// 访问级别，公有优先
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    Public,
    NonPublic,
}

/// 可执行体种类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableKind {
    Constructor,
    Method { name: String, is_static: bool },
}

/// 调用函数：(工厂实例, 参数) -> 结果
///
/// 构造函数和静态方法的工厂实例为 `None`
pub type Invoker = Arc<dyn Fn(Option<&Value>, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// 未提供调用函数的构造函数创建的默认实例，记录实际收到的参数
#[derive(Debug, Clone)]
pub struct ConstructedInstance {
    pub arguments: Vec<Value>,
}

/// 构造函数或工厂方法
#[derive(Clone)]
pub struct Executable {
    kind: ExecutableKind,
    declaring_type: TypeRef,
    visibility: Visibility,
    parameter_types: Vec<TypeRef>,
    parameter_names: Option<Vec<String>>,
    constructor_properties: Option<Vec<String>>,
    return_type: Option<TypeRef>,
    invoker: Option<Invoker>,
}

impl Executable {
    fn new(kind: ExecutableKind, parameter_types: Vec<TypeRef>) -> Self {
        Self {
            kind,
            declaring_type: TypeRef::new(""),
            visibility: Visibility::Public,
            parameter_types,
            parameter_names: None,
            constructor_properties: None,
            return_type: None,
            invoker: None,
        }
    }

    /// 创建构造函数描述符
    pub fn constructor(parameter_types: Vec<TypeRef>) -> Self {
        Self::new(ExecutableKind::Constructor, parameter_types)
    }

    /// 创建实例方法描述符
    pub fn method(name: impl Into<String>, parameter_types: Vec<TypeRef>) -> Self {
        Self::new(
            ExecutableKind::Method {
                name: name.into(),
                is_static: false,
            },
            parameter_types,
        )
    }

    /// 创建静态方法描述符
    pub fn static_method(name: impl Into<String>, parameter_types: Vec<TypeRef>) -> Self {
        Self::new(
            ExecutableKind::Method {
                name: name.into(),
                is_static: true,
            },
            parameter_types,
        )
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    /// 设置方法返回类型
    pub fn returns(mut self, return_type: impl Into<TypeRef>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// 登记参数名称（相当于编译期保留的调试信息）
    pub fn with_parameter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// 显式声明构造函数参数名称，优先于参数名发现
    pub fn with_constructor_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constructor_properties = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_invoker<F>(mut self, invoker: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.invoker = Some(Arc::new(invoker));
        self
    }

    pub(crate) fn declared_by(mut self, declaring_type: TypeRef) -> Self {
        self.declaring_type = declaring_type;
        self
    }

    pub fn kind(&self) -> &ExecutableKind {
        &self.kind
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self.kind, ExecutableKind::Constructor)
    }

    pub fn is_static(&self) -> bool {
        matches!(self.kind, ExecutableKind::Method { is_static: true, .. })
    }

    /// 方法名称；构造函数使用声明类型的简单名称
    pub fn name(&self) -> &str {
        match &self.kind {
            ExecutableKind::Constructor => self.declaring_type.simple_name(),
            ExecutableKind::Method { name, .. } => name,
        }
    }

    pub fn declaring_type(&self) -> &TypeRef {
        &self.declaring_type
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn parameter_types(&self) -> &[TypeRef] {
        &self.parameter_types
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn parameter_names(&self) -> Option<&[String]> {
        self.parameter_names.as_deref()
    }

    pub fn constructor_properties(&self) -> Option<&[String]> {
        self.constructor_properties.as_deref()
    }

    /// 返回类型；构造函数返回声明类型，未设置返回类型的方法视为无返回值
    pub fn return_type(&self) -> TypeRef {
        match (&self.kind, &self.return_type) {
            (ExecutableKind::Constructor, _) => self.declaring_type.clone(),
            (_, Some(return_type)) => return_type.clone(),
            (_, None) => TypeRef::new(UNIT_TYPE),
        }
    }

    pub fn returns_unit(&self) -> bool {
        !self.is_constructor() && self.return_type().name() == UNIT_TYPE
    }

    /// 是否与另一个可执行体具有相同的名称和参数签名
    pub fn same_signature(&self, other: &Executable) -> bool {
        self.name() == other.name() && self.parameter_types == other.parameter_types
    }

    /// 调用可执行体
    pub fn invoke(&self, target: Option<&Value>, args: &[Value]) -> anyhow::Result<Value> {
        match &self.invoker {
            Some(invoker) => invoker(target, args),
            None if self.is_constructor() => Ok(Value::Object(ObjectRef::new(
                self.declaring_type.clone(),
                ConstructedInstance {
                    arguments: args.to_vec(),
                },
            ))),
            None => anyhow::bail!("No invoker registered for factory method {}", self),
        }
    }
}

impl fmt::Debug for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExecutableKind::Constructor => write!(f, "{}(", self.declaring_type.simple_name())?,
            ExecutableKind::Method { name, is_static } => {
                if *is_static {
                    f.write_str("static ")?;
                }
                write!(f, "{}::{}(", self.declaring_type.simple_name(), name)?;
            }
        }
        for (i, ty) in self.parameter_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}

/// 可执行体的某个参数位置
#[derive(Debug, Clone, Copy)]
pub struct MethodParameter<'a> {
    pub executable: &'a Executable,
    pub index: usize,
}

impl<'a> MethodParameter<'a> {
    pub fn new(executable: &'a Executable, index: usize) -> Self {
        Self { executable, index }
    }

    pub fn parameter_type(&self) -> Option<&'a TypeRef> {
        self.executable.parameter_types().get(self.index)
    }

    /// 构造函数参数还是工厂方法参数，用于错误消息
    pub fn kind(&self) -> &'static str {
        if self.executable.is_constructor() {
            "constructor"
        } else {
            "factory method"
        }
    }
}

impl fmt::Display for MethodParameter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parameter {} of {}", self.index, self.executable)
    }
}

/// 候选者排序：公有优先，其次参数多的优先；同级保持声明顺序
pub fn sort_candidates(candidates: &mut [Arc<Executable>]) {
    candidates.sort_by(|a, b| compare_candidates(a, b));
}

fn compare_candidates(a: &Executable, b: &Executable) -> Ordering {
    a.visibility
        .cmp(&b.visibility)
        .then_with(|| b.parameter_count().cmp(&a.parameter_count()))
}

/// 参数名发现
///
/// 尽力而为，无法获得名称时返回 `None`
pub trait ParameterNameDiscoverer: Send + Sync {
    fn parameter_names(&self, executable: &Executable) -> Option<Vec<String>>;
}

/// 默认参数名发现：读取描述符上登记的参数名称
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParameterNameDiscoverer;

impl ParameterNameDiscoverer for DefaultParameterNameDiscoverer {
    fn parameter_names(&self, executable: &Executable) -> Option<Vec<String>> {
        executable.parameter_names().map(<[String]>::to_vec)
    }
}

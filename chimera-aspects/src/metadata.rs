//! 切面元数据
//!
//! 没有运行时反射，切面类型的方法、字段和注解在注册时以描述符形式给出，
//! 之后的扫描只读取这里的数据

use std::fmt;
use std::sync::Arc;

use chimera_beans::TypeRef;

/// 切面实例化模型
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PerClause {
    /// 所有目标共享一个切面实例
    #[default]
    Singleton,

    /// 每个代理对象一个实例，携带切点表达式
    PerThis(String),

    /// 每个目标对象一个实例，携带切点表达式
    PerTarget(String),

    PerCflow(String),
    PerCflowBelow(String),
    PerTypeWithin(String),
}

impl PerClause {
    /// 非单例模型下切面实例在第一次匹配时才创建
    pub fn is_lazily_instantiated(&self) -> bool {
        !matches!(self, PerClause::Singleton)
    }

    /// 实例化模型携带的切点表达式
    pub fn expression(&self) -> Option<&str> {
        match self {
            PerClause::Singleton => None,
            PerClause::PerThis(e)
            | PerClause::PerTarget(e)
            | PerClause::PerCflow(e)
            | PerClause::PerCflowBelow(e)
            | PerClause::PerTypeWithin(e) => Some(e),
        }
    }
}

impl fmt::Display for PerClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PerClause::Singleton => "singleton",
            PerClause::PerThis(_) => "perthis",
            PerClause::PerTarget(_) => "pertarget",
            PerClause::PerCflow(_) => "percflow",
            PerClause::PerCflowBelow(_) => "percflowbelow",
            PerClause::PerTypeWithin(_) => "pertypewithin",
        };
        f.write_str(name)
    }
}

/// 方法上的切面注解种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    /// 仅声明切点，不产生通知
    Pointcut,
    Around,
    Before,
    After,
    AfterReturning,
    AfterThrowing,
}

/// 方法上的切面注解
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectAnnotation {
    pub kind: AnnotationKind,

    /// 切点表达式文本
    pub expression: String,

    /// 显式声明的参数名称，逗号分隔
    pub argument_names: Option<String>,

    /// AfterReturning 绑定返回值的参数名
    pub returning: Option<String>,

    /// AfterThrowing 绑定异常的参数名
    pub throwing: Option<String>,
}

impl AspectAnnotation {
    pub fn new(kind: AnnotationKind, expression: impl Into<String>) -> Self {
        Self {
            kind,
            expression: expression.into(),
            argument_names: None,
            returning: None,
            throwing: None,
        }
    }

    pub fn pointcut(expression: impl Into<String>) -> Self {
        Self::new(AnnotationKind::Pointcut, expression)
    }

    pub fn around(expression: impl Into<String>) -> Self {
        Self::new(AnnotationKind::Around, expression)
    }

    pub fn before(expression: impl Into<String>) -> Self {
        Self::new(AnnotationKind::Before, expression)
    }

    pub fn after(expression: impl Into<String>) -> Self {
        Self::new(AnnotationKind::After, expression)
    }

    pub fn after_returning(expression: impl Into<String>) -> Self {
        Self::new(AnnotationKind::AfterReturning, expression)
    }

    pub fn after_throwing(expression: impl Into<String>) -> Self {
        Self::new(AnnotationKind::AfterThrowing, expression)
    }

    pub fn with_argument_names(mut self, names: impl Into<String>) -> Self {
        self.argument_names = Some(names.into());
        self
    }

    pub fn with_returning(mut self, name: impl Into<String>) -> Self {
        self.returning = Some(name.into());
        self
    }

    pub fn with_throwing(mut self, name: impl Into<String>) -> Self {
        self.throwing = Some(name.into());
        self
    }
}

/// 方法描述符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMeta {
    pub name: String,
    pub annotation: Option<AspectAnnotation>,

    /// 编译期保留的参数名称
    pub parameter_names: Option<Vec<String>>,
}

impl MethodMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            parameter_names: None,
        }
    }

    pub fn annotated(name: impl Into<String>, annotation: AspectAnnotation) -> Self {
        Self::new(name).with_annotation(annotation)
    }

    pub fn with_annotation(mut self, annotation: AspectAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn with_parameter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn annotation_kind(&self) -> Option<AnnotationKind> {
        self.annotation.as_ref().map(|a| a.kind)
    }

    pub fn is_pointcut(&self) -> bool {
        self.annotation_kind() == Some(AnnotationKind::Pointcut)
    }
}

/// 引入声明：匹配的目标类型获得新的接口，由默认实现提供行为
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclareParents {
    /// 目标类型模式
    pub types_matching: String,
    pub default_impl: Option<TypeRef>,
}

impl DeclareParents {
    pub fn new(types_matching: impl Into<String>) -> Self {
        Self {
            types_matching: types_matching.into(),
            default_impl: None,
        }
    }

    pub fn with_default_impl(mut self, default_impl: impl Into<TypeRef>) -> Self {
        self.default_impl = Some(default_impl.into());
        self
    }
}

/// 字段描述符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: String,
    pub field_type: TypeRef,
    pub declare_parents: Option<DeclareParents>,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, field_type: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            declare_parents: None,
        }
    }

    pub fn with_declare_parents(mut self, declare_parents: DeclareParents) -> Self {
        self.declare_parents = Some(declare_parents);
        self
    }
}

/// 切面类型描述符
#[derive(Debug, Clone)]
pub struct AspectClass {
    pub type_ref: TypeRef,

    /// 是否标注为切面
    pub is_aspect: bool,

    pub is_abstract: bool,
    pub superclass: Option<Arc<AspectClass>>,
    pub per_clause: PerClause,

    /// 跨切面排序值，越小越靠前
    pub order: Option<i32>,

    /// 按声明顺序排列的方法
    pub methods: Vec<MethodMeta>,

    pub fields: Vec<FieldMeta>,
}

impl AspectClass {
    /// 标注为切面的类型
    pub fn aspect(type_ref: impl Into<TypeRef>) -> Self {
        Self {
            type_ref: type_ref.into(),
            is_aspect: true,
            is_abstract: false,
            superclass: None,
            per_clause: PerClause::Singleton,
            order: None,
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// 普通类型
    pub fn plain(type_ref: impl Into<TypeRef>) -> Self {
        Self {
            is_aspect: false,
            ..Self::aspect(type_ref)
        }
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn extends(mut self, superclass: AspectClass) -> Self {
        self.superclass = Some(Arc::new(superclass));
        self
    }

    pub fn with_per_clause(mut self, per_clause: PerClause) -> Self {
        self.per_clause = per_clause;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn method(mut self, method: MethodMeta) -> Self {
        self.methods.push(method);
        self
    }

    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        self.type_ref.name()
    }

    /// 本类型及所有祖先声明的方法，本类型在前
    pub fn all_methods(&self) -> Vec<&MethodMeta> {
        let mut methods: Vec<&MethodMeta> = self.methods.iter().collect();
        let mut current = self.superclass.as_deref();
        while let Some(class) = current {
            methods.extend(class.methods.iter());
            current = class.superclass.as_deref();
        }
        methods
    }

    /// 沿继承链查找切点声明方法
    pub fn find_pointcut(&self, name: &str) -> Option<&MethodMeta> {
        self.all_methods()
            .into_iter()
            .find(|m| m.is_pointcut() && m.name == name)
    }
}

impl PartialEq for AspectClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_ref == other.type_ref
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methods_include_ancestors() {
        let base = AspectClass::aspect("BaseAspect")
            .abstract_class()
            .method(MethodMeta::annotated("services", AspectAnnotation::pointcut("within(*Service)")));
        let aspect = AspectClass::aspect("AuditAspect")
            .extends(base)
            .method(MethodMeta::annotated("audit", AspectAnnotation::before("services()")));

        let names: Vec<&str> = aspect.all_methods().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["audit", "services"]);
        assert!(aspect.find_pointcut("services").is_some());
        assert!(aspect.find_pointcut("audit").is_none());
    }

    #[test]
    fn test_per_clause() {
        assert!(!PerClause::Singleton.is_lazily_instantiated());
        let per_target = PerClause::PerTarget("within(*Service)".to_string());
        assert!(per_target.is_lazily_instantiated());
        assert_eq!(per_target.expression(), Some("within(*Service)"));
        assert_eq!(per_target.to_string(), "pertarget");
    }
}

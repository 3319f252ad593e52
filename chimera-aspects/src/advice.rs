//! 通知（Advice）定义
//!
//! 通知种类是封闭的枚举，每种通知的配置由构建函数表生成

use std::cmp::Ordering;

use crate::metadata::{AnnotationKind, AspectAnnotation, MethodMeta};
use crate::pointcut::PointcutExpression;

/// 通知类型，声明顺序即同一切面内的优先顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdviceKind {
    /// 环绕通知（可以控制方法执行）
    Around,
    /// 前置通知
    Before,
    /// 后置通知（无论成功还是失败都执行）
    After,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（抛出异常时执行）
    AfterThrowing,
}

impl AdviceKind {
    /// 注解对应的通知类型；切点声明没有通知
    pub fn from_annotation(kind: AnnotationKind) -> Option<Self> {
        match kind {
            AnnotationKind::Pointcut => None,
            AnnotationKind::Around => Some(AdviceKind::Around),
            AnnotationKind::Before => Some(AdviceKind::Before),
            AnnotationKind::After => Some(AdviceKind::After),
            AnnotationKind::AfterReturning => Some(AdviceKind::AfterReturning),
            AnnotationKind::AfterThrowing => Some(AdviceKind::AfterThrowing),
        }
    }
}

/// 方法排序：通知类型优先（没有通知注解的排最后），其次按方法名
pub fn compare_advice_methods(a: &MethodMeta, b: &MethodMeta) -> Ordering {
    let rank = |m: &MethodMeta| {
        m.annotation_kind()
            .and_then(AdviceKind::from_annotation)
            .map(|k| k as usize)
            .unwrap_or(usize::MAX)
    };
    rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
}

/// 一个通知方法的完整配置
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceConfig {
    pub kind: AdviceKind,
    pub aspect_name: String,
    pub method_name: String,
    pub pointcut: PointcutExpression,

    /// 在切面内的声明顺序
    pub declaration_order: usize,

    /// 注解声明的参数名优先，其次方法上保留的参数名
    pub argument_names: Option<Vec<String>>,

    pub returning_name: Option<String>,
    pub throwing_name: Option<String>,
}

/// 构建通知配置所需的上下文
pub struct AdviceContext<'a> {
    pub aspect_name: &'a str,
    pub method: &'a MethodMeta,
    pub annotation: &'a AspectAnnotation,
    pub pointcut: PointcutExpression,
    pub declaration_order: usize,
}

type AdviceBuilder = fn(AdviceContext<'_>) -> AdviceConfig;

/// 通知类型对应的构建函数
fn advice_builder(kind: AdviceKind) -> AdviceBuilder {
    match kind {
        AdviceKind::Around => build_around,
        AdviceKind::Before => build_before,
        AdviceKind::After => build_after,
        AdviceKind::AfterReturning => build_after_returning,
        AdviceKind::AfterThrowing => build_after_throwing,
    }
}

/// 按通知类型构建配置
pub fn build_advice(kind: AdviceKind, context: AdviceContext<'_>) -> AdviceConfig {
    let builder = advice_builder(kind);
    let config = builder(context);
    tracing::debug!(
        "Built {:?} advice for {}::{} (declaration order {})",
        config.kind,
        config.aspect_name,
        config.method_name,
        config.declaration_order
    );
    config
}

fn base_config(kind: AdviceKind, context: AdviceContext<'_>) -> AdviceConfig {
    let argument_names = context
        .annotation
        .argument_names
        .as_deref()
        .filter(|names| !names.trim().is_empty())
        .map(|names| names.split(',').map(|n| n.trim().to_string()).collect())
        .or_else(|| context.method.parameter_names.clone());

    AdviceConfig {
        kind,
        aspect_name: context.aspect_name.to_string(),
        method_name: context.method.name.clone(),
        pointcut: context.pointcut,
        declaration_order: context.declaration_order,
        argument_names,
        returning_name: None,
        throwing_name: None,
    }
}

fn build_around(context: AdviceContext<'_>) -> AdviceConfig {
    base_config(AdviceKind::Around, context)
}

fn build_before(context: AdviceContext<'_>) -> AdviceConfig {
    base_config(AdviceKind::Before, context)
}

fn build_after(context: AdviceContext<'_>) -> AdviceConfig {
    base_config(AdviceKind::After, context)
}

fn build_after_returning(context: AdviceContext<'_>) -> AdviceConfig {
    let returning = context.annotation.returning.clone().filter(|n| !n.is_empty());
    let mut config = base_config(AdviceKind::AfterReturning, context);
    config.returning_name = returning;
    config
}

fn build_after_throwing(context: AdviceContext<'_>) -> AdviceConfig {
    let throwing = context.annotation.throwing.clone().filter(|n| !n.is_empty());
    let mut config = base_config(AdviceKind::AfterThrowing, context);
    config.throwing_name = throwing;
    config
}

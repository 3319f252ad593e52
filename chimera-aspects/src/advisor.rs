//! Advisor 定义
//!
//! 一个 Advisor 由适用性判断（切点）和通知组成。切面扫描的结果是有序的 Advisor 列表

use std::sync::Arc;

use chimera_beans::{TypeRef, Value};

use crate::advice::{AdviceConfig, AdviceKind};
use crate::error::AopResult;
use crate::instance_factory::{AspectInstanceFactory, LazySingletonAspectInstanceFactory};
use crate::joinpoint::JoinPoint;
use crate::pointcut::{PointcutExpression, WildcardPattern};

/// 由通知方法生成的 Advisor
///
/// 非单例实例化模型下，切面实例创建之前还要求实例化模型的切点也匹配
#[derive(Clone)]
pub struct InstantiationModelAwareAdvisor {
    advice: AdviceConfig,
    per_clause_pointcut: Option<PointcutExpression>,
    instance_factory: Arc<LazySingletonAspectInstanceFactory>,
}

impl InstantiationModelAwareAdvisor {
    pub fn new(
        advice: AdviceConfig,
        per_clause_pointcut: Option<PointcutExpression>,
        instance_factory: Arc<LazySingletonAspectInstanceFactory>,
    ) -> Self {
        Self {
            advice,
            per_clause_pointcut,
            instance_factory,
        }
    }

    pub fn advice(&self) -> &AdviceConfig {
        &self.advice
    }

    pub fn kind(&self) -> AdviceKind {
        self.advice.kind
    }

    /// 声明的切点
    pub fn pointcut(&self) -> &PointcutExpression {
        &self.advice.pointcut
    }

    pub fn is_lazy(&self) -> bool {
        self.per_clause_pointcut.is_some()
    }

    /// 切面实例是否已经可用
    pub fn is_advice_instantiated(&self) -> bool {
        !self.is_lazy() || self.instance_factory.is_materialized()
    }

    /// 获取执行通知的切面实例
    pub fn aspect_instance(&self) -> AopResult<Value> {
        self.instance_factory.aspect_instance()
    }

    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        match &self.per_clause_pointcut {
            Some(per_clause) if !self.instance_factory.is_materialized() => {
                per_clause.matches(join_point) && self.advice.pointcut.matches(join_point)
            }
            _ => self.advice.pointcut.matches(join_point),
        }
    }
}

/// 非单例切面的前置 Advisor，本身没有效果，只在第一次匹配时创建切面实例
#[derive(Clone)]
pub struct SyntheticInstantiationAdvisor {
    pointcut: PointcutExpression,
    instance_factory: Arc<LazySingletonAspectInstanceFactory>,
}

impl SyntheticInstantiationAdvisor {
    pub fn new(pointcut: PointcutExpression, instance_factory: Arc<LazySingletonAspectInstanceFactory>) -> Self {
        Self {
            pointcut,
            instance_factory,
        }
    }

    /// 实例化模型的切点
    pub fn pointcut(&self) -> &PointcutExpression {
        &self.pointcut
    }

    /// 在目标方法之前执行：确保切面实例存在
    pub fn before(&self) -> AopResult<Value> {
        self.instance_factory.aspect_instance()
    }
}

/// 类型引入 Advisor：匹配的目标类型获得新的接口
#[derive(Debug, Clone)]
pub struct DeclareParentsAdvisor {
    aspect_name: String,
    interface_type: TypeRef,
    type_pattern: WildcardPattern,
    default_impl: TypeRef,
}

impl DeclareParentsAdvisor {
    pub fn new(
        aspect_name: impl Into<String>,
        interface_type: TypeRef,
        type_pattern: WildcardPattern,
        default_impl: TypeRef,
    ) -> Self {
        Self {
            aspect_name: aspect_name.into(),
            interface_type,
            type_pattern,
            default_impl,
        }
    }

    /// 引入的接口
    pub fn interface_type(&self) -> &TypeRef {
        &self.interface_type
    }

    pub fn default_impl(&self) -> &TypeRef {
        &self.default_impl
    }

    /// 目标类型是否获得引入的接口
    pub fn matches_type(&self, type_name: &str) -> bool {
        self.type_pattern.matches_type(type_name)
    }
}

/// 行为链中的一个条目
#[derive(Clone)]
pub enum Advisor {
    Advice(InstantiationModelAwareAdvisor),
    SyntheticInstantiation(SyntheticInstantiationAdvisor),
    Introduction(DeclareParentsAdvisor),
}

impl Advisor {
    /// 连接点是否适用
    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        match self {
            Advisor::Advice(advisor) => advisor.matches(join_point),
            Advisor::SyntheticInstantiation(advisor) => advisor.pointcut.matches(join_point),
            Advisor::Introduction(advisor) => advisor.matches_type(join_point.target_type.name()),
        }
    }

    /// 只看目标类型时是否可能适用
    pub fn could_apply_to(&self, type_name: &str) -> bool {
        match self {
            Advisor::Advice(advisor) => advisor.advice.pointcut.could_match_type(type_name),
            Advisor::SyntheticInstantiation(advisor) => advisor.pointcut.could_match_type(type_name),
            Advisor::Introduction(advisor) => advisor.matches_type(type_name),
        }
    }

    pub fn aspect_name(&self) -> &str {
        match self {
            Advisor::Advice(advisor) => &advisor.advice.aspect_name,
            Advisor::SyntheticInstantiation(advisor) => advisor.instance_factory.aspect_name(),
            Advisor::Introduction(advisor) => &advisor.aspect_name,
        }
    }

    /// 通知方法的声明顺序；合成 Advisor 与引入没有声明顺序
    pub fn declaration_order(&self) -> Option<usize> {
        match self {
            Advisor::Advice(advisor) => Some(advisor.advice.declaration_order),
            _ => None,
        }
    }

    /// 跨切面排序值
    pub fn order(&self) -> i32 {
        match self {
            Advisor::Advice(advisor) => advisor.instance_factory.order(),
            Advisor::SyntheticInstantiation(advisor) => advisor.instance_factory.order(),
            Advisor::Introduction(_) => crate::instance_factory::LOWEST_PRECEDENCE,
        }
    }

    /// 简短描述，用于日志
    pub fn describe(&self) -> String {
        match self {
            Advisor::Advice(advisor) => format!(
                "{:?} advice {}::{} on {:?}",
                advisor.advice.kind, advisor.advice.aspect_name, advisor.advice.method_name, advisor.advice.pointcut
            ),
            Advisor::SyntheticInstantiation(advisor) => format!(
                "instantiation of '{}' on {:?}",
                advisor.instance_factory.aspect_name(),
                advisor.pointcut
            ),
            Advisor::Introduction(advisor) => format!(
                "introduction of {} into {}",
                advisor.interface_type,
                advisor.type_pattern.as_str()
            ),
        }
    }
}

impl std::fmt::Debug for Advisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// 按排序值稳定排序，排序值相同的按切面名称
pub fn sort_advisors(advisors: &mut [Advisor]) {
    advisors.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.aspect_name().cmp(b.aspect_name())));
}

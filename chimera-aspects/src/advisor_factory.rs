//! 从切面描述符生成 Advisor
//!
//! 通知方法先按通知类型、再按方法名排序，因此同一个切面总是得到相同顺序的 Advisor 链

use std::sync::Arc;

use crate::advice::{build_advice, compare_advice_methods, AdviceContext, AdviceKind};
use crate::advisor::{
    Advisor, DeclareParentsAdvisor, InstantiationModelAwareAdvisor, SyntheticInstantiationAdvisor,
};
use crate::error::{AopConfigError, AopResult};
use crate::instance_factory::{AspectInstanceFactory, LazySingletonAspectInstanceFactory};
use crate::metadata::{AspectClass, FieldMeta, MethodMeta, PerClause};
use crate::pointcut::{PointcutExpression, WildcardPattern};

/// 基于描述符的 Advisor 工厂
#[derive(Debug, Default, Clone, Copy)]
pub struct ReflectiveAdvisorFactory;

impl ReflectiveAdvisorFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn is_aspect(&self, class: &AspectClass) -> bool {
        class.is_aspect
    }

    /// 检查切面类型能否生成 Advisor
    pub fn validate(&self, class: &AspectClass) -> AopResult<()> {
        if let Some(superclass) = &class.superclass {
            if superclass.is_aspect && !superclass.is_abstract {
                return Err(AopConfigError::ConcreteAspectInheritance {
                    class: class.name().to_string(),
                    superclass: superclass.name().to_string(),
                });
            }
        }

        if matches!(class.per_clause, PerClause::PerCflow(_) | PerClause::PerCflowBelow(_)) {
            return Err(AopConfigError::UnsupportedInstantiationModel {
                class: class.name().to_string(),
                model: class.per_clause.to_string(),
            });
        }
        Ok(())
    }

    /// 为工厂提供的切面生成有序的 Advisor 列表
    pub fn advisors(&self, factory: Arc<dyn AspectInstanceFactory>) -> AopResult<Vec<Advisor>> {
        let class = Arc::clone(factory.metadata());
        let aspect_name = factory.aspect_name().to_string();
        self.validate(&class)?;

        // 切面实例只创建一次
        let lazy_factory = Arc::new(LazySingletonAspectInstanceFactory::new(factory));
        let per_clause_pointcut = match class.per_clause.expression() {
            Some(expression) => Some(PointcutExpression::parse(expression)?),
            None => None,
        };

        let mut methods: Vec<&MethodMeta> = class.all_methods().into_iter().filter(|m| !m.is_pointcut()).collect();
        methods.sort_by(|a, b| compare_advice_methods(a, b));

        let mut advisors = Vec::new();
        for method in methods {
            let declaration_order = advisors.len();
            if let Some(advisor) = self.advisor(
                &class,
                &aspect_name,
                method,
                declaration_order,
                per_clause_pointcut.clone(),
                &lazy_factory,
            )? {
                advisors.push(advisor);
            }
        }

        if !advisors.is_empty() && class.per_clause.is_lazily_instantiated() {
            if let Some(pointcut) = per_clause_pointcut {
                tracing::debug!("Aspect '{}' uses {} model, adding instantiation advisor", aspect_name, class.per_clause);
                advisors.insert(
                    0,
                    Advisor::SyntheticInstantiation(SyntheticInstantiationAdvisor::new(pointcut, Arc::clone(&lazy_factory))),
                );
            }
        }

        for field in &class.fields {
            if let Some(advisor) = self.declare_parents_advisor(&class, &aspect_name, field)? {
                advisors.push(advisor);
            }
        }

        tracing::debug!("Aspect '{}' produced {} advisors", aspect_name, advisors.len());
        Ok(advisors)
    }

    /// 单个方法的 Advisor，没有通知注解时返回 None
    fn advisor(
        &self,
        class: &AspectClass,
        aspect_name: &str,
        method: &MethodMeta,
        declaration_order: usize,
        per_clause_pointcut: Option<PointcutExpression>,
        instance_factory: &Arc<LazySingletonAspectInstanceFactory>,
    ) -> AopResult<Option<Advisor>> {
        let Some(annotation) = method.annotation.as_ref() else {
            return Ok(None);
        };
        let Some(kind) = AdviceKind::from_annotation(annotation.kind) else {
            return Ok(None);
        };
        if !self.is_aspect(class) {
            return Err(AopConfigError::NotAnAspect {
                method: method.name.clone(),
                class: class.name().to_string(),
            });
        }

        let pointcut = PointcutExpression::parse(&annotation.expression)?.resolve_references(&|name: &str| {
            class.find_pointcut(name).and_then(|m| m.annotation.as_ref()).map(|a| a.expression.clone())
        })?;

        let advice = build_advice(
            kind,
            AdviceContext {
                aspect_name,
                method,
                annotation,
                pointcut,
                declaration_order,
            },
        );
        Ok(Some(Advisor::Advice(InstantiationModelAwareAdvisor::new(
            advice,
            per_clause_pointcut,
            Arc::clone(instance_factory),
        ))))
    }

    /// 字段上的引入声明
    fn declare_parents_advisor(
        &self,
        class: &AspectClass,
        aspect_name: &str,
        field: &FieldMeta,
    ) -> AopResult<Option<Advisor>> {
        let Some(declare_parents) = field.declare_parents.as_ref() else {
            return Ok(None);
        };
        let default_impl =
            declare_parents
                .default_impl
                .clone()
                .ok_or_else(|| AopConfigError::MissingDefaultImplementation {
                    field: field.name.clone(),
                    class: class.name().to_string(),
                })?;

        Ok(Some(Advisor::Introduction(DeclareParentsAdvisor::new(
            aspect_name,
            field.field_type.clone(),
            WildcardPattern::new(&declare_parents.types_matching)?,
            default_impl,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joinpoint::JoinPoint;
    use crate::metadata::{AspectAnnotation, DeclareParents};
    use chimera_beans::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestFactory {
        name: String,
        metadata: Arc<AspectClass>,
        created: AtomicUsize,
    }

    impl TestFactory {
        fn new(metadata: AspectClass) -> Arc<Self> {
            Arc::new(Self {
                name: "testAspect".to_string(),
                metadata: Arc::new(metadata),
                created: AtomicUsize::new(0),
            })
        }
    }

    impl AspectInstanceFactory for TestFactory {
        fn aspect_instance(&self) -> AopResult<Value> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Value::object(self.metadata.type_ref.clone(), ()))
        }

        fn metadata(&self) -> &Arc<AspectClass> {
            &self.metadata
        }

        fn aspect_name(&self) -> &str {
            &self.name
        }
    }

    fn names(advisors: &[Advisor]) -> Vec<(Option<AdviceKind>, String)> {
        advisors
            .iter()
            .map(|a| match a {
                Advisor::Advice(advice) => (Some(advice.kind()), advice.advice().method_name.clone()),
                other => (None, other.describe()),
            })
            .collect()
    }

    #[test]
    fn test_advisors_follow_advice_kind_order() {
        let class = AspectClass::aspect("LoggingAspect")
            .method(MethodMeta::annotated("log_after", AspectAnnotation::after("within(*Service)")))
            .method(MethodMeta::new("format_message"))
            .method(MethodMeta::annotated("log_before", AspectAnnotation::before("within(*Service)")))
            .method(MethodMeta::annotated("timed", AspectAnnotation::around("within(*Service)")));

        let advisors = ReflectiveAdvisorFactory::new().advisors(TestFactory::new(class)).unwrap();

        assert_eq!(
            names(&advisors),
            vec![
                (Some(AdviceKind::Around), "timed".to_string()),
                (Some(AdviceKind::Before), "log_before".to_string()),
                (Some(AdviceKind::After), "log_after".to_string()),
            ]
        );
        let orders: Vec<Option<usize>> = advisors.iter().map(|a| a.declaration_order()).collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_named_pointcut_reference_from_ancestor() {
        let base = AspectClass::aspect("BaseAspect")
            .abstract_class()
            .method(MethodMeta::annotated("services", AspectAnnotation::pointcut("within(*Service)")));
        let class = AspectClass::aspect("AuditAspect")
            .extends(base)
            .method(MethodMeta::annotated("audit", AspectAnnotation::before("services() && !bean(internal*)")));

        let advisors = ReflectiveAdvisorFactory::new().advisors(TestFactory::new(class)).unwrap();
        assert_eq!(advisors.len(), 1);

        let service_call = JoinPoint::new("UserService", "find").with_bean_name("userService");
        let internal_call = JoinPoint::new("UserService", "find").with_bean_name("internalUsers");
        let repo_call = JoinPoint::new("UserRepository", "find").with_bean_name("userRepository");
        assert!(advisors[0].matches(&service_call));
        assert!(!advisors[0].matches(&internal_call));
        assert!(!advisors[0].matches(&repo_call));
    }

    #[test]
    fn test_per_target_aspect_gets_instantiation_advisor() {
        let class = AspectClass::aspect("SessionAspect")
            .with_per_clause(PerClause::PerTarget("within(*Session)".to_string()))
            .method(MethodMeta::annotated("track", AspectAnnotation::before("execution(* *.open(..))")));
        let factory = TestFactory::new(class);

        let advisors = ReflectiveAdvisorFactory::new().advisors(factory.clone()).unwrap();
        assert_eq!(advisors.len(), 2);
        let Advisor::SyntheticInstantiation(synthetic) = &advisors[0] else {
            panic!("expected instantiation advisor first, got {:?}", advisors[0]);
        };
        let Advisor::Advice(track) = &advisors[1] else {
            panic!("expected advice advisor, got {:?}", advisors[1]);
        };

        // 实例创建前同时要求实例化模型的切点匹配
        let other_open = JoinPoint::new("FileHandle", "open");
        let session_open = JoinPoint::new("HttpSession", "open");
        assert!(!track.is_advice_instantiated());
        assert!(!track.matches(&other_open));
        assert!(track.matches(&session_open));
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);

        synthetic.before().unwrap();
        synthetic.before().unwrap();
        assert!(track.is_advice_instantiated());
        assert!(track.matches(&other_open));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_aspect_without_advice_has_no_instantiation_advisor() {
        let class = AspectClass::aspect("EmptyAspect")
            .with_per_clause(PerClause::PerThis("within(*)".to_string()))
            .method(MethodMeta::new("helper"));
        let advisors = ReflectiveAdvisorFactory::new().advisors(TestFactory::new(class)).unwrap();
        assert!(advisors.is_empty());
    }

    #[test]
    fn test_introduction_requires_default_impl() {
        let class = AspectClass::aspect("UsageAspect").field(
            FieldMeta::new("tracked", "UsageTracked").with_declare_parents(DeclareParents::new("*Service")),
        );
        let err = ReflectiveAdvisorFactory::new().advisors(TestFactory::new(class)).unwrap_err();
        assert!(matches!(
            err,
            AopConfigError::MissingDefaultImplementation { ref field, .. } if field == "tracked"
        ));
    }

    #[test]
    fn test_introduction_appended_after_advice() {
        let class = AspectClass::aspect("UsageAspect")
            .method(MethodMeta::annotated("count", AspectAnnotation::after_returning("within(*Service)")))
            .field(
                FieldMeta::new("tracked", "UsageTracked")
                    .with_declare_parents(DeclareParents::new("*Service").with_default_impl("DefaultUsageTracked")),
            );
        let advisors = ReflectiveAdvisorFactory::new().advisors(TestFactory::new(class)).unwrap();
        assert_eq!(advisors.len(), 2);

        let Advisor::Introduction(introduction) = &advisors[1] else {
            panic!("expected introduction last, got {:?}", advisors[1]);
        };
        assert_eq!(introduction.interface_type().name(), "UsageTracked");
        assert_eq!(introduction.default_impl().name(), "DefaultUsageTracked");
        assert!(advisors[1].matches(&JoinPoint::new("app::OrderService", "place")));
        assert!(!advisors[1].matches(&JoinPoint::new("OrderRepository", "save")));
    }

    #[test]
    fn test_advice_on_plain_class_is_rejected() {
        let class = AspectClass::plain("Helper")
            .method(MethodMeta::new("assist"))
            .method(MethodMeta::annotated("audit", AspectAnnotation::before("within(*)")));
        let err = ReflectiveAdvisorFactory::new().advisors(TestFactory::new(class)).unwrap_err();
        assert!(matches!(err, AopConfigError::NotAnAspect { ref method, .. } if method == "audit"));
    }

    #[test]
    fn test_concrete_aspect_inheritance_is_rejected() {
        let class = AspectClass::aspect("ChildAspect").extends(AspectClass::aspect("ParentAspect"));
        let err = ReflectiveAdvisorFactory::new().validate(&class).unwrap_err();
        assert!(matches!(err, AopConfigError::ConcreteAspectInheritance { .. }));
        assert!(err.to_string().contains("ParentAspect"));
    }

    #[test]
    fn test_percflow_is_unsupported() {
        let class = AspectClass::aspect("FlowAspect").with_per_clause(PerClause::PerCflow("within(*)".to_string()));
        let err = ReflectiveAdvisorFactory::new().validate(&class).unwrap_err();
        assert_eq!(err.to_string(), "percflow instantiation model is not supported on aspect [FlowAspect]");
    }

    #[test]
    fn test_unknown_pointcut_reference() {
        let class = AspectClass::aspect("BrokenAspect")
            .method(MethodMeta::annotated("audit", AspectAnnotation::before("missing()")));
        let err = ReflectiveAdvisorFactory::new().advisors(TestFactory::new(class)).unwrap_err();
        assert!(matches!(err, AopConfigError::InvalidPointcut { .. }));
    }
}

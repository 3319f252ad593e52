//! 从容器中的切面 Bean 构建 Advisor
//!
//! 第一次调用扫描所有 Bean 并缓存结果，之后的调用直接从缓存组装

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::advisor::{sort_advisors, Advisor};
use crate::advisor_factory::ReflectiveAdvisorFactory;
use crate::error::{AopConfigError, AopResult};
use crate::instance_factory::{AspectInstanceFactory, BeanFactoryAspectInstanceFactory, PrototypeAspectInstanceFactory};
use crate::metadata::PerClause;
use crate::registration::AspectBeanRegistry;

type EligibilityFn = dyn Fn(&str) -> bool + Send + Sync;

#[derive(Default)]
struct BuilderState {
    /// 扫描得到的切面 Bean 名称，None 表示尚未扫描
    aspect_bean_names: Option<Vec<String>>,

    /// 单例切面的 Advisor
    advisors_cache: HashMap<String, Vec<Advisor>>,

    /// 非单例切面的实例工厂，每次重新生成 Advisor
    factory_cache: HashMap<String, Arc<dyn AspectInstanceFactory>>,
}

/// 切面 Advisor 构建器
pub struct AspectAdvisorsBuilder {
    registry: Arc<dyn AspectBeanRegistry>,
    advisor_factory: ReflectiveAdvisorFactory,
    eligibility: Option<Box<EligibilityFn>>,
    state: Mutex<BuilderState>,
}

impl AspectAdvisorsBuilder {
    pub fn new(registry: Arc<dyn AspectBeanRegistry>) -> Self {
        Self {
            registry,
            advisor_factory: ReflectiveAdvisorFactory::new(),
            eligibility: None,
            state: Mutex::new(BuilderState::default()),
        }
    }

    /// 只考虑满足条件的 Bean
    pub fn with_eligibility<F>(mut self, eligible: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.eligibility = Some(Box::new(eligible));
        self
    }

    fn is_eligible_bean(&self, bean_name: &str) -> bool {
        self.eligibility.as_ref().map_or(true, |eligible| eligible(bean_name))
    }

    /// 构建所有切面的 Advisor
    pub fn build_aspect_advisors(&self) -> AopResult<Vec<Advisor>> {
        let (names, mut cached, factories) = {
            let mut state = self.state.lock();
            match state.aspect_bean_names.clone() {
                None => return self.scan(&mut state),
                Some(names) => (names, state.advisors_cache.clone(), state.factory_cache.clone()),
            }
        };

        let mut advisors = Vec::new();
        for name in &names {
            if let Some(cached) = cached.remove(name) {
                advisors.extend(cached);
            } else if let Some(factory) = factories.get(name) {
                advisors.extend(self.advisor_factory.advisors(Arc::clone(factory))?);
            }
        }
        Ok(advisors)
    }

    /// 可能适用于目标类型的 Advisor，按跨切面顺序排列
    pub fn advisors_for_type(&self, type_name: &str) -> AopResult<Vec<Advisor>> {
        let mut advisors: Vec<Advisor> = self
            .build_aspect_advisors()?
            .into_iter()
            .filter(|advisor| advisor.could_apply_to(type_name))
            .collect();
        sort_advisors(&mut advisors);
        tracing::trace!("{} advisors can apply to '{}'", advisors.len(), type_name);
        Ok(advisors)
    }

    /// 清空缓存，下次调用重新扫描
    pub fn reset(&self) {
        *self.state.lock() = BuilderState::default();
        tracing::debug!("Aspect advisor caches cleared");
    }

    /// 已发现的切面 Bean 名称
    pub fn aspect_bean_names(&self) -> Option<Vec<String>> {
        self.state.lock().aspect_bean_names.clone()
    }

    fn scan(&self, state: &mut BuilderState) -> AopResult<Vec<Advisor>> {
        tracing::debug!("Scanning beans for aspects");
        let mut aspect_names = Vec::new();
        let mut advisors_cache = HashMap::new();
        let mut factory_cache: HashMap<String, Arc<dyn AspectInstanceFactory>> = HashMap::new();
        let mut advisors = Vec::new();

        for bean_name in self.registry.bean_names() {
            if !self.is_eligible_bean(&bean_name) {
                continue;
            }
            let Some(bean_type) = self.registry.bean_type(&bean_name) else {
                continue;
            };
            let Some(metadata) = self.registry.aspect_metadata(&bean_type) else {
                continue;
            };
            if !self.advisor_factory.is_aspect(&metadata) {
                continue;
            }

            aspect_names.push(bean_name.clone());
            let singleton_bean = self.registry.is_singleton(&bean_name);
            if metadata.per_clause == PerClause::Singleton {
                let factory: Arc<dyn AspectInstanceFactory> = Arc::new(BeanFactoryAspectInstanceFactory::new(
                    Arc::clone(&self.registry),
                    bean_name.clone(),
                    metadata,
                ));
                let class_advisors = self.advisor_factory.advisors(Arc::clone(&factory))?;
                if singleton_bean {
                    advisors_cache.insert(bean_name.clone(), class_advisors.clone());
                } else {
                    factory_cache.insert(bean_name.clone(), factory);
                }
                advisors.extend(class_advisors);
            } else {
                if singleton_bean {
                    return Err(AopConfigError::SingletonWithNonSingletonModel { bean_name });
                }
                let factory: Arc<dyn AspectInstanceFactory> = Arc::new(PrototypeAspectInstanceFactory::new(
                    Arc::clone(&self.registry),
                    bean_name.clone(),
                    metadata,
                )?);
                advisors.extend(self.advisor_factory.advisors(Arc::clone(&factory))?);
                factory_cache.insert(bean_name.clone(), factory);
            }
        }

        tracing::info!("Found {} aspect beans with {} advisors", aspect_names.len(), advisors.len());
        state.aspect_bean_names = Some(aspect_names);
        state.advisors_cache = advisors_cache;
        state.factory_cache = factory_cache;
        Ok(advisors)
    }
}

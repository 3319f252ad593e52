//! 切面实例工厂
//!
//! 通知只持有工厂，切面实例在第一次真正需要时才获取

use std::sync::Arc;

use chimera_beans::{ContainerError, Value};
use once_cell::sync::OnceCell;

use crate::error::AopResult;
use crate::metadata::AspectClass;
use crate::registration::AspectBeanRegistry;

/// 未声明顺序的切面排在最后
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// 切面实例工厂
pub trait AspectInstanceFactory: Send + Sync {
    /// 获取切面实例
    fn aspect_instance(&self) -> AopResult<Value>;

    fn metadata(&self) -> &Arc<AspectClass>;

    /// 切面名称（即切面 Bean 名称）
    fn aspect_name(&self) -> &str;

    /// 跨切面排序值
    fn order(&self) -> i32 {
        self.metadata().order.unwrap_or(LOWEST_PRECEDENCE)
    }
}

/// 从容器获取共享的切面 Bean
pub struct BeanFactoryAspectInstanceFactory {
    registry: Arc<dyn AspectBeanRegistry>,
    bean_name: String,
    metadata: Arc<AspectClass>,
}

impl BeanFactoryAspectInstanceFactory {
    pub fn new(registry: Arc<dyn AspectBeanRegistry>, bean_name: impl Into<String>, metadata: Arc<AspectClass>) -> Self {
        Self {
            registry,
            bean_name: bean_name.into(),
            metadata,
        }
    }
}

impl AspectInstanceFactory for BeanFactoryAspectInstanceFactory {
    fn aspect_instance(&self) -> AopResult<Value> {
        Ok(self.registry.get_bean(&self.bean_name)?)
    }

    fn metadata(&self) -> &Arc<AspectClass> {
        &self.metadata
    }

    fn aspect_name(&self) -> &str {
        &self.bean_name
    }
}

/// 每次请求都从容器获取新的原型切面 Bean
pub struct PrototypeAspectInstanceFactory {
    inner: BeanFactoryAspectInstanceFactory,
}

impl PrototypeAspectInstanceFactory {
    /// 切面 Bean 必须是原型作用域
    pub fn new(
        registry: Arc<dyn AspectBeanRegistry>,
        bean_name: impl Into<String>,
        metadata: Arc<AspectClass>,
    ) -> AopResult<Self> {
        let bean_name = bean_name.into();
        if registry.is_singleton(&bean_name) {
            return Err(ContainerError::InvalidDefinition {
                bean_name,
                message: "cannot create prototype aspect instances from a singleton bean".to_string(),
            }
            .into());
        }
        Ok(Self {
            inner: BeanFactoryAspectInstanceFactory::new(registry, bean_name, metadata),
        })
    }
}

impl AspectInstanceFactory for PrototypeAspectInstanceFactory {
    fn aspect_instance(&self) -> AopResult<Value> {
        self.inner.aspect_instance()
    }

    fn metadata(&self) -> &Arc<AspectClass> {
        self.inner.metadata()
    }

    fn aspect_name(&self) -> &str {
        self.inner.aspect_name()
    }
}

/// 只获取一次切面实例的装饰器
///
/// 并发调用时只有一个初始化者执行，其余调用者看到已创建的实例
pub struct LazySingletonAspectInstanceFactory {
    inner: Arc<dyn AspectInstanceFactory>,
    materialized: OnceCell<Value>,
}

impl LazySingletonAspectInstanceFactory {
    pub fn new(inner: Arc<dyn AspectInstanceFactory>) -> Self {
        Self {
            inner,
            materialized: OnceCell::new(),
        }
    }

    /// 切面实例是否已经创建
    pub fn is_materialized(&self) -> bool {
        self.materialized.get().is_some()
    }
}

impl AspectInstanceFactory for LazySingletonAspectInstanceFactory {
    fn aspect_instance(&self) -> AopResult<Value> {
        let instance = self.materialized.get_or_try_init(|| {
            tracing::debug!("Materializing aspect instance '{}'", self.inner.aspect_name());
            self.inner.aspect_instance()
        })?;
        Ok(instance.clone())
    }

    fn metadata(&self) -> &Arc<AspectClass> {
        self.inner.metadata()
    }

    fn aspect_name(&self) -> &str {
        self.inner.aspect_name()
    }

    fn order(&self) -> i32 {
        self.inner.order()
    }
}

// chimera-beans: 构造函数与工厂方法解析
//
// 为依赖注入容器选择构造函数或工厂方法并准备参数：
// - 位置参数、通用参数和按类型自动装配
// - 宽松（类型差异权重）与严格（可赋值性）两种选择模式
// - 解析结果缓存在 Bean 定义上，后续实例化直接复用

pub mod argument_values;
pub mod arguments;
pub mod bean_factory;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod definition;
pub mod error;
pub mod executable;
pub mod factory;
pub mod logging;
pub mod resolver;
pub mod types;
pub mod utils;
pub mod value;
pub mod value_resolver;

// 重新导出常用类型
pub use argument_values::{ConstructorArgumentValues, ValueDescriptor, ValueHolder};
pub use arguments::{ArgumentsHolder, PreparedArgument};
pub use bean_factory::DefaultBeanFactory;
pub use config::{
    ConfigValue, Environment, MapPropertySource, PropertySource, ResolverSettings, TomlPropertySource,
};
pub use conversion::{ConversionError, SimpleTypeConverter, TypeConverter};
pub use definition::{AutowireMode, BeanDefinition, Scope};
pub use error::{ContainerError, ContainerResult};
pub use executable::{
    ConstructedInstance, DefaultParameterNameDiscoverer, Executable, MethodParameter,
    ParameterNameDiscoverer, Visibility,
};
pub use factory::{BeanFactory, DependencyDescriptor, InstantiationStrategy, SimpleInstantiationStrategy};
pub use logging::LoggingSettings;
pub use resolver::ConstructorResolver;
pub use types::{TypeInfo, TypeKind, TypeRef, TypeRegistry};
pub use value::{ObjectRef, Value};
pub use value_resolver::BeanDefinitionValueResolver;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::argument_values::{ValueDescriptor, ValueHolder};
    pub use crate::bean_factory::DefaultBeanFactory;
    pub use crate::config::{ConfigValue, Environment, MapPropertySource, PropertySource, ResolverSettings};
    pub use crate::definition::{AutowireMode, BeanDefinition, Scope};
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::executable::Executable;
    pub use crate::factory::BeanFactory;
    pub use crate::logging::LoggingSettings;
    pub use crate::types::{TypeInfo, TypeRef, TypeRegistry};
    pub use crate::utils;
    pub use crate::value::Value;
    pub use anyhow::{anyhow, Context};
}

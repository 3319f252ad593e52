//! 把参数声明中的值描述解析为运行时值

use crate::argument_values::ValueDescriptor;
use crate::error::ContainerResult;
use crate::factory::BeanFactory;
use crate::value::Value;

/// 值解析器
///
/// 针对一个正在创建的 Bean：引用会触发被引用 Bean 的获取并登记依赖关系，
/// 内嵌定义交给工厂创建，表达式通过 Environment 解析占位符
pub struct BeanDefinitionValueResolver<'a> {
    factory: &'a dyn BeanFactory,
    bean_name: &'a str,
}

impl<'a> BeanDefinitionValueResolver<'a> {
    pub fn new(factory: &'a dyn BeanFactory, bean_name: &'a str) -> Self {
        Self { factory, bean_name }
    }

    /// 解析值描述；查找失败原样返回
    pub fn resolve_value_if_necessary(&self, descriptor: &ValueDescriptor) -> ContainerResult<Value> {
        match descriptor {
            ValueDescriptor::Literal(value) => Ok(value.clone()),
            ValueDescriptor::TypedString { value, target_type } => {
                let converter = self.factory.type_converter();
                Ok(converter.convert_if_necessary(&Value::Str(value.clone()), target_type, None)?)
            }
            ValueDescriptor::Reference(ref_name) => {
                tracing::trace!(
                    "Resolving reference to bean '{}' while creating '{}'",
                    ref_name,
                    self.bean_name
                );
                let bean = self.factory.get_bean(ref_name)?;
                self.factory.register_dependent_bean(ref_name, self.bean_name);
                Ok(bean)
            }
            ValueDescriptor::Nested(definition) => {
                tracing::trace!(
                    "Creating inner bean '{}' for bean '{}'",
                    definition.name(),
                    self.bean_name
                );
                self.factory.create_inner_bean(self.bean_name, definition)
            }
            ValueDescriptor::Expression(expression) => {
                self.factory.environment().resolve_expression(expression)
            }
            ValueDescriptor::List(items) => items
                .iter()
                .map(|item| self.resolve_value_if_necessary(item))
                .collect::<ContainerResult<Vec<_>>>()
                .map(Value::List),
        }
    }
}

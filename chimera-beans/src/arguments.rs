//! 单个候选者的参数绑定结果

use std::sync::Arc;

use crate::argument_values::ValueDescriptor;
use crate::constants::{MAX_WEIGHT, RAW_ARGUMENT_BIAS, RAW_ASSIGNABILITY_BIAS};
use crate::definition::BeanDefinition;
use crate::executable::Executable;
use crate::types::{TypeRef, TypeRegistry};
use crate::value::Value;

/// 缓存的参数模板项
#[derive(Debug, Clone)]
pub enum PreparedArgument {
    /// 已转换的值，直接复用
    Converted(Value),
    /// 每次请求重新自动装配
    Autowired,
    /// 每次请求重新解析并转换
    Deferred(ValueDescriptor),
}

/// 参数绑定结果
///
/// 三个数组按形参位置对齐：原始值、转换后的值、用于缓存的模板
#[derive(Debug, Clone)]
pub struct ArgumentsHolder {
    pub raw: Vec<Value>,
    pub arguments: Vec<Value>,
    pub prepared: Vec<PreparedArgument>,

    /// 模板中是否存在需要重新解析的项
    pub resolve_necessary: bool,
}

impl ArgumentsHolder {
    pub fn with_size(size: usize) -> Self {
        Self {
            raw: vec![Value::Null; size],
            arguments: vec![Value::Null; size],
            prepared: vec![PreparedArgument::Converted(Value::Null); size],
            resolve_necessary: false,
        }
    }

    /// 显式传入的参数：三个数组内容相同
    pub fn from_arguments(args: Vec<Value>) -> Self {
        Self {
            prepared: args.iter().cloned().map(PreparedArgument::Converted).collect(),
            raw: args.clone(),
            arguments: args,
            resolve_necessary: false,
        }
    }

    /// 宽松模式的类型差异权重
    ///
    /// 原始值的权重减去偏置后参与比较，原始值类型完全匹配时优先于转换后的匹配
    pub fn type_difference_weight(&self, registry: &TypeRegistry, param_types: &[TypeRef]) -> i64 {
        let converted = registry.type_difference_weight(param_types, &self.arguments);
        let raw = registry.type_difference_weight(param_types, &self.raw) - RAW_ARGUMENT_BIAS;
        raw.min(converted)
    }

    /// 严格模式的可赋值性权重
    ///
    /// 只区分三档：转换后不可赋值、原始值不可赋值、全部可赋值
    pub fn assignability_weight(&self, registry: &TypeRegistry, param_types: &[TypeRef]) -> i64 {
        let all_assignable = |values: &[Value]| {
            param_types
                .iter()
                .zip(values)
                .all(|(ty, value)| registry.is_assignable_value(ty, value))
        };
        if !all_assignable(&self.arguments) {
            return MAX_WEIGHT;
        }
        if !all_assignable(&self.raw) {
            return MAX_WEIGHT - RAW_ASSIGNABILITY_BIAS;
        }
        MAX_WEIGHT - RAW_ARGUMENT_BIAS
    }

    /// 把选定的可执行体和参数写入 Bean 定义的缓存槽
    pub fn store_cache(&self, definition: &BeanDefinition, executable: &Arc<Executable>) {
        let mut cache = definition.resolution();
        cache.resolved_executable = Some(Arc::clone(executable));
        cache.arguments_resolved = true;
        if self.resolve_necessary {
            cache.prepared_arguments = Some(self.prepared.clone());
            cache.resolved_arguments = None;
        } else {
            cache.resolved_arguments = Some(self.arguments.clone());
            cache.prepared_arguments = None;
        }
        tracing::trace!(
            "Cached {} for bean '{}' (re-resolution needed: {})",
            executable,
            definition.name(),
            self.resolve_necessary
        );
    }
}

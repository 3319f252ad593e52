//! 类型转换
//!
//! 解析器在绑定参数时把已解析的值转换为形参类型

use std::sync::Arc;

use thiserror::Error;

use crate::constants::{
    ANY_TYPE, BOOL_TYPE, BOXED_BOOL_TYPE, BOXED_F64_TYPE, BOXED_I32_TYPE, BOXED_I64_TYPE,
    F64_TYPE, I32_TYPE, I64_TYPE, LIST_TYPE, STRING_TYPE,
};
use crate::executable::MethodParameter;
use crate::types::{TypeRef, TypeRegistry};
use crate::value::Value;

/// 类型转换错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// 没有可用的转换规则
    #[error("Cannot convert value of type '{value_type}' to required type '{required_type}'{site}")]
    TypeMismatch {
        value_type: String,
        required_type: String,
        site: String,
    },

    /// 存在转换规则但值的格式不合法
    #[error("Failed to convert value '{value}' to required type '{required_type}'{site}: {reason}")]
    InvalidValue {
        value: String,
        required_type: String,
        site: String,
        reason: String,
    },
}

impl ConversionError {
    fn mismatch(value: &Value, required_type: &TypeRef, parameter: Option<&MethodParameter<'_>>) -> Self {
        ConversionError::TypeMismatch {
            value_type: value.type_name(),
            required_type: required_type.to_string(),
            site: describe_site(parameter),
        }
    }

    fn invalid(
        value: &Value,
        required_type: &TypeRef,
        parameter: Option<&MethodParameter<'_>>,
        reason: impl ToString,
    ) -> Self {
        ConversionError::InvalidValue {
            value: value.to_string(),
            required_type: required_type.to_string(),
            site: describe_site(parameter),
            reason: reason.to_string(),
        }
    }
}

fn describe_site(parameter: Option<&MethodParameter<'_>>) -> String {
    parameter
        .map(|p| format!(" for {}", p))
        .unwrap_or_default()
}

/// 类型转换能力
pub trait TypeConverter: Send + Sync {
    /// 必要时把值转换为目标类型，已可赋值的值原样返回
    fn convert_if_necessary(
        &self,
        value: &Value,
        required_type: &TypeRef,
        parameter: Option<&MethodParameter<'_>>,
    ) -> Result<Value, ConversionError>;
}

/// 默认类型转换器
///
/// 支持字符串到布尔/数值、数值拓宽、标量到字符串以及 `List<T>` 的逐元素转换
#[derive(Debug, Clone)]
pub struct SimpleTypeConverter {
    registry: Arc<TypeRegistry>,
}

impl SimpleTypeConverter {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    fn convert_scalar(
        &self,
        value: &Value,
        required_type: &TypeRef,
        parameter: Option<&MethodParameter<'_>>,
    ) -> Result<Value, ConversionError> {
        let invalid = |reason: &dyn ToString| {
            ConversionError::invalid(value, required_type, parameter, reason.to_string())
        };

        let converted = match (required_type.name(), value) {
            (BOOL_TYPE | BOXED_BOOL_TYPE, Value::Str(s)) => match s.trim() {
                "true" | "yes" | "on" | "1" => Value::Bool(true),
                "false" | "no" | "off" | "0" => Value::Bool(false),
                other => return Err(invalid(&format!("'{}' is not a boolean", other))),
            },
            (I32_TYPE | BOXED_I32_TYPE, Value::Str(s)) => {
                Value::Int(s.trim().parse::<i32>().map_err(|e| invalid(&e))?)
            }
            (I32_TYPE | BOXED_I32_TYPE, Value::Long(l)) => {
                Value::Int(i32::try_from(*l).map_err(|e| invalid(&e))?)
            }
            (I64_TYPE | BOXED_I64_TYPE, Value::Str(s)) => {
                Value::Long(s.trim().parse::<i64>().map_err(|e| invalid(&e))?)
            }
            (I64_TYPE | BOXED_I64_TYPE, Value::Int(i)) => Value::Long(i64::from(*i)),
            (F64_TYPE | BOXED_F64_TYPE, Value::Str(s)) => {
                Value::Double(s.trim().parse::<f64>().map_err(|e| invalid(&e))?)
            }
            (F64_TYPE | BOXED_F64_TYPE, Value::Int(i)) => Value::Double(f64::from(*i)),
            (F64_TYPE | BOXED_F64_TYPE, Value::Long(l)) => Value::Double(*l as f64),
            (STRING_TYPE, Value::Bool(_) | Value::Int(_) | Value::Long(_) | Value::Double(_)) => {
                Value::Str(value.to_string())
            }
            _ => return Err(ConversionError::mismatch(value, required_type, parameter)),
        };
        Ok(converted)
    }
}

impl TypeConverter for SimpleTypeConverter {
    fn convert_if_necessary(
        &self,
        value: &Value,
        required_type: &TypeRef,
        parameter: Option<&MethodParameter<'_>>,
    ) -> Result<Value, ConversionError> {
        if required_type.name() == ANY_TYPE {
            return Ok(value.clone());
        }

        // 带元素类型的列表需要逐元素转换
        if let (Value::List(items), Some(element_type)) = (value, required_type.type_argument()) {
            if required_type.name().starts_with(LIST_TYPE) {
                let converted = items
                    .iter()
                    .map(|item| self.convert_if_necessary(item, &element_type, parameter))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Value::List(converted));
            }
        }

        if self.registry.is_assignable_value(required_type, value) {
            return Ok(value.clone());
        }
        if value.is_null() {
            return Err(ConversionError::mismatch(value, required_type, parameter));
        }
        self.convert_scalar(value, required_type, parameter)
    }
}

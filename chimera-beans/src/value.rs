//! 运行时值模型

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::constants::{BOOL_TYPE, F64_TYPE, I32_TYPE, I64_TYPE, LIST_TYPE, STRING_TYPE};
use crate::types::TypeRef;

/// 托管对象句柄
///
/// 保存对象的运行时类型和类型擦除后的实例
#[derive(Clone)]
pub struct ObjectRef {
    type_ref: TypeRef,
    instance: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    pub fn new<T: Any + Send + Sync>(type_ref: impl Into<TypeRef>, instance: T) -> Self {
        Self {
            type_ref: type_ref.into(),
            instance: Arc::new(instance),
        }
    }

    pub fn from_arc(type_ref: impl Into<TypeRef>, instance: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            type_ref: type_ref.into(),
            instance,
        }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// 按具体类型借用实例
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    /// 两个句柄是否指向同一个实例
    pub fn same_instance(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.type_ref)
    }
}

/// 运行时值
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    List(Vec<Value>),
    Object(ObjectRef),
}

impl Value {
    /// 创建对象值
    pub fn object<T: Any + Send + Sync>(type_ref: impl Into<TypeRef>, instance: T) -> Self {
        Value::Object(ObjectRef::new(type_ref, instance))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 值的运行时类型，null 没有类型
    pub fn type_ref(&self) -> Option<TypeRef> {
        let name = match self {
            Value::Null => return None,
            Value::Bool(_) => BOOL_TYPE,
            Value::Int(_) => I32_TYPE,
            Value::Long(_) => I64_TYPE,
            Value::Double(_) => F64_TYPE,
            Value::Str(_) => STRING_TYPE,
            Value::List(_) => LIST_TYPE,
            Value::Object(object) => return Some(object.type_ref().clone()),
        };
        Some(TypeRef::new(name))
    }

    /// 用于错误消息的类型名称
    pub fn type_name(&self) -> String {
        self.type_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.same_instance(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Double(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(object) => write!(f, "<{}>", object.type_ref()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

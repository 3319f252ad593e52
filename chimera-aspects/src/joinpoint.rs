//! 连接点（JoinPoint）定义
//!
//! 切点判断只需要连接点的静态信息：目标类型、方法名和参数个数

use std::fmt;

use chimera_beans::TypeRef;

/// 连接点信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPoint {
    /// 目标类型
    pub target_type: TypeRef,

    /// 方法名称
    pub method_name: String,

    pub argument_count: usize,

    /// 目标 Bean 名称（如果已知）
    pub bean_name: Option<String>,
}

impl JoinPoint {
    /// 创建新的连接点
    pub fn new(target_type: impl Into<TypeRef>, method_name: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            method_name: method_name.into(),
            argument_count: 0,
            bean_name: None,
        }
    }

    pub fn with_argument_count(mut self, count: usize) -> Self {
        self.argument_count = count;
        self
    }

    pub fn with_bean_name(mut self, bean_name: impl Into<String>) -> Self {
        self.bean_name = Some(bean_name.into());
        self
    }

    /// 获取完整的方法签名
    pub fn signature(&self) -> String {
        format!("{}::{}", self.target_type, self.method_name)
    }
}

impl fmt::Display for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.signature(), self.argument_count)
    }
}

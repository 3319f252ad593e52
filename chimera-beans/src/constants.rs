//! 解析器常量定义
//!
//! 内置类型名称、权重哨兵值以及配置键集中定义在这里

/// 所有对象类型的根类型
pub const ANY_TYPE: &str = "Any";

/// 字符串类型
pub const STRING_TYPE: &str = "String";

/// 列表类型
pub const LIST_TYPE: &str = "List";

/// 无返回值（用于工厂方法校验）
pub const UNIT_TYPE: &str = "()";

/// 基本类型及其装箱类型
///
/// 基本类型不接受 null，装箱类型可以；两者在可赋值性检查中视为等价
pub const BOOL_TYPE: &str = "bool";
pub const BOXED_BOOL_TYPE: &str = "Option<bool>";
pub const I32_TYPE: &str = "i32";
pub const BOXED_I32_TYPE: &str = "Option<i32>";
pub const I64_TYPE: &str = "i64";
pub const BOXED_I64_TYPE: &str = "Option<i64>";
pub const F64_TYPE: &str = "f64";
pub const BOXED_F64_TYPE: &str = "Option<f64>";

/// 基本类型与装箱类型的对应关系
pub const PRIMITIVE_WRAPPERS: &[(&str, &str)] = &[
    (BOOL_TYPE, BOXED_BOOL_TYPE),
    (I32_TYPE, BOXED_I32_TYPE),
    (I64_TYPE, BOXED_I64_TYPE),
    (F64_TYPE, BOXED_F64_TYPE),
];

/// 类型差异权重的最大值（表示不可赋值）
pub const MAX_WEIGHT: i64 = i32::MAX as i64;

/// 宽松模式下原始参数匹配的偏置，原始参数权重减去该值后再与转换后参数权重比较
pub const RAW_ARGUMENT_BIAS: i64 = 1024;

/// 严格模式下原始参数不可赋值时的偏置
pub const RAW_ASSIGNABILITY_BIAS: i64 = 512;

/// 每经过一层父类增加的权重
pub const SUPERCLASS_HOP_WEIGHT: i64 = 2;

/// 参数类型为接口时增加的权重
pub const INTERFACE_WEIGHT: i64 = 1;

/// 解析器配置键
pub const LENIENT_RESOLUTION_KEY: &str = "chimera.beans.lenient-constructor-resolution";
pub const NON_PUBLIC_ACCESS_KEY: &str = "chimera.beans.non-public-access-allowed";
pub const AUTOWIRE_MODE_KEY: &str = "chimera.beans.autowire-mode";

/// 日志配置键
pub const LOG_LEVEL_KEY: &str = "chimera.logging.level";
pub const TRACE_RESOLUTION_KEY: &str = "chimera.logging.trace-resolution";
pub const LOG_JSON_KEY: &str = "chimera.logging.json";

/// 检查给定类型名称是否为内置基本类型
pub fn is_primitive_type_name(type_name: &str) -> bool {
    PRIMITIVE_WRAPPERS.iter().any(|(primitive, _)| *primitive == type_name)
}

/// 获取基本类型对应的装箱类型
pub fn wrapper_of(primitive: &str) -> Option<&'static str> {
    PRIMITIVE_WRAPPERS
        .iter()
        .find(|(p, _)| *p == primitive)
        .map(|(_, wrapper)| *wrapper)
}

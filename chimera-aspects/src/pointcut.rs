//! 切点（Pointcut）表达式系统
//!
//! 支持的文本形式：
//! - `execution(* UserService.get*(..))`：类型和方法模式，参数列表为 `..` 时不限个数
//! - `within(*Service)`：目标类型模式
//! - `bean(user*)`：目标 Bean 名称模式
//! - `services()`：引用同一切面中声明的切点方法
//! - `&&`、`||`、`!` 和括号组合

use std::fmt;

use regex::Regex;

use crate::error::{AopConfigError, AopResult};
use crate::joinpoint::JoinPoint;

/// 通配符模式，`*` 匹配任意字符串
#[derive(Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Option<Regex>,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> AopResult<Self> {
        let pattern = pattern.trim();
        let regex = if pattern.contains('*') && pattern != "*" {
            let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
            let compiled = Regex::new(&format!("^{}$", escaped.join(".*"))).map_err(|e| {
                AopConfigError::InvalidPointcut {
                    expression: pattern.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Some(compiled)
        } else {
            None
        };
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, target: &str) -> bool {
        match &self.regex {
            _ if self.source == "*" => true,
            Some(regex) => regex.is_match(target),
            None => self.source == target,
        }
    }

    /// 类型名称可以按完整名称或简单名称匹配
    pub fn matches_type(&self, type_name: &str) -> bool {
        let simple = type_name.rsplit("::").next().unwrap_or(type_name);
        self.matches(type_name) || self.matches(simple)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for WildcardPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// 切点表达式
#[derive(Clone, PartialEq)]
pub enum PointcutExpression {
    /// 匹配所有连接点
    All,

    Execution {
        type_pattern: WildcardPattern,
        method_pattern: WildcardPattern,
        /// `None` 表示参数个数不限
        arity: Option<usize>,
    },

    Within(WildcardPattern),

    Bean(WildcardPattern),

    /// 对切点方法的引用，构建通知时替换为被引用的表达式
    Named(String),

    And(Box<PointcutExpression>, Box<PointcutExpression>),
    Or(Box<PointcutExpression>, Box<PointcutExpression>),
    Not(Box<PointcutExpression>),
}

impl PointcutExpression {
    /// 解析切点表达式文本
    pub fn parse(expression: &str) -> AopResult<Self> {
        let mut parser = Parser {
            source: expression,
            rest: expression,
        };
        let parsed = parser.parse_or()?;
        parser.skip_whitespace();
        if !parser.rest.is_empty() {
            return Err(parser.error(format!("unexpected trailing input '{}'", parser.rest)));
        }
        Ok(parsed)
    }

    /// 检查连接点是否匹配；未替换的命名引用不匹配任何连接点
    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        match self {
            PointcutExpression::All => true,
            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
                arity,
            } => {
                type_pattern.matches_type(join_point.target_type.name())
                    && method_pattern.matches(&join_point.method_name)
                    && arity.map_or(true, |n| n == join_point.argument_count)
            }
            PointcutExpression::Within(pattern) => pattern.matches_type(join_point.target_type.name()),
            PointcutExpression::Bean(pattern) => join_point
                .bean_name
                .as_deref()
                .map(|name| pattern.matches(name))
                .unwrap_or(false),
            PointcutExpression::Named(_) => false,
            PointcutExpression::And(left, right) => left.matches(join_point) && right.matches(join_point),
            PointcutExpression::Or(left, right) => left.matches(join_point) || right.matches(join_point),
            PointcutExpression::Not(expr) => !expr.matches(join_point),
        }
    }

    /// 只看目标类型能否匹配，用于引入声明和实例化模型的筛选
    pub fn could_match_type(&self, type_name: &str) -> bool {
        match self {
            PointcutExpression::Execution { type_pattern, .. } | PointcutExpression::Within(type_pattern) => {
                type_pattern.matches_type(type_name)
            }
            PointcutExpression::And(left, right) => left.could_match_type(type_name) && right.could_match_type(type_name),
            PointcutExpression::Or(left, right) => left.could_match_type(type_name) || right.could_match_type(type_name),
            PointcutExpression::Named(_) => false,
            PointcutExpression::All | PointcutExpression::Bean(_) | PointcutExpression::Not(_) => true,
        }
    }

    /// 替换所有命名引用
    ///
    /// `lookup` 返回被引用切点的表达式文本；引用链出现环时报错
    pub fn resolve_references<F>(self, lookup: &F) -> AopResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.resolve_with(lookup, &mut Vec::new())
    }

    fn resolve_with<F>(self, lookup: &F, resolving: &mut Vec<String>) -> AopResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(match self {
            PointcutExpression::Named(name) => {
                if resolving.contains(&name) {
                    return Err(AopConfigError::InvalidPointcut {
                        expression: format!("{}()", name),
                        reason: format!("circular pointcut reference: {} -> {}", resolving.join(" -> "), name),
                    });
                }
                let text = lookup(&name).ok_or_else(|| AopConfigError::InvalidPointcut {
                    expression: format!("{}()", name),
                    reason: "no pointcut declared with this name".to_string(),
                })?;
                resolving.push(name);
                let resolved = PointcutExpression::parse(&text)?.resolve_with(lookup, resolving)?;
                resolving.pop();
                resolved
            }
            PointcutExpression::And(left, right) => PointcutExpression::And(
                Box::new(left.resolve_with(lookup, resolving)?),
                Box::new(right.resolve_with(lookup, resolving)?),
            ),
            PointcutExpression::Or(left, right) => PointcutExpression::Or(
                Box::new(left.resolve_with(lookup, resolving)?),
                Box::new(right.resolve_with(lookup, resolving)?),
            ),
            PointcutExpression::Not(expr) => PointcutExpression::Not(Box::new(expr.resolve_with(lookup, resolving)?)),
            other => other,
        })
    }

    /// 与运算
    pub fn and(self, other: PointcutExpression) -> Self {
        PointcutExpression::And(Box::new(self), Box::new(other))
    }

    /// 或运算
    pub fn or(self, other: PointcutExpression) -> Self {
        PointcutExpression::Or(Box::new(self), Box::new(other))
    }

    /// 非运算
    pub fn not(self) -> Self {
        PointcutExpression::Not(Box::new(self))
    }
}

impl fmt::Debug for PointcutExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointcutExpression::All => write!(f, "All"),
            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
                arity,
            } => match arity {
                Some(n) => write!(f, "Execution({:?}.{:?}/{})", type_pattern, method_pattern, n),
                None => write!(f, "Execution({:?}.{:?})", type_pattern, method_pattern),
            },
            PointcutExpression::Within(p) => write!(f, "Within({:?})", p),
            PointcutExpression::Bean(p) => write!(f, "Bean({:?})", p),
            PointcutExpression::Named(name) => write!(f, "Named({})", name),
            PointcutExpression::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            PointcutExpression::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            PointcutExpression::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}

/// 递归下降解析器
struct Parser<'a> {
    source: &'a str,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> AopConfigError {
        AopConfigError::InvalidPointcut {
            expression: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn parse_or(&mut self) -> AopResult<PointcutExpression> {
        let mut expr = self.parse_and()?;
        while self.eat("||") {
            expr = expr.or(self.parse_and()?);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> AopResult<PointcutExpression> {
        let mut expr = self.parse_unary()?;
        while self.eat("&&") {
            expr = expr.and(self.parse_unary()?);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> AopResult<PointcutExpression> {
        if self.eat("!") {
            return Ok(self.parse_unary()?.not());
        }
        if self.eat("(") {
            let expr = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("missing ')'"));
            }
            return Ok(expr);
        }
        self.parse_primitive()
    }

    fn parse_primitive(&mut self) -> AopResult<PointcutExpression> {
        self.skip_whitespace();
        let end = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        let (ident, rest) = self.rest.split_at(end);
        if ident.is_empty() {
            return Err(self.error(format!("expected a pointcut designator at '{}'", self.rest)));
        }
        self.rest = rest;
        if !self.eat("(") {
            return Err(self.error(format!("expected '(' after '{}'", ident)));
        }
        let body = self.take_balanced()?;

        match ident {
            "execution" => self.parse_execution(body),
            "within" => Ok(PointcutExpression::Within(WildcardPattern::new(body)?)),
            "bean" => Ok(PointcutExpression::Bean(WildcardPattern::new(body)?)),
            name if body.trim().is_empty() => Ok(PointcutExpression::Named(name.to_string())),
            other => Err(self.error(format!("unsupported pointcut designator '{}'", other))),
        }
    }

    /// 读取到与已消费的 '(' 匹配的 ')' 为止
    fn take_balanced(&mut self) -> AopResult<&'a str> {
        let mut depth = 1;
        for (i, c) in self.rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let body = &self.rest[..i];
                        self.rest = &self.rest[i + 1..];
                        return Ok(body);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced parentheses"))
    }

    fn parse_execution(&self, body: &str) -> AopResult<PointcutExpression> {
        let open = body
            .rfind('(')
            .ok_or_else(|| self.error("execution() requires a parameter list"))?;
        let params = body[open + 1..].trim_end().trim_end_matches(')').trim();
        let signature = body[..open]
            .split_whitespace()
            .last()
            .ok_or_else(|| self.error("execution() requires a method pattern"))?;

        let (type_pattern, method_pattern) = match signature.rsplit_once('.') {
            Some((ty, method)) => (ty, method),
            None => ("*", signature),
        };
        let arity = match params {
            "" => Some(0),
            p if p.split(',').any(|s| s.trim() == "..") => None,
            p => Some(p.split(',').count()),
        };

        Ok(PointcutExpression::Execution {
            type_pattern: WildcardPattern::new(type_pattern)?,
            method_pattern: WildcardPattern::new(method_pattern)?,
            arity,
        })
    }
}

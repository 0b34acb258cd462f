//! 可修正缺陷的诊断信息
//!
//! 宽松模式下被自动修正的输入（填充位、超长 salt、越界 rounds）不作为错误返回，
//! 而是以 [`Diagnostic`] 的形式附在 [`Diagnosed`] 结果上。每条诊断在记录时
//! 同时通过 `log::warn!` 输出一次。

use std::fmt;

use crate::error::Result;

/// 诊断类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// 编码文本中被错误设置的填充位已清除
    PaddingBitsCleared,
    /// salt 超过最大长度，已截断
    SaltTruncated,
    /// rounds 超出允许范围，已钳制到边界
    RoundsClamped,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::PaddingBitsCleared => "padding_bits_cleared",
            DiagnosticKind::SaltTruncated => "salt_truncated",
            DiagnosticKind::RoundsClamped => "rounds_clamped",
        }
    }
}

/// 一条诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 产生诊断的 handler 名称
    pub handler: &'static str,
    /// 诊断类型
    pub kind: DiagnosticKind,
    /// 人类可读的说明
    pub message: String,
}

impl Diagnostic {
    pub fn new(handler: &'static str, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            handler,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.handler, self.kind.as_str(), self.message)
    }
}

/// 携带诊断信息的结果
///
/// # Example
///
/// ```rust
/// use passrs::handler::{Diagnosed, Diagnostic, DiagnosticKind};
///
/// let mut salt = Diagnosed::new("abc".to_string());
/// assert!(salt.is_clean());
///
/// salt.warn(Diagnostic::new("demo", DiagnosticKind::SaltTruncated, "salt too long"));
/// assert_eq!(salt.diagnostics.len(), 1);
/// assert_eq!(salt.into_value(), "abc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosed<T> {
    /// 结果值
    pub value: T,
    /// 产生结果时记录的诊断
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Diagnosed<T> {
    /// 不带诊断的结果
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// 记录一条诊断，并通过 `log` 输出
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// 是否没有任何诊断
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 丢弃诊断，只取值
    pub fn into_value(self) -> T {
        self.value
    }

    /// 拆分为值和诊断
    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.value, self.diagnostics)
    }

    /// 转换值，保留诊断
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Diagnosed<U> {
        Diagnosed {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    /// 使用可能失败的函数转换值，保留诊断
    pub fn try_map<U>(self, f: impl FnOnce(T) -> Result<U>) -> Result<Diagnosed<U>> {
        Ok(Diagnosed {
            value: f(self.value)?,
            diagnostics: self.diagnostics,
        })
    }

    /// 取出另一个结果的值，并把它的诊断并入当前结果（不会重复输出日志）
    pub fn absorb<U>(&mut self, other: Diagnosed<U>) -> U {
        self.diagnostics.extend(other.diagnostics);
        other.value
    }
}

impl<T> From<T> for Diagnosed<T> {
    fn from(value: T) -> Self {
        Diagnosed::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new("bcrypt", DiagnosticKind::PaddingBitsCleared, "salt padding");
        assert_eq!(d.to_string(), "bcrypt [padding_bits_cleared]: salt padding");
    }

    #[test]
    fn test_map_keeps_diagnostics() {
        let mut d = Diagnosed::new(21);
        d.warn(Diagnostic::new("x", DiagnosticKind::RoundsClamped, "clamped"));
        let mapped = d.map(|v| v * 2);
        assert_eq!(mapped.value, 42);
        assert_eq!(mapped.diagnostics.len(), 1);
    }

    #[test]
    fn test_try_map_propagates_error() {
        let d = Diagnosed::new(1);
        let result: Result<Diagnosed<u32>> = d.try_map(|_| Err(crate::error::Error::internal("boom")));
        assert!(result.is_err());
    }

    #[test]
    fn test_absorb() {
        let mut outer = Diagnosed::new(());
        let mut inner = Diagnosed::new("salt");
        inner.warn(Diagnostic::new("x", DiagnosticKind::SaltTruncated, "cut"));

        let value = outer.absorb(inner);
        assert_eq!(value, "salt");
        assert!(!outer.is_clean());
        assert_eq!(outer.diagnostics[0].kind, DiagnosticKind::SaltTruncated);
    }
}

//! 密码输入
//!
//! [`Secret`] 统一表示调用方提供的密码：文本、原始字节或缺失。
//! [`SecretPolicy`] 在进入任何耗时的校验和计算之前检查密码：
//!
//! - 缺失的密码返回 `MissingSecret`
//! - 超过长度上限的密码返回 `PasswordTooLarge`
//! - 可选地对文本密码执行 SASLprep（RFC 4013）规范化
//!
//! 文本密码总是以 UTF-8 编码后参与哈希。

use std::borrow::Cow;

use crate::config;
use crate::error::{Error, PasswordHashError, Result};

/// 调用方提供的密码
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Secret<'a> {
    /// 未提供密码
    Missing,
    /// 文本密码（UTF-8）
    Text(&'a str),
    /// 原始字节密码
    Bytes(&'a [u8]),
}

impl<'a> Secret<'a> {
    /// 密码的原始字节；缺失时返回 `None`
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Secret::Missing => None,
            Secret::Text(text) => Some(text.as_bytes()),
            Secret::Bytes(bytes) => Some(bytes),
        }
    }

    /// 是否缺失
    pub fn is_missing(&self) -> bool {
        matches!(self, Secret::Missing)
    }
}

// 避免密码出现在 Debug 输出和日志中
impl std::fmt::Debug for Secret<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Secret::Missing => write!(f, "Secret::Missing"),
            Secret::Text(_) => write!(f, "Secret::Text(<redacted>)"),
            Secret::Bytes(_) => write!(f, "Secret::Bytes(<redacted>)"),
        }
    }
}

impl<'a> From<&'a str> for Secret<'a> {
    fn from(text: &'a str) -> Self {
        Secret::Text(text)
    }
}

impl<'a> From<&'a String> for Secret<'a> {
    fn from(text: &'a String) -> Self {
        Secret::Text(text.as_str())
    }
}

impl<'a> From<&'a [u8]> for Secret<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Secret::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Secret<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Secret::Bytes(bytes.as_slice())
    }
}

impl<'a> From<&'a Vec<u8>> for Secret<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Secret::Bytes(bytes.as_slice())
    }
}

impl<'a, T: Into<Secret<'a>>> From<Option<T>> for Secret<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Secret::Missing, Into::into)
    }
}

/// 密码检查策略
///
/// # Example
///
/// ```rust
/// use passrs::secret::{Secret, SecretPolicy};
///
/// let policy = SecretPolicy::new().with_max_size(8);
/// assert!(policy.prepare(Secret::from("short")).is_ok());
/// assert!(policy.prepare(Secret::from("much too long")).is_err());
/// assert!(policy.prepare(Secret::Missing).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPolicy {
    /// 允许的最大字节数
    pub max_size: usize,
    /// 是否对文本密码执行 SASLprep 规范化
    pub normalize: bool,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self {
            max_size: config::max_password_size(),
            normalize: false,
        }
    }
}

impl SecretPolicy {
    /// 使用进程级默认值创建策略
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置最大字节数
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// 设置是否执行 SASLprep 规范化
    pub fn with_normalization(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    /// 检查并准备密码字节
    ///
    /// 长度检查作用于调用方提供的原始输入，发生在规范化之前。
    ///
    /// # Errors
    ///
    /// - `MissingSecret`: 未提供密码
    /// - `PasswordTooLarge`: 超过 `max_size`
    /// - `InvalidSecret`: 规范化时遇到 SASLprep 禁止的字符
    pub fn prepare<'a>(&self, secret: Secret<'a>) -> Result<Cow<'a, [u8]>> {
        let bytes = secret
            .as_bytes()
            .ok_or(Error::PasswordHash(PasswordHashError::MissingSecret))?;
        if bytes.len() > self.max_size {
            return Err(Error::PasswordHash(PasswordHashError::PasswordTooLarge {
                max_size: self.max_size,
                actual: bytes.len(),
            }));
        }
        match secret {
            Secret::Text(text) if self.normalize => match saslprep(text)? {
                Cow::Borrowed(text) => Ok(Cow::Borrowed(text.as_bytes())),
                Cow::Owned(text) => Ok(Cow::Owned(text.into_bytes())),
            },
            _ => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// 使用 SASLprep（RFC 4013）规范化密码
///
/// 映射非 ASCII 空格、移除"映射为空"的字符、做 NFKC 规范化，
/// 并拒绝控制字符、私用区字符和不合法的双向文本。
///
/// # Example
///
/// ```rust
/// use passrs::secret::saslprep;
///
/// // U+00AD (soft hyphen) 被移除，U+2168 (罗马数字九) 规范化为 "IX"
/// assert_eq!(saslprep("I\u{00AD}X").unwrap(), "IX");
/// assert_eq!(saslprep("\u{2168}").unwrap(), "IX");
/// assert!(saslprep("\u{0007}").is_err());
/// ```
pub fn saslprep(source: &str) -> Result<Cow<'_, str>> {
    stringprep::saslprep(source).map_err(|e| {
        Error::PasswordHash(PasswordHashError::InvalidSecret(format!(
            "saslprep failed: {}",
            e
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_conversions() {
        assert_eq!(Secret::from("abc").as_bytes(), Some(&b"abc"[..]));
        assert_eq!(Secret::from(&b"abc"[..]).as_bytes(), Some(&b"abc"[..]));
        assert_eq!(Secret::from(b"abc").as_bytes(), Some(&b"abc"[..]));
        assert!(Secret::from(None::<&str>).is_missing());
        assert_eq!(Secret::from(Some("x")), Secret::Text("x"));

        let owned = String::from("owned");
        assert_eq!(Secret::from(&owned), Secret::Text("owned"));
        let bytes = vec![1u8, 2, 3];
        assert_eq!(Secret::from(&bytes), Secret::Bytes(&[1, 2, 3]));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let debug = format!("{:?}", Secret::from("hunter2"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_prepare_missing() {
        let err = SecretPolicy::new().prepare(Secret::Missing).unwrap_err();
        assert_eq!(err, Error::PasswordHash(PasswordHashError::MissingSecret));
    }

    #[test]
    fn test_prepare_too_large() {
        let policy = SecretPolicy::new().with_max_size(4);
        assert!(policy.prepare(Secret::from("four")).is_ok());

        let err = policy.prepare(Secret::from("fives")).unwrap_err();
        assert_eq!(
            err,
            Error::PasswordHash(PasswordHashError::PasswordTooLarge {
                max_size: 4,
                actual: 5
            })
        );
    }

    #[test]
    fn test_prepare_counts_utf8_bytes() {
        // "密码" 是 6 个 UTF-8 字节
        let policy = SecretPolicy::new().with_max_size(5);
        assert!(policy.prepare(Secret::from("密码")).is_err());
    }

    #[test]
    fn test_prepare_default_limit() {
        let policy = SecretPolicy::default();
        assert_eq!(policy.max_size, config::max_password_size());
        assert!(!policy.normalize);
    }

    #[test]
    fn test_prepare_normalization() {
        let policy = SecretPolicy::new().with_normalization(true);
        let prepared = policy.prepare(Secret::from("\u{2168}")).unwrap();
        assert_eq!(&*prepared, b"IX");

        // 字节密码不做规范化
        let prepared = policy.prepare(Secret::from("\u{2168}".as_bytes())).unwrap();
        assert_eq!(&*prepared, "\u{2168}".as_bytes());

        assert!(policy.prepare(Secret::from("bell\u{0007}")).is_err());
    }

    #[test]
    fn test_prepare_without_normalization_is_passthrough() {
        let prepared = SecretPolicy::new().prepare(Secret::from("\u{2168}")).unwrap();
        assert_eq!(&*prepared, "\u{2168}".as_bytes());
    }
}

//! 统一错误类型模块
//!
//! 提供 passrs 库中所有操作的错误类型定义。
//!
//! 注意：可自动修正的输入缺陷（例如 bcrypt salt 中被错误设置的填充位）
//! 不属于错误，它们以 [`Diagnostic`](crate::handler::Diagnostic) 的形式随结果返回。

use std::fmt;

/// passrs 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// passrs 库的错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 密码哈希错误
    PasswordHash(PasswordHashError),

    /// 配置 / 参数错误
    Config(ConfigError),

    /// 后端选择错误
    Backend(BackendError),

    /// 编解码错误
    Codec(CodecError),

    /// 加密原语错误
    Crypto(CryptoError),

    /// 内部错误
    Internal(String),
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 创建一个哈希格式错误
    pub fn malformed(handler: &'static str, reason: impl Into<String>) -> Self {
        Error::PasswordHash(PasswordHashError::MalformedHash {
            handler,
            reason: reason.into(),
        })
    }

    /// 创建一个参数无效错误
    pub fn invalid_setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config(ConfigError::InvalidSetting {
            key: key.into(),
            message: message.into(),
        })
    }

    /// 创建一个编码格式错误
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Error::Codec(CodecError::InvalidFormat(msg.into()))
    }

    /// 创建一个不支持的变体错误
    pub fn unsupported_variant(handler: &'static str, variant: impl Into<String>) -> Self {
        Error::PasswordHash(PasswordHashError::UnsupportedVariant {
            handler,
            variant: variant.into(),
        })
    }
}

/// 密码哈希相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordHashError {
    /// 无法解析的哈希字符串
    MalformedHash {
        handler: &'static str,
        reason: String,
    },
    /// 能识别但无法计算的变体（例如 bcrypt 的 `$2x$`）
    UnsupportedVariant {
        handler: &'static str,
        variant: String,
    },
    /// 未提供密码
    MissingSecret,
    /// 密码超过允许的最大长度
    PasswordTooLarge { max_size: usize, actual: usize },
    /// 密码内容不被接受（例如包含 NUL 字符）
    InvalidSecret(String),
}

/// 配置 / 参数相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 参数值无效（严格模式下超出范围，或任何模式下都无法修正）
    InvalidSetting { key: String, message: String },
    /// 缺少必需的上下文参数
    MissingRequired(String),
}

/// 后端相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// 请求的后端不可用
    Unavailable {
        handler: &'static str,
        backend: String,
    },
    /// 该 handler 没有任何可用后端
    NoBackendsAvailable { handler: &'static str },
}

/// 编解码相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// 输入不是合法的编码文本
    InvalidFormat(String),
}

/// 加密原语相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// 随机数生成失败
    RngFailed(String),
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PasswordHash(e) => write!(f, "Password hash error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::Backend(e) => write!(f, "Backend error: {}", e),
            Error::Codec(e) => write!(f, "Codec error: {}", e),
            Error::Crypto(e) => write!(f, "Crypto error: {}", e),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl fmt::Display for PasswordHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHashError::MalformedHash { handler, reason } => {
                write!(f, "malformed {} hash: {}", handler, reason)
            }
            PasswordHashError::UnsupportedVariant { handler, variant } => {
                write!(f, "{} variant '{}' is recognized but not supported", handler, variant)
            }
            PasswordHashError::MissingSecret => write!(f, "no secret provided"),
            PasswordHashError::PasswordTooLarge { max_size, actual } => write!(
                f,
                "password exceeds maximum allowed size: maximum {} bytes, got {}",
                max_size, actual
            ),
            PasswordHashError::InvalidSecret(msg) => write!(f, "invalid secret: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSetting { key, message } => {
                write!(f, "invalid value for '{}': {}", key, message)
            }
            ConfigError::MissingRequired(key) => {
                write!(f, "missing required setting: {}", key)
            }
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unavailable { handler, backend } => {
                write!(f, "{} backend '{}' is not available", handler, backend)
            }
            BackendError::NoBackendsAvailable { handler } => {
                write!(f, "no {} backends available", handler)
            }
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidFormat(msg) => write!(f, "invalid encoded data: {}", msg),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::RngFailed(msg) => write!(f, "random number generation failed: {}", msg),
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::PasswordHash(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Backend(e) => Some(e),
            Error::Codec(e) => Some(e),
            Error::Crypto(e) => Some(e),
            Error::Internal(_) => None,
        }
    }
}

impl std::error::Error for PasswordHashError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for BackendError {}
impl std::error::Error for CodecError {}
impl std::error::Error for CryptoError {}

// ============================================================================
// From 实现 - 方便错误转换
// ============================================================================

impl From<PasswordHashError> for Error {
    fn from(err: PasswordHashError) -> Self {
        Error::PasswordHash(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Error::Backend(err)
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        Error::Codec(err)
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        Error::Crypto(err)
    }
}

//! salt / rounds 参数能力
//!
//! 每个 handler 用常量声明自己的 [`SaltSpec`] 和 [`RoundsSpec`]，
//! 参数校验、默认值和随机 salt 生成都由这两个结构完成：
//!
//! - 严格模式：越界或不规范的输入返回 `InvalidSetting`
//! - 宽松模式：可修正的缺陷被修正并记录 [`Diagnostic`]
//! - 非法字符、过短的 salt 在任何模式下都是错误

use super::diagnostic::{Diagnosed, Diagnostic, DiagnosticKind};
use crate::codec::Base64Engine;
use crate::error::{ConfigError, Error, Result};
use crate::random::{generate_random_bytes, generate_random_string};

// ============================================================================
// Salt
// ============================================================================

/// salt 参数声明
#[derive(Debug, Clone, Copy)]
pub struct SaltSpec {
    /// 最小字符数
    pub min_size: usize,
    /// 最大字符数
    pub max_size: usize,
    /// 自动生成时的字符数
    pub default_size: usize,
    /// salt 使用的字母表及位序
    pub engine: &'static Base64Engine,
    /// salt 是编码后的字节串，最后一个字符带有必须为 0 的填充位
    pub padded: bool,
}

impl SaltSpec {
    /// 生成一个随机 salt
    ///
    /// 带填充位的 salt 由随机字节编码得到，因此总是规范形式。
    pub fn generate(&self) -> Result<String> {
        if self.padded {
            let bytes = generate_random_bytes(self.default_size * 6 / 8)?;
            Ok(self.engine.encode_bytes(&bytes))
        } else {
            generate_random_string(self.engine.charset(), self.default_size)
        }
    }

    /// 规范化调用方提供的 salt；未提供时自动生成
    ///
    /// # Arguments
    ///
    /// * `handler` - handler 名称，用于诊断信息
    /// * `salt` - 调用方提供的 salt
    /// * `strict` - 是否使用严格模式
    pub fn norm(
        &self,
        handler: &'static str,
        salt: Option<&str>,
        strict: bool,
    ) -> Result<Diagnosed<String>> {
        let Some(salt) = salt else {
            return Ok(Diagnosed::new(self.generate()?));
        };

        if !self.engine.is_valid(salt) {
            return Err(Error::invalid_setting(
                "salt",
                format!("invalid characters in {} salt", handler),
            ));
        }
        if salt.len() < self.min_size {
            return Err(Error::invalid_setting(
                "salt",
                format!("salt too small (min {} chars)", self.min_size),
            ));
        }

        let mut out = Diagnosed::new(salt.to_string());
        if salt.len() > self.max_size {
            if strict {
                return Err(Error::invalid_setting(
                    "salt",
                    format!("salt too large (max {} chars)", self.max_size),
                ));
            }
            out.value.truncate(self.max_size);
            out.warn(Diagnostic::new(
                handler,
                DiagnosticKind::SaltTruncated,
                format!("salt truncated to {} chars", self.max_size),
            ));
        }

        if self.padded
            && let Some(repaired) = self.engine.repair_unused(&out.value)?
        {
            if strict {
                return Err(Error::invalid_setting(
                    "salt",
                    "salt has non-zero padding bits",
                ));
            }
            out.value = repaired;
            out.warn(Diagnostic::new(
                handler,
                DiagnosticKind::PaddingBitsCleared,
                "salt padding bits cleared",
            ));
        }
        Ok(out)
    }
}

// ============================================================================
// Rounds
// ============================================================================

/// rounds 的含义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundsCost {
    /// 实际迭代次数为 rounds
    Linear,
    /// 实际迭代次数为 2^rounds
    Log2,
}

/// rounds 参数声明
#[derive(Debug, Clone, Copy)]
pub struct RoundsSpec {
    pub min: u32,
    pub max: u32,
    pub default: u32,
    pub cost: RoundsCost,
}

impl RoundsSpec {
    /// 规范化调用方提供的 rounds；未提供时使用默认值
    pub fn norm(
        &self,
        handler: &'static str,
        rounds: Option<u32>,
        strict: bool,
    ) -> Result<Diagnosed<u32>> {
        let Some(rounds) = rounds else {
            return Ok(Diagnosed::new(self.default));
        };
        if (self.min..=self.max).contains(&rounds) {
            return Ok(Diagnosed::new(rounds));
        }
        if strict {
            return Err(Error::invalid_setting("rounds", self.range_message(rounds)));
        }

        let clamped = rounds.clamp(self.min, self.max);
        let mut out = Diagnosed::new(clamped);
        out.warn(Diagnostic::new(
            handler,
            DiagnosticKind::RoundsClamped,
            format!("rounds {} clamped to {}", rounds, clamped),
        ));
        Ok(out)
    }

    /// 检查哈希字符串中解析出的 rounds；越界时返回 `MalformedHash`
    pub fn check(&self, handler: &'static str, rounds: u32) -> Result<u32> {
        if (self.min..=self.max).contains(&rounds) {
            Ok(rounds)
        } else {
            Err(Error::malformed(handler, self.range_message(rounds)))
        }
    }

    fn range_message(&self, rounds: u32) -> String {
        format!(
            "rounds {} out of range ({}..={})",
            rounds, self.min, self.max
        )
    }
}

/// 把参数错误转换为哈希格式错误
///
/// 解析哈希字符串时，组成部分的非法值说明字符串本身是畸形的。
pub(crate) fn malformed_from(handler: &'static str, err: Error) -> Error {
    match err {
        Error::Config(ConfigError::InvalidSetting { message, .. }) => {
            Error::malformed(handler, message)
        }
        Error::Codec(e) => Error::malformed(handler, e.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BCRYPT64, H64};

    const PADDED: SaltSpec = SaltSpec {
        min_size: 22,
        max_size: 22,
        default_size: 22,
        engine: &BCRYPT64,
        padded: true,
    };

    const PLAIN: SaltSpec = SaltSpec {
        min_size: 0,
        max_size: 8,
        default_size: 8,
        engine: &H64,
        padded: false,
    };

    const ROUNDS: RoundsSpec = RoundsSpec {
        min: 4,
        max: 31,
        default: 12,
        cost: RoundsCost::Log2,
    };

    #[test]
    fn test_generate_padded_salt_is_clean() {
        for _ in 0..20 {
            let salt = PADDED.generate().unwrap();
            assert_eq!(salt.len(), 22);
            assert!(BCRYPT64.has_clean_padding(&salt));
        }
    }

    #[test]
    fn test_generate_plain_salt() {
        let salt = PLAIN.generate().unwrap();
        assert_eq!(salt.len(), 8);
        assert!(H64.is_valid(&salt));
    }

    #[test]
    fn test_norm_salt_missing_generates() {
        let salt = PLAIN.norm("test", None, true).unwrap();
        assert!(salt.is_clean());
        assert_eq!(salt.value.len(), 8);
    }

    #[test]
    fn test_norm_salt_padding_lax() {
        let salt = format!("{}A", ".".repeat(21));
        let out = PADDED.norm("bcrypt", Some(&salt), false).unwrap();
        assert_eq!(out.value, ".".repeat(22));
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::PaddingBitsCleared);
    }

    #[test]
    fn test_norm_salt_padding_strict() {
        let salt = format!("{}A", ".".repeat(21));
        let err = PADDED.norm("bcrypt", Some(&salt), true).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidSetting { .. })));
    }

    #[test]
    fn test_norm_salt_truncation() {
        let out = PLAIN.norm("md5_crypt", Some("abcdefghij"), false).unwrap();
        assert_eq!(out.value, "abcdefgh");
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::SaltTruncated);

        assert!(PLAIN.norm("md5_crypt", Some("abcdefghij"), true).is_err());
    }

    #[test]
    fn test_norm_salt_always_fatal() {
        // 非法字符
        assert!(PLAIN.norm("md5_crypt", Some("ab$d"), false).is_err());
        // 过短
        assert!(PADDED.norm("bcrypt", Some("abc"), false).is_err());
    }

    #[test]
    fn test_norm_rounds() {
        assert_eq!(ROUNDS.norm("bcrypt", None, true).unwrap().value, 12);
        assert_eq!(ROUNDS.norm("bcrypt", Some(5), true).unwrap().value, 5);

        let out = ROUNDS.norm("bcrypt", Some(40), false).unwrap();
        assert_eq!(out.value, 31);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::RoundsClamped);

        let out = ROUNDS.norm("bcrypt", Some(1), false).unwrap();
        assert_eq!(out.value, 4);

        assert!(ROUNDS.norm("bcrypt", Some(3), true).is_err());
    }

    #[test]
    fn test_check_rounds() {
        assert_eq!(ROUNDS.check("bcrypt", 31).unwrap(), 31);
        let err = ROUNDS.check("bcrypt", 32).unwrap_err();
        assert!(matches!(
            err,
            Error::PasswordHash(crate::error::PasswordHashError::MalformedHash { .. })
        ));
    }

    #[test]
    fn test_malformed_from() {
        let err = malformed_from("x", Error::invalid_setting("salt", "bad"));
        assert_eq!(err, Error::malformed("x", "bad"));

        let err = malformed_from("x", Error::internal("keep"));
        assert_eq!(err, Error::internal("keep"));
    }
}

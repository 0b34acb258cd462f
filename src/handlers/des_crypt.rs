//! DES-Crypt
//!
//! 传统 Unix crypt：2 个字符的 salt 加 11 个字符的校验和，没有前缀。
//! 只使用密码的前 8 个字符，每个字符的低 7 位。
//!
//! 唯一的后端是 `pwhash` crate 的 `unix_crypt`；关闭 `pwhash` feature 时
//! 该 handler 仍然可以识别和解析哈希，但所有计算都返回 `NoBackendsAvailable`。

use crate::codec::H64;
use crate::error::{Error, PasswordHashError, Result};
use crate::handler::{Backend, BackendSet, Diagnosed, Handler, HashInfo, SaltSpec, UserContext};
use crate::secret::SecretPolicy;

const NAME: &str = "des_crypt";

const SALT_CHARS: usize = 2;
const CHECKSUM_CHARS: usize = 11;

const SALT: SaltSpec = SaltSpec {
    min_size: SALT_CHARS,
    max_size: SALT_CHARS,
    default_size: SALT_CHARS,
    engine: &H64,
    padded: false,
};

/// des-crypt 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesCryptBackend {
    /// `pwhash` crate
    Pwhash,
}

impl Backend for DesCryptBackend {
    fn name(&self) -> &'static str {
        match self {
            DesCryptBackend::Pwhash => "pwhash",
        }
    }

    fn is_available(&self) -> bool {
        match self {
            DesCryptBackend::Pwhash => pwhash_backend::is_available(),
        }
    }
}

const BACKENDS: &[DesCryptBackend] = &[DesCryptBackend::Pwhash];

#[cfg(feature = "pwhash")]
mod pwhash_backend {
    use std::sync::OnceLock;

    pub fn is_available() -> bool {
        static SELF_TEST: OnceLock<bool> = OnceLock::new();
        *SELF_TEST.get_or_init(|| {
            let ok = matches!(
                pwhash::unix_crypt::hash_with("ab", "test"),
                Ok(hash) if hash == "abgOeLfPimXQo"
            );
            if !ok {
                log::warn!("des_crypt: pwhash backend failed self-test");
            }
            ok
        })
    }

    /// 只有前 8 个字节的低 7 位参与计算，先行截取后总是合法 ASCII
    pub fn hash(salt: &str, secret: &[u8]) -> Option<String> {
        let pass: String = secret.iter().take(8).map(|&b| char::from(b & 0x7f)).collect();
        pwhash::unix_crypt::hash_with(salt, pass.as_str()).ok()
    }
}

#[cfg(not(feature = "pwhash"))]
mod pwhash_backend {
    pub fn is_available() -> bool {
        false
    }

    pub fn hash(_salt: &str, _secret: &[u8]) -> Option<String> {
        None
    }
}

/// DES-Crypt handler
#[derive(Debug, Clone)]
pub struct DesCrypt {
    backends: BackendSet<DesCryptBackend>,
    policy: SecretPolicy,
}

impl Default for DesCrypt {
    fn default() -> Self {
        Self {
            backends: BackendSet::detect(NAME, BACKENDS),
            policy: SecretPolicy::default(),
        }
    }
}

impl DesCrypt {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置密码检查策略
    pub fn with_secret_policy(mut self, policy: SecretPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Handler for DesCrypt {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, hash: &str) -> bool {
        (hash.len() == SALT_CHARS || hash.len() == SALT_CHARS + CHECKSUM_CHARS)
            && H64.is_valid(hash)
    }

    fn parse(&self, hash: &str) -> Result<Diagnosed<HashInfo>> {
        if !self.identify(hash) {
            return Err(Error::malformed(NAME, "expected 2 or 13 H64 characters"));
        }
        let (salt, checksum) = hash.split_at(SALT_CHARS);
        let mut info = HashInfo::new("").with_salt(salt);
        if !checksum.is_empty() {
            info.checksum = Some(checksum.to_string());
        }
        Ok(Diagnosed::new(info))
    }

    fn render(&self, info: &HashInfo) -> Result<String> {
        Ok(format!(
            "{}{}",
            info.salt,
            info.checksum.as_deref().unwrap_or("")
        ))
    }

    fn calc_checksum(&self, secret: &[u8], info: &HashInfo, _ctx: &UserContext) -> Result<String> {
        self.backends.active()?;
        // C 实现把 NUL 当作字符串结尾
        if secret.contains(&0) {
            return Err(Error::PasswordHash(PasswordHashError::InvalidSecret(
                "des_crypt does not allow NUL bytes in secret".to_string(),
            )));
        }
        let hash = pwhash_backend::hash(&info.salt, secret)
            .ok_or_else(|| Error::internal("des_crypt backend rejected input"))?;
        hash.get(SALT_CHARS..)
            .filter(|checksum| checksum.len() == CHECKSUM_CHARS)
            .map(str::to_string)
            .ok_or_else(|| Error::internal("des_crypt backend returned a malformed hash"))
    }

    fn secret_policy(&self) -> &SecretPolicy {
        &self.policy
    }

    fn backend(&self) -> Option<&'static str> {
        self.backends.active().ok().map(|b| b.name())
    }

    fn salt_spec(&self) -> Option<&SaltSpec> {
        Some(&SALT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::handler::Settings;

    #[test]
    fn test_identify() {
        let h = DesCrypt::new();
        assert!(h.identify("abgOeLfPimXQo"));
        assert!(h.identify("ab"));
        assert!(!h.identify("abgOeLfPimXQ"));
        assert!(!h.identify("ab!OeLfPimXQo"));
        assert!(!h.identify("$1$abc$"));
        assert!(!h.identify(""));
    }

    #[test]
    fn test_parse_and_render() {
        let h = DesCrypt::new();
        let info = h.parse("abgOeLfPimXQo").unwrap().value;
        assert_eq!(info.salt, "ab");
        assert_eq!(info.checksum.as_deref(), Some("gOeLfPimXQo"));
        assert_eq!(h.render(&info).unwrap(), "abgOeLfPimXQo");
        assert!(h.parse("a").is_err());
    }

    #[test]
    fn test_salt_must_be_two_chars() {
        let h = DesCrypt::new();
        assert!(h.genconfig(&Settings::new().with_salt("a")).is_err());
        // 宽松模式下超长 salt 被截断
        let config = h.genconfig(&Settings::new().with_salt("abc")).unwrap();
        assert_eq!(config.value, "ab");
        assert!(!config.is_clean());
    }

    #[cfg(feature = "pwhash")]
    #[test]
    fn test_known_vectors() {
        let h = DesCrypt::new();
        assert_eq!(h.backend(), Some("pwhash"));
        assert!(h.verify("test".into(), "abgOeLfPimXQo").unwrap());
        assert!(h.verify("test".into(), "aZGJuE6EXrjEE").unwrap());
        assert!(!h.verify("test".into(), "aZFJuE6EXrjEE").unwrap());
        assert_eq!(h.genhash("test".into(), "ab").unwrap().value, "abgOeLfPimXQo");
    }

    #[cfg(feature = "pwhash")]
    #[test]
    fn test_rejects_nul() {
        let err = DesCrypt::new()
            .hash("a\0b".into(), &Settings::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PasswordHash(PasswordHashError::InvalidSecret(_))
        ));
    }

    #[cfg(not(feature = "pwhash"))]
    #[test]
    fn test_no_backends_without_pwhash() {
        let h = DesCrypt::new();
        assert_eq!(h.backend(), None);
        let err = h.verify("test".into(), "abgOeLfPimXQo").unwrap_err();
        assert_eq!(
            err,
            Error::Backend(BackendError::NoBackendsAvailable { handler: NAME })
        );
    }

    #[test]
    fn test_backend_error_kind_is_stable() {
        // 不论 feature 组合，计算失败都不会退化为 "密码不匹配"
        let h = DesCrypt::new();
        match h.verify("test".into(), "abgOeLfPimXQo") {
            Ok(matched) => assert!(matched),
            Err(err) => assert!(matches!(
                err,
                Error::Backend(BackendError::NoBackendsAvailable { .. })
            )),
        }
    }
}

//! Postgres MD5
//!
//! 格式：`md5` + 32 个小写十六进制字符，校验和为 `md5(secret + user)`。
//! 用户名充当 salt，因此计算时必须提供 [`UserContext::user`]。

use md5::{Digest, Md5};

use crate::error::{ConfigError, Error, Result};
use crate::handler::{Diagnosed, Handler, HashInfo, UserContext};
use crate::random::hex_encode;
use crate::secret::SecretPolicy;

const NAME: &str = "postgres_md5";
const PREFIX: &str = "md5";
const CHECKSUM_CHARS: usize = 32;

/// Postgres MD5 handler
///
/// # Example
///
/// ```rust
/// use passrs::handler::{Handler, Settings, UserContext};
/// use passrs::handlers::PostgresMd5;
///
/// let pg = PostgresMd5::new();
/// let hash = pg
///     .hash("password".into(), &Settings::new().with_user("postgres"))
///     .unwrap()
///     .into_value();
/// assert_eq!(hash, "md532e12f215ba27cb750c9e093ce4b5127");
///
/// let ctx = UserContext::new().with_user("postgres");
/// assert!(pg.verify_with("password".into(), &hash, &ctx).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PostgresMd5 {
    policy: SecretPolicy,
}

impl PostgresMd5 {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置密码检查策略
    pub fn with_secret_policy(mut self, policy: SecretPolicy) -> Self {
        self.policy = policy;
        self
    }
}

fn is_lower_hex(text: &str) -> bool {
    text.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f'))
}

impl Handler for PostgresMd5 {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, hash: &str) -> bool {
        hash.strip_prefix(PREFIX)
            .is_some_and(|rest| rest.len() == CHECKSUM_CHARS && is_lower_hex(rest))
    }

    fn parse(&self, hash: &str) -> Result<Diagnosed<HashInfo>> {
        let rest = hash
            .strip_prefix(PREFIX)
            .ok_or_else(|| Error::malformed(NAME, "missing 'md5' prefix"))?;
        let mut info = HashInfo::default();
        if !rest.is_empty() {
            if rest.len() != CHECKSUM_CHARS || !is_lower_hex(rest) {
                return Err(Error::malformed(NAME, "expected 32 lowercase hex digits"));
            }
            info.checksum = Some(rest.to_string());
        }
        Ok(Diagnosed::new(info))
    }

    fn render(&self, info: &HashInfo) -> Result<String> {
        Ok(format!("{}{}", PREFIX, info.checksum.as_deref().unwrap_or("")))
    }

    fn calc_checksum(&self, secret: &[u8], _info: &HashInfo, ctx: &UserContext) -> Result<String> {
        let user = ctx
            .user
            .as_deref()
            .ok_or_else(|| Error::Config(ConfigError::MissingRequired("user".to_string())))?;
        let digest = Md5::new()
            .chain_update(secret)
            .chain_update(user.as_bytes())
            .finalize();
        Ok(hex_encode(&digest))
    }

    fn secret_policy(&self) -> &SecretPolicy {
        &self.policy
    }

    fn requires_user(&self) -> bool {
        true
    }
}

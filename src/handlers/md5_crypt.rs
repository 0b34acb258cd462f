//! MD5-Crypt
//!
//! 格式：`$1$<0-8 字符 salt>$<22 字符校验和>`，Apache 变体使用 `$apr1$` 前缀，
//! 两者只有混入摘要的标识不同。
//!
//! 校验和是 16 字节的 MD5 摘要经固定的字节重排后 H64 编码。
//! 初始摘要中按密码长度的二进制位混入 NUL 或密码首字符，这一步被普遍认为是
//! 早期实现的遗留问题，但所有实现都必须逐位复现它。
//!
//! 后端：
//!
//! - `pwhash`：`pwhash` crate 的 crypt(3) 实现（`pwhash` feature），
//!   首次使用时自检一次；拒绝输入时回退到内置实现
//! - `builtin`：基于 `md-5` crate 的内置实现
//!
//! `$apr1$` 变体只有内置实现。

use md5::{Digest, Md5};

use crate::codec::{H64, h64};
use crate::error::{Error, Result};
use crate::handler::{Backend, BackendSet, Diagnosed, Handler, HashInfo, SaltSpec, UserContext};
use crate::secret::SecretPolicy;

/// 校验和字节的重排顺序
const TRANSPOSE_MAP: [usize; 16] = [12, 6, 0, 13, 7, 1, 14, 8, 2, 15, 9, 3, 5, 10, 4, 11];

const CHECKSUM_CHARS: usize = 22;

const SALT: SaltSpec = SaltSpec {
    min_size: 0,
    max_size: 8,
    default_size: 8,
    engine: &H64,
    padded: false,
};

/// 两种格式变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Md5Variant {
    /// `$1$`
    Standard,
    /// `$apr1$`
    Apache,
}

impl Md5Variant {
    fn name(&self) -> &'static str {
        match self {
            Md5Variant::Standard => "md5_crypt",
            Md5Variant::Apache => "apr_md5_crypt",
        }
    }

    fn ident(&self) -> &'static str {
        match self {
            Md5Variant::Standard => "1",
            Md5Variant::Apache => "apr1",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Md5Variant::Standard => "$1$",
            Md5Variant::Apache => "$apr1$",
        }
    }
}

// ============================================================================
// 后端
// ============================================================================

/// md5-crypt 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Md5CryptBackend {
    /// `pwhash` crate
    Pwhash,
    /// 基于 `md-5` crate 的内置实现
    Builtin,
}

impl Backend for Md5CryptBackend {
    fn name(&self) -> &'static str {
        match self {
            Md5CryptBackend::Pwhash => "pwhash",
            Md5CryptBackend::Builtin => "builtin",
        }
    }

    fn is_available(&self) -> bool {
        match self {
            Md5CryptBackend::Pwhash => pwhash_backend::is_available(),
            Md5CryptBackend::Builtin => true,
        }
    }
}

const STANDARD_BACKENDS: &[Md5CryptBackend] = &[Md5CryptBackend::Pwhash, Md5CryptBackend::Builtin];
const APACHE_BACKENDS: &[Md5CryptBackend] = &[Md5CryptBackend::Builtin];

#[cfg(feature = "pwhash")]
mod pwhash_backend {
    use std::sync::OnceLock;

    /// 用已知向量自检一次，结果在进程内缓存
    pub fn is_available() -> bool {
        static SELF_TEST: OnceLock<bool> = OnceLock::new();
        *SELF_TEST.get_or_init(|| {
            let ok = matches!(
                pwhash::md5_crypt::hash_with("$1$test", "test"),
                Ok(hash) if hash == "$1$test$pi/xDtU5WFVRqYS6BMU8X/"
            );
            if !ok {
                log::warn!("md5_crypt: pwhash backend failed self-test");
            }
            ok
        })
    }

    /// 计算完整哈希并取出校验和；`None` 表示该后端拒绝了输入
    pub fn checksum(secret: &[u8], salt: &str) -> Option<String> {
        let pass = std::str::from_utf8(secret).ok()?;
        let config = format!("$1${}", salt);
        let hash = pwhash::md5_crypt::hash_with(config.as_str(), pass).ok()?;
        let checksum = hash.strip_prefix(&config)?.strip_prefix('$')?;
        (checksum.len() == super::CHECKSUM_CHARS).then(|| checksum.to_string())
    }
}

#[cfg(not(feature = "pwhash"))]
mod pwhash_backend {
    pub fn is_available() -> bool {
        false
    }

    pub fn checksum(_secret: &[u8], _salt: &str) -> Option<String> {
        None
    }
}

// ============================================================================
// Handler
// ============================================================================

/// MD5-Crypt handler（`$1$` 和 `$apr1$`）
///
/// # Example
///
/// ```rust
/// use passrs::handler::Handler;
/// use passrs::handlers::Md5Crypt;
///
/// let md5_crypt = Md5Crypt::new();
/// assert!(md5_crypt.verify("test".into(), "$1$test$pi/xDtU5WFVRqYS6BMU8X/").unwrap());
///
/// let apr = Md5Crypt::apache();
/// assert!(apr.identify("$apr1$salt$"));
/// ```
#[derive(Debug, Clone)]
pub struct Md5Crypt {
    variant: Md5Variant,
    backends: BackendSet<Md5CryptBackend>,
    policy: SecretPolicy,
}

impl Default for Md5Crypt {
    fn default() -> Self {
        Self::with_variant(Md5Variant::Standard)
    }
}

impl Md5Crypt {
    /// `$1$` 变体
    pub fn new() -> Self {
        Self::default()
    }

    /// `$apr1$` 变体
    pub fn apache() -> Self {
        Self::with_variant(Md5Variant::Apache)
    }

    fn with_variant(variant: Md5Variant) -> Self {
        let candidates = match variant {
            Md5Variant::Standard => STANDARD_BACKENDS,
            Md5Variant::Apache => APACHE_BACKENDS,
        };
        Self {
            variant,
            backends: BackendSet::detect(variant.name(), candidates),
            policy: SecretPolicy::default(),
        }
    }

    /// 指定后端
    pub fn with_backend(mut self, backend: Md5CryptBackend) -> Result<Self> {
        self.backends.select(backend)?;
        Ok(self)
    }

    /// 设置密码检查策略
    pub fn with_secret_policy(mut self, policy: SecretPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn variant(&self) -> Md5Variant {
        self.variant
    }
}

impl Handler for Md5Crypt {
    fn name(&self) -> &'static str {
        self.variant.name()
    }

    fn identify(&self, hash: &str) -> bool {
        hash.starts_with(self.variant.prefix())
    }

    fn parse(&self, hash: &str) -> Result<Diagnosed<HashInfo>> {
        let name = self.name();
        let rest = hash
            .strip_prefix(self.variant.prefix())
            .ok_or_else(|| Error::malformed(name, "wrong prefix"))?;
        let (salt, checksum) = match rest.split_once('$') {
            Some((salt, checksum)) => (salt, checksum),
            None => (rest, ""),
        };

        if salt.len() > SALT.max_size || !H64.is_valid(salt) {
            return Err(Error::malformed(name, "invalid salt"));
        }
        let mut info = HashInfo::new(self.variant.ident()).with_salt(salt);
        if !checksum.is_empty() {
            if checksum.len() != CHECKSUM_CHARS || !H64.is_valid(checksum) {
                return Err(Error::malformed(name, "invalid checksum"));
            }
            info.checksum = Some(checksum.to_string());
        }
        Ok(Diagnosed::new(info))
    }

    fn render(&self, info: &HashInfo) -> Result<String> {
        Ok(format!(
            "{}{}${}",
            self.variant.prefix(),
            info.salt,
            info.checksum.as_deref().unwrap_or("")
        ))
    }

    fn calc_checksum(&self, secret: &[u8], info: &HashInfo, _ctx: &UserContext) -> Result<String> {
        if self.backends.active()? == Md5CryptBackend::Pwhash {
            match pwhash_backend::checksum(secret, &info.salt) {
                Some(checksum) => return Ok(checksum),
                None => log::debug!("{}: pwhash rejected input, using builtin", self.name()),
            }
        }
        let magic = self.variant.prefix().as_bytes();
        let digest = raw_md5_crypt(secret, info.salt.as_bytes(), magic);
        Ok(h64::encode_transposed_bytes(&digest, &TRANSPOSE_MAP))
    }

    fn secret_policy(&self) -> &SecretPolicy {
        &self.policy
    }

    fn backend(&self) -> Option<&'static str> {
        self.backends.active().ok().map(|b| b.name())
    }

    fn idents(&self) -> &'static [&'static str] {
        match self.variant {
            Md5Variant::Standard => &["1"],
            Md5Variant::Apache => &["apr1"],
        }
    }

    fn default_ident(&self) -> &'static str {
        self.variant.ident()
    }

    fn salt_spec(&self) -> Option<&SaltSpec> {
        Some(&SALT)
    }
}

// ============================================================================
// 原始算法
// ============================================================================

/// md5-crypt 的原始摘要
///
/// # Arguments
///
/// * `secret` - 密码字节
/// * `salt` - salt，超过 8 个字节的部分被忽略
/// * `magic` - 混入摘要的标识，`$1$` 或 `$apr1$`
pub fn raw_md5_crypt(secret: &[u8], salt: &[u8], magic: &[u8]) -> [u8; 16] {
    let salt = &salt[..salt.len().min(SALT.max_size)];

    let mut ctx = Md5::new();
    ctx.update(secret);
    ctx.update(magic);
    ctx.update(salt);

    // 追加 len(secret) 个字节的 md5(secret + salt + secret)
    let alt = Md5::new()
        .chain_update(secret)
        .chain_update(salt)
        .chain_update(secret)
        .finalize();
    for _ in 0..secret.len() / 16 {
        ctx.update(&alt);
    }
    ctx.update(&alt[..secret.len() % 16]);

    // 长度的每一位：1 混入 NUL，0 混入密码首字符（空密码时什么也不混入）
    let first = &secret[..secret.len().min(1)];
    let mut bits = secret.len();
    while bits > 0 {
        if bits & 1 == 1 {
            ctx.update([0u8]);
        } else {
            ctx.update(first);
        }
        bits >>= 1;
    }

    let mut result = [0u8; 16];
    result.copy_from_slice(&ctx.finalize());

    for round in 0..1000 {
        let mut ctx = Md5::new();
        if round & 1 == 1 {
            ctx.update(secret);
        } else {
            ctx.update(result);
        }
        if round % 3 != 0 {
            ctx.update(salt);
        }
        if round % 7 != 0 {
            ctx.update(secret);
        }
        if round & 1 == 1 {
            ctx.update(result);
        } else {
            ctx.update(secret);
        }
        result.copy_from_slice(&ctx.finalize());
    }
    result
}

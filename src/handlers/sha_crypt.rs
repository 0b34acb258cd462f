//! SHA-256-Crypt / SHA-512-Crypt
//!
//! 格式：`$5$[rounds=<N>$]<0-16 字符 salt>$<校验和>`（SHA-512 使用 `$6$`）
//!
//! - rounds：1000-999999999，线性；字符串中省略时隐含 5000
//! - salt：最多 16 个 H64 字符，解析时超长部分被截断并记录诊断
//! - 校验和：SHA-256 为 43 个字符，SHA-512 为 86 个字符
//!
//! `rounds=` 后的数字不允许有前导 0。

use std::marker::PhantomData;

use sha2::{Digest, Sha256, Sha512};

use crate::codec::{H64, h64};
use crate::error::{Error, Result};
use crate::handler::{
    Backend, BackendSet, Diagnosed, Handler, HashInfo, RoundsCost, RoundsSpec, SaltSpec,
    UserContext, malformed_from,
};
use crate::secret::SecretPolicy;

/// 省略 `rounds=` 时使用的 rounds
pub const IMPLICIT_ROUNDS: u32 = 5000;

const SALT: SaltSpec = SaltSpec {
    min_size: 0,
    max_size: 16,
    default_size: 16,
    engine: &H64,
    padded: false,
};

const SHA256_ROUNDS: RoundsSpec = RoundsSpec {
    min: 1000,
    max: 999_999_999,
    default: 535_000,
    cost: RoundsCost::Linear,
};

const SHA512_ROUNDS: RoundsSpec = RoundsSpec {
    min: 1000,
    max: 999_999_999,
    default: 656_000,
    cost: RoundsCost::Linear,
};

const SHA256_TRANSPOSE_MAP: [usize; 32] = [
    20, 10, 0, 11, 1, 21, 2, 22, 12, 23, 13, 3, 14, 4, 24, 5, 25, 15, 26, 16, 6, 17, 7, 27, 8, 28,
    18, 29, 19, 9, 30, 31,
];

const SHA512_TRANSPOSE_MAP: [usize; 64] = [
    42, 21, 0, 1, 43, 22, 23, 2, 44, 45, 24, 3, 4, 46, 25, 26, 5, 47, 48, 27, 6, 7, 49, 28, 29, 8,
    50, 51, 30, 9, 10, 52, 31, 32, 11, 53, 54, 33, 12, 13, 55, 34, 35, 14, 56, 57, 36, 15, 16, 58,
    37, 38, 17, 59, 60, 39, 18, 19, 61, 40, 41, 20, 62, 63,
];

/// 摘要算法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaVariant {
    Sha256,
    Sha512,
}

impl ShaVariant {
    fn name(&self) -> &'static str {
        match self {
            ShaVariant::Sha256 => "sha256_crypt",
            ShaVariant::Sha512 => "sha512_crypt",
        }
    }

    fn ident(&self) -> &'static str {
        match self {
            ShaVariant::Sha256 => "5",
            ShaVariant::Sha512 => "6",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            ShaVariant::Sha256 => "$5$",
            ShaVariant::Sha512 => "$6$",
        }
    }

    fn checksum_chars(&self) -> usize {
        match self {
            ShaVariant::Sha256 => 43,
            ShaVariant::Sha512 => 86,
        }
    }

    fn rounds(&self) -> &'static RoundsSpec {
        match self {
            ShaVariant::Sha256 => &SHA256_ROUNDS,
            ShaVariant::Sha512 => &SHA512_ROUNDS,
        }
    }
}

// ============================================================================
// 后端
// ============================================================================

/// sha-crypt 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaCryptBackend {
    /// `pwhash` crate
    Pwhash,
    /// 基于 `sha2` crate 的内置实现
    Builtin,
}

impl Backend for ShaCryptBackend {
    fn name(&self) -> &'static str {
        match self {
            ShaCryptBackend::Pwhash => "pwhash",
            ShaCryptBackend::Builtin => "builtin",
        }
    }

    fn is_available(&self) -> bool {
        match self {
            ShaCryptBackend::Pwhash => pwhash_backend::is_available(),
            ShaCryptBackend::Builtin => true,
        }
    }
}

const BACKENDS: &[ShaCryptBackend] = &[ShaCryptBackend::Pwhash, ShaCryptBackend::Builtin];

#[cfg(feature = "pwhash")]
mod pwhash_backend {
    use std::sync::OnceLock;

    use super::ShaVariant;

    const SHA256_CHECK: &str = "$5$saltstring$5B8vYYiY.CVt1RlTTf8KbXBH3hsxY/GNooZaBBGWEc5";
    const SHA512_CHECK: &str = "$6$saltstring$svn8UoSVapNtMuq1ukKS4tPQd8iKwSMHWjl/O817G3uBnIFNjnQJuesI68u4OTLiBFdcbYEdFCoEOfaS35inz1";

    fn hash_with(variant: ShaVariant, config: &str, secret: &[u8]) -> Option<String> {
        // pwhash 只接受 UTF-8 密码，其余交给内置实现
        let pass = std::str::from_utf8(secret).ok()?;
        match variant {
            ShaVariant::Sha256 => pwhash::sha256_crypt::hash_with(config, pass).ok(),
            ShaVariant::Sha512 => pwhash::sha512_crypt::hash_with(config, pass).ok(),
        }
    }

    /// 两种摘要各自检一次，结果在进程内缓存
    pub fn is_available() -> bool {
        static SELF_TEST: OnceLock<bool> = OnceLock::new();
        *SELF_TEST.get_or_init(|| {
            let ok = hash_with(ShaVariant::Sha256, "$5$saltstring", b"Hello world!").as_deref()
                == Some(SHA256_CHECK)
                && hash_with(ShaVariant::Sha512, "$6$saltstring", b"Hello world!").as_deref()
                    == Some(SHA512_CHECK);
            if !ok {
                log::warn!("sha_crypt: pwhash backend failed self-test");
            }
            ok
        })
    }

    /// 计算完整哈希并取出校验和；`None` 表示该后端拒绝了输入
    pub fn checksum(variant: ShaVariant, config: &str, secret: &[u8]) -> Option<String> {
        let hash = hash_with(variant, config, secret)?;
        let (_, checksum) = hash.rsplit_once('$')?;
        (checksum.len() == variant.checksum_chars()).then(|| checksum.to_string())
    }
}

#[cfg(not(feature = "pwhash"))]
mod pwhash_backend {
    use super::ShaVariant;

    pub fn is_available() -> bool {
        false
    }

    pub fn checksum(_variant: ShaVariant, _config: &str, _secret: &[u8]) -> Option<String> {
        None
    }
}

// ============================================================================
// Handler
// ============================================================================

/// SHA-crypt handler
///
/// # Example
///
/// ```rust
/// use passrs::handler::{Handler, Settings};
/// use passrs::handlers::ShaCrypt;
///
/// let sha512 = ShaCrypt::sha512();
/// let hash = sha512
///     .hash("password".into(), &Settings::new().with_rounds(1000))
///     .unwrap()
///     .into_value();
///
/// assert!(hash.starts_with("$6$rounds=1000$"));
/// assert!(sha512.verify("password".into(), &hash).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct ShaCrypt {
    variant: ShaVariant,
    backends: BackendSet<ShaCryptBackend>,
    policy: SecretPolicy,
}

impl ShaCrypt {
    pub fn sha256() -> Self {
        Self::with_variant(ShaVariant::Sha256)
    }

    pub fn sha512() -> Self {
        Self::with_variant(ShaVariant::Sha512)
    }

    fn with_variant(variant: ShaVariant) -> Self {
        Self {
            variant,
            backends: BackendSet::detect(variant.name(), BACKENDS),
            policy: SecretPolicy::default(),
        }
    }

    /// 指定后端
    pub fn with_backend(mut self, backend: ShaCryptBackend) -> Result<Self> {
        self.backends.select(backend)?;
        Ok(self)
    }

    /// 设置密码检查策略
    pub fn with_secret_policy(mut self, policy: SecretPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn variant(&self) -> ShaVariant {
        self.variant
    }

    fn parse_rounds(&self, digits: &str) -> Result<u32> {
        let name = self.name();
        if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_digit()) {
            return Err(Error::malformed(name, "rounds must be decimal digits"));
        }
        if digits.starts_with('0') {
            return Err(Error::malformed(name, "rounds must not be zero-padded"));
        }
        let rounds = digits
            .parse::<u32>()
            .map_err(|e| Error::malformed(name, e.to_string()))?;
        self.variant.rounds().check(name, rounds)
    }
}

impl Handler for ShaCrypt {
    fn name(&self) -> &'static str {
        self.variant.name()
    }

    fn identify(&self, hash: &str) -> bool {
        hash.starts_with(self.variant.prefix())
    }

    fn parse(&self, hash: &str) -> Result<Diagnosed<HashInfo>> {
        let name = self.name();
        let mut rest = hash
            .strip_prefix(self.variant.prefix())
            .ok_or_else(|| Error::malformed(name, "wrong prefix"))?;

        let mut info = HashInfo::new(self.variant.ident());
        if let Some(tail) = rest.strip_prefix("rounds=") {
            let (digits, tail) = tail
                .split_once('$')
                .ok_or_else(|| Error::malformed(name, "missing '$' after rounds"))?;
            info.rounds = Some(self.parse_rounds(digits)?);
            rest = tail;
        }

        let (salt, checksum) = rest.split_once('$').unwrap_or((rest, ""));
        if !checksum.is_empty()
            && (checksum.len() != self.variant.checksum_chars() || !H64.is_valid(checksum))
        {
            return Err(Error::malformed(name, "invalid checksum"));
        }

        let mut out = Diagnosed::new(info);
        let salt = SALT
            .norm(name, Some(salt), false)
            .map_err(|e| malformed_from(name, e))?;
        out.value.salt = out.absorb(salt);
        if !checksum.is_empty() {
            out.value.checksum = Some(checksum.to_string());
        }
        Ok(out)
    }

    fn render(&self, info: &HashInfo) -> Result<String> {
        let mut out = String::from(self.variant.prefix());
        if let Some(rounds) = info.rounds {
            out.push_str(&format!("rounds={}$", rounds));
        }
        out.push_str(&info.salt);
        out.push('$');
        out.push_str(info.checksum.as_deref().unwrap_or(""));
        Ok(out)
    }

    fn calc_checksum(&self, secret: &[u8], info: &HashInfo, _ctx: &UserContext) -> Result<String> {
        let rounds = match info.rounds {
            Some(rounds) => self.variant.rounds().check(self.name(), rounds)?,
            None => IMPLICIT_ROUNDS,
        };

        if self.backends.active()? == ShaCryptBackend::Pwhash {
            let config = self.render(&HashInfo {
                checksum: None,
                ..info.clone()
            })?;
            let config = config.strip_suffix('$').unwrap_or(&config);
            match pwhash_backend::checksum(self.variant, config, secret) {
                Some(checksum) => return Ok(checksum),
                None => log::debug!("{}: pwhash rejected input, using builtin", self.name()),
            }
        }

        let salt = info.salt.as_bytes();
        Ok(match self.variant {
            ShaVariant::Sha256 => {
                let digest = ShaCryptCore::<Sha256>::new(secret, salt).run(rounds);
                h64::encode_transposed_bytes(&digest, &SHA256_TRANSPOSE_MAP)
            }
            ShaVariant::Sha512 => {
                let digest = ShaCryptCore::<Sha512>::new(secret, salt).run(rounds);
                h64::encode_transposed_bytes(&digest, &SHA512_TRANSPOSE_MAP)
            }
        })
    }

    fn secret_policy(&self) -> &SecretPolicy {
        &self.policy
    }

    fn backend(&self) -> Option<&'static str> {
        self.backends.active().ok().map(|b| b.name())
    }

    fn idents(&self) -> &'static [&'static str] {
        match self.variant {
            ShaVariant::Sha256 => &["5"],
            ShaVariant::Sha512 => &["6"],
        }
    }

    fn default_ident(&self) -> &'static str {
        self.variant.ident()
    }

    fn salt_spec(&self) -> Option<&SaltSpec> {
        Some(&SALT)
    }

    fn rounds_spec(&self) -> Option<&RoundsSpec> {
        Some(self.variant.rounds())
    }
}

// ============================================================================
// 原始算法
// ============================================================================

/// sha-crypt 的摘要准备阶段和轮函数，对摘要算法泛型
struct ShaCryptCore<D: Digest> {
    /// 初始摘要 A
    initial: Vec<u8>,
    /// 由密码派生的 P 序列
    p_bytes: Vec<u8>,
    /// 由 salt 派生的 S 序列
    s_bytes: Vec<u8>,
    _digest: PhantomData<D>,
}

impl<D: Digest> ShaCryptCore<D> {
    fn new(secret: &[u8], salt: &[u8]) -> Self {
        let salt = &salt[..salt.len().min(SALT.max_size)];

        let alt = D::new()
            .chain_update(secret)
            .chain_update(salt)
            .chain_update(secret)
            .finalize();

        let mut ctx = D::new().chain_update(secret).chain_update(salt);
        ctx.update(repeat_to(&alt, secret.len()));
        let mut bits = secret.len();
        while bits > 0 {
            if bits & 1 == 1 {
                ctx.update(&alt);
            } else {
                ctx.update(secret);
            }
            bits >>= 1;
        }
        let initial = ctx.finalize().to_vec();

        let mut dp = D::new();
        for _ in 0..secret.len() {
            dp.update(secret);
        }
        let p_bytes = repeat_to(&dp.finalize(), secret.len());

        let mut ds = D::new();
        for _ in 0..16 + initial[0] as usize {
            ds.update(salt);
        }
        let s_bytes = repeat_to(&ds.finalize(), salt.len());

        Self {
            initial,
            p_bytes,
            s_bytes,
            _digest: PhantomData,
        }
    }

    fn run(self, rounds: u32) -> Vec<u8> {
        let mut c = self.initial;
        for round in 0..rounds {
            let mut ctx = D::new();
            if round & 1 == 1 {
                ctx.update(&self.p_bytes);
            } else {
                ctx.update(&c);
            }
            if round % 3 != 0 {
                ctx.update(&self.s_bytes);
            }
            if round % 7 != 0 {
                ctx.update(&self.p_bytes);
            }
            if round & 1 == 1 {
                ctx.update(&c);
            } else {
                ctx.update(&self.p_bytes);
            }
            c.copy_from_slice(&ctx.finalize());
        }
        c
    }
}

/// 循环重复 `source` 直到 `len` 个字节
fn repeat_to(source: &[u8], len: usize) -> Vec<u8> {
    source.iter().copied().cycle().take(len).collect()
}

//! BCrypt
//!
//! 格式：`$<ident>$<2 位 cost>$<22 字符 salt><31 字符校验和>`
//!
//! - ident：`2`、`2a`、`2b`，以及可识别但不支持计算的 `2x`、`2y`
//! - cost：4-31，实际迭代次数为 `2^cost`，默认 12
//! - salt：22 个 bcrypt-base64 字符，只有高 128 位有效，最后一个字符的低 4 位必须为 0
//! - 校验和：23 字节编码为 31 个字符，最后一个字符的低 2 位必须为 0
//!
//! 被错误设置的填充位属于可修正缺陷：解析时总是清除并记录诊断，
//! 参数校验时在严格模式下报错。
//!
//! 两个可互换的后端：
//!
//! - `bcrypt`：`bcrypt` crate 的原始 EksBlowfish 实现（`bcrypt` feature）
//! - `builtin`：基于 `blowfish` crate 的 EksBlowfish 密钥调度

use blowfish::Blowfish;

use crate::codec::BCRYPT64;
use crate::error::{Error, Result};
use crate::handler::{
    Backend, BackendSet, Diagnosed, Diagnostic, DiagnosticKind, Handler, HashInfo, RoundsCost,
    RoundsSpec, SaltSpec, UserContext, malformed_from,
};
use crate::secret::SecretPolicy;

const NAME: &str = "bcrypt";

const IDENTS: &[&str] = &["2", "2a", "2b", "2x", "2y"];

/// 原始输出中参与编码的字节数（最后一个字节被丢弃）
const CHECKSUM_BYTES: usize = 23;
const CHECKSUM_CHARS: usize = 31;
const SALT_CHARS: usize = 22;

/// bcrypt 只使用密钥的前 72 个字节
const MAX_KEY_BYTES: usize = 72;

const SALT: SaltSpec = SaltSpec {
    min_size: SALT_CHARS,
    max_size: SALT_CHARS,
    default_size: SALT_CHARS,
    engine: &BCRYPT64,
    padded: true,
};

const ROUNDS: RoundsSpec = RoundsSpec {
    min: 4,
    max: 31,
    default: 12,
    cost: RoundsCost::Log2,
};

/// "OrpheanBeholderScryDoubt" 按大端序拆分的 6 个 32 位字
const MAGIC: [u32; 6] = [
    0x4f72_7068,
    0x6561_6e42,
    0x6568_6f6c,
    0x6465_7253,
    0x6372_7944,
    0x6f75_6274,
];

// ============================================================================
// 后端
// ============================================================================

/// bcrypt 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcryptBackend {
    /// `bcrypt` crate
    Bcrypt,
    /// 基于 `blowfish` crate 的内置实现
    Builtin,
}

impl Backend for BcryptBackend {
    fn name(&self) -> &'static str {
        match self {
            BcryptBackend::Bcrypt => "bcrypt",
            BcryptBackend::Builtin => "builtin",
        }
    }

    fn is_available(&self) -> bool {
        match self {
            BcryptBackend::Bcrypt => cfg!(feature = "bcrypt"),
            BcryptBackend::Builtin => true,
        }
    }
}

const BACKENDS: &[BcryptBackend] = &[BcryptBackend::Bcrypt, BcryptBackend::Builtin];

// ============================================================================
// Handler
// ============================================================================

/// BCrypt handler
///
/// # Example
///
/// ```rust
/// use passrs::handler::{Handler, Settings};
/// use passrs::handlers::Bcrypt;
///
/// let bcrypt = Bcrypt::new();
/// let hash = bcrypt
///     .hash("password".into(), &Settings::new().with_rounds(4))
///     .unwrap()
///     .into_value();
///
/// assert!(hash.starts_with("$2a$04$"));
/// assert!(bcrypt.verify("password".into(), &hash).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct Bcrypt {
    backends: BackendSet<BcryptBackend>,
    policy: SecretPolicy,
}

impl Default for Bcrypt {
    fn default() -> Self {
        Self {
            backends: BackendSet::detect(NAME, BACKENDS),
            policy: SecretPolicy::default(),
        }
    }
}

impl Bcrypt {
    /// 使用自动检测到的后端创建 handler
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定后端
    ///
    /// # Errors
    ///
    /// 后端不可用时返回 `BackendError::Unavailable`
    pub fn with_backend(mut self, backend: BcryptBackend) -> Result<Self> {
        self.backends.select(backend)?;
        Ok(self)
    }

    /// 设置密码检查策略
    pub fn with_secret_policy(mut self, policy: SecretPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 当前后端
    pub fn active_backend(&self) -> Result<BcryptBackend> {
        self.backends.active()
    }

    fn parse_rounds(text: &str) -> Result<u32> {
        // 必须正好两位十进制数字，不接受 "$2a$6$"
        if text.len() != 2 || !text.bytes().all(|c| c.is_ascii_digit()) {
            return Err(Error::malformed(NAME, "rounds must be two zero-padded digits"));
        }
        let rounds = text
            .parse::<u32>()
            .map_err(|e| Error::malformed(NAME, e.to_string()))?;
        ROUNDS.check(NAME, rounds)
    }
}

impl Handler for Bcrypt {
    fn name(&self) -> &'static str {
        NAME
    }

    fn identify(&self, hash: &str) -> bool {
        let Some(rest) = hash.strip_prefix('$') else {
            return false;
        };
        IDENTS.iter().any(|ident| {
            rest.strip_prefix(ident)
                .is_some_and(|tail| tail.starts_with('$'))
        })
    }

    fn parse(&self, hash: &str) -> Result<Diagnosed<HashInfo>> {
        let mut parts = hash
            .strip_prefix('$')
            .ok_or_else(|| Error::malformed(NAME, "missing '$' prefix"))?
            .splitn(3, '$');
        let (Some(ident), Some(rounds), Some(data)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::malformed(NAME, "missing separators"));
        };

        if !IDENTS.contains(&ident) {
            return Err(Error::malformed(NAME, format!("unknown ident {:?}", ident)));
        }
        let rounds = Self::parse_rounds(rounds)?;

        if data.len() != SALT_CHARS && data.len() != SALT_CHARS + CHECKSUM_CHARS {
            return Err(Error::malformed(NAME, "wrong salt/checksum size"));
        }
        if !BCRYPT64.is_valid(data) {
            return Err(Error::malformed(NAME, "invalid characters in salt/checksum"));
        }
        let (salt, checksum) = data.split_at(SALT_CHARS);

        let mut out = Diagnosed::new(HashInfo::new(ident).with_rounds(rounds));
        let salt = SALT
            .norm(NAME, Some(salt), false)
            .map_err(|e| malformed_from(NAME, e))?;
        out.value.salt = out.absorb(salt);

        if !checksum.is_empty() {
            let checksum = match BCRYPT64.repair_unused(checksum)? {
                Some(repaired) => {
                    out.warn(Diagnostic::new(
                        NAME,
                        DiagnosticKind::PaddingBitsCleared,
                        "checksum padding bits cleared",
                    ));
                    repaired
                }
                None => checksum.to_string(),
            };
            out.value.checksum = Some(checksum);
        }
        Ok(out)
    }

    fn render(&self, info: &HashInfo) -> Result<String> {
        let rounds = info
            .rounds
            .ok_or_else(|| Error::internal("bcrypt hash requires rounds"))?;
        Ok(format!(
            "${}${:02}${}{}",
            info.ident,
            rounds,
            info.salt,
            info.checksum.as_deref().unwrap_or("")
        ))
    }

    fn calc_checksum(&self, secret: &[u8], info: &HashInfo, _ctx: &UserContext) -> Result<String> {
        let backend = self.backends.active()?;
        let key = bcrypt_key(&info.ident, secret)?;
        let rounds = info
            .rounds
            .ok_or_else(|| Error::internal("bcrypt hash requires rounds"))?;
        let cost = ROUNDS.check(NAME, rounds)?;

        let salt: [u8; 16] = BCRYPT64
            .decode_bytes(&info.salt)
            .map_err(|e| malformed_from(NAME, e))?
            .try_into()
            .map_err(|_| Error::malformed(NAME, "salt must decode to 16 bytes"))?;

        let raw = match backend {
            #[cfg(feature = "bcrypt")]
            BcryptBackend::Bcrypt => ::bcrypt::bcrypt(cost, salt, &key),
            #[cfg(not(feature = "bcrypt"))]
            BcryptBackend::Bcrypt => {
                return Err(Error::Backend(crate::error::BackendError::Unavailable {
                    handler: NAME,
                    backend: "bcrypt".to_string(),
                }));
            }
            BcryptBackend::Builtin => eks_blowfish(cost, &salt, &key),
        };
        Ok(BCRYPT64.encode_bytes(&raw[..CHECKSUM_BYTES]))
    }

    fn secret_policy(&self) -> &SecretPolicy {
        &self.policy
    }

    fn backend(&self) -> Option<&'static str> {
        self.backends.active().ok().map(|b| b.name())
    }

    fn idents(&self) -> &'static [&'static str] {
        IDENTS
    }

    fn default_ident(&self) -> &'static str {
        "2a"
    }

    fn salt_spec(&self) -> Option<&SaltSpec> {
        Some(&SALT)
    }

    fn rounds_spec(&self) -> Option<&RoundsSpec> {
        Some(&ROUNDS)
    }
}

// ============================================================================
// 原始算法
// ============================================================================

/// 按 ident 构造 Blowfish 密钥
///
/// - `2a` / `2b`：密码末尾追加 NUL
/// - `2`：不追加 NUL（空密码按单个 NUL 处理），因此 "abc" 与 "abcabc" 得到相同结果
///
/// 两种情况都截断到 72 字节。
fn bcrypt_key(ident: &str, secret: &[u8]) -> Result<Vec<u8>> {
    let mut key = secret.to_vec();
    match ident {
        "2a" | "2b" => key.push(0),
        "2" if key.is_empty() => key.push(0),
        "2" => {}
        other => return Err(Error::unsupported_variant(NAME, other)),
    }
    key.truncate(MAX_KEY_BYTES);
    Ok(key)
}

/// EksBlowfish 密钥调度
fn eks_setup(cost: u32, salt: &[u8; 16], key: &[u8]) -> Blowfish {
    let mut state = Blowfish::bc_init_state();
    state.salted_expand_key(salt, key);
    for _ in 0..1u64 << cost {
        state.bc_expand_key(key);
        state.bc_expand_key(salt);
    }
    state
}

/// 用 EksBlowfish 把 "OrpheanBeholderScryDoubt" 加密 64 次，输出 24 字节
fn eks_blowfish(cost: u32, salt: &[u8; 16], key: &[u8]) -> [u8; 24] {
    let state = eks_setup(cost, salt, key);
    let mut ctext = MAGIC;
    for pair in ctext.chunks_exact_mut(2) {
        let mut block = [pair[0], pair[1]];
        for _ in 0..64 {
            block = state.bc_encrypt(block);
        }
        pair.copy_from_slice(&block);
    }

    let mut out = [0u8; 24];
    for (chunk, word) in out.chunks_exact_mut(4).zip(ctext) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

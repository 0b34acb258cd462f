//! Handler 协议
//!
//! 每种哈希格式都实现同一个生命周期：
//!
//! ```text
//! identify -> parse / validate_settings -> calc_checksum -> render
//! ```
//!
//! 一个哈希字符串经历三个状态：
//!
//! - **未配置**：只有调用方提供的 [`Settings`]
//! - **已配置**：参数已校验，没有校验和（config 字符串，由 [`Handler::genconfig`] 生成）
//! - **已哈希**：带有校验和的完整哈希字符串
//!
//! 字符串一旦生成就不再修改，再次进入状态机总是从一个新的 [`HashInfo`] 开始。
//!
//! 实现者只需要提供格式相关的部分（`identify`、`parse`、`render`、`calc_checksum`
//! 以及参数声明），`hash`、`genhash`、`verify` 等流程由 trait 的默认方法完成。
//! 参数声明通过组合能力结构体表达：
//!
//! - [`SaltSpec`]：salt 长度、字母表、填充位
//! - [`RoundsSpec`]：rounds 范围和默认值
//! - [`BackendSet`]：可互换的后端
//! - [`UserContext`]：需要用户名参与计算的格式
//!
//! ## 示例
//!
//! ```rust
//! use passrs::handler::{Handler, Settings};
//! use passrs::handlers::Md5Crypt;
//!
//! let handler = Md5Crypt::new();
//! let hash = handler
//!     .hash("password".into(), &Settings::new().with_salt("saltsalt"))
//!     .unwrap()
//!     .into_value();
//!
//! assert!(hash.starts_with("$1$saltsalt$"));
//! assert!(handler.verify("password".into(), &hash).unwrap());
//! assert!(!handler.verify("wrong".into(), &hash).unwrap());
//! ```

mod backend;
mod diagnostic;
mod params;

pub use backend::{Backend, BackendSet};
pub use diagnostic::{Diagnosed, Diagnostic, DiagnosticKind};
pub use params::{RoundsCost, RoundsSpec, SaltSpec};

pub(crate) use params::malformed_from;

use crate::error::{Error, Result};
use crate::random::consteq_str;
use crate::secret::{Secret, SecretPolicy};

// ============================================================================
// 数据模型
// ============================================================================

/// 哈希字符串解析后的组成部分
///
/// `checksum` 为 `None` 时表示 config 字符串。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashInfo {
    /// 格式标识（例如 bcrypt 的 `"2b"`），没有标识的格式为空字符串
    pub ident: String,
    /// rounds；格式不使用 rounds 或字符串中省略了 rounds 时为 `None`
    pub rounds: Option<u32>,
    /// salt（编码后的文本形式）
    pub salt: String,
    /// 校验和（编码后的文本形式）
    pub checksum: Option<String>,
}

impl HashInfo {
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            ..Default::default()
        }
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = Some(rounds);
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

/// 调用方提供的哈希参数
///
/// 未提供的参数由 handler 使用默认值或自动生成。
///
/// # Example
///
/// ```rust
/// use passrs::handler::Settings;
///
/// let settings = Settings::new()
///     .with_rounds(10)
///     .with_ident("2b")
///     .strict();
/// assert!(settings.strict);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub salt: Option<String>,
    pub rounds: Option<u32>,
    pub ident: Option<String>,
    pub user: Option<String>,
    /// 严格模式：不规范的参数直接报错而不是修正
    pub strict: bool,
}

impl Settings {
    /// 创建空参数（宽松模式）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = Some(rounds);
        self
    }

    pub fn with_ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = Some(ident.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// 切换到严格模式
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// 切换到宽松模式
    pub fn relaxed(mut self) -> Self {
        self.strict = false;
        self
    }

    /// 从参数中提取用户上下文
    pub fn user_context(&self) -> UserContext {
        UserContext {
            user: self.user.clone(),
        }
    }
}

/// 参与计算的用户上下文
///
/// 只有少数格式（例如 Postgres MD5）需要用户名，其它格式忽略它。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub user: Option<String>,
}

impl UserContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

// ============================================================================
// Handler trait
// ============================================================================

/// 一种哈希格式的处理器
///
/// trait 是对象安全的，注册表以 `Box<dyn Handler>` 保存所有实现。
pub trait Handler: Send + Sync {
    /// handler 名称（注册表中的键）
    fn name(&self) -> &'static str;

    /// 快速判断字符串是否属于该格式；不会失败，空字符串返回 false
    fn identify(&self, hash: &str) -> bool;

    /// 解析哈希字符串或 config 字符串
    ///
    /// 可修正的缺陷（例如填充位）总是被修正，并以诊断形式返回。
    ///
    /// # Errors
    ///
    /// 无法识别或组成部分不合法时返回 `MalformedHash`
    fn parse(&self, hash: &str) -> Result<Diagnosed<HashInfo>>;

    /// 把各组成部分拼接为规范的哈希字符串，是 `parse` 的逆操作
    fn render(&self, info: &HashInfo) -> Result<String>;

    /// 计算校验和
    ///
    /// `secret` 已经通过 [`SecretPolicy`] 检查；`info` 已经通过校验。
    fn calc_checksum(&self, secret: &[u8], info: &HashInfo, ctx: &UserContext) -> Result<String>;

    /// 密码检查策略
    fn secret_policy(&self) -> &SecretPolicy;

    /// 当前选中的后端名称；没有后端概念或没有可用后端时返回 `None`
    fn backend(&self) -> Option<&'static str> {
        None
    }

    /// 支持的格式标识
    fn idents(&self) -> &'static [&'static str] {
        &[]
    }

    /// 默认格式标识
    fn default_ident(&self) -> &'static str {
        ""
    }

    /// salt 声明；不使用 salt 的格式返回 `None`
    fn salt_spec(&self) -> Option<&SaltSpec> {
        None
    }

    /// rounds 声明；不使用 rounds 的格式返回 `None`
    fn rounds_spec(&self) -> Option<&RoundsSpec> {
        None
    }

    /// 计算时是否需要 [`UserContext::user`]
    fn requires_user(&self) -> bool {
        false
    }

    // ========================================================================
    // 默认流程
    // ========================================================================

    /// 校验调用方参数，补全默认值并生成 salt，返回不带校验和的 [`HashInfo`]
    ///
    /// # Errors
    ///
    /// - `InvalidSetting`: 严格模式下参数越界，或任何模式下都无法修正的参数
    fn validate_settings(&self, settings: &Settings) -> Result<Diagnosed<HashInfo>> {
        let name = self.name();

        let ident = match settings.ident.as_deref() {
            None => self.default_ident(),
            Some(ident) => self
                .idents()
                .iter()
                .copied()
                .find(|&known| known == ident)
                .ok_or_else(|| {
                    Error::invalid_setting("ident", format!("invalid {} ident: {:?}", name, ident))
                })?,
        };
        let mut out = Diagnosed::new(HashInfo::new(ident));

        match self.salt_spec() {
            Some(spec) => {
                let salt = out.absorb(spec.norm(name, settings.salt.as_deref(), settings.strict)?);
                out.value.salt = salt;
            }
            None if settings.salt.is_some() => {
                return Err(Error::invalid_setting(
                    "salt",
                    format!("{} does not use a salt", name),
                ));
            }
            None => {}
        }

        match self.rounds_spec() {
            Some(spec) => {
                let rounds = out.absorb(spec.norm(name, settings.rounds, settings.strict)?);
                out.value.rounds = Some(rounds);
            }
            None if settings.rounds.is_some() => {
                return Err(Error::invalid_setting(
                    "rounds",
                    format!("{} does not use rounds", name),
                ));
            }
            None => {}
        }

        Ok(out)
    }

    /// 检查密码后计算校验和
    ///
    /// # Errors
    ///
    /// - `MissingSecret` / `PasswordTooLarge`: 在任何计算开始之前返回
    fn compute_checksum(
        &self,
        secret: Secret<'_>,
        info: &HashInfo,
        ctx: &UserContext,
    ) -> Result<String> {
        let secret = self.secret_policy().prepare(secret)?;
        self.calc_checksum(&secret, info, ctx)
    }

    /// 生成 config 字符串（已配置状态，没有校验和）
    fn genconfig(&self, settings: &Settings) -> Result<Diagnosed<String>> {
        self.validate_settings(settings)?
            .try_map(|info| self.render(&info))
    }

    /// 哈希密码：validate_settings -> calc_checksum -> render
    fn hash(&self, secret: Secret<'_>, settings: &Settings) -> Result<Diagnosed<String>> {
        let secret = self.secret_policy().prepare(secret)?;
        let ctx = settings.user_context();
        self.validate_settings(settings)?.try_map(|mut info| {
            info.checksum = Some(self.calc_checksum(&secret, &info, &ctx)?);
            self.render(&info)
        })
    }

    /// 使用 config（或已有哈希）中的参数哈希密码
    fn genhash(&self, secret: Secret<'_>, config: &str) -> Result<Diagnosed<String>> {
        self.genhash_with(secret, config, &UserContext::default())
    }

    /// 带用户上下文的 [`genhash`](Self::genhash)
    fn genhash_with(
        &self,
        secret: Secret<'_>,
        config: &str,
        ctx: &UserContext,
    ) -> Result<Diagnosed<String>> {
        let secret = self.secret_policy().prepare(secret)?;
        self.parse(config)?.try_map(|mut info| {
            info.checksum = Some(self.calc_checksum(&secret, &info, ctx)?);
            self.render(&info)
        })
    }

    /// 验证密码
    ///
    /// 密码不匹配时返回 `Ok(false)`；哈希畸形、密码超长等情况返回错误。
    fn verify(&self, secret: Secret<'_>, hash: &str) -> Result<bool> {
        self.verify_with(secret, hash, &UserContext::default())
    }

    /// 带用户上下文的 [`verify`](Self::verify)
    fn verify_with(&self, secret: Secret<'_>, hash: &str, ctx: &UserContext) -> Result<bool> {
        let secret = self.secret_policy().prepare(secret)?;
        let info = self.parse(hash)?.into_value();
        let Some(expected) = info.checksum.as_deref() else {
            return Err(Error::malformed(self.name(), "hash has no checksum"));
        };
        let actual = self.calc_checksum(&secret, &info, ctx)?;
        Ok(consteq_str(&actual, expected))
    }

    /// 把哈希字符串转换为规范形式（例如清除 bcrypt 的填充位）
    fn normhash(&self, hash: &str) -> Result<Diagnosed<String>> {
        self.parse(hash)?.try_map(|info| self.render(&info))
    }
}

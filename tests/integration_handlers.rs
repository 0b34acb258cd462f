//! Handler 协议集成测试
//!
//! 覆盖所有 handler 共享的行为：密码检查先于计算、哈希往返、
//! 注册表以及用户上下文。

use std::sync::atomic::{AtomicUsize, Ordering};

use passrs::error::{ConfigError, Error, PasswordHashError};
use passrs::handlers::{Md5Crypt, PostgresMd5, ShaCrypt};
use passrs::{
    Diagnosed, Handler, HashInfo, Secret, SecretPolicy, Settings, UserContext, registry,
};

// ============================================================================
// 计数 handler
// ============================================================================

/// 记录 calc_checksum 被调用次数的 handler，格式为 `$count$<len>`
struct Counting {
    calls: AtomicUsize,
    policy: SecretPolicy,
}

impl Counting {
    fn new(max_size: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            policy: SecretPolicy::new().with_max_size(max_size),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Handler for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn identify(&self, hash: &str) -> bool {
        hash.starts_with("$count$")
    }

    fn parse(&self, hash: &str) -> passrs::Result<Diagnosed<HashInfo>> {
        let rest = hash
            .strip_prefix("$count$")
            .ok_or_else(|| Error::malformed("counting", "wrong prefix"))?;
        let mut info = HashInfo::new("count");
        if !rest.is_empty() {
            info.checksum = Some(rest.to_string());
        }
        Ok(Diagnosed::new(info))
    }

    fn render(&self, info: &HashInfo) -> passrs::Result<String> {
        Ok(format!("$count${}", info.checksum.as_deref().unwrap_or("")))
    }

    fn calc_checksum(
        &self,
        secret: &[u8],
        _info: &HashInfo,
        _ctx: &UserContext,
    ) -> passrs::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(secret.len().to_string())
    }

    fn secret_policy(&self) -> &SecretPolicy {
        &self.policy
    }
}

/// 测试超长密码在任何计算之前被拒绝
#[test]
fn test_oversized_secret_rejected_before_work() {
    let handler = Counting::new(16);
    let big = "x".repeat(17);

    let err = handler.hash(big.as_str().into(), &Settings::new()).unwrap_err();
    assert_eq!(
        err,
        Error::PasswordHash(PasswordHashError::PasswordTooLarge {
            max_size: 16,
            actual: 17
        })
    );
    assert!(handler.verify(big.as_str().into(), "$count$17").is_err());
    assert!(handler.genhash(big.as_str().into(), "$count$").is_err());
    assert_eq!(handler.calls(), 0);

    // 恰好在上限内
    let ok = "x".repeat(16);
    assert!(handler.verify(ok.as_str().into(), "$count$16").unwrap());
    assert_eq!(handler.calls(), 1);
}

/// 测试缺少密码与哈希畸形同样先于计算
#[test]
fn test_missing_secret_and_malformed_hash() {
    let handler = Counting::new(16);
    let err = handler.verify(Secret::Missing, "$count$0").unwrap_err();
    assert_eq!(err, Error::PasswordHash(PasswordHashError::MissingSecret));

    assert!(handler.verify("pw".into(), "$other$2").is_err());
    // 没有校验和的 config 字符串不能用于验证
    assert!(handler.verify("pw".into(), "$count$").is_err());
    assert_eq!(handler.calls(), 0);
}

/// 测试所有真实 handler 都遵守长度上限
#[test]
fn test_real_handlers_respect_size_limit() {
    let policy = SecretPolicy::new().with_max_size(8);
    let handlers: Vec<Box<dyn Handler>> = vec![
        Box::new(Md5Crypt::new().with_secret_policy(policy.clone())),
        Box::new(ShaCrypt::sha256().with_secret_policy(policy.clone())),
        Box::new(PostgresMd5::new().with_secret_policy(policy)),
    ];
    for handler in handlers {
        let err = handler
            .hash("123456789".into(), &Settings::new().with_user("u"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PasswordHash(PasswordHashError::PasswordTooLarge { .. })
        ));
    }
}

// ============================================================================
// 注册表
// ============================================================================

/// 测试注册表中每个 handler 的 hash -> verify 往返
#[test]
fn test_registry_roundtrip() {
    for name in registry::names() {
        let handler = registry::get(name).unwrap();
        // des_crypt 在没有外部后端时不可用
        if name == "des_crypt" && handler.backend().is_none() {
            continue;
        }

        let mut settings = Settings::new().with_user("admin");
        if let Some(spec) = handler.rounds_spec() {
            settings = settings.with_rounds(spec.min);
        }

        let hash = handler.hash("s3cret".into(), &settings).unwrap();
        assert!(hash.is_clean(), "{}: {:?}", name, hash.diagnostics);
        assert!(handler.identify(&hash.value), "{}", name);

        let ctx = settings.user_context();
        assert!(handler.verify_with("s3cret".into(), &hash.value, &ctx).unwrap());
        assert!(!handler.verify_with("S3cret".into(), &hash.value, &ctx).unwrap());

        // 规范哈希的 parse -> render 不变
        assert_eq!(handler.normhash(&hash.value).unwrap().value, hash.value, "{}", name);
    }
}

/// 测试 genconfig 的结果可以直接用于 genhash
#[test]
fn test_genconfig_then_genhash() {
    for name in ["md5_crypt", "apr_md5_crypt", "sha256_crypt", "sha512_crypt"] {
        let handler = registry::get(name).unwrap();
        let mut settings = Settings::new();
        if let Some(spec) = handler.rounds_spec() {
            settings = settings.with_rounds(spec.min);
        }
        let config = handler.genconfig(&settings).unwrap().value;
        let hash = handler.genhash("pw".into(), &config).unwrap().value;
        assert!(hash.starts_with(config.trim_end_matches('$')));
        assert!(handler.verify("pw".into(), &hash).unwrap());
    }
}

// ============================================================================
// 用户上下文与规范化
// ============================================================================

/// 测试 postgres_md5 的用户名参与计算
#[test]
fn test_postgres_user_context() {
    let pg = registry::get("postgres_md5").unwrap();
    assert!(pg.requires_user());

    let ctx = UserContext::new().with_user("postgres");
    let hash = "md55fba2ea04fd36069d2574ea71c8efe9d";
    assert!(pg.verify_with("mypass".into(), hash, &ctx).unwrap());

    let other = UserContext::new().with_user("root");
    assert!(!pg.verify_with("mypass".into(), hash, &other).unwrap());

    let err = pg.verify("mypass".into(), hash).unwrap_err();
    assert_eq!(
        err,
        Error::Config(ConfigError::MissingRequired("user".to_string()))
    );
}

/// 测试启用 SASLprep 后，等价的 Unicode 密码得到相同结果
#[test]
fn test_normalized_secrets_are_equivalent() {
    let sha = ShaCrypt::sha256().with_secret_policy(SecretPolicy::new().with_normalization(true));
    let hash = sha
        .hash("IX".into(), &Settings::new().with_rounds(1000))
        .unwrap()
        .value;
    assert!(sha.verify("\u{2168}".into(), &hash).unwrap());
    assert!(sha.verify("I\u{00AD}X".into(), &hash).unwrap());

    // 字节输入不做规范化
    assert!(!sha.verify("\u{2168}".as_bytes().into(), &hash).unwrap());

    // 未启用规范化时两者不同
    let plain = ShaCrypt::sha256();
    assert!(!plain.verify("\u{2168}".into(), &hash).unwrap());
}

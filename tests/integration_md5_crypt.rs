//! md5-crypt 集成测试
//!
//! 覆盖 `$1$` 与 `$apr1$` 两种格式，已知向量在所有可用后端上验证。

use passrs::handlers::{Md5Crypt, Md5CryptBackend, Md5Variant};
use passrs::{DiagnosticKind, Handler, Settings};
use rstest::rstest;

fn available_handlers() -> Vec<Md5Crypt> {
    [Md5CryptBackend::Pwhash, Md5CryptBackend::Builtin]
        .into_iter()
        .filter_map(|backend| Md5Crypt::new().with_backend(backend).ok())
        .collect()
}

/// 测试 `$1$` 已知向量
#[rstest]
#[case("", "$1$dOHYPKoP$tnxS1T8Q6VVn3kpV8cN6o.")]
#[case("test", "$1$test$pi/xDtU5WFVRqYS6BMU8X/")]
#[case("test", "$1$$whuMjZj.HMFoaTaZRRtkO0")]
#[case("password", "$1$saltstri$qQY4WxjABChYG1ccLpfkz/")]
#[case("password", "$1$3azHgidD$SrJPt7B.9rekpmwJwtON31")]
#[case("U*U*U*U*", "$1$12345678$/juWPNB1lgN41Gn.ZSuJm1")]
fn test_md5_crypt_vectors(#[case] secret: &str, #[case] hash: &str) {
    let handlers = available_handlers();
    assert!(!handlers.is_empty());
    for handler in handlers {
        assert!(handler.verify(secret.into(), hash).unwrap());
        assert_eq!(handler.genhash(secret.into(), hash).unwrap().value, hash);
        assert!(!handler.verify("wrong".into(), hash).unwrap());
    }
}

/// 测试 `$apr1$` 已知向量
#[rstest]
#[case("password", "$apr1$r31.....$ARC3pREO82RIm0aQ2zszC0")]
#[case("", "$apr1$$J/S5FGXXjRRxbhIznTb/E1")]
#[case("test", "$apr1$abcdefgh$/cesMUEGhga5MgaTGywaW0")]
fn test_apr_md5_crypt_vectors(#[case] secret: &str, #[case] hash: &str) {
    let apache = Md5Crypt::apache();
    assert_eq!(apache.variant(), Md5Variant::Apache);
    assert_eq!(apache.backend(), Some("builtin"));
    assert!(apache.verify(secret.into(), hash).unwrap());
    assert!(!apache.verify("wrong".into(), hash).unwrap());
}

/// 测试两种格式互不识别
#[test]
fn test_variants_do_not_cross_identify() {
    let md5 = Md5Crypt::new();
    let apache = Md5Crypt::apache();
    let standard = "$1$test$pi/xDtU5WFVRqYS6BMU8X/";
    let apr = "$apr1$r31.....$ARC3pREO82RIm0aQ2zszC0";

    assert!(md5.identify(standard));
    assert!(!md5.identify(apr));
    assert!(apache.identify(apr));
    assert!(!apache.identify(standard));
    assert!(md5.verify("password".into(), apr).is_err());
}

/// 测试超长 salt 在宽松模式下被截断
#[test]
fn test_long_salt_truncated() {
    let md5 = Md5Crypt::new();
    let hash = md5
        .hash("password".into(), &Settings::new().with_salt("saltstring"))
        .unwrap();
    assert_eq!(hash.value, "$1$saltstri$qQY4WxjABChYG1ccLpfkz/");
    assert_eq!(hash.diagnostics.len(), 1);
    assert_eq!(hash.diagnostics[0].kind, DiagnosticKind::SaltTruncated);

    assert!(md5
        .hash("password".into(), &Settings::new().with_salt("saltstring").strict())
        .is_err());
}

/// 测试生成的 salt 为 8 个字符
#[test]
fn test_generated_salt() {
    let md5 = Md5Crypt::new();
    let config = md5.genconfig(&Settings::new()).unwrap().value;
    let salt = config
        .strip_prefix("$1$")
        .and_then(|rest| rest.strip_suffix('$'))
        .unwrap();
    assert_eq!(salt.len(), 8);
}

/// 测试非 UTF-8 密码在所有后端上结果一致
#[test]
fn test_binary_secret() {
    let secret: &[u8] = b"\xff\xfebinary";
    let hashes: Vec<String> = available_handlers()
        .iter()
        .map(|h| h.genhash(secret.into(), "$1$saltsalt$").unwrap().value)
        .collect();
    assert!(hashes.windows(2).all(|pair| pair[0] == pair[1]));
}

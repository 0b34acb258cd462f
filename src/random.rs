//! 安全随机数与常量时间比较模块
//!
//! 提供密码学安全的随机数生成功能（用于自动生成 salt），
//! 以及用于校验哈希时防御时序攻击的常量时间比较。
//!
//! 所有函数都不持有共享的可变 RNG 状态，可以从多个线程并发调用。

use rand::Rng;
use subtle::{Choice, ConstantTimeEq};

use crate::error::{CryptoError, Error, Result};

/// 生成指定长度的随机字节数组
///
/// 直接向操作系统的密码学安全随机数生成器 (CSPRNG) 请求随机数
///
/// # Example
///
/// ```rust
/// use passrs::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(16).unwrap();
/// assert_eq!(bytes.len(), 16);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    getrandom::fill(&mut bytes).map_err(|e| {
        Error::Crypto(CryptoError::RngFailed(format!(
            "failed to generate random bytes: {}",
            e
        )))
    })?;
    Ok(bytes)
}

/// 生成由指定字符集组成的随机字符串
///
/// 使用线程本地的 CSPRNG，每个字符在字符集中均匀分布。
///
/// # Arguments
///
/// * `charset` - 候选字符集（ASCII，至少 1 个字符）
/// * `count` - 输出字符数
///
/// # Example
///
/// ```rust
/// use passrs::random::generate_random_string;
///
/// let salt = generate_random_string(b"./0123456789", 8).unwrap();
/// assert_eq!(salt.len(), 8);
/// assert!(salt.bytes().all(|c| b"./0123456789".contains(&c)));
/// ```
pub fn generate_random_string(charset: &[u8], count: usize) -> Result<String> {
    if charset.is_empty() {
        return Err(Error::internal("charset must not be empty"));
    }
    let mut rng = rand::rng();
    Ok((0..count)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect())
}

// ============================================================================
// 常量时间比较
// ============================================================================

/// 常量时间比较两个字节切片
///
/// 无论首个不同字节出现在哪里，比较都会遍历完整的 `right`。
/// 长度不同时结果恒为 false，且此时把 `right` 和它自己比较，
/// 因此泄露的最多是长度信息，而不会泄露公共前缀的长度。
///
/// # Example
///
/// ```rust
/// use passrs::random::consteq;
///
/// assert!(consteq(b"secret_token", b"secret_token"));
/// assert!(!consteq(b"secret_token", b"other_token!"));
/// assert!(!consteq(b"secret", b"secret_token"));
/// ```
pub fn consteq(left: &[u8], right: &[u8]) -> bool {
    ct_fold(left, right, || ()).into()
}

/// 常量时间比较两个字符串
pub fn consteq_str(left: &str, right: &str) -> bool {
    consteq(left.as_bytes(), right.as_bytes())
}

/// 比较的核心循环，`step` 在每次迭代时被调用一次（供测试统计操作次数）
fn ct_fold(left: &[u8], right: &[u8], mut step: impl FnMut()) -> Choice {
    let same_size = Choice::from((left.len() == right.len()) as u8);
    let tmp = if left.len() == right.len() { left } else { right };

    let mut result = same_size;
    for (l, r) in tmp.iter().zip(right) {
        result &= l.ct_eq(r);
        step();
    }
    result
}

// ============================================================================
// 辅助函数
// ============================================================================

/// 将字节数组编码为小写十六进制字符串
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_random_bytes() {
        let bytes = generate_random_bytes(32).unwrap();
        assert_eq!(bytes.len(), 32);

        // 两次生成不应相同
        let bytes2 = generate_random_bytes(32).unwrap();
        assert_ne!(bytes, bytes2);
    }

    #[test]
    fn test_generate_random_string_charset() {
        let charset = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
        let salt = generate_random_string(charset, 64).unwrap();
        assert_eq!(salt.len(), 64);
        assert!(salt.bytes().all(|c| charset.contains(&c)));
    }

    #[test]
    fn test_generate_random_string_uneven_charset() {
        // 字符集大小不是 2 的幂
        let salt = generate_random_string(b"abc", 300).unwrap();
        assert_eq!(salt.len(), 300);
        let seen: HashSet<char> = salt.chars().collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_generate_random_string_edge_cases() {
        assert_eq!(generate_random_string(b"x", 4).unwrap(), "xxxx");
        assert_eq!(generate_random_string(b"ab", 0).unwrap(), "");
        assert!(generate_random_string(b"", 4).is_err());
    }

    #[test]
    fn test_consteq() {
        assert!(consteq(b"hello", b"hello"));
        assert!(!consteq(b"hello", b"world"));
        assert!(!consteq(b"hello", b"hell"));
        assert!(!consteq(b"", b"x"));
        assert!(consteq(b"", b""));
    }

    #[test]
    fn test_consteq_str() {
        assert!(consteq_str("secret", "secret"));
        assert!(!consteq_str("secret", "Secret"));
    }

    #[test]
    fn test_consteq_step_count_independent_of_mismatch_position() {
        let reference = b"abcdefghijklmnopqrstuvwxyz012345";
        let mut counts = HashSet::new();

        for pos in 0..reference.len() {
            let mut other = *reference;
            other[pos] ^= 0x01;
            let mut steps = 0usize;
            let equal: bool = ct_fold(&other, reference, || steps += 1).into();
            assert!(!equal);
            counts.insert(steps);
        }

        let mut steps = 0usize;
        let equal: bool = ct_fold(reference, reference, || steps += 1).into();
        assert!(equal);
        counts.insert(steps);

        // 所有情况下迭代次数都相同
        assert_eq!(counts.len(), 1);
        assert!(counts.contains(&reference.len()));
    }

    #[test]
    fn test_consteq_length_mismatch_iterates_right() {
        let mut steps = 0usize;
        let equal: bool = ct_fold(b"abc", b"abcdef", || steps += 1).into();
        assert!(!equal);
        assert_eq!(steps, 6);

        // 前缀相同与否不影响迭代次数
        let mut steps2 = 0usize;
        let _ = ct_fold(b"xyz", b"abcdef", || steps2 += 1);
        assert_eq!(steps, steps2);
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0xff, 0x10]), "00ff10");
        assert_eq!(hex_encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    }
}

//! H64 函数式接口
//!
//! 小端序 H64（`./0-9A-Za-z`）的便捷函数，md5-crypt、sha-crypt 等算法在
//! 渲染 / 解析校验和时直接使用。`*_dc_*` 函数是 des-crypt 使用的大端序变体。
//!
//! ```rust
//! use passrs::codec::h64;
//!
//! assert_eq!(h64::encode_int24(0), "....");
//! assert_eq!(h64::decode_int24("zzzz").unwrap(), (1 << 24) - 1);
//! assert!(h64::decode_bytes("abcde").is_err());
//! ```

use super::{H64, H64_BIG};
use crate::error::Result;

pub use super::H64_CHARS as CHARS;

/// 编码字节串
pub fn encode_bytes(source: &[u8]) -> String {
    H64.encode_bytes(source)
}

/// 解码字节串；长度 mod 4 == 1 时返回 `InvalidFormat`
pub fn decode_bytes(source: &str) -> Result<Vec<u8>> {
    H64.decode_bytes(source)
}

/// 按 `offsets` 重排后编码
pub fn encode_transposed_bytes(source: &[u8], offsets: &[usize]) -> String {
    H64.encode_transposed_bytes(source, offsets)
}

/// 解码并撤销重排；`offsets` 必须是一个完整的排列
pub fn decode_transposed_bytes(source: &str, offsets: &[usize]) -> Result<Vec<u8>> {
    H64.decode_transposed_bytes(source, offsets)
}

pub fn encode_int6(value: u8) -> String {
    H64.encode_int6(value)
}

pub fn decode_int6(source: &str) -> Result<u8> {
    H64.decode_int6(source)
}

pub fn encode_int12(value: u16) -> String {
    H64.encode_int12(value)
}

pub fn decode_int12(source: &str) -> Result<u16> {
    H64.decode_int12(source)
}

pub fn encode_int18(value: u32) -> String {
    H64.encode_int18(value)
}

pub fn decode_int18(source: &str) -> Result<u32> {
    H64.decode_int18(source)
}

pub fn encode_int24(value: u32) -> String {
    H64.encode_int24(value)
}

pub fn decode_int24(source: &str) -> Result<u32> {
    H64.decode_int24(source)
}

/// 64 位整数 -> 11 个字符（小端序，最高 2 位为填充）
pub fn encode_int64(value: u64) -> String {
    H64.encode_int64(value)
}

/// 11 个字符 -> 64 位整数（小端序）
pub fn decode_int64(source: &str) -> Result<u64> {
    H64.decode_int64(source)
}

/// 64 位整数 -> 11 个字符（大端序，最低 2 位为填充）
pub fn encode_dc_int64(value: u64) -> String {
    H64_BIG.encode_int64(value)
}

/// 11 个字符 -> 64 位整数（大端序，丢弃最低 2 位填充）
pub fn decode_dc_int64(source: &str) -> Result<u64> {
    H64_BIG.decode_int64(source)
}

/// 编码任意字符数的整数
///
/// # Arguments
///
/// * `value` - 要编码的整数，只有低 `6 * count` 位参与编码
/// * `count` - 输出字符数
/// * `big` - 是否使用大端序
pub fn encode_int(value: u128, count: usize, big: bool) -> String {
    if big {
        H64_BIG.encode_int(value, count)
    } else {
        H64.encode_int(value, count)
    }
}

/// 解码任意长度（最多 21 个字符）的整数
pub fn decode_int(source: &str, big: bool) -> Result<u128> {
    if big {
        H64_BIG.decode_int(source)
    } else {
        H64.decode_int(source)
    }
}

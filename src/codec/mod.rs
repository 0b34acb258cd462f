//! crypt(3) 风格的 64 字符编码
//!
//! crypt 家族的哈希格式都使用由 64 个字符组成的字母表，每个字符携带 6 位，
//! 但各算法在字母表顺序和位序上并不一致：
//!
//! - **H64**: `./0-9A-Za-z`，小端序（低位字符在前），md5-crypt、sha-crypt 使用
//! - **H64 大端**: 同一字母表，大端序，des-crypt 用于编码校验和
//! - **BCrypt64**: `./A-Za-z0-9`，大端序（与标准 base64 位序相同），bcrypt 使用
//!
//! [`Base64Engine`] 把字母表和位序参数化，三种变体共享同一套实现。
//! 面向 H64 的函数式接口位于 [`h64`] 模块。
//!
//! ## 示例
//!
//! ```rust
//! use passrs::codec::{BCRYPT64, H64};
//!
//! let text = H64.encode_bytes(b"abc");
//! assert_eq!(H64.decode_bytes(&text).unwrap(), b"abc");
//!
//! // bcrypt 的 16 字节 salt 编码为 22 个字符
//! assert_eq!(BCRYPT64.encode_bytes(&[0u8; 16]), ".".repeat(22));
//! ```

pub mod h64;

use crate::error::{Error, Result};

/// H64 字母表：字符值等于它在字母表中的下标
pub const H64_CHARS: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// bcrypt 使用的字母表
pub const BCRYPT_CHARS: &[u8; 64] =
    b"./ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// 小端序 H64 引擎
pub static H64: Base64Engine = Base64Engine::new(H64_CHARS, false);

/// 大端序 H64 引擎（des-crypt 校验和）
pub static H64_BIG: Base64Engine = Base64Engine::new(H64_CHARS, true);

/// bcrypt 引擎
pub static BCRYPT64: Base64Engine = Base64Engine::new(BCRYPT_CHARS, true);

const INVALID: u8 = 0xff;

/// 参数化的 64 字符编码引擎
///
/// 每 3 个字节编码为 4 个字符。剩余 1 个字节时输出 2 个字符（4 位填充），
/// 剩余 2 个字节时输出 3 个字符（2 位填充）。小端序时填充位位于最后一个字符的
/// 高位，大端序时位于低位。
#[derive(Debug)]
pub struct Base64Engine {
    charset: &'static [u8; 64],
    decode_map: [u8; 256],
    big: bool,
}

impl Base64Engine {
    /// 创建引擎
    ///
    /// # Arguments
    ///
    /// * `charset` - 64 个互不相同的 ASCII 字符
    /// * `big` - 是否使用大端位序
    pub const fn new(charset: &'static [u8; 64], big: bool) -> Self {
        let mut decode_map = [INVALID; 256];
        let mut i = 0;
        while i < 64 {
            decode_map[charset[i] as usize] = i as u8;
            i += 1;
        }
        Self {
            charset,
            decode_map,
            big,
        }
    }

    /// 字母表
    pub fn charset(&self) -> &'static [u8; 64] {
        self.charset
    }

    /// 是否为大端序
    pub fn is_big_endian(&self) -> bool {
        self.big
    }

    /// 判断字符是否属于字母表
    pub fn contains(&self, c: u8) -> bool {
        self.decode_map[c as usize] != INVALID
    }

    /// 判断字符串是否只包含字母表中的字符
    pub fn is_valid(&self, text: &str) -> bool {
        text.bytes().all(|c| self.contains(c))
    }

    // ========================================================================
    // 6 位字符
    // ========================================================================

    /// 6 位整数 -> 字符
    pub fn encode_6bit(&self, value: u8) -> char {
        self.charset[(value & 0x3f) as usize] as char
    }

    /// 字符 -> 6 位整数
    pub fn decode_6bit(&self, c: u8) -> Result<u8> {
        match self.decode_map[c as usize] {
            INVALID => Err(Error::invalid_format(format!(
                "invalid character {:?}",
                c as char
            ))),
            v => Ok(v),
        }
    }

    // ========================================================================
    // 整数
    // ========================================================================

    /// 将整数编码为 `count` 个字符
    ///
    /// 只有低 `6 * count` 位参与编码，更高的位被忽略。
    pub fn encode_int(&self, value: u128, count: usize) -> String {
        let mut out = String::with_capacity(count);
        for i in 0..count {
            let shift = if self.big { 6 * (count - 1 - i) } else { 6 * i };
            let chunk = if shift >= 128 { 0 } else { (value >> shift) & 0x3f };
            out.push(self.encode_6bit(chunk as u8));
        }
        out
    }

    /// 将任意长度（最多 21 个字符）的文本解码为整数
    pub fn decode_int(&self, text: &str) -> Result<u128> {
        let bytes = text.as_bytes();
        if bytes.len() > 21 {
            return Err(Error::invalid_format(format!(
                "{} characters exceed 128 bits",
                bytes.len()
            )));
        }
        let mut out: u128 = 0;
        if self.big {
            for &c in bytes {
                out = (out << 6) | self.decode_6bit(c)? as u128;
            }
        } else {
            for &c in bytes.iter().rev() {
                out = (out << 6) | self.decode_6bit(c)? as u128;
            }
        }
        Ok(out)
    }

    fn decode_fixed(&self, text: &str, count: usize) -> Result<u128> {
        if text.len() != count {
            return Err(Error::invalid_format(format!(
                "expected {} characters, got {}",
                count,
                text.len()
            )));
        }
        self.decode_int(text)
    }

    /// 6 位整数 -> 1 个字符
    pub fn encode_int6(&self, value: u8) -> String {
        self.encode_int(value as u128, 1)
    }

    /// 1 个字符 -> 6 位整数
    pub fn decode_int6(&self, text: &str) -> Result<u8> {
        Ok(self.decode_fixed(text, 1)? as u8)
    }

    /// 12 位整数 -> 2 个字符
    pub fn encode_int12(&self, value: u16) -> String {
        self.encode_int(value as u128, 2)
    }

    /// 2 个字符 -> 12 位整数
    pub fn decode_int12(&self, text: &str) -> Result<u16> {
        Ok(self.decode_fixed(text, 2)? as u16)
    }

    /// 18 位整数 -> 3 个字符
    pub fn encode_int18(&self, value: u32) -> String {
        self.encode_int(value as u128, 3)
    }

    /// 3 个字符 -> 18 位整数
    pub fn decode_int18(&self, text: &str) -> Result<u32> {
        Ok(self.decode_fixed(text, 3)? as u32)
    }

    /// 24 位整数 -> 4 个字符
    pub fn encode_int24(&self, value: u32) -> String {
        self.encode_int(value as u128, 4)
    }

    /// 4 个字符 -> 24 位整数
    pub fn decode_int24(&self, text: &str) -> Result<u32> {
        Ok(self.decode_fixed(text, 4)? as u32)
    }

    /// 64 位整数 -> 11 个字符
    ///
    /// 11 个字符共 66 位。大端序（des-crypt 变体）把 2 个填充位放在最低位，
    /// 即编码前先左移 2 位；小端序时填充位自然落在最高位。
    pub fn encode_int64(&self, value: u64) -> String {
        if self.big {
            self.encode_int((value as u128) << 2, 11)
        } else {
            self.encode_int(value as u128, 11)
        }
    }

    /// 11 个字符 -> 64 位整数，忽略 2 个填充位
    pub fn decode_int64(&self, text: &str) -> Result<u64> {
        let value = self.decode_fixed(text, 11)?;
        if self.big {
            Ok((value >> 2) as u64)
        } else {
            Ok(value as u64)
        }
    }

    // ========================================================================
    // 字节串
    // ========================================================================

    /// 编码字节串
    pub fn encode_bytes(&self, source: &[u8]) -> String {
        let mut out = String::with_capacity((source.len() * 4).div_ceil(3));
        let mut chunks = source.chunks_exact(3);
        for chunk in &mut chunks {
            let (b0, b1, b2) = (chunk[0] as u32, chunk[1] as u32, chunk[2] as u32);
            let v = if self.big {
                (b0 << 16) | (b1 << 8) | b2
            } else {
                b0 | (b1 << 8) | (b2 << 16)
            };
            out.push_str(&self.encode_int24(v));
        }
        match *chunks.remainder() {
            [b0] => {
                let v = if self.big { (b0 as u16) << 4 } else { b0 as u16 };
                out.push_str(&self.encode_int12(v));
            }
            [b0, b1] => {
                let (b0, b1) = (b0 as u32, b1 as u32);
                let v = if self.big {
                    ((b0 << 8) | b1) << 2
                } else {
                    b0 | (b1 << 8)
                };
                out.push_str(&self.encode_int18(v));
            }
            _ => {}
        }
        out
    }

    /// 解码字节串
    ///
    /// 填充位被忽略（参见 [`repair_unused`](Self::repair_unused)）。
    ///
    /// # Errors
    ///
    /// - 文本长度 mod 4 == 1：剩余的单个字符不足以表示一个完整字节
    /// - 文本包含字母表以外的字符
    pub fn decode_bytes(&self, source: &str) -> Result<Vec<u8>> {
        if source.len() % 4 == 1 {
            return Err(Error::invalid_format(
                "input length cannot be == 1 mod 4",
            ));
        }
        // 按字节切片前先确认全部是 ASCII 字母表字符
        if let Some(c) = source.bytes().find(|&c| !self.contains(c)) {
            return Err(Error::invalid_format(format!(
                "invalid character {:?}",
                c as char
            )));
        }

        let mut out = Vec::with_capacity(source.len() * 3 / 4);
        let end = source.len() - source.len() % 4;
        let mut idx = 0;
        while idx < end {
            let v = self.decode_int24(&source[idx..idx + 4])?;
            if self.big {
                out.extend_from_slice(&[(v >> 16) as u8, (v >> 8) as u8, v as u8]);
            } else {
                out.extend_from_slice(&[v as u8, (v >> 8) as u8, (v >> 16) as u8]);
            }
            idx += 4;
        }
        match source.len() - end {
            2 => {
                let v = self.decode_int12(&source[end..])?;
                out.push(if self.big { (v >> 4) as u8 } else { v as u8 });
            }
            3 => {
                let v = self.decode_int18(&source[end..])?;
                if self.big {
                    let v = v >> 2;
                    out.extend_from_slice(&[(v >> 8) as u8, v as u8]);
                } else {
                    out.extend_from_slice(&[v as u8, (v >> 8) as u8]);
                }
            }
            _ => {}
        }
        Ok(out)
    }

    /// 先按 `offsets` 重排字节再编码
    ///
    /// 输出的第 `i` 个字节取自 `source[offsets[i]]`。
    ///
    /// # Panics
    ///
    /// 如果 `offsets` 中的下标越界会 panic
    pub fn encode_transposed_bytes(&self, source: &[u8], offsets: &[usize]) -> String {
        let tmp: Vec<u8> = offsets.iter().map(|&off| source[off]).collect();
        self.encode_bytes(&tmp)
    }

    /// 解码后撤销 `offsets` 指定的重排，是 [`encode_transposed_bytes`](Self::encode_transposed_bytes) 的逆操作
    ///
    /// 前提：`offsets` 是 `0..offsets.len()` 的一个排列。否则未被覆盖的位置
    /// 无法还原（填充为 0），结果没有意义。
    pub fn decode_transposed_bytes(&self, source: &str, offsets: &[usize]) -> Result<Vec<u8>> {
        let tmp = self.decode_bytes(source)?;
        if tmp.len() != offsets.len() {
            return Err(Error::invalid_format(format!(
                "decoded {} bytes, transposition expects {}",
                tmp.len(),
                offsets.len()
            )));
        }
        let mut buf = vec![0u8; offsets.len()];
        for (&off, &byte) in offsets.iter().zip(&tmp) {
            if off >= buf.len() {
                return Err(Error::invalid_format(format!(
                    "transposition offset {} out of range",
                    off
                )));
            }
            buf[off] = byte;
        }
        Ok(buf)
    }

    // ========================================================================
    // 填充位
    // ========================================================================

    /// 最后一个字符中有效位的掩码；没有填充位时返回 `None`
    fn tail_mask(&self, len: usize) -> Option<u8> {
        let used_bits = match len % 4 {
            2 => 2,
            3 => 4,
            _ => return None,
        };
        let low_mask = (1u8 << used_bits) - 1;
        if self.big {
            Some(low_mask << (6 - used_bits))
        } else {
            Some(low_mask)
        }
    }

    /// 检查编码文本的填充位是否全为 0
    pub fn has_clean_padding(&self, source: &str) -> bool {
        match (self.tail_mask(source.len()), source.bytes().last()) {
            (Some(mask), Some(last)) => match self.decode_6bit(last) {
                Ok(v) => v & !mask == 0,
                Err(_) => false,
            },
            _ => true,
        }
    }

    /// 清除最后一个字符中被错误设置的填充位
    ///
    /// 返回 `None` 表示文本已经是规范形式；否则返回修正后的文本。
    ///
    /// # Example
    ///
    /// ```rust
    /// use passrs::codec::BCRYPT64;
    ///
    /// let salt = format!("{}A", ".".repeat(21));
    /// assert_eq!(BCRYPT64.repair_unused(&salt).unwrap(), Some(".".repeat(22)));
    /// assert_eq!(BCRYPT64.repair_unused(&".".repeat(22)).unwrap(), None);
    /// ```
    pub fn repair_unused(&self, source: &str) -> Result<Option<String>> {
        let Some(mask) = self.tail_mask(source.len()) else {
            return Ok(None);
        };
        let Some(last) = source.bytes().last() else {
            return Ok(None);
        };
        let value = self.decode_6bit(last)?;
        if value & !mask == 0 {
            return Ok(None);
        }
        let mut repaired = source[..source.len() - 1].to_string();
        repaired.push(self.encode_6bit(value & mask));
        Ok(Some(repaired))
    }
}

//! # passrs
//!
//! 兼容 crypt(3) 家族文本格式的密码哈希库。
//!
//! ## 功能特性
//!
//! - **统一的 handler 协议**: identify → parse → validate → compute → render
//! - **bcrypt**: `$2$`/`$2a$`/`$2b$`，自动修正 salt 的填充位并给出诊断
//! - **md5-crypt**: `$1$` 与 Apache 的 `$apr1$`
//! - **sha-crypt**: `$5$` / `$6$`，支持 `rounds=`
//! - **des-crypt** 与 **Postgres MD5**
//! - **H64 编解码**: crypt 家族使用的小端 6 位字符编码
//! - **可替换后端**: 每个 handler 可以在外部 crate 与内置实现之间切换，结果一致
//! - **常数时间比较**: 验证时不泄露匹配位置
//!
//! ## Features
//!
//! - `bcrypt` - 启用 `bcrypt` crate 作为 bcrypt 后端（默认启用）
//! - `pwhash` - 启用 `pwhash` crate 作为 md5/sha/des-crypt 后端（默认启用）
//! - `full` - 启用所有功能
//!
//! 关闭这些 feature 后，除 des-crypt 之外的 handler 仍可使用内置后端。
//!
//! ## 哈希与验证
//!
//! ```rust
//! use passrs::{Bcrypt, Handler, Settings};
//!
//! let bcrypt = Bcrypt::new();
//! let hash = bcrypt
//!     .hash("my_secure_password".into(), &Settings::new().with_rounds(5))
//!     .unwrap()
//!     .into_value();
//!
//! assert!(bcrypt.verify("my_secure_password".into(), &hash).unwrap());
//! assert!(!bcrypt.verify("wrong_password".into(), &hash).unwrap());
//! ```
//!
//! ## 诊断
//!
//! 可以自动修正的输入（例如 bcrypt salt 中多余的填充位）不会报错，
//! 修正记录随结果一起返回，同时通过 `log` 以 warn 级别输出。
//!
//! ```rust
//! use passrs::{Bcrypt, DiagnosticKind, Handler};
//!
//! let fixed = Bcrypt::new()
//!     .normhash("$2a$05$CCCCCCCCCCCCCCCCCCCCCC7uG0VCzI2bS7j6ymqJi9CdcdxiRTWNy")
//!     .unwrap();
//! assert_eq!(fixed.value, "$2a$05$CCCCCCCCCCCCCCCCCCCCC.7uG0VCzI2bS7j6ymqJi9CdcdxiRTWNy");
//! assert_eq!(fixed.diagnostics[0].kind, DiagnosticKind::PaddingBitsCleared);
//! ```
//!
//! ## 按名称查找
//!
//! ```rust
//! use passrs::registry;
//!
//! let sha256 = registry::get("sha256_crypt").unwrap();
//! assert!(sha256.identify("$5$rounds=5000$saltstring$"));
//! assert!(!sha256.identify("$6$rounds=5000$saltstring$"));
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod random;
pub mod registry;
pub mod secret;

pub use error::{Error, Result};

// ============================================================================
// Handler 协议导出
// ============================================================================

pub use handler::{
    Backend, Diagnosed, Diagnostic, DiagnosticKind, Handler, HashInfo, Settings, UserContext,
};
pub use secret::{Secret, SecretPolicy};

// ============================================================================
// 算法导出
// ============================================================================

pub use handlers::{Bcrypt, DesCrypt, Md5Crypt, PostgresMd5, ShaCrypt};

// ============================================================================
// 工具函数导出
// ============================================================================

pub use codec::{BCRYPT64, H64, H64_BIG};
pub use random::{consteq, consteq_str, generate_random_bytes, generate_random_string};

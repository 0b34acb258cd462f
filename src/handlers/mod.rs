//! 哈希算法 handler
//!
//! 每个 handler 都实现 [`Handler`](crate::handler::Handler) 协议。
//!
//! ## 支持的格式
//!
//! | handler | 格式 | 后端 |
//! |---|---|---|
//! | [`Bcrypt`] | `$2a$12$<salt22><checksum31>` | `bcrypt`（需启用 `bcrypt` feature）、`builtin` |
//! | [`Md5Crypt`] | `$1$<salt>$<checksum22>` | `pwhash`（需启用 `pwhash` feature）、`builtin` |
//! | [`Md5Crypt::apache`] | `$apr1$<salt>$<checksum22>` | `builtin` |
//! | [`ShaCrypt::sha256`] | `$5$[rounds=N$]<salt>$<checksum43>` | `pwhash`、`builtin` |
//! | [`ShaCrypt::sha512`] | `$6$[rounds=N$]<salt>$<checksum86>` | `pwhash`、`builtin` |
//! | [`DesCrypt`] | `<salt2><checksum11>` | 仅 `pwhash` |
//! | [`PostgresMd5`] | `md5<hex32>` | 内置，需要用户名 |
//!
//! ## 示例
//!
//! ```rust
//! use passrs::handler::{Handler, Settings};
//! use passrs::handlers::ShaCrypt;
//!
//! let sha = ShaCrypt::sha512();
//! let hash = sha
//!     .hash("password".into(), &Settings::new().with_rounds(5000))
//!     .unwrap()
//!     .into_value();
//! assert!(hash.starts_with("$6$rounds=5000$"));
//! assert!(sha.verify("password".into(), &hash).unwrap());
//! ```

pub mod bcrypt;
pub mod des_crypt;
pub mod md5_crypt;
pub mod postgres;
pub mod sha_crypt;

pub use self::bcrypt::{Bcrypt, BcryptBackend};
pub use des_crypt::{DesCrypt, DesCryptBackend};
pub use md5_crypt::{Md5Crypt, Md5CryptBackend, Md5Variant, raw_md5_crypt};
pub use postgres::PostgresMd5;
pub use sha_crypt::{ShaCrypt, ShaCryptBackend, ShaVariant};

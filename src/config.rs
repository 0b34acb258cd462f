//! 进程级配置
//!
//! 库本身只读取一个环境变量：`PASSRS_MAX_PASSWORD_SIZE`，用于覆盖默认的
//! 密码长度上限。该值在首次使用时读取一次，之后在整个进程中保持不变。

use std::sync::LazyLock;

/// 覆盖密码长度上限的环境变量名
pub const MAX_PASSWORD_SIZE_ENV: &str = "PASSRS_MAX_PASSWORD_SIZE";

/// 默认的密码长度上限（字节）
///
/// 许多哈希算法的耗时与密码长度成正比，不加限制时恶意的超长密码
/// 可以被用来消耗服务端 CPU。
pub const DEFAULT_MAX_PASSWORD_SIZE: usize = 4096;

static MAX_PASSWORD_SIZE: LazyLock<usize> =
    LazyLock::new(|| parse_max_password_size(std::env::var(MAX_PASSWORD_SIZE_ENV).ok()));

/// 获取进程级的密码长度上限
///
/// # Example
///
/// ```rust
/// use passrs::config::max_password_size;
///
/// assert!(max_password_size() > 0);
/// ```
pub fn max_password_size() -> usize {
    *MAX_PASSWORD_SIZE
}

fn parse_max_password_size(raw: Option<String>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_MAX_PASSWORD_SIZE;
    };
    match raw.trim().parse::<usize>() {
        Ok(size) if size > 0 => {
            log::debug!("{} overrides max password size to {}", MAX_PASSWORD_SIZE_ENV, size);
            size
        }
        _ => {
            log::warn!(
                "ignoring invalid {} value {:?}, using {}",
                MAX_PASSWORD_SIZE_ENV,
                raw,
                DEFAULT_MAX_PASSWORD_SIZE
            );
            DEFAULT_MAX_PASSWORD_SIZE
        }
    }
}

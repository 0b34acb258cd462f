//! Handler 注册表
//!
//! 名称到 handler 实例的只读映射，第一次访问时构建，之后不再修改。
//! 不提供根据哈希内容自动选择 handler 的功能，调用方需要自己知道格式名称。
//!
//! ## 示例
//!
//! ```rust
//! use passrs::registry;
//!
//! let md5 = registry::get("md5_crypt").unwrap();
//! assert!(md5.verify("password".into(), "$1$3azHgidD$SrJPt7B.9rekpmwJwtON31").unwrap());
//!
//! assert!(registry::get("unknown").is_none());
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::handler::Handler;
use crate::handlers::{Bcrypt, DesCrypt, Md5Crypt, PostgresMd5, ShaCrypt};

type HandlerMap = BTreeMap<&'static str, Box<dyn Handler>>;

static REGISTRY: LazyLock<HandlerMap> = LazyLock::new(|| {
    let handlers: Vec<Box<dyn Handler>> = vec![
        Box::new(Bcrypt::new()),
        Box::new(Md5Crypt::new()),
        Box::new(Md5Crypt::apache()),
        Box::new(ShaCrypt::sha256()),
        Box::new(ShaCrypt::sha512()),
        Box::new(DesCrypt::new()),
        Box::new(PostgresMd5::new()),
    ];

    let map: HandlerMap = handlers.into_iter().map(|h| (h.name(), h)).collect();
    log::debug!(
        "handler registry initialized: {}",
        map.keys().copied().collect::<Vec<_>>().join(", ")
    );
    map
});

/// 按名称获取 handler
///
/// # Arguments
///
/// * `name` - handler 名称，例如 `"bcrypt"`、`"sha512_crypt"`
///
/// # Returns
///
/// 未注册的名称返回 `None`
pub fn get(name: &str) -> Option<&'static dyn Handler> {
    REGISTRY.get(name).map(|handler| handler.as_ref())
}

/// 所有已注册的 handler 名称（按字母顺序）
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().copied()
}

/// 是否注册了指定名称
pub fn contains(name: &str) -> bool {
    REGISTRY.contains_key(name)
}

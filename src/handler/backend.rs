//! 可互换的后端
//!
//! 一个 handler 可以有多个计算校验和的实现（外部库 / 内置实现）。
//! 每个实现是一个枚举值，各自报告是否可用；handler 构造时选定其中一个，
//! 之后只读。同样的输入在任何后端上都必须得到同样的校验和。

use std::fmt;

use crate::error::{BackendError, Error, Result};

/// 后端枚举需要实现的接口
pub trait Backend: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// 后端名称
    fn name(&self) -> &'static str;

    /// 该后端在当前进程中是否可用
    ///
    /// 可能执行一次自检，实现应当缓存结果。
    fn is_available(&self) -> bool;
}

/// 一个 handler 的候选后端集合及当前选中的后端
#[derive(Debug, Clone)]
pub struct BackendSet<B: Backend> {
    handler: &'static str,
    candidates: &'static [B],
    active: Option<B>,
}

impl<B: Backend> BackendSet<B> {
    /// 按优先级顺序选中第一个可用的后端
    ///
    /// 没有可用后端时不会失败，之后每次 [`active`](Self::active) 都会返回
    /// `NoBackendsAvailable`。
    pub fn detect(handler: &'static str, candidates: &'static [B]) -> Self {
        let active = candidates.iter().copied().find(|b| b.is_available());
        match active {
            Some(b) => log::debug!("{}: using {} backend", handler, b.name()),
            None => log::debug!("{}: no backends available", handler),
        }
        Self {
            handler,
            candidates,
            active,
        }
    }

    /// 显式选择一个后端
    ///
    /// # Errors
    ///
    /// 后端不属于该 handler 或当前不可用时返回 `BackendError::Unavailable`
    pub fn select(&mut self, backend: B) -> Result<()> {
        if !self.candidates.contains(&backend) || !backend.is_available() {
            return Err(self.unavailable(backend.name()));
        }
        log::debug!("{}: selected {} backend", self.handler, backend.name());
        self.active = Some(backend);
        Ok(())
    }

    /// 按名称选择后端；`"default"` 重新执行自动检测
    pub fn select_by_name(&mut self, name: &str) -> Result<()> {
        if name == "default" {
            *self = Self::detect(self.handler, self.candidates);
            return self.active().map(|_| ());
        }
        match self.candidates.iter().copied().find(|b| b.name() == name) {
            Some(backend) => self.select(backend),
            None => Err(self.unavailable(name)),
        }
    }

    /// 当前选中的后端
    ///
    /// # Errors
    ///
    /// 没有任何可用后端时返回 `BackendError::NoBackendsAvailable`
    pub fn active(&self) -> Result<B> {
        self.active.ok_or(Error::Backend(BackendError::NoBackendsAvailable {
            handler: self.handler,
        }))
    }

    /// 所有候选后端
    pub fn candidates(&self) -> &'static [B] {
        self.candidates
    }

    /// 当前可用的候选后端
    pub fn available(&self) -> Vec<B> {
        self.candidates
            .iter()
            .copied()
            .filter(|b| b.is_available())
            .collect()
    }

    fn unavailable(&self, name: &str) -> Error {
        Error::Backend(BackendError::Unavailable {
            handler: self.handler,
            backend: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Fake {
        Native,
        Fallback,
        Broken,
    }

    impl Backend for Fake {
        fn name(&self) -> &'static str {
            match self {
                Fake::Native => "native",
                Fake::Fallback => "fallback",
                Fake::Broken => "broken",
            }
        }

        fn is_available(&self) -> bool {
            !matches!(self, Fake::Broken)
        }
    }

    #[test]
    fn test_detect_picks_first_available() {
        let set = BackendSet::detect("fake", &[Fake::Broken, Fake::Fallback, Fake::Native]);
        assert_eq!(set.active().unwrap(), Fake::Fallback);
        assert_eq!(set.available(), vec![Fake::Fallback, Fake::Native]);
    }

    #[test]
    fn test_no_backends() {
        let set = BackendSet::detect("fake", &[Fake::Broken]);
        let err = set.active().unwrap_err();
        assert_eq!(
            err,
            Error::Backend(BackendError::NoBackendsAvailable { handler: "fake" })
        );
    }

    #[test]
    fn test_select() {
        let mut set = BackendSet::detect("fake", &[Fake::Native, Fake::Fallback, Fake::Broken]);
        set.select(Fake::Fallback).unwrap();
        assert_eq!(set.active().unwrap(), Fake::Fallback);

        let err = set.select(Fake::Broken).unwrap_err();
        assert!(matches!(err, Error::Backend(BackendError::Unavailable { .. })));
        // 失败的选择不改变当前后端
        assert_eq!(set.active().unwrap(), Fake::Fallback);
    }

    #[test]
    fn test_select_foreign_backend() {
        let mut set = BackendSet::detect("fake", &[Fake::Native]);
        assert!(set.select(Fake::Fallback).is_err());
    }

    #[test]
    fn test_select_by_name() {
        let mut set = BackendSet::detect("fake", &[Fake::Native, Fake::Fallback]);
        set.select_by_name("fallback").unwrap();
        assert_eq!(set.active().unwrap(), Fake::Fallback);

        set.select_by_name("default").unwrap();
        assert_eq!(set.active().unwrap(), Fake::Native);

        assert!(set.select_by_name("missing").is_err());
    }
}

//! arena 下标
//!
//! 节点与链路都住在 `Network` 的 arena 里，组件之间只拿这两个下标
//! 互相指认，不持有引用，所有权环因此不存在。
//! 派生 `Ord` 是因为主机用它们做 `BTreeMap` 的键。

/// 节点（主机或路由器）在 arena 中的稳定下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// 链路在 arena 中的稳定下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

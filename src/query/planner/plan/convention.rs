//! 调用约定定义
//!
//! 调用约定描述计划节点的执行模型（逐行迭代、本地编译、列式等）。
//! 相邻节点的调用约定必须一致，否则需要显式的转换节点。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 调用约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CallingConvention {
    /// 逻辑节点，尚未选定执行模型，不可直接执行
    None,
    /// 逐行迭代器
    Iterator,
    /// 本地编译执行
    Native,
    /// 列式批量执行
    Columnar,
}

impl CallingConvention {
    /// 是否为可执行的物理约定
    pub fn is_implementable(&self) -> bool {
        !matches!(self, CallingConvention::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CallingConvention::None => "NONE",
            CallingConvention::Iterator => "ITERATOR",
            CallingConvention::Native => "NATIVE",
            CallingConvention::Columnar => "COLUMNAR",
        }
    }

    /// 所有物理约定
    pub fn physical() -> [CallingConvention; 3] {
        [
            CallingConvention::Iterator,
            CallingConvention::Native,
            CallingConvention::Columnar,
        ]
    }
}

impl Default for CallingConvention {
    fn default() -> Self {
        CallingConvention::None
    }
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

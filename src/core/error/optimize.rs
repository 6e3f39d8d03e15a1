//! 优化器错误类型
//!
//! 定义代价优化器相关的错误类型，包括：
//! - 没有可行的物理计划
//! - 等价组引用错误
//! - 规则应用错误

use thiserror::Error;

use crate::query::planner::rewrite::result::RewriteError;

/// 优化器错误类型
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// 在要求的调用约定下找不到有限代价的计划
    #[error("没有可行的计划: {0}")]
    NoViablePlan(String),

    /// 等价组不存在
    #[error("等价组不存在: {0}")]
    GroupNotFound(usize),

    /// 尚未设置根节点
    #[error("尚未设置根节点")]
    MissingRoot,

    /// 规则应用错误
    #[error("规则应用错误: {0}")]
    Rewrite(#[from] RewriteError),
}

impl OptimizerError {
    pub fn no_viable_plan(msg: impl Into<String>) -> Self {
        Self::NoViablePlan(msg.into())
    }
}

/// 优化器结果类型
pub type OptimizerResult<T> = Result<T, OptimizerError>;

//! 统一错误处理
//!
//! ## 设计理念
//!
//! 1. **按模块划分**：每个子系统有自己的错误枚举
//!    - 重写错误 `RewriteError`（定义在重写模块中）
//!    - 优化器错误 `OptimizerError`
//!    - LURQL 编译错误 `LurqlError`
//!    - 配置错误 `ConfigError`
//!
//! 2. **分层转换**：子系统错误通过 `#[from]` 自动转换为 `PlanError`，保留完整错误信息
//!
//! 3. **统一接口**：`PlanResult<T>` 提供统一的返回类型，简化错误传播

use thiserror::Error;

pub mod config;
pub mod lurql;
pub mod optimize;

pub use config::ConfigError;
pub use lurql::{LurqlError, LurqlResult};
pub use optimize::{OptimizerError, OptimizerResult};

use crate::query::planner::rewrite::result::RewriteError;

/// 统一的规划错误类型
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("重写错误: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("优化器错误: {0}")]
    Optimizer(#[from] OptimizerError),

    #[error("LURQL 编译错误: {0}")]
    Lurql(#[from] LurqlError),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 统一的结果类型
pub type PlanResult<T> = Result<T, PlanError>;

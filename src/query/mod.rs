//! 查询规划模块
//!
//! - `planner`：计划节点与启发式重写
//! - `optimizer`：代价优化
//! - `lurql`：LURQL 路径查询编译

pub mod lurql;
pub mod optimizer;
pub mod planner;

pub use crate::core::{PlanError, PlanResult};

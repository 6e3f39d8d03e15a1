//! 关系计划规划
//!
//! - `plan`: 关系代数计划节点、表达式与调用约定
//! - `rewrite`: 基于规则的启发式重写

pub mod plan;
pub mod rewrite;

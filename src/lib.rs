//! GraphPlan - 基于规则的计划重写核心与 LURQL 路径查询规划器
//!
//! - `query::planner`：关系代数计划、重写规则与启发式重写器
//! - `query::optimizer`：基于备忘录和代价模型的优化器
//! - `query::lurql`：把路径查询编译为遍历计划图
//! - `config`：TOML 配置
//! - `utils::logging`：日志初始化

pub mod config;
pub mod core;
pub mod query;
pub mod utils;

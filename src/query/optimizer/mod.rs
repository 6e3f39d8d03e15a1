//! 基于代价的优化器
//!
//! 采用备忘录（Memo）结构：等价的表达式归入同一组，表达式的输入引用
//! `(组, 调用约定)` 子集而非具体子树。优化过程先在备忘录上探索所有已注册的规则，
//! 再补齐调用约定转换，最后按代价模型选出要求约定下代价最低的计划。
//!
//! ## 模块结构
//!
//! - `core` - 代价与代价模型
//! - `plan` - 等价组、组内表达式与备忘录
//! - `engine` - 探索与优化引擎
//!
//! ## 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use graphplan::query::optimizer::{CostBasedPlanner, DefaultCostModel};
//! use graphplan::query::planner::plan::{CallingConvention, PlanNode};
//! use graphplan::query::planner::rewrite::{ImplementRule, RuleRegistry};
//!
//! let mut registry = RuleRegistry::new();
//! registry.add(ImplementRule::all_operators(CallingConvention::Iterator));
//!
//! let mut planner = CostBasedPlanner::new(registry.into_shared(), Arc::new(DefaultCostModel::new()));
//! planner.set_root(&PlanNode::scan("Person")).unwrap();
//! let best = planner.find_best_plan(CallingConvention::Iterator).unwrap();
//! assert_eq!(best.convention(), CallingConvention::Iterator);
//! ```

pub mod core;
pub mod engine;
pub mod plan;

pub use self::core::{Cost, CostModel, CostModelConfig, DefaultCostModel};
pub use engine::{CostBasedPlanner, OptimizerStats};
pub use plan::{Memo, OptGroup, OptGroupNode, SubsetRef};
pub use crate::core::error::{OptimizerError, OptimizerResult};

//! 计划重写模块
//!
//! 基于规则的计划重写机制：规则注册、模式匹配与规则应用。
//!
//! # 模块结构
//!
//! - `context`: 重写上下文定义
//! - `pattern`: 模式（操作数树）匹配定义
//! - `result`: 重写错误与结果定义
//! - `rule`: 重写规则 trait 定义
//! - `registry`: 规则注册表与排除过滤器
//! - `program`: 重写程序（有序的阶段指令）
//! - `plan_rewriter`: 启发式重写器实现
//! - `converter`: 调用约定转换规则与转换表
//! - `implement`: 逻辑节点实现规则
//! - `merge`: 操作合并规则
//! - `elimination`: 消除规则
//!
//! # 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use graphplan::query::planner::plan::{Expr, PlanNode};
//! use graphplan::query::planner::rewrite::{
//!     CollapseProjectRule, HeuristicPlanner, RewriteProgram, RuleRegistry,
//! };
//!
//! let program = RewriteProgram::builder()
//!     .add_rule_instance(Arc::new(CollapseProjectRule::new()))
//!     .build();
//! let mut planner = HeuristicPlanner::new(RuleRegistry::new().into_shared());
//! let plan = PlanNode::project(
//!     vec![Expr::col("a").plus(Expr::int(1))],
//!     PlanNode::project(vec![Expr::col("a")], PlanNode::scan("T")),
//! );
//! let rewritten = planner.apply(&program, plan).unwrap();
//! assert_eq!(rewritten.node_count(), 2);
//! ```

pub mod context;
pub mod converter;
pub mod elimination;
pub mod implement;
pub mod merge;
pub mod pattern;
pub mod plan_rewriter;
pub mod program;
pub mod registry;
pub mod result;
pub mod rule;

pub use context::RewriteContext;
pub use converter::{Conversion, ConversionTable, ConverterRule};
pub use elimination::{EliminateFilterRule, RemoveNoopProjectRule};
pub use implement::ImplementRule;
pub use merge::{CollapseProjectRule, CombineFilterRule};
pub use pattern::{MatchNode, Pattern};
pub use plan_rewriter::{HeuristicPlanner, RewriteStats};
pub use program::{Instruction, MatchOrder, ProgramBuilder, RewriteProgram};
pub use registry::{RuleRegistry, SharedRuleRegistry};
pub use result::{RewriteError, RewriteResult, TransformResult};
pub use rule::{rule_class_of, same_rule, RewriteRule, RuleRef};

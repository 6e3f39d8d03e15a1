//! 消除规则
//!
//! 消除冗余的操作，包括恒真过滤和无操作投影。

pub mod eliminate_filter;
pub mod remove_noop_project;

pub use eliminate_filter::EliminateFilterRule;
pub use remove_noop_project::RemoveNoopProjectRule;

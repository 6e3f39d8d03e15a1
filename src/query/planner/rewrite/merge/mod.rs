//! 操作合并规则
//!
//! 合并相邻的同类操作，减少中间结果。

pub mod collapse_project;
pub mod combine_filter;

pub use collapse_project::CollapseProjectRule;
pub use combine_filter::CombineFilterRule;

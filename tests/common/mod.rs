//! 集成测试共享工具模块
//!
//! 提供测试夹具和断言辅助函数，供所有集成测试使用

#![allow(dead_code)]

pub mod assertions;
pub mod data_fixtures;

use std::sync::Arc;

use graphplan::query::planner::rewrite::{RuleRef, RuleRegistry, SharedRuleRegistry};

/// 创建包含给定规则的共享注册表
pub fn shared_registry(rules: Vec<RuleRef>) -> SharedRuleRegistry {
    let mut registry = RuleRegistry::new();
    registry.register_all(rules);
    registry.into_shared()
}

/// 包装为规则引用
pub fn rule<R: graphplan::query::planner::rewrite::RewriteRule + 'static>(rule: R) -> RuleRef {
    Arc::new(rule)
}

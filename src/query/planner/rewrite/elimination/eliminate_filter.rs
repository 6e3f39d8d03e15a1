//! 消除恒真过滤操作的规则

use crate::query::planner::plan::{Operator, PlanNode};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};
use crate::query::planner::rewrite::rule::RewriteRule;

/// 消除恒真过滤操作的规则
///
/// # 转换示例
///
/// Before:
/// ```text
///   Filter(true)
///       |
///   Scan(T)
/// ```
///
/// After:
/// ```text
///   Scan(T)
/// ```
///
/// # 适用条件
///
/// - 过滤条件为字面量 true
/// - 子节点调用约定与过滤节点一致
#[derive(Debug)]
pub struct EliminateFilterRule;

impl EliminateFilterRule {
    /// 创建规则实例
    pub fn new() -> Self {
        Self
    }
}

impl Default for EliminateFilterRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteRule for EliminateFilterRule {
    fn name(&self) -> &str {
        "EliminateFilterRule"
    }

    fn pattern(&self) -> Pattern {
        Pattern::with_filter_matcher()
    }

    fn apply(
        &self,
        _ctx: &mut RewriteContext,
        node: &PlanNode,
    ) -> RewriteResult<Option<TransformResult>> {
        match (node.operator(), node.input(0)) {
            (Operator::Filter { condition }, Some(input))
                if condition.is_true_literal() && input.convention() == node.convention() =>
            {
                Ok(Some(TransformResult::replace(input.clone())))
            }
            _ => Ok(None),
        }
    }
}

//! 合并相邻过滤操作的规则

use crate::query::planner::plan::{Expr, Operator, PlanNode};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};
use crate::query::planner::rewrite::rule::RewriteRule;

/// 合并相邻过滤操作的规则
///
/// # 转换示例
///
/// Before:
/// ```text
///   Filter(b>200)
///       |
///   Filter(a>100)
///       |
///   Scan(T)
/// ```
///
/// After:
/// ```text
///   Filter((a>100) AND (b>200))
///       |
///   Scan(T)
/// ```
///
/// # 适用条件
///
/// - 当前节点为Filter节点
/// - 子节点也为Filter节点，且两者调用约定一致
#[derive(Debug)]
pub struct CombineFilterRule;

impl CombineFilterRule {
    /// 创建规则实例
    pub fn new() -> Self {
        Self
    }

    /// 合并两个条件表达式，下层条件在前
    fn combine_conditions(top: &Expr, child: &Expr) -> Expr {
        child.clone().and(top.clone())
    }
}

impl Default for CombineFilterRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteRule for CombineFilterRule {
    fn name(&self) -> &str {
        "CombineFilterRule"
    }

    fn pattern(&self) -> Pattern {
        Pattern::with_filter_matcher().with_dependency_name("Filter")
    }

    fn apply(
        &self,
        _ctx: &mut RewriteContext,
        node: &PlanNode,
    ) -> RewriteResult<Option<TransformResult>> {
        let (top, child) = match (node.operator(), node.input(0)) {
            (Operator::Filter { condition }, Some(child)) => (condition, child),
            _ => return Ok(None),
        };
        let bottom = match child.operator() {
            Operator::Filter { condition } => condition,
            _ => return Ok(None),
        };
        if child.convention() != node.convention() {
            return Ok(None);
        }

        let new_node = PlanNode::new(
            Operator::Filter {
                condition: Self::combine_conditions(top, bottom),
            },
            child.inputs().to_vec(),
            node.convention(),
        );
        Ok(Some(TransformResult::replace(new_node)))
    }
}

//! 移除无操作投影的规则

use crate::query::planner::plan::{Expr, NamedExpr, Operator, PlanNode};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};
use crate::query::planner::rewrite::rule::RewriteRule;

/// 移除无操作投影的规则
///
/// # 转换示例
///
/// Before:
/// ```text
///   Project(a, b)
///       |
///   Project(x+1 AS a, b)
/// ```
///
/// After:
/// ```text
///   Project(x+1 AS a, b)
/// ```
///
/// # 适用条件
///
/// - 当前 Project 只包含无别名的列引用
/// - 列引用按顺序与子 Project 的输出列完全一致
#[derive(Debug)]
pub struct RemoveNoopProjectRule;

impl RemoveNoopProjectRule {
    /// 创建规则实例
    pub fn new() -> Self {
        Self
    }

    /// 检查是否为无操作投影
    fn is_noop_projection(columns: &[NamedExpr], child_columns: &[NamedExpr]) -> bool {
        if columns.is_empty() || columns.len() != child_columns.len() {
            return false;
        }
        columns.iter().zip(child_columns).all(|(col, child)| {
            col.alias.is_none()
                && matches!(&col.expr, Expr::Column(name) if *name == child.output_name())
        })
    }
}

impl Default for RemoveNoopProjectRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteRule for RemoveNoopProjectRule {
    fn name(&self) -> &str {
        "RemoveNoopProjectRule"
    }

    fn pattern(&self) -> Pattern {
        Pattern::with_project_matcher().with_dependency_name("Project")
    }

    fn apply(
        &self,
        _ctx: &mut RewriteContext,
        node: &PlanNode,
    ) -> RewriteResult<Option<TransformResult>> {
        let (columns, child) = match (node.operator(), node.input(0)) {
            (Operator::Project { exprs }, Some(child)) => (exprs, child),
            _ => return Ok(None),
        };
        let child_columns = match child.operator() {
            Operator::Project { exprs } => exprs,
            _ => return Ok(None),
        };
        if child.convention() != node.convention()
            || !Self::is_noop_projection(columns, child_columns)
        {
            return Ok(None);
        }
        Ok(Some(TransformResult::replace(child.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_noop_project() {
        let rule = RemoveNoopProjectRule::new();
        let mut ctx = RewriteContext::new();
        let inner = PlanNode::project(
            vec![
                NamedExpr::aliased(Expr::col("x").plus(Expr::int(1)), "a"),
                NamedExpr::new(Expr::col("b")),
            ],
            PlanNode::scan("T"),
        );

        let plan = PlanNode::project(vec![Expr::col("a"), Expr::col("b")], inner.clone());
        let result = rule.apply(&mut ctx, &plan).expect("规则执行不应失败");
        assert_eq!(result.and_then(|r| r.into_first()), Some(inner.clone()));

        // 列顺序不同不是无操作投影
        let plan = PlanNode::project(vec![Expr::col("b"), Expr::col("a")], inner);
        assert!(rule.apply(&mut ctx, &plan).expect("规则执行不应失败").is_none());
    }
}

//! 折叠相邻投影操作的规则

use std::collections::HashMap;

use crate::query::planner::plan::{Expr, NamedExpr, Operator, PlanNode};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};
use crate::query::planner::rewrite::rule::RewriteRule;

/// 折叠相邻投影操作的规则
///
/// # 转换示例
///
/// Before:
/// ```text
///   Project(a+1)
///       |
///   Project(a)
///       |
///   Scan(T)
/// ```
///
/// After:
/// ```text
///   Project(a+1)
///       |
///   Scan(T)
/// ```
///
/// # 适用条件
///
/// - 当前节点为Project节点
/// - 子节点也为Project节点，且两者调用约定一致
/// - 上层Project的列引用都能解析为下层Project的输出列
#[derive(Debug)]
pub struct CollapseProjectRule;

impl CollapseProjectRule {
    /// 创建规则实例
    pub fn new() -> Self {
        Self
    }

    /// 用下层投影的表达式替换上层投影的列引用
    ///
    /// 合并后的表达式文本发生变化时，以原输出名作为别名，保持输出列名不变。
    fn merge_exprs(outer: &[NamedExpr], inner: &[NamedExpr]) -> Option<Vec<NamedExpr>> {
        let mapping: HashMap<String, Expr> = inner
            .iter()
            .map(|e| (e.output_name(), e.expr.clone()))
            .collect();

        outer
            .iter()
            .map(|named| {
                let merged = named.expr.substitute(&mapping)?;
                let output_name = named.output_name();
                let alias = match &named.alias {
                    Some(alias) => Some(alias.clone()),
                    None if merged.to_string() != output_name => Some(output_name),
                    None => None,
                };
                Some(NamedExpr {
                    expr: merged,
                    alias,
                })
            })
            .collect()
    }
}

impl Default for CollapseProjectRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteRule for CollapseProjectRule {
    fn name(&self) -> &str {
        "CollapseProjectRule"
    }

    fn pattern(&self) -> Pattern {
        Pattern::with_project_matcher().with_dependency_name("Project")
    }

    fn apply(
        &self,
        _ctx: &mut RewriteContext,
        node: &PlanNode,
    ) -> RewriteResult<Option<TransformResult>> {
        let outer = match node.operator() {
            Operator::Project { exprs } => exprs,
            _ => return Ok(None),
        };
        let child = match node.input(0) {
            Some(child) => child,
            None => return Ok(None),
        };
        let inner = match child.operator() {
            Operator::Project { exprs } => exprs,
            _ => return Ok(None),
        };
        if child.convention() != node.convention() {
            return Ok(None);
        }

        let merged = match Self::merge_exprs(outer, inner) {
            Some(merged) => merged,
            None => return Ok(None),
        };

        let new_node = PlanNode::new(
            Operator::Project { exprs: merged },
            child.inputs().to_vec(),
            node.convention(),
        );
        Ok(Some(TransformResult::replace(new_node)))
    }
}

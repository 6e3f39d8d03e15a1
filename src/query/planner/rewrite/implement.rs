//! 逻辑节点实现规则
//!
//! 把调用约定为 NONE 的逻辑节点实现为指定物理约定下的同名节点。

use crate::query::planner::plan::{CallingConvention, Operator, PlanNode};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};
use crate::query::planner::rewrite::rule::RewriteRule;

/// 逻辑节点实现规则
///
/// # 转换示例
///
/// Before:
/// ```text
///   Filter(a>1) [NONE]
/// ```
///
/// After:
/// ```text
///   Filter(a>1) [ITERATOR]
/// ```
///
/// # 适用条件
///
/// - 节点调用约定为 NONE
/// - 节点算子在规则支持的算子列表中
///
/// 启发式重写中子节点不受影响，约定不一致的边由转换阶段补齐转换节点；
/// 在代价优化器中子节点是 `Subset` 占位节点，改为引用目标约定下的子集。
#[derive(Debug)]
pub struct ImplementRule {
    target: CallingConvention,
    operators: Vec<&'static str>,
    description: String,
}

impl ImplementRule {
    pub fn new(target: CallingConvention, operators: Vec<&'static str>) -> Self {
        let description = format!("ImplementRule({}:{})", target, operators.join("|"));
        Self {
            target,
            operators,
            description,
        }
    }

    /// 支持所有关系算子的实现规则
    pub fn all_operators(target: CallingConvention) -> Self {
        Self::new(
            target,
            vec!["Scan", "Values", "Filter", "Project", "Join", "Aggregate", "Union"],
        )
    }

    pub fn target(&self) -> CallingConvention {
        self.target
    }
}

impl RewriteRule for ImplementRule {
    fn name(&self) -> &str {
        &self.description
    }

    fn pattern(&self) -> Pattern {
        Pattern::multi(self.operators.clone()).with_convention(CallingConvention::None)
    }

    fn apply(
        &self,
        _ctx: &mut RewriteContext,
        node: &PlanNode,
    ) -> RewriteResult<Option<TransformResult>> {
        if !self.target.is_implementable() {
            return Ok(None);
        }
        let inputs = node
            .inputs()
            .iter()
            .map(|input| match input.operator() {
                Operator::Subset { .. } => input.clone().with_convention(self.target),
                _ => input.clone(),
            })
            .collect();
        Ok(Some(TransformResult::replace(
            node.clone()
                .with_inputs(inputs)
                .with_convention(self.target),
        )))
    }
}

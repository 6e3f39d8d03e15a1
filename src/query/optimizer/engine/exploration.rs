//! 探索状态管理
//! 定义 ExplorationState 结构体，用于追踪探索过程中已触发的规则绑定，
//! 以及在备忘录上枚举规则操作数绑定的函数

use std::collections::HashSet;

use crate::query::optimizer::plan::Memo;
use crate::query::planner::plan::PlanNode;
use crate::query::planner::rewrite::Pattern;

/// 单个表达式上最多枚举的绑定数
pub const MAX_BINDINGS_PER_NODE: usize = 1024;

#[derive(Debug, Default)]
pub struct ExplorationState {
    fired: HashSet<String>,
    pub current_round: usize,
}

impl ExplorationState {
    pub fn next_round(&mut self) {
        self.current_round += 1;
    }

    /// 记录规则在某个绑定上触发，已触发过返回 false
    pub fn mark_fired(&mut self, rule_name: &str, binding: &PlanNode) -> bool {
        self.fired
            .insert(format!("{}|{}", rule_name, binding.digest()))
    }

    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }
}

/// 枚举以 `node_id` 为根、匹配 `pattern` 的所有绑定
///
/// 模式覆盖的层级展开为具体节点，模式之下的输入以 `Subset` 占位节点表示。
/// 输入子集中的每个成员都会被尝试，结果为各输入候选的笛卡尔积。
pub fn bindings(memo: &Memo, node_id: usize, pattern: &Pattern, limit: usize) -> Vec<PlanNode> {
    let node = match memo.node(node_id) {
        Some(node) => node,
        None => return Vec::new(),
    };

    if let Some(ref matcher) = pattern.node {
        if !matcher.matches(node.name()) {
            return Vec::new();
        }
    }
    if let Some(convention) = pattern.convention {
        if node.convention != convention {
            return Vec::new();
        }
    }

    if pattern.dependencies.is_empty() {
        return vec![node.shallow_plan()];
    }
    if pattern.dependencies.len() != node.inputs.len() {
        return Vec::new();
    }

    let mut combinations: Vec<Vec<PlanNode>> = vec![Vec::new()];
    for (dependency, input) in pattern.dependencies.iter().zip(&node.inputs) {
        let candidates: Vec<PlanNode> = memo
            .members_with_convention(input.group, input.convention)
            .into_iter()
            .flat_map(|member| bindings(memo, member, dependency, limit))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut next = Vec::with_capacity(combinations.len() * candidates.len());
        'outer: for combination in &combinations {
            for candidate in &candidates {
                if next.len() >= limit {
                    log::warn!("表达式 #{} 的绑定数超过上限 {}, 截断", node_id, limit);
                    break 'outer;
                }
                let mut inputs = combination.clone();
                inputs.push(candidate.clone());
                next.push(inputs);
            }
        }
        combinations = next;
    }

    combinations
        .into_iter()
        .map(|inputs| PlanNode::new(node.operator.clone(), inputs, node.convention))
        .collect()
}

//! 备忘录
//!
//! 备忘录保存所有等价组与其成员表达式。表达式按摘要去重：摘要由算子、调用约定
//! 以及各输入的代表组组成。两个组被证明等价时合并，合并后重新计算摘要，
//! 摘要相同但分属不同组的表达式会触发进一步合并，直到稳定。

use std::collections::HashMap;

use super::group::OptGroup;
use super::node::{OptGroupNode, SubsetRef};
use crate::core::error::{OptimizerError, OptimizerResult};
use crate::query::planner::plan::{CallingConvention, Operator, PlanNode};

#[derive(Debug, Default)]
pub struct Memo {
    groups: Vec<OptGroup>,
    nodes: Vec<OptGroupNode>,
    digests: HashMap<String, usize>,
    /// 每次新增表达式或合并组时递增
    version: u64,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 代表组编号
    pub fn find(&self, group: usize) -> usize {
        let mut current = group;
        while let Some(parent) = self.groups.get(current).and_then(|g| g.merged_into) {
            current = parent;
        }
        current
    }

    pub fn canonical(&self, subset: SubsetRef) -> SubsetRef {
        SubsetRef::new(self.find(subset.group), subset.convention)
    }

    pub fn contains_group(&self, group: usize) -> bool {
        group < self.groups.len()
    }

    /// 未被合并的组数
    pub fn group_count(&self) -> usize {
        self.groups.iter().filter(|g| !g.is_merged()).count()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn node(&self, id: usize) -> Option<&OptGroupNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[OptGroupNode] {
        &self.nodes
    }

    /// 表达式所在的代表组
    pub fn group_of(&self, node_id: usize) -> Option<usize> {
        self.nodes.get(node_id).map(|n| self.find(n.group))
    }

    pub fn members(&self, group: usize) -> &[usize] {
        match self.groups.get(self.find(group)) {
            Some(g) => &g.members,
            None => &[],
        }
    }

    /// 组内指定调用约定的成员
    pub fn members_with_convention(&self, group: usize, convention: CallingConvention) -> Vec<usize> {
        self.members(group)
            .iter()
            .copied()
            .filter(|&id| self.nodes[id].convention == convention)
            .collect()
    }

    /// 插入一棵计划树，返回根所在的组
    pub fn insert(&mut self, plan: &PlanNode) -> OptimizerResult<usize> {
        self.insert_into(plan, None)
    }

    /// 插入一棵计划树，根表达式放入 `target` 组（若给出）
    ///
    /// 根表达式已存在于其他组时两个组合并。`Subset` 占位节点直接引用已有组。
    pub fn insert_into(&mut self, plan: &PlanNode, target: Option<usize>) -> OptimizerResult<usize> {
        if let Operator::Subset { group } = plan.operator() {
            if !self.contains_group(*group) {
                return Err(OptimizerError::GroupNotFound(*group));
            }
            let existing = self.find(*group);
            return Ok(match target {
                Some(target) => self.merge(target, existing),
                None => existing,
            });
        }

        let mut inputs = Vec::with_capacity(plan.inputs().len());
        for input in plan.inputs() {
            let group = self.insert_into(input, None)?;
            inputs.push(SubsetRef::new(group, input.convention()));
        }
        Ok(self.add_expression(plan.operator().clone(), plan.convention(), inputs, target))
    }

    /// 添加单个表达式，返回其所在的代表组
    pub fn add_expression(
        &mut self,
        operator: Operator,
        convention: CallingConvention,
        inputs: Vec<SubsetRef>,
        target: Option<usize>,
    ) -> usize {
        let inputs: Vec<SubsetRef> = inputs.into_iter().map(|i| self.canonical(i)).collect();
        let digest = Self::digest_of(&operator, convention, &inputs);
        if let Some(&existing) = self.digests.get(&digest) {
            let group = self.find(self.nodes[existing].group);
            return match target {
                Some(target) => self.merge(target, group),
                None => group,
            };
        }

        let group = match target {
            Some(target) => self.find(target),
            None => self.new_group(),
        };
        let id = self.nodes.len();
        self.nodes
            .push(OptGroupNode::new(id, group, operator, convention, inputs));
        self.groups[group].add_member(id);
        self.digests.insert(digest, id);
        self.version += 1;
        group
    }

    /// 合并两个等价组，返回合并后的代表组
    pub fn merge(&mut self, a: usize, b: usize) -> usize {
        if self.union(a, b) {
            self.rebuild();
        }
        self.find(a)
    }

    fn new_group(&mut self) -> usize {
        let id = self.groups.len();
        self.groups.push(OptGroup::new(id));
        id
    }

    fn digest_of(operator: &Operator, convention: CallingConvention, inputs: &[SubsetRef]) -> String {
        let inputs: Vec<String> = inputs.iter().map(SubsetRef::to_string).collect();
        format!(
            "{}[{}]@{}({})",
            operator.name(),
            operator.describe(),
            convention,
            inputs.join(", ")
        )
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (keep, absorb) = if ra < rb { (ra, rb) } else { (rb, ra) };
        let members = std::mem::take(&mut self.groups[absorb].members);
        for id in members {
            self.nodes[id].group = keep;
            self.groups[keep].add_member(id);
        }
        self.groups[absorb].merged_into = Some(keep);
        self.version += 1;
        log::debug!("合并等价组 #{} -> #{}", absorb, keep);
        true
    }

    /// 合并后规范化输入并重建摘要索引
    fn rebuild(&mut self) {
        loop {
            let mut digests: HashMap<String, usize> = HashMap::with_capacity(self.nodes.len());
            let mut pending = None;

            for id in 0..self.nodes.len() {
                let inputs: Vec<SubsetRef> = self.nodes[id]
                    .inputs
                    .iter()
                    .map(|i| self.canonical(*i))
                    .collect();
                let group = self.find(self.nodes[id].group);
                self.nodes[id].inputs = inputs;
                self.nodes[id].group = group;

                let node = &self.nodes[id];
                let digest = Self::digest_of(&node.operator, node.convention, &node.inputs);
                match digests.get(&digest) {
                    Some(&other) => {
                        let other_group = self.find(self.nodes[other].group);
                        if other_group != group {
                            pending = Some((other_group, group));
                            break;
                        }
                    }
                    None => {
                        digests.insert(digest, id);
                    }
                }
            }

            match pending {
                Some((a, b)) => {
                    self.union(a, b);
                }
                None => {
                    self.digests = digests;
                    break;
                }
            }
        }
    }
}

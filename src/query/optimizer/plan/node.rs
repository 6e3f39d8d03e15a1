//! 优化节点定义
//! 定义 OptGroupNode 结构体，表示备忘录中的一个表达式
//!
//! OptGroupNode 不直接持有子树，而是以 `(组, 调用约定)` 引用子节点，
//! 即同一组内某一约定下的任意成员都可作为该输入。

use std::fmt;

use crate::query::planner::plan::{CallingConvention, Operator, PlanNode};

/// 对等价组中某一调用约定子集的引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsetRef {
    pub group: usize,
    pub convention: CallingConvention,
}

impl SubsetRef {
    pub fn new(group: usize, convention: CallingConvention) -> Self {
        Self { group, convention }
    }
}

impl fmt::Display for SubsetRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}@{}", self.group, self.convention)
    }
}

#[derive(Debug, Clone)]
pub struct OptGroupNode {
    pub id: usize,
    /// 所属组；组合并后可能不是代表组，读取时需经过 `Memo::find`
    pub group: usize,
    pub operator: Operator,
    pub convention: CallingConvention,
    pub inputs: Vec<SubsetRef>,
}

impl OptGroupNode {
    pub fn new(
        id: usize,
        group: usize,
        operator: Operator,
        convention: CallingConvention,
        inputs: Vec<SubsetRef>,
    ) -> Self {
        Self {
            id,
            group,
            operator,
            convention,
            inputs,
        }
    }

    pub fn name(&self) -> &'static str {
        self.operator.name()
    }

    pub fn is_converter(&self) -> bool {
        matches!(self.operator, Operator::Converter { .. })
    }

    /// 以 `Subset` 占位节点作为子节点的浅层计划节点
    pub fn shallow_plan(&self) -> PlanNode {
        let inputs = self
            .inputs
            .iter()
            .map(|input| PlanNode::subset(input.group, input.convention))
            .collect();
        PlanNode::new(self.operator.clone(), inputs, self.convention)
    }
}

impl fmt::Display for OptGroupNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}[{}]@{}",
            self.operator.name(),
            self.operator.describe(),
            self.convention
        )?;
        if !self.inputs.is_empty() {
            let inputs: Vec<String> = self.inputs.iter().map(SubsetRef::to_string).collect();
            write!(f, "({})", inputs.join(", "))?;
        }
        Ok(())
    }
}

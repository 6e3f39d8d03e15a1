//! 计划节点定义
//!
//! PlanNode 是被重写的关系代数树：每个节点由算子、有序子节点列表和调用约定组成。
//! 子节点由父节点独占所有；代价优化器的备忘录通过 `Subset` 占位算子实现共享。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::convention::CallingConvention;
use super::expr::{Expr, NamedExpr};
use crate::query::planner::rewrite::result::{RewriteError, RewriteResult};

/// 连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Cross,
}

/// 算子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    Scan {
        table: String,
    },
    Values {
        rows: usize,
    },
    Filter {
        condition: Expr,
    },
    Project {
        exprs: Vec<NamedExpr>,
    },
    Join {
        kind: JoinKind,
        condition: Option<Expr>,
    },
    Aggregate {
        group_by: Vec<Expr>,
        aggregates: Vec<NamedExpr>,
    },
    Union {
        all: bool,
    },
    /// 调用约定转换节点
    Converter {
        from: CallingConvention,
        to: CallingConvention,
    },
    /// 备忘录等价组占位节点，仅在代价优化器内部出现
    Subset {
        group: usize,
    },
}

impl Operator {
    /// 算子名称，模式匹配依据此名称
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Scan { .. } => "Scan",
            Operator::Values { .. } => "Values",
            Operator::Filter { .. } => "Filter",
            Operator::Project { .. } => "Project",
            Operator::Join { .. } => "Join",
            Operator::Aggregate { .. } => "Aggregate",
            Operator::Union { .. } => "Union",
            Operator::Converter { .. } => "Converter",
            Operator::Subset { .. } => "Subset",
        }
    }

    /// 算子自身属性的文本描述（不含子节点）
    pub fn describe(&self) -> String {
        match self {
            Operator::Scan { table } => table.clone(),
            Operator::Values { rows } => format!("rows={}", rows),
            Operator::Filter { condition } => condition.to_string(),
            Operator::Project { exprs } => join_display(exprs),
            Operator::Join { kind, condition } => match condition {
                Some(cond) => format!("{:?}, {}", kind, cond),
                None => format!("{:?}", kind),
            },
            Operator::Aggregate {
                group_by,
                aggregates,
            } => format!("group=[{}], aggs=[{}]", join_display(group_by), join_display(aggregates)),
            Operator::Union { all } => format!("all={}", all),
            Operator::Converter { from, to } => format!("{}->{}", from, to),
            Operator::Subset { group } => format!("group#{}", group),
        }
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 计划节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    operator: Operator,
    inputs: Vec<PlanNode>,
    convention: CallingConvention,
}

impl PlanNode {
    pub fn new(operator: Operator, inputs: Vec<PlanNode>, convention: CallingConvention) -> Self {
        Self {
            operator,
            inputs,
            convention,
        }
    }

    /// 创建逻辑节点（调用约定为 NONE）
    pub fn logical(operator: Operator, inputs: Vec<PlanNode>) -> Self {
        Self::new(operator, inputs, CallingConvention::None)
    }

    pub fn scan(table: impl Into<String>) -> Self {
        Self::logical(
            Operator::Scan {
                table: table.into(),
            },
            Vec::new(),
        )
    }

    pub fn values(rows: usize) -> Self {
        Self::logical(Operator::Values { rows }, Vec::new())
    }

    pub fn filter(condition: Expr, input: PlanNode) -> Self {
        Self::logical(Operator::Filter { condition }, vec![input])
    }

    pub fn project<E: Into<NamedExpr>>(exprs: Vec<E>, input: PlanNode) -> Self {
        let exprs = exprs.into_iter().map(Into::into).collect();
        Self::logical(Operator::Project { exprs }, vec![input])
    }

    pub fn join(kind: JoinKind, condition: Option<Expr>, left: PlanNode, right: PlanNode) -> Self {
        Self::logical(Operator::Join { kind, condition }, vec![left, right])
    }

    pub fn aggregate(group_by: Vec<Expr>, aggregates: Vec<NamedExpr>, input: PlanNode) -> Self {
        Self::logical(
            Operator::Aggregate {
                group_by,
                aggregates,
            },
            vec![input],
        )
    }

    pub fn union(all: bool, inputs: Vec<PlanNode>) -> Self {
        Self::logical(Operator::Union { all }, inputs)
    }

    /// 创建调用约定转换节点，输出约定为 `to`
    pub fn converter(to: CallingConvention, input: PlanNode) -> Self {
        let from = input.convention;
        Self::new(Operator::Converter { from, to }, vec![input], to)
    }

    pub fn subset(group: usize, convention: CallingConvention) -> Self {
        Self::new(Operator::Subset { group }, Vec::new(), convention)
    }

    /// 返回替换了调用约定的副本
    pub fn with_convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }

    /// 返回替换了子节点的副本
    pub fn with_inputs(mut self, inputs: Vec<PlanNode>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn name(&self) -> &'static str {
        self.operator.name()
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn inputs(&self) -> &[PlanNode] {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut Vec<PlanNode> {
        &mut self.inputs
    }

    pub fn input(&self, index: usize) -> Option<&PlanNode> {
        self.inputs.get(index)
    }

    pub fn into_inputs(self) -> Vec<PlanNode> {
        self.inputs
    }

    pub fn convention(&self) -> CallingConvention {
        self.convention
    }

    pub fn is_converter(&self) -> bool {
        matches!(self.operator, Operator::Converter { .. })
    }

    /// 以当前节点为根的子树节点数
    pub fn node_count(&self) -> usize {
        1 + self.inputs.iter().map(PlanNode::node_count).sum::<usize>()
    }

    /// 节点自身摘要（不含子节点），代价优化器用于去重
    pub fn local_digest(&self) -> String {
        format!(
            "{}[{}]@{}",
            self.operator.name(),
            self.operator.describe(),
            self.convention
        )
    }

    /// 整棵子树的摘要
    pub fn digest(&self) -> String {
        let mut out = self.local_digest();
        if !self.inputs.is_empty() {
            let children: Vec<String> = self.inputs.iter().map(PlanNode::digest).collect();
            out.push('(');
            out.push_str(&children.join(", "));
            out.push(')');
        }
        out
    }

    /// 按路径取子树，路径为逐层的子节点下标
    pub fn get_at(&self, path: &[usize]) -> Option<&PlanNode> {
        let mut current = self;
        for &index in path {
            current = current.inputs.get(index)?;
        }
        Some(current)
    }

    /// 将路径处的子树替换为新节点
    pub fn replace_at(&mut self, path: &[usize], replacement: PlanNode) -> RewriteResult<()> {
        let mut current = self;
        for &index in path {
            current = current.inputs.get_mut(index).ok_or_else(|| {
                RewriteError::invalid_plan_structure(format!("替换路径越界: {:?}", path))
            })?;
        }
        *current = replacement;
        Ok(())
    }

    /// 前序遍历（父先于子，左子先于右子）得到所有节点路径
    pub fn pre_order_paths(&self) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        let mut prefix = Vec::new();
        self.collect_paths(&mut prefix, &mut paths, true);
        paths
    }

    /// 后序遍历（子先于父，左子先于右子）得到所有节点路径
    pub fn post_order_paths(&self) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        let mut prefix = Vec::new();
        self.collect_paths(&mut prefix, &mut paths, false);
        paths
    }

    fn collect_paths(&self, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>, pre_order: bool) {
        if pre_order {
            out.push(prefix.clone());
        }
        for (i, input) in self.inputs.iter().enumerate() {
            prefix.push(i);
            input.collect_paths(prefix, out, pre_order);
            prefix.pop();
        }
        if !pre_order {
            out.push(prefix.clone());
        }
    }

    /// 校验相邻节点的调用约定
    ///
    /// 每条父子边要么约定一致，要么父节点是 `from` 等于子节点约定、
    /// `to` 等于自身约定的转换节点。
    pub fn validate_conventions(&self) -> RewriteResult<()> {
        for input in &self.inputs {
            match self.operator {
                Operator::Converter { from, to } => {
                    if input.convention != from || self.convention != to {
                        return Err(RewriteError::invalid_plan_structure(format!(
                            "转换节点 {}->{} 与子节点约定 {} 或自身约定 {} 不一致",
                            from, to, input.convention, self.convention
                        )));
                    }
                }
                _ => {
                    if input.convention != self.convention {
                        return Err(RewriteError::invalid_plan_structure(format!(
                            "{} 节点约定 {} 与子节点 {} 约定 {} 不一致且缺少转换节点",
                            self.name(),
                            self.convention,
                            input.name(),
                            input.convention
                        )));
                    }
                }
            }
            input.validate_conventions()?;
        }
        Ok(())
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{}{}({}) [{}]",
            "  ".repeat(depth),
            self.name(),
            self.operator.describe(),
            self.convention
        )?;
        for input in &self.inputs {
            input.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

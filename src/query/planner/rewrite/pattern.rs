//! 模式匹配定义
//!
//! 规则的操作数树：根节点的匹配条件加上按顺序排列的子模式。
//! 子模式为空表示不约束子节点；子模式非空时子节点数量必须一致并逐一匹配。

use crate::query::planner::plan::{CallingConvention, PlanNode};

/// 模式结构体
///
/// 用于匹配计划树的特定结构。
/// 包含当前节点的匹配条件、可选的调用约定约束和子节点的模式。
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    /// 当前节点的匹配条件，`None` 匹配任何节点
    pub node: Option<MatchNode>,
    /// 要求的调用约定
    pub convention: Option<CallingConvention>,
    /// 子节点的模式列表
    pub dependencies: Vec<Pattern>,
}

impl Pattern {
    /// 创建空模式（匹配任何节点）
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定节点创建模式
    pub fn with_node(node: MatchNode) -> Self {
        Self {
            node: Some(node),
            convention: None,
            dependencies: Vec::new(),
        }
    }

    /// 使用节点名称创建模式
    pub fn new_with_name(name: &'static str) -> Self {
        Self::with_node(MatchNode::Single(name))
    }

    /// 使用多个可能的节点名称创建模式
    pub fn multi(node_names: Vec<&'static str>) -> Self {
        Self::with_node(MatchNode::Multi(node_names))
    }

    /// 通配模式
    pub fn any() -> Self {
        Self::with_node(MatchNode::Any)
    }

    /// 限定调用约定
    pub fn with_convention(mut self, convention: CallingConvention) -> Self {
        self.convention = Some(convention);
        self
    }

    /// 添加子节点模式
    pub fn with_dependency(mut self, dependency: Pattern) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// 使用节点名称添加子节点模式
    pub fn with_dependency_name(mut self, name: &'static str) -> Self {
        self.dependencies.push(Self::new_with_name(name));
        self
    }

    /// 检查模式是否匹配给定的计划节点
    pub fn matches(&self, plan_node: &PlanNode) -> bool {
        if let Some(ref node) = self.node {
            if !node.matches(plan_node.name()) {
                return false;
            }
        }

        if let Some(convention) = self.convention {
            if plan_node.convention() != convention {
                return false;
            }
        }

        if self.dependencies.is_empty() {
            return true;
        }

        let inputs = plan_node.inputs();
        if inputs.len() != self.dependencies.len() {
            return false;
        }

        self.dependencies
            .iter()
            .zip(inputs)
            .all(|(dep, input)| dep.matches(input))
    }

    /// 模式树的深度，叶子模式为 1
    pub fn depth(&self) -> usize {
        1 + self
            .dependencies
            .iter()
            .map(Pattern::depth)
            .max()
            .unwrap_or(0)
    }

    /// 创建匹配 Project 节点的模式
    pub fn with_project_matcher() -> Self {
        Self::new_with_name("Project")
    }

    /// 创建匹配 Filter 节点的模式
    pub fn with_filter_matcher() -> Self {
        Self::new_with_name("Filter")
    }
}

/// 节点匹配枚举
///
/// 定义如何匹配单个计划节点
#[derive(Debug, Clone)]
pub enum MatchNode {
    /// 匹配单个特定名称的节点
    Single(&'static str),
    /// 匹配多个可能名称中的任意一个
    Multi(Vec<&'static str>),
    /// 匹配任何节点
    Any,
}

impl MatchNode {
    /// 检查节点名称是否匹配
    pub fn matches(&self, node_name: &str) -> bool {
        match self {
            MatchNode::Single(name) => *name == node_name,
            MatchNode::Multi(names) => names.contains(&node_name),
            MatchNode::Any => true,
        }
    }

    /// 获取单个名称（如果是 Single 变体）
    pub fn as_single(&self) -> Option<&'static str> {
        match self {
            MatchNode::Single(name) => Some(name),
            _ => None,
        }
    }
}

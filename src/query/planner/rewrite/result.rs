//! 重写结果定义
//!
//! 定义重写规则的错误类型与返回结果类型。

use crate::query::planner::plan::{CallingConvention, PlanNode};

/// 重写错误类型
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("无效的计划节点: {0}")]
    InvalidNode(String),

    #[error("规则 {rule} 重写失败: {message}")]
    RuleFailed { rule: String, message: String },

    #[error("不支持的节点类型: {0}")]
    UnsupportedNodeType(String),

    #[error("无法将调用约定 {from} 转换为 {to}")]
    NoConversion {
        from: CallingConvention,
        to: CallingConvention,
    },

    #[error("无效的计划结构: {0}")]
    InvalidPlanStructure(String),
}

impl RewriteError {
    pub fn invalid_node(msg: impl Into<String>) -> Self {
        Self::InvalidNode(msg.into())
    }

    pub fn rule_failed(rule: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::RuleFailed {
            rule: rule.into(),
            message: msg.into(),
        }
    }

    pub fn unsupported_node_type(name: impl Into<String>) -> Self {
        Self::UnsupportedNodeType(name.into())
    }

    pub fn no_conversion(from: CallingConvention, to: CallingConvention) -> Self {
        Self::NoConversion { from, to }
    }

    pub fn invalid_plan_structure(msg: impl Into<String>) -> Self {
        Self::InvalidPlanStructure(msg.into())
    }
}

/// 重写结果类型
pub type RewriteResult<T> = std::result::Result<T, RewriteError>;

/// 转换结果
///
/// 记录重写规则应用后产生的等价节点。
/// 启发式重写器只采用第一个新节点；代价优化器会把所有新节点加入同一等价组。
#[derive(Debug, Default, Clone)]
pub struct TransformResult {
    /// 新的计划节点列表
    pub new_nodes: Vec<PlanNode>,
}

impl TransformResult {
    /// 创建新的转换结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 以单个替换节点创建转换结果
    pub fn replace(node: PlanNode) -> Self {
        Self {
            new_nodes: vec![node],
        }
    }

    /// 添加新的计划节点
    pub fn add_new_node(&mut self, node: PlanNode) {
        self.new_nodes.push(node);
    }

    /// 检查是否有新节点
    pub fn has_new_nodes(&self) -> bool {
        !self.new_nodes.is_empty()
    }

    /// 获取第一个新节点（如果存在）
    pub fn first_new_node(&self) -> Option<&PlanNode> {
        self.new_nodes.first()
    }

    /// 取出第一个新节点
    pub fn into_first(self) -> Option<PlanNode> {
        self.new_nodes.into_iter().next()
    }
}

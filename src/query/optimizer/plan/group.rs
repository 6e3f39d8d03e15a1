//! 优化组定义
//! 定义 OptGroup 结构体，管理一组等价的表达式
//!
//! 组被合并后保留原编号，`merged_into` 指向吸收它的组。

use std::fmt;

/// 优化阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationPhase {
    Exploration,
    Conversion,
    Costing,
    Extraction,
}

impl fmt::Display for OptimizationPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptimizationPhase::Exploration => write!(f, "Exploration"),
            OptimizationPhase::Conversion => write!(f, "Conversion"),
            OptimizationPhase::Costing => write!(f, "Costing"),
            OptimizationPhase::Extraction => write!(f, "Extraction"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptGroup {
    pub id: usize,
    /// 成员表达式编号
    pub members: Vec<usize>,
    pub merged_into: Option<usize>,
}

impl OptGroup {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            members: Vec::new(),
            merged_into: None,
        }
    }

    pub fn add_member(&mut self, node_id: usize) {
        if !self.members.contains(&node_id) {
            self.members.push(node_id);
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merged_into.is_some()
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

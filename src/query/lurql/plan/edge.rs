//! 计划边
//!
//! - `Follow`：沿模型关联从源顶点遍历到目标顶点
//! - `Exists`：把 EXISTS 子路径的根挂到被过滤的顶点上

use std::collections::BTreeSet;

use serde::Serialize;

use super::graph::Subgraph;
use super::vertex::VertexId;
use crate::query::lurql::model::{AssocId, ClassId};

pub type EdgeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowEdge {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    pub assoc: AssocId,
    /// 起点所在的关联端下标，0 为正向遍历，1 为反向遍历
    pub origin_end: usize,
    /// 关联端类型是所要求类的父类时，执行期需按此类型过滤
    pub destination_type_filter: Option<ClassId>,
}

impl FollowEdge {
    pub fn destination_end(&self) -> usize {
        1 - self.origin_end
    }

    pub fn is_forward(&self) -> bool {
        self.origin_end == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistsEdge {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    /// EXISTS 子路径可达的顶点与边
    pub subgraph: Subgraph,
    /// `None` 表示 `select *`
    pub projection: Option<BTreeSet<String>>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanEdge {
    Follow(FollowEdge),
    Exists(ExistsEdge),
}

impl PlanEdge {
    pub fn id(&self) -> EdgeId {
        match self {
            PlanEdge::Follow(edge) => edge.id,
            PlanEdge::Exists(edge) => edge.id,
        }
    }

    pub fn source(&self) -> VertexId {
        match self {
            PlanEdge::Follow(edge) => edge.source,
            PlanEdge::Exists(edge) => edge.source,
        }
    }

    pub fn target(&self) -> VertexId {
        match self {
            PlanEdge::Follow(edge) => edge.target,
            PlanEdge::Exists(edge) => edge.target,
        }
    }

    pub fn as_follow(&self) -> Option<&FollowEdge> {
        match self {
            PlanEdge::Follow(edge) => Some(edge),
            PlanEdge::Exists(_) => None,
        }
    }

    pub fn as_exists(&self) -> Option<&ExistsEdge> {
        match self {
            PlanEdge::Exists(edge) => Some(edge),
            PlanEdge::Follow(_) => None,
        }
    }

    pub(crate) fn set_id(&mut self, id: EdgeId) {
        match self {
            PlanEdge::Follow(edge) => edge.id = id,
            PlanEdge::Exists(edge) => edge.id = id,
        }
    }
}

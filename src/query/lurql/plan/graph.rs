//! 计划图
//!
//! 顶点和边存放在以下标寻址的槽位中，删除后留下空槽，已分配的 ID 不会复用。

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use super::edge::{EdgeId, PlanEdge};
use super::vertex::{PlanVertex, VertexId};

/// 计划图的一个子集，两端都按 ID 有序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Subgraph {
    pub vertices: BTreeSet<VertexId>,
    pub edges: BTreeSet<EdgeId>,
}

impl Subgraph {
    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanGraph {
    vertices: Vec<Option<PlanVertex>>,
    edges: Vec<Option<PlanEdge>>,
}

impl PlanGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_vertex_id(&self) -> VertexId {
        self.vertices.len()
    }

    pub fn add_vertex(&mut self, mut vertex: PlanVertex) -> VertexId {
        let id = self.vertices.len();
        vertex.id = id;
        self.vertices.push(Some(vertex));
        id
    }

    /// 删除顶点及其所有关联边
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<PlanVertex> {
        let removed = self.vertices.get_mut(id)?.take()?;
        for slot in self.edges.iter_mut() {
            if matches!(slot, Some(edge) if edge.source() == id || edge.target() == id) {
                *slot = None;
            }
        }
        Some(removed)
    }

    pub fn add_edge(&mut self, mut edge: PlanEdge) -> EdgeId {
        let id = self.edges.len();
        edge.set_id(id);
        self.edges.push(Some(edge));
        id
    }

    pub fn vertex(&self, id: VertexId) -> Option<&PlanVertex> {
        self.vertices.get(id).and_then(Option::as_ref)
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut PlanVertex> {
        self.vertices.get_mut(id).and_then(Option::as_mut)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&PlanEdge> {
        self.edges.get(id).and_then(Option::as_ref)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &PlanVertex> {
        self.vertices.iter().flatten()
    }

    pub fn edges(&self) -> impl Iterator<Item = &PlanEdge> {
        self.edges.iter().flatten()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    pub fn outgoing(&self, id: VertexId) -> impl Iterator<Item = &PlanEdge> {
        self.edges().filter(move |edge| edge.source() == id)
    }

    pub fn incoming(&self, id: VertexId) -> impl Iterator<Item = &PlanEdge> {
        self.edges().filter(move |edge| edge.target() == id)
    }

    /// 从 `start` 出发沿所有出边可达的子图（含 `start` 本身）
    pub fn reachable_subgraph(&self, start: VertexId) -> Subgraph {
        let mut subgraph = Subgraph::default();
        if self.vertex(start).is_none() {
            return subgraph;
        }
        let mut queue = VecDeque::from([start]);
        subgraph.vertices.insert(start);
        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing(current) {
                subgraph.edges.insert(edge.id());
                if subgraph.vertices.insert(edge.target()) {
                    queue.push_back(edge.target());
                }
            }
        }
        subgraph
    }

    /// 从 `start` 出发只沿 FOLLOW 边、且只走到 ID 不小于 `first` 的顶点所得的子图
    ///
    /// `first` 之前分配的顶点（兄弟分支等）和 EXISTS 子图都不会被纳入。
    pub fn follow_subgraph_since(&self, start: VertexId, first: VertexId) -> Subgraph {
        let mut subgraph = Subgraph::default();
        if self.vertex(start).is_none() {
            return subgraph;
        }
        let mut queue = VecDeque::from([start]);
        subgraph.vertices.insert(start);
        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing(current) {
                if edge.as_follow().is_none() || edge.target() < first {
                    continue;
                }
                subgraph.edges.insert(edge.id());
                if subgraph.vertices.insert(edge.target()) {
                    queue.push_back(edge.target());
                }
            }
        }
        subgraph
    }

    /// 拓扑排序，入度相同时按 ID 升序；有环时返回 `None`
    pub fn topological_order(&self) -> Option<Vec<VertexId>> {
        let mut in_degree: BTreeMap<VertexId, usize> =
            self.vertices().map(|vertex| (vertex.id, 0)).collect();
        for edge in self.edges() {
            if let Some(degree) = in_degree.get_mut(&edge.target()) {
                *degree += 1;
            }
        }

        let mut ready: BTreeSet<VertexId> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());

        while let Some(id) = ready.pop_first() {
            order.push(id);
            for edge in self.outgoing(id) {
                if let Some(degree) = in_degree.get_mut(&edge.target()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(edge.target());
                    }
                }
            }
        }

        (order.len() == in_degree.len()).then_some(order)
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_some()
    }
}

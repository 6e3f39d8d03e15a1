//! LURQL 计划图
//!
//! 顶点表示路径上的对象集合，边表示关联遍历或 EXISTS 依附。

pub mod edge;
pub mod graph;
pub mod vertex;

pub use edge::{EdgeId, ExistsEdge, FollowEdge, PlanEdge};
pub use graph::{PlanGraph, Subgraph};
pub use vertex::{narrow_class_set, PlanVertex, VertexId};

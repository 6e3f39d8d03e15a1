//! LURQL 路径查询规划
//!
//! 把已解析的路径查询编译为计划图：
//!
//! - `ast`：语法树和链式构建方法
//! - `model`：类与关联的模型视图，以及内存实现 `ModelGraph`
//! - `plan`：计划顶点、边和图
//! - `compiler`：`LurqlPlan::compile`
//!
//! ```ignore
//! let model: Arc<dyn ModelView> = Arc::new(ModelGraph::from_definition(&definition)?);
//! let query = LurqlQuery::select_all(
//!     RootClause::new("Schema").then(FollowClause::new().association("contains")),
//! );
//! let plan = LurqlPlan::compile(model, &query)?;
//! for line in plan.explain() {
//!     println!("{}", line);
//! }
//! ```

pub mod ast;
pub mod compiler;
pub mod model;
pub mod plan;

pub use ast::{
    AssociationFilters, ExistsClause, Filter, FollowClause, Gather, LurqlQuery, PathBranch,
    PathSpec, Predicate, RecurseClause, RootClause, SelectList, Value,
};
pub use compiler::{LurqlPlan, ParamType};
pub use model::{
    AssocDef, AssocEdge, AssocId, Aggregation, AssociationEnd, ClassDef, ClassId, ClassVertex,
    EndDef, ModelDefinition, ModelGraph, ModelGraphBuilder, ModelView, Multiplicity,
};
pub use plan::{
    EdgeId, ExistsEdge, FollowEdge, PlanEdge, PlanGraph, PlanVertex, Subgraph, VertexId,
};

//! LURQL 计划编译器
//!
//! 对语法树做一次递归下降，按分支类型生成计划顶点和边：
//!
//! - `Root`：解析类名，新建顶点并冻结，以该顶点为唯一父节点编译 THEN
//! - `Follow`：按方向、端点类、关联名、端名、组合性筛选模型关联，
//!   冻结后类集合为空的顶点被剪枝，其 THEN 不再编译
//! - `Recurse`：反复展开内部路径，直到叶子的类集合重复出现（模型不动点）
//! - `PathSpec`：并集、gather、gather with parent
//!
//! EXISTS 过滤在属性过滤之前编译，以一个匿名根挂到被过滤顶点上。
//! 所有错误在检测到时立即返回，不产生部分计划。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::ast::{
    AssociationFilters, ExistsClause, Filter, FollowClause, LurqlQuery, PathBranch, PathSpec,
    Predicate, RecurseClause, RootClause, SelectList, Value,
};
use super::model::{AssocId, ClassId, ModelView};
use super::plan::{ExistsEdge, FollowEdge, PlanEdge, PlanGraph, PlanVertex, Subgraph, VertexId};
use crate::core::error::{LurqlError, LurqlResult};

/// 动态参数的取值形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// 单个值：`= ?p`、`in (?p, ...)`、`matches ?p`
    Scalar,
    /// 值集合：`in ?p`
    Set,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamType::Scalar => write!(f, "scalar"),
            ParamType::Set => write!(f, "set"),
        }
    }
}

/// 编译后的 LURQL 计划
#[derive(Debug, Clone)]
pub struct LurqlPlan {
    model: Arc<dyn ModelView>,
    graph: PlanGraph,
    params: BTreeMap<String, ParamType>,
    /// `None` 表示 `select *`
    projection: Option<BTreeSet<String>>,
    aliases: BTreeMap<String, Vec<VertexId>>,
    pruned: usize,
}

impl LurqlPlan {
    pub fn compile(model: Arc<dyn ModelView>, query: &LurqlQuery) -> LurqlResult<Self> {
        let mut builder = PlanBuilder::new(Arc::clone(&model));
        let mut leaves = Vec::new();
        builder.prepare_branch(&query.root, &[], &mut leaves)?;

        let projection = match &query.select {
            SelectList::All => None,
            SelectList::Aliases(aliases) => {
                let unknown = builder.undefined_aliases(aliases);
                if !unknown.is_empty() {
                    return Err(LurqlError::unknown_alias("select", unknown));
                }
                Some(aliases.iter().cloned().collect())
            }
        };

        let PlanBuilder {
            graph,
            params,
            alias_vertices,
            pruned,
            ..
        } = builder;

        log::debug!(
            "LURQL 计划编译完成: {} 个顶点, {} 条边, 剪枝 {} 个",
            graph.vertex_count(),
            graph.edge_count(),
            pruned
        );

        Ok(Self {
            model,
            graph,
            params,
            projection,
            aliases: alias_vertices,
            pruned,
        })
    }

    pub fn model(&self) -> &dyn ModelView {
        self.model.as_ref()
    }

    pub fn graph(&self) -> &PlanGraph {
        &self.graph
    }

    pub fn param_map(&self) -> &BTreeMap<String, ParamType> {
        &self.params
    }

    pub fn is_select_all(&self) -> bool {
        self.projection.is_none()
    }

    /// `select *` 时 EXISTS 内部的顶点不被选中
    pub fn is_selected(&self, id: VertexId) -> bool {
        let Some(vertex) = self.graph.vertex(id) else {
            return false;
        };
        match &self.projection {
            None => !vertex.in_exists(),
            Some(projection) => vertex
                .alias
                .as_ref()
                .is_some_and(|alias| projection.contains(alias)),
        }
    }

    /// 别名对应的所有存活顶点；递归展开时同一别名会有多个顶点
    pub fn vertex_by_alias(&self, alias: &str) -> &[VertexId] {
        self.aliases.get(alias).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pruned_count(&self) -> usize {
        self.pruned
    }

    /// 按文本排序的计划描述，每个顶点和边一行
    pub fn explain(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .graph
            .vertices()
            .map(|vertex| self.explain_vertex(vertex))
            .chain(self.graph.edges().map(|edge| self.explain_edge(edge)))
            .collect();
        lines.sort();
        lines
    }

    pub fn explain_json(&self) -> serde_json::Result<String> {
        let vertices: Vec<ExplainVertex> = self
            .graph
            .vertices()
            .map(|vertex| ExplainVertex {
                name: vertex.name.clone(),
                alias: vertex.alias.clone(),
                classes: self.class_names(vertex.class_set()),
                filters: vertex.filters().iter().map(Filter::to_string).collect(),
                recursive: vertex.is_recursive(),
                recursion_root: vertex.recursion_root().map(|id| self.vertex_name(id)),
                recursion_subgraph: vertex
                    .recursion_subgraph()
                    .map(|subgraph| self.vertex_names(subgraph)),
                in_exists: vertex.in_exists(),
                selected: self.is_selected(vertex.id),
            })
            .collect();

        let edges: Vec<ExplainEdge> = self
            .graph
            .edges()
            .map(|edge| match edge {
                PlanEdge::Follow(follow) => ExplainEdge::Follow {
                    source: self.vertex_name(follow.source),
                    target: self.vertex_name(follow.target),
                    association: self.assoc_label(follow),
                    destination_type_filter: follow
                        .destination_type_filter
                        .map(|class| self.model.class_name(class)),
                },
                PlanEdge::Exists(exists) => ExplainEdge::Exists {
                    source: self.vertex_name(exists.source),
                    target: self.vertex_name(exists.target),
                    negated: exists.negated,
                    projection: exists.projection.clone(),
                    subgraph: self.vertex_names(&exists.subgraph),
                },
            })
            .collect();

        serde_json::to_string_pretty(&ExplainDocument {
            select_all: self.is_select_all(),
            params: &self.params,
            vertices,
            edges,
        })
    }

    fn explain_vertex(&self, vertex: &PlanVertex) -> String {
        let mut line = format!(
            "vertex {}: classes=[{}]",
            vertex.name,
            self.class_names(vertex.class_set()).join(", ")
        );
        if !vertex.filters().is_empty() {
            let filters: Vec<String> = vertex.filters().iter().map(Filter::to_string).collect();
            line.push_str(&format!(" where {}", filters.join(" and ")));
        }
        if vertex.is_recursive() {
            line.push_str(" recursive");
        }
        if let Some(root) = vertex.recursion_root() {
            line.push_str(&format!(" recursion_root={}", self.vertex_name(root)));
        }
        if let Some(subgraph) = vertex.recursion_subgraph() {
            line.push_str(&format!(
                " recursion_subgraph=[{}]",
                self.vertex_names(subgraph).join(", ")
            ));
        }
        if vertex.in_exists() {
            line.push_str(" in_exists");
        }
        line
    }

    fn explain_edge(&self, edge: &PlanEdge) -> String {
        match edge {
            PlanEdge::Follow(follow) => {
                let mut line = format!(
                    "follow {} -> {}: {}",
                    self.vertex_name(follow.source),
                    self.vertex_name(follow.target),
                    self.assoc_label(follow)
                );
                if let Some(class) = follow.destination_type_filter {
                    line.push_str(&format!(" type_filter={}", self.model.class_name(class)));
                }
                line
            }
            PlanEdge::Exists(exists) => {
                let select = match &exists.projection {
                    None => "*".to_string(),
                    Some(projection) => projection.iter().cloned().collect::<Vec<_>>().join(", "),
                };
                format!(
                    "exists {} -> {}: {}select {} subgraph=[{}]",
                    self.vertex_name(exists.source),
                    self.vertex_name(exists.target),
                    if exists.negated { "not " } else { "" },
                    select,
                    self.vertex_names(&exists.subgraph).join(", ")
                )
            }
        }
    }

    fn assoc_label(&self, follow: &FollowEdge) -> String {
        match self.model.assoc_edge(follow.assoc) {
            Some(assoc) => format!(
                "{}({} -> {})",
                assoc.name,
                assoc.end(follow.origin_end).name,
                assoc.end(follow.destination_end()).name
            ),
            None => format!("assoc#{}", follow.assoc),
        }
    }

    fn vertex_name(&self, id: VertexId) -> String {
        self.graph
            .vertex(id)
            .map(|vertex| vertex.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    }

    fn vertex_names(&self, subgraph: &Subgraph) -> Vec<String> {
        let mut names: Vec<String> = subgraph
            .vertices
            .iter()
            .map(|&id| self.vertex_name(id))
            .collect();
        names.sort();
        names
    }

    fn class_names(&self, classes: &BTreeSet<ClassId>) -> Vec<String> {
        let mut names: Vec<String> = classes.iter().map(|&c| self.model.class_name(c)).collect();
        names.sort();
        names
    }
}

#[derive(Serialize)]
struct ExplainDocument<'a> {
    select_all: bool,
    params: &'a BTreeMap<String, ParamType>,
    vertices: Vec<ExplainVertex>,
    edges: Vec<ExplainEdge>,
}

#[derive(Serialize)]
struct ExplainVertex {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    classes: Vec<String>,
    filters: Vec<String>,
    recursive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    recursion_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recursion_subgraph: Option<Vec<String>>,
    in_exists: bool,
    selected: bool,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ExplainEdge {
    Follow {
        source: String,
        target: String,
        association: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        destination_type_filter: Option<String>,
    },
    Exists {
        source: String,
        target: String,
        negated: bool,
        projection: Option<BTreeSet<String>>,
        subgraph: Vec<String>,
    },
}

/// 语法树分支的身份
///
/// 整个 `compile` 期间查询树只被不可变借用，节点既不移动也不释放，
/// 所以每个子句的地址在编译内稳定且互不相同；同一子句在递归中被重复展开时得到同一个键。
fn branch_key<T>(branch: &T) -> usize {
    branch as *const T as usize
}

/// 单次编译的可变状态
struct PlanBuilder {
    model: Arc<dyn ModelView>,
    graph: PlanGraph,
    params: BTreeMap<String, ParamType>,
    /// 别名 -> 定义它的子句
    alias_branches: HashMap<String, usize>,
    alias_vertices: BTreeMap<String, Vec<VertexId>>,
    id_gen: usize,
    exists_depth: usize,
    pruned: usize,
}

impl PlanBuilder {
    fn new(model: Arc<dyn ModelView>) -> Self {
        Self {
            model,
            graph: PlanGraph::new(),
            params: BTreeMap::new(),
            alias_branches: HashMap::new(),
            alias_vertices: BTreeMap::new(),
            id_gen: 0,
            exists_depth: 0,
            pruned: 0,
        }
    }

    fn prepare_branch(
        &mut self,
        branch: &PathBranch,
        parents: &[VertexId],
        leaves: &mut Vec<VertexId>,
    ) -> LurqlResult<()> {
        match branch {
            PathBranch::Root(root) => {
                if !parents.is_empty() {
                    return Err(LurqlError::invalid_structure("root", "root 子句不能有父节点"));
                }
                self.prepare_root(root, leaves)
            }
            PathBranch::Follow(follow) => {
                if parents.is_empty() {
                    return Err(LurqlError::invalid_structure(
                        "follow",
                        "follow 至少需要一个父节点",
                    ));
                }
                self.prepare_follow(follow, parents, leaves)
            }
            PathBranch::Recurse(recurse) => {
                if parents.len() != 1 {
                    return Err(LurqlError::invalid_structure(
                        "recursively",
                        format!("recursively 需要恰好一个父节点, 实际为 {}", parents.len()),
                    ));
                }
                self.prepare_recurse(recurse, parents[0], leaves)
            }
            PathBranch::PathSpec(spec) => self.prepare_path_spec(parents, Some(spec), leaves),
        }
    }

    fn prepare_path_spec(
        &mut self,
        parents: &[VertexId],
        spec: Option<&PathSpec>,
        leaves: &mut Vec<VertexId>,
    ) -> LurqlResult<()> {
        let Some(spec) = spec else {
            leaves.extend_from_slice(parents);
            return Ok(());
        };

        let Some(gather) = &spec.gather else {
            for branch in &spec.branches {
                self.prepare_branch(branch, parents, leaves)?;
            }
            return Ok(());
        };

        let mut merged = Vec::new();
        for branch in &spec.branches {
            self.prepare_branch(branch, parents, &mut merged)?;
        }
        if gather.with_parent {
            if parents.is_empty() {
                return Err(LurqlError::invalid_structure(
                    "gather",
                    "gather with parent 至少需要一个父节点",
                ));
            }
            merged.extend_from_slice(parents);
        }
        self.prepare_path_spec(&merged, gather.then.as_deref(), leaves)
    }

    fn prepare_root(&mut self, root: &RootClause, leaves: &mut Vec<VertexId>) -> LurqlResult<()> {
        let class = self.find_class(&root.class_name)?;
        let vertex = self.new_vertex(root.alias.as_deref(), Some(branch_key(root)))?;
        if let Some(v) = self.graph.vertex_mut(vertex) {
            v.add_class(class);
        }
        self.add_filters(vertex, &root.filters)?;
        self.freeze(vertex);
        self.prepare_path_spec(&[vertex], root.then.as_ref(), leaves)
    }

    fn prepare_follow(
        &mut self,
        follow: &FollowClause,
        parents: &[VertexId],
        leaves: &mut Vec<VertexId>,
    ) -> LurqlResult<()> {
        let vertex = self.new_vertex(follow.alias.as_deref(), Some(branch_key(follow)))?;
        for &parent in parents {
            self.prepare_follow_edges(parent, vertex, &follow.association_filters)?;
        }
        self.add_filters(vertex, &follow.filters)?;
        self.freeze(vertex);

        let empty = self
            .graph
            .vertex(vertex)
            .is_some_and(|v| v.class_set().is_empty());
        if empty {
            self.prune(vertex);
            return Ok(());
        }
        self.prepare_path_spec(&[vertex], follow.then.as_ref(), leaves)
    }

    fn prepare_follow_edges(
        &mut self,
        source: VertexId,
        target: VertexId,
        filters: &AssociationFilters,
    ) -> LurqlResult<()> {
        let model = Arc::clone(&self.model);
        let (forward, backward) = filters.directions();

        let mut outgoing_filter: Option<BTreeSet<AssocId>> = None;
        let mut incoming_filter: Option<BTreeSet<AssocId>> = None;
        if let Some(name) = &filters.origin_class {
            let origin = self.find_class(name)?;
            outgoing_filter = Some(model.all_outgoing_assoc_edges(origin));
            incoming_filter = Some(model.all_incoming_assoc_edges(origin));
        }

        let mut destination_class = None;
        if let Some(name) = &filters.destination_class {
            let destination = self.find_class(name)?;
            // 从终点看方向相反
            let outgoing = model.all_incoming_assoc_edges(destination);
            let incoming = model.all_outgoing_assoc_edges(destination);
            outgoing_filter = Some(match outgoing_filter {
                Some(existing) => existing.intersection(&outgoing).copied().collect(),
                None => outgoing,
            });
            incoming_filter = Some(match incoming_filter {
                Some(existing) => existing.intersection(&incoming).copied().collect(),
                None => incoming,
            });
            destination_class = Some(destination);
        }

        let source_classes: BTreeSet<ClassId> = match self.graph.vertex(source) {
            Some(vertex) => vertex
                .class_set()
                .iter()
                .flat_map(|&class| {
                    std::iter::once(class).chain(model.all_subclass_vertices(class))
                })
                .collect(),
            None => BTreeSet::new(),
        };

        let passes = |filter: &Option<BTreeSet<AssocId>>, assoc: &AssocId| {
            filter.as_ref().map_or(true, |set| set.contains(assoc))
        };

        let mut candidates = BTreeSet::new();
        for &class in &source_classes {
            if forward {
                for assoc in model.all_outgoing_assoc_edges(class) {
                    if passes(&outgoing_filter, &assoc) {
                        candidates.insert((assoc, 0));
                    }
                }
            }
            if backward {
                for assoc in model.all_incoming_assoc_edges(class) {
                    if passes(&incoming_filter, &assoc) {
                        candidates.insert((assoc, 1));
                    }
                }
            }
        }

        for (assoc, origin_end) in candidates {
            self.add_traversal(source, target, filters, assoc, origin_end, destination_class);
        }
        Ok(())
    }

    fn add_traversal(
        &mut self,
        source: VertexId,
        target: VertexId,
        filters: &AssociationFilters,
        assoc: AssocId,
        origin_end: usize,
        destination_class: Option<ClassId>,
    ) {
        let model = Arc::clone(&self.model);
        let Some(edge) = model.assoc_edge(assoc) else {
            return;
        };
        if filters.association.as_ref().is_some_and(|name| *name != edge.name) {
            return;
        }

        let (composite, noncomposite) = filters.aggregations();
        if (edge.is_composite() && !composite) || (!edge.is_composite() && !noncomposite) {
            return;
        }

        let origin = edge.end(origin_end);
        let destination = edge.end(1 - origin_end);
        if filters.origin_end.as_ref().is_some_and(|name| *name != origin.name) {
            return;
        }
        if filters
            .destination_end
            .as_ref()
            .is_some_and(|name| *name != destination.name)
        {
            return;
        }

        let mut end_class = destination.class;
        let mut type_filter = None;
        if let Some(requested) = destination_class {
            if requested != end_class && model.all_superclass_vertices(requested).contains(&end_class) {
                // 关联端是所要求类的父类，执行期需按类型过滤
                type_filter = Some(requested);
                end_class = requested;
            }
        }

        self.graph.add_edge(PlanEdge::Follow(FollowEdge {
            id: 0,
            source,
            target,
            assoc,
            origin_end,
            destination_type_filter: type_filter,
        }));
        if let Some(vertex) = self.graph.vertex_mut(target) {
            vertex.add_class(end_class);
        }
    }

    fn prepare_recurse(
        &mut self,
        recurse: &RecurseClause,
        parent: VertexId,
        leaves: &mut Vec<VertexId>,
    ) -> LurqlResult<()> {
        // 类集合 -> 首次产生该集合的顶点
        let mut fixpoints: HashMap<BTreeSet<ClassId>, VertexId> = HashMap::new();
        if let Some(vertex) = self.graph.vertex(parent) {
            fixpoints.insert(vertex.class_set().clone(), parent);
        }

        // 本次递归展开产生的顶点从这里开始编号
        let first_expanded = self.graph.next_vertex_id();
        let mut current = vec![parent];
        loop {
            let mut expansion = Vec::new();
            self.prepare_path_spec(&current, Some(&recurse.path_spec), &mut expansion)?;
            if expansion.len() > 1 {
                return Err(LurqlError::invalid_structure(
                    "recursively",
                    "recursion does not support trees",
                ));
            }
            let Some(&leaf) = expansion.first() else {
                log::debug!("递归展开没有产生叶子, 停止展开");
                break;
            };

            let class_set = match self.graph.vertex(leaf) {
                Some(vertex) => vertex.class_set().clone(),
                None => break,
            };
            if let Some(&root) = fixpoints.get(&class_set) {
                self.close_recursion(leaf, root, first_expanded);
                break;
            }
            fixpoints.insert(class_set, leaf);
            current = expansion;
        }

        self.prepare_path_spec(&current, recurse.then.as_ref(), leaves)
    }

    /// 到达模型不动点：叶子弱引用回根，根上记录递归子图
    ///
    /// 子图只含根和本次递归展开出的 FOLLOW 顶点。
    fn close_recursion(&mut self, leaf: VertexId, root: VertexId, first_expanded: VertexId) {
        let subgraph = self.graph.follow_subgraph_since(root, first_expanded);
        for &id in &subgraph.vertices {
            if let Some(vertex) = self.graph.vertex_mut(id) {
                vertex.mark_recursive();
            }
        }
        log::debug!(
            "递归到达不动点: 叶子 #{} -> 根 #{}, 子图 {} 个顶点",
            leaf,
            root,
            subgraph.vertices.len()
        );
        if let Some(vertex) = self.graph.vertex_mut(leaf) {
            vertex.set_recursion_root(root);
        }
        if let Some(vertex) = self.graph.vertex_mut(root) {
            vertex.set_recursion_subgraph(subgraph);
        }
    }

    /// EXISTS 先编译，其余属性过滤登记参数后挂到顶点上
    fn add_filters(&mut self, vertex: VertexId, filters: &[Filter]) -> LurqlResult<()> {
        for filter in filters {
            if let Filter::Exists { exists, negated } = filter {
                self.exists_depth += 1;
                let result = self.prepare_exists(vertex, exists, *negated);
                self.exists_depth -= 1;
                result?;
            }
        }

        let mut kept = Vec::new();
        for filter in filters {
            let Filter::Attribute { predicate, .. } = filter else {
                continue;
            };
            match predicate {
                Predicate::InSet(name) => self.add_param(name, ParamType::Set)?,
                Predicate::In(values) => {
                    for value in values {
                        if let Value::Param(name) = value {
                            self.add_param(name, ParamType::Scalar)?;
                        }
                    }
                }
                Predicate::Matches(Value::Param(name)) => {
                    self.add_param(name, ParamType::Scalar)?
                }
                Predicate::Matches(Value::Literal(_)) | Predicate::IsNull => {}
            }
            kept.push(filter.clone());
        }

        if let Some(v) = self.graph.vertex_mut(vertex) {
            v.add_filters(kept);
        }
        Ok(())
    }

    fn prepare_exists(
        &mut self,
        vertex: VertexId,
        exists: &ExistsClause,
        negated: bool,
    ) -> LurqlResult<()> {
        let projection = match &exists.select {
            SelectList::All => None,
            SelectList::Aliases(aliases) => {
                let outside: Vec<String> = aliases
                    .iter()
                    .filter(|alias| self.alias_branches.contains_key(alias.as_str()))
                    .cloned()
                    .collect();
                if !outside.is_empty() {
                    return Err(LurqlError::unknown_alias("exists", outside));
                }
                Some(aliases.iter().cloned().collect::<BTreeSet<String>>())
            }
        };

        let classes = self
            .graph
            .vertex(vertex)
            .map(|v| v.class_set().clone())
            .unwrap_or_default();
        let root = self.new_vertex(None, None)?;
        if let Some(v) = self.graph.vertex_mut(root) {
            for class in classes {
                v.add_class(class);
            }
        }
        self.freeze(root);

        let mut ignored = Vec::new();
        self.prepare_path_spec(&[root], Some(&exists.path_spec), &mut ignored)?;

        if let SelectList::Aliases(aliases) = &exists.select {
            let unknown = self.undefined_aliases(aliases);
            if !unknown.is_empty() {
                return Err(LurqlError::unknown_alias("exists", unknown));
            }
        }

        let subgraph = self.graph.reachable_subgraph(root);
        self.graph.add_edge(PlanEdge::Exists(ExistsEdge {
            id: 0,
            source: vertex,
            target: root,
            subgraph,
            projection,
            negated,
        }));
        Ok(())
    }

    fn add_param(&mut self, name: &str, requested: ParamType) -> LurqlResult<()> {
        match self.params.get(name) {
            Some(&existing) if existing != requested => Err(LurqlError::ConflictingParameterType {
                name: name.to_string(),
                existing: existing.to_string(),
                requested: requested.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.params.insert(name.to_string(), requested);
                Ok(())
            }
        }
    }

    /// `branch` 为 `None` 的顶点不来自任何子句（EXISTS 的根），别名被忽略
    fn new_vertex(&mut self, alias: Option<&str>, branch: Option<usize>) -> LurqlResult<VertexId> {
        self.id_gen += 1;
        let alias = branch.and(alias);
        let name = match alias.zip(branch) {
            Some((alias, branch)) => {
                if let Some(&existing) = self.alias_branches.get(alias) {
                    if existing != branch {
                        return Err(LurqlError::duplicate_alias(alias));
                    }
                }
                self.alias_branches.insert(alias.to_string(), branch);
                format!("{}_{}", alias, self.id_gen)
            }
            None => format!("anon_{}", self.id_gen),
        };

        let vertex = PlanVertex::new(0, name, alias.map(str::to_string), self.exists_depth > 0);
        let id = self.graph.add_vertex(vertex);
        if let Some(alias) = alias {
            self.alias_vertices.entry(alias.to_string()).or_default().push(id);
        }
        Ok(id)
    }

    fn freeze(&mut self, vertex: VertexId) {
        let model = Arc::clone(&self.model);
        if let Some(v) = self.graph.vertex_mut(vertex) {
            v.freeze(model.as_ref());
        }
    }

    /// 剪掉类集合为空的顶点，连同挂在它上面的 EXISTS 子图
    fn prune(&mut self, vertex: VertexId) {
        let attached: Vec<VertexId> = self
            .graph
            .outgoing(vertex)
            .filter_map(PlanEdge::as_exists)
            .flat_map(|edge| edge.subgraph.vertices.iter().copied())
            .collect();

        if let Some(removed) = self.graph.remove_vertex(vertex) {
            log::debug!("剪枝空类集合顶点 {}", removed.name);
        }
        for id in attached {
            self.graph.remove_vertex(id);
        }
        for ids in self.alias_vertices.values_mut() {
            ids.retain(|&id| self.graph.vertex(id).is_some());
        }
        self.pruned += 1;
    }

    fn find_class(&self, name: &str) -> LurqlResult<ClassId> {
        self.model
            .find_class_vertex(name)
            .ok_or_else(|| LurqlError::unknown_class(name))
    }

    fn undefined_aliases(&self, aliases: &[String]) -> Vec<String> {
        aliases
            .iter()
            .filter(|alias| !self.alias_branches.contains_key(alias.as_str()))
            .cloned()
            .collect()
    }
}

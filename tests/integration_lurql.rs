//! LURQL 计划编译集成测试
//!
//! 测试范围:
//! - lurql::compiler - 根、跟随、递归、收集、EXISTS、别名作用域、参数
//! - lurql::plan - 冻结后的类集合、剪枝、无环性
//! - lurql::model - 模型定义的序列化

mod common;

use common::assertions::{assert_acyclic, assert_err_with, vertex_with_classes};
use common::data_fixtures::{catalog_model, category_model, cycle_model};
use graphplan::core::error::LurqlError;
use graphplan::query::lurql::{
    ExistsClause, Filter, FollowClause, LurqlPlan, LurqlQuery, ModelGraph, ModelView, ParamType,
    PathSpec, PlanEdge, RecurseClause, RootClause, SelectList, Value,
};

fn compile(query: &LurqlQuery) -> LurqlPlan {
    LurqlPlan::compile(catalog_model(), query).expect("编译应成功")
}

fn follow_count(plan: &LurqlPlan) -> usize {
    plan.graph()
        .edges()
        .filter(|edge| edge.as_follow().is_some())
        .count()
}

// ==================== 路径编译 ====================

#[test]
fn test_follow_chain_builds_three_vertices() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema").then(
            FollowClause::new()
                .forward()
                .association("contains")
                .then(FollowClause::new().forward().association("contains")),
        ),
    );
    let plan = compile(&query);

    assert_eq!(plan.graph().vertex_count(), 3);
    assert_eq!(follow_count(&plan), 2);
    assert_eq!(plan.pruned_count(), 0);
    assert!(plan.graph().vertices().all(|v| !v.is_recursive()));
    assert!(vertex_with_classes(&plan, &["Schema"]).is_some());
    assert!(vertex_with_classes(&plan, &["Table"]).is_some());
    assert!(vertex_with_classes(&plan, &["Column"]).is_some());
    assert_acyclic(&plan);
}

#[test]
fn test_recursion_closes_on_first_expansion() {
    let query = LurqlQuery::select_all(
        RootClause::new("Category")
            .alias("c")
            .then(RecurseClause::new(FollowClause::new().association("parentOf"))),
    );
    let plan = LurqlPlan::compile(category_model(), &query).expect("编译应成功");
    let graph = plan.graph();

    let root_id = plan.vertex_by_alias("c")[0];
    let root = graph.vertex(root_id).expect("根顶点");
    let subgraph = root.recursion_subgraph().expect("根上应有递归子图");
    assert_eq!(subgraph.vertices.len(), 2, "递归子图只含根和一个跟随顶点");

    let leaf = graph
        .vertices()
        .find(|v| v.id != root_id)
        .expect("叶子顶点");
    assert_eq!(leaf.recursion_root(), Some(root_id));
    assert!(subgraph.contains_vertex(leaf.id));
    assert_acyclic(&plan);
}

#[test]
fn test_recursion_stops_when_expansion_dies_out() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema").then(RecurseClause::new(
            FollowClause::new()
                .forward()
                .association("contains")
                .alias("part"),
        )),
    );
    let plan = compile(&query);

    assert_eq!(plan.graph().vertex_count(), 3, "Schema, Table, Column");
    assert_eq!(plan.pruned_count(), 1, "Column 之后的展开被剪枝");
    assert_eq!(plan.vertex_by_alias("part").len(), 2, "同一分支重复展开不算重复别名");
    assert!(plan.graph().vertices().all(|v| v.recursion_root().is_none()));
}

#[test]
fn test_recursion_fixpoint_at_later_leaf() {
    let query = LurqlQuery::select_all(
        RootClause::new("Start").alias("s").then(
            RecurseClause::new(FollowClause::new().forward().association("next").alias("r"))
                .then(FollowClause::new().forward().association("next").alias("after")),
        ),
    );
    let plan = LurqlPlan::compile(cycle_model(), &query).expect("编译应成功");
    let graph = plan.graph();

    let start = plan.vertex_by_alias("s")[0];
    let steps = plan.vertex_by_alias("r");
    assert_eq!(steps.len(), 3, "A, B, A");
    let (first_a, b, second_a) = (steps[0], steps[1], steps[2]);

    let leaf = graph.vertex(second_a).expect("第二个 A 顶点");
    assert_eq!(leaf.recursion_root(), Some(first_a), "应回指首次出现 A 的叶子而不是起点");

    let root = graph.vertex(first_a).expect("第一个 A 顶点");
    let subgraph = root.recursion_subgraph().expect("递归根上应有子图");
    assert_eq!(subgraph.vertices.iter().copied().collect::<Vec<_>>(), vec![first_a, b, second_a]);
    assert_eq!(subgraph.edges.len(), 2);

    let start_vertex = graph.vertex(start).expect("起点顶点");
    assert!(!start_vertex.is_recursive(), "递归之前的起点不属于递归子图");
    assert!(start_vertex.recursion_subgraph().is_none());

    // THEN 从最后一轮的父列表 (B) 继续编译
    let after = plan.vertex_by_alias("after");
    assert_eq!(after.len(), 1);
    let sources: Vec<_> = graph.incoming(after[0]).map(|edge| edge.source()).collect();
    assert_eq!(sources, vec![b]);
    assert!(!graph.vertex(after[0]).is_some_and(|v| v.is_recursive()));
    assert_acyclic(&plan);
}

#[test]
fn test_then_after_recursion_starts_from_last_parents() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema").then(
            RecurseClause::new(
                FollowClause::new()
                    .forward()
                    .association("contains")
                    .alias("part"),
            )
            .then(
                FollowClause::new()
                    .backward()
                    .association("contains")
                    .alias("up"),
            ),
        ),
    );
    let plan = compile(&query);
    let graph = plan.graph();

    let parts = plan.vertex_by_alias("part");
    assert_eq!(parts.len(), 2, "Table, Column");
    let up = plan.vertex_by_alias("up");
    assert_eq!(up.len(), 1);

    let sources: Vec<_> = graph.incoming(up[0]).map(|edge| edge.source()).collect();
    assert_eq!(sources, vec![parts[1]], "THEN 应挂在最后一个存活的展开顶点上");
    assert_eq!(vertex_with_classes(&plan, &["Column"]).map(|v| v.id), Some(parts[1]));
    let up_classes: Vec<String> = graph
        .vertex(up[0])
        .map(|v| v.class_set().iter().map(|&c| plan.model().class_name(c)).collect())
        .unwrap_or_default();
    assert_eq!(up_classes, vec!["Table".to_string()]);
    assert_acyclic(&plan);
}

#[test]
fn test_recursion_subgraph_excludes_sibling_branch() {
    let query = LurqlQuery::select_all(
        RootClause::new("Category").alias("c").then(
            PathSpec::single(FollowClause::new().association("parentOf").alias("sib")).union(
                RecurseClause::new(FollowClause::new().association("parentOf").alias("r")),
            ),
        ),
    );
    let plan = LurqlPlan::compile(category_model(), &query).expect("编译应成功");
    let graph = plan.graph();

    let root_id = plan.vertex_by_alias("c")[0];
    let sib = plan.vertex_by_alias("sib")[0];
    let r = plan.vertex_by_alias("r")[0];

    let subgraph = graph
        .vertex(root_id)
        .and_then(|v| v.recursion_subgraph())
        .expect("根上应有递归子图");
    assert_eq!(subgraph.vertices.len(), 2);
    assert!(subgraph.contains_vertex(root_id) && subgraph.contains_vertex(r));
    assert!(!subgraph.contains_vertex(sib), "兄弟分支不属于递归子图");
    assert!(subgraph
        .edges
        .iter()
        .all(|&id| graph.edge(id).is_some_and(|edge| edge.target() == r)));
    assert!(!graph.vertex(sib).is_some_and(|v| v.is_recursive()));
    assert!(graph.vertex(r).is_some_and(|v| v.is_recursive()));
}

#[test]
fn test_recursion_subgraph_excludes_exists_subgraph() {
    let query = LurqlQuery::select_all(
        RootClause::new("Category")
            .alias("c")
            .filter(Filter::exists(ExistsClause::new(
                SelectList::All,
                FollowClause::new().association("parentOf"),
            )))
            .then(RecurseClause::new(
                FollowClause::new().association("parentOf").alias("r"),
            )),
    );
    let plan = LurqlPlan::compile(category_model(), &query).expect("编译应成功");
    let graph = plan.graph();

    let root_id = plan.vertex_by_alias("c")[0];
    let r = plan.vertex_by_alias("r")[0];
    let subgraph = graph
        .vertex(root_id)
        .and_then(|v| v.recursion_subgraph())
        .expect("根上应有递归子图");
    assert_eq!(subgraph.vertices.iter().copied().collect::<Vec<_>>(), vec![root_id, r]);

    let exists_vertices: Vec<_> = graph.vertices().filter(|v| v.in_exists()).collect();
    assert_eq!(exists_vertices.len(), 2);
    for vertex in exists_vertices {
        assert!(!vertex.is_recursive(), "{} 不应被标记为递归", vertex.name);
        assert!(!subgraph.contains_vertex(vertex.id));
    }
    assert!(subgraph
        .edges
        .iter()
        .all(|&id| graph.edge(id).is_some_and(|edge| edge.as_follow().is_some())));
}

#[test]
fn test_recursion_rejects_trees() {
    let query = LurqlQuery::select_all(RootClause::new("Category").then(RecurseClause::new(
        PathSpec::single(FollowClause::new().association("parentOf"))
            .union(FollowClause::new().association("parentOf")),
    )));
    let err = LurqlPlan::compile(category_model(), &query).expect_err("递归展开为树时应报错");
    assert_eq!(
        err,
        LurqlError::invalid_structure("recursively", "recursion does not support trees")
    );
}

#[test]
fn test_unrelated_destination_is_pruned() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema").then(
            FollowClause::new()
                .destination_class("Tag")
                .alias("tag")
                .then(FollowClause::new().association("contains").alias("after")),
        ),
    );
    let plan = compile(&query);

    assert_eq!(follow_count(&plan), 0);
    assert_eq!(plan.pruned_count(), 1);
    assert_eq!(plan.graph().vertex_count(), 1, "只剩根顶点");
    assert!(plan.vertex_by_alias("tag").is_empty());
    assert!(plan.vertex_by_alias("after").is_empty(), "被剪枝顶点的 THEN 不应编译");
}

#[test]
fn test_destination_subclass_adds_type_filter() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema").then(
            FollowClause::new()
                .forward()
                .association("contains")
                .destination_class("View"),
        ),
    );
    let plan = compile(&query);

    let follow = plan
        .graph()
        .edges()
        .find_map(PlanEdge::as_follow)
        .expect("应有跟随边");
    assert_eq!(
        follow.destination_type_filter,
        plan.model().find_class_vertex("View")
    );
    assert!(vertex_with_classes(&plan, &["View"]).is_some());
    assert!(plan
        .explain()
        .iter()
        .any(|line| line.ends_with("contains(schema -> tables) type_filter=View")));
}

#[test]
fn test_association_end_names_filter_candidates() {
    let query = LurqlQuery::select_all(
        RootClause::new("Table").then(FollowClause::new().destination_end("indexes").alias("i")),
    );
    let plan = compile(&query);

    assert_eq!(follow_count(&plan), 1);
    let target = plan.vertex_by_alias("i")[0];
    let vertex = plan.graph().vertex(target).expect("目标顶点");
    assert_eq!(
        vertex.class_set().iter().map(|&c| plan.model().class_name(c)).collect::<Vec<_>>(),
        vec!["Index".to_string()]
    );
}

#[test]
fn test_noncomposite_excludes_containment() {
    let query = LurqlQuery::select_all(
        RootClause::new("Table").then(FollowClause::new().forward().noncomposite().alias("x")),
    );
    let plan = compile(&query);

    assert_eq!(follow_count(&plan), 1, "只有 indexedBy 是非组合关联");
    assert!(vertex_with_classes(&plan, &["Index"]).is_some());
}

#[test]
fn test_filter_attributes_narrow_class_set() {
    let query = LurqlQuery::select_all(
        RootClause::new("Element").filter(Filter::equals("rowCount", Value::literal("0"))),
    );
    let plan = compile(&query);

    let vertex = plan.graph().vertices().next().expect("根顶点");
    assert!(vertex.is_frozen());
    assert!(
        vertex_with_classes(&plan, &["Table"]).is_some(),
        "只保留声明了 rowCount 的最上层类"
    );
}

// ==================== 收集 ====================

#[test]
fn test_gather_merges_leaves() {
    let query = LurqlQuery::select_all(
        RootClause::new("Table").then(
            PathSpec::single(FollowClause::new().forward().association("contains"))
                .union(FollowClause::new().forward().association("indexedBy"))
                .gather_then(FollowClause::new().backward().alias("back")),
        ),
    );
    let plan = compile(&query);

    let back = plan.vertex_by_alias("back")[0];
    assert_eq!(plan.graph().incoming(back).count(), 2, "两个收集到的叶子都连到同一顶点");
    assert!(vertex_with_classes(&plan, &["Table"]).is_some());
    assert_acyclic(&plan);
}

#[test]
fn test_gather_with_parent_includes_parent() {
    let query = LurqlQuery::select_all(
        RootClause::new("Table").alias("t").then(
            PathSpec::single(FollowClause::new().forward().association("indexedBy"))
                .gather_with_parent_then(
                    FollowClause::new().forward().association("contains").alias("c"),
                ),
        ),
    );
    let plan = compile(&query);

    let t = plan.vertex_by_alias("t")[0];
    let c = plan.vertex_by_alias("c")[0];
    assert!(plan.graph().incoming(c).any(|edge| edge.source() == t));
}

#[test]
fn test_gather_with_parent_requires_parent() {
    let query = LurqlQuery::select_all(PathSpec::single(RootClause::new("Schema")).gather(true));
    let err = LurqlPlan::compile(catalog_model(), &query).expect_err("没有父节点时应报错");
    assert!(matches!(err, LurqlError::InvalidStructure { ref clause, .. } if clause == "gather"));
}

// ==================== EXISTS 与别名 ====================

#[test]
fn test_not_exists_edge() {
    let query = LurqlQuery::select_all(RootClause::new("Schema").filter(Filter::not_exists(
        ExistsClause::new(
            SelectList::aliases(["t"]),
            FollowClause::new().forward().association("contains").alias("t"),
        ),
    )));
    let plan = compile(&query);

    let exists = plan
        .graph()
        .edges()
        .find_map(PlanEdge::as_exists)
        .expect("应有 EXISTS 边");
    assert!(exists.negated);
    assert_eq!(exists.projection.as_ref().map(|p| p.len()), Some(1));
    assert!(plan
        .explain()
        .iter()
        .any(|line| line.starts_with("exists anon_1 -> anon_2: not select t")));
    for &id in &exists.subgraph.vertices {
        assert!(plan.graph().vertex(id).is_some_and(|v| v.in_exists()));
        assert!(!plan.is_selected(id));
    }
}

#[test]
fn test_exists_cannot_select_outer_alias() {
    let query = LurqlQuery::new(
        SelectList::aliases(["x"]),
        RootClause::new("Schema").alias("x").then(
            FollowClause::new()
                .forward()
                .association("contains")
                .alias("y")
                .filter(Filter::exists(ExistsClause::new(
                    SelectList::aliases(["x"]),
                    FollowClause::new().forward().association("contains"),
                ))),
        ),
    );
    let err = LurqlPlan::compile(catalog_model(), &query).expect_err("EXISTS 不能引用外部别名");
    assert_eq!(err, LurqlError::unknown_alias("exists", vec!["x".to_string()]));
}

#[test]
fn test_duplicate_alias() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema")
            .alias("x")
            .then(FollowClause::new().forward().association("contains").alias("x")),
    );
    let err = LurqlPlan::compile(catalog_model(), &query).expect_err("别名重复应报错");
    assert_eq!(err, LurqlError::duplicate_alias("x"));
}

#[test]
fn test_select_unknown_alias() {
    let query = LurqlQuery::new(
        SelectList::aliases(["s", "nope"]),
        RootClause::new("Schema").alias("s"),
    );
    assert_err_with(LurqlPlan::compile(catalog_model(), &query), "nope");
}

#[test]
fn test_select_list_marks_selected_vertices() {
    let query = LurqlQuery::new(
        SelectList::aliases(["t"]),
        RootClause::new("Schema")
            .alias("s")
            .then(FollowClause::new().forward().association("contains").alias("t")),
    );
    let plan = compile(&query);

    assert!(!plan.is_select_all());
    assert!(plan.is_selected(plan.vertex_by_alias("t")[0]));
    assert!(!plan.is_selected(plan.vertex_by_alias("s")[0]));
}

#[test]
fn test_parameter_shapes_must_agree() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema")
            .filter(Filter::in_set("name", "names"))
            .then(
                FollowClause::new()
                    .forward()
                    .association("contains")
                    .filter(Filter::in_values(
                        "name",
                        vec![Value::literal("a"), Value::param("names")],
                    )),
            ),
    );
    let err = LurqlPlan::compile(catalog_model(), &query).expect_err("参数形态冲突应报错");
    assert_eq!(
        err,
        LurqlError::ConflictingParameterType {
            name: "names".to_string(),
            existing: "set".to_string(),
            requested: "scalar".to_string(),
        }
    );

    let query = LurqlQuery::select_all(
        RootClause::new("Schema")
            .filter(Filter::equals("name", Value::param("n")))
            .filter(Filter::matches("owner", Value::param("n"))),
    );
    let plan = compile(&query);
    assert_eq!(plan.param_map().get("n"), Some(&ParamType::Scalar));
}

// ==================== 输出 ====================

#[test]
fn test_explain_is_deterministic() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema").then(
            FollowClause::new()
                .forward()
                .association("contains")
                .then(FollowClause::new().forward()),
        ),
    );
    let first = compile(&query).explain();
    let second = compile(&query).explain();
    assert_eq!(first, second);
    assert!(first.contains(&"vertex anon_1: classes=[Schema]".to_string()));
}

#[test]
fn test_explain_json_is_valid() {
    let query = LurqlQuery::select_all(
        RootClause::new("Schema").then(FollowClause::new().forward().association("contains")),
    );
    let json = compile(&query).explain_json().expect("序列化应成功");
    let doc: serde_json::Value = serde_json::from_str(&json).expect("应为合法 JSON");

    assert_eq!(doc["select_all"], serde_json::Value::Bool(true));
    assert_eq!(doc["vertices"].as_array().map(Vec::len), Some(2));
    assert_eq!(doc["edges"][0]["kind"], "follow");
}

#[test]
fn test_model_and_query_json_round_trip() {
    let definition = ModelGraph::builder()
        .add_class("Schema", ["name"])
        .add_class("Table", ["name"])
        .add_association(
            "contains",
            graphplan::query::lurql::EndDef::new("schema", "Schema").composite(),
            graphplan::query::lurql::EndDef::new("tables", "Table").many(),
        )
        .definition()
        .clone();
    let json = serde_json::to_string(&definition).expect("序列化应成功");
    let model = ModelGraph::from_definition(&serde_json::from_str(&json).expect("反序列化应成功"))
        .expect("模型应有效");
    assert_eq!(model.class_count(), 2);
    assert!(model.find_class_vertex("Table").is_some());

    let query = LurqlQuery::select_all(
        RootClause::new("Schema")
            .filter(Filter::in_set("name", "names"))
            .then(FollowClause::new().forward().association("contains").alias("t")),
    );
    let text = serde_json::to_string(&query).expect("序列化应成功");
    let parsed: LurqlQuery = serde_json::from_str(&text).expect("反序列化应成功");
    assert_eq!(parsed, query);
}

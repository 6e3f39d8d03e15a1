//! 测试数据夹具
//!
//! 模型和计划树的标准样例

use std::sync::Arc;

use graphplan::query::lurql::{EndDef, ModelGraph, ModelView};
use graphplan::query::planner::plan::{Expr, PlanNode};

/// Schema -contains-> Table -contains-> Column，View 是 Table 的子类，
/// Table -indexedBy-> Index，Tag 与其他类没有关联
pub fn catalog_model() -> Arc<dyn ModelView> {
    Arc::new(
        ModelGraph::builder()
            .add_class("Element", ["name"])
            .add_subclass("Schema", "Element", ["owner"])
            .add_subclass("Table", "Element", ["rowCount"])
            .add_subclass("View", "Table", ["query"])
            .add_subclass("Column", "Element", ["type"])
            .add_subclass("Index", "Element", ["unique"])
            .add_class("Tag", ["label"])
            .add_association(
                "contains",
                EndDef::new("schema", "Schema").composite(),
                EndDef::new("tables", "Table").many(),
            )
            .add_association(
                "contains",
                EndDef::new("table", "Table").composite(),
                EndDef::new("columns", "Column").many(),
            )
            .add_association(
                "indexedBy",
                EndDef::new("table", "Table"),
                EndDef::new("indexes", "Index").many(),
            )
            .build()
            .expect("目录模型应有效"),
    )
}

/// 自引用的分类模型
pub fn category_model() -> Arc<dyn ModelView> {
    Arc::new(
        ModelGraph::builder()
            .add_class("Category", ["name"])
            .add_association(
                "parentOf",
                EndDef::new("parent", "Category"),
                EndDef::new("children", "Category").many(),
            )
            .build()
            .expect("分类模型应有效"),
    )
}

/// Start -next-> A -next-> B -next-> A，沿 next 正向递归时类集合在第三步重复
pub fn cycle_model() -> Arc<dyn ModelView> {
    Arc::new(
        ModelGraph::builder()
            .add_class("Start", ["name"])
            .add_class("A", ["name"])
            .add_class("B", ["name"])
            .add_association(
                "next",
                EndDef::new("start", "Start"),
                EndDef::new("firstA", "A").many(),
            )
            .add_association("next", EndDef::new("fromA", "A"), EndDef::new("toB", "B").many())
            .add_association("next", EndDef::new("fromB", "B"), EndDef::new("toA", "A").many())
            .build()
            .expect("环形模型应有效"),
    )
}

/// Project(a+1, Project(a, Scan(T)))
pub fn project_chain() -> PlanNode {
    PlanNode::project(
        vec![Expr::col("a").plus(Expr::int(1))],
        PlanNode::project(vec![Expr::col("a")], PlanNode::scan("T")),
    )
}

/// Project(a+1, Project(a, Project(a, Scan(T))))
pub fn three_projects() -> PlanNode {
    PlanNode::project(
        vec![Expr::col("a").plus(Expr::int(1))],
        PlanNode::project(
            vec![Expr::col("a")],
            PlanNode::project(vec![Expr::col("a")], PlanNode::scan("T")),
        ),
    )
}

/// Filter(a>1, Filter(b>2, Scan(T)))
pub fn filter_chain() -> PlanNode {
    PlanNode::filter(
        Expr::col("a").gt(Expr::int(1)),
        PlanNode::filter(Expr::col("b").gt(Expr::int(2)), PlanNode::scan("T")),
    )
}

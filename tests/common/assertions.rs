//! 自定义断言辅助模块
//!
//! 提供测试中的常用断言函数

use graphplan::query::lurql::{LurqlPlan, PlanVertex};
use graphplan::query::planner::plan::PlanNode;

/// 断言结果失败并匹配错误消息
pub fn assert_err_with<T: std::fmt::Debug, E: std::fmt::Display>(result: Result<T, E>, expected_msg: &str) {
    let err = result.expect_err("操作应该失败");
    let err_str = err.to_string();
    assert!(
        err_str.contains(expected_msg),
        "错误消息应包含 '{}', 实际是 '{}'",
        expected_msg,
        err_str
    );
}

/// 断言计划摘要一致
pub fn assert_digest(plan: &PlanNode, expected: &str) {
    assert_eq!(plan.digest(), expected, "计划不一致:\n{}", plan);
}

/// 断言计划图无环
pub fn assert_acyclic(plan: &LurqlPlan) {
    assert!(
        plan.graph().is_acyclic(),
        "计划图应无环:\n{}",
        plan.explain().join("\n")
    );
}

/// 按类名集合查找顶点
pub fn vertex_with_classes<'a>(plan: &'a LurqlPlan, classes: &[&str]) -> Option<&'a PlanVertex> {
    let mut expected: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
    expected.sort();
    plan.graph().vertices().find(|vertex| {
        let mut names: Vec<String> = vertex
            .class_set()
            .iter()
            .map(|&c| plan.model().class_name(c))
            .collect();
        names.sort();
        names == expected
    })
}

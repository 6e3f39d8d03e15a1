//! 重写规则 trait 定义
//!
//! 规则由操作数模式和转换函数组成，注册后不可变。
//! 启发式重写器与代价优化器共用同一套规则。

use std::sync::Arc;

use crate::query::planner::plan::PlanNode;
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::converter::Conversion;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

/// 重写规则 trait
///
/// 所有重写规则必须实现此 trait。
/// 规则通过模式匹配识别计划树的特定结构，然后应用转换。
///
/// # 示例
/// ```rust
/// use graphplan::query::planner::plan::PlanNode;
/// use graphplan::query::planner::rewrite::{Pattern, RewriteContext, RewriteResult, RewriteRule, TransformResult};
///
/// #[derive(Debug)]
/// struct MyRule;
///
/// impl RewriteRule for MyRule {
///     fn name(&self) -> &str { "MyRule" }
///
///     fn pattern(&self) -> Pattern {
///         Pattern::new_with_name("Filter")
///     }
///
///     fn apply(&self, _ctx: &mut RewriteContext, _node: &PlanNode) -> RewriteResult<Option<TransformResult>> {
///         Ok(None)
///     }
/// }
/// ```
pub trait RewriteRule: std::fmt::Debug + Send + Sync {
    /// 规则描述，排除过滤器按此文本匹配
    fn name(&self) -> &str;

    /// 规则类别，默认为实现类型的完整路径
    fn class_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// 返回规则的模式
    ///
    /// 用于匹配计划树的特定结构
    fn pattern(&self) -> Pattern;

    /// 应用重写规则
    ///
    /// # 参数
    /// - `ctx`: 重写上下文
    /// - `node`: 与模式根匹配的计划节点
    ///
    /// # 返回
    /// - `Ok(Some(result))`: 重写成功，返回转换结果
    /// - `Ok(None)`: 规则放弃触发，保持原节点
    /// - `Err(e)`: 重写失败
    fn apply(
        &self,
        ctx: &mut RewriteContext,
        node: &PlanNode,
    ) -> RewriteResult<Option<TransformResult>>;

    /// 检查规则是否匹配
    fn matches(&self, node: &PlanNode) -> bool {
        self.pattern().matches(node)
    }

    /// 调用约定转换规则返回其转换方向
    fn as_converter(&self) -> Option<Conversion> {
        None
    }
}

/// 共享规则引用
pub type RuleRef = Arc<dyn RewriteRule>;

/// 判断两个引用是否指向同一规则实例
pub fn same_rule(a: &RuleRef, b: &RuleRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// 返回规则类型 `R` 的类别名，与 [`RewriteRule::class_name`] 的默认值一致
pub fn rule_class_of<R: RewriteRule>() -> &'static str {
    std::any::type_name::<R>()
}

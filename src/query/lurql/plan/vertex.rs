//! 计划顶点
//!
//! 每个计划顶点对应查询中的一个路径分支实例，其类集合是执行时可能出现的对象类型。
//! 类集合在冻结后不可再修改。

use std::collections::BTreeSet;

use serde::Serialize;

use super::graph::Subgraph;
use crate::query::lurql::ast::Filter;
use crate::query::lurql::model::{ClassId, ModelView};

pub type VertexId = usize;

#[derive(Debug, Clone, Serialize)]
pub struct PlanVertex {
    pub id: VertexId,
    /// 唯一名称：`别名_序号` 或 `anon_序号`
    pub name: String,
    pub alias: Option<String>,
    class_set: BTreeSet<ClassId>,
    filters: Vec<Filter>,
    /// 递归不动点：指向首次产生相同类集合的顶点，不构成图中的边
    recursion_root: Option<VertexId>,
    recursion_subgraph: Option<Subgraph>,
    recursive: bool,
    in_exists: bool,
    frozen: bool,
}

impl PlanVertex {
    pub fn new(id: VertexId, name: String, alias: Option<String>, in_exists: bool) -> Self {
        Self {
            id,
            name,
            alias,
            class_set: BTreeSet::new(),
            filters: Vec::new(),
            recursion_root: None,
            recursion_subgraph: None,
            recursive: false,
            in_exists,
            frozen: false,
        }
    }

    pub fn class_set(&self) -> &BTreeSet<ClassId> {
        &self.class_set
    }

    /// 冻结前加入类；冻结后的调用被忽略并返回 false
    pub fn add_class(&mut self, class: ClassId) -> bool {
        if self.frozen {
            log::warn!("顶点 {} 已冻结, 忽略加入类 #{}", self.name, class);
            return false;
        }
        self.class_set.insert(class)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn add_filters<I: IntoIterator<Item = Filter>>(&mut self, filters: I) {
        self.filters.extend(filters);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// 冻结类集合，重复调用没有效果
    pub fn freeze(&mut self, model: &dyn ModelView) {
        if self.frozen {
            return;
        }
        let attributes: Vec<&str> = self.filters.iter().filter_map(Filter::attribute_name).collect();
        self.class_set = narrow_class_set(model, &self.class_set, &attributes);
        self.frozen = true;
    }

    pub fn recursion_root(&self) -> Option<VertexId> {
        self.recursion_root
    }

    pub fn set_recursion_root(&mut self, root: VertexId) {
        self.recursion_root = Some(root);
    }

    pub fn recursion_subgraph(&self) -> Option<&Subgraph> {
        self.recursion_subgraph.as_ref()
    }

    pub fn set_recursion_subgraph(&mut self, subgraph: Subgraph) {
        self.recursion_subgraph = Some(subgraph);
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn mark_recursive(&mut self) {
        self.recursive = true;
    }

    pub fn in_exists(&self) -> bool {
        self.in_exists
    }
}

/// 类集合收窄
///
/// 1. 每个类扩展为自身及全部子类
/// 2. 只保留所有过滤属性都存在的类
/// 3. 去掉已有祖先被保留的子类
pub fn narrow_class_set(
    model: &dyn ModelView,
    classes: &BTreeSet<ClassId>,
    attributes: &[&str],
) -> BTreeSet<ClassId> {
    let mut expanded = BTreeSet::new();
    for &class in classes {
        expanded.insert(class);
        expanded.extend(model.all_subclass_vertices(class));
    }

    let retained: BTreeSet<ClassId> = expanded
        .into_iter()
        .filter(|&class| attributes.iter().all(|attr| model.has_attribute(class, attr)))
        .collect();

    retained
        .iter()
        .copied()
        .filter(|&class| {
            model
                .all_superclass_vertices(class)
                .iter()
                .all(|ancestor| !retained.contains(ancestor))
        })
        .collect()
}

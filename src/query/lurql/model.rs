//! 类型化对象模型视图
//!
//! LURQL 编译器只通过 `ModelView` 访问模型：按名称查找类、查询类的全部
//! 出边/入边关联（含继承的关联）、查询传递闭包意义下的子类与父类。
//!
//! `ModelGraph` 是内存中的实现，可以通过 `ModelGraphBuilder` 构建，
//! 也可以从 JSON 形式的 `ModelDefinition` 加载。

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{LurqlError, LurqlResult};

pub type ClassId = usize;
pub type AssocId = usize;

/// 聚合类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Composite,
    #[default]
    None,
}

/// 多重性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    #[default]
    One,
    Many,
}

/// 模型中的类
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVertex {
    pub id: ClassId,
    pub name: String,
    /// 自身声明的属性（不含继承的属性）
    pub attributes: Vec<String>,
}

impl fmt::Display for ClassVertex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// 关联的一端
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationEnd {
    pub name: String,
    pub class: ClassId,
    pub aggregation: Aggregation,
    pub multiplicity: Multiplicity,
}

impl AssociationEnd {
    pub fn is_composite(&self) -> bool {
        self.aggregation == Aggregation::Composite
    }
}

/// 模型中的关联，`ends[0]` 为源端，`ends[1]` 为目标端
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocEdge {
    pub id: AssocId,
    pub name: String,
    pub ends: [AssociationEnd; 2],
}

impl AssocEdge {
    pub fn end(&self, index: usize) -> &AssociationEnd {
        &self.ends[index & 1]
    }

    /// 任意一端为组合聚合
    pub fn is_composite(&self) -> bool {
        self.ends.iter().any(AssociationEnd::is_composite)
    }
}

/// 模型视图
pub trait ModelView: fmt::Debug + Send + Sync {
    fn find_class_vertex(&self, name: &str) -> Option<ClassId>;

    fn class_vertex(&self, id: ClassId) -> Option<&ClassVertex>;

    fn assoc_edge(&self, id: AssocId) -> Option<&AssocEdge>;

    /// 源端为该类或其父类的关联
    fn all_outgoing_assoc_edges(&self, class: ClassId) -> BTreeSet<AssocId>;

    /// 目标端为该类或其父类的关联
    fn all_incoming_assoc_edges(&self, class: ClassId) -> BTreeSet<AssocId>;

    /// 全部子类（传递闭包，不含自身）
    fn all_subclass_vertices(&self, class: ClassId) -> BTreeSet<ClassId>;

    /// 全部父类（传递闭包，不含自身）
    fn all_superclass_vertices(&self, class: ClassId) -> BTreeSet<ClassId>;

    /// 类自身或其父类声明了该属性
    fn has_attribute(&self, class: ClassId, attribute: &str) -> bool {
        let declares = |id: ClassId| {
            self.class_vertex(id)
                .map(|c| c.attributes.iter().any(|a| a == attribute))
                .unwrap_or(false)
        };
        declares(class) || self.all_superclass_vertices(class).into_iter().any(declares)
    }

    fn class_name(&self, id: ClassId) -> String {
        self.class_vertex(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    }
}

/// 类定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superclasses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
}

/// 关联端定义，类以名称引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndDef {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub multiplicity: Multiplicity,
}

impl EndDef {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            aggregation: Aggregation::None,
            multiplicity: Multiplicity::One,
        }
    }

    pub fn composite(mut self) -> Self {
        self.aggregation = Aggregation::Composite;
        self
    }

    pub fn many(mut self) -> Self {
        self.multiplicity = Multiplicity::Many;
        self
    }
}

/// 关联定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssocDef {
    pub name: String,
    pub ends: [EndDef; 2],
}

/// 模型定义（可序列化）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub associations: Vec<AssocDef>,
}

/// 内存中的模型图
#[derive(Debug, Clone)]
pub struct ModelGraph {
    classes: Vec<ClassVertex>,
    assocs: Vec<AssocEdge>,
    by_name: HashMap<String, ClassId>,
    superclasses: Vec<BTreeSet<ClassId>>,
    subclasses: Vec<BTreeSet<ClassId>>,
}

impl ModelGraph {
    pub fn builder() -> ModelGraphBuilder {
        ModelGraphBuilder::new()
    }

    /// 由模型定义构建，计算类层次的传递闭包
    pub fn from_definition(definition: &ModelDefinition) -> LurqlResult<Self> {
        let mut by_name = HashMap::new();
        let mut classes = Vec::with_capacity(definition.classes.len());
        for (id, def) in definition.classes.iter().enumerate() {
            if by_name.insert(def.name.clone(), id).is_some() {
                return Err(LurqlError::invalid_structure(
                    "model",
                    format!("重复定义的类 {}", def.name),
                ));
            }
            classes.push(ClassVertex {
                id,
                name: def.name.clone(),
                attributes: def.attributes.clone(),
            });
        }

        let lookup = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| LurqlError::unknown_class(name))
        };

        let mut direct_supers: Vec<Vec<ClassId>> = Vec::with_capacity(classes.len());
        for def in &definition.classes {
            let supers = def
                .superclasses
                .iter()
                .map(|s| lookup(s))
                .collect::<LurqlResult<Vec<_>>>()?;
            direct_supers.push(supers);
        }

        let mut superclasses = Vec::with_capacity(classes.len());
        for id in 0..classes.len() {
            let mut closure = BTreeSet::new();
            let mut stack: Vec<ClassId> = direct_supers[id].clone();
            while let Some(current) = stack.pop() {
                if current == id {
                    return Err(LurqlError::invalid_structure(
                        "model",
                        format!("类 {} 的继承关系存在环", classes[id].name),
                    ));
                }
                if closure.insert(current) {
                    stack.extend(direct_supers[current].iter().copied());
                }
            }
            superclasses.push(closure);
        }

        let mut subclasses = vec![BTreeSet::new(); classes.len()];
        for (id, supers) in superclasses.iter().enumerate() {
            for &sup in supers {
                subclasses[sup].insert(id);
            }
        }

        let mut assocs = Vec::with_capacity(definition.associations.len());
        for (id, def) in definition.associations.iter().enumerate() {
            let end = |e: &EndDef| -> LurqlResult<AssociationEnd> {
                Ok(AssociationEnd {
                    name: e.name.clone(),
                    class: lookup(&e.class)?,
                    aggregation: e.aggregation,
                    multiplicity: e.multiplicity,
                })
            };
            assocs.push(AssocEdge {
                id,
                name: def.name.clone(),
                ends: [end(&def.ends[0])?, end(&def.ends[1])?],
            });
        }

        Ok(Self {
            classes,
            assocs,
            by_name,
            superclasses,
            subclasses,
        })
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn assoc_count(&self) -> usize {
        self.assocs.len()
    }

    fn assoc_edges_at_end(&self, class: ClassId, end: usize) -> BTreeSet<AssocId> {
        let mut types = self.all_superclass_vertices(class);
        types.insert(class);
        self.assocs
            .iter()
            .filter(|a| types.contains(&a.ends[end].class))
            .map(|a| a.id)
            .collect()
    }
}

impl ModelView for ModelGraph {
    fn find_class_vertex(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    fn class_vertex(&self, id: ClassId) -> Option<&ClassVertex> {
        self.classes.get(id)
    }

    fn assoc_edge(&self, id: AssocId) -> Option<&AssocEdge> {
        self.assocs.get(id)
    }

    fn all_outgoing_assoc_edges(&self, class: ClassId) -> BTreeSet<AssocId> {
        self.assoc_edges_at_end(class, 0)
    }

    fn all_incoming_assoc_edges(&self, class: ClassId) -> BTreeSet<AssocId> {
        self.assoc_edges_at_end(class, 1)
    }

    fn all_subclass_vertices(&self, class: ClassId) -> BTreeSet<ClassId> {
        self.subclasses.get(class).cloned().unwrap_or_default()
    }

    fn all_superclass_vertices(&self, class: ClassId) -> BTreeSet<ClassId> {
        self.superclasses.get(class).cloned().unwrap_or_default()
    }
}

/// 模型图构建器
#[derive(Debug, Clone, Default)]
pub struct ModelGraphBuilder {
    definition: ModelDefinition,
}

impl ModelGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class<I, S>(mut self, name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition.classes.push(ClassDef {
            name: name.into(),
            superclasses: Vec::new(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn add_subclass<I, S>(
        mut self,
        name: impl Into<String>,
        superclass: impl Into<String>,
        attributes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition.classes.push(ClassDef {
            name: name.into(),
            superclasses: vec![superclass.into()],
            attributes: attributes.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn add_association(mut self, name: impl Into<String>, source: EndDef, target: EndDef) -> Self {
        self.definition.associations.push(AssocDef {
            name: name.into(),
            ends: [source, target],
        });
        self
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn build(self) -> LurqlResult<ModelGraph> {
        ModelGraph::from_definition(&self.definition)
    }
}

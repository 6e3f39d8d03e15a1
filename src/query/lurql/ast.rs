//! LURQL 查询语法树
//!
//! 编译器消费的是已经解析好的语法树。路径分支是一个封闭的和类型：
//! `Root`、`Follow`、`Recurse`、`PathSpec`。各子句提供链式构建方法，
//! `Display` 输出对应的 LURQL 文本。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 选择列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectList {
    /// `select *`
    All,
    Aliases(Vec<String>),
}

impl SelectList {
    pub fn aliases<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectList::Aliases(aliases.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, SelectList::All)
    }
}

impl fmt::Display for SelectList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SelectList::All => write!(f, "*"),
            SelectList::Aliases(aliases) => write!(f, "{}", aliases.join(", ")),
        }
    }
}

/// 完整查询
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LurqlQuery {
    pub select: SelectList,
    pub root: PathBranch,
}

impl LurqlQuery {
    pub fn new(select: SelectList, root: impl Into<PathBranch>) -> Self {
        Self {
            select,
            root: root.into(),
        }
    }

    pub fn select_all(root: impl Into<PathBranch>) -> Self {
        Self::new(SelectList::All, root)
    }
}

impl fmt::Display for LurqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "select {} from {}", self.select, self.root)
    }
}

/// 路径分支
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathBranch {
    Root(RootClause),
    Follow(FollowClause),
    Recurse(RecurseClause),
    PathSpec(PathSpec),
}

impl PathBranch {
    /// 分支的子句名，用于错误信息
    pub fn clause_name(&self) -> &'static str {
        match self {
            PathBranch::Root(_) => "root",
            PathBranch::Follow(_) => "follow",
            PathBranch::Recurse(_) => "recursively",
            PathBranch::PathSpec(_) => "path",
        }
    }
}

impl fmt::Display for PathBranch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathBranch::Root(root) => write!(f, "{}", root),
            PathBranch::Follow(follow) => write!(f, "{}", follow),
            PathBranch::Recurse(recurse) => write!(f, "{}", recurse),
            PathBranch::PathSpec(spec) => write!(f, "{}", spec),
        }
    }
}

impl From<RootClause> for PathBranch {
    fn from(root: RootClause) -> Self {
        PathBranch::Root(root)
    }
}

impl From<FollowClause> for PathBranch {
    fn from(follow: FollowClause) -> Self {
        PathBranch::Follow(follow)
    }
}

impl From<RecurseClause> for PathBranch {
    fn from(recurse: RecurseClause) -> Self {
        PathBranch::Recurse(recurse)
    }
}

impl From<PathSpec> for PathBranch {
    fn from(spec: PathSpec) -> Self {
        PathBranch::PathSpec(spec)
    }
}

/// 收集子句：`gather [with parent] then (...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gather {
    #[serde(default)]
    pub with_parent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Box<PathSpec>>,
}

/// 路径说明：若干分支的并集，可选地收集后继续
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSpec {
    pub branches: Vec<PathBranch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gather: Option<Gather>,
}

impl PathSpec {
    pub fn new(branches: Vec<PathBranch>) -> Self {
        Self {
            branches,
            gather: None,
        }
    }

    pub fn single(branch: impl Into<PathBranch>) -> Self {
        Self::new(vec![branch.into()])
    }

    /// 追加一个并列分支（`union`）
    pub fn union(mut self, branch: impl Into<PathBranch>) -> Self {
        self.branches.push(branch.into());
        self
    }

    /// 收集所有叶子后继续执行 `then`
    pub fn gather_then(mut self, then: impl Into<PathSpec>) -> Self {
        self.gather = Some(Gather {
            with_parent: false,
            then: Some(Box::new(then.into())),
        });
        self
    }

    /// 收集所有叶子及父节点后继续执行 `then`
    pub fn gather_with_parent_then(mut self, then: impl Into<PathSpec>) -> Self {
        self.gather = Some(Gather {
            with_parent: true,
            then: Some(Box::new(then.into())),
        });
        self
    }

    /// 收集叶子，不再继续
    pub fn gather(mut self, with_parent: bool) -> Self {
        self.gather = Some(Gather {
            with_parent,
            then: None,
        });
        self
    }

    pub fn is_gather(&self) -> bool {
        self.gather.is_some()
    }
}

impl From<PathBranch> for PathSpec {
    fn from(branch: PathBranch) -> Self {
        PathSpec::single(branch)
    }
}

impl From<RootClause> for PathSpec {
    fn from(root: RootClause) -> Self {
        PathSpec::single(root)
    }
}

impl From<FollowClause> for PathSpec {
    fn from(follow: FollowClause) -> Self {
        PathSpec::single(follow)
    }
}

impl From<RecurseClause> for PathSpec {
    fn from(recurse: RecurseClause) -> Self {
        PathSpec::single(recurse)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let branches: Vec<String> = self.branches.iter().map(|b| b.to_string()).collect();
        write!(f, "({})", branches.join(" union "))?;
        if let Some(ref gather) = self.gather {
            write!(f, " gather")?;
            if gather.with_parent {
                write!(f, " with parent")?;
            }
            if let Some(ref then) = gather.then {
                write!(f, " then {}", then)?;
            }
        }
        Ok(())
    }
}

/// 过滤条件中的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Literal(String),
    /// 动态参数 `?name`
    Param(String),
}

impl Value {
    pub fn literal(value: impl Into<String>) -> Self {
        Value::Literal(value.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Value::Param(name.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Literal(value) => write!(f, "'{}'", value.replace('\'', "''")),
            Value::Param(name) => write!(f, "?{}", name),
        }
    }
}

/// 属性谓词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// `attr = v` 或 `attr in (v1, v2, ...)`
    In(Vec<Value>),
    /// `attr in ?set`
    InSet(String),
    /// `attr matches v`
    Matches(Value),
    IsNull,
}

/// EXISTS 子句
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsClause {
    pub select: SelectList,
    pub path_spec: PathSpec,
}

impl ExistsClause {
    pub fn new(select: SelectList, path_spec: impl Into<PathSpec>) -> Self {
        Self {
            select,
            path_spec: path_spec.into(),
        }
    }
}

/// 过滤条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Attribute {
        attribute: String,
        predicate: Predicate,
        #[serde(default)]
        negated: bool,
    },
    Exists {
        exists: ExistsClause,
        #[serde(default)]
        negated: bool,
    },
}

impl Filter {
    pub fn equals(attribute: impl Into<String>, value: Value) -> Self {
        Self::attribute(attribute, Predicate::In(vec![value]))
    }

    pub fn in_values(attribute: impl Into<String>, values: Vec<Value>) -> Self {
        Self::attribute(attribute, Predicate::In(values))
    }

    pub fn in_set(attribute: impl Into<String>, param: impl Into<String>) -> Self {
        Self::attribute(attribute, Predicate::InSet(param.into()))
    }

    pub fn matches(attribute: impl Into<String>, pattern: Value) -> Self {
        Self::attribute(attribute, Predicate::Matches(pattern))
    }

    pub fn is_null(attribute: impl Into<String>) -> Self {
        Self::attribute(attribute, Predicate::IsNull)
    }

    pub fn exists(exists: ExistsClause) -> Self {
        Filter::Exists {
            exists,
            negated: false,
        }
    }

    pub fn not_exists(exists: ExistsClause) -> Self {
        Filter::Exists {
            exists,
            negated: true,
        }
    }

    fn attribute(attribute: impl Into<String>, predicate: Predicate) -> Self {
        Filter::Attribute {
            attribute: attribute.into(),
            predicate,
            negated: false,
        }
    }

    /// 取反
    pub fn negate(self) -> Self {
        match self {
            Filter::Attribute {
                attribute,
                predicate,
                negated,
            } => Filter::Attribute {
                attribute,
                predicate,
                negated: !negated,
            },
            Filter::Exists { exists, negated } => Filter::Exists {
                exists,
                negated: !negated,
            },
        }
    }

    /// 引用的属性名，EXISTS 过滤没有属性
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            Filter::Attribute { attribute, .. } => Some(attribute),
            Filter::Exists { .. } => None,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Filter::Attribute {
                attribute,
                predicate,
                negated,
            } => {
                if *negated {
                    write!(f, "not ")?;
                }
                match predicate {
                    Predicate::In(values) if values.len() == 1 => {
                        write!(f, "{} = {}", attribute, values[0])
                    }
                    Predicate::In(values) => {
                        let values: Vec<String> = values.iter().map(Value::to_string).collect();
                        write!(f, "{} in ({})", attribute, values.join(", "))
                    }
                    Predicate::InSet(param) => write!(f, "{} in ?{}", attribute, param),
                    Predicate::Matches(pattern) => write!(f, "{} matches {}", attribute, pattern),
                    Predicate::IsNull => write!(f, "{} is null", attribute),
                }
            }
            Filter::Exists { exists, negated } => {
                if *negated {
                    write!(f, "not ")?;
                }
                write!(f, "exists (select {} in {})", exists.select, exists.path_spec)
            }
        }
    }
}

fn fmt_clause_tail(
    f: &mut fmt::Formatter,
    alias: &Option<String>,
    filters: &[Filter],
    then: &Option<PathSpec>,
) -> fmt::Result {
    if let Some(alias) = alias {
        write!(f, " as {}", alias)?;
    }
    if !filters.is_empty() {
        let filters: Vec<String> = filters.iter().map(Filter::to_string).collect();
        write!(f, " where {}", filters.join(" and "))?;
    }
    if let Some(then) = then {
        write!(f, " then {}", then)?;
    }
    Ok(())
}

/// ROOT 子句：`class X [as a] [where ...] [then ...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootClause {
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<PathSpec>,
}

impl RootClause {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            alias: None,
            filters: Vec::new(),
            then: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn then(mut self, then: impl Into<PathSpec>) -> Self {
        self.then = Some(then.into());
        self
    }
}

impl fmt::Display for RootClause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "class {}", self.class_name)?;
        fmt_clause_tail(f, &self.alias, &self.filters, &self.then)
    }
}

/// FOLLOW 子句的关联过滤条件
///
/// 方向都未指定表示两个方向；组合/非组合都未指定表示两者皆可。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationFilters {
    pub forward: bool,
    pub backward: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_end: Option<String>,
    pub composite: bool,
    pub noncomposite: bool,
}

impl AssociationFilters {
    /// 实际生效的方向（正向, 反向）
    pub fn directions(&self) -> (bool, bool) {
        if !self.forward && !self.backward {
            (true, true)
        } else {
            (self.forward, self.backward)
        }
    }

    /// 实际允许的聚合类型（组合, 非组合）
    pub fn aggregations(&self) -> (bool, bool) {
        if !self.composite && !self.noncomposite {
            (true, true)
        } else {
            (self.composite, self.noncomposite)
        }
    }
}

/// FOLLOW 子句
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowClause {
    #[serde(default)]
    pub association_filters: AssociationFilters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<PathSpec>,
}

impl FollowClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(mut self) -> Self {
        self.association_filters.forward = true;
        self
    }

    pub fn backward(mut self) -> Self {
        self.association_filters.backward = true;
        self
    }

    pub fn origin_class(mut self, class_name: impl Into<String>) -> Self {
        self.association_filters.origin_class = Some(class_name.into());
        self
    }

    pub fn destination_class(mut self, class_name: impl Into<String>) -> Self {
        self.association_filters.destination_class = Some(class_name.into());
        self
    }

    pub fn association(mut self, name: impl Into<String>) -> Self {
        self.association_filters.association = Some(name.into());
        self
    }

    pub fn origin_end(mut self, name: impl Into<String>) -> Self {
        self.association_filters.origin_end = Some(name.into());
        self
    }

    pub fn destination_end(mut self, name: impl Into<String>) -> Self {
        self.association_filters.destination_end = Some(name.into());
        self
    }

    pub fn composite(mut self) -> Self {
        self.association_filters.composite = true;
        self
    }

    pub fn noncomposite(mut self) -> Self {
        self.association_filters.noncomposite = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn then(mut self, then: impl Into<PathSpec>) -> Self {
        self.then = Some(then.into());
        self
    }
}

impl fmt::Display for FollowClause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let af = &self.association_filters;
        write!(f, "follow")?;
        if af.forward {
            write!(f, " forward")?;
        }
        if af.backward {
            write!(f, " backward")?;
        }
        if let Some(ref class) = af.origin_class {
            write!(f, " origin class {}", class)?;
        }
        if let Some(ref class) = af.destination_class {
            write!(f, " destination class {}", class)?;
        }
        if let Some(ref name) = af.association {
            write!(f, " association {}", name)?;
        }
        if let Some(ref name) = af.origin_end {
            write!(f, " origin end {}", name)?;
        }
        if let Some(ref name) = af.destination_end {
            write!(f, " destination end {}", name)?;
        }
        if af.composite {
            write!(f, " composite")?;
        }
        if af.noncomposite {
            write!(f, " noncomposite")?;
        }
        fmt_clause_tail(f, &self.alias, &self.filters, &self.then)
    }
}

/// RECURSIVELY 子句
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurseClause {
    pub path_spec: PathSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<PathSpec>,
}

impl RecurseClause {
    pub fn new(path_spec: impl Into<PathSpec>) -> Self {
        Self {
            path_spec: path_spec.into(),
            then: None,
        }
    }

    pub fn then(mut self, then: impl Into<PathSpec>) -> Self {
        self.then = Some(then.into());
        self
    }
}

impl fmt::Display for RecurseClause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "recursively {}", self.path_spec)?;
        if let Some(ref then) = self.then {
            write!(f, " then {}", then)?;
        }
        Ok(())
    }
}

//! LURQL 编译错误类型
//!
//! 所有错误都在单次编译过程中被检测到，立即中止编译，不返回部分计划。

use thiserror::Error;

/// LURQL 编译错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LurqlError {
    /// ROOT 子句引用了模型中不存在的类
    #[error("未知的类: {0}")]
    UnknownClass(String),

    /// 查询结构错误，`clause` 指出出错的子句
    #[error("无效的查询结构 ({clause}): {message}")]
    InvalidStructure { clause: String, message: String },

    /// 选择列表引用了作用域内未定义的别名
    #[error("{scope}中引用了未知的别名: {}", .aliases.join(", "))]
    UnknownAlias { scope: String, aliases: Vec<String> },

    /// 同一别名绑定到两个不同的分支
    #[error("重复的别名: {0}")]
    DuplicateAlias(String),

    /// 同一动态参数在两个位置要求不兼容的取值形态
    #[error("参数 {name} 的类型冲突: 已声明为 {existing}, 此处要求 {requested}")]
    ConflictingParameterType {
        name: String,
        existing: String,
        requested: String,
    },
}

impl LurqlError {
    pub fn unknown_class(name: impl Into<String>) -> Self {
        Self::UnknownClass(name.into())
    }

    pub fn invalid_structure(clause: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            clause: clause.into(),
            message: message.into(),
        }
    }

    pub fn unknown_alias(scope: impl Into<String>, aliases: Vec<String>) -> Self {
        Self::UnknownAlias {
            scope: scope.into(),
            aliases,
        }
    }

    pub fn duplicate_alias(alias: impl Into<String>) -> Self {
        Self::DuplicateAlias(alias.into())
    }
}

/// LURQL 编译结果类型
pub type LurqlResult<T> = Result<T, LurqlError>;

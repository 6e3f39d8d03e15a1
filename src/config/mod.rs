//! 规划器配置
//!
//! 配置文件为 TOML 格式，分为 `[rewrite]`、`[optimizer]`、`[log]` 三节，
//! 缺省的字段使用默认值。

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::query::planner::rewrite::program::MatchOrder;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub rewrite: RewriteConfig,
    pub optimizer: OptimizerConfig,
    pub log: LogConfig,
}

/// 启发式重写器配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RewriteConfig {
    /// 单个规则组内的最大转换次数，超过后记录警告并结束该组
    pub max_group_iterations: usize,
    /// 默认匹配顺序
    pub match_order: MatchOrder,
    /// 每个阶段默认的最大匹配次数，`None` 表示不限制
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_limit: Option<usize>,
    /// 规则排除过滤器（正则，匹配规则描述）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_exclusion: Option<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_group_iterations: 10_000,
            match_order: MatchOrder::TopDown,
            match_limit: None,
            rule_exclusion: None,
        }
    }
}

impl RewriteConfig {
    /// 编译规则排除过滤器
    pub fn exclusion_regex(&self) -> Result<Option<Regex>, ConfigError> {
        match &self.rule_exclusion {
            Some(pattern) if !pattern.is_empty() => Regex::new(pattern)
                .map(Some)
                .map_err(|e| ConfigError::InvalidExclusionFilter(e.to_string())),
            _ => Ok(None),
        }
    }
}

/// 代价优化器配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OptimizerConfig {
    /// 探索阶段的最大轮数
    pub max_exploration_rounds: usize,
    /// 备忘录中表达式数量上限，达到后停止探索
    pub max_memo_expressions: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_exploration_rounds: 64,
            max_memo_expressions: 100_000,
        }
    }
}

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// 输出到标准错误而不是日志文件
    pub stderr: bool,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            stderr: false,
            dir: "logs".to_string(),
            file: "graphplan".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rewrite.max_group_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "rewrite.max_group_iterations 必须大于 0".to_string(),
            ));
        }
        if self.optimizer.max_exploration_rounds == 0 {
            return Err(ConfigError::InvalidValue(
                "optimizer.max_exploration_rounds 必须大于 0".to_string(),
            ));
        }
        self.rewrite.exclusion_regex()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.rewrite.max_group_iterations, 10_000);
        assert_eq!(config.rewrite.match_order, MatchOrder::TopDown);
        assert_eq!(config.log.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_save() {
        let mut config = Config::default();
        config.rewrite.rule_exclusion = Some("^Collapse.*".to_string());
        config.rewrite.match_order = MatchOrder::BottomUp;

        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        config.save(temp_file.path()).expect("Failed to save config");

        let loaded = Config::load(temp_file.path()).expect("Failed to load config from temporary file");
        assert_eq!(loaded.rewrite.rule_exclusion, config.rewrite.rule_exclusion);
        assert_eq!(loaded.rewrite.match_order, MatchOrder::BottomUp);
        assert!(loaded
            .rewrite
            .exclusion_regex()
            .expect("正则应有效")
            .map(|r| r.is_match("CollapseProjectRule"))
            .unwrap_or(false));
    }

    #[test]
    fn test_config_partial_file() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        temp_file
            .write_all(b"[optimizer]\nmax_exploration_rounds = 8\n")
            .expect("Failed to write TOML content to temporary file");

        let loaded = Config::load(temp_file.path()).expect("Failed to load config");
        assert_eq!(loaded.optimizer.max_exploration_rounds, 8);
        assert_eq!(loaded.rewrite.max_group_iterations, 10_000);
    }

    #[test]
    fn test_config_invalid_exclusion() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        temp_file
            .write_all(b"[rewrite]\nrule_exclusion = \"(unclosed\"\n")
            .expect("Failed to write TOML content to temporary file");

        let err = Config::load(temp_file.path()).expect_err("非法正则应报错");
        assert!(matches!(err, ConfigError::InvalidExclusionFilter(_)));
    }
}

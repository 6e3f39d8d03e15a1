//! 配置与日志集成测试
//!
//! 测试范围:
//! - 配置文件加载、缺省值和校验
//! - 配置驱动的重写器行为
//! - 日志文件创建和写入

mod common;

use std::fs;
use std::io::Write;

use common::data_fixtures::three_projects;
use common::rule;
use graphplan::config::{Config, LogConfig};
use graphplan::core::error::ConfigError;
use graphplan::query::planner::rewrite::{
    CollapseProjectRule, HeuristicPlanner, RewriteProgram, RuleRegistry,
};
use graphplan::utils::logging;
use serial_test::serial;
use tempfile::NamedTempFile;

/// 测试日志配置默认值
#[test]
fn test_log_config_defaults() {
    let config = Config::default();

    assert_eq!(config.log.level, "info");
    assert_eq!(config.log.dir, "logs");
    assert_eq!(config.log.file, "graphplan");
    assert_eq!(config.log.max_file_size, 100 * 1024 * 1024);
    assert_eq!(config.log.max_files, 5);
    assert!(!config.log.stderr);
}

/// 测试配置序列化和反序列化
#[test]
fn test_config_serialization() {
    let mut config = Config::default();
    config.log.level = "debug".to_string();
    config.log.dir = "test_logs".to_string();
    config.optimizer.max_memo_expressions = 512;

    let toml_str = toml::to_string_pretty(&config).expect("序列化配置失败");
    assert!(toml_str.contains("[log]"));
    assert!(toml_str.contains("level = \"debug\""));
    assert!(toml_str.contains("max_memo_expressions = 512"));

    let loaded: Config = toml::from_str(&toml_str).expect("反序列化配置失败");
    assert_eq!(loaded.log.level, "debug");
    assert_eq!(loaded.log.dir, "test_logs");
    assert_eq!(loaded.optimizer.max_memo_expressions, 512);
}

/// 测试非法取值在加载时被拒绝
#[test]
fn test_config_rejects_zero_rounds() {
    let mut temp_file = NamedTempFile::new().expect("创建临时文件失败");
    temp_file
        .write_all(b"[optimizer]\nmax_exploration_rounds = 0\n")
        .expect("写入配置失败");

    let err = Config::load(temp_file.path()).expect_err("轮数为 0 应报错");
    assert!(matches!(err, ConfigError::InvalidValue(_)));
}

/// 测试配置中的匹配上限作用于重写器
#[test]
fn test_rewrite_config_drives_planner() {
    let mut temp_file = NamedTempFile::new().expect("创建临时文件失败");
    temp_file
        .write_all(b"[rewrite]\nmatch_limit = 1\n")
        .expect("写入配置失败");
    let config = Config::load(temp_file.path()).expect("加载配置失败");
    assert_eq!(config.rewrite.match_limit, Some(1));

    let program = RewriteProgram::builder()
        .add_rule_instance(rule(CollapseProjectRule::new()))
        .build();
    let mut planner =
        HeuristicPlanner::with_config(RuleRegistry::new().into_shared(), config.rewrite.clone());
    let result = planner.apply(&program, three_projects()).expect("重写应成功");

    assert_eq!(planner.stats().transformations, 1, "匹配上限为 1 时只触发一次");
    assert_eq!(result.node_count(), 3);
}

/// 测试日志写入文件
#[test]
#[serial]
fn test_logging_writes_file() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = LogConfig {
        level: "debug".to_string(),
        dir: dir.path().to_string_lossy().into_owned(),
        file: "graphplan-it".to_string(),
        ..LogConfig::default()
    };

    logging::init(&config).expect("日志初始化失败");
    assert!(logging::is_initialized());
    log::info!("集成测试日志消息");
    logging::shutdown();
    assert!(!logging::is_initialized());
    assert_eq!(log::max_level(), log::LevelFilter::Off, "关闭后不应再写入已关闭的日志文件");
    log::info!("关闭后的日志消息");

    let written: Vec<String> = fs::read_dir(dir.path())
        .expect("读取日志目录失败")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("graphplan-it"))
        .collect();
    assert!(!written.is_empty(), "日志目录中应有日志文件");
}

//! 配置错误类型

use thiserror::Error;

/// 配置加载与校验错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("解析配置文件失败: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("序列化配置失败: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("无效的规则排除过滤器: {0}")]
    InvalidExclusionFilter(String),

    #[error("无效的配置值: {0}")]
    InvalidValue(String),

    #[error("初始化日志失败: {0}")]
    Logger(#[from] flexi_logger::FlexiLoggerError),
}

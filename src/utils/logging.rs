// 日志工具模块
//
// 封装 flexi_logger 的初始化和关闭操作，确保异步日志正确 flush

use crate::config::LogConfig;
use crate::core::error::ConfigError;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use std::sync::Mutex;

/// 全局日志句柄，用于程序退出时 flush
static LOGGER_HANDLE: Mutex<Option<LoggerHandle>> = Mutex::new(None);

/// 初始化日志系统
///
/// `stderr` 为真时输出到标准错误，否则按大小轮转写入 `dir/file`。
/// 已初始化时直接返回。
///
/// # Examples
/// ```no_run
/// use graphplan::config::Config;
/// use graphplan::utils::logging;
///
/// let config = Config::default();
/// logging::init(&config.log).expect("日志初始化失败");
/// ```
pub fn init(config: &LogConfig) -> Result<(), ConfigError> {
    let mut guard = match LOGGER_HANDLE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if guard.is_some() {
        return Ok(());
    }

    let logger = Logger::try_with_str(&config.level)?;
    let handle = if config.stderr {
        logger.log_to_stderr().start()?
    } else {
        logger
            .log_to_file(
                FileSpec::default()
                    .basename(&config.file)
                    .directory(&config.dir),
            )
            .rotate(
                Criterion::Size(config.max_file_size),
                Naming::Numbers,
                Cleanup::KeepLogFiles(config.max_files),
            )
            .write_mode(WriteMode::Async)
            .append()
            .start()?
    };
    *guard = Some(handle);

    if config.stderr {
        log::info!("日志系统初始化完成: stderr");
    } else {
        log::info!("日志系统初始化完成: {}/{}", config.dir, config.file);
    }
    Ok(())
}

/// 刷新并关闭日志系统
///
/// 在程序退出前调用，确保所有异步日志都已写入文件。
/// 关闭后全局日志级别置为 `Off`，之后的日志宏不再触达已关闭的写入器。
pub fn shutdown() {
    if let Ok(mut guard) = LOGGER_HANDLE.lock() {
        if let Some(handle) = guard.take() {
            handle.flush();
            log::set_max_level(log::LevelFilter::Off);
            handle.shutdown();
        }
    }
}

/// 检查日志系统是否已初始化
pub fn is_initialized() -> bool {
    LOGGER_HANDLE
        .lock()
        .map(|guard| guard.is_some())
        .unwrap_or(false)
}

use tracing_subscriber::EnvFilter;

/// 根据 `-v` 次数返回默认日志级别
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// 初始化日志，输出到标准错误
///
/// 设置了 RUST_LOG 时以其为准，例如 `RUST_LOG=rdnsenum=debug`。
/// 库内使用 `log` 宏记录的日志也会被收集。
pub fn init_logger(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rdnsenum={}", default_level(verbosity))));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .ok();
}

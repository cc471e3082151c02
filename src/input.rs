use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;

/// 输出格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Plain,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "plain" => Ok(OutputFormat::Plain),
            _ => Err(format!("不支持的输出格式: {}。支持的格式: json, plain", s)),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rdnsenum")]
#[command(version)]
#[command(about = "A simple DNS enumeration tool", long_about = None, arg_required_else_help = true)]
pub struct Opts {
    /// top-level zone to enumerate (i.e. google.com)
    pub zone: String,

    /// file containing a list of subdomains to enumerate
    pub subdomains_file: String,

    /// skip zone transfer attempt
    #[arg(short = 'x', long)]
    pub skip_xfr: bool,

    /// DNS server to query (IP or hostname), use system resolver on default
    #[arg(short, long)]
    pub server: Option<String>,

    /// DNS server port
    #[arg(long, default_value_t = 53)]
    pub port: u16,

    /// output file path
    #[arg(short, long)]
    pub output: Option<String>,

    /// output format (json, plain)
    #[arg(short, long, default_value = "json")]
    pub format: OutputFormat,

    /// print only the valid subdomains, without addresses
    #[arg(short, long)]
    pub no_address: bool,

    /// max queries in flight
    #[arg(short, long, default_value_t = 10, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// per-query timeout in seconds
    #[arg(short, long, default_value = "3", value_parser = parse_timeout)]
    pub timeout: Duration,

    /// max queries per second
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// locate nameservers by NS records instead of the SOA primary
    #[arg(long)]
    pub use_ns: bool,

    /// query candidates against the located authoritative nameservers
    #[arg(long)]
    pub authoritative: bool,

    /// show summary statistics
    #[arg(long)]
    pub summary: bool,

    /// verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// 并发数必须在 1 到信号量上限之间
pub fn parse_concurrency(value: &str) -> Result<usize, String> {
    let concurrency: usize = value
        .parse()
        .map_err(|_| format!("无效的并发数: {}", value))?;
    if concurrency == 0 || concurrency > Semaphore::MAX_PERMITS {
        return Err(format!(
            "并发数必须在 1 到 {} 之间: {}",
            Semaphore::MAX_PERMITS,
            concurrency
        ));
    }
    Ok(concurrency)
}

/// 超时秒数，可以是小数
pub fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("无效的超时时间: {}", value))?;
    if secs <= 0.0 {
        return Err(format!("超时时间必须大于0: {}", value));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("无效的超时时间 {}: {}", value, e))
}

/// 读取候选子域名，去掉首尾空白并跳过空行
pub fn parse_candidates<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut candidates = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let word = line.trim();
        if !word.is_empty() {
            candidates.push(word.to_string());
        }
    }
    Ok(candidates)
}

/// 从字典文件加载候选子域名
pub fn read_candidates<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    parse_candidates(BufReader::new(file))
}

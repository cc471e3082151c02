use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use rdnsenum::api::{EnumerationConfig, EnumerationReport, SubdomainEnumerator};
use rdnsenum::dns_resolver::ResolverConfig;
use rdnsenum::input::{read_candidates, Opts};
use rdnsenum::logger::init_logger;
use rdnsenum::model::ZoneTransferResult;
use rdnsenum::output::{render, write_output};
use rdnsenum::FailureReason;

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    init_logger(opts.verbose);

    if let Err(e) = run(opts).await {
        eprintln!("{} {}", "错误:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(opts: Opts) -> Result<(), Box<dyn std::error::Error>> {
    let candidates = read_candidates(&opts.subdomains_file)
        .map_err(|e| format!("无法读取字典文件 {}: {}", opts.subdomains_file, e))?;

    let config = EnumerationConfig {
        zone: opts.zone.clone(),
        candidates,
        server: opts.server.clone(),
        skip_transfer: opts.skip_xfr,
        use_soa: !opts.use_ns,
        query_authoritative: opts.authoritative,
        resolver: ResolverConfig {
            port: opts.port,
            timeout: opts.timeout,
            concurrency: opts.concurrency,
            rate_limit: opts.rate_limit,
            ..Default::default()
        },
        ..Default::default()
    };

    eprintln!("{} {}", "目标域名:".cyan(), config.zone);
    eprintln!("{} {}", "候选数量:".cyan(), config.candidates.len());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "收到中断信号，停止剩余查询...".yellow());
            ctrl_c.cancel();
        }
    });

    let enumerator = SubdomainEnumerator::new(config);
    let report = enumerator.run_with_cancel(cancel).await?;

    if let Some(transfer) = &report.transfer {
        match transfer {
            ZoneTransferResult::Transferred { records } => {
                eprintln!("{} 获得 {} 条记录", "区域传送成功:".green(), records.len());
            }
            ZoneTransferResult::Unavailable { reason } => {
                eprintln!("{} {}", "区域传送不可用:".yellow(), reason);
            }
        }
    }

    let content = render(&report.result, opts.format, opts.no_address)?;
    match &opts.output {
        Some(path) => eprintln!("{} {}", "结果写入:".cyan(), path),
        None => eprintln!("{}", "结果输出到标准输出".cyan()),
    }
    write_output(&content, opts.output.as_deref())?;

    if opts.summary {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &EnumerationReport) {
    let count = |reason: FailureReason| report.failures.get(&reason).copied().unwrap_or(0);

    eprintln!();
    eprintln!("{}", "=== 汇总统计 ===".bold());
    eprintln!(
        "开始时间: {}",
        report
            .started_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    eprintln!("耗时: {:.2}s", report.elapsed.as_secs_f64());
    eprintln!("名称服务器: {}", report.nameservers.len());
    eprintln!("已查询: {}", report.outcomes.len());
    eprintln!("发现子域名: {}", report.result.len().to_string().green());
    eprintln!("不存在: {}", count(FailureReason::NotFound));
    eprintln!("超时: {}", count(FailureReason::Timeout));
    eprintln!("服务器错误: {}", count(FailureReason::ServerError));
    eprintln!("其他错误: {}", count(FailureReason::Other));
    if report.cancelled {
        eprintln!("{}", "枚举被中断，结果不完整".yellow());
    }
}

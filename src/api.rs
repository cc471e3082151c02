use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::aggregate::{aggregate, EnumerationResult};
use crate::candidate::CandidateResolver;
use crate::dns_resolver::{DnsLookup, DnsResolver, ResolverConfig};
use crate::error::{EnumError, FailureReason};
use crate::model::{NameserverEndpoint, ResolutionOutcome, ZoneTransferResult};
use crate::nameserver::{endpoints_from_override, locate};
use crate::zone_transfer::{AxfrClient, ZoneTransfer, DEFAULT_TRANSFER_TIMEOUT};

/// 根据服务器配置创建查询器
pub type LookupFactory = Arc<dyn Fn(&ResolverConfig) -> Arc<dyn DnsLookup> + Send + Sync>;

/// 子域名枚举配置
#[derive(Debug, Clone)]
pub struct EnumerationConfig {
    /// 目标域名
    pub zone: String,
    /// 候选子域名标签，按顺序处理，允许重复
    pub candidates: Vec<String>,
    /// 指定的DNS服务器（IP或主机名），跳过名称服务器定位
    pub server: Option<String>,
    /// 是否跳过区域传送
    pub skip_transfer: bool,
    /// 使用 SOA 主服务器而不是 NS 记录定位名称服务器
    pub use_soa: bool,
    /// 直接向定位到的权威服务器查询候选
    pub query_authoritative: bool,
    /// 区域传送超时
    pub transfer_timeout: Duration,
    /// 解析器配置
    pub resolver: ResolverConfig,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        EnumerationConfig {
            zone: String::new(),
            candidates: Vec::new(),
            server: None,
            skip_transfer: false,
            use_soa: true,
            query_authoritative: false,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            resolver: ResolverConfig::default(),
        }
    }
}

/// 枚举流程经过的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    LocatingNameserver,
    TransferAttempt,
    SkipTransfer,
    Resolving,
    Done,
}

/// 一次枚举的完整报告
#[derive(Debug, Clone)]
pub struct EnumerationReport {
    pub zone: String,
    /// 定位到的名称服务器，或指定服务器的端点
    pub nameservers: Vec<NameserverEndpoint>,
    /// 区域传送结果，跳过时为 None
    pub transfer: Option<ZoneTransferResult>,
    /// 已完成的单个候选结果，按输入顺序
    pub outcomes: Vec<ResolutionOutcome>,
    pub result: EnumerationResult,
    pub failures: HashMap<FailureReason, usize>,
    pub states: Vec<RunState>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// 子域名枚举引擎
pub struct SubdomainEnumerator {
    config: EnumerationConfig,
    lookup: Arc<dyn DnsLookup>,
    lookup_factory: LookupFactory,
    transfer: Arc<dyn ZoneTransfer>,
}

impl SubdomainEnumerator {
    /// 使用系统解析器与 AXFR 客户端创建引擎
    pub fn new(config: EnumerationConfig) -> Self {
        let lookup: Arc<dyn DnsLookup> = Arc::new(DnsResolver::new(&locator_config(&config)));
        let lookup_factory: LookupFactory =
            Arc::new(|config: &ResolverConfig| Arc::new(DnsResolver::new(config)) as Arc<dyn DnsLookup>);
        let transfer: Arc<dyn ZoneTransfer> = Arc::new(AxfrClient::with_port(config.resolver.port));

        SubdomainEnumerator {
            config,
            lookup,
            lookup_factory,
            transfer,
        }
    }

    /// 使用给定的查询器和区域传送实现，所有查询都走同一个查询器
    pub fn with_components(
        config: EnumerationConfig,
        lookup: Arc<dyn DnsLookup>,
        transfer: Arc<dyn ZoneTransfer>,
    ) -> Self {
        let shared = lookup.clone();
        let lookup_factory: LookupFactory = Arc::new(move |_: &ResolverConfig| shared.clone());

        SubdomainEnumerator {
            config,
            lookup,
            lookup_factory,
            transfer,
        }
    }

    pub fn config(&self) -> &EnumerationConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<EnumerationReport, EnumError> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// 执行枚举：定位名称服务器 -> 区域传送 -> 解析候选
    pub async fn run_with_cancel(
        &self,
        cancel: CancellationToken,
    ) -> Result<EnumerationReport, EnumError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let zone = self.config.zone.trim().trim_end_matches('.').to_string();
        let mut states = vec![RunState::Init];

        let (nameservers, resolution_lookup) = match &self.config.server {
            Some(server) => {
                let endpoints = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(EnumError::Cancelled),
                    endpoints = endpoints_from_override(self.lookup.as_ref(), server) => endpoints?,
                };
                info!("使用指定的DNS服务器: {}", server);
                let lookup = self.lookup_for(&endpoints);
                (endpoints, lookup)
            }
            None => {
                states.push(RunState::LocatingNameserver);
                let endpoints = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(EnumError::Cancelled),
                    endpoints = locate(self.lookup.as_ref(), &zone, self.config.use_soa) => endpoints?,
                };
                let lookup = if self.config.query_authoritative {
                    self.lookup_for(&endpoints)
                } else {
                    self.lookup.clone()
                };
                (endpoints, lookup)
            }
        };

        let transfer = if self.config.skip_transfer {
            states.push(RunState::SkipTransfer);
            info!("跳过区域传送");
            None
        } else {
            states.push(RunState::TransferAttempt);
            Some(self.attempt_transfer(&zone, &nameservers, &cancel).await)
        };

        states.push(RunState::Resolving);
        info!("开始枚举 {} 个候选子域名", self.config.candidates.len());
        let resolver = CandidateResolver::new(resolution_lookup, &self.config.resolver);
        let batch = resolver
            .resolve_with_cancel(&zone, &self.config.candidates, cancel.clone())
            .await;
        if batch.cancelled {
            warn!("枚举被取消，仅保留已完成的 {} 个结果", batch.outcomes.len());
        }

        let result = aggregate(&batch.outcomes);
        let mut failures = HashMap::new();
        for reason in batch.outcomes.iter().filter_map(|o| o.failure_reason()) {
            *failures.entry(reason).or_insert(0) += 1;
        }
        states.push(RunState::Done);

        Ok(EnumerationReport {
            zone,
            nameservers,
            transfer,
            outcomes: batch.outcomes,
            result,
            failures,
            states,
            started_at,
            elapsed: clock.elapsed(),
            cancelled: batch.cancelled || cancel.is_cancelled(),
        })
    }

    fn lookup_for(&self, endpoints: &[NameserverEndpoint]) -> Arc<dyn DnsLookup> {
        let servers: Vec<IpAddr> = endpoints.iter().map(|e| e.address).collect();
        (self.lookup_factory)(&self.config.resolver.with_servers(servers))
    }

    /// 依次尝试各端点，遇到第一个成功的传送即停止；取消后不再尝试剩余端点
    async fn attempt_transfer(
        &self,
        zone: &str,
        endpoints: &[NameserverEndpoint],
        cancel: &CancellationToken,
    ) -> ZoneTransferResult {
        let mut last = ZoneTransferResult::unavailable("没有可用的名称服务器");

        for endpoint in endpoints {
            info!("尝试从 {} 进行区域传送", endpoint);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("区域传送被取消");
                    return ZoneTransferResult::unavailable("已取消");
                }
                result = self.transfer.attempt_transfer(zone, endpoint, self.config.transfer_timeout) => result,
            };

            match &result {
                ZoneTransferResult::Transferred { records } => {
                    info!("区域传送成功，获得 {} 条记录", records.len())
                }
                ZoneTransferResult::Unavailable { reason } => {
                    warn!("区域传送失败 ({}): {}", endpoint, reason)
                }
            }
            // TODO: 传送成功后对发现的子域逐个尝试传送
            if result.is_transferred() {
                return result;
            }
            last = result;
        }

        last
    }
}

/// 定位名称服务器用的解析器配置：系统服务器，超时和重试沿用运行配置
fn locator_config(config: &EnumerationConfig) -> ResolverConfig {
    config.resolver.with_servers(Vec::new())
}

/// 便捷函数：使用默认配置枚举子域名
pub async fn enumerate_subdomains(
    zone: &str,
    candidates: Vec<String>,
    server: Option<String>,
) -> Result<EnumerationResult, EnumError> {
    let config = EnumerationConfig {
        zone: zone.to_string(),
        candidates,
        server,
        ..Default::default()
    };

    let report = SubdomainEnumerator::new(config).run().await?;
    Ok(report.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_config_keeps_timeouts() {
        let config = EnumerationConfig {
            zone: "example.com".to_string(),
            resolver: ResolverConfig {
                servers: vec!["192.0.2.53".parse().unwrap()],
                timeout: Duration::from_millis(750),
                attempts: 3,
                ..Default::default()
            },
            ..Default::default()
        };

        let locator = locator_config(&config);
        assert!(locator.servers.is_empty());
        assert_eq!(locator.timeout, Duration::from_millis(750));
        assert_eq!(locator.attempts, 3);
        assert_eq!(locator.port, config.resolver.port);
    }
}

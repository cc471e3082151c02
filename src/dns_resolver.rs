use async_trait::async_trait;
use log::{debug, warn};
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{
    LookupIpStrategy, NameServerConfigGroup, ResolverConfig as ServerSetup, ResolverOpts,
};
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::LookupError;

/// 默认并发查询数
pub const DEFAULT_CONCURRENCY: usize = 10;
/// 默认单次查询超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
/// 默认DNS端口
pub const DEFAULT_PORT: u16 = 53;

/// 解析器配置
///
/// 由调度器构造一次后显式传入各组件，不存在全局解析器状态。
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// 指定的DNS服务器，为空时使用系统解析配置
    pub servers: Vec<IpAddr>,
    /// DNS服务器端口
    pub port: u16,
    /// 单次查询超时
    pub timeout: Duration,
    /// 每次查询的尝试次数
    pub attempts: usize,
    /// 同时进行的最大查询数
    pub concurrency: usize,
    /// 每秒最大查询数，None 表示不限速
    pub rate_limit: Option<u32>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            servers: Vec::new(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            attempts: 1,
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit: None,
        }
    }
}

impl ResolverConfig {
    /// 返回使用指定服务器的配置副本
    pub fn with_servers(&self, servers: Vec<IpAddr>) -> Self {
        ResolverConfig {
            servers,
            ..self.clone()
        }
    }
}

/// 引擎依赖的DNS查询能力
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// 查询地址记录，按服务器返回顺序
    async fn lookup_addresses(&self, name: &str) -> Result<Vec<IpAddr>, LookupError>;

    /// 查询域的 NS 记录主机名，`use_soa` 时返回 SOA 的主服务器
    async fn lookup_nameserver_hosts(
        &self,
        zone: &str,
        use_soa: bool,
    ) -> Result<Vec<String>, LookupError>;
}

/// 基于 trust-dns 的解析器
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        let opts = build_opts(config);

        let setup = if config.servers.is_empty() {
            match trust_dns_resolver::system_conf::read_system_conf() {
                // 丢弃搜索域，候选域名总是完整域名
                Ok((system, _)) => ServerSetup::from_parts(None, vec![], system.name_servers().to_vec()),
                Err(e) => {
                    warn!("读取系统DNS配置失败，使用默认公共DNS: {}", e);
                    ServerSetup::default()
                }
            }
        } else {
            let group = NameServerConfigGroup::from_ips_clear(&config.servers, config.port, true);
            ServerSetup::from_parts(None, vec![], group)
        };

        debug!("DNS服务器: {:?}", setup.name_servers());

        DnsResolver {
            resolver: TokioAsyncResolver::tokio(setup, opts),
        }
    }
}

fn build_opts(config: &ResolverConfig) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = config.timeout;
    opts.attempts = config.attempts.max(1);
    opts.ip_strategy = LookupIpStrategy::Ipv4Only;
    opts
}

#[async_trait]
impl DnsLookup for DnsResolver {
    async fn lookup_addresses(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
        let response = self.resolver.lookup_ip(name).await?;
        let addresses: Vec<IpAddr> = response.iter().collect();

        if addresses.is_empty() {
            return Err(LookupError::not_found(format!("{} 没有地址记录", name)));
        }
        Ok(addresses)
    }

    async fn lookup_nameserver_hosts(
        &self,
        zone: &str,
        use_soa: bool,
    ) -> Result<Vec<String>, LookupError> {
        let record_type = if use_soa { RecordType::SOA } else { RecordType::NS };
        let response = self.resolver.lookup(zone, record_type).await?;

        let mut hosts = Vec::new();
        for record in response.iter() {
            match record {
                RData::NS(ns) => hosts.push(ns.to_string()),
                RData::SOA(soa) => hosts.push(soa.mname().to_string()),
                _ => {}
            }
        }
        Ok(hosts)
    }
}

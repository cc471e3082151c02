use log::{debug, info};
use std::net::IpAddr;

use crate::dns_resolver::DnsLookup;
use crate::error::{EnumError, FailureReason};
use crate::model::NameserverEndpoint;

/// 定位域的权威名称服务器
///
/// 查询 NS 记录（或 SOA 主服务器），再逐个解析主机名的 A 记录。
/// 结果顺序与 NS/SOA 记录返回顺序一致，同一主机内按 A 记录顺序。
pub async fn locate<L>(
    lookup: &L,
    zone: &str,
    use_soa: bool,
) -> Result<Vec<NameserverEndpoint>, EnumError>
where
    L: DnsLookup + ?Sized,
{
    let hosts = match lookup.lookup_nameserver_hosts(zone, use_soa).await {
        Ok(hosts) => hosts,
        Err(e) if e.reason == FailureReason::NotFound => {
            return Err(EnumError::NoNameserverFound {
                zone: zone.to_string(),
            })
        }
        Err(e) => {
            return Err(EnumError::ResolutionError {
                zone: zone.to_string(),
                source: e,
            })
        }
    };

    let mut endpoints = Vec::new();
    for host in hosts {
        match lookup.lookup_addresses(&host).await {
            Ok(addresses) => {
                for address in addresses {
                    endpoints.push(NameserverEndpoint::new(host.clone(), address));
                }
            }
            // 没有地址的名称服务器直接跳过
            Err(e) if e.reason == FailureReason::NotFound => {
                debug!("名称服务器 {} 没有A记录，跳过", host);
            }
            Err(e) => {
                return Err(EnumError::ResolutionError {
                    zone: zone.to_string(),
                    source: e,
                })
            }
        }
    }

    if endpoints.is_empty() {
        return Err(EnumError::NoNameserverFound {
            zone: zone.to_string(),
        });
    }

    info!(
        "域 {} 的名称服务器: {}",
        zone,
        endpoints
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(endpoints)
}

/// 把用户指定的服务器（IP或主机名）转换为端点
pub async fn endpoints_from_override<L>(
    lookup: &L,
    server: &str,
) -> Result<Vec<NameserverEndpoint>, EnumError>
where
    L: DnsLookup + ?Sized,
{
    let server = server.trim();
    if server.is_empty() {
        return Err(EnumError::InvalidServer(server.to_string()));
    }

    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(vec![NameserverEndpoint::new(server, ip)]);
    }

    match lookup.lookup_addresses(server).await {
        Ok(addresses) if !addresses.is_empty() => Ok(addresses
            .into_iter()
            .map(|address| NameserverEndpoint::new(server, address))
            .collect()),
        Ok(_) => Err(EnumError::InvalidServer(server.to_string())),
        Err(e) => Err(EnumError::InvalidServer(format!("{} ({})", server, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticLookup {
        hosts: Result<Vec<String>, LookupError>,
        addresses: HashMap<String, Result<Vec<IpAddr>, LookupError>>,
    }

    #[async_trait]
    impl DnsLookup for StaticLookup {
        async fn lookup_addresses(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
            self.addresses
                .get(name)
                .cloned()
                .unwrap_or_else(|| Err(LookupError::not_found(name)))
        }

        async fn lookup_nameserver_hosts(
            &self,
            _zone: &str,
            _use_soa: bool,
        ) -> Result<Vec<String>, LookupError> {
            self.hosts.clone()
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_locate_preserves_order() {
        let mut addresses = HashMap::new();
        addresses.insert("ns1.example.com.".to_string(), Ok(vec![ip("10.0.0.1"), ip("10.0.0.2")]));
        addresses.insert("ns2.example.com.".to_string(), Ok(vec![ip("10.0.0.3")]));
        let lookup = StaticLookup {
            hosts: Ok(vec!["ns1.example.com.".to_string(), "ns2.example.com.".to_string()]),
            addresses,
        };

        let endpoints = locate(&lookup, "example.com", false).await.unwrap();
        let ips: Vec<IpAddr> = endpoints.iter().map(|e| e.address).collect();

        assert_eq!(ips, vec![ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.3")]);
        assert_eq!(endpoints[2].host, "ns2.example.com.");
    }

    #[tokio::test]
    async fn test_locate_empty_is_no_nameserver() {
        let lookup = StaticLookup {
            hosts: Ok(vec!["ns1.example.com.".to_string()]),
            addresses: HashMap::new(),
        };

        let err = locate(&lookup, "example.com", true).await.unwrap_err();
        assert!(matches!(err, EnumError::NoNameserverFound { .. }));
    }

    #[tokio::test]
    async fn test_locate_nxdomain_is_no_nameserver() {
        let lookup = StaticLookup {
            hosts: Err(LookupError::not_found("NXDOMAIN")),
            addresses: HashMap::new(),
        };

        let err = locate(&lookup, "missing.test", true).await.unwrap_err();
        assert!(matches!(err, EnumError::NoNameserverFound { .. }));
    }

    #[tokio::test]
    async fn test_locate_timeout_is_resolution_error() {
        let lookup = StaticLookup {
            hosts: Err(LookupError::timeout("request timed out")),
            addresses: HashMap::new(),
        };

        let err = locate(&lookup, "example.com", false).await.unwrap_err();
        match err {
            EnumError::ResolutionError { source, .. } => {
                assert_eq!(source.reason, FailureReason::Timeout)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_override_ip_and_hostname() {
        let mut addresses = HashMap::new();
        addresses.insert("dns.local".to_string(), Ok(vec![ip("192.168.1.53")]));
        let lookup = StaticLookup {
            hosts: Ok(vec![]),
            addresses,
        };

        let direct = endpoints_from_override(&lookup, "8.8.8.8").await.unwrap();
        assert_eq!(direct, vec![NameserverEndpoint::new("8.8.8.8", ip("8.8.8.8"))]);

        let named = endpoints_from_override(&lookup, "dns.local").await.unwrap();
        assert_eq!(named[0].address, ip("192.168.1.53"));

        let missing = endpoints_from_override(&lookup, "nowhere.local").await;
        assert!(matches!(missing, Err(EnumError::InvalidServer(_))));
    }
}

use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

use crate::error::FailureReason;

/// 名称服务器端点：解析得到的IP以及它来自的主机名
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameserverEndpoint {
    pub host: String,
    pub address: IpAddr,
}

impl NameserverEndpoint {
    pub fn new(host: impl Into<String>, address: IpAddr) -> Self {
        NameserverEndpoint {
            host: host.into(),
            address,
        }
    }
}

impl fmt::Display for NameserverEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.host, self.address)
    }
}

/// 单个候选子域名的查询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolutionOutcome {
    Resolved {
        fqdn: String,
        addresses: Vec<IpAddr>,
    },
    Failed {
        fqdn: String,
        reason: FailureReason,
    },
}

impl ResolutionOutcome {
    pub fn fqdn(&self) -> &str {
        match self {
            ResolutionOutcome::Resolved { fqdn, .. } => fqdn,
            ResolutionOutcome::Failed { fqdn, .. } => fqdn,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            ResolutionOutcome::Failed { reason, .. } => Some(*reason),
            ResolutionOutcome::Resolved { .. } => None,
        }
    }
}

/// 区域传送得到的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneRecord {
    pub name: String,
    pub record_type: String,
    pub ttl: u32,
    pub data: String,
}

impl fmt::Display for ZoneRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.name, self.ttl, self.record_type, self.data)
    }
}

/// 区域传送结果，失败也是正常的返回值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ZoneTransferResult {
    Transferred { records: Vec<ZoneRecord> },
    Unavailable { reason: String },
}

impl ZoneTransferResult {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ZoneTransferResult::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_transferred(&self) -> bool {
        matches!(self, ZoneTransferResult::Transferred { .. })
    }
}

/// 拼接完整域名：`candidate.zone`
pub fn build_fqdn(candidate: &str, zone: &str) -> String {
    format!("{}.{}", candidate, zone.trim_end_matches('.'))
}

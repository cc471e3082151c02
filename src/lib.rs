//! # rdnsenum
//!
//! 基于Rust实现的DNS子域名枚举工具库。
//!
//! ## 特性
//!
//! - 🔁 **区域传送**: 枚举前先尝试对SOA主服务器（或NS服务器）做AXFR
//! - 🚀 **并发查询**: 基于tokio的有界并发，可选每秒查询数限制
//! - 🛡️ **容错**: 超时、NXDOMAIN、SERVFAIL等单个失败不会中断整批查询
//! - 📋 **有序结果**: 输出顺序与字典顺序一致，支持JSON和纯文本
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use rdnsenum::enumerate_subdomains;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let candidates = vec!["www".to_string(), "mail".to_string()];
//!     let result = enumerate_subdomains("example.com", candidates, None).await?;
//!
//!     for (fqdn, addresses) in result.iter() {
//!         println!("{} -> {:?}", fqdn, addresses);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## 高级配置
//!
//! ```rust,no_run
//! use rdnsenum::{EnumerationConfig, ResolverConfig, SubdomainEnumerator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EnumerationConfig {
//!         zone: "example.com".to_string(),
//!         candidates: vec!["www".to_string()],
//!         server: Some("8.8.8.8".to_string()),
//!         skip_transfer: true,
//!         resolver: ResolverConfig {
//!             concurrency: 20,
//!             rate_limit: Some(100),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let report = SubdomainEnumerator::new(config).run().await?;
//!     println!("发现 {} 个子域名", report.result.len());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod aggregate;
pub mod api;
pub mod candidate;
pub mod dns_resolver;
pub mod error;
pub mod input;
pub mod limiter;
pub mod logger;
pub mod model;
pub mod nameserver;
pub mod output;
pub mod zone_transfer;

// 重新导出主要的公共API
pub use api::{
    enumerate_subdomains, EnumerationConfig, EnumerationReport, RunState, SubdomainEnumerator,
};

pub use aggregate::{aggregate, EnumerationResult};
pub use candidate::{CandidateResolver, ResolveBatch};
pub use dns_resolver::{DnsLookup, DnsResolver, ResolverConfig};
pub use error::{EnumError, FailureReason, LookupError};
pub use input::{read_candidates, OutputFormat};
pub use model::{NameserverEndpoint, ResolutionOutcome, ZoneRecord, ZoneTransferResult};
pub use nameserver::locate;
pub use output::{render, write_output};
pub use zone_transfer::{AxfrClient, ZoneTransfer};

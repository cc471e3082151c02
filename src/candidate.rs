//! 候选子域名解析引擎
//!
//! 每个候选标签拼接成完整域名后独立查询，由信号量限制同时在途的查询数，
//! 可选的速率限制器控制发送节奏。任何单个候选的失败只会变成
//! `ResolutionOutcome::Failed`，不会中断整批任务。输出顺序与输入顺序一致。

use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::dns_resolver::{DnsLookup, ResolverConfig};
use crate::error::FailureReason;
use crate::limiter::RateLimiter;
use crate::model::{build_fqdn, ResolutionOutcome};

lazy_static! {
    static ref LABEL_RE: Regex = Regex::new(r"^[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?$").unwrap();
}

const MAX_FQDN_LEN: usize = 253;

/// 检查候选标签（可以包含多级，如 `a.b`）与完整域名是否合法
pub fn is_valid_candidate(candidate: &str, fqdn: &str) -> bool {
    if candidate.is_empty() || fqdn.len() > MAX_FQDN_LEN {
        return false;
    }
    candidate.split('.').all(|label| LABEL_RE.is_match(label))
}

/// 一批查询的结果
#[derive(Debug, Clone)]
pub struct ResolveBatch {
    /// 已完成的结果，按输入顺序
    pub outcomes: Vec<ResolutionOutcome>,
    /// 是否在完成前被取消
    pub cancelled: bool,
}

/// 候选子域名解析器
pub struct CandidateResolver {
    lookup: Arc<dyn DnsLookup>,
    concurrency: usize,
    timeout: Duration,
    limiter: Option<Arc<RateLimiter>>,
}

impl CandidateResolver {
    pub fn new(lookup: Arc<dyn DnsLookup>, config: &ResolverConfig) -> Self {
        CandidateResolver {
            lookup,
            concurrency: config.concurrency.clamp(1, Semaphore::MAX_PERMITS),
            timeout: config.timeout,
            limiter: config.rate_limit.map(|qps| Arc::new(RateLimiter::new(qps))),
        }
    }

    /// 解析全部候选，每个候选对应一个结果
    pub async fn resolve(&self, zone: &str, candidates: &[String]) -> Vec<ResolutionOutcome> {
        self.resolve_with_cancel(zone, candidates, CancellationToken::new())
            .await
            .outcomes
    }

    /// 可取消的解析；取消后未完成的查询被放弃，不产生结果
    pub async fn resolve_with_cancel(
        &self,
        zone: &str,
        candidates: &[String],
        cancel: CancellationToken,
    ) -> ResolveBatch {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let fqdn = build_fqdn(candidate, zone);
            let valid = is_valid_candidate(candidate, &fqdn);
            let semaphore = semaphore.clone();
            let lookup = self.lookup.clone();
            let limiter = self.limiter.clone();
            let cancel = cancel.clone();
            let query_timeout = self.timeout;

            let task = tokio::spawn(async move {
                if !valid {
                    debug!("{}: 非法的域名标签", fqdn);
                    return Some(ResolutionOutcome::Failed {
                        fqdn,
                        reason: FailureReason::Other,
                    });
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    outcome = async {
                        let _permit = semaphore.acquire_owned().await.ok()?;
                        if let Some(limiter) = limiter {
                            limiter.acquire().await;
                        }
                        Some(query_candidate(lookup.as_ref(), fqdn, query_timeout).await)
                    } => outcome,
                }
            });
            tasks.push(task);
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (task, candidate) in tasks.into_iter().zip(candidates) {
            match task.await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => {
                    debug!("查询任务异常退出: {}", e);
                    outcomes.push(ResolutionOutcome::Failed {
                        fqdn: build_fqdn(candidate, zone),
                        reason: FailureReason::Other,
                    });
                }
            }
        }

        let cancelled = outcomes.len() < candidates.len();
        info!(
            "完成 {}/{} 个候选查询，成功 {} 个",
            outcomes.len(),
            candidates.len(),
            outcomes.iter().filter(|o| o.is_resolved()).count()
        );

        ResolveBatch {
            outcomes,
            cancelled,
        }
    }
}

/// 查询单个完整域名并分类结果
async fn query_candidate(
    lookup: &dyn DnsLookup,
    fqdn: String,
    query_timeout: Duration,
) -> ResolutionOutcome {
    match tokio::time::timeout(query_timeout, lookup.lookup_addresses(&fqdn)).await {
        Ok(Ok(addresses)) if !addresses.is_empty() => ResolutionOutcome::Resolved { fqdn, addresses },
        Ok(Ok(_)) => {
            debug!("{}: 没有地址记录", fqdn);
            ResolutionOutcome::Failed {
                fqdn,
                reason: FailureReason::NotFound,
            }
        }
        Ok(Err(e)) => {
            debug!("{}: {}", fqdn, e);
            ResolutionOutcome::Failed {
                fqdn,
                reason: e.reason,
            }
        }
        Err(_) => {
            debug!("{}: 查询超时", fqdn);
            ResolutionOutcome::Failed {
                fqdn,
                reason: FailureReason::Timeout,
            }
        }
    }
}

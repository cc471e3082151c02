use serde::Serialize;
use std::fmt;
use thiserror::Error;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::error::ProtoErrorKind;
use trust_dns_resolver::proto::op::ResponseCode;

/// 单个查询失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// 超过配置的查询超时
    Timeout,
    /// 域名不存在，或存在但没有地址记录
    NotFound,
    /// 服务器返回错误状态 (SERVFAIL, REFUSED ...)
    ServerError,
    /// 其他错误，包括非法的候选标签
    Other,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::NotFound => "not-found",
            FailureReason::ServerError => "server-error",
            FailureReason::Other => "other",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次DNS查询的失败，已经完成分类
#[derive(Debug, Clone, Error)]
#[error("{reason}: {message}")]
pub struct LookupError {
    pub reason: FailureReason,
    pub message: String,
}

impl LookupError {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        LookupError {
            reason,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureReason::NotFound, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Timeout, message)
    }
}

impl From<ResolveError> for LookupError {
    fn from(err: ResolveError) -> Self {
        let reason = classify_resolve_error(&err);
        LookupError {
            reason,
            message: err.to_string(),
        }
    }
}

/// 根据解析库返回的错误类型与响应码判断失败原因
pub fn classify_resolve_error(err: &ResolveError) -> FailureReason {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            // NOERROR 但没有地址记录也按不存在处理
            ResponseCode::NXDomain | ResponseCode::NoError => FailureReason::NotFound,
            _ => FailureReason::ServerError,
        },
        ResolveErrorKind::Timeout => FailureReason::Timeout,
        ResolveErrorKind::Proto(proto) => match proto.kind() {
            ProtoErrorKind::Timeout => FailureReason::Timeout,
            _ => FailureReason::Other,
        },
        _ => FailureReason::Other,
    }
}

/// 枚举流程中的致命错误
#[derive(Debug, Error)]
pub enum EnumError {
    #[error("未找到域 {zone} 的名称服务器")]
    NoNameserverFound { zone: String },

    #[error("查找域 {zone} 的名称服务器失败: {source}")]
    ResolutionError {
        zone: String,
        #[source]
        source: LookupError,
    },

    #[error("无效的DNS服务器: {0}")]
    InvalidServer(String),

    #[error("枚举在开始解析前被取消")]
    Cancelled,

    #[error("I/O错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

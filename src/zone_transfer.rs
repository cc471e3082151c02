use async_trait::async_trait;
use log::debug;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use trust_dns_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use trust_dns_resolver::proto::rr::{Name, Record, RecordType};

use crate::dns_resolver::DEFAULT_PORT;
use crate::model::{NameserverEndpoint, ZoneRecord, ZoneTransferResult};

/// 单次区域传送的默认超时
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(3);

/// 区域传送能力
#[async_trait]
pub trait ZoneTransfer: Send + Sync {
    /// 尝试从指定端点传送整个区域，任何失败都以 `Unavailable` 返回
    async fn attempt_transfer(
        &self,
        zone: &str,
        endpoint: &NameserverEndpoint,
        timeout: Duration,
    ) -> ZoneTransferResult;
}

/// 基于 TCP 的 AXFR 客户端
#[derive(Debug, Clone)]
pub struct AxfrClient {
    port: u16,
    max_records: usize,
}

impl Default for AxfrClient {
    fn default() -> Self {
        AxfrClient {
            port: DEFAULT_PORT,
            max_records: 100_000,
        }
    }
}

impl AxfrClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(port: u16) -> Self {
        AxfrClient {
            port,
            ..Self::default()
        }
    }

    async fn transfer(
        &self,
        zone: &str,
        server: SocketAddr,
        limit: Duration,
    ) -> Result<Vec<ZoneRecord>, String> {
        let zone_name = Name::from_str(zone).map_err(|e| format!("无效的域名 {}: {}", zone, e))?;

        let stream = timeout(limit, TcpStream::connect(server))
            .await
            .map_err(|_| "连接超时".to_string())?
            .map_err(|e| format!("连接失败: {}", e))?;
        let (mut reader, mut writer) = stream.into_split();

        let request_id = rand::random::<u16>();
        let mut request = Message::new();
        request.set_id(request_id);
        request.set_message_type(MessageType::Query);
        request.set_op_code(OpCode::Query);
        request.add_query(Query::query(zone_name, RecordType::AXFR));
        let payload = request.to_vec().map_err(|e| format!("编码请求失败: {}", e))?;

        // TCP DNS 报文带两字节长度前缀
        let mut frame = Vec::with_capacity(payload.len() + 2);
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        frame.extend_from_slice(&payload);
        writer
            .write_all(&frame)
            .await
            .map_err(|e| format!("发送请求失败: {}", e))?;
        writer.flush().await.map_err(|e| format!("发送请求失败: {}", e))?;

        let mut records = Vec::new();
        let mut soa_count = 0;

        while soa_count < 2 {
            let mut len_bytes = [0u8; 2];
            match timeout(limit, reader.read_exact(&mut len_bytes)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Err("连接在传送完成前关闭".to_string())
                }
                Ok(Err(e)) => return Err(format!("读取响应失败: {}", e)),
                Err(_) => return Err("读取响应超时".to_string()),
            }

            let mut buffer = vec![0u8; u16::from_be_bytes(len_bytes) as usize];
            timeout(limit, reader.read_exact(&mut buffer))
                .await
                .map_err(|_| "读取响应超时".to_string())?
                .map_err(|e| format!("读取响应失败: {}", e))?;

            let response = Message::from_vec(&buffer).map_err(|e| format!("响应格式错误: {}", e))?;
            if response.id() != request_id {
                return Err(format!("响应ID不匹配: 期望 {}, 收到 {}", request_id, response.id()));
            }
            if response.message_type() != MessageType::Response {
                return Err("收到的报文不是响应".to_string());
            }
            match response.response_code() {
                ResponseCode::NoError => {}
                ResponseCode::Refused => return Err("服务器拒绝区域传送 (REFUSED)".to_string()),
                ResponseCode::NotAuth => return Err("服务器不是该域的权威服务器 (NOTAUTH)".to_string()),
                other => return Err(format!("服务器返回错误: {}", other)),
            }

            if response.answers().is_empty() {
                return Err("服务器返回空的传送响应".to_string());
            }

            for record in response.answers() {
                if record.record_type() == RecordType::SOA {
                    soa_count += 1;
                } else if records.is_empty() {
                    return Err("传送未以SOA记录开始".to_string());
                }

                records.push(to_zone_record(record));
                if soa_count >= 2 {
                    break;
                }
                if records.len() >= self.max_records {
                    return Err(format!("记录数超过上限 {}", self.max_records));
                }
            }
        }

        Ok(records)
    }
}

fn to_zone_record(record: &Record) -> ZoneRecord {
    ZoneRecord {
        name: record.name().to_string(),
        record_type: record.record_type().to_string(),
        ttl: record.ttl(),
        data: record.data().map(|d| d.to_string()).unwrap_or_default(),
    }
}

#[async_trait]
impl ZoneTransfer for AxfrClient {
    async fn attempt_transfer(
        &self,
        zone: &str,
        endpoint: &NameserverEndpoint,
        timeout: Duration,
    ) -> ZoneTransferResult {
        let server = SocketAddr::new(endpoint.address, self.port);
        debug!("向 {} 请求 {} 的区域传送", server, zone);

        match self.transfer(zone, server, timeout).await {
            Ok(records) => ZoneTransferResult::Transferred { records },
            Err(reason) => ZoneTransferResult::Unavailable { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn test_default_port() {
        let client = AxfrClient::new();
        assert_eq!(client.port, 53);
        assert_eq!(AxfrClient::with_port(5353).port, 5353);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // 绑定后立即释放，得到一个没有监听的端口
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = AxfrClient::with_port(port);
        let endpoint = NameserverEndpoint::new("localhost", IpAddr::from([127, 0, 0, 1]));
        let result = client
            .attempt_transfer("example.com", &endpoint, Duration::from_secs(1))
            .await;

        assert!(matches!(result, ZoneTransferResult::Unavailable { .. }));
    }
}

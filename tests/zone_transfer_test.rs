use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use trust_dns_resolver::proto::op::{Message, MessageType, ResponseCode};
use trust_dns_resolver::proto::rr::rdata::{A, SOA};
use trust_dns_resolver::proto::rr::{Name, RData, Record};

use rdnsenum::{AxfrClient, NameserverEndpoint, ZoneTransfer, ZoneTransferResult};

/// 启动一个只处理一次请求的 DNS-over-TCP 服务，返回端口
async fn serve_once<F>(respond: F) -> u16
where
    F: FnOnce(&Message) -> Vec<Message> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut len_bytes = [0u8; 2];
        stream.read_exact(&mut len_bytes).await.unwrap();
        let mut buffer = vec![0u8; u16::from_be_bytes(len_bytes) as usize];
        stream.read_exact(&mut buffer).await.unwrap();
        let request = Message::from_vec(&buffer).unwrap();

        for response in respond(&request) {
            let payload = response.to_vec().unwrap();
            stream
                .write_all(&(payload.len() as u16).to_be_bytes())
                .await
                .unwrap();
            stream.write_all(&payload).await.unwrap();
        }
        stream.flush().await.unwrap();
    });

    port
}

fn reply_to(request: &Message, code: ResponseCode) -> Message {
    let mut response = Message::new();
    response.set_id(request.id());
    response.set_message_type(MessageType::Response);
    response.set_response_code(code);
    response.add_queries(request.queries().to_vec());
    response
}

fn soa_record(zone: &Name) -> Record {
    let soa = SOA::new(
        Name::from_str("ns1.example.com.").unwrap(),
        Name::from_str("hostmaster.example.com.").unwrap(),
        2024010101,
        7200,
        3600,
        1209600,
        300,
    );
    Record::from_rdata(zone.clone(), 3600, RData::SOA(soa))
}

fn localhost() -> NameserverEndpoint {
    NameserverEndpoint::new("localhost", IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[tokio::test]
async fn test_refused_transfer_is_unavailable() {
    let port = serve_once(|request| vec![reply_to(request, ResponseCode::Refused)]).await;

    let client = AxfrClient::with_port(port);
    let result = client
        .attempt_transfer("example.com", &localhost(), Duration::from_secs(2))
        .await;

    match result {
        ZoneTransferResult::Unavailable { reason } => assert!(reason.contains("REFUSED")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_open_transfer_returns_records() {
    let port = serve_once(|request| {
        let zone = Name::from_str("example.com.").unwrap();
        let www = Name::from_str("www.example.com.").unwrap();
        let mail = Name::from_str("mail.example.com.").unwrap();

        // 记录分两个报文发送
        let mut first = reply_to(request, ResponseCode::NoError);
        first.add_answer(soa_record(&zone));
        first.add_answer(Record::from_rdata(www, 300, RData::A(A(Ipv4Addr::new(192, 0, 2, 10)))));

        let mut second = reply_to(request, ResponseCode::NoError);
        second.add_answer(Record::from_rdata(mail, 300, RData::A(A(Ipv4Addr::new(192, 0, 2, 25)))));
        second.add_answer(soa_record(&zone));

        vec![first, second]
    })
    .await;

    let client = AxfrClient::with_port(port);
    let result = client
        .attempt_transfer("example.com", &localhost(), Duration::from_secs(2))
        .await;

    match result {
        ZoneTransferResult::Transferred { records } => {
            assert_eq!(records.len(), 4);
            assert_eq!(records[0].record_type, "SOA");
            assert_eq!(records[1].name, "www.example.com.");
            assert_eq!(records[1].data, "192.0.2.10");
            assert_eq!(records[3].record_type, "SOA");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_truncated_stream_is_unavailable() {
    // 只发送起始 SOA 就关闭连接
    let port = serve_once(|request| {
        let zone = Name::from_str("example.com.").unwrap();
        let mut only = reply_to(request, ResponseCode::NoError);
        only.add_answer(soa_record(&zone));
        vec![only]
    })
    .await;

    let client = AxfrClient::with_port(port);
    let result = client
        .attempt_transfer("example.com", &localhost(), Duration::from_secs(2))
        .await;

    assert!(matches!(result, ZoneTransferResult::Unavailable { .. }));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let client = AxfrClient::with_port(port);
    let result = client
        .attempt_transfer("example.com", &localhost(), Duration::from_millis(200))
        .await;

    assert!(matches!(result, ZoneTransferResult::Unavailable { .. }));
}

#[tokio::test]
async fn test_mismatched_id_is_unavailable() {
    let port = serve_once(|request| {
        let zone = Name::from_str("example.com.").unwrap();
        let mut stray = reply_to(request, ResponseCode::NoError);
        stray.set_id(request.id().wrapping_add(1));
        stray.add_answer(soa_record(&zone));
        stray.add_answer(soa_record(&zone));
        vec![stray]
    })
    .await;

    let client = AxfrClient::with_port(port);
    let result = client
        .attempt_transfer("example.com", &localhost(), Duration::from_secs(2))
        .await;

    match result {
        ZoneTransferResult::Unavailable { reason } => assert!(reason.contains("ID")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_echoed_query_is_unavailable() {
    // 服务器原样回显请求报文
    let port = serve_once(|request| {
        let zone = Name::from_str("example.com.").unwrap();
        let mut echo = reply_to(request, ResponseCode::NoError);
        echo.set_message_type(MessageType::Query);
        echo.add_answer(soa_record(&zone));
        echo.add_answer(soa_record(&zone));
        vec![echo]
    })
    .await;

    let client = AxfrClient::with_port(port);
    let result = client
        .attempt_transfer("example.com", &localhost(), Duration::from_secs(2))
        .await;

    assert!(matches!(result, ZoneTransferResult::Unavailable { .. }));
}

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// 查询速率限制器
///
/// 所有工作任务共享同一个限制器，按固定间隔发放查询时隙。
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// `queries_per_sec` 为 0 时按 1 处理
    pub fn new(queries_per_sec: u32) -> Self {
        let qps = queries_per_sec.max(1);
        RateLimiter {
            interval: Duration::from_secs(1) / qps,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 等待下一个可用的发送时隙
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.interval;
            slot
        };
        sleep_until(slot).await;
    }
}

use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, time::Instant};

/// Spaces requests at least `1 / rps` apart. Clones share the same budget.
#[derive(Debug, Clone)]
pub struct RateLimiter(Arc<Mutex<Inner>>);

#[derive(Debug)]
struct Inner {
    interval: Duration,
    last_req: Option<Instant>,
}

impl RateLimiter {
    pub fn new(rps: f32) -> Self {
        let interval = if rps > 0.0 {
            Duration::from_secs_f32(1.0 / rps)
        } else {
            Duration::ZERO
        };
        Self(Arc::new(Mutex::new(Inner {
            interval,
            last_req: None,
        })))
    }

    pub async fn request(&self) {
        let mut inner = self.0.lock().await;
        if let Some(last_req) = inner.last_req {
            let elapsed = last_req.elapsed();
            if elapsed < inner.interval {
                tokio::time::sleep(inner.interval - elapsed).await;
            }
        }
        inner.last_req = Some(Instant::now());
    }
}

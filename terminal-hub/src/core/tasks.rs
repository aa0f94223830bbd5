//! 后台任务管理
//!
//! The hub runs a small, fixed set of background tasks (the session sweep
//! today). All share one [`CancellationToken`]; [`BackgroundTasks::shutdown`]
//! cancels it and joins every task.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

struct RegisteredTask {
    name: &'static str,
    /// `None` for one-off workers
    period: Option<Duration>,
    handle: JoinHandle<()>,
}

/// 后台任务管理器
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取取消令牌（任务内部监听 shutdown 信号）
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run `tick` every `period` until shutdown
    ///
    /// The first tick fires immediately. A slow tick delays the next one
    /// instead of bursting to catch up.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.clone();
        let task = async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => tick().await,
                }
            }
        };
        self.register(name, Some(period), task);
    }

    /// Spawn a long-running worker; it should watch [`Self::shutdown_token`]
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.register(name, None, future);
    }

    fn register<F>(&mut self, name: &'static str, period: Option<Duration>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.clone();
        // panic 只记录，不影响其他任务
        let guarded = async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if !token.is_cancelled() => {
                    tracing::warn!(task = name, "Background task exited before shutdown");
                }
                Ok(()) => {}
                Err(panic) => {
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(task = name, panic = %msg, "Background task panicked");
                }
            }
        };

        let handle = tokio::spawn(guarded);
        tracing::debug!(task = name, period = ?period, "Registered background task");
        self.tasks.push(RegisteredTask {
            name,
            period,
            handle,
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        for task in &self.tasks {
            match task.period {
                Some(p) => tracing::info!(task = task.name, every_secs = p.as_secs_f64(), "Periodic task running"),
                None => tracing::info!(task = task.name, "Worker running"),
            }
        }
    }

    /// 取消所有任务并等待退出
    pub async fn shutdown(self) {
        tracing::info!(count = self.tasks.len(), "Stopping background tasks");
        self.shutdown.cancel();

        for task in self.tasks {
            if let Err(e) = task.handle.await {
                tracing::error!(task = task.name, error = ?e, "Background task join failed");
            }
        }
    }
}

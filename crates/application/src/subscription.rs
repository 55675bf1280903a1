use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::store::{DataSnapshot, SnapshotStream, StorePath};

/// `on_*` 系列调用返回的订阅句柄
///
/// 调用 [`Subscription::cancel`] 或直接丢弃句柄都会停止后续推送。
/// 取消只在两次推送之间生效，正在执行的回调不会被打断。
#[derive(Debug)]
pub struct Subscription {
    path: StorePath,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    /// 启动监听任务：每个快照先经 `normalize` 转换，返回 `None` 的快照不会交给回调
    pub(crate) fn spawn<T, N, C>(
        label: &'static str,
        path: StorePath,
        mut stream: SnapshotStream,
        mut normalize: N,
        mut callback: C,
    ) -> Self
    where
        T: Send + 'static,
        N: FnMut(DataSnapshot) -> Option<T> + Send + 'static,
        C: FnMut(T) + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let task_path = path.clone();

        let task = tokio::spawn(async move {
            loop {
                let snapshot = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    next = stream.next() => match next {
                        Some(snapshot) => snapshot,
                        None => break,
                    },
                };

                let Some(value) = normalize(snapshot) else {
                    continue;
                };
                if cancelled.is_cancelled() {
                    break;
                }
                callback(value);
            }
            tracing::debug!(subscription = label, path = %task_path, "订阅已停止");
        });

        Self { path, token, task }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }

    /// 停止后续推送
    pub fn cancel(self) {
        self.token.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

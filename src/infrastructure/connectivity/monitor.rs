use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 到達可能性の監視。
///
/// 複数インタフェースの状態を論理ORで1つのboolに畳み込み、変化したときだけ
/// `watch` チャネルへ流す（同じ値の再送はしない）。起動直後はオフライン扱いで、
/// プラットフォーム側のコールバックか能動プローブが状態を供給する。
pub struct ConnectivityMonitor {
    interfaces: Mutex<HashMap<String, bool>>,
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            interfaces: Mutex::new(HashMap::new()),
            tx,
        }
    }

    /// 最新値を保持するストリームを購読する。
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// 単一インタフェース構成向けのショートハンド。
    pub fn set_online(&self, online: bool) {
        self.set_interface("default", online);
    }

    /// インタフェース1本の到達可能性を更新する。
    /// いずれか1本でも到達可能ならオンラインと判定する。
    pub fn set_interface(&self, name: &str, reachable: bool) {
        let collapsed = {
            let mut interfaces = self
                .interfaces
                .lock()
                .expect("connectivity interface map poisoned");
            interfaces.insert(name.to_string(), reachable);
            interfaces.values().any(|up| *up)
        };

        let changed = self.tx.send_if_modified(|online| {
            if *online != collapsed {
                *online = collapsed;
                true
            } else {
                false
            }
        });

        if changed {
            info!(
                "Connectivity changed: {}",
                if collapsed { "online" } else { "offline" }
            );
        } else {
            debug!("Connectivity unchanged ({}: {})", name, reachable);
        }
    }

    /// TCP接続による能動プローブ。`host:port` のリストを周期的に叩いて
    /// インタフェース状態として反映する。
    pub fn spawn_probe_loop(
        self: &Arc<Self>,
        targets: Vec<String>,
        interval_secs: u64,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                for target in &targets {
                    let reachable = probe(target).await;
                    monitor.set_interface(target, reachable);
                }
            }
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

async fn probe(target: &str) -> bool {
    matches!(
        tokio::time::timeout(
            Duration::from_secs(2),
            tokio::net::TcpStream::connect(target),
        )
        .await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_offline() {
        let monitor = ConnectivityMonitor::new();
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_any_reachable_interface_means_online() {
        let monitor = ConnectivityMonitor::new();

        monitor.set_interface("wifi", true);
        monitor.set_interface("cellular", false);
        assert!(monitor.is_online());

        monitor.set_interface("wifi", false);
        assert!(!monitor.is_online());

        monitor.set_interface("cellular", true);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_stream_emits_only_on_transitions() {
        let monitor = ConnectivityMonitor::new();
        let mut rx = monitor.subscribe();

        // 同じ値の再設定は通知されない
        monitor.set_online(false);
        monitor.set_interface("wifi", false);
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(true);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        // オンラインのままインタフェースが増えても通知されない
        monitor.set_interface("cellular", true);
        assert!(!rx.has_changed().unwrap());

        // 片方が落ちてもまだオンライン
        monitor.set_interface("cellular", false);
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(false);
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }
}

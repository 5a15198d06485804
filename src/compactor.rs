//! Background WAL compaction.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically rewrite the WAL once enough appends have accumulated since
/// the last compaction. Runs until the process exits.
pub async fn run(engine: Arc<Engine>, threshold: u64) {
    let mut tick = tokio::time::interval(SWEEP_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => tracing::info!(appends, "WAL compacted"),
            Err(e) => tracing::warn!("WAL compaction failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BookingPolicy, Engine, NewEnrollee};
    use crate::model::Role;
    use chrono::NaiveDate;

    #[tokio::test(start_paused = true)]
    async fn compacts_once_the_append_threshold_is_reached() {
        let dir = std::env::temp_dir().join("prenota_test_compactor");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sweep.wal");
        let _ = std::fs::remove_file(&path);

        let engine = Arc::new(Engine::open(path, BookingPolicy::default()).unwrap());
        for i in 0..3 {
            engine
                .register_enrollee(NewEnrollee {
                    email: format!("e{i}@club.it"),
                    name: "Nome".into(),
                    surname: "Cognome".into(),
                    birth_date: NaiveDate::from_ymd_opt(1995, 4, 12).unwrap(),
                    role: Role::Student,
                })
                .await
                .unwrap();
        }
        assert_eq!(engine.wal_appends_since_compact().await, 3);

        tokio::spawn(run(engine.clone(), 2));
        tokio::time::sleep(SWEEP_INTERVAL * 2).await;

        assert_eq!(engine.wal_appends_since_compact().await, 0);
    }
}

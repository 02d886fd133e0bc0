//! # Integration Tests
//!
//! Cross-crate and end-to-end tests:
//! - plan file → seeded store → engine wiring
//! - full sync cycles over scripted transports
//! - idempotence, isolation and scheduling properties

#[cfg(test)]
mod plan_tests {
    use config_loader::{PlanFormat, PlanLoader};
    use store::MemoryStore;

    const PLAN: &str = r#"
[engine]
cycle_interval_secs = 30
device_timeout_secs = 5

[policy]
office_start = "09:00"
grace_minutes = 15
utc_offset_minutes = 0

[[devices]]
id = "gate-1"
name = "Main Gate"
device_type = "mock"

[[devices]]
id = "spare"
name = "Spare Terminal"
device_type = "zk_net"
active = false

[[employees]]
id = 1
name = "A. Rahman"
codes = ["0001", "A-1"]
"#;

    #[tokio::test]
    async fn test_plan_seeds_store() {
        use contracts::SyncStore;

        let plan = PlanLoader::load_from_str(PLAN, PlanFormat::Toml).unwrap();
        let store = MemoryStore::from_plan(&plan);

        let active = store.list_active_devices().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "gate-1");

        // Inactive devices are still in the registry.
        assert!(store.get_device("spare").await.unwrap().is_some());

        // Both codes resolve to the same employee.
        assert_eq!(store.resolve_employee("0001").await.unwrap(), Some(1));
        assert_eq!(store.resolve_employee("A-1").await.unwrap(), Some(1));
        assert_eq!(store.resolve_employee("9999").await.unwrap(), None);

        // The policy row was seeded.
        let policy = store.grace_policy().await.unwrap().unwrap();
        assert_eq!(policy.grace_minutes, 15);

        let config = plan.to_engine_config();
        assert_eq!(config.cycle_interval.as_secs(), 30);
        assert_eq!(config.device_timeout.as_secs(), 5);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use contracts::{
        AttendanceStatus, ConnectionParams, CycleOutcome, Device, DeviceId, EngineConfig,
        PunchDirection, RawPunchEvent, SyncStore,
    };
    use device_gateway::{MockFactory, MockScript};
    use ingestion::LogIngestor;
    use store::MemoryStore;
    use sync_engine::SyncOrchestrator;

    fn device(id: &str) -> Device {
        Device {
            id: DeviceId::from(id),
            name: format!("Device {id}"),
            device_type: "mock".into(),
            connection: ConnectionParams::default(),
            active: true,
            last_sync_at: None,
            last_sync_error: None,
        }
    }

    fn punch(
        device: &str,
        code: &str,
        h: u32,
        m: u32,
        s: u32,
        direction: PunchDirection,
    ) -> RawPunchEvent {
        RawPunchEvent {
            device_id: DeviceId::from(device),
            external_code: code.into(),
            punched_at: Utc.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap(),
            direction,
            payload: Bytes::from_static(b"e2e"),
        }
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap()
    }

    fn engine_config(timeout_ms: u64) -> EngineConfig {
        EngineConfig {
            cycle_interval: Duration::from_secs(60),
            device_timeout: Duration::from_millis(timeout_ms),
            enabled: true,
            active_hours: None,
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_employee_code("0001", 1);
        store.add_employee_code("0002", 2);
        store
    }

    /// Full path: two devices' scripted punches end up as ledger rows with
    /// the right classification, watermarks advanced on both.
    #[tokio::test]
    async fn test_e2e_two_devices_to_ledger() {
        let store = seeded_store();
        store.add_device(device("gate"));
        store.add_device(device("lobby"));

        let factory = Arc::new(MockFactory::new());
        factory.script_device(
            "gate",
            MockScript {
                events: vec![
                    punch("gate", "0001", 9, 5, 0, PunchDirection::In),
                    punch("gate", "0001", 17, 45, 0, PunchDirection::Out),
                    // Duplicate read of the morning punch, 20s later.
                    punch("gate", "0001", 9, 5, 20, PunchDirection::In),
                ],
                ..Default::default()
            },
        );
        factory.script_device(
            "lobby",
            MockScript {
                events: vec![punch("lobby", "0002", 9, 40, 0, PunchDirection::In)],
                ..Default::default()
            },
        );

        let orchestrator =
            SyncOrchestrator::new(Arc::clone(&store), factory, engine_config(1_000));
        let report = orchestrator.sync_all_devices().await;

        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.devices_succeeded, 2);
        assert_eq!(report.totals.stored, 3);
        assert_eq!(report.totals.duplicates, 1);

        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let on_time = store.attendance_for(1, day).await.unwrap().unwrap();
        assert_eq!(on_time.check_in, Some(at(9, 5, 0)));
        assert_eq!(on_time.check_out, Some(at(17, 45, 0)));
        assert_eq!(on_time.status, AttendanceStatus::Present);

        let late = store.attendance_for(2, day).await.unwrap().unwrap();
        assert_eq!(late.check_in, Some(at(9, 40, 0)));
        assert_eq!(late.status, AttendanceStatus::Late);

        for id in ["gate", "lobby"] {
            let row = store.get_device(id).await.unwrap().unwrap();
            assert!(row.last_sync_at.is_some());
            assert!(row.last_sync_error.is_none());
        }
    }

    /// Replaying an identical batch (dedup path plus merge idempotence)
    /// leaves the ledger byte-for-byte unchanged.
    #[tokio::test]
    async fn test_e2e_replay_is_idempotent() {
        let store = seeded_store();
        let ingestor = LogIngestor::new(Arc::clone(&store));
        let gate = DeviceId::from("gate");

        let batch = vec![
            punch("gate", "0001", 9, 5, 0, PunchDirection::In),
            punch("gate", "0001", 17, 45, 0, PunchDirection::Out),
        ];

        let first = ingestor.ingest_batch(&gate, &batch).await;
        assert_eq!(first.stored, 2);

        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let before = store.attendance_for(1, day).await.unwrap().unwrap();

        for _ in 0..3 {
            let replay = ingestor.ingest_batch(&gate, &batch).await;
            assert_eq!(replay.stored, 0);
            assert_eq!(replay.duplicates, 2);
        }

        let after = store.attendance_for(1, day).await.unwrap().unwrap();
        assert_eq!(after.check_in, before.check_in);
        assert_eq!(after.check_out, before.check_out);
        assert_eq!(after.status, before.status);
        assert_eq!(store.log_count(), 2);
    }

    /// Device A times out, device B lands fully; A's error is recorded and
    /// B's punches make it into the ledger.
    #[tokio::test]
    async fn test_e2e_timeout_isolation() {
        let store = seeded_store();
        store.add_device(device("stuck"));
        store.add_device(device("good"));

        let factory = Arc::new(MockFactory::new());
        factory.script_device(
            "stuck",
            MockScript {
                fetch_delay: Some(Duration::from_millis(500)),
                ..Default::default()
            },
        );
        factory.script_device(
            "good",
            MockScript {
                events: vec![punch("good", "0001", 9, 0, 0, PunchDirection::In)],
                ..Default::default()
            },
        );

        let orchestrator = SyncOrchestrator::new(Arc::clone(&store), factory, engine_config(100));
        let report = orchestrator.sync_all_devices().await;

        assert_eq!(report.devices_succeeded, 1);
        assert_eq!(report.devices_failed, 1);

        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(store.attendance_for(1, day).await.unwrap().is_some());

        let stuck = store.get_device("stuck").await.unwrap().unwrap();
        assert!(stuck.last_sync_error.as_deref().unwrap().contains("timed out"));
        assert!(stuck.last_sync_at.is_some());
    }

    /// The scheduler drives repeated cycles; watermarks and dedup keep the
    /// result identical to a single cycle.
    #[tokio::test]
    async fn test_e2e_scheduled_cycles_converge() {
        use scheduler::{JobRunner, JobSchedule, PeriodicJob};

        struct CycleJob {
            orchestrator: Arc<SyncOrchestrator<MemoryStore, MockFactory>>,
        }

        impl PeriodicJob for CycleJob {
            fn name(&self) -> &str {
                "test-sync"
            }

            async fn run_once(&self) {
                let report = self.orchestrator.sync_all_devices().await;
                observability::record_cycle(&report);
            }
        }

        let store = seeded_store();
        store.add_device(device("gate"));

        let factory = Arc::new(MockFactory::new());
        factory.script_device(
            "gate",
            MockScript {
                events: vec![
                    punch("gate", "0001", 9, 5, 0, PunchDirection::In),
                    punch("gate", "0001", 17, 45, 0, PunchDirection::Out),
                ],
                ..Default::default()
            },
        );

        let orchestrator = Arc::new(SyncOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&factory),
            engine_config(1_000),
        ));

        let handle = JobRunner::spawn(
            CycleJob {
                orchestrator: Arc::clone(&orchestrator),
            },
            JobSchedule::every(Duration::from_millis(25)),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.shutdown().await;

        // Several cycles ran; the transports were re-created each time.
        let connects = factory
            .calls_for("gate")
            .iter()
            .filter(|call| call.as_str() == "connect")
            .count();
        assert!(connects >= 2, "expected repeated cycles, got {connects}");

        // But the ledger converged to exactly one row with the right times.
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let record = store.attendance_for(1, day).await.unwrap().unwrap();
        assert_eq!(record.check_in, Some(at(9, 5, 0)));
        assert_eq!(record.check_out, Some(at(17, 45, 0)));
        assert_eq!(store.log_count(), 2);
    }

    /// An unresolved badge never creates state, even through the full
    /// orchestrated path.
    #[tokio::test]
    async fn test_e2e_unresolved_badge_is_inert() {
        let store = seeded_store();
        store.add_device(device("gate"));

        let factory = Arc::new(MockFactory::new());
        factory.script_device(
            "gate",
            MockScript {
                events: vec![punch("gate", "junk-badge", 9, 0, 0, PunchDirection::In)],
                ..Default::default()
            },
        );

        let orchestrator = SyncOrchestrator::new(Arc::clone(&store), factory, engine_config(500));
        let report = orchestrator.sync_all_devices().await;

        assert_eq!(report.devices_succeeded, 1);
        assert_eq!(report.totals.unresolved, 1);
        assert_eq!(report.totals.stored, 0);
        assert_eq!(store.log_count(), 0);
        assert!(store.attendance_all().await.unwrap().is_empty());
    }
}

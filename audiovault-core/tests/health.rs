
use audiovault_core::health::HealthReport;
use audiovault_core::mock::MockBehavior;
use fixture::Fixture;

#[tokio::test]
async fn test_all_sinks_healthy() {
    let fixture = Fixture::new();
    let report = fixture.prober.probe().await;
    assert!(report.all_healthy());
}

#[tokio::test]
async fn test_each_sink_fails_in_isolation() {
    let cases = [
        (
            MockBehavior::Unreachable,
            HealthReport {
                postgres: false,
                minio: true,
                pushgateway: true,
            },
        ),
        (
            MockBehavior::Hang,
            HealthReport {
                postgres: false,
                minio: true,
                pushgateway: true,
            },
        ),
    ];

    for (behavior, expected) in cases {
        let fixture = Fixture::new();
        fixture.catalog.set_behavior(behavior);
        assert_eq!(fixture.prober.probe().await, expected);
    }

    let fixture = Fixture::new();
    fixture.blob.set_behavior(MockBehavior::Hang);
    assert_eq!(
        fixture.prober.probe().await,
        HealthReport {
            postgres: true,
            minio: false,
            pushgateway: true,
        }
    );

    let fixture = Fixture::new();
    fixture.gateway.set_behavior(MockBehavior::Unreachable);
    assert_eq!(
        fixture.prober.probe().await,
        HealthReport {
            postgres: true,
            minio: true,
            pushgateway: false,
        }
    );
}

#[tokio::test]
async fn test_write_failures_do_not_affect_health() {
    let fixture = Fixture::new();
    fixture.blob.set_behavior(MockBehavior::FailWrites);
    fixture.catalog.set_behavior(MockBehavior::FailWrites);

    assert!(fixture.prober.probe().await.all_healthy());
}

#[tokio::test]
async fn test_probe_is_bounded_when_everything_hangs() {
    let fixture = Fixture::new();
    fixture.blob.set_behavior(MockBehavior::Hang);
    fixture.catalog.set_behavior(MockBehavior::Hang);
    fixture.gateway.set_behavior(MockBehavior::Hang);

    let report = tokio::time::timeout(std::time::Duration::from_secs(1), fixture.prober.probe())
        .await
        .expect("probes run concurrently under one timeout each");
    assert_eq!(report, HealthReport::default());
}

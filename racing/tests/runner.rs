use std::time::Duration;

use async_trait::async_trait;
use racing::bail;
use racing::config::RaceConfig;
use racing::environment::{RaceEnvironment, properties};
use racing::error::{ErrorKind, RaceResult};
use racing::racer::{Racer, legends};
use racing::runner::RaceRunner;
use racing::stages::RaceStage;
use racing::stages::echo::EchoStage;
use racing::stages::encoding::EncodingStage;
use racing::stages::messaging::MessagingStage;
use racing::types::RaceOutcome;
use rand::random;
use telemetry::tracing::init_test_tracing;
use tokio::time::{sleep, timeout};

fn deployment_environment() -> RaceEnvironment {
    [
        (properties::SERVER_NAME.to_owned(), "localhost".to_owned()),
        (properties::SERVER_PORT.to_owned(), "8080".to_owned()),
        (properties::CONTEXT_PATH.to_owned(), "/racing".to_owned()),
    ]
    .into_iter()
    .collect()
}

/// A stage that always fails.
struct BlownEngine;

#[async_trait]
impl RaceStage for BlownEngine {
    fn name(&self) -> &'static str {
        "blown-engine"
    }

    async fn run(&mut self, _environment: &RaceEnvironment) -> RaceResult<()> {
        bail!(ErrorKind::StageFailed, "the engine gave out");
    }
}

/// A stage that outlasts any reasonable results bound.
struct Stall;

#[async_trait]
impl RaceStage for Stall {
    fn name(&self) -> &'static str {
        "stall"
    }

    async fn run(&mut self, _environment: &RaceEnvironment) -> RaceResult<()> {
        sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn legends_complete_the_standard_course() {
    init_test_tracing();

    let runner = RaceRunner::new(RaceConfig::default(), deployment_environment()).unwrap();
    let outcome = runner.run(random(), legends()).await.unwrap();

    let RaceOutcome::Complete(standings) = outcome else {
        panic!("expected a complete race, got {outcome:?}");
    };
    assert_eq!(standings.len(), 4);
    assert_eq!(standings.positions(), vec![1, 2, 3, 4]);
    for name in [
        "Jimmie Thronson",
        "Michael Thrumacher",
        "Sebastien Throeb",
        "Valentino Throssi",
    ] {
        assert!(standings.position_of(name).is_some());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn stage_failure_aborts_only_that_racer() {
    init_test_tracing();

    let runner = RaceRunner::new(RaceConfig::default(), deployment_environment()).unwrap();

    let mut racers = vec![
        Racer::standard("steady-1"),
        Racer::standard("steady-2"),
        Racer::standard("steady-3"),
    ];
    racers.push(Racer::new("breakdown").with_stage(BlownEngine));

    let outcome = runner.run(random(), racers).await.unwrap();

    let RaceOutcome::Complete(standings) = outcome else {
        panic!("expected a complete race, got {outcome:?}");
    };
    assert_eq!(standings.len(), 3);
    assert_eq!(standings.positions(), vec![1, 2, 3]);
    assert_eq!(standings.position_of("breakdown"), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn incomplete_race_cancels_outstanding_racers() {
    init_test_tracing();

    let config = RaceConfig {
        start_timeout_secs: 1,
        results_timeout_secs: 1,
    };
    let runner = RaceRunner::new(config, deployment_environment()).unwrap();

    let racers = vec![
        Racer::new("finisher"),
        Racer::new("stuck").with_stage(Stall),
    ];

    // The runner must come back promptly after the results bound: the shutdown
    // signal cancels the stalled racer instead of waiting out its stage.
    let outcome = timeout(Duration::from_secs(10), runner.run(random(), racers))
        .await
        .expect("runner did not cancel the stalled racer")
        .unwrap();

    let RaceOutcome::Incomplete {
        standings,
        did_not_finish,
    } = outcome
    else {
        panic!("expected an incomplete race, got {outcome:?}");
    };
    assert_eq!(standings.positions(), vec![1]);
    assert_eq!(standings.position_of("finisher"), Some(1));
    assert_eq!(did_not_finish, vec!["stuck".to_owned()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_racer_list_is_rejected() {
    init_test_tracing();

    let runner = RaceRunner::new(RaceConfig::default(), RaceEnvironment::default()).unwrap();
    let err = runner.run(random(), Vec::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRacerCount);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let config = RaceConfig {
        start_timeout_secs: 0,
        results_timeout_secs: 60,
    };
    let err = RaceRunner::new(config, RaceEnvironment::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigError);
}

#[tokio::test]
async fn standard_stages_complete_individually() {
    init_test_tracing();

    let environment = deployment_environment();

    MessagingStage::default()
        .run(&environment)
        .await
        .unwrap();
    EchoStage::default().run(&environment).await.unwrap();
    EncodingStage.run(&environment).await.unwrap();
}

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use racing::config::RaceConfig;
use racing::environment::RaceEnvironment;
use racing::error::ErrorKind;
use racing::race::Race;
use racing::types::{RaceId, RaceOutcome, RacePhase};
use rand::random;
use telemetry::tracing::init_test_tracing;
use tokio::time::sleep;

/// Tight bounds so timeout paths resolve quickly in tests.
fn fast_config() -> RaceConfig {
    RaceConfig {
        start_timeout_secs: 1,
        results_timeout_secs: 2,
    }
}

#[test]
fn zero_racers_is_rejected() {
    let result = Race::new(1, 0, RaceEnvironment::default(), RaceConfig::default());
    assert_eq!(
        result.unwrap_err().kind(),
        ErrorKind::InvalidRacerCount
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn all_finishers_rank_a_full_permutation() {
    init_test_tracing();

    const RACERS: u32 = 4;
    let race_id: RaceId = random();
    let race = Race::new(
        race_id,
        RACERS,
        RaceEnvironment::default(),
        RaceConfig::default(),
    )
    .unwrap();

    let mut handles = Vec::new();
    for index in 0..RACERS {
        let registration = race.register(format!("racer-{index}"));
        handles.push(tokio::spawn(async move {
            registration.ready().await.unwrap();
            registration.finish()
        }));
    }

    race.start().await.unwrap();
    let outcome = race.results().await;

    let RaceOutcome::Complete(standings) = outcome else {
        panic!("expected a complete race, got {outcome:?}");
    };
    assert_eq!(standings.len(), RACERS as usize);
    assert_eq!(
        standings.positions(),
        (1..=RACERS).collect::<Vec<_>>()
    );
    assert_eq!(race.phase(), RacePhase::Complete);

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_finishes_never_duplicate_positions() {
    init_test_tracing();

    const RACERS: u32 = 100;
    let race = Race::new(
        random(),
        RACERS,
        RaceEnvironment::default(),
        RaceConfig::default(),
    )
    .unwrap();

    let mut handles = Vec::new();
    for index in 0..RACERS {
        let registration = race.register(format!("racer-{index}"));
        handles.push(tokio::spawn(async move {
            registration.ready().await.unwrap();
            // All racers finish as simultaneously as the scheduler allows.
            registration.finish()
        }));
    }

    race.start().await.unwrap();
    let outcome = race.results().await;
    assert!(outcome.is_complete());

    let mut positions = HashSet::new();
    for handle in handles {
        let position = handle.await.unwrap();
        assert!(
            positions.insert(position),
            "position {position} was assigned twice"
        );
    }
    assert_eq!(
        positions,
        (1..=RACERS).collect::<HashSet<_>>()
    );
    assert_eq!(
        outcome.standings().positions(),
        (1..=RACERS).collect::<Vec<_>>()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn start_times_out_when_a_racer_never_signals_ready() {
    init_test_tracing();

    let race = Race::new(random(), 2, RaceEnvironment::default(), fast_config()).unwrap();

    let early = race.register("early bird");
    let _no_show = race.register("no show");

    let early_wait = tokio::spawn(async move { early.ready().await });

    let err = race.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StartTimeout);

    // The waiting racer fails symmetrically and never proceeds past ready.
    let racer_err = early_wait.await.unwrap().unwrap_err();
    assert_eq!(racer_err.kind(), ErrorKind::StartTimeout);

    assert_eq!(race.phase(), RacePhase::AwaitingStart);
}

#[tokio::test(flavor = "multi_thread")]
async fn late_ready_fails_after_the_race_is_abandoned() {
    init_test_tracing();

    let race = Race::new(random(), 2, RaceEnvironment::default(), fast_config()).unwrap();

    let early = race.register("early bird");
    let latecomer = race.register("latecomer");

    let early_wait = tokio::spawn(async move { early.ready().await });

    let err = race.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StartTimeout);
    let early_err = early_wait.await.unwrap().unwrap_err();
    assert_eq!(early_err.kind(), ErrorKind::StartTimeout);

    // The timed-out initiator and racer still count toward the barrier's
    // arrival quorum; a racer arriving afterwards must fail instead of being
    // released by those stale arrivals.
    sleep(Duration::from_millis(100)).await;
    let late_err = latecomer.ready().await.unwrap_err();
    assert_eq!(late_err.kind(), ErrorKind::StartTimeout);

    assert_eq!(race.phase(), RacePhase::AwaitingStart);
}

#[tokio::test(flavor = "multi_thread")]
async fn aborted_racer_is_absent_from_standings() {
    init_test_tracing();

    const RACERS: u32 = 4;
    let race = Race::new(
        random(),
        RACERS,
        RaceEnvironment::default(),
        RaceConfig::default(),
    )
    .unwrap();

    let mut handles = Vec::new();
    for index in 0..RACERS - 1 {
        let registration = race.register(format!("finisher-{index}"));
        handles.push(tokio::spawn(async move {
            registration.ready().await.unwrap();
            registration.finish();
        }));
    }

    let quitter = race.register("quitter");
    handles.push(tokio::spawn(async move {
        quitter.ready().await.unwrap();
        quitter.abort(racing::race_error!(
            ErrorKind::StageFailed,
            "blew a gasket"
        ));
    }));

    race.start().await.unwrap();
    let outcome = race.results().await;

    let RaceOutcome::Complete(standings) = outcome else {
        panic!("expected a complete race, got {outcome:?}");
    };
    assert_eq!(standings.len(), 3);
    assert_eq!(standings.positions(), vec![1, 2, 3]);
    assert_eq!(standings.position_of("quitter"), None);

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn results_time_out_with_partial_standings() {
    init_test_tracing();

    let race = Race::new(random(), 3, RaceEnvironment::default(), fast_config()).unwrap();

    let mut handles = Vec::new();
    for index in 0..2 {
        let registration = race.register(format!("finisher-{index}"));
        handles.push(tokio::spawn(async move {
            registration.ready().await.unwrap();
            registration.finish();
        }));
    }

    let sleeper = race.register("sleeper");
    let stuck = tokio::spawn(async move {
        sleeper.ready().await.unwrap();
        // Never reports a terminal operation within the results bound.
        sleep(Duration::from_secs(30)).await;
        drop(sleeper);
    });

    race.start().await.unwrap();
    let outcome = race.results().await;

    let RaceOutcome::Incomplete {
        standings,
        did_not_finish,
    } = outcome
    else {
        panic!("expected an incomplete race, got {outcome:?}");
    };
    assert_eq!(standings.positions(), vec![1, 2]);
    assert_eq!(did_not_finish, vec!["sleeper".to_owned()]);
    assert_eq!(race.phase(), RacePhase::Complete);

    for handle in handles {
        handle.await.unwrap();
    }
    stuck.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn barrier_releases_all_parties_atomically() {
    init_test_tracing();

    const RACERS: u32 = 8;
    let race = Race::new(
        random(),
        RACERS,
        RaceEnvironment::default(),
        RaceConfig::default(),
    )
    .unwrap();
    let arrived = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for index in 0..RACERS {
        let registration = race.register(format!("racer-{index}"));
        let arrived = Arc::clone(&arrived);
        handles.push(tokio::spawn(async move {
            // Stagger arrivals so the barrier is actually exercised.
            sleep(Duration::from_millis(10 * u64::from(index))).await;
            arrived.fetch_add(1, Ordering::SeqCst);
            registration.ready().await.unwrap();

            // Past the barrier, every other racer must have arrived as well.
            assert_eq!(arrived.load(Ordering::SeqCst), RACERS);
            registration.finish();
        }));
    }

    assert!(race.phase() <= RacePhase::AwaitingStart);
    race.start().await.unwrap();
    assert_eq!(arrived.load(Ordering::SeqCst), RACERS);
    assert_eq!(race.phase(), RacePhase::Running);

    let outcome = race.results().await;
    assert!(outcome.is_complete());

    for handle in handles {
        handle.await.unwrap();
    }
}

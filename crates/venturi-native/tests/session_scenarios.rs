//! End-to-end session behaviour: warm-up, rejection, degradation,
//! state transitions, atomicity, determinism and concurrent isolation.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use venturi_core::config::{DegradationPolicy, SessionConfig};
use venturi_core::types::{EegSample, LearningStage, NeuralState};
use venturi_native::buffer::Window;
use venturi_native::clock::{FrozenClock, MonotonicClock};
use venturi_native::error::{CycleError, ErrorKind, FeatureError};
use venturi_native::features::FeatureExtractor;
use venturi_native::runtime::{RuntimeConfig, SessionEvent, SessionRuntime};
use venturi_native::session::{CycleOutcome, CycleResult, Session};

const RATE: f64 = 128.0;
const PERIOD_US: u64 = 7_812;

/// `beta_amp` at 20 Hz plus `theta_amp` at 6 Hz on every channel
fn two_tone(range: std::ops::Range<u64>, beta_amp: f64, theta_amp: f64, channels: usize) -> Vec<EegSample> {
    range
        .map(|i| {
            let t = i as f64 / RATE;
            let v = beta_amp * (2.0 * PI * 20.0 * t).sin() + theta_amp * (2.0 * PI * 6.0 * t).sin();
            EegSample::new(i * PERIOD_US, vec![v; channels])
        })
        .collect()
}

fn frozen(config: SessionConfig) -> Session {
    Session::with_clock(config, Arc::new(FrozenClock)).unwrap()
}

fn feed(session: &mut Session, samples: Vec<EegSample>) -> Vec<CycleResult> {
    samples
        .into_iter()
        .filter_map(|s| session.process_window(s).unwrap().into_result())
        .collect()
}

#[test]
fn test_pending_until_first_window() {
    let mut session = frozen(SessionConfig::new(256.0, 4, 8));
    let samples = two_tone(0..8, 5.0, 1.0, 4);

    for (i, sample) in samples[..7].iter().enumerate() {
        let outcome = session.process_window(sample.clone()).unwrap();
        assert_eq!(outcome, CycleOutcome::Pending { buffered: i + 1, required: 8 });
    }

    let outcome = session.process_window(samples[7].clone()).unwrap();
    assert!(!outcome.is_pending());
    let result = outcome.into_result().unwrap();
    assert_eq!(result.cycle_id, 1);
    assert_eq!(result.window_len, 8);
}

#[test]
fn test_malformed_window_leaves_session_untouched() {
    let mut session = frozen(SessionConfig::new(RATE, 2, 64));
    let results = feed(&mut session, two_tone(0..80, 10.0, 1.0, 2));
    assert_eq!(results.len(), 17);

    let traits = *session.traits();
    let machine = *session.state();
    let buffered = session.buffered();

    let bad = EegSample::new(80 * PERIOD_US, vec![1.0, f64::NAN]);
    let err = session.process_window(bad).unwrap_err();
    assert_eq!(err, CycleError::Feature(FeatureError::MalformedWindow { sample_index: 63, channel: 1 }));
    assert_eq!(err.kind(), ErrorKind::MalformedWindow);

    assert_eq!(*session.traits(), traits);
    assert_eq!(*session.state(), machine);
    assert_eq!(session.buffered(), buffered);
    assert_eq!(session.cycles(), 17);

    // The next well-formed sample continues where the session left off
    let next = feed(&mut session, two_tone(80..81, 10.0, 1.0, 2));
    assert_eq!(next[0].cycle_id, 18);
}

#[test]
fn test_extractor_reports_position_of_non_finite_value() {
    let mut samples = two_tone(0..16, 10.0, 1.0, 3);
    samples[5] = EegSample::new(5 * PERIOD_US, vec![0.0, 0.0, f64::INFINITY]);

    let mut extractor = FeatureExtractor::new(RATE);
    let err = extractor.extract(Window::from_slice(&samples, 3), None).unwrap_err();
    assert_eq!(err, FeatureError::MalformedWindow { sample_index: 5, channel: 2 });
}

#[test]
fn test_zero_budget_degrades_every_cycle() {
    let mut config = SessionConfig::new(RATE, 2, 32);
    config.gates.processing_budget_us = 0;
    let mut session = Session::with_clock(config, Arc::new(MonotonicClock::new())).unwrap();

    let results = feed(&mut session, two_tone(0..64, 10.0, 1.0, 2));
    assert_eq!(results.len(), 33);
    for r in &results {
        assert!(r.degraded);
        assert!(r.timing.gates[1].degraded);
        assert!(r.features.first_out_of_domain().is_none());
        assert!(r.traits.values().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(r.trait_score.is_finite());
    }
}

#[test]
fn test_zero_cycle_budget_shrinks_window() {
    let mut config = SessionConfig::new(RATE, 2, 64);
    config.gates.cycle_budget_us = 0;
    config.degradation.policy = DegradationPolicy::ShrinkWindow;
    config.degradation.min_window = 16;
    let mut session = frozen(config);

    let results = feed(&mut session, two_tone(0..68, 10.0, 1.0, 2));
    let windows: Vec<usize> = results.iter().map(|r| r.window_len).collect();
    assert_eq!(windows, vec![64, 32, 16, 16, 16]);
    assert!(results.iter().all(|r| r.degraded && r.timing.degraded));
    assert!(results.iter().all(|r| r.features.window_len == r.window_len));
}

#[test]
fn test_focus_on_exactly_nth_engaged_cycle() {
    let mut config = SessionConfig::new(RATE, 2, 64);
    config.transitions.focus_cycles = 3;
    let mut session = frozen(config);

    let results = feed(&mut session, two_tone(0..66, 10.0, 1.0, 2));
    assert_eq!(results.len(), 3);

    assert_eq!(results[0].neural_state, NeuralState::Resting);
    assert_eq!(results[1].neural_state, NeuralState::Resting);
    assert_eq!(results[2].neural_state, NeuralState::Focused);
    assert!(results.iter().all(|r| r.stage == LearningStage::Acquisition));
}

#[test]
fn test_low_engagement_stays_resting() {
    let mut session = frozen(SessionConfig::new(RATE, 2, 64));
    let results = feed(&mut session, two_tone(0..100, 1.0, 10.0, 2));
    assert!(results.iter().all(|r| r.neural_state == NeuralState::Resting));
}

#[test]
fn test_backwards_time_leaves_traits_bit_identical() {
    let mut session = frozen(SessionConfig::new(RATE, 2, 32));
    feed(&mut session, two_tone(0..40, 10.0, 1.0, 2));

    let before: Vec<u64> = session.traits().traits.values().iter().map(|v| v.to_bits()).collect();
    let plasticity = session.traits().plasticity.to_bits();
    let machine = *session.state();

    let err = session.process_window(EegSample::new(0, vec![1.0, 1.0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCycleInput);

    let after: Vec<u64> = session.traits().traits.values().iter().map(|v| v.to_bits()).collect();
    assert_eq!(before, after);
    assert_eq!(session.traits().plasticity.to_bits(), plasticity);
    assert_eq!(*session.state(), machine);
}

#[test]
fn test_identical_sessions_emit_identical_results() {
    let config = SessionConfig::new(RATE, 3, 32);
    let mut samples = two_tone(0..120, 6.0, 3.0, 3);
    samples[50] = EegSample::new(50 * PERIOD_US, vec![f64::NAN, 0.0, 0.0]);

    let run = |samples: &[EegSample]| -> Vec<String> {
        let mut session = frozen(config.clone());
        samples
            .iter()
            .map(|s| match session.process_window(s.clone()) {
                Ok(CycleOutcome::Complete(r)) => serde_json::to_string(&r).unwrap(),
                Ok(CycleOutcome::Pending { buffered, required }) => format!("pending {buffered}/{required}"),
                Err(e) => format!("error {e}"),
            })
            .collect()
    };

    let a = run(&samples);
    let b = run(&samples);
    assert_eq!(a, b);
    assert!(a[50].starts_with("error"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_match_isolated_runs() {
    let (runtime, mut results) = SessionRuntime::new(RuntimeConfig::default());
    let config = SessionConfig::new(RATE, 2, 32);

    let signals: Vec<Vec<EegSample>> = (0..4u32)
        .map(|k| two_tone(0..100, f64::from(k + 1) * 2.0, 8.0 - f64::from(k), 2))
        .collect();

    let mut expected = HashMap::new();
    let mut producers = Vec::new();
    for signal in &signals {
        let handle = runtime.open_with_clock(config.clone(), Arc::new(FrozenClock)).unwrap();
        let isolated = feed(&mut frozen(config.clone()), signal.clone());
        expected.insert(handle.id(), isolated);

        let signal = signal.clone();
        producers.push(tokio::spawn(async move {
            for s in signal {
                handle.push(s).await.unwrap();
            }
            handle.end().await.unwrap()
        }));
    }
    drop(runtime);

    let mut received: HashMap<_, Vec<CycleResult>> = HashMap::new();
    while let Some(event) = results.recv().await {
        match event {
            SessionEvent::Cycle { session_id, result } => received.entry(session_id).or_default().push(result),
            SessionEvent::Error { error, .. } => panic!("unexpected error {error}"),
            SessionEvent::Ended { .. } => {}
        }
    }
    for p in producers {
        assert_eq!(p.await.unwrap(), 69);
    }

    assert_eq!(received.len(), 4);
    for (id, results) in received {
        assert_eq!(results, expected[&id]);
    }
}

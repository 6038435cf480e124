//! End-to-end properties of a guessing session: mapping, scoring and the
//! audition budget.

#[path = "helpers/mod.rs"]
mod helpers;

use approx::assert_relative_eq;
use fxguess_core::mapper::{format_value, to_physical, to_position};
use fxguess_core::scoring::score;
use fxguess_core::{
    AudioEngine, EffectParam, EffectType, EngineConfig, GuessSession, PlaybackOutcome, PuzzleDefinition, Streak,
};
use helpers::{DeadOutput, play_out, session, sine_sample};

#[test]
fn mapper_round_trips_for_every_family() {
    for effect in EffectType::ALL {
        let spec = effect.spec();
        for step in 0..=200 {
            let p = step as f64 * 0.5;
            let back = to_position(&spec, to_physical(&spec, p));
            assert!((back - p).abs() <= 1e-6 * p.max(1.0), "{effect}: {p} -> {back}");
        }
    }
}

#[test]
fn eq_midpoint_scenario() {
    let spec = EffectType::Eq.spec();
    let v = to_physical(&spec, 50.0);
    assert_relative_eq!(v, 632.455_532_033_675_9, max_relative = 1e-9);
    assert_eq!(format_value(v, spec.unit), "0.6k");
}

#[test]
fn exact_guess_scores_100_everywhere() {
    for effect in EffectType::ALL {
        let spec = effect.spec();
        for p in [0.0, 13.0, 50.0, 99.0, 100.0] {
            let correct = to_physical(&spec, p);
            assert_eq!(score(correct, correct, &spec), 100, "{effect} at {p}");
        }
    }
}

#[test]
fn score_never_rises_with_distance_and_never_drops_below_25() {
    for effect in EffectType::ALL {
        let spec = effect.spec();
        let correct = spec.min_value;
        let mut previous = 100;
        for step in 0..=1000 {
            let guess = spec.min_value + spec.span() * step as f64 / 1000.0;
            let s = score(guess, correct, &spec);
            assert!(s <= previous, "{effect}: score rose from {previous} to {s} at {guess}");
            assert!(s >= 25, "{effect}: score {s} below floor");
            previous = s;
        }
    }
}

#[test]
fn reverb_and_delay_scoring_scenarios() {
    assert_eq!(score(55.0, 50.0, &EffectType::Reverb.spec()), 90);
    assert_eq!(score(900.0, 100.0, &EffectType::Delay.spec()), 25);
}

#[test]
fn streak_follows_submissions() {
    let mut streak = Streak::default();
    for (guess, expected) in [(50.0, 1), (52.0, 2), (90.0, 0)] {
        let mut s = session(PuzzleDefinition::new(EffectType::Reverb, 50.0));
        s.set_guess_value(guess);
        assert_eq!(streak.record(s.submit().score), expected);
    }
    assert_eq!(streak.best, 2);
}

#[test]
fn filter_audition_scenario() {
    let mut s = session(PuzzleDefinition::new(EffectType::Filter, 1200.0));
    assert!(s.audition_value("frequency", 5000.0));

    let engine = s.engine();
    assert_eq!(engine.playback().pinned_value(EffectParam::Frequency), Some(5000.0));
    assert_eq!(engine.graph().unwrap().param(EffectParam::Frequency), Some(1200.0));
    assert_eq!(s.remaining_lives(), 4);
}

#[test]
fn zero_lives_scenario() {
    let mut s = session(PuzzleDefinition::new(EffectType::Phaser, 2.0).with_lives(1));
    assert!(s.audition_value("rate", 3.0));
    play_out(&mut s);

    assert!(!s.audition_value("rate", 0.8));
    assert_eq!(s.remaining_lives(), 0);
    assert!(!s.is_playing());
    assert_eq!(s.engine().graph().unwrap().param(EffectParam::Rate), Some(2.0));
}

#[test]
fn every_audition_restores_the_answer() {
    for effect in EffectType::ALL {
        let spec = effect.spec();
        let correct = to_physical(&spec, 30.0);
        let mut s = session(PuzzleDefinition::new(effect, correct).with_lives(3));
        for position in [0.0, 65.0, 100.0, 10.0] {
            let lives = s.remaining_lives();
            s.set_guess_position(position);
            let granted = s.audition();
            assert_eq!(granted, lives > 0, "{effect}");
            assert_eq!(s.remaining_lives(), lives - granted as u32, "{effect}");
            assert_eq!(s.engine().graph().unwrap().param(spec.parameter_name), Some(correct), "{effect}");
        }
    }
}

#[test]
fn failing_device_never_costs_a_life() {
    let engine = AudioEngine::new(EngineConfig::default(), Box::new(DeadOutput)).unwrap();
    let mut s = GuessSession::new(PuzzleDefinition::new(EffectType::Delay, 250.0), engine).unwrap();
    s.load_sample(sine_sample(1024)).unwrap();

    s.set_guess_value(800.0);
    assert!(!s.audition());
    assert_eq!(s.remaining_lives(), 5);
    assert_eq!(s.engine().graph().unwrap().param(EffectParam::Time), Some(250.0));
    assert!(!s.play_dry());
    assert!(!s.is_playing());
}

#[test]
fn submission_locks_auditions_and_reveals() {
    let mut s = session(PuzzleDefinition::new(EffectType::Compression, -18.0));
    s.set_guess_value(-20.0);
    let result = s.submit();
    assert_eq!(result.score, 90);
    assert_eq!(s.reveal(), Some(-18.0));
    assert!(!s.audition());
    assert_eq!(s.remaining_lives(), 5);
}

#[tokio::test]
async fn audition_completion_resolves_when_the_sample_ends() {
    let mut s = session(PuzzleDefinition::new(EffectType::Chorus, 1.0));
    let completion = s.try_audition().unwrap();
    assert_eq!(play_out(&mut s), 4096);
    assert_eq!(completion.await, PlaybackOutcome::Finished);
}

#[tokio::test]
async fn replaced_audition_resolves_stopped() {
    let mut s = session(PuzzleDefinition::new(EffectType::Chorus, 1.0));
    let first = s.try_audition().unwrap();
    let second = s.try_audition().unwrap();
    assert_eq!(first.await, PlaybackOutcome::Stopped);
    s.stop();
    assert_eq!(second.await, PlaybackOutcome::Stopped);
    assert_eq!(s.remaining_lives(), 3);
}

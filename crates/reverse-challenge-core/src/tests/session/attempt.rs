use crate::{PlayerAttempt, ScoringResult, VoiceSimilarity};

use std::path::PathBuf;

fn scored(score: u8) -> ScoringResult {
    ScoringResult {
        score,
        ..ScoringResult::zero(3)
    }
}

/// WHAT: An override is stored beside the computed score, never over it
/// WHY: The original score is the audit trail for manual judging
#[test]
fn given_scored_attempt_when_overriding_then_original_result_preserved() {
    // Given: An attempt scored 58
    let mut attempt = PlayerAttempt::new("ana", PathBuf::from("ana.wav"), scored(58));

    // When: A judge overrides to 75
    attempt.apply_override(75);

    // Then: Effective score changes, computed score does not
    assert_eq!(attempt.effective_score(), 75);
    assert_eq!(attempt.override_score(), Some(75));
    assert_eq!(attempt.result().score, 58);
}

/// WHAT: Overrides are clamped to 100 and can be cleared
/// WHY: Scores are percentages; clearing restores the computed value
#[test]
fn given_out_of_range_override_when_applying_then_clamped_and_clearable() {
    // Given: An attempt scored 40
    let mut attempt = PlayerAttempt::new("bo", PathBuf::from("bo.wav"), scored(40));

    // When: Overriding to 250, then clearing
    attempt.apply_override(250);
    let clamped = attempt.effective_score();
    attempt.clear_override();

    // Then: Clamped to 100, then back to 40
    assert_eq!(clamped, 100);
    assert_eq!(attempt.effective_score(), 40);
    assert!(attempt.override_score().is_none());
}

/// WHAT: Voice metrics are stored without affecting the score
/// WHY: Pitch and timbre come from an external analyzer and are display only
#[test]
fn given_voice_metrics_when_attaching_then_score_unchanged() {
    // Given: A scored attempt with no metrics
    let mut attempt = PlayerAttempt::new("cy", PathBuf::from("cy.wav"), scored(90))
        .with_transcription("hello");
    assert!(attempt.voice_similarity().is_none());

    // When: Attaching analyzer output
    let metrics = VoiceSimilarity {
        pitch: 0.8,
        timbre: 0.6,
        overall: 0.7,
    };
    attempt.attach_voice_similarity(metrics);

    // Then: Metrics present, scores untouched
    assert_eq!(attempt.voice_similarity(), Some(metrics));
    assert_eq!(attempt.effective_score(), 90);
    assert_eq!(attempt.transcription.as_deref(), Some("hello"));
}

/// WHAT: Each attempt gets its own id
/// WHY: Attempts by the same player on the same clip must stay distinct
#[test]
fn given_two_attempts_when_creating_then_ids_differ() {
    let first = PlayerAttempt::new("di", PathBuf::from("a.wav"), scored(1));
    let second = PlayerAttempt::new("di", PathBuf::from("a.wav"), scored(1));
    assert_ne!(first.id, second.id);
}

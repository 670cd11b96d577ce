//! Applies a verdict to the per-user aggregate metrics. Pure: the updated
//! row is persisted by the attempt recorder inside its transaction.

use chrono::{DateTime, Utc};

use crate::models::{ExerciseDef, ExerciseKind, UserProgress, Verdict};

pub struct ProgressUpdater;

impl ProgressUpdater {
    /// Counters only move up; skill scores keep the best result so far.
    pub fn apply(
        progress: &mut UserProgress,
        exercise: &ExerciseDef,
        verdict: &Verdict,
        now: DateTime<Utc>,
    ) {
        if verdict.is_correct {
            progress.exercises_completed += 1;
        }

        let points = (verdict.score * 100.0).clamp(0.0, 100.0);
        match exercise.kind {
            ExerciseKind::Listening | ExerciseKind::Dictation => {
                bump(&mut progress.skill_scores.listening, points);
            }
            ExerciseKind::Speaking => {
                bump(&mut progress.skill_scores.speaking, points);
            }
            ExerciseKind::FillInBlank
            | ExerciseKind::ShortAnswer
            | ExerciseKind::Essay
            | ExerciseKind::Translation => {
                bump(&mut progress.skill_scores.grammar, points);
                bump(&mut progress.skill_scores.vocabulary, points);
            }
            // Choice exercises only feed the completion counter.
            ExerciseKind::MultipleChoice | ExerciseKind::TrueFalse | ExerciseKind::Matching => {}
        }

        progress.last_updated = now;
    }
}

fn bump(slot: &mut f64, points: f64) {
    if points > *slot {
        *slot = points;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerValue, Feedback};

    fn exercise(kind: ExerciseKind) -> ExerciseDef {
        ExerciseDef {
            id: "ex-1".to_string(),
            kind,
            question: "savol".to_string(),
            correct_answer: AnswerValue::Text("olma".to_string()),
            options: None,
            explanation: None,
            tags: vec![],
            audio_ref: None,
            difficulty: None,
            active: true,
        }
    }

    fn verdict(is_correct: bool, score: f64) -> Verdict {
        Verdict::new(is_correct, score, Feedback::default())
    }

    #[test]
    fn correct_answers_increment_the_completion_counter() {
        let mut progress = UserProgress::new("u-1", Utc::now());
        ProgressUpdater::apply(
            &mut progress,
            &exercise(ExerciseKind::MultipleChoice),
            &verdict(true, 1.0),
            Utc::now(),
        );
        assert_eq!(progress.exercises_completed, 1);

        ProgressUpdater::apply(
            &mut progress,
            &exercise(ExerciseKind::MultipleChoice),
            &verdict(false, 0.0),
            Utc::now(),
        );
        assert_eq!(progress.exercises_completed, 1);
    }

    #[test]
    fn kinds_map_to_their_skill_areas() {
        let mut progress = UserProgress::new("u-1", Utc::now());

        ProgressUpdater::apply(
            &mut progress,
            &exercise(ExerciseKind::Listening),
            &verdict(true, 0.9),
            Utc::now(),
        );
        assert_eq!(progress.skill_scores.listening, 90.0);
        assert_eq!(progress.skill_scores.speaking, 0.0);

        ProgressUpdater::apply(
            &mut progress,
            &exercise(ExerciseKind::Speaking),
            &verdict(true, 0.86),
            Utc::now(),
        );
        assert_eq!(progress.skill_scores.speaking, 86.0);

        ProgressUpdater::apply(
            &mut progress,
            &exercise(ExerciseKind::Translation),
            &verdict(true, 0.8),
            Utc::now(),
        );
        assert_eq!(progress.skill_scores.grammar, 80.0);
        assert_eq!(progress.skill_scores.vocabulary, 80.0);
    }

    #[test]
    fn skill_scores_never_decrease() {
        let mut progress = UserProgress::new("u-1", Utc::now());

        ProgressUpdater::apply(
            &mut progress,
            &exercise(ExerciseKind::Dictation),
            &verdict(true, 0.95),
            Utc::now(),
        );
        assert_eq!(progress.skill_scores.listening, 95.0);

        ProgressUpdater::apply(
            &mut progress,
            &exercise(ExerciseKind::Dictation),
            &verdict(true, 0.75),
            Utc::now(),
        );
        assert_eq!(progress.skill_scores.listening, 95.0);
    }

    #[test]
    fn choice_kinds_leave_skill_scores_untouched() {
        let mut progress = UserProgress::new("u-1", Utc::now());
        ProgressUpdater::apply(
            &mut progress,
            &exercise(ExerciseKind::Matching),
            &verdict(true, 1.0),
            Utc::now(),
        );
        assert_eq!(progress.skill_scores, Default::default());
        assert_eq!(progress.exercises_completed, 1);
    }
}

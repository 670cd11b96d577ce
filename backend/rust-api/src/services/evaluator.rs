//! Per-kind answer grading. `evaluate` is a pure function of the exercise
//! definition and the submitted answer; the only I/O it can do is calling the
//! injected speech capabilities for speaking and audio dictation.

use std::sync::Arc;

use serde_json::json;

use crate::errors::{CoreError, CoreResult};
use crate::models::{AnswerValue, ExerciseDef, ExerciseKind, UserAnswer, Verdict};
use crate::services::feedback::{FeedbackBuilder, VerdictClass};
use crate::services::speech::{PronunciationScorer, SpeechRecognizer};
use crate::utils::text::{
    edit_distance, normalize, similarity, word_overlap, CLOSE_THRESHOLD, NEAR_EXACT_THRESHOLD,
    SHORT_ANSWER_NEAR_THRESHOLD,
};

/// Weight of pronunciation accuracy vs. fluency in composite speech scores.
const ACCURACY_WEIGHT: f64 = 0.6;
const FLUENCY_WEIGHT: f64 = 0.4;
/// Non-exact listening answers never score above this.
const LISTENING_NON_EXACT_CAP: f64 = 0.9;
/// Dictation scores are scaled by character accuracy times this factor.
const DICTATION_ACCURACY_FACTOR: f64 = 0.8;

#[derive(Clone)]
pub struct AnswerEvaluator {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    scorer: Option<Arc<dyn PronunciationScorer>>,
}

impl AnswerEvaluator {
    pub fn new(
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        scorer: Option<Arc<dyn PronunciationScorer>>,
    ) -> Self {
        Self { recognizer, scorer }
    }

    /// Evaluator with no speech backend; speaking and audio dictation answer
    /// with `CapabilityUnavailable`.
    pub fn without_speech() -> Self {
        Self {
            recognizer: None,
            scorer: None,
        }
    }

    pub async fn evaluate(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        audio_ref: Option<&str>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let verdict = match exercise.kind {
            ExerciseKind::MultipleChoice => self.eval_multiple_choice(exercise, answer, locale)?,
            ExerciseKind::TrueFalse => self.eval_true_false(exercise, answer, locale)?,
            ExerciseKind::FillInBlank => self.eval_fill_in_blank(exercise, answer, locale)?,
            ExerciseKind::Matching => self.eval_matching(exercise, answer, locale)?,
            ExerciseKind::ShortAnswer | ExerciseKind::Essay => {
                self.eval_short_answer(exercise, answer, locale)?
            }
            ExerciseKind::Listening => self.eval_listening(exercise, answer, locale)?,
            ExerciseKind::Translation => self.eval_translation(exercise, answer, locale)?,
            ExerciseKind::Speaking => self.eval_speaking(exercise, audio_ref, locale).await?,
            ExerciseKind::Dictation => {
                self.eval_dictation(exercise, answer, audio_ref, locale).await?
            }
        };

        debug_assert!((0.0..=1.0).contains(&verdict.score));
        Ok(verdict)
    }

    fn eval_multiple_choice(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let key = answer.and_then(AnswerValue::as_key).ok_or_else(|| {
            CoreError::invalid_input("Multiple choice answers must be an option key")
        })?;

        if let Some(options) = &exercise.options {
            if !options.contains_key(&key) {
                return Err(CoreError::invalid_input(format!(
                    "Option '{key}' is not one of the exercise options"
                )));
            }
        }

        let correct_key = exercise.correct_answer.as_key().ok_or_else(|| {
            CoreError::Evaluation(anyhow::anyhow!(
                "Exercise {} stores a non-key correct answer",
                exercise.id
            ))
        })?;

        if key == correct_key {
            return Ok(self.verdict(exercise, locale, VerdictClass::Correct, true, 1.0));
        }

        let builder = FeedbackBuilder::new(locale).class(VerdictClass::Wrong);
        let label = builder.correct_answer_label().to_string();
        let resolved = exercise
            .correct_option_text()
            .unwrap_or_else(|| correct_key.clone());
        let feedback = builder
            .specific_entry(label, json!(resolved))
            .explanation(exercise.explanation.clone())
            .build();
        Ok(Verdict::new(false, 0.0, feedback))
    }

    fn eval_true_false(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let flag = answer
            .and_then(AnswerValue::as_flag)
            .ok_or_else(|| CoreError::invalid_input("True/false answers must be a boolean"))?;

        let expected = exercise.correct_answer.as_flag().ok_or_else(|| {
            CoreError::Evaluation(anyhow::anyhow!(
                "Exercise {} stores a non-boolean correct answer",
                exercise.id
            ))
        })?;

        if flag == expected {
            Ok(self.verdict(exercise, locale, VerdictClass::Correct, true, 1.0))
        } else {
            Ok(self.verdict(exercise, locale, VerdictClass::Wrong, false, 0.0))
        }
    }

    fn eval_fill_in_blank(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let raw = text_answer(answer, "Fill-in-blank")?;
        let user = normalize(raw, locale);
        if user.is_empty() {
            return Ok(self.verdict(exercise, locale, VerdictClass::Empty, false, 0.0));
        }

        let accepted = self.accepted_answers(exercise)?;
        let normalized: Vec<String> = accepted.iter().map(|a| normalize(a, locale)).collect();

        if normalized.iter().any(|a| *a == user) {
            return Ok(self.verdict(exercise, locale, VerdictClass::Correct, true, 1.0));
        }

        let best = normalized
            .iter()
            .map(|a| similarity(&user, a))
            .fold(0.0, f64::max);
        if best >= NEAR_EXACT_THRESHOLD {
            return Ok(self.verdict(exercise, locale, VerdictClass::Near, true, 1.0));
        }

        let feedback = FeedbackBuilder::new(locale)
            .class(VerdictClass::Wrong)
            .specific_entry("expected", json!(accepted[0]))
            .explanation(exercise.explanation.clone())
            .build();
        Ok(Verdict::new(false, 0.0, feedback))
    }

    fn eval_matching(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let submitted = answer
            .and_then(AnswerValue::as_pairs)
            .ok_or_else(|| CoreError::invalid_input("Matching answers must be a key-value map"))?;

        let expected = exercise.correct_answer.as_pairs().ok_or_else(|| {
            CoreError::Evaluation(anyhow::anyhow!(
                "Exercise {} stores a non-map correct answer",
                exercise.id
            ))
        })?;
        if expected.is_empty() {
            return Err(CoreError::Evaluation(anyhow::anyhow!(
                "Exercise {} has no matching pairs",
                exercise.id
            )));
        }

        // Extra submitted keys are ignored; missing keys count as wrong.
        let mut matched = 0usize;
        let mut builder = FeedbackBuilder::new(locale);
        for (key, expected_value) in expected {
            let got = submitted.get(key);
            let ok = got
                .map(|g| {
                    similarity(&normalize(g, locale), &normalize(expected_value, locale))
                        >= NEAR_EXACT_THRESHOLD
                })
                .unwrap_or(false);
            if ok {
                matched += 1;
            }

            let entry = if ok {
                json!({ "status": "correct" })
            } else {
                json!({
                    "status": "incorrect",
                    "expected": expected_value,
                    "got": got,
                })
            };
            builder = builder.specific_entry(key.clone(), entry);
        }

        let score = matched as f64 / expected.len() as f64;
        let is_correct = matched == expected.len();
        let class = if is_correct {
            VerdictClass::Correct
        } else if score >= CLOSE_THRESHOLD {
            VerdictClass::Close
        } else {
            VerdictClass::Wrong
        };

        let feedback = builder
            .class(class)
            .explanation(exercise.explanation.clone())
            .build();
        Ok(Verdict::new(is_correct, score, feedback))
    }

    fn eval_short_answer(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let raw = text_answer(answer, "Short answer")?;
        let user = normalize(raw, locale);
        if user.is_empty() {
            return Ok(self.verdict(exercise, locale, VerdictClass::Empty, false, 0.0));
        }

        let accepted = self.accepted_answers(exercise)?;
        let normalized: Vec<String> = accepted.iter().map(|a| normalize(a, locale)).collect();

        if normalized.iter().any(|a| *a == user) {
            return Ok(self.verdict(exercise, locale, VerdictClass::Correct, true, 1.0));
        }

        let best = normalized
            .iter()
            .map(|a| similarity(&user, a))
            .fold(0.0, f64::max);
        if best >= SHORT_ANSWER_NEAR_THRESHOLD {
            return Ok(self.verdict(exercise, locale, VerdictClass::Near, true, 1.0));
        }

        Ok(self.verdict(exercise, locale, VerdictClass::Wrong, false, 0.0))
    }

    fn eval_listening(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let raw = text_answer(answer, "Listening")?;
        let user = normalize(raw, locale);
        if user.is_empty() {
            return Ok(self.verdict(exercise, locale, VerdictClass::Empty, false, 0.0));
        }

        let accepted = self.accepted_answers(exercise)?;
        let normalized: Vec<String> = accepted.iter().map(|a| normalize(a, locale)).collect();

        let best_similarity = normalized
            .iter()
            .map(|a| similarity(&user, a))
            .fold(0.0, f64::max);
        if best_similarity >= NEAR_EXACT_THRESHOLD {
            return Ok(self.verdict(exercise, locale, VerdictClass::Correct, true, 1.0));
        }

        let overlap = normalized
            .iter()
            .map(|a| word_overlap(&user, a))
            .fold(0.0, f64::max);
        let is_correct = overlap >= CLOSE_THRESHOLD;
        let score = overlap.min(LISTENING_NON_EXACT_CAP);
        let class = if is_correct {
            VerdictClass::Close
        } else {
            VerdictClass::Wrong
        };
        Ok(self.verdict(exercise, locale, class, is_correct, score))
    }

    fn eval_translation(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let raw = text_answer(answer, "Translation")?;
        let user = normalize(raw, locale);
        if user.is_empty() {
            return Ok(self.verdict(exercise, locale, VerdictClass::Empty, false, 0.0));
        }

        let accepted = self.accepted_answers(exercise)?;
        let normalized: Vec<String> = accepted.iter().map(|a| normalize(a, locale)).collect();

        let best_similarity = normalized
            .iter()
            .map(|a| similarity(&user, a))
            .fold(0.0, f64::max);
        if best_similarity >= NEAR_EXACT_THRESHOLD {
            return Ok(self.verdict(exercise, locale, VerdictClass::Correct, true, 1.0));
        }

        let overlap = normalized
            .iter()
            .map(|a| word_overlap(&user, a))
            .fold(0.0, f64::max);
        let score = ACCURACY_WEIGHT * best_similarity + FLUENCY_WEIGHT * overlap;
        let is_correct = overlap >= CLOSE_THRESHOLD;
        let class = if is_correct {
            VerdictClass::Close
        } else {
            VerdictClass::Wrong
        };
        Ok(self.verdict(exercise, locale, class, is_correct, score))
    }

    async fn eval_speaking(
        &self,
        exercise: &ExerciseDef,
        audio_ref: Option<&str>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let audio = audio_ref.ok_or_else(|| {
            CoreError::invalid_input("Speaking exercises require an audio recording")
        })?;
        let recognizer = self.recognizer.as_ref().ok_or_else(|| {
            CoreError::capability_unavailable("Speech recognition is not configured")
        })?;
        let scorer = self.scorer.as_ref().ok_or_else(|| {
            CoreError::capability_unavailable("Pronunciation scoring is not configured")
        })?;

        let reference = self.accepted_answers(exercise)?[0].clone();
        let transcription = recognizer.transcribe(audio, locale).await?;
        let pronunciation = scorer.score(audio, &reference, locale).await?;

        let composite =
            (ACCURACY_WEIGHT * pronunciation.accuracy + FLUENCY_WEIGHT * pronunciation.fluency)
                .clamp(0.0, 1.0);
        let transcript_similarity = similarity(
            &normalize(&transcription.transcript, locale),
            &normalize(&reference, locale),
        );
        let is_correct = transcript_similarity >= NEAR_EXACT_THRESHOLD;
        let class = if is_correct {
            VerdictClass::Correct
        } else if transcript_similarity >= CLOSE_THRESHOLD {
            VerdictClass::Close
        } else {
            VerdictClass::Wrong
        };

        let feedback = FeedbackBuilder::new(locale)
            .class(class)
            .audio_feedback(json!({
                "transcript": transcription.transcript,
                "confidence": transcription.confidence,
                "accuracy": pronunciation.accuracy,
                "fluency": pronunciation.fluency,
                "word_level": pronunciation.word_level,
            }))
            .explanation(exercise.explanation.clone())
            .build();
        Ok(Verdict::new(is_correct, composite, feedback))
    }

    async fn eval_dictation(
        &self,
        exercise: &ExerciseDef,
        answer: Option<&UserAnswer>,
        audio_ref: Option<&str>,
        locale: &str,
    ) -> CoreResult<Verdict> {
        let typed = match answer {
            Some(value) => {
                let text = value
                    .as_text()
                    .ok_or_else(|| CoreError::invalid_input("Dictation answers must be text"))?;
                let normalized = normalize(text, locale);
                if normalized.is_empty() {
                    None
                } else {
                    Some(normalized)
                }
            }
            None => None,
        };

        let transcript = if let Some(typed) = typed {
            typed
        } else if let Some(audio) = audio_ref {
            let recognizer = self.recognizer.as_ref().ok_or_else(|| {
                CoreError::capability_unavailable("Speech recognition is not configured")
            })?;
            let transcription = recognizer.transcribe(audio, locale).await?;
            normalize(&transcription.transcript, locale)
        } else {
            return Err(CoreError::invalid_input(
                "Dictation needs a typed answer or an audio recording",
            ));
        };

        let reference = normalize(&self.accepted_answers(exercise)?[0], locale);
        if transcript == reference {
            return Ok(self.verdict(exercise, locale, VerdictClass::Correct, true, 1.0));
        }

        let max_len = transcript.chars().count().max(reference.chars().count());
        let accuracy = if max_len == 0 {
            0.0
        } else {
            1.0 - edit_distance(&transcript, &reference) as f64 / max_len as f64
        };
        let is_correct = accuracy >= NEAR_EXACT_THRESHOLD;
        let score = DICTATION_ACCURACY_FACTOR * accuracy;
        let class = if is_correct {
            VerdictClass::Near
        } else {
            VerdictClass::Wrong
        };
        Ok(self.verdict(exercise, locale, class, is_correct, score))
    }

    /// Reference answers as a non-empty text list.
    fn accepted_answers(&self, exercise: &ExerciseDef) -> CoreResult<Vec<String>> {
        let accepted: Vec<String> = exercise
            .correct_answer
            .as_texts()
            .unwrap_or_default()
            .into_iter()
            .map(str::to_string)
            .collect();
        if accepted.is_empty() {
            return Err(CoreError::Evaluation(anyhow::anyhow!(
                "Exercise {} stores no reference answer text",
                exercise.id
            )));
        }
        Ok(accepted)
    }

    fn verdict(
        &self,
        exercise: &ExerciseDef,
        locale: &str,
        class: VerdictClass,
        is_correct: bool,
        score: f64,
    ) -> Verdict {
        let feedback = FeedbackBuilder::new(locale)
            .class(class)
            .explanation(exercise.explanation.clone())
            .build();
        Verdict::new(is_correct, score, feedback)
    }
}

fn text_answer<'a>(answer: Option<&'a UserAnswer>, kind_label: &str) -> CoreResult<&'a str> {
    answer
        .ok_or_else(|| CoreError::invalid_input(format!("{kind_label} answers require text")))?
        .as_text()
        .ok_or_else(|| CoreError::invalid_input(format!("{kind_label} answers must be text")))
}

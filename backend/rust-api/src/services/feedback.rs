//! Assembles the structured feedback record a verdict carries. General
//! messages come from a small canned set per locale; the builder itself can
//! never fail — worst case the caller gets `Feedback::unavailable()`.

use std::collections::BTreeMap;

use crate::models::Feedback;

/// Verdict class the canned messages are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictClass {
    Correct,
    /// Right answer with a small spelling slip.
    Near,
    /// Wrong but within the "close" thresholds.
    Close,
    Wrong,
    /// No answer was given at all.
    Empty,
}

pub struct FeedbackBuilder {
    uzbek: bool,
    class: VerdictClass,
    specific: BTreeMap<String, serde_json::Value>,
    audio_feedback: Option<serde_json::Value>,
    explanation: Option<String>,
}

impl FeedbackBuilder {
    pub fn new(locale: &str) -> Self {
        let locale = locale.to_ascii_lowercase();
        Self {
            uzbek: locale == "uz" || locale.starts_with("uz-") || locale.starts_with("uz_"),
            class: VerdictClass::Wrong,
            specific: BTreeMap::new(),
            audio_feedback: None,
            explanation: None,
        }
    }

    pub fn class(mut self, class: VerdictClass) -> Self {
        self.class = class;
        self
    }

    pub fn specific_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.specific.insert(key.into(), value);
        self
    }

    /// Label under which the resolved correct answer appears in `specific`
    /// for wrong choice answers.
    pub fn correct_answer_label(&self) -> &'static str {
        if self.uzbek {
            "To'g'ri javob"
        } else {
            "Correct answer"
        }
    }

    pub fn audio_feedback(mut self, value: serde_json::Value) -> Self {
        self.audio_feedback = Some(value);
        self
    }

    pub fn explanation(mut self, explanation: Option<String>) -> Self {
        self.explanation = explanation;
        self
    }

    pub fn build(self) -> Feedback {
        Feedback {
            general: general_message(self.uzbek, self.class).to_string(),
            specific: self.specific,
            suggestions: suggestions(self.uzbek, self.class),
            audio_feedback: self.audio_feedback,
            explanation: self.explanation,
        }
    }

    /// Feedback recorded when evaluation itself blew up; also used by session
    /// grading for responses that could not be graded.
    pub fn evaluation_failed() -> Feedback {
        Feedback {
            general: "evaluation failed".to_string(),
            ..Feedback::default()
        }
    }
}

fn general_message(uzbek: bool, class: VerdictClass) -> &'static str {
    if uzbek {
        match class {
            VerdictClass::Correct => "✅ To'g'ri!",
            VerdictClass::Near => "✅ Deyarli to'g'ri!",
            VerdictClass::Close => "🟡 Yaqin keldingiz.",
            VerdictClass::Wrong => "❌ Noto'g'ri.",
            VerdictClass::Empty => "Javob kiritilmadi.",
        }
    } else {
        match class {
            VerdictClass::Correct => "✅ Correct!",
            VerdictClass::Near => "✅ Almost right!",
            VerdictClass::Close => "🟡 Close.",
            VerdictClass::Wrong => "❌ Incorrect.",
            VerdictClass::Empty => "No answer was given.",
        }
    }
}

fn suggestions(uzbek: bool, class: VerdictClass) -> Vec<String> {
    let lines: &[&str] = if uzbek {
        match class {
            VerdictClass::Correct => &[],
            VerdictClass::Near => &["Imloni tekshirib chiqing."],
            VerdictClass::Close => &["Javobingizni imlo jihatdan tekshiring."],
            VerdictClass::Wrong => &["Qoidani takrorlab, yana urinib ko'ring."],
            VerdictClass::Empty => &["Avval javob yozing."],
        }
    } else {
        match class {
            VerdictClass::Correct => &[],
            VerdictClass::Near => &["Check your spelling."],
            VerdictClass::Close => &["Review your answer for spelling mistakes."],
            VerdictClass::Wrong => &["Review the rule and try again."],
            VerdictClass::Empty => &["Write an answer first."],
        }
    };
    lines.iter().map(|s| s.to_string()).collect()
}

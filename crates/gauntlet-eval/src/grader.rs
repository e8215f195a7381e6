use gauntlet_core::types::GraderKind;

/// Outcome of grading one response.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeOutcome {
    /// The comparison ran; 1.0 for a hit, 0.0 for a miss.
    Scored(f64),
    /// The grader kind is not one this version knows how to apply.
    Unsupported(String),
}

impl GradeOutcome {
    /// Collapse to the numeric scale used for aggregation.
    pub fn score(&self) -> f64 {
        match self {
            Self::Scored(s) => *s,
            Self::Unsupported(_) => 0.0,
        }
    }
}

/// Compare a model response against the expected output.
///
/// `ExactMatch` trims both sides before comparing. `PartialMatch` checks
/// case-sensitive substring containment of the expected output, untrimmed.
/// Pure and total: every string pair grades, and unknown kinds come back as
/// `Unsupported` rather than a score indistinguishable from a real miss.
pub fn grade(expected: &str, actual: &str, kind: &GraderKind) -> GradeOutcome {
    match kind {
        GraderKind::ExactMatch => {
            if actual.trim() == expected.trim() {
                GradeOutcome::Scored(1.0)
            } else {
                GradeOutcome::Scored(0.0)
            }
        }
        GraderKind::PartialMatch => {
            if actual.contains(expected) {
                GradeOutcome::Scored(1.0)
            } else {
                GradeOutcome::Scored(0.0)
            }
        }
        GraderKind::Other(name) => GradeOutcome::Unsupported(name.clone()),
    }
}

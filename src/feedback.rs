//! Interview feedback summary

use std::fmt::Write as _;

use crate::backend::FeedbackResponse;

/// Qualitative band for a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    /// 80 and above
    Excellent,
    /// 60 to 79
    Good,
    /// Below 60
    NeedsWork,
}

impl ScoreBand {
    /// Band for a score
    #[must_use]
    pub const fn from_score(score: u32) -> Self {
        if score >= 80 {
            Self::Excellent
        } else if score >= 60 {
            Self::Good
        } else {
            Self::NeedsWork
        }
    }

    /// Label shown under the score
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent performance",
            Self::Good => "Good progress",
            Self::NeedsWork => "Room for improvement",
        }
    }
}

/// Feedback ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackReport {
    feedback: FeedbackResponse,
}

impl FeedbackReport {
    /// Wrap a backend feedback response
    #[must_use]
    pub const fn new(feedback: FeedbackResponse) -> Self {
        Self { feedback }
    }

    /// Raw feedback
    #[must_use]
    pub const fn feedback(&self) -> &FeedbackResponse {
        &self.feedback
    }

    /// Band of the technical score
    #[must_use]
    pub const fn technical_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.feedback.technical_score)
    }

    /// Band of the communication score
    #[must_use]
    pub const fn communication_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.feedback.communication_score)
    }

    /// Render as plain text
    #[must_use]
    pub fn render(&self) -> String {
        let f = &self.feedback;
        let mut out = String::new();

        let _ = writeln!(out, "Interview Complete\n");
        let _ = writeln!(
            out,
            "Technical Knowledge: {}/100  {}",
            f.technical_score,
            self.technical_band().label()
        );
        let _ = writeln!(
            out,
            "Communication:       {}/100  {}",
            f.communication_score,
            self.communication_band().label()
        );

        let _ = writeln!(out, "\nStrengths");
        for strength in &f.strengths {
            let _ = writeln!(out, "  + {strength}");
        }

        let _ = writeln!(out, "\nAreas for Improvement");
        for improvement in &f.improvements {
            let _ = writeln!(out, "  - {improvement}");
        }

        let _ = writeln!(out, "\nOverall Assessment");
        let _ = writeln!(out, "  {}", f.overall_feedback);

        out
    }
}

impl std::fmt::Display for FeedbackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

//! Recent-form token sequences.
//!
//! Standings carry a short win/draw/loss history per team. The sequence is
//! ordered most recent first: index 0 is the latest match. All streak and
//! pattern checks therefore look at the front of the sequence.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormToken {
    Win,
    Draw,
    Loss,
}

impl FormToken {
    pub fn points(self) -> f64 {
        match self {
            FormToken::Win => 3.0,
            FormToken::Draw => 1.0,
            FormToken::Loss => 0.0,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'W' => Some(FormToken::Win),
            'D' => Some(FormToken::Draw),
            'L' => Some(FormToken::Loss),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            FormToken::Win => 'W',
            FormToken::Draw => 'D',
            FormToken::Loss => 'L',
        }
    }
}

/// Alternating end-of-form patterns that make a team unmodelable.
const UNSTABLE_PATTERNS: [&str; 6] = ["WLW", "LWL", "WDW", "LDL", "WLWL", "LWLW"];

const FORM_WINDOW: usize = 5;
const RECENCY_BOOST: f64 = 1.5;
const RECENCY_MATCHES: usize = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form(Vec<FormToken>);

impl Form {
    pub fn new(tokens: Vec<FormToken>) -> Self {
        Self(tokens)
    }

    /// Parses a stored form string like "WWLDW" (most recent first).
    /// Unknown characters are skipped.
    pub fn parse(raw: &str) -> Self {
        Self(raw.chars().filter_map(FormToken::from_char).collect())
    }

    pub fn encode(&self) -> String {
        self.0.iter().map(|t| t.as_char()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn window(&self) -> &[FormToken] {
        &self.0[..self.0.len().min(FORM_WINDOW)]
    }

    /// Plain W=3/D=1/L=0 sum over the last five matches.
    pub fn points(&self) -> f64 {
        self.window().iter().map(|t| t.points()).sum()
    }

    /// Recency-weighted points: the two most recent matches count 1.5x.
    /// Falls back to the plain sum when fewer than five matches are known.
    pub fn weighted_points(&self) -> f64 {
        if self.0.len() < FORM_WINDOW {
            return self.points();
        }
        self.window()
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mult = if i < RECENCY_MATCHES { RECENCY_BOOST } else { 1.0 };
                t.points() * mult
            })
            .sum()
    }

    /// Current streak signal: three or more straight wins +3.0, exactly two
    /// +1.5, symmetric negative for losses, anything else 0.
    pub fn momentum(&self) -> f64 {
        if self.0.len() < 3 {
            return 0.0;
        }
        let streak = |token: FormToken| self.0.iter().take_while(|t| **t == token).count();
        let wins = streak(FormToken::Win);
        if wins >= 3 {
            return 3.0;
        }
        if wins == 2 {
            return 1.5;
        }
        let losses = streak(FormToken::Loss);
        if losses >= 3 {
            return -3.0;
        }
        if losses == 2 {
            return -1.5;
        }
        0.0
    }

    /// True when the current run of results matches one of the alternating
    /// patterns (win-loss-win and friends).
    pub fn is_unstable(&self) -> bool {
        if self.0.len() < 3 {
            return false;
        }
        let encoded = self.encode();
        UNSTABLE_PATTERNS.iter().any(|p| encoded.starts_with(p))
    }

    /// Points over the window normalized to [0, 1]; 0.5 when no history.
    pub fn normalized_score(&self) -> f64 {
        let window = self.window();
        if window.is_empty() {
            return 0.5;
        }
        let points: f64 = window.iter().map(|t| t.points()).sum();
        points / (3.0 * window.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_unknown_chars() {
        let form = Form::parse("W-D L?");
        assert_eq!(form.encode(), "WDL");
    }

    #[test]
    fn weighted_points_boosts_two_most_recent() {
        // WWLLL: plain 6.0, weighted = 3*1.5 + 3*1.5 = 9.0
        let form = Form::parse("WWLLL");
        assert_eq!(form.points(), 6.0);
        assert_eq!(form.weighted_points(), 9.0);
    }

    #[test]
    fn weighted_points_falls_back_on_short_history() {
        let form = Form::parse("WW");
        assert_eq!(form.weighted_points(), 6.0);
    }

    #[test]
    fn momentum_prefers_longer_streak() {
        assert_eq!(Form::parse("WWWLD").momentum(), 3.0);
        assert_eq!(Form::parse("WWLWW").momentum(), 1.5);
        assert_eq!(Form::parse("LLLWW").momentum(), -3.0);
        assert_eq!(Form::parse("LLWLL").momentum(), -1.5);
        assert_eq!(Form::parse("WDWLL").momentum(), 0.0);
    }

    #[test]
    fn momentum_needs_three_matches() {
        assert_eq!(Form::parse("WW").momentum(), 0.0);
    }

    #[test]
    fn instability_matches_alternating_runs() {
        assert!(Form::parse("WLWDD").is_unstable());
        assert!(Form::parse("LWLWW").is_unstable());
        assert!(Form::parse("WDWLL").is_unstable());
        assert!(Form::parse("LDLWW").is_unstable());
        assert!(!Form::parse("WWWLL").is_unstable());
        assert!(!Form::parse("WL").is_unstable());
    }

    #[test]
    fn normalized_score_defaults_to_neutral() {
        assert_eq!(Form::default().normalized_score(), 0.5);
        assert!((Form::parse("WWWWW").normalized_score() - 1.0).abs() < 1e-12);
        assert!((Form::parse("DDDDD").normalized_score() - 1.0 / 3.0).abs() < 1e-12);
    }
}

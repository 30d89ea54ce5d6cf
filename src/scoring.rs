//! Heuristic fixture scoring: the multi-factor enhanced scorer with its
//! strict reject rules, the simple ranking+form fallback, and the odds-trap
//! detectors. Confidence is a raw magnitude, not a probability; only ranking
//! and threshold comparisons use it.

use log::{info, warn};

use crate::features::{
    self, FixtureContext, HOME_ADVANTAGE, OddsTriple,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn code(self) -> &'static str {
        match self {
            Outcome::Home => "H",
            Outcome::Draw => "D",
            Outcome::Away => "A",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "H" => Some(Outcome::Home),
            "D" => Some(Outcome::Draw),
            "A" => Some(Outcome::Away),
            _ => None,
        }
    }

    pub fn from_score(home_goals: i64, away_goals: i64) -> Self {
        if home_goals > away_goals {
            Outcome::Home
        } else if home_goals < away_goals {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }
}

/// Result of scoring one fixture. A no-call carries no confidence at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreDecision {
    Call { outcome: Outcome, confidence: f64 },
    NoCall,
}

impl ScoreDecision {
    pub fn confidence(&self) -> f64 {
        match self {
            ScoreDecision::Call { confidence, .. } => *confidence,
            ScoreDecision::NoCall => 0.0,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            ScoreDecision::Call { outcome, .. } => Some(*outcome),
            ScoreDecision::NoCall => None,
        }
    }
}

const OBVIOUS_FAVORITE_PRICE: f64 = 1.30;
const NEAR_EQUILIBRIUM_GAP: f64 = 0.299;
const IDEAL_ZONE: (f64, f64) = (1.50, 2.20);
const DEEP_OUTSIDER_PRICE: f64 = 5.0;

/// Trap/opportunity signal from the three-way prices. Virtual-league
/// algorithms punish obvious favorites, so a very short price is a malus.
pub fn analyze_suspicious_odds(odds: OddsTriple) -> f64 {
    let min_side = odds.home.min(odds.away);
    let max_side = odds.home.max(odds.away);
    let gap = (odds.home - odds.away).abs();

    if min_side < OBVIOUS_FAVORITE_PRICE {
        return -3.0;
    }
    if gap < NEAR_EQUILIBRIUM_GAP {
        return -1.5;
    }
    if min_side >= IDEAL_ZONE.0 && min_side <= IDEAL_ZONE.1 {
        return 2.0;
    }
    if max_side > DEEP_OUTSIDER_PRICE {
        return 1.0;
    }
    0.0
}

/// Three prices packed inside a tight band make the fixture unreadable.
pub fn detect_balanced_match(odds: OddsTriple) -> bool {
    let home_away = (odds.home - odds.away).abs();
    let home_draw = (odds.home - odds.draw).abs();
    let away_draw = (odds.away - odds.draw).abs();
    home_away < 0.3 && home_draw < 0.4 && away_draw < 0.4
}

const WIN_THRESHOLD: f64 = 7.0;
const DRAW_BAND: (f64, f64) = (-3.0, 3.0);
const SIMPLE_WIN_THRESHOLD: f64 = 5.0;
const H2H_REJECT: f64 = -2.5;
const ODDS_REJECT: f64 = -3.0;

/// Full multi-factor scorer with reject rules. Requires odds; the caller
/// falls back to `score_simple` when they are missing.
pub fn score_enhanced(ctx: &FixtureContext, odds: OddsTriple) -> ScoreDecision {
    let (Some(home), Some(away)) = (&ctx.home, &ctx.away) else {
        return ScoreDecision::NoCall;
    };

    let base_score = features::rank_score_enhanced(home.points, away.points)
        + features::form_score(&home.form, &away.form)
        + features::goals_score(ctx.home_goals, ctx.away_goals)
        + HOME_ADVANTAGE;

    if home.form.is_unstable() || away.form.is_unstable() {
        info!(
            "round {} fixture {}v{}: rejected, unstable form ({} / {})",
            ctx.round,
            ctx.home_id,
            ctx.away_id,
            home.form.encode(),
            away.form.encode()
        );
        return ScoreDecision::NoCall;
    }

    if detect_balanced_match(odds) {
        info!(
            "round {} fixture {}v{}: rejected, balanced prices {:.2}/{:.2}/{:.2}",
            ctx.round, ctx.home_id, ctx.away_id, odds.home, odds.draw, odds.away
        );
        return ScoreDecision::NoCall;
    }

    let h2h_bonus = features::head_to_head_bonus(&ctx.head_to_head);
    if h2h_bonus <= H2H_REJECT {
        info!(
            "round {} fixture {}v{}: rejected, hostile head-to-head ({:.1})",
            ctx.round, ctx.home_id, ctx.away_id, h2h_bonus
        );
        return ScoreDecision::NoCall;
    }

    let odds_signal = analyze_suspicious_odds(odds);
    if odds_signal <= ODDS_REJECT {
        info!(
            "round {} fixture {}v{}: rejected, odds trap (favorite at {:.2})",
            ctx.round,
            ctx.home_id,
            ctx.away_id,
            odds.home.min(odds.away)
        );
        return ScoreDecision::NoCall;
    }

    let momentum = features::momentum_bonus(&home.form, &away.form);
    let final_score = base_score + h2h_bonus + odds_signal + momentum;

    if final_score > WIN_THRESHOLD {
        ScoreDecision::Call {
            outcome: Outcome::Home,
            confidence: final_score,
        }
    } else if final_score < -WIN_THRESHOLD {
        ScoreDecision::Call {
            outcome: Outcome::Away,
            confidence: final_score.abs(),
        }
    } else if final_score >= DRAW_BAND.0 && final_score <= DRAW_BAND.1 {
        ScoreDecision::Call {
            outcome: Outcome::Draw,
            confidence: final_score.abs(),
        }
    } else {
        info!(
            "round {} fixture {}v{}: rejected, uncertain zone (score {:.2})",
            ctx.round, ctx.home_id, ctx.away_id, final_score
        );
        ScoreDecision::NoCall
    }
}

/// Ranking+form scorer used before odds exist. No reject rules.
pub fn score_simple(ctx: &FixtureContext) -> ScoreDecision {
    let (Some(home), Some(away)) = (&ctx.home, &ctx.away) else {
        return ScoreDecision::NoCall;
    };

    let score = features::rank_score_simple(home.points, away.points)
        + (home.form.points() - away.form.points());

    if score > SIMPLE_WIN_THRESHOLD {
        ScoreDecision::Call {
            outcome: Outcome::Home,
            confidence: score,
        }
    } else if score < -SIMPLE_WIN_THRESHOLD {
        ScoreDecision::Call {
            outcome: Outcome::Away,
            confidence: score.abs(),
        }
    } else {
        ScoreDecision::Call {
            outcome: Outcome::Draw,
            confidence: score.abs(),
        }
    }
}

/// Enhanced scoring when all three prices are known, simple otherwise.
pub fn score_with_fallback(ctx: &FixtureContext) -> ScoreDecision {
    match ctx.odds {
        Some(odds) => score_enhanced(ctx, odds),
        None => {
            warn!(
                "round {} fixture {}v{}: odds missing, falling back to simple scoring",
                ctx.round, ctx.home_id, ctx.away_id
            );
            score_simple(ctx)
        }
    }
}

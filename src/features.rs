//! Engineered signals for one fixture, derived from standings, goal history,
//! head-to-head meetings and odds. Everything here is pure; the orchestrator
//! assembles a `FixtureContext` from the store and the scorers consume it.

use crate::form::Form;

const RANK_WEIGHT_ENHANCED: f64 = 0.4;
const RANK_WEIGHT_SIMPLE: f64 = 0.5;
const FORM_WEIGHT: f64 = 0.3;
const GOAL_DIFF_WEIGHT: f64 = 0.1;
const GOALS_WEIGHT: f64 = 0.15;
const MOMENTUM_WEIGHT: f64 = 0.5;

/// Flat bonus for playing at home, applied in enhanced scoring.
pub const HOME_ADVANTAGE: f64 = 2.0;

/// Head-to-head patterns need at least this many completed meetings.
const H2H_MIN_MEETINGS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct GoalAverages {
    pub scored: f64,
    pub conceded: f64,
}

#[derive(Debug, Clone)]
pub struct TeamSnapshot {
    pub position: Option<i64>,
    pub points: i64,
    pub form: Form,
}

#[derive(Debug, Clone, Copy)]
pub struct OddsTriple {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

/// Everything known about a fixture when it is scored.
#[derive(Debug, Clone)]
pub struct FixtureContext {
    pub round: i64,
    pub home_id: i64,
    pub away_id: i64,
    pub home: Option<TeamSnapshot>,
    pub away: Option<TeamSnapshot>,
    pub home_goals: Option<GoalAverages>,
    pub away_goals: Option<GoalAverages>,
    /// Score pairs of previous meetings with the same orientation, most
    /// recent first, at most five.
    pub head_to_head: Vec<(i64, i64)>,
    pub odds: Option<OddsTriple>,
}

pub fn rank_score_enhanced(points_home: i64, points_away: i64) -> f64 {
    (points_home - points_away) as f64 * RANK_WEIGHT_ENHANCED
}

pub fn rank_score_simple(points_home: i64, points_away: i64) -> f64 {
    (points_home - points_away) as f64 * RANK_WEIGHT_SIMPLE
}

/// Recency-weighted form differential.
pub fn form_score(home: &Form, away: &Form) -> f64 {
    (home.weighted_points() - away.weighted_points()) * FORM_WEIGHT
}

/// Attack/defense differential from recent goal averages. Zero when either
/// side has no completed matches yet.
pub fn goals_score(home: Option<GoalAverages>, away: Option<GoalAverages>) -> f64 {
    let (Some(home), Some(away)) = (home, away) else {
        return 0.0;
    };
    let attack_diff = (home.scored - away.scored) * GOAL_DIFF_WEIGHT;
    let defense_diff = (away.conceded - home.conceded) * GOAL_DIFF_WEIGHT;
    (attack_diff + defense_diff) * GOALS_WEIGHT
}

/// Repeating patterns in direct meetings, from the home side's perspective.
/// Fewer than three meetings is too small a sample and yields 0.
pub fn head_to_head_bonus(meetings: &[(i64, i64)]) -> f64 {
    if meetings.len() < H2H_MIN_MEETINGS {
        return 0.0;
    }
    let total = meetings.len() as f64;
    let home_wins = meetings.iter().filter(|(h, a)| h > a).count() as f64;
    let draws = meetings.iter().filter(|(h, a)| h == a).count() as f64;

    let home_win_rate = home_wins / total;
    let draw_rate = draws / total;

    if home_win_rate >= 0.80 {
        3.0
    } else if home_win_rate >= 0.60 {
        1.5
    } else if draw_rate >= 0.60 {
        -2.0
    } else if home_win_rate <= 0.20 {
        -3.0
    } else {
        0.0
    }
}

/// Streak differential between the two sides.
pub fn momentum_bonus(home: &Form, away: &Form) -> f64 {
    (home.momentum() - away.momentum()) * MOMENTUM_WEIGHT
}

// League-average per-match goal rates used when a team has no history yet.
const DEFAULT_HOME_SCORED: f64 = 1.4;
const DEFAULT_HOME_CONCEDED: f64 = 1.1;
const DEFAULT_AWAY_SCORED: f64 = 1.1;
const DEFAULT_AWAY_CONCEDED: f64 = 1.4;
const GOAL_RATE_CEILING: f64 = 4.0;
const POSITION_SPAN: f64 = 20.0;

/// Fixed-length observation for the external shadow scorer:
/// rank differential, form differential, normalized attack/defense rates for
/// both sides, implied odds probabilities and the season-progress fraction.
pub fn shadow_feature_vector(ctx: &FixtureContext, season_rounds: i64) -> Vec<f64> {
    let rank_diff = match (&ctx.home, &ctx.away) {
        (Some(home), Some(away)) => match (home.position, away.position) {
            (Some(h), Some(a)) => (h - a) as f64 / POSITION_SPAN,
            _ => 0.0,
        },
        _ => 0.0,
    };

    let form_diff = {
        let home = ctx
            .home
            .as_ref()
            .map(|s| s.form.normalized_score())
            .unwrap_or(0.5);
        let away = ctx
            .away
            .as_ref()
            .map(|s| s.form.normalized_score())
            .unwrap_or(0.5);
        home - away
    };

    let home_goals = ctx.home_goals.unwrap_or(GoalAverages {
        scored: DEFAULT_HOME_SCORED,
        conceded: DEFAULT_HOME_CONCEDED,
    });
    let away_goals = ctx.away_goals.unwrap_or(GoalAverages {
        scored: DEFAULT_AWAY_SCORED,
        conceded: DEFAULT_AWAY_CONCEDED,
    });

    let (p_home, p_draw, p_away) = match ctx.odds {
        Some(odds) => (
            implied_probability(odds.home),
            implied_probability(odds.draw),
            implied_probability(odds.away),
        ),
        None => (0.0, 0.0, 0.0),
    };

    vec![
        rank_diff,
        form_diff,
        goal_rate(home_goals.scored),
        goal_rate(home_goals.conceded),
        goal_rate(away_goals.scored),
        goal_rate(away_goals.conceded),
        p_home,
        p_draw,
        p_away,
        ctx.round as f64 / season_rounds.max(1) as f64,
    ]
}

fn goal_rate(per_match: f64) -> f64 {
    per_match.min(GOAL_RATE_CEILING).max(0.0) / GOAL_RATE_CEILING
}

fn implied_probability(price: f64) -> f64 {
    if price <= 1.0 { 0.0 } else { 1.0 / price }
}

//! 依成績點數推算舞者目前可以報名的分級。
//!
//! 規則由高到低依序比對，第一個舞者有成績的分級決定結果，
//! 較低分級不再檢查。

use crate::domain::model::{Division, DivisionEligibility, FlatPlacement, Role};
use std::collections::HashMap;

/// 各技術分級的 (下限, 上限) 點數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionLimits {
    pub lower: u32,
    pub upper: u32,
}

pub const SKILL_DIVISION_LIMITS: [(Division, DivisionLimits); 6] = [
    (Division::Champions, DivisionLimits { lower: 1, upper: 10 }),
    (Division::AllStars, DivisionLimits { lower: 150, upper: 225 }),
    (Division::Advanced, DivisionLimits { lower: 60, upper: 90 }),
    (Division::Intermediate, DivisionLimits { lower: 30, upper: 45 }),
    (Division::Novice, DivisionLimits { lower: 16, upper: 30 }),
    (Division::Newcomer, DivisionLimits { lower: 0, upper: 1 }),
];

pub fn limits_for(division: Division) -> Option<DivisionLimits> {
    SKILL_DIVISION_LIMITS
        .iter()
        .find(|(d, _)| *d == division)
        .map(|(_, limits)| *limits)
}

/// 觸發規則後授予的分級
#[derive(Debug, Clone, Copy)]
enum Grant {
    Always(Division),
    /// 該層點數達到下限時授予
    AtLeastLower(Division),
    /// 該層點數低於上限時授予
    BelowUpper(Division),
}

#[derive(Debug)]
struct TierRule {
    tier: Division,
    grants: &'static [Grant],
}

const TIER_RULES: [TierRule; 6] = [
    TierRule {
        tier: Division::Champions,
        grants: &[
            Grant::Always(Division::Champions),
            Grant::BelowUpper(Division::AllStars),
        ],
    },
    TierRule {
        tier: Division::AllStars,
        grants: &[
            Grant::AtLeastLower(Division::Champions),
            Grant::BelowUpper(Division::AllStars),
        ],
    },
    TierRule {
        tier: Division::Advanced,
        grants: &[
            Grant::AtLeastLower(Division::AllStars),
            Grant::BelowUpper(Division::Advanced),
        ],
    },
    TierRule {
        tier: Division::Intermediate,
        grants: &[
            Grant::AtLeastLower(Division::Advanced),
            Grant::BelowUpper(Division::Intermediate),
        ],
    },
    TierRule {
        tier: Division::Novice,
        grants: &[
            Grant::AtLeastLower(Division::Intermediate),
            Grant::BelowUpper(Division::Novice),
        ],
    },
    TierRule {
        tier: Division::Newcomer,
        grants: &[Grant::Always(Division::Novice)],
    },
];

/// 該角色完全沒有成績時
const NO_HISTORY: [Division; 2] = [Division::Novice, Division::Newcomer];

/// 次要角色的合理性過濾：主要角色資格不含 `unless_primary_has` 任一項時移除 `drop`
struct PlausibilityRule {
    drop: Division,
    unless_primary_has: &'static [Division],
}

const SECONDARY_ROLE_FILTER: [PlausibilityRule; 3] = [
    PlausibilityRule {
        drop: Division::Newcomer,
        unless_primary_has: &[Division::Novice],
    },
    PlausibilityRule {
        drop: Division::Novice,
        unless_primary_has: &[Division::Novice, Division::Intermediate, Division::Advanced],
    },
    PlausibilityRule {
        drop: Division::Intermediate,
        unless_primary_has: &[Division::Advanced, Division::AllStars],
    },
];

fn points_per_division(role: Role, placements: &[FlatPlacement]) -> HashMap<Division, u32> {
    let mut totals = HashMap::new();
    for placement in placements.iter().filter(|p| p.role == role) {
        *totals.entry(placement.division).or_insert(0) += placement.points;
    }
    totals
}

fn apply_rule(rule: &TierRule, points: u32) -> Vec<Division> {
    // 規則只會用在技術分級上
    let Some(limits) = limits_for(rule.tier) else {
        return Vec::new();
    };
    rule.grants
        .iter()
        .filter_map(|grant| match *grant {
            Grant::Always(d) => Some(d),
            Grant::AtLeastLower(d) => (points >= limits.lower).then_some(d),
            Grant::BelowUpper(d) => (points < limits.upper).then_some(d),
        })
        .collect()
}

/// 計算某角色目前可報名的分級，順序由高到低。
///
/// `primary` 為 `None` 時代表計算主要角色；否則代表次要角色，並以主要角色
/// 的結果做合理性過濾。
pub fn classify(
    role: Role,
    placements: &[FlatPlacement],
    primary: Option<&[Division]>,
) -> Vec<Division> {
    let totals = points_per_division(role, placements);

    let mut eligible = TIER_RULES
        .iter()
        .find_map(|rule| totals.get(&rule.tier).map(|points| apply_rule(rule, *points)))
        .unwrap_or_else(|| NO_HISTORY.to_vec());

    if let Some(primary) = primary {
        for rule in &SECONDARY_ROLE_FILTER {
            if !rule.unless_primary_has.iter().any(|d| primary.contains(d)) {
                eligible.retain(|d| *d != rule.drop);
            }
        }
    }

    eligible
}

/// 主要角色先計算，其餘競賽角色以次要角色計算
pub fn eligibility_for(primary_role: Role, placements: &[FlatPlacement]) -> DivisionEligibility {
    let primary = classify(primary_role, placements, None);
    let mut eligibility = DivisionEligibility::new();

    for role in Role::COMPETITIVE.into_iter().filter(|r| *r != primary_role) {
        eligibility.insert(role, classify(role, placements, Some(primary.as_slice())));
    }
    eligibility.insert(primary_role, primary);

    eligibility
}

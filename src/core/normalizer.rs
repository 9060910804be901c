//! 將上游巢狀的成績樹攤平成日期化的成績列表。
//!
//! 分級與角色名稱對照表在此集中維護；查無名稱代表上游格式已變動，
//! 直接回報錯誤而不是猜測。

use crate::domain::model::{
    DancerRecord, Division, DivisionBlock, EventOccurrence, FlatPlacement, Role,
    RolePlacementTree,
};
use crate::utils::error::{PointsError, Result};
use chrono::NaiveDate;
use serde_json::Value;

/// 名稱對照表版本，調整 [`Division`] 或 [`Role`] 名稱時遞增
pub const NAME_TABLE_VERSION: u32 = 1;

pub const DEFAULT_DANCE_STYLE: &str = "West Coast Swing";

/// 無法解析的日期一律視為 1970-01-01
pub fn sentinel_date() -> NaiveDate {
    NaiveDate::default()
}

/// 解析上游的 "Month Year" 日期，例如 "June 2019"
pub fn parse_month_year(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("1 {}", raw.trim()), "%d %B %Y").ok()
}

pub fn parse_event_date(raw: Option<&str>) -> NaiveDate {
    raw.and_then(parse_month_year).unwrap_or_else(sentinel_date)
}

/// 與上游一致的 title case："ALL-STARS" → "All-Stars"
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut previous_is_letter = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

pub fn division_from_name(name: &str) -> Result<Division> {
    let wanted = title_case(name.trim());
    Division::ALL
        .into_iter()
        .find(|d| d.name() == wanted)
        .ok_or_else(|| PointsError::UnknownDivision {
            name: name.to_string(),
        })
}

pub fn role_from_name(name: &str) -> Result<Role> {
    let wanted = title_case(name.trim());
    Role::ALL
        .into_iter()
        .find(|r| r.name() == wanted)
        .ok_or_else(|| PointsError::UnknownRole {
            name: name.to_string(),
        })
}

fn result_text(result: &Value) -> String {
    match result {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPlacements {
    pub placements: Vec<FlatPlacement>,
    pub events: Vec<EventOccurrence>,
    pub earliest_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    dance_style: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_DANCE_STYLE)
    }
}

impl Normalizer {
    pub fn new(dance_style: impl Into<String>) -> Self {
        Self {
            dance_style: dance_style.into(),
        }
    }

    pub fn dance_style(&self) -> &str {
        &self.dance_style
    }

    fn divisions<'a>(
        &self,
        tree: Option<&'a RolePlacementTree>,
    ) -> impl Iterator<Item = &'a DivisionBlock> + 'a {
        let style = match tree {
            Some(RolePlacementTree::Styles(styles)) => styles.get(&self.dance_style),
            _ => None,
        };
        style.into_iter().flat_map(|divisions| divisions.values())
    }

    /// 攤平單一角色的成績樹。輸出不排序，由呼叫端合併後再依日期排序
    pub fn normalize(
        &self,
        dancer_id: u64,
        tree: Option<&RolePlacementTree>,
    ) -> Result<NormalizedPlacements> {
        let mut out = NormalizedPlacements::default();

        for block in self.divisions(tree) {
            let division = division_from_name(&block.division.name)?;

            for competition in &block.competitions {
                let date = parse_event_date(competition.event.date.as_deref());
                if out.earliest_date.map_or(true, |earliest| date < earliest) {
                    out.earliest_date = Some(date);
                }

                let points = match competition.points {
                    Some(points) => points,
                    None => {
                        tracing::warn!(
                            "Missing points for dancer {} at event {}, counting as 0",
                            dancer_id,
                            competition.event.id
                        );
                        0
                    }
                };

                let role = role_from_name(&competition.role)?;

                out.events.push(EventOccurrence {
                    id: competition.event.id,
                    name: competition.event.name.clone(),
                    location: competition.event.location.clone(),
                    url: competition.event.url.clone(),
                    date,
                });
                out.placements.push(FlatPlacement {
                    role,
                    result: result_text(&competition.result),
                    points,
                    event: competition.event.id,
                    date,
                    division,
                });
            }
        }

        Ok(out)
    }

    /// 單一角色最近一次成績的日期；只讀日期，不做名稱查表
    pub fn latest_date(&self, tree: Option<&RolePlacementTree>) -> Option<NaiveDate> {
        self.divisions(tree)
            .flat_map(|block| block.competitions.iter())
            .map(|competition| parse_event_date(competition.event.date.as_deref()))
            .max()
    }

    /// 舞者兩個角色中最近一次成績的日期，沒有任何成績時為 `None`
    pub fn latest_placement_date(&self, record: &DancerRecord) -> Option<NaiveDate> {
        let leader = self.latest_date(record.leader.placements.as_ref());
        let follower = self.latest_date(record.follower.placements.as_ref());
        leader.max(follower)
    }
}

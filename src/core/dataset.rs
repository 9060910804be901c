use crate::core::classifier::eligibility_for;
use crate::core::normalizer::{role_from_name, Normalizer};
use crate::domain::model::{
    DancerSummary, Dataset, Division, DivisionProgression, EventAggregate, EventOccurrence,
    FlatPlacement, Harvest, RisingStar, RisingStarDivision, RisingStarRole, Role, YearCount,
};
use crate::utils::error::Result;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, TimeDelta};
use std::collections::BTreeMap;

pub const DEFAULT_RISING_STAR_WINDOW_DAYS: i64 = 90;
pub const DEFAULT_RISING_STAR_COUNT: usize = 5;

/// 依活動編號合併出現過的日期
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: BTreeMap<u64, EventAggregate>,
}

impl EventCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 日期去重並由新到舊排列；最新日期的那筆決定名稱、地點與網址
    pub fn merge(&mut self, occurrences: &[EventOccurrence]) {
        for occurrence in occurrences {
            let aggregate = self
                .events
                .entry(occurrence.id)
                .or_insert_with(|| EventAggregate {
                    id: occurrence.id,
                    name: occurrence.name.clone(),
                    location: occurrence.location.clone(),
                    url: occurrence.url.clone(),
                    dates: Vec::new(),
                });

            if !aggregate.dates.contains(&occurrence.date) {
                aggregate.dates.push(occurrence.date);
                aggregate.dates.sort_unstable_by(|a, b| b.cmp(a));
            }

            if aggregate.dates.first() == Some(&occurrence.date) {
                aggregate.name.clone_from(&occurrence.name);
                aggregate.location.clone_from(&occurrence.location);
                aggregate.url.clone_from(&occurrence.url);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 依編號由大到小
    pub fn into_sorted(self) -> Vec<EventAggregate> {
        self.events.into_values().rev().collect()
    }
}

/// 第一次出賽的年份統計，鍵為 `'YY`
pub fn new_dancers_over_time(earliest_dates: impl IntoIterator<Item = NaiveDate>) -> Vec<YearCount> {
    let mut by_year: BTreeMap<i32, u32> = BTreeMap::new();
    for date in earliest_dates {
        *by_year.entry(date.year()).or_default() += 1;
    }
    by_year
        .into_iter()
        .map(|(year, value)| YearCount {
            key: format!("'{:02}", year.rem_euclid(100)),
            value,
        })
        .collect()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// 本月一日往前推 `window_days` 天，再取該月一日
pub fn rising_star_start(today: NaiveDate, window_days: i64) -> NaiveDate {
    first_of_month(first_of_month(today) - TimeDelta::days(window_days))
}

/// 每個 (分級, 角色) 近期得分最高的前 `count` 名。
/// 分級依代碼由大到小，角色由小到大；同分時編號小者在前
pub fn rising_stars(
    dancers: &[DancerSummary],
    since: NaiveDate,
    count: usize,
) -> Vec<RisingStarDivision> {
    let mut totals: BTreeMap<Division, BTreeMap<Role, BTreeMap<u64, u32>>> = BTreeMap::new();
    for dancer in dancers {
        for placement in dancer.placements.iter().filter(|p| p.date >= since) {
            *totals
                .entry(placement.division)
                .or_default()
                .entry(placement.role)
                .or_default()
                .entry(dancer.id)
                .or_default() += placement.points;
        }
    }

    let mut divisions: Vec<RisingStarDivision> = totals
        .into_iter()
        .map(|(division, roles)| {
            let mut roles: Vec<RisingStarRole> = roles
                .into_iter()
                .map(|(role, by_dancer)| {
                    let mut ranked: Vec<RisingStar> = by_dancer
                        .into_iter()
                        .map(|(wscdid, points)| RisingStar { points, wscdid })
                        .collect();
                    ranked.sort_by(|a, b| b.points.cmp(&a.points).then(a.wscdid.cmp(&b.wscdid)));
                    ranked.truncate(count);
                    RisingStarRole {
                        role,
                        dancers: ranked,
                    }
                })
                .collect();
            roles.sort_by_key(|r| r.role.code());
            RisingStarDivision { division, roles }
        })
        .collect();
    divisions.sort_by_key(|d| std::cmp::Reverse(d.division.code()));
    divisions
}

/// 主要角色在相鄰技術分級之間第一次出賽相隔的天數，記在較低的分級下
pub fn division_progression(dancers: &[DancerSummary]) -> DivisionProgression {
    let ladder = Division::SKILL_PROGRESSION;
    let mut gaps: BTreeMap<Division, Vec<i64>> = BTreeMap::new();

    for dancer in dancers {
        let mut earliest: BTreeMap<Division, NaiveDate> = BTreeMap::new();
        for placement in dancer
            .placements
            .iter()
            .filter(|p| p.role == dancer.primary_role)
        {
            earliest
                .entry(placement.division)
                .and_modify(|d| *d = (*d).min(placement.date))
                .or_insert(placement.date);
        }

        for pair in ladder.windows(2) {
            if let (Some(from), Some(to)) = (earliest.get(&pair[0]), earliest.get(&pair[1])) {
                gaps.entry(pair[0])
                    .or_default()
                    .push((*to - *from).num_days().abs());
            }
        }
    }

    let lower = &ladder[..ladder.len() - 1];
    DivisionProgression {
        labels: lower.iter().map(|d| d.name().to_string()).collect(),
        data: lower
            .iter()
            .map(|d| gaps.remove(d).unwrap_or_default())
            .collect(),
    }
}

/// 由快取中的原始紀錄組出最終資料集
pub struct DatasetBuilder {
    normalizer: Normalizer,
    generated_at: NaiveDateTime,
    rising_star_window_days: i64,
    rising_star_count: usize,
}

impl DatasetBuilder {
    pub fn new(normalizer: Normalizer, generated_at: NaiveDateTime) -> Self {
        Self {
            normalizer,
            generated_at,
            rising_star_window_days: DEFAULT_RISING_STAR_WINDOW_DAYS,
            rising_star_count: DEFAULT_RISING_STAR_COUNT,
        }
    }

    pub fn with_rising_stars(mut self, window_days: i64, count: usize) -> Self {
        self.rising_star_window_days = window_days;
        self.rising_star_count = count;
        self
    }

    pub fn build(&self, harvest: Harvest) -> Result<Dataset> {
        let mut dancers = Vec::new();
        let mut catalog = EventCatalog::new();
        let mut earliest_dates = Vec::new();

        for record in harvest.dancers.values() {
            let leader = self
                .normalizer
                .normalize(record.id, record.leader.placements.as_ref())?;
            let follower = self
                .normalizer
                .normalize(record.id, record.follower.placements.as_ref())?;

            let earliest = match (leader.earliest_date, follower.earliest_date) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            earliest_dates.extend(earliest);

            let primary_role = role_from_name(&record.dominant_role)?;

            let mut placements: Vec<FlatPlacement> = leader
                .placements
                .into_iter()
                .chain(follower.placements)
                .collect();
            if placements.is_empty() {
                continue;
            }
            placements.sort_by(|a, b| b.date.cmp(&a.date));

            let divisions = eligibility_for(primary_role, &placements);
            catalog.merge(&leader.events);
            catalog.merge(&follower.events);

            dancers.push(DancerSummary {
                id: record.id,
                primary_role,
                name: record.display_name(),
                placements,
                divisions,
            });
        }

        dancers.sort_by(|a, b| b.id.cmp(&a.id));
        let events = catalog.into_sorted();

        let since = rising_star_start(self.generated_at.date(), self.rising_star_window_days);
        let top_dancers = rising_stars(&dancers, since, self.rising_star_count);
        let progression = division_progression(&dancers);

        tracing::info!(
            "🧮 Assembled {} dancers and {} events from {} cached records",
            dancers.len(),
            events.len(),
            harvest.dancers.len()
        );

        Ok(Dataset {
            last_updated: self.generated_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            roles: Role::ALL
                .iter()
                .map(|r| (r.code(), r.name().to_string()))
                .collect(),
            divisions: Division::ALL
                .iter()
                .map(|d| (d.code(), d.name().to_string()))
                .collect(),
            ordered_skill_divisions: Division::SKILL_PROGRESSION.to_vec(),
            dancers_count: dancers.len(),
            dancers,
            events_count: events.len(),
            events,
            top_dancers_by_points_gained_recently: top_dancers,
            upcoming_events: harvest.upcoming_events,
            new_dancers_over_time: new_dancers_over_time(earliest_dates),
            division_progression: progression,
        })
    }
}

use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ===== 角色與分級 =====

/// 參賽角色，序列化為上游使用的數字代碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Leader,
    Follower,
    Switch,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Leader, Role::Follower, Role::Switch];

    /// 可以獨立計算分級資格的角色
    pub const COMPETITIVE: [Role; 2] = [Role::Leader, Role::Follower];

    pub fn code(self) -> u8 {
        match self {
            Role::Leader => 1,
            Role::Follower => 2,
            Role::Switch => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Leader => "Leader",
            Role::Follower => "Follower",
            Role::Switch => "Switch",
        }
    }

    pub fn from_code(code: u8) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.code() == code)
    }
}

/// 比賽分級。代碼越大不代表技術越高，技術順序見 [`Division::SKILL_PROGRESSION`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Division {
    Juniors,
    Masters,
    Newcomer,
    Novice,
    Intermediate,
    Advanced,
    AllStars,
    Champions,
    Professional,
    Sophisticated,
    Invitational,
    Teacher,
}

impl Division {
    pub const ALL: [Division; 12] = [
        Division::Teacher,
        Division::Invitational,
        Division::Sophisticated,
        Division::Professional,
        Division::Champions,
        Division::AllStars,
        Division::Advanced,
        Division::Intermediate,
        Division::Novice,
        Division::Newcomer,
        Division::Masters,
        Division::Juniors,
    ];

    /// 技術分級，由低到高
    pub const SKILL_PROGRESSION: [Division; 6] = [
        Division::Newcomer,
        Division::Novice,
        Division::Intermediate,
        Division::Advanced,
        Division::AllStars,
        Division::Champions,
    ];

    pub fn code(self) -> u8 {
        match self {
            Division::Teacher => 12,
            Division::Invitational => 11,
            Division::Sophisticated => 10,
            Division::Professional => 9,
            Division::Champions => 8,
            Division::AllStars => 7,
            Division::Advanced => 6,
            Division::Intermediate => 5,
            Division::Novice => 4,
            Division::Newcomer => 3,
            Division::Masters => 2,
            Division::Juniors => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Division::Teacher => "Teacher",
            Division::Invitational => "Invitational",
            Division::Sophisticated => "Sophisticated",
            Division::Professional => "Professional",
            Division::Champions => "Champions",
            Division::AllStars => "All-Stars",
            Division::Advanced => "Advanced",
            Division::Intermediate => "Intermediate",
            Division::Novice => "Novice",
            Division::Newcomer => "Newcomer",
            Division::Masters => "Masters",
            Division::Juniors => "Juniors",
        }
    }

    pub fn from_code(code: u8) -> Option<Division> {
        Division::ALL.into_iter().find(|d| d.code() == code)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Role::from_code(code).ok_or_else(|| D::Error::custom(format!("unknown role code {}", code)))
    }
}

impl Serialize for Division {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Division {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Division::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("unknown division code {}", code)))
    }
}

// ===== 上游原始資料（快取內容） =====

/// 上游回傳的舞者紀錄。未知欄位保留在 `extra`，確保存回快取時不遺失資料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DancerRecord {
    #[serde(rename = "dancer_wsdcid")]
    pub id: u64,
    #[serde(rename = "dancer_first", default)]
    pub first_name: String,
    #[serde(rename = "dancer_last", default)]
    pub last_name: String,
    #[serde(rename = "short_dominate_role")]
    pub dominant_role: String,
    #[serde(default)]
    pub leader: RoleBlock,
    #[serde(default)]
    pub follower: RoleBlock,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DancerRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placements: Option<RolePlacementTree>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 上游在沒有任何成績時回傳空陣列，有成績時回傳 style → division → 比賽 的巢狀物件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RolePlacementTree {
    Styles(BTreeMap<String, BTreeMap<String, DivisionBlock>>),
    Empty(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionBlock {
    pub division: DivisionInfo,
    #[serde(default)]
    pub competitions: Vec<CompetitionEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionInfo {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionEntry {
    pub event: EventRef,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub points: Option<u32>,
    pub role: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ===== 衍生資料 =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatPlacement {
    pub role: Role,
    pub result: String,
    pub points: u32,
    pub event: u64,
    pub date: NaiveDate,
    pub division: Division,
}

/// 單筆成績所屬的一場活動（尚未合併日期）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOccurrence {
    pub id: u64,
    pub name: String,
    pub location: String,
    pub url: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAggregate {
    pub id: u64,
    pub name: String,
    pub location: String,
    pub url: String,
    pub dates: Vec<NaiveDate>,
}

pub type DivisionEligibility = BTreeMap<Role, Vec<Division>>;

/// 官網活動列表上的即將舉辦活動
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub name: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub url: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// extract 階段的輸出
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    pub dancers: BTreeMap<String, DancerRecord>,
    pub upcoming_events: Vec<UpcomingEvent>,
    pub requests_made: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DancerSummary {
    pub id: u64,
    pub primary_role: Role,
    pub name: String,
    pub placements: Vec<FlatPlacement>,
    pub divisions: DivisionEligibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RisingStar {
    pub points: u32,
    pub wscdid: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RisingStarRole {
    pub role: Role,
    pub dancers: Vec<RisingStar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RisingStarDivision {
    pub division: Division,
    pub roles: Vec<RisingStarRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub key: String,
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionProgression {
    pub labels: Vec<String>,
    pub data: Vec<Vec<i64>>,
}

/// transform 階段的輸出，整份交給序列化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub last_updated: String,
    pub roles: BTreeMap<u8, String>,
    pub divisions: BTreeMap<u8, String>,
    pub ordered_skill_divisions: Vec<Division>,
    pub dancers: Vec<DancerSummary>,
    pub dancers_count: usize,
    pub events: Vec<EventAggregate>,
    pub events_count: usize,
    pub top_dancers_by_points_gained_recently: Vec<RisingStarDivision>,
    pub upcoming_events: Vec<UpcomingEvent>,
    pub new_dancers_over_time: Vec<YearCount>,
    pub division_progression: DivisionProgression,
}

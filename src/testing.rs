//! 單元測試共用的假資料與記憶體存儲

use crate::core::normalizer::DEFAULT_DANCE_STYLE;
use crate::domain::model::{
    CompetitionEntry, DancerRecord, DivisionBlock, DivisionInfo, EventRef, RoleBlock,
    RolePlacementTree,
};
use crate::domain::ports::Storage;
use crate::utils::error::{PointsError, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }
}

impl Storage for MemoryStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            PointsError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.files
            .lock()
            .await
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

pub fn dancer(id: u64, dominant_role: &str) -> DancerRecord {
    DancerRecord {
        id,
        first_name: "Test".to_string(),
        last_name: format!("Dancer{}", id),
        dominant_role: dominant_role.to_string(),
        leader: RoleBlock {
            placements: Some(RolePlacementTree::Empty(vec![])),
            extra: Map::new(),
        },
        follower: RoleBlock {
            placements: Some(RolePlacementTree::Empty(vec![])),
            extra: Map::new(),
        },
        extra: Map::new(),
    }
}

pub fn competition(event_id: u64, date: &str, points: Option<u32>, role: &str) -> CompetitionEntry {
    CompetitionEntry {
        event: EventRef {
            id: event_id,
            name: format!("Event {}", event_id),
            location: "Somewhere, CA".to_string(),
            url: format!("https://events.example.com/{}", event_id),
            date: Some(date.to_string()),
            extra: Map::new(),
        },
        result: Value::String("1".to_string()),
        points,
        role: role.to_string(),
        extra: Map::new(),
    }
}

/// 以 (分級名稱, 比賽) 建立預設舞風下的成績樹
pub fn tree(divisions: &[(&str, Vec<CompetitionEntry>)]) -> RolePlacementTree {
    let mut by_division = BTreeMap::new();
    for (name, competitions) in divisions {
        by_division.insert(
            name.to_uppercase(),
            DivisionBlock {
                division: DivisionInfo {
                    name: name.to_string(),
                    extra: Map::new(),
                },
                competitions: competitions.clone(),
                extra: Map::new(),
            },
        );
    }
    let mut styles = BTreeMap::new();
    styles.insert(DEFAULT_DANCE_STYLE.to_string(), by_division);
    RolePlacementTree::Styles(styles)
}

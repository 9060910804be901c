use crate::domain::model::{DancerSummary, Dataset, EventAggregate};
use crate::domain::ports::Storage;
use crate::utils::error::{PointsError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const DATABASE_FILE: &str = "database.json";
pub const EVENTS_FILE: &str = "events.json";
pub const DEFAULT_CHUNK_SIZE: u64 = 20;

/// 輸出編碼。網站前端讀的是 MessagePack（副檔名 `.txt`），JSON 供人工檢查
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MessagePack,
}

impl Encoding {
    pub const ALL: [Encoding; 2] = [Encoding::Json, Encoding::MessagePack];

    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::MessagePack => "txt",
        }
    }

    /// MessagePack 以具名欄位寫出，前端解出來才是物件
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>> {
        Ok(match self {
            Encoding::Json => serde_json::to_vec(value)?,
            Encoding::MessagePack => rmp_serde::to_vec_named(value)?,
        })
    }

    pub fn database_file(self) -> &'static str {
        match self {
            Encoding::Json => DATABASE_FILE,
            Encoding::MessagePack => "database.txt",
        }
    }

    pub fn events_file(self) -> &'static str {
        match self {
            Encoding::Json => EVENTS_FILE,
            Encoding::MessagePack => "events.txt",
        }
    }
}

#[derive(Debug, Serialize)]
struct EventsDocument<'a> {
    events: &'a [EventAggregate],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkEvent {
    pub id: u64,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkPlacement {
    pub role: &'static str,
    pub result: String,
    pub points: u32,
    pub event: ChunkEvent,
    pub date: chrono::NaiveDate,
    pub division: &'static str,
}

/// 分片檔裡的舞者：代碼換成名稱、活動直接內嵌
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkDancer {
    pub id: u64,
    pub primary_role: &'static str,
    pub name: String,
    pub placements: Vec<ChunkPlacement>,
    pub divisions: BTreeMap<&'static str, Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct ChunkDocument {
    dancers: Vec<ChunkDancer>,
}

pub fn chunk_file_name(start: u64, chunk_size: u64, encoding: Encoding) -> String {
    format!(
        "chunks/dancers_{}-{}.{}",
        start,
        start + chunk_size,
        encoding.extension()
    )
}

fn denormalize(
    dancer: &DancerSummary,
    events: &HashMap<u64, &EventAggregate>,
) -> Result<ChunkDancer> {
    let placements = dancer
        .placements
        .iter()
        .map(|placement| -> Result<ChunkPlacement> {
            let event = events
                .get(&placement.event)
                .ok_or_else(|| PointsError::ProcessingError {
                    message: format!(
                        "dancer {} references unknown event {}",
                        dancer.id, placement.event
                    ),
                })?;
            Ok(ChunkPlacement {
                role: placement.role.name(),
                result: placement.result.clone(),
                points: placement.points,
                event: ChunkEvent {
                    id: event.id,
                    name: event.name.clone(),
                    location: event.location.clone(),
                },
                date: placement.date,
                division: placement.division.name(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ChunkDancer {
        id: dancer.id,
        primary_role: dancer.primary_role.name(),
        name: dancer.name.clone(),
        placements,
        divisions: dancer
            .divisions
            .iter()
            .map(|(role, divisions)| (role.name(), divisions.iter().map(|d| d.name()).collect()))
            .collect(),
    })
}

/// 以編號區間 `[i, i + chunk_size)` 分片，從 0 一路到最大編號，空區間也會輸出
pub fn render_chunks(
    dataset: &Dataset,
    chunk_size: u64,
    encoding: Encoding,
) -> Result<Vec<(String, Vec<u8>)>> {
    if chunk_size == 0 {
        return Err(PointsError::InvalidConfigValueError {
            field: "chunk_size".to_string(),
            value: "0".to_string(),
            reason: "Chunk size must be positive".to_string(),
        });
    }

    let events: HashMap<u64, &EventAggregate> = dataset.events.iter().map(|e| (e.id, e)).collect();
    let mut buckets: BTreeMap<u64, Vec<ChunkDancer>> = BTreeMap::new();
    for dancer in &dataset.dancers {
        buckets
            .entry(dancer.id / chunk_size)
            .or_default()
            .push(denormalize(dancer, &events)?);
    }

    let Some(max_id) = dataset.dancers.iter().map(|d| d.id).max() else {
        return Ok(Vec::new());
    };

    (0..=max_id / chunk_size)
        .map(|bucket| -> Result<(String, Vec<u8>)> {
            let start = bucket * chunk_size;
            let document = ChunkDocument {
                dancers: buckets.remove(&bucket).unwrap_or_default(),
            };
            Ok((
                chunk_file_name(start, chunk_size, encoding),
                encoding.encode(&document)?,
            ))
        })
        .collect()
}

/// 以每種編碼寫出完整資料集、活動清單與舞者分片，回傳寫入的檔案數
pub async fn write_dataset<S: Storage>(
    storage: &S,
    dataset: &Dataset,
    chunk_size: u64,
) -> Result<usize> {
    let mut written = 0;
    for encoding in Encoding::ALL {
        storage
            .write_file(encoding.database_file(), &encoding.encode(dataset)?)
            .await?;
        storage
            .write_file(
                encoding.events_file(),
                &encoding.encode(&EventsDocument {
                    events: &dataset.events,
                })?,
            )
            .await?;

        let chunks = render_chunks(dataset, chunk_size, encoding)?;
        let chunk_count = chunks.len();
        for (name, data) in chunks {
            storage.write_file(&name, &data).await?;
        }

        tracing::info!(
            "💾 Wrote {:?} dataset, events and {} dancer chunks",
            encoding,
            chunk_count
        );
        written += chunk_count + 2;
    }
    Ok(written)
}

use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 每組固定三張試卷 (X.1, X.2, X.3)
pub const SLOTS_PER_GROUP: u32 = 3;

/// 目錄中的一筆試卷記錄
///
/// 只有 `year` 與 `paper_number` 參與配對，其餘欄位原樣保留在 `payload`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub year: i32,
    pub paper_number: String,
    pub paper_id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    pub fn position(&self) -> Option<Position> {
        self.paper_number.parse().ok()
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// `group.slot` 形式的位置，group 與 slot 皆為正整數
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub group: u32,
    pub slot: u32,
}

impl Position {
    pub fn new(group: u32, slot: u32) -> Self {
        Self { group, slot }
    }

    /// 在標準「每組三張」序列中的 0-based 排名；slot 超出 1..=3 或溢位時為 None
    pub fn rank(&self) -> Option<usize> {
        if self.group == 0 || self.slot == 0 || self.slot > SLOTS_PER_GROUP {
            return None;
        }
        let group = usize::try_from(self.group - 1).ok()?;
        group
            .checked_mul(SLOTS_PER_GROUP as usize)?
            .checked_add((self.slot - 1) as usize)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.slot)
    }
}

impl FromStr for Position {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EtlError::ValidationError {
            message: format!("'{}' is not a group.slot position", s),
        };
        let (group, slot) = s.trim().split_once('.').ok_or_else(invalid)?;
        let group: u32 = group.parse().map_err(|_| invalid())?;
        let slot: u32 = slot.parse().map_err(|_| invalid())?;
        if group == 0 || slot == 0 {
            return Err(invalid());
        }
        Ok(Position { group, slot })
    }
}

/// 排序鍵：數值比較 (group, slot)，缺少 slot 視為 0，無法解析者排最後
pub fn position_sort_key(paper_number: &str) -> (u32, u32) {
    let mut parts = paper_number.trim().splitn(2, '.');
    let group = parts.next().and_then(|g| g.parse::<u32>().ok());
    match group {
        Some(group) => {
            let slot = parts
                .next()
                .map(|s| s.parse::<u32>().unwrap_or(u32::MAX))
                .unwrap_or(0);
            (group, slot)
        }
        None => (u32::MAX, u32::MAX),
    }
}

/// 單一資料夾內依檔名排序的圖片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSet {
    pub folder: String,
    pub files: Vec<String>,
}

impl ImageSet {
    pub fn new(folder: impl Into<String>, mut files: Vec<String>) -> Self {
        files.sort();
        Self {
            folder: folder.into(),
            files,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `<folder>/<file>` 形式的相對路徑
    pub fn image_ref(&self, rank: usize) -> Option<String> {
        self.files
            .get(rank)
            .map(|file| format!("{}/{}", self.folder, file))
    }
}

/// 試卷與圖片的對應結果，欄位與 paper_page_mapping.json 一致
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingEntry {
    pub paper_id: String,
    #[serde(default)]
    pub db_id: Option<String>,
    pub year: i32,
    pub paper_number: String,
    #[serde(default)]
    pub topic: String,
    pub image: String,
}

impl MappingEntry {
    pub fn from_record(record: &Record, year: i32, image: String) -> Self {
        Self {
            paper_id: record.paper_id.clone(),
            db_id: record.id.clone(),
            year,
            paper_number: record.paper_number.clone(),
            topic: record.topic.clone(),
            image,
        }
    }
}

/// 有圖片但目錄中沒有對應記錄，供人工補錄
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnmatchedImage {
    pub year: i32,
    pub folder: String,
    pub rank: usize,
    pub position: String,
    pub image: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum UnmappedReason {
    /// 位置合法但超出圖片數量
    BeyondImageCount,
    /// 位置不符合 group.slot (slot 1..=3) 的編號慣例
    UnexpectedNumbering,
    /// paper_id 前綴指向其他年份的資料夾
    WrongFolder,
}

/// 有記錄但沒有對應圖片
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnmappedRecord {
    pub paper_id: String,
    pub position: String,
    pub reason: UnmappedReason,
}

//! Sequence reconciliation: infer which page image belongs to which catalog
//! record when the catalog is missing some papers.
//!
//! Source PDFs lay papers out in fixed triplets per topic group, so the
//! position of the image at rank `i` is the `i`-th element of
//! `1.1, 1.2, 1.3, 2.1, ...`. Records are looked up by that position.

use crate::domain::model::{
    position_sort_key, ImageSet, MappingEntry, Position, Record, UnmappedReason, UnmappedRecord,
    UnmatchedImage, SLOTS_PER_GROUP,
};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 無限的「每組三張」位置序列，以 `take(count)` 截斷
#[derive(Debug, Clone)]
pub struct PositionSequence {
    next: Position,
}

impl PositionSequence {
    pub fn new() -> Self {
        Self {
            next: Position::new(1, 1),
        }
    }
}

impl Default for PositionSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for PositionSequence {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        let current = self.next;
        self.next = if current.slot == SLOTS_PER_GROUP {
            Position::new(current.group + 1, 1)
        } else {
            Position::new(current.group, current.slot + 1)
        };
        Some(current)
    }
}

pub fn generate_position_sequence(count: usize) -> Vec<Position> {
    PositionSequence::new().take(count).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    LastWins,
}

/// 單一年份的 position -> Record 查找表
#[derive(Debug)]
pub struct PositionIndex<'a> {
    pub year: i32,
    by_position: HashMap<String, &'a Record>,
}

impl<'a> PositionIndex<'a> {
    pub fn get(&self, position: &str) -> Option<&'a Record> {
        self.by_position.get(position).copied()
    }

    /// 去除重複位置後保留的記錄，依位置排序
    pub fn records(&self) -> Vec<&'a Record> {
        let mut records: Vec<&'a Record> = self.by_position.values().copied().collect();
        records.sort_by(|a, b| {
            position_sort_key(&a.paper_number).cmp(&position_sort_key(&b.paper_number))
        });
        records
    }
}

pub fn build_position_index<'a, I>(
    year: i32,
    records: I,
    policy: DuplicatePolicy,
) -> Result<PositionIndex<'a>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut by_position: HashMap<String, &'a Record> = HashMap::new();

    for record in records {
        let key = record.paper_number.trim().to_string();
        if let Some(previous) = by_position.get(&key) {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(EtlError::DuplicatePosition {
                        year,
                        position: key,
                        first: previous.paper_id.clone(),
                        second: record.paper_id.clone(),
                    });
                }
                DuplicatePolicy::LastWins => {
                    tracing::warn!(
                        "⚠️ {}: duplicate position {} ('{}' replaced by '{}')",
                        year,
                        key,
                        previous.paper_id,
                        record.paper_id
                    );
                }
            }
        }
        by_position.insert(key, record);
    }

    Ok(PositionIndex { year, by_position })
}

/// 一個資料夾的對齊結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct Alignment {
    pub matched: Vec<MappingEntry>,
    pub unmatched_images: Vec<UnmatchedImage>,
    pub unmapped_records: Vec<UnmappedRecord>,
}

impl Alignment {
    /// 每個圖片排名恰好出現一次
    pub fn accounted_images(&self) -> usize {
        self.matched.len() + self.unmatched_images.len()
    }
}

pub fn align(images: &ImageSet, index: &PositionIndex<'_>) -> Alignment {
    let sequence = generate_position_sequence(images.len());
    let mut alignment = Alignment::default();
    let mut visited: HashSet<String> = HashSet::with_capacity(sequence.len());

    for (rank, position) in sequence.iter().enumerate() {
        let key = position.to_string();
        let Some(image) = images.image_ref(rank) else {
            break;
        };

        match index.get(&key) {
            Some(record) => {
                alignment
                    .matched
                    .push(MappingEntry::from_record(record, index.year, image));
            }
            None => alignment.unmatched_images.push(UnmatchedImage {
                year: index.year,
                folder: images.folder.clone(),
                rank,
                position: key.clone(),
                image,
            }),
        }
        visited.insert(key);
    }

    let mut leftovers: Vec<&Record> = index
        .by_position
        .iter()
        .filter(|(key, _)| !visited.contains(*key))
        .map(|(_, record)| *record)
        .collect();
    leftovers.sort_by(|a, b| {
        position_sort_key(&a.paper_number).cmp(&position_sort_key(&b.paper_number))
    });

    alignment.unmapped_records = leftovers
        .into_iter()
        .map(|record| {
            let reason = match record.position().and_then(|p| p.rank()) {
                Some(rank) if rank >= images.len() => UnmappedReason::BeyondImageCount,
                _ => UnmappedReason::UnexpectedNumbering,
            };
            UnmappedRecord {
                paper_id: record.paper_id.clone(),
                position: record.paper_number.clone(),
                reason,
            }
        })
        .collect();

    alignment
}

/// 特殊資料夾：記錄依位置排序後與圖片 1:1 對應，截斷至較短者
pub fn align_by_order(year: i32, records: &[&Record], images: &ImageSet) -> Alignment {
    let mut sorted: Vec<&Record> = records.to_vec();
    sorted.sort_by(|a, b| {
        position_sort_key(&a.paper_number).cmp(&position_sort_key(&b.paper_number))
    });

    let paired = sorted.len().min(images.len());
    let sequence = generate_position_sequence(images.len());
    let mut alignment = Alignment::default();

    for (rank, record) in sorted.iter().take(paired).enumerate() {
        if let Some(image) = images.image_ref(rank) {
            alignment
                .matched
                .push(MappingEntry::from_record(record, year, image));
        }
    }

    for (rank, position) in sequence.iter().enumerate().skip(paired) {
        if let Some(image) = images.image_ref(rank) {
            alignment.unmatched_images.push(UnmatchedImage {
                year,
                folder: images.folder.clone(),
                rank,
                position: position.to_string(),
                image,
            });
        }
    }

    alignment.unmapped_records = sorted[paired..]
        .iter()
        .map(|record| UnmappedRecord {
            paper_id: record.paper_id.clone(),
            position: record.paper_number.clone(),
            reason: UnmappedReason::BeyondImageCount,
        })
        .collect();

    alignment
}

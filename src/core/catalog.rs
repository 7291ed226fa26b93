use crate::domain::model::{position_sort_key, Record};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// 手動維護的試卷目錄 (pastpaper_papers.json)
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<Record>,
}

/// merge_new 的結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
}

impl Catalog {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let records: Vec<Record> = serde_json::from_slice(bytes)?;
        Ok(Self { records })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, paper_id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.paper_id == paper_id)
    }

    pub fn year(&self, year: i32) -> Vec<&Record> {
        self.records.iter().filter(|r| r.year == year).collect()
    }

    /// paper_id 以 `<prefix>-` 開頭的記錄，依位置排序
    pub fn with_prefix(&self, prefix: &str) -> Vec<&Record> {
        let needle = format!("{}-", prefix);
        let mut matched: Vec<&Record> = self
            .records
            .iter()
            .filter(|r| r.paper_id.starts_with(&needle))
            .collect();
        matched.sort_by(|a, b| {
            position_sort_key(&a.paper_number).cmp(&position_sort_key(&b.paper_number))
        });
        matched
    }

    /// 合併新試卷：已存在的 paper_id 跳過，新增者補上 UUID 與時間戳
    pub fn merge_new(&mut self, new_papers: Vec<Record>, now: DateTime<Utc>) -> MergeOutcome {
        let mut existing: HashSet<String> =
            self.records.iter().map(|r| r.paper_id.clone()).collect();
        let timestamp = serde_json::Value::String(now.to_rfc3339());
        let mut outcome = MergeOutcome::default();

        for mut paper in new_papers {
            if !existing.insert(paper.paper_id.clone()) {
                outcome.skipped.push(paper.paper_id);
                continue;
            }

            paper.id = Some(uuid::Uuid::new_v4().to_string());
            paper
                .payload
                .insert("created_at".to_string(), timestamp.clone());
            paper
                .payload
                .insert("updated_at".to_string(), timestamp.clone());

            outcome.added.push(paper.paper_id.clone());
            self.records.push(paper);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn catalog() -> Catalog {
        let data = json!([
            {"id": "a", "year": 2016, "paper_number": "2.1", "paper_id": "2016-2.1", "topic": "T1"},
            {"id": "b", "year": 2016, "paper_number": "1.1", "paper_id": "2016-1.1", "topic": "T2"},
            {"id": "c", "year": 2012, "paper_number": "1.2", "paper_id": "2012practice-1.2", "topic": "T3"},
            {"id": "d", "year": 2012, "paper_number": "1.1", "paper_id": "2012practice-1.1", "topic": "T4"},
            {"id": "e", "year": 2012, "paper_number": "1.1", "paper_id": "2012-1.1", "topic": "T5"}
        ]);
        Catalog::from_json(data.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_records_of_one_year() {
        let catalog = catalog();
        assert_eq!(catalog.year(2016).len(), 2);
        assert_eq!(catalog.year(2012).len(), 3);
        assert!(catalog.year(2099).is_empty());
    }

    #[test]
    fn test_with_prefix_is_sorted_and_exact() {
        let catalog = catalog();
        let ids: Vec<&str> = catalog
            .with_prefix("2012practice")
            .iter()
            .map(|r| r.paper_id.as_str())
            .collect();
        assert_eq!(ids, vec!["2012practice-1.1", "2012practice-1.2"]);
        assert_eq!(catalog.with_prefix("2012").len(), 1);
    }

    #[test]
    fn test_merge_new_assigns_ids_and_skips_existing() {
        let mut catalog = catalog();
        let new_papers: Vec<Record> = serde_json::from_value(json!([
            {"year": 2016, "paper_number": "1.1", "paper_id": "2016-1.1", "topic": "dup"},
            {"year": 2016, "paper_number": "4.1", "paper_id": "2016-4.1", "topic": "new"}
        ]))
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let outcome = catalog.merge_new(new_papers, now);

        assert_eq!(outcome.added, vec!["2016-4.1".to_string()]);
        assert_eq!(outcome.skipped, vec!["2016-1.1".to_string()]);
        assert_eq!(catalog.len(), 6);

        let added = catalog.get("2016-4.1").unwrap();
        assert!(uuid::Uuid::parse_str(added.id.as_deref().unwrap()).is_ok());
        assert_eq!(added.payload_str("created_at"), Some("2024-05-01T08:00:00+00:00"));
        assert_eq!(added.payload_str("updated_at"), added.payload_str("created_at"));
    }
}

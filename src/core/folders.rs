use crate::config::toml_config::TomlConfig;
use crate::domain::model::MappingEntry;
use std::collections::HashMap;

/// 依 paper_id 前綴判斷圖片應在的資料夾，用來過濾錯誤的對應
#[derive(Debug, Clone)]
pub struct FolderResolver {
    // 依前綴長度由長到短
    prefixes: Vec<(String, String)>,
}

/// 同一份試卷的所有圖片，保留首次出現的順序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperImages {
    pub paper_id: String,
    pub db_id: Option<String>,
    pub images: Vec<String>,
}

impl FolderResolver {
    pub fn new(mut prefixes: Vec<(String, String)>) -> Self {
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { prefixes }
    }

    pub fn from_config(config: &TomlConfig) -> Self {
        let years = config
            .years
            .iter()
            .map(|y| (y.year.to_string(), y.folder.clone()));
        let specials = config
            .special_folders
            .iter()
            .map(|s| (s.prefix.clone(), s.folder.clone()));
        Self::new(years.chain(specials).collect())
    }

    pub fn expected_folder(&self, paper_id: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(prefix, _)| {
                paper_id == prefix
                    || paper_id
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            })
            .map(|(_, folder)| folder.as_str())
    }

    /// 丟棄圖片不在預期資料夾下的對應；回傳保留的對應與丟棄數
    pub fn filter_mapping(&self, entries: Vec<MappingEntry>) -> (Vec<MappingEntry>, usize) {
        let before = entries.len();
        let kept: Vec<MappingEntry> = entries
            .into_iter()
            .filter(|entry| match self.expected_folder(&entry.paper_id) {
                Some(folder) => entry
                    .image
                    .strip_prefix(folder)
                    .is_some_and(|rest| rest.starts_with('/')),
                None => true,
            })
            .collect();
        let dropped = before - kept.len();
        (kept, dropped)
    }
}

pub fn group_by_paper(entries: &[MappingEntry]) -> Vec<PaperImages> {
    let mut order: Vec<PaperImages> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        let index = *positions.entry(entry.paper_id.as_str()).or_insert_with(|| {
            order.push(PaperImages {
                paper_id: entry.paper_id.clone(),
                db_id: entry.db_id.clone(),
                images: Vec::new(),
            });
            order.len() - 1
        });

        let paper = &mut order[index];
        if !paper.images.contains(&entry.image) {
            paper.images.push(entry.image.clone());
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> FolderResolver {
        FolderResolver::new(vec![
            ("2012".to_string(), "2012".to_string()),
            ("2012practice".to_string(), "2012-practice".to_string()),
            ("2012sample".to_string(), "2012-sample".to_string()),
            ("2016".to_string(), "2016".to_string()),
        ])
    }

    fn entry(paper_id: &str, image: &str) -> MappingEntry {
        MappingEntry {
            paper_id: paper_id.to_string(),
            db_id: Some(format!("db-{}", paper_id)),
            year: 2012,
            paper_number: "1.1".to_string(),
            topic: String::new(),
            image: image.to_string(),
        }
    }

    #[test]
    fn test_expected_folder_prefers_longest_prefix() {
        let resolver = resolver();
        assert_eq!(resolver.expected_folder("2012practice-1.1"), Some("2012-practice"));
        assert_eq!(resolver.expected_folder("2012-1.1"), Some("2012"));
        assert_eq!(resolver.expected_folder("2016"), Some("2016"));
        assert_eq!(resolver.expected_folder("2012x-1.1"), None);
        assert_eq!(resolver.expected_folder("2099-1.1"), None);
    }

    #[test]
    fn test_filter_mapping_drops_wrong_folder() {
        let entries = vec![
            entry("2012practice-1.1", "2012-practice/page-01.webp"),
            entry("2012practice-1.2", "2012/page-02.webp"),
            entry("2012-1.1", "2012-practice/page-01.webp"),
            entry("2099-1.1", "anywhere/page-01.webp"),
        ];
        let (kept, dropped) = resolver().filter_mapping(entries);
        assert_eq!(dropped, 2);
        let ids: Vec<&str> = kept.iter().map(|e| e.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["2012practice-1.1", "2099-1.1"]);
    }

    #[test]
    fn test_group_by_paper_dedups_images() {
        let entries = vec![
            entry("2016-1.1", "2016/page-01.webp"),
            entry("2016-1.2", "2016/page-02.webp"),
            entry("2016-1.1", "2016/page-03.webp"),
            entry("2016-1.1", "2016/page-01.webp"),
        ];
        let grouped = group_by_paper(&entries);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].paper_id, "2016-1.1");
        assert_eq!(
            grouped[0].images,
            vec!["2016/page-01.webp".to_string(), "2016/page-03.webp".to_string()]
        );
    }
}

use crate::config::toml_config::TomlConfig;
use crate::core::catalog::Catalog;
use crate::core::folders::FolderResolver;
use crate::core::reconciler::{
    align, align_by_order, build_position_index, Alignment, PositionIndex,
};
use crate::core::{ImageSet, Record, Storage};
use crate::domain::model::{UnmappedReason, UnmappedRecord};
use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderKind {
    Year,
    Special { prefix: String },
}

/// 一個圖片資料夾的掃描結果；資料夾不存在時 images 為 None
#[derive(Debug, Clone)]
pub struct FolderScan {
    pub label: String,
    pub year: i32,
    pub folder: String,
    pub kind: FolderKind,
    pub images: Option<ImageSet>,
}

#[derive(Debug, Clone)]
pub struct ScannedInput {
    pub catalog: Catalog,
    pub folders: Vec<FolderScan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderStatus {
    Reconciled,
    MissingFolder,
    IntegrityError(String),
}

#[derive(Debug, Clone)]
pub struct FolderOutcome {
    pub label: String,
    pub year: i32,
    pub folder: String,
    pub status: FolderStatus,
    pub image_count: usize,
    pub record_count: usize,
    pub alignment: Alignment,
}

impl FolderOutcome {
    fn skipped(scan: &FolderScan, status: FolderStatus, record_count: usize) -> Self {
        Self {
            label: scan.label.clone(),
            year: scan.year,
            folder: scan.folder.clone(),
            status,
            image_count: scan.images.as_ref().map(ImageSet::len).unwrap_or(0),
            record_count,
            alignment: Alignment::default(),
        }
    }
}

async fn discover_images<S: Storage>(
    storage: &S,
    config: &TomlConfig,
    folder: &str,
) -> Result<Option<ImageSet>> {
    let files = storage
        .list_files(&config.image_folder(folder), config.image_extension())
        .await?;
    Ok(files.map(|files| ImageSet::new(folder, files)))
}

pub async fn load_catalog<S: Storage>(storage: &S, config: &TomlConfig) -> Result<Catalog> {
    let bytes = storage.read_file(&config.paths.catalog).await?;
    let catalog = Catalog::from_json(&bytes)?;
    if catalog.is_empty() {
        tracing::warn!("⚠️ Catalog {} has no records", config.paths.catalog);
    }
    tracing::info!(
        "📚 Loaded {} catalog records from {}",
        catalog.len(),
        config.paths.catalog
    );
    Ok(catalog)
}

pub async fn scan_inputs<S: Storage>(storage: &S, config: &TomlConfig) -> Result<ScannedInput> {
    let catalog = load_catalog(storage, config).await?;

    let mut years = config.years.clone();
    years.sort_by_key(|y| y.year);

    let mut folders = Vec::with_capacity(years.len() + config.special_folders.len());
    for year in years {
        let images = discover_images(storage, config, &year.folder).await?;
        folders.push(FolderScan {
            label: year.year.to_string(),
            year: year.year,
            folder: year.folder,
            kind: FolderKind::Year,
            images,
        });
    }

    for special in &config.special_folders {
        let images = discover_images(storage, config, &special.folder).await?;
        folders.push(FolderScan {
            label: special.prefix.clone(),
            year: special.year,
            folder: special.folder.clone(),
            kind: FolderKind::Special {
                prefix: special.prefix.clone(),
            },
            images,
        });
    }

    Ok(ScannedInput { catalog, folders })
}

/// 建立位置索引；位置重複時記錄並跳過該資料夾 (strict 模式下直接失敗)
fn index_or_skip<'a>(
    scan: &FolderScan,
    records: &[&'a Record],
    config: &TomlConfig,
    outcomes: &mut Vec<FolderOutcome>,
) -> Result<Option<PositionIndex<'a>>> {
    match build_position_index(scan.year, records.iter().copied(), config.duplicate_policy()) {
        Ok(index) => Ok(Some(index)),
        Err(e @ EtlError::DuplicatePosition { .. }) if !config.is_strict() => {
            tracing::error!("❌ {}: {} (folder skipped)", scan.label, e);
            outcomes.push(FolderOutcome::skipped(
                scan,
                FolderStatus::IntegrityError(e.to_string()),
                records.len(),
            ));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// 對所有資料夾執行對齊；資料夾不存在或位置重複時跳過該資料夾並記錄
pub fn reconcile_all(input: &ScannedInput, config: &TomlConfig) -> Result<Vec<FolderOutcome>> {
    let resolver = FolderResolver::from_config(config);
    let special_folders: HashSet<&str> = config
        .special_folders
        .iter()
        .map(|s| s.folder.as_str())
        .collect();
    let mut outcomes = Vec::with_capacity(input.folders.len());

    for scan in &input.folders {
        let Some(images) = &scan.images else {
            tracing::warn!("⏭️ SKIP {}: no images in {}", scan.label, scan.folder);
            outcomes.push(FolderOutcome::skipped(scan, FolderStatus::MissingFolder, 0));
            continue;
        };

        let (alignment, record_count) = match &scan.kind {
            FolderKind::Year => {
                // 前綴屬於其他資料夾的記錄不參與年份對齊；特殊資料夾的記錄在該資料夾處理
                let (records, elsewhere): (Vec<&Record>, Vec<&Record>) = input
                    .catalog
                    .year(scan.year)
                    .into_iter()
                    .partition(|r| {
                        resolver
                            .expected_folder(&r.paper_id)
                            .map_or(true, |folder| folder == scan.folder)
                    });

                let Some(index) = index_or_skip(scan, &records, config, &mut outcomes)? else {
                    continue;
                };

                let mut alignment = align(images, &index);
                if alignment.unmatched_images.is_empty() {
                    tracing::info!(
                        "  {}: {} images, {} papers -> all matched",
                        scan.label,
                        images.len(),
                        records.len()
                    );
                } else {
                    let pdf_only: Vec<&str> = alignment
                        .unmatched_images
                        .iter()
                        .map(|u| u.position.as_str())
                        .collect();
                    tracing::info!(
                        "  {}: {} images, {} papers, {} matched. PDF-only (not in catalog): {:?}",
                        scan.label,
                        images.len(),
                        records.len(),
                        alignment.matched.len(),
                        pdf_only
                    );
                }

                alignment.unmapped_records.extend(
                    elsewhere
                        .iter()
                        .filter(|r| {
                            resolver
                                .expected_folder(&r.paper_id)
                                .is_some_and(|folder| !special_folders.contains(folder))
                        })
                        .map(|r| UnmappedRecord {
                            paper_id: r.paper_id.clone(),
                            position: r.paper_number.clone(),
                            reason: UnmappedReason::WrongFolder,
                        }),
                );
                (alignment, records.len())
            }
            FolderKind::Special { prefix } => {
                let records = input.catalog.with_prefix(prefix);
                let Some(index) = index_or_skip(scan, &records, config, &mut outcomes)? else {
                    continue;
                };

                let alignment = align_by_order(scan.year, &index.records(), images);
                tracing::info!(
                    "  {}: {} images, {} papers, {} matched",
                    scan.label,
                    images.len(),
                    records.len(),
                    alignment.matched.len()
                );
                (alignment, records.len())
            }
        };

        log_unmapped(&scan.label, &alignment);
        outcomes.push(FolderOutcome {
            label: scan.label.clone(),
            year: scan.year,
            folder: scan.folder.clone(),
            status: FolderStatus::Reconciled,
            image_count: images.len(),
            record_count,
            alignment,
        });
    }

    Ok(outcomes)
}

fn log_unmapped(label: &str, alignment: &Alignment) {
    for record in &alignment.unmapped_records {
        tracing::warn!(
            "⚠️ {}: {} ({}) has no image ({:?})",
            label,
            record.paper_id,
            record.position,
            record.reason
        );
    }
}

pub mod import_pipeline;
pub mod mapping_pipeline;
pub mod missing_pipeline;
pub mod page_images_pipeline;
pub mod preview_pipeline;
pub mod push_pipeline;
pub mod scan;
pub mod upload_pipeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use import_pipeline::ImportPipeline;
pub use mapping_pipeline::MappingPipeline;
pub use missing_pipeline::MissingPipeline;
pub use page_images_pipeline::PageImagesSqlPipeline;
pub use preview_pipeline::PreviewPipeline;
pub use push_pipeline::PushPipeline;
pub use upload_pipeline::UploadPipeline;

use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// 列出目錄中指定副檔名的檔名 (不含路徑)；目錄不存在時回傳 None
    fn list_files(
        &self,
        dir: &str,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<String>>>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}

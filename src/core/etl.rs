use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        let name = self.pipeline.name();
        tracing::info!("🚀 Starting {}", name);

        tracing::debug!("{}: extract", name);
        let extracted = self.pipeline.extract().await?;

        tracing::debug!("{}: transform", name);
        let transformed = self.pipeline.transform(extracted).await?;

        tracing::debug!("{}: load", name);
        let output = self.pipeline.load(transformed).await?;

        tracing::info!("✅ {} finished in {:?}", name, started.elapsed());
        Ok(output)
    }
}

use clap::Parser;
use pastpaper_etl::app::pipelines::{
    ImportPipeline, MappingPipeline, MissingPipeline, PageImagesSqlPipeline, PreviewPipeline,
    PushPipeline, UploadPipeline,
};
use pastpaper_etl::core::Pipeline;
use pastpaper_etl::utils::error::ErrorSeverity;
use pastpaper_etl::utils::{logger, validation::Validate};
use pastpaper_etl::{CliConfig, Command, EtlEngine, EtlError, LocalStorage, TomlConfig};

async fn run<P: Pipeline>(pipeline: P) -> pastpaper_etl::Result<String> {
    EtlEngine::new(pipeline).run().await
}

async fn dispatch(command: &Command, config: TomlConfig) -> pastpaper_etl::Result<String> {
    let storage = LocalStorage::new(config.root().to_string());
    match command {
        Command::Map { csv } => run(MappingPipeline::new(storage, config).with_csv(*csv)).await,
        Command::Missing => run(MissingPipeline::new(storage, config)).await,
        Command::Preview => run(PreviewPipeline::new(storage, config)).await,
        Command::Import { split } => {
            run(ImportPipeline::new(storage, config).with_split(*split)).await
        }
        Command::PageImagesSql => run(PageImagesSqlPipeline::new(storage, config)).await,
        Command::Upload => run(UploadPipeline::new(storage, config)?).await,
        Command::Push => run(PushPipeline::new(storage, config)?).await,
    }
}

fn exit_code(error: &EtlError) -> i32 {
    // 根據錯誤嚴重程度決定退出碼
    match error.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(error: &EtlError) {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());

    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 建議: {}", error.recovery_suggestion());
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("📁 Loading configuration from: {}", cli.config);
    let config = match TomlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(exit_code(&e));
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        report_failure(&e);
        std::process::exit(exit_code(&e));
    }
    if cli.command.needs_remote() {
        if let Err(e) = config.require_remote() {
            report_failure(&e);
            std::process::exit(exit_code(&e));
        }
    }

    match dispatch(&cli.command, config).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("✅ Done: {}", output);
            }
        }
        Err(e) => {
            report_failure(&e);
            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }
}

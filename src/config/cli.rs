use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "pastpaper")]
#[command(about = "Reconcile past-paper page images with the paper catalog")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "pastpaper.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Align page images with catalog records and write the mapping file
    Map {
        /// Also write a CSV copy of the mapping
        #[arg(long)]
        csv: bool,
    },
    /// List images that have no catalog record and write a backfill template
    Missing,
    /// Render the mapping file as an HTML review page
    Preview,
    /// Merge new papers into the catalog and write INSERT SQL
    Import {
        /// Also write each INSERT statement to its own file
        #[arg(long)]
        split: bool,
    },
    /// Write UPDATE SQL for the page_images column
    PageImagesSql,
    /// Upload images to object storage and patch page_images
    Upload,
    /// Insert new papers through the REST API
    Push,
}

impl Command {
    pub fn needs_remote(&self) -> bool {
        matches!(self, Command::Upload | Command::Push)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map_with_csv() {
        let cli = CliConfig::try_parse_from(["pastpaper", "--verbose", "map", "--csv"]).unwrap();
        assert_eq!(cli.config, "pastpaper.toml");
        assert!(cli.verbose);
        assert_eq!(cli.command, Command::Map { csv: true });
    }

    #[test]
    fn test_parse_kebab_case_command_and_config() {
        let cli =
            CliConfig::try_parse_from(["pastpaper", "-c", "other.toml", "page-images-sql"]).unwrap();
        assert_eq!(cli.config, "other.toml");
        assert_eq!(cli.command, Command::PageImagesSql);
        assert!(!cli.command.needs_remote());
        assert!(Command::Upload.needs_remote());
    }

    #[test]
    fn test_parse_import_split() {
        let cli = CliConfig::try_parse_from(["pastpaper", "import", "--split"]).unwrap();
        assert_eq!(cli.command, Command::Import { split: true });
        let cli = CliConfig::try_parse_from(["pastpaper", "import"]).unwrap();
        assert_eq!(cli.command, Command::Import { split: false });
    }

    #[test]
    fn test_command_is_required() {
        assert!(CliConfig::try_parse_from(["pastpaper"]).is_err());
    }
}

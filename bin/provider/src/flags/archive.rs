use clap::Args;
use url::Url;

/// Archive database arguments.
#[derive(Args, Debug, Clone)]
pub struct ArchiveArgs {
    /// Postgres URL of the Mina archive database.
    #[arg(long = "archive.url", env = "ARCHIVE_DATABASE_URL")]
    pub url: Url,

    /// Maximum number of pooled connections to the archive database.
    #[arg(
        long = "archive.max-connections",
        env = "ARCHIVE_MAX_CONNECTIONS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_connections: u32,
}

use clap::Args;

use super::DatabaseArgs;

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// TCP address to bind to for the HTTP interface.
    #[arg(short, long, env = "TRAFFICDB_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Create the traffic tables before serving if they don't exist.
    #[arg(long)]
    pub init_schema: bool,

    #[command(flatten)]
    pub db: DatabaseArgs,
}

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ton-link")]
#[command(about = "Links TON wallets to platform accounts through TON Connect proofs")]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Bind host override
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port override
    #[arg(long)]
    pub port: Option<u16>,

    /// Apply database migrations and exit
    #[arg(long)]
    pub migrate_only: bool,
}

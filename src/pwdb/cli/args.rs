use clap::Parser;
use std::path::PathBuf;

/// "0.3.0" for releases, "0.3.0@abc1234" for builds off a development commit.
fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{}", VERSION, GIT_HASH)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "pwdb", bin_name = "pwdb", version = version_string())]
#[command(
    about = "Encrypted credential store driven by a small command language",
    long_about = "Reads commands such as `item create -n Bank -f login bob` from stdin \
                  (or from -c) and runs them against a JSON database that is encrypted \
                  when a password is available."
)]
pub struct Cli {
    /// Database used by `new` and `read` without a file name; read at start-up if it exists
    #[arg(short, long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Directory holding config.json and the logs
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Environment variable holding the database password
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,

    /// Run this command instead of reading stdin (repeatable, runs in order)
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    pub commands: Vec<String>,

    /// Write the effective configuration to config.json and exit
    #[arg(long)]
    pub save_config: bool,
}

//! # CLI Layer
//!
//! The terminal client for the command layer. It is the only code that:
//!
//! - parses process arguments (`args.rs`, clap derive),
//! - reads stdin and writes stdout/stderr (`repl.rs`, `print.rs`),
//! - knows about the environment (password variable, config directory).
//!
//! Start-up builds a [`Session`] from the layered configuration: defaults,
//! then `config.json`, then flags. After that every line, from `-c` or from
//! stdin, goes through [`Session::execute`] and its [`CmdResult`] is printed.
//! A failing line prints an error and the loop continues.
//!
//! [`CmdResult`]: pwdb::commands::CmdResult

mod args;
mod print;
mod repl;

use args::Cli;
use clap::Parser;
use directories::ProjectDirs;
use log::{info, warn};
use pwdb::cipher::{Cipher, PasswordCipher};
use pwdb::commands::{Session, SessionOptions};
use pwdb::config::PwdbConfig;
use pwdb::error::{PwdbError, Result};
use pwdb::logging::init_logging;
use repl::{run_line, run_loop, LineConsole};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().or_else(|| {
        ProjectDirs::from("org", "pwdb", "pwdb").map(|dirs| dirs.config_dir().to_path_buf())
    });
    let config = effective_config(&cli, config_dir.as_ref())?;

    if cli.save_config {
        let dir = config_dir
            .ok_or_else(|| PwdbError::Config("no config directory available".to_string()))?;
        let path = config.save(&dir)?;
        println!("Saved {}", path.display());
        return Ok(());
    }

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    let _logger = init_logging(&config.log_level, log_dir.as_deref())?;

    let mut session = Session::new(
        cipher_from_env(&config.password_env)?,
        SessionOptions {
            default_database: config.default_database.clone(),
            mask: config.mask.clone(),
        },
    );

    let stdin = io::stdin();
    let interactive = cli.commands.is_empty() && stdin.is_terminal();
    let mut console = LineConsole::new(stdin.lock(), interactive);

    if cli.database.is_some() && config.default_database.exists() {
        run_line(&mut session, "read", &mut console);
    }

    if cli.commands.is_empty() {
        return run_loop(&mut session, &mut console);
    }
    for command in &cli.commands {
        if run_line(&mut session, command, &mut console) {
            return Ok(());
        }
    }
    run_line(&mut session, "quit", &mut console);
    Ok(())
}

/// Defaults, then config.json, then flags.
fn effective_config(cli: &Cli, config_dir: Option<&PathBuf>) -> Result<PwdbConfig> {
    let mut config = match config_dir {
        Some(dir) => PwdbConfig::load(dir)?,
        None => PwdbConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.default_database = database.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(var) = &cli.password_env {
        config.password_env = var.clone();
    }
    Ok(config)
}

/// Unencrypted when the variable is unset or empty.
fn cipher_from_env(var: &str) -> Result<Option<Arc<dyn Cipher>>> {
    match std::env::var(var) {
        Ok(password) if !password.is_empty() => {
            let cipher: Arc<dyn Cipher> = Arc::new(PasswordCipher::new(&password)?);
            info!("event=cipher_init module=cli status=ok source={}", var);
            Ok(Some(cipher))
        }
        _ => {
            warn!(
                "event=cipher_init module=cli status=skipped reason=no_password source={}",
                var
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn flags_override_config_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"default_database": "from_config.db", "log_level": "debug"}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from(["pwdb", "--log-level", "warn"]).unwrap();
        let config = effective_config(&cli, Some(&dir.path().to_path_buf())).unwrap();
        assert_eq!(config.default_database, PathBuf::from("from_config.db"));
        assert_eq!(config.log_level, "warn");

        let cli = Cli::try_parse_from(["pwdb", "-d", "flag.db"]).unwrap();
        let config = effective_config(&cli, Some(&dir.path().to_path_buf())).unwrap();
        assert_eq!(config.default_database, PathBuf::from("flag.db"));
    }

    #[test]
    fn missing_password_means_no_cipher() {
        let cipher = cipher_from_env("PWDB_TEST_SURELY_UNSET_VARIABLE").unwrap();
        assert!(cipher.is_none());
    }
}

use anyhow::{Result, bail};
use colored::Colorize;
use std::path::Path;

use crate::config::StaticConfig;

/// 生成示例配置文件；目标已存在时需要 `--force`
pub fn run_generate_config(output_path: Option<String>, force: bool) -> Result<()> {
    let path = output_path.unwrap_or_else(|| "config.example.toml".to_string());

    if !force && Path::new(&path).exists() {
        bail!(
            "{} already exists, pass --force to overwrite it",
            path
        );
    }

    println!(
        "{} {}",
        "Generating configuration file...".yellow(),
        path.blue()
    );

    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| anyhow::anyhow!("Unable to write configuration file: {}", e))?;

    println!(
        "{} {}",
        "Configuration file generated successfully".green(),
        path.blue()
    );
    Ok(())
}

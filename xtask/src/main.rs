//! Build automation tasks for warpgate
//!
//! Usage:
//!   cargo xtask run [-- ARGS]     # Run the viewer in release mode
//!   cargo xtask test              # Run the workspace tests
//!   cargo xtask package           # Release binary + assets in dist/<platform>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for warpgate")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and run in release mode
    Run {
        /// Arguments passed through to warpgate
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Run all tests
    Test,
    /// Build a native release and copy the assets next to it
    Package {
        /// Must match the host: windows, macos, linux
        #[arg(long)]
        platform: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => run(&args),
        Commands::Test => test(),
        Commands::Package { platform } => package(platform),
    }
}

fn project_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask has no parent directory")
}

fn run_cmd(cmd: &mut Command) -> Result<()> {
    let status = cmd.status().context("Failed to execute command")?;
    if !status.success() {
        anyhow::bail!("Command failed with status: {}", status);
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

fn run(args: &[String]) -> Result<()> {
    let root = project_root()?;
    run_cmd(
        Command::new("cargo")
            .current_dir(&root)
            .args(["run", "--release", "-p", "warpgate", "--"])
            .args(args),
    )
}

fn test() -> Result<()> {
    let root = project_root()?;
    run_cmd(Command::new("cargo").current_dir(&root).args(["test", "--workspace"]))
}

fn host_platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else {
        "linux"
    }
}

/// Only host builds are packaged; cargo builds for the host target here
fn resolve_platform(requested: Option<String>) -> Result<String> {
    let host = host_platform();
    match requested {
        None => Ok(host.to_string()),
        Some(p) if p == host => Ok(p),
        Some(p) => bail!("cannot package for {p} on a {host} host; run `cargo xtask package` on {p}"),
    }
}

fn package(platform: Option<String>) -> Result<()> {
    let platform = resolve_platform(platform)?;
    let root = project_root()?;
    let dist = root.join("dist").join(&platform);

    println!("Building native release for {}...", platform);

    if dist.exists() {
        std::fs::remove_dir_all(&dist)?;
    }
    std::fs::create_dir_all(&dist)?;

    run_cmd(
        Command::new("cargo")
            .current_dir(&root)
            .args(["build", "--release", "-p", "warpgate"]),
    )?;

    let binary_name = if platform == "windows" { "warpgate.exe" } else { "warpgate" };
    std::fs::copy(
        root.join("target/release").join(binary_name),
        dist.join(binary_name),
    )
    .with_context(|| format!("copying {}", binary_name))?;

    // zones.ron paths are relative to the working directory
    copy_dir_recursive(&root.join("assets"), &dist.join("assets"))?;

    println!("Package ready: dist/{}/", platform);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_defaults_to_host() {
        assert_eq!(resolve_platform(None).unwrap(), host_platform());
        assert_eq!(resolve_platform(Some(host_platform().to_string())).unwrap(), host_platform());
    }

    #[test]
    fn test_foreign_platform_rejected() {
        let foreign = if host_platform() == "windows" { "linux" } else { "windows" };
        let err = resolve_platform(Some(foreign.to_string())).unwrap_err();
        assert!(err.to_string().contains(foreign));
    }
}

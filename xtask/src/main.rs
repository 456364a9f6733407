use clap::{Parser, Subcommand};
use std::process::Command;

/// guard gateway build tasks
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the eBPF kernel program
    BuildEbpf {
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildEbpf { release } => {
            build_ebpf(release);
        }
    }
}

fn build_ebpf(release: bool) {
    let mut cmd = Command::new("cargo");
    cmd.current_dir("crates/ebpf");

    cmd.args(["+nightly", "build", "--target=bpfel-unknown-none", "-Z", "build-std=core"]);

    if release {
        cmd.arg("--release");
    }

    let status = cmd.status().expect("failed to build eBPF program");
    if !status.success() {
        eprintln!("eBPF build failed");
        std::process::exit(1);
    }

    println!("eBPF build succeeded");
}

use clap::CommandFactory;
use clap_complete::Shell;
use std::fs;
use std::io;
use std::path::PathBuf;

const BIN_NAME: &str = "amd-debug-tools";

/// Render man pages and shell completions for packaging.
///
/// Usage: `manpage [OUT_DIR]` (defaults to `./man`). Completions land in
/// `OUT_DIR/completions`.
fn main() -> io::Result<()> {
    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&out_dir)?;

    let mut cmd = amd_debug_tools::cli::Cli::command();
    clap_mangen::generate_to(cmd.clone(), &out_dir)?;

    let completions = out_dir.join("completions");
    fs::create_dir_all(&completions)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        let path = clap_complete::generate_to(shell, &mut cmd, BIN_NAME, &completions)?;
        println!("Generated {}", path.display());
    }

    let mut pages: Vec<PathBuf> = fs::read_dir(&out_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "1"))
        .collect();
    pages.sort();
    for page in pages {
        println!("Generated {}", page.display());
    }

    Ok(())
}

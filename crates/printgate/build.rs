// Generates packaging artifacts under OUT_DIR from the clap definitions:
// one man page per command (`printgate.1`, `printgate-enroll.1`,
// `printgate-config-set.1`, ...) and completion scripts for the shells
// the release archives ship.

use std::fs;
use std::path::Path;

use clap::{Command, CommandFactory};
use clap_complete::Shell;

// The argument structs are only walked for metadata here; their fields
// are never read.
#[path = "src/cli.rs"]
#[allow(dead_code)]
mod cli;

const PACKAGED_SHELLS: [Shell; 3] = [Shell::Bash, Shell::Zsh, Shell::Fish];

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR").expect("OUT_DIR not set by Cargo");
    let out_dir = Path::new(&out_dir);
    let mut cmd = cli::Cli::command();

    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("create man directory");
    let mut pending = vec![cmd.clone()];
    while let Some(page) = pending.pop() {
        let parent = page.get_name().to_owned();
        pending.extend(
            page.get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| sub.clone().name(format!("{parent}-{}", sub.get_name()))),
        );
        write_manpage(page, &man_dir);
    }

    let completion_dir = out_dir.join("completions");
    fs::create_dir_all(&completion_dir).expect("create completions directory");
    for shell in PACKAGED_SHELLS {
        clap_complete::generate_to(shell, &mut cmd, "printgate", &completion_dir)
            .unwrap_or_else(|e| panic!("{shell} completions: {e}"));
    }
}

fn write_manpage(cmd: Command, dir: &Path) {
    let path = dir.join(format!("{}.1", cmd.get_name()));
    let mut page = Vec::new();
    clap_mangen::Man::new(cmd)
        .render(&mut page)
        .unwrap_or_else(|e| panic!("render {}: {e}", path.display()));
    fs::write(&path, page).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
}

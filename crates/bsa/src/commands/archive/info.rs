use bsa_archive::Archive;
use clap::Args;
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// An input BSA or BA2 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = Archive::open(&self.file)
            .context(format!("path: {}", &self.file.display()))?;
        let info = archive.info();

        println!("{:>12} {}", "name".bold(), archive.name());
        println!("{:>12} {}", "dialect".bold(), info.dialect);
        println!("{:>12} {:#010x}", "magic".bold(), info.magic);
        println!("{:>12} {:#x}", "version".bold(), info.version);
        println!("{:>12} {:#010x}", "flags".bold(), info.flags);
        println!("{:>12} {}", "declared".bold(), info.file_count);
        println!("{:>12} {}", "entries".bold(), archive.len());
        if let Some(size) = archive.decompressed_size() {
            println!("{:>12} {}", "size".bold(), size);
        }

        Ok(())
    }
}

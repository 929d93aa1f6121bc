use bsa_archive::{Archive, ExtractOptions};
use clap::Args;
use miette::{miette, Context, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input BSA or BA2 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Only extract these full paths, as listed by `archive list --flat`
    #[arg(short, long, value_name = "PATH")]
    entry: Vec<String>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let mut archive = Archive::open(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        if self.entry.is_empty() {
            let options = ExtractOptions::builder().overwrite(self.overwrite).build();
            let summary = archive.extract_all(&self.directory, options)?;

            if summary.failed > 0 {
                return Err(miette!(
                    "{} of {} entries could not be extracted",
                    summary.failed,
                    summary.failed + summary.extracted
                ));
            }
            return Ok(());
        }

        for name in &self.entry {
            let index = archive
                .index_for_name(name)
                .ok_or_else(|| miette!("{name} is not part of the archive"))?;
            let entry = archive.entries()[index].clone();

            let p = bsa_archive::read::entry_destination(&self.directory, entry.full_path())?;
            if !self.overwrite && p.exists() {
                return Err(miette!("{} already exists", p.display()));
            }

            info!("writing {}", p.display());
            archive
                .extract_to_path(&entry, &p)
                .context(format!("extracting {name}"))?;
        }

        Ok(())
    }
}

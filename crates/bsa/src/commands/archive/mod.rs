pub mod extract;
pub mod info;
pub mod list;

#[derive(clap::Subcommand)]
pub enum ArchiveCommands {
    /// Show the header values of an archive
    Info(info::InfoArgs),
    /// List the contents of an archive
    List(list::ListArgs),
    /// Extract an archive into a directory
    Extract(extract::ExtractArgs),
}

impl ArchiveCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            ArchiveCommands::Info(info) => info.handle(),
            ArchiveCommands::List(list) => list.handle(),
            ArchiveCommands::Extract(extract) => extract.handle(),
        }
    }
}

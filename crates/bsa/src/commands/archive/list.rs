use bsa_archive::{Archive, ArchiveTree, NodeId};
use clap::Args;
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input BSA or BA2 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Print one full path per line instead of a tree
    #[arg(long, default_value_t = false)]
    flat: bool,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = Archive::open(&self.file)
            .context(format!("path: {}", &self.file.display()))?;

        if self.flat {
            for entry in archive.entries().iter() {
                let file = entry.file();
                println!(
                    "{:>10} {:>10} {}",
                    entry.display_size(),
                    file.compressed_size,
                    entry.full_path()
                );
            }
            return Ok(());
        }

        let tree = archive.tree();
        println!("{}", tree.root().name.bold());
        print_children(tree, ArchiveTree::ROOT, "");
        Ok(())
    }
}

fn print_children(tree: &ArchiveTree, id: NodeId, indent: &str) {
    let children: Vec<_> = tree.children(id).collect();
    let count = children.len();

    for (position, (child, node)) in children.into_iter().enumerate() {
        let last = position + 1 == count;
        let branch = if last { "└── " } else { "├── " };

        if node.is_folder() {
            println!(
                "{indent}{branch}{} {}",
                node.name.blue().bold(),
                format!("[{}]", tree.size(child)).dimmed()
            );
            let nested = format!("{indent}{}", if last { "    " } else { "│   " });
            print_children(tree, child, &nested);
        } else {
            println!(
                "{indent}{branch}{} {}",
                node.name,
                format!("({})", tree.size(child)).dimmed()
            );
        }
    }
}

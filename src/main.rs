//! pagedb - inspect and initialise paged heap files

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use pagedb::access::BTree;
use pagedb::storage::page::{BranchPage, LeafPage, MetaPage, NodePage, NodeType};
use pagedb::storage::{
    BufferPoolManager, DiskManager, PageId, ReplacerKind, StorageConfig, PAGE_SIZE,
};
use std::path::{Path, PathBuf};

/// pagedb - a paged heap file with a buffer pool
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a B+Tree (meta page and empty root leaf) in a heap file
    Init {
        /// Heap file, created if missing
        file: PathBuf,

        /// Number of frames in the buffer pool
        #[arg(short, long, default_value = "64")]
        pool_size: usize,

        /// Eviction policy (lru or clock)
        #[arg(short, long, default_value = "lru")]
        replacer: ReplacerKind,
    },

    /// Decode the header of one page
    Inspect {
        /// Heap file
        file: PathBuf,

        /// Page to decode
        page_id: i64,

        /// How to interpret the page
        #[arg(long = "as", value_enum, default_value = "node")]
        layout: Layout,
    },

    /// Print heap file statistics
    Info {
        /// Heap file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Layout {
    Meta,
    Node,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match args.command {
        Command::Init {
            file,
            pool_size,
            replacer,
        } => init(&file, StorageConfig { pool_size, replacer }),
        Command::Inspect {
            file,
            page_id,
            layout,
        } => inspect(&file, PageId(page_id), layout),
        Command::Info { file } => info(&file),
    }
}

fn init(path: &Path, config: StorageConfig) -> Result<()> {
    let buffer_pool = BufferPoolManager::open(path, &config)
        .with_context(|| format!("Failed to open heap file {:?}", path))?;

    let mut btree = BTree::create(&buffer_pool).context("Failed to create btree")?;
    let root_id = btree.root_id(&buffer_pool)?;
    println!("Created btree in {}", path.display());
    println!("   - Meta page: {}", btree.meta_id());
    println!("   - Root page: {}", root_id);

    btree.clear(&buffer_pool)?;
    buffer_pool.close().context("Failed to close heap file")?;
    Ok(())
}

fn inspect(path: &Path, page_id: PageId, layout: Layout) -> Result<()> {
    let mut disk = open_existing(path)?;
    let mut data = vec![0u8; PAGE_SIZE];
    disk.read_page(page_id, &mut data)
        .with_context(|| format!("Failed to read page {}", page_id))?;

    println!("Page {} of {}", page_id, path.display());
    match layout {
        Layout::Meta => {
            let meta = MetaPage::new(&data[..])?;
            println!("   - Root page: {}", meta.root_id());
        }
        Layout::Node => {
            let node = NodePage::new(&data[..])?;
            match node.node_type()? {
                NodeType::Leaf => {
                    let leaf = LeafPage::from_node(node)?;
                    println!("   - Kind: leaf");
                    println!("   - Prev: {}", describe(leaf.prev_id()));
                    println!("   - Next: {}", describe(leaf.next_id()));
                    println!("   - Slots: {}", leaf.num_slots());
                    println!("   - Free space: {}", leaf.free_space());
                }
                NodeType::Branch => {
                    let branch = BranchPage::from_node(node)?;
                    println!("   - Kind: branch");
                    println!("   - Right: {}", describe(branch.right_id()));
                    println!("   - Slots: {}", branch.num_slots());
                    println!("   - Free space: {}", branch.free_space());
                }
            }
        }
    }

    disk.close()?;
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let disk = open_existing(path)?;
    println!("Heap file {}", path.display());
    println!("   - Pages: {}", disk.num_pages()?);
    println!("   - Next page id: {}", disk.next_page_id());
    disk.close()?;
    Ok(())
}

fn open_existing(path: &Path) -> Result<DiskManager> {
    if !path.exists() {
        bail!("Heap file does not exist at {:?}", path);
    }
    DiskManager::open_read_only(path).with_context(|| format!("Failed to open heap file {:?}", path))
}

fn describe(page_id: Option<PageId>) -> String {
    page_id.map_or_else(|| "none".to_string(), |id| id.to_string())
}

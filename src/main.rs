// Demonstrate OrderedTree as a sorted sequence addressable by rank:
// * insert a couple of strings and report the size.
// * locate the rank of one value and project the rank back to a value.
// * erase it again and report the size.
// * validate a larger tree and log its leaf-depth histogram.
//
// Set RUST_LOG-like verbosity through the first argument, EG:
// `avl-index debug`.

use std::env;

use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use avl_index::OrderedTree;

fn main() {
    let level = env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    let mode = TerminalMode::Mixed;
    if let Err(err) = TermLogger::init(level, Config::default(), mode, ColorChoice::Auto) {
        eprintln!("unable to initialize logger: {}", err);
    }

    let mut tree: OrderedTree<String> = OrderedTree::new("demo");
    tree.insert("foo".to_string());
    tree.insert("bar".to_string());
    info!("{}: size = {}", tree.id(), tree.len());

    let pos = match tree.find("foo") {
        Some(pos) => pos,
        None => {
            error!("{}: foo is missing", tree.id());
            std::process::exit(1);
        }
    };
    info!("foo's pos = {}", pos);

    let value = tree[pos].clone();
    info!("by this index = {}", value);

    match tree.erase(value.as_str()) {
        Ok(_) => info!("size after erase = {}", tree.len()),
        Err(err) => error!("{}", err),
    }
    for (rank, value) in tree.iter().enumerate() {
        info!("  {} => {}", rank, value);
    }

    let tree: OrderedTree<u64> = (0..1000).collect();
    match tree.validate() {
        Ok(stats) => {
            info!("{} entries, height {}", stats.entries(), stats.height());
            if let Some(depths) = stats.depths() {
                depths.log("  ");
            }
        }
        Err(err) => error!("{}", err),
    }
}

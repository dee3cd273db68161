use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "keynav")]
#[command(about = "Bind keys to applications, shell scripts and websites")]
#[command(version)]
pub struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Settings file holding the stored actions, overrides the config
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List loaded actions
    List {
        /// Hide kinds the configured capabilities do not allow viewing
        #[arg(long)]
        restricted: bool,
    },
    /// Show one action in full
    Show { id: String },
    /// Store a new action
    Add(AddArgs),
    /// Remove a stored action
    Remove { id: String },
    /// Remove every stored action
    Clear,
    /// Fire the actions bound to a key
    Press { key: String },
    /// Read keys from the terminal and fire bound actions until Esc
    Listen,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    #[arg(value_enum)]
    pub kind: KindArg,

    #[arg(long)]
    pub name: String,

    /// Key to bind, repeatable (e.g. ctrl+p, f5)
    #[arg(long = "key")]
    pub keys: Vec<String>,

    /// Application path, script line or website, repeatable
    #[arg(long = "item")]
    pub items: Vec<String>,

    /// Run a cmd script without a visible window
    #[arg(long)]
    pub hidden: bool,

    #[arg(long)]
    pub locked: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    Default,
    Cmd,
    Web,
}

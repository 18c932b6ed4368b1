use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use marketplace_core::ListingType;

#[derive(Parser)]
#[command(name = "marketplace")]
#[command(about = "Browse, create and edit House Marketplace listings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name holding Firebase configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List listings, newest first
    List {
        /// Only show one category
        #[arg(long = "type", value_enum, value_name = "TYPE")]
        listing_type: Option<CategoryArg>,
        /// Only show listings with a discounted offer
        #[arg(long)]
        offers: bool,
        /// Only show listings owned by the signed-in user
        #[arg(long)]
        mine: bool,
        /// Number of listings to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one listing
    Show {
        /// Listing ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new listing
    Create {
        /// Field assignment such as `name="Sunny flat"` or `offer=true`
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
        /// Image file to upload (repeatable, at most 6)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },
    /// Edit a listing you own
    Edit {
        /// Listing ID
        id: String,
        /// Field assignment such as `regularPrice=1500`
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
        /// Replacement image files; existing images are kept when omitted
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate with Firebase email/password
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CategoryArg {
    Rent,
    Sale,
}

impl From<CategoryArg> for ListingType {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Rent => Self::Rent,
            CategoryArg::Sale => Self::Sale,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Firebase web API key
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
        /// Firebase project ID
        #[arg(long, value_name = "ID")]
        project_id: Option<String>,
        /// Cloud Storage bucket
        #[arg(long, value_name = "BUCKET")]
        storage_bucket: Option<String>,
        /// Google Geocoding API key; enables address lookup
        #[arg(long, value_name = "KEY")]
        geocoding_api_key: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved profile
    Show {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email/password and store session in keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account and sign in
    Signup {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status,
    /// Sign out profile and clear stored session
    Logout,
}

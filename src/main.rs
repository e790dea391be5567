mod commands;
mod watch;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use reviewtag::{ReviewKey, diagnostics};

/// Exit code for any failure that stopped a command.
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "reviewtag", about = "Review comments anchored to code through inline markers")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log debug events to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag a line range with markers for a new comment
    Add {
        /// File to annotate.
        file: String,
        /// Comment identity.
        #[command(flatten)]
        key: KeyArgs,
        /// 1-based line or inclusive range, e.g. `7` or `3:12`.
        #[arg(long)]
        lines: String,
    },
    /// Remove comment tags from every supported file under the working directory
    Clean {
        /// Only remove these keys (as written in the file); default is all.
        #[arg(long = "key")]
        keys: Vec<String>,
    },
    /// Remove the markers of one comment
    Remove {
        /// File holding the markers.
        file: String,
        /// Comment identity.
        #[command(flatten)]
        key: KeyArgs,
    },
    /// Parse a file, repair broken markers, and list annotated spans
    Scan {
        /// File to scan.
        file: String,
        /// Output format: text or json.
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Scan a file, then rescan whenever it changes on disk
    Watch {
        /// File to watch.
        file: String,
        /// Output format: text or json.
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Review id, author, and comment id identifying one comment.
#[derive(Args)]
struct KeyArgs {
    /// Comment author.
    #[arg(long)]
    author: String,
    /// Comment id within the review.
    #[arg(long)]
    comment: String,
    /// Review id.
    #[arg(long)]
    review: String,
}

impl KeyArgs {
    /// Assemble the key components.
    fn to_key(&self) -> ReviewKey {
        return ReviewKey::new(&self.review, &self.author, &self.comment);
    }
}

/// Install the stderr log subscriber.
fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Add { file, key, lines } => {
            commands::add(file, &key.to_key(), lines).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Clean { keys } => commands::clean(keys).map(|()| return ExitCode::SUCCESS),
        Commands::Remove { file, key } => {
            commands::remove(file, &key.to_key()).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Scan { file, format } => commands::scan(file, format),
        Commands::Watch { file, format } => watch::run(file, format),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(EXIT_ERROR)
        },
    };
}

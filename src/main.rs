use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use hunk_stash::tools::{DEFAULT_DIFF_COMMAND, DEFAULT_PATCH_COMMAND, ExternalDiff, ExternalPatch};
use hunk_stash::{
    CommandLine, Prompt, Selection, SelectionError, Settings, StashError, Stasher, ToolError,
    Verbosity,
};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "stash")]
#[command(about = "Stash and pop individual diff hunks of a single file")]
struct Cli {
    /// More output; repeat for more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Less output; repeat for less
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,

    /// Command that prints a unified diff of the file's uncommitted change
    #[arg(long, env = "STASH_DIFF", default_value = DEFAULT_DIFF_COMMAND, global = true)]
    diff_command: String,

    /// Command that applies a hunk file to the working file
    #[arg(long, env = "STASH_PATCH", default_value = DEFAULT_PATCH_COMMAND, global = true)]
    patch_command: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move hunks from the working file into its stash
    #[command(visible_alias = "push", alias = "s")]
    Save {
        file: PathBuf,
        /// Hunk positions (e.g. "1,3") or "@" for all; prompts per hunk if omitted
        hunks: Option<String>,
    },
    /// Move stashed hunks back into the working file
    #[command(alias = "p")]
    Pop {
        file: PathBuf,
        /// Stash positions (e.g. "2") or "@" for all; prompts per hunk if omitted
        hunks: Option<String>,
    },
    /// Show the hunks stashed for a file
    List { file: PathBuf },
    /// Print shell completions
    Completions {
        #[arg(value_enum, default_value_t = Shell::Bash)]
        shell: Shell,
    },
    /// Print a man page
    Man,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);

    tracing_subscriber::fmt()
        .with_max_level(verbosity.level_filter())
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli, verbosity) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("stash: abort: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, verbosity: Verbosity) -> Result<(), StashError> {
    let diff = ExternalDiff::new(command_line(&cli.diff_command, "--diff-command")?);
    let patch = ExternalPatch::new(command_line(&cli.patch_command, "--patch-command")?);
    let stasher = Stasher::new(Settings::from_env(verbosity), diff, patch);

    match cli.command {
        Commands::Save { file, hunks } => {
            let selection = parse_selection(hunks.as_deref())?;
            let mut prompt = terminal_prompt();
            let report = stasher.save(&file, selection.as_ref(), &mut prompt)?;
            tracing::debug!(?report, "save finished");
        }
        Commands::Pop { file, hunks } => {
            let selection = parse_selection(hunks.as_deref())?;
            let mut prompt = terminal_prompt();
            let report = stasher.pop(&file, selection.as_ref(), &mut prompt)?;
            tracing::debug!(?report, "pop finished");
        }
        Commands::List { file } => {
            let hunks = stasher.list(&file)?;
            print!("{}", hunks.summary());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "stash", &mut io::stdout());
        }
        Commands::Man => {
            let mut stdout = io::stdout();
            clap_mangen::Man::new(Cli::command())
                .render(&mut stdout)
                .and_then(|()| stdout.flush())
                .map_err(|e| ToolError::Output {
                    message: e.to_string(),
                })?;
        }
    }
    Ok(())
}

/// Parsed before anything is touched so a bad list never half-runs.
fn parse_selection(hunks: Option<&str>) -> Result<Option<Selection>, SelectionError> {
    hunks.map(Selection::parse).transpose()
}

fn command_line(line: &str, flag: &str) -> Result<CommandLine, StashError> {
    CommandLine::parse(line).ok_or_else(|| {
        ToolError::EmptyCommand {
            flag: flag.to_string(),
        }
        .into()
    })
}

fn terminal_prompt() -> Prompt<io::StdinLock<'static>, io::Stdout> {
    let color = io::stdout().is_terminal();
    Prompt::new(io::stdin().lock(), io::stdout()).with_color(color)
}

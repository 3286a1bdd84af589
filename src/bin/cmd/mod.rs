use clap::Parser;
use tracing::Level;

mod compile;
mod run;

pub const BANNER: &str = color_print::cstr! {
r#"
 ___ ___ _ _____    ___ ___  ___  ___ ___
|_ _| _ \ |_   _|__| __/ _ \| _ \/ __| __|      Assembler back end for
 | ||   / | | ||___| _| (_) |   / (_ | _|     <yellow><bold>ternary</bold></yellow> self-modifying machines.
 |_||_|_\_| |_|    |_| \___/|_|_\\___|___|

 <magenta>compile:</magenta> <blue><italic><dim>trit-forge compile --input prog.json --output prog.mb</dim></italic></blue>
 <magenta>run:</magenta> <blue><italic><dim>trit-forge run --program prog.mb</dim></italic></blue>"#
};

#[derive(Parser)]
#[clap(version, about, long_about = Some(BANNER))]
#[clap(propagate_version = true)]
pub struct Cli {
    /// Log more; repeat for debug output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    pub cmd: Cmd,
}

impl Default for Cli {
    fn default() -> Self {
        Self::parse()
    }
}

impl Cli {
    pub async fn exec(self) -> miette::Result<()> {
        init_tracing(match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        });

        self.cmd.exec().await
    }
}

#[derive(clap::Subcommand)]
pub enum Cmd {
    Compile(compile::Args),
    Run(run::Args),
}

impl Cmd {
    pub async fn exec(self) -> miette::Result<()> {
        match self {
            Cmd::Compile(args) => args.exec().await,
            Cmd::Run(args) => args.exec().await,
        }
    }
}

fn init_tracing(level: Level) {
    let _ = tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_compile() {
        let cli = Cli::parse_from([
            "trit-forge",
            "-vv",
            "compile",
            "--input",
            "prog.json",
            "--output",
            "prog.mb",
            "--fast",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.cmd, Cmd::Compile(_)));
    }

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["trit-forge", "run", "--program", "prog.mb"]);
        assert_eq!(cli.verbose, 0);
        assert!(matches!(cli.cmd, Cmd::Run(_)));
    }
}

use std::path::PathBuf;

use miette::{miette, IntoDiagnostic};
use tokio::{fs, io::AsyncWriteExt};
use trit_vm::{Machine, Outcome};

/// Execute an image on the reference interpreter
#[derive(clap::Args)]
pub struct Args {
    /// The image to execute
    #[clap(short, long)]
    program: PathBuf,

    /// Bytes handed to the input instruction
    #[clap(short, long)]
    input: Option<String>,

    /// Stop after this many instructions
    #[clap(long, default_value_t = 100_000_000)]
    limit: u64,
}

impl Args {
    pub async fn exec(self) -> miette::Result<()> {
        let image = fs::read(&self.program).await.into_diagnostic()?;

        let mut machine = Machine::load(&image)
            .into_diagnostic()?
            .with_input(self.input.as_deref().unwrap_or_default().as_bytes());

        let outcome = machine.run(self.limit);

        let mut stdout = tokio::io::stdout();
        stdout.write_all(machine.output()).await.into_diagnostic()?;
        stdout.flush().await.into_diagnostic()?;

        match outcome {
            Outcome::Halted { steps } => {
                tracing::info!(steps, "halted");
                Ok(())
            }
            Outcome::StepLimit { steps } => Err(miette!("step limit reached after {steps} steps")),
            Outcome::InvalidCell {
                position,
                value,
                steps,
            } => Err(miette!(
                "execution failed: cell {position} holds {value} after {steps} steps"
            )),
            Outcome::Reached { steps } => Err(miette!("stopped unexpectedly after {steps} steps")),
        }
    }
}

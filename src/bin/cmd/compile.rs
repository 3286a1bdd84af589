use std::path::PathBuf;

use miette::IntoDiagnostic;
use tokio::{
    fs,
    io::{self, AsyncReadExt},
};
use trit_forge::{compile, CompileOptions, DebugInfo, Diagnostics, Program};

/// Compile a resolved program into a machine image
#[derive(clap::Args)]
pub struct Args {
    /// Program in JSON form; read from stdin when missing
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// Where to write the image
    #[clap(short, long)]
    output: PathBuf,

    /// Also write a debugger side file
    #[clap(long)]
    debug_file: Option<PathBuf>,

    /// Skip the search for the smallest initialization budget
    #[clap(long)]
    fast: bool,
}

impl Args {
    pub async fn exec(self) -> miette::Result<()> {
        let source = if let Some(path) = &self.input {
            fs::read_to_string(path).await.into_diagnostic()?
        } else {
            let mut buffer = String::new();

            io::stdin()
                .read_to_string(&mut buffer)
                .await
                .into_diagnostic()?;

            buffer
        };

        let program = Program::from_json(&source).into_diagnostic()?;

        let options = CompileOptions {
            fast: self.fast,
            diagnostics: Diagnostics::Report,
        };
        let compiled = compile(&program, &options).into_diagnostic()?;

        let mut image = compiled.bytes.clone();
        image.push(b'\n');
        fs::write(&self.output, image).await.into_diagnostic()?;
        eprintln!("Image written to {}", self.output.display());

        if let Some(debug_file) = &self.debug_file {
            let source_name = self
                .input
                .as_ref()
                .map_or_else(|| "-".to_string(), |p| p.display().to_string());
            let info = DebugInfo::new(
                &program,
                &compiled,
                source_name,
                self.output.display().to_string(),
            );
            let text = info.to_text().into_diagnostic()?;
            fs::write(debug_file, text).await.into_diagnostic()?;
            eprintln!("Debugging information written to {}", debug_file.display());
        }

        Ok(())
    }
}

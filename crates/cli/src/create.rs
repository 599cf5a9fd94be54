use scadwatch_core::scaffold::{create_project, CreateRequest};
use scadwatch_core::ScadwatchError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

const USAGE: &str = "Usage: scadwatch create <long_name> [short_name] [template] [--description TEXT]\n\
                     Example: scadwatch create \"Phone Stand\" stand";

pub fn run(
    root: PathBuf,
    long_name: Option<String>,
    short_name: Option<String>,
    template: Option<String>,
    description: Option<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Some(long_name) = long_name else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::FAILURE);
    };

    let request = CreateRequest {
        long_name,
        short_name,
        template,
        description,
    };
    let today = chrono::Local::now().date_naive();

    let created = match create_project(&root, &request, today) {
        Ok(created) => created,
        Err(ScadwatchError::Usage(msg)) => {
            eprintln!("{msg}\n{USAGE}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    info!("Created: {}", created.dir.display());
    for path in &created.written {
        println!("- {}", path.display());
    }
    for path in &created.skipped {
        println!("- {} (exists, kept)", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

// ABOUTME: Init command implementation.
// ABOUTME: Writes a sitepush.yml template into the working directory.

use sitepush::config;
use sitepush::error::Result;
use sitepush::output::Output;
use std::env;

pub fn init(bucket: Option<&str>, force: bool, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let path = config::init_config(&cwd, bucket, force)?;
    output.success(&format!("Created {}", path.display()));
    Ok(())
}

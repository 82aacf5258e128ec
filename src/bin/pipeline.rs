use std::env;
use std::path::Path;

use anyhow::{bail, Result};

use salvinia::pipeline::{run, PipelineConfig};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        bail!("usage: pipeline <config.json>");
    }
    let config = PipelineConfig::from_json_file(Path::new(&args[1]))?;

    let reports = run(&config)?;
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }
    Ok(())
}

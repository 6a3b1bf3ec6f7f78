use anyhow::{bail, Result};
use autopilot_cli::{run_scenario, EngineConfig, Scenario};
use tracing::info;

use super::commands::RunArgs;
use super::output::OutputFormat;

pub async fn cmd_run(args: RunArgs, config: &EngineConfig, output: OutputFormat) -> Result<()> {
    let scenario = Scenario::from_path(&args.scenario)?;
    let report = run_scenario(&scenario, config, args.strict_element_check()).await;
    println!("{}", output.render(&report)?);

    let rejected = report.rejected();
    info!(
        commands = report.commands.len(),
        rejected,
        "scenario finished"
    );
    if rejected > 0 {
        bail!("{rejected} of {} commands were rejected", report.commands.len());
    }
    Ok(())
}

use anyhow::Result;
use autopilot_cli::protocol_entries;

use super::commands::CommandsArgs;
use super::output::OutputFormat;

pub fn cmd_commands(args: CommandsArgs, output: OutputFormat) -> Result<()> {
    let entries = protocol_entries(args.automation_only);
    match output {
        OutputFormat::Json => println!("{}", output.render(&entries)?),
        OutputFormat::Human => {
            println!("{:<24} {:<26} {}", "NAME", "WIRE ID", "AUTOMATION");
            for entry in entries {
                let automation = if entry.automation { "yes" } else { "no" };
                println!("{:<24} {:<26} {}", entry.name, entry.wire_id, automation);
            }
        }
    }
    Ok(())
}

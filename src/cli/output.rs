use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// Pretty JSON for people, one line for machines.
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Human => serde_json::to_string_pretty(value)?,
            OutputFormat::Json => serde_json::to_string(value)?,
        })
    }
}

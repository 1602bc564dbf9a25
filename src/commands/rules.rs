use super::{open_output, resolve_config};
use crate::config::OutputFormat;
use crate::io::create_writer;
use crate::rules::load_rule_table;
use anyhow::Result;
use std::path::Path;

pub fn list_rules(format: OutputFormat, config: Option<&Path>) -> Result<()> {
    let config = resolve_config(config)?;
    let table = load_rule_table(&config.rules)?;
    let mut writer = create_writer(format, open_output(None)?);
    writer.write_rules(&table)?;
    Ok(())
}

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::state::{Hop, RegistryInfo};

/// One output record: the hop plus its registry info when resolved
#[derive(Debug, Serialize)]
pub struct HopRecord<'a> {
    #[serde(flatten)]
    pub hop: &'a Hop,
    pub registry: Option<&'a RegistryInfo>,
}

/// Write one hop as a single JSON line
pub fn export_json_line<W: Write>(
    mut writer: W,
    hop: &Hop,
    registry: Option<&RegistryInfo>,
) -> Result<()> {
    serde_json::to_writer(&mut writer, &HopRecord { hop, registry })?;
    writeln!(writer)?;
    Ok(())
}

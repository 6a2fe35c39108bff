//! Assemble a [`ReconInput`] from a source config: read the vendor and
//! reference files (paths relative to the config file's directory) and
//! hand everything to the engine pre-loaded.

use std::collections::HashMap;
use std::path::Path;

use navcharge_recon::config::{SourceConfig, TableRole};
use navcharge_recon::normalize::load_vendor_records;
use navcharge_recon::reconcile::ReconInput;
use navcharge_recon::table::{AircraftMassTable, ReferenceTable};
use navcharge_recon::ReconError;

use crate::exit_codes::{EXIT_RUNTIME, EXIT_SCHEMA_MISMATCH};
use crate::CliError;

fn read_file(base_dir: &Path, name: &str) -> Result<String, CliError> {
    let path = base_dir.join(name);
    std::fs::read_to_string(&path).map_err(|e| CliError {
        code: EXIT_RUNTIME,
        message: format!("cannot read {}: {e}", path.display()),
        hint: Some("data file paths are resolved relative to the config file".into()),
    })
}

fn engine_err(e: ReconError) -> CliError {
    let code = match e {
        ReconError::SchemaMismatch { .. } => EXIT_SCHEMA_MISMATCH,
        _ => EXIT_RUNTIME,
    };
    CliError { code, message: e.to_string(), hint: None }
}

pub fn load_input(config: &SourceConfig, base_dir: &Path) -> Result<ReconInput, CliError> {
    let mass_table = match &config.mass_table {
        Some(mt) => {
            let csv_data = read_file(base_dir, &mt.file)?;
            Some(AircraftMassTable::from_csv(&csv_data, mt).map_err(engine_err)?)
        }
        None => None,
    };

    let mut tables: HashMap<TableRole, ReferenceTable> = HashMap::new();
    for table_config in &config.tables {
        let csv_data = read_file(base_dir, &table_config.file)?;
        let table = ReferenceTable::from_csv(&csv_data, table_config).map_err(engine_err)?;
        tables.insert(table_config.role, table);
    }

    let vendor_csv = read_file(base_dir, &config.vendor.file)?;
    let records =
        load_vendor_records(&vendor_csv, config, mass_table.as_ref()).map_err(engine_err)?;

    Ok(ReconInput { records, tables })
}

use std::collections::HashMap;
use std::path::Path;

use aquahive_features::{
    build_discharge_table, build_param_tables, combine_with_discharge, combined_file_name,
    concentration_file_name, discharge_file_name, init_logging, load_file_name,
    load_readings_csv, log_run_finish, log_run_start, logging_config_from_env, manifest_path_for,
    run_config_from_env, write_schema_manifest, write_table_csv, FeatureTable, Site,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;

    let cfg = run_config_from_env()?;
    log_run_start(&logging_cfg, &cfg.input_path, &cfg.output_dir);

    let readings = load_readings_csv(&cfg.input_path)?;
    let mut written = 0_usize;

    let mut discharge_by_site: HashMap<Site, FeatureTable> = HashMap::new();
    for site in &cfg.sites {
        let table = build_discharge_table(&readings, site, &cfg.buckets);
        persist(&table, &cfg.output_dir.join(discharge_file_name(site)))?;
        written += 1;
        discharge_by_site.insert(site.clone(), table);
    }

    for parameter in &cfg.parameters {
        let mut param_tables = Vec::with_capacity(cfg.sites.len() * 2);
        let mut discharge_tables = Vec::with_capacity(cfg.sites.len());

        for site in &cfg.sites {
            let features = build_param_tables(&readings, parameter, site, &cfg.buckets)?;
            persist(
                &features.concentration,
                &cfg.output_dir.join(concentration_file_name(parameter, site)),
            )?;
            persist(
                &features.load,
                &cfg.output_dir.join(load_file_name(parameter, site)),
            )?;
            written += 2;

            param_tables.push(features.concentration);
            param_tables.push(features.load);
            if let Some(discharge) = discharge_by_site.get(site) {
                discharge_tables.push(discharge.clone());
            }
        }

        let combined = combine_with_discharge(&param_tables, &discharge_tables);
        persist(&combined, &cfg.output_dir.join(combined_file_name(parameter)))?;
        written += 1;
    }

    log_run_finish(written, readings.len());
    Ok(())
}

fn persist(table: &FeatureTable, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    write_table_csv(table, path)?;
    write_schema_manifest(table, &manifest_path_for(path))?;
    Ok(())
}

use anyhow::{Context, Result};
use tracing::info;

use variants_cli::catalog::Catalog;
use variants_cli::plan::{Plan, derive};
use variants_cli::report::{type_reports, variant_reports};

use crate::cli::{DeriveArgs, InspectArgs};
use crate::summary::{print_types, print_variants};

pub fn run_derive(args: &DeriveArgs) -> Result<()> {
    let catalog = Catalog::load(&args.catalog)?;
    let plan = Plan::load(&args.plan)?;
    info!(types = catalog.len(), "catalog loaded");

    let derivation = derive(&catalog, &plan)?;
    if args.json {
        let json = serde_json::to_string_pretty(&variant_reports(&derivation.variants))
            .context("serialize variants")?;
        println!("{json}");
    } else {
        print_variants(&derivation.variants);
    }
    Ok(())
}

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let catalog = Catalog::load(&args.catalog)?;
    if args.json {
        let json = serde_json::to_string_pretty(&type_reports(catalog.types()))
            .context("serialize catalog")?;
        println!("{json}");
    } else {
        print_types(catalog.types());
    }
    Ok(())
}

// Licensed under the Apache-2.0 license

//! Generate PI/PO headers and bit maps for every module in a job file.
//!
//! All modules are generated in memory first. Files are only written when
//! every selected module succeeded.

use anyhow::{anyhow, bail, Context, Result};
use pipo_generator::{map_outputs, BitMaps, Generation, JobFile, ModuleJob, OutputSet};
use std::path::Path;

pub(crate) fn generate(jobs: &Path, only: &[String], check: bool) -> Result<()> {
    let job = JobFile::load(jobs)?;
    let selected = select_modules(&job, only).with_context(|| format!("in {}", jobs.display()))?;

    let mut outputs = OutputSet::new();
    let mut errors = Vec::new();
    for module in &selected {
        println!(
            "Generating {} from {}",
            module.name,
            module.header.display()
        );
        match generate_module(module) {
            Ok((files, maps)) => {
                if let Some(maps) = maps {
                    println!(
                        "  PI_WIDTH={} PO_WIDTH={}",
                        maps.pi.total_width, maps.po.total_width
                    );
                }
                outputs.extend(files);
            }
            Err(e) => errors.push(format!("{}: {e}", module.name)),
        }
    }

    println!("\n=== Generation Summary ===");
    println!(
        "Generated: {} of {} modules",
        selected.len() - errors.len(),
        selected.len()
    );
    if !errors.is_empty() {
        println!("\nErrors ({}):", errors.len());
        for error in &errors {
            println!("  ✗ {}", error);
        }
        bail!("{} module(s) failed; no files were written", errors.len());
    }

    if check {
        for path in outputs.paths() {
            println!("  ✓ Would generate {}", path.display());
        }
        return Ok(());
    }
    outputs.write_all()?;
    for path in outputs.paths() {
        println!("  ✓ Generated {}", path.display());
    }
    Ok(())
}

fn select_modules<'a>(job: &'a JobFile, only: &[String]) -> Result<Vec<&'a ModuleJob>> {
    if only.is_empty() {
        return Ok(job.modules.iter().collect());
    }
    only.iter()
        .map(|name| job.module(name).ok_or_else(|| anyhow!("unknown module `{name}`")))
        .collect()
}

/// Render one module's header and bit maps.
fn generate_module(module: &ModuleJob) -> pipo_generator::Result<(OutputSet, Option<BitMaps>)> {
    let generation = Generation::from_header_file(&module.header, module.io_config()?)?;
    let mut files = OutputSet::new();

    if let (Some(output), Some(opts)) = (&module.output, module.header_options()) {
        files.add(output, generation.header(&opts)?);
    }

    let mut maps = None;
    if let Some(prefix) = &module.map_prefix {
        let evaluated = generation.bit_maps(&module.evaluator())?;
        files.extend(map_outputs(&evaluated, prefix, module.per_bit));
        maps = Some(evaluated);
    }
    Ok((files, maps))
}

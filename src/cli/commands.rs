use std::path::Path;

use crate::cli::args::{Cli, Commands, SelectionArgs};
use crate::comparison::{compare, CompareOptions, Comparer, ComparerCollection, SkillOptions};
use crate::config::RunConfig;
use crate::error::Result;
use crate::metrics::Metric;
use crate::models::ItemSelector;
use crate::readers::{describe, FileFormat};
use crate::utils::progress::ProgressReporter;
use crate::utils::time::{parse_period_bound, parse_period_end};
use crate::writers::{CsvTableWriter, ParquetTableWriter};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compare {
            obs,
            model,
            selection,
            start,
            end,
            metrics,
            json,
        } => {
            let comparer = compare(obs.as_path(), model.as_path(), &compare_options(&selection))?;

            let mut options = SkillOptions::new().with_metrics(Metric::parse_list(&metrics)?);
            if let Some(start) = start {
                options = options.with_start(parse_period_bound(&start)?);
            }
            if let Some(end) = end {
                options = options.with_end(parse_period_end(&end)?);
            }
            let skill = comparer.skill(&options)?;

            if json {
                let output = serde_json::json!({
                    "comparison": comparer.info(),
                    "skill": skill,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}\n", comparer.summary());
                print!("{}", skill);
            }
        }

        Commands::Items { file } => {
            let info = describe(&file)?;
            println!("{}", info.summary());
        }

        Commands::Export {
            obs,
            model,
            selection,
            output,
            compression,
        } => {
            let comparer = compare(obs.as_path(), model.as_path(), &compare_options(&selection))?;
            export(&comparer, &output, &compression)?;
        }

        Commands::Run { config, json } => {
            let run_config = RunConfig::load(&config)?;
            let collection = compare_all(&run_config, json)?;

            let options = run_config.skill_options()?;
            let weights = run_config.weights()?;
            let skill = collection.skill(&options)?;
            let mean_skill = collection.mean_skill(&options, &weights)?;

            if json {
                let comparisons: Vec<_> = collection.iter().map(|c| c.info()).collect();
                let output = serde_json::json!({
                    "comparisons": comparisons,
                    "skill": skill,
                    "mean_skill": mean_skill,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                for comparer in collection.iter() {
                    println!("{}\n", comparer.summary());
                }
                println!("Skill:\n{}", skill);
                println!("Mean skill ({:?} weights):\n{}", weights, mean_skill);
            }
        }
    }

    Ok(())
}

fn compare_options(selection: &SelectionArgs) -> CompareOptions {
    CompareOptions {
        obs_item: selection.obs_item.as_deref().map(ItemSelector::parse),
        mod_item: selection.mod_item.as_deref().map(ItemSelector::parse),
        obs_name: selection.obs_name.clone(),
        mod_name: selection.mod_name.clone(),
    }
}

fn export(comparer: &Comparer, output: &Path, compression: &str) -> Result<()> {
    let table = comparer.to_table()?;

    match FileFormat::from_path(output)? {
        FileFormat::Csv => {
            CsvTableWriter::new().write_table(&table, output)?;
            println!(
                "Wrote {} matched points to {}",
                table.n_rows(),
                output.display()
            );
        }
        FileFormat::Parquet => {
            let writer = ParquetTableWriter::new().with_compression(compression)?;
            writer.write_table(&table, output)?;
            println!("{}", writer.get_file_info(output)?.summary());
        }
    }

    Ok(())
}

fn compare_all(run_config: &RunConfig, silent: bool) -> Result<ComparerCollection> {
    let n_observations = run_config.observations.len();
    let progress = ProgressReporter::new(n_observations as u64, "Loading models...", silent);

    let models = run_config.load_models()?;
    let mut collection = ComparerCollection::new();

    for index in 0..n_observations {
        progress.set_message(&format!(
            "Comparing {}",
            run_config.observations[index].path
        ));
        collection.add(run_config.compare_observation(index, &models)?);
        progress.increment(1);
    }

    progress.finish_with_message(&format!(
        "Compared {} observation(s) with {} model(s), {} matched points",
        collection.len(),
        models.len(),
        collection.n_points()
    ));

    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_options_from_args() {
        let selection = SelectionArgs {
            obs_item: Some("0".to_string()),
            mod_item: Some("Hm0".to_string()),
            obs_name: Some("EPL".to_string()),
            mod_name: None,
        };

        let options = compare_options(&selection);
        assert_eq!(options.obs_item, Some(ItemSelector::Index(0)));
        assert_eq!(options.mod_item, Some(ItemSelector::from("Hm0")));
        assert_eq!(options.obs_name.as_deref(), Some("EPL"));
        assert!(options.mod_name.is_none());
    }
}

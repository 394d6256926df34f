use crate::cli::SweepArgs;
use crate::config::PartialSweepConfig;
use crate::error::Result;
use capsweep::engine::archiver::ResultArchiver;
use capsweep::workflows;
use tracing::info;

pub fn run(args: SweepArgs) -> Result<()> {
    let final_config = PartialSweepConfig::from_args(&args)?.merge_with_cli(&args)?;
    let points = workflows::sweep::plan(&final_config)?;
    info!("Planned {} sweep point(s).", points.len());

    let archiver = ResultArchiver::new(&final_config.results);
    println!(
        "Capacities:     {}..={} step {}",
        final_config.spec.start(),
        final_config.spec.stop(),
        final_config.spec.step()
    );
    println!("Template:       {}", final_config.template.path.display());
    println!("Active config:  {}", final_config.active_config_path.display());
    println!("Engine:         {}", final_config.engine.command_line());
    println!("Results root:   {}", archiver.root().display());
    println!(
        "Compression:    {}{}",
        final_config.results.compression,
        if final_config.results.cleanup {
            " (raw output removed after archiving)"
        } else {
            ""
        }
    );
    println!();

    for (index, point) in points.iter().enumerate() {
        println!(
            "{:>4}  {:<9} {:>10.4}  {}",
            index + 1,
            point.combination.name,
            point.capacity,
            archiver.archive_path(&point.identity).display()
        );
    }
    println!("\n{} point(s) planned.", points.len());
    Ok(())
}

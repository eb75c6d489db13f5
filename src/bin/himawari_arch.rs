use std::{
    path::PathBuf,
    process,
    sync::atomic::{AtomicUsize, Ordering},
};

use clap::{Args, Parser, Subcommand};
use env_logger::{Builder, Env};
use himawari_arch::{
    parse_time_point, Archive, ArchiveConfig, BandSet, CancelContext, CompositeGenerator,
    ExternalCommandGenerator, HimawariArchError, LocalArchive, SftpSession, SlotSelection,
};

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

/// Download Himawari full-disk band files and prepare them for composite generation.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// RON configuration file
    #[arg(short, long, default_value = "himawari_arch.ron")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// download all matching band files of a time window
    Download(Window),
    /// list locally staged scan slots
    Slots,
    /// decompress selected slots and generate composites
    Process(Selection),
    /// download, then process every slot of the window
    Run(Window),
}

#[derive(Args, Debug)]
struct Window {
    /// start time as "YYYYMMDD HH:MM"
    #[arg(long)]
    start: String,
    /// end time as "YYYYMMDD HH:MM"
    #[arg(long)]
    end: String,
    /// comma separated band numbers, e.g. 01,3,13 (defaults from the config file)
    #[arg(long, default_value = "")]
    bands: String,
}

#[derive(Args, Debug)]
struct Selection {
    /// 'all' or comma separated 1-based slot numbers as shown by `slots`
    #[arg(long, default_value = "all")]
    select: String,
}

fn main() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();
    builder.init();

    let cli = Cli::parse();

    let ctx = CancelContext::new();
    let n_interrupts = AtomicUsize::new(0);
    let handler_ctx = ctx.clone();
    let res = ctrlc::set_handler(move || {
        if n_interrupts.fetch_add(1, Ordering::SeqCst) == 0 {
            log::warn!("--- Process interrupted by user (Ctrl+C) ---");
            handler_ctx.cancel();
        } else {
            process::exit(EXIT_INTERRUPTED);
        }
    });
    if let Err(err) = res {
        log::warn!("Could not install interrupt handler: {}", err);
    }

    let code = match run(&cli, ctx) {
        Ok(()) => {
            log::info!("--- finished ---");
            0
        }
        Err(HimawariArchError::Interrupted) => EXIT_INTERRUPTED,
        Err(err) => {
            log::error!("{}", err);
            EXIT_FAILURE
        }
    };

    process::exit(code);
}

fn run(cli: &Cli, ctx: CancelContext) -> Result<(), HimawariArchError> {
    let config = ArchiveConfig::from_file(&cli.config)?;

    match &cli.command {
        Command::Download(window) => {
            let mut archive = connect(&config, ctx)?;
            let res = download(&archive, &config, window);
            archive.close();
            res
        }
        Command::Slots => {
            list_slots(&config);
            Ok(())
        }
        Command::Process(selection) => {
            let selection: SlotSelection = selection.select.parse()?;
            process_slots(&config, ctx, &selection)
        }
        Command::Run(window) => {
            let mut archive = connect(&config, ctx.clone())?;
            let res = download(&archive, &config, window);
            archive.close();
            res?;
            process_slots(&config, ctx, &SlotSelection::All)
        }
    }
}

fn connect(
    config: &ArchiveConfig,
    ctx: CancelContext,
) -> Result<Archive<SftpSession>, HimawariArchError> {
    let session =
        SftpSession::connect(&config.session_params())?.with_cancel_context(ctx.clone());
    Ok(Archive::from_config(config, session).with_cancel_context(ctx))
}

fn download(
    archive: &Archive<SftpSession>,
    config: &ArchiveConfig,
    window: &Window,
) -> Result<(), HimawariArchError> {
    let start = parse_time_point(&window.start)?;
    let end = parse_time_point(&window.end)?;
    let bands = BandSet::parse(&window.bands, &config.band_set()?)?;

    let report = archive.retrieve(start, end, &bands)?;
    for (remote_path, err) in &report.failed {
        log::error!("not downloaded: {} ({})", remote_path, err);
    }
    Ok(())
}

fn list_slots(config: &ArchiveConfig) {
    let slots = LocalArchive::from_config(config).slots();
    if slots.is_empty() {
        log::warn!("No data slots found in {:?}.", config.data_dir);
        return;
    }

    println!("\nAvailable data slots:");
    for (i, (key, files)) in slots.iter().enumerate() {
        println!("  {}: {} ({} files)", i + 1, key, files.len());
    }
}

fn process_slots(
    config: &ArchiveConfig,
    ctx: CancelContext,
    selection: &SlotSelection,
) -> Result<(), HimawariArchError> {
    let archive = LocalArchive::from_config(config).with_cancel_context(ctx);

    let generator = config.composite_command.as_ref().and_then(|cmd| {
        cmd.split_first().map(|(program, args)| {
            ExternalCommandGenerator::new(program.as_str(), args.to_vec())
        })
    });
    if generator.is_none() {
        log::info!("No composite_command configured, only decompressing.");
    }

    let reports = archive.process(
        selection,
        generator.as_ref().map(|g| g as &dyn CompositeGenerator),
        &config.output_dir,
    )?;

    for report in &reports {
        log::info!(
            "{}: {} of {} files decompressed",
            report.slot,
            report.decompressed.successes().len(),
            report.decompressed.len()
        );
    }
    Ok(())
}

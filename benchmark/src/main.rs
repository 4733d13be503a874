mod args;

use args::{Args, Mode};
use benchmark::engine::DEFAULT_HANDSHAKE_TIMEOUT;
use benchmark::rules::Position;
use benchmark::summary::{AccuracySummary, MatchSummary};
use benchmark::work::{load_accuracy_cases, schedule_matches};
use benchmark::{
    EngineCommand, PoolConfig, ProcessLauncher, ProgressReporter, ResultAggregator, WorkQueue,
    WorkerPool,
};
use clap::Parser;
use log::LevelFilter;
use simplelog::{CombinedLogger, Config, SharedLogger, SimpleLogger, WriteLogger};
use std::{
    error::Error,
    fs::File,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_handler = Arc::clone(&stop_flag);

    ctrlc::set_handler(move || {
        log::info!("Received SIGINT, finishing current items...");
        stop_flag_handler.store(true, Ordering::Relaxed);
    })?;

    let workers = usize::from(args.workers);
    let handshake_timeout = DEFAULT_HANDSHAKE_TIMEOUT;
    let timeout_margin = args.timeout_margin();

    match &args.mode {
        Mode::Match {
            engine,
            reference,
            games,
            engine_movetime,
            reference_movetime,
            max_plies,
            start_fen,
            engine_args,
            reference_args,
        } => {
            // Reject a bad start position before any engine is spawned.
            Position::from_fen(start_fen)?;

            let launcher = ProcessLauncher {
                engine: EngineCommand::new(engine).with_args(engine_args.clone()),
                reference: Some(EngineCommand::new(reference).with_args(reference_args.clone())),
                handshake_timeout,
                timeout_margin,
            };
            let config = PoolConfig {
                workers,
                engine_time: Duration::from_millis(*engine_movetime),
                reference_time: Duration::from_millis(*reference_movetime),
                max_plies: *max_plies,
                start_fen: start_fen.clone(),
                launch_reference: true,
            };

            log::info!(
                "Playing {} games: {} vs {}",
                games,
                engine.display(),
                reference.display()
            );

            let queue = WorkQueue::new(schedule_matches(*games));
            let results = run(&args, &launcher, config, &queue, &stop_flag)?;

            println!(
                "{}",
                MatchSummary::new(
                    &engine.display().to_string(),
                    &reference.display().to_string(),
                    &results.snapshot()
                )
            );
        }
        Mode::Accuracy {
            engine,
            cases,
            movetime,
            engine_args,
        } => {
            let items = load_accuracy_cases(cases)?;
            log::info!("Loaded {} positions from {}", items.len(), cases.display());

            let launcher = ProcessLauncher {
                engine: EngineCommand::new(engine).with_args(engine_args.clone()),
                reference: None,
                handshake_timeout,
                timeout_margin,
            };
            let config = PoolConfig {
                workers,
                engine_time: Duration::from_millis(*movetime),
                launch_reference: false,
                ..Default::default()
            };

            let queue = WorkQueue::new(items);
            let results = run(&args, &launcher, config, &queue, &stop_flag)?;

            println!("{}", AccuracySummary::new(&results.snapshot()));
        }
    }

    Ok(())
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.quiet {
        LevelFilter::Warn
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    match &args.log_file {
        Some(path) => {
            let loggers: Vec<Box<dyn SharedLogger>> = vec![
                SimpleLogger::new(level, Config::default()),
                WriteLogger::new(LevelFilter::Debug, Config::default(), File::create(path)?),
            ];
            CombinedLogger::init(loggers)?;
        }
        None => SimpleLogger::init(level, Config::default())?,
    }

    Ok(args)
}

fn run(
    args: &Args,
    launcher: &ProcessLauncher,
    config: PoolConfig,
    queue: &WorkQueue<benchmark::WorkItem>,
    stop_flag: &AtomicBool,
) -> Result<ResultAggregator, Box<dyn Error>> {
    let results = ResultAggregator::new();
    let mut progress = if args.quiet {
        ProgressReporter::hidden(queue.total(), args.progress_interval())
    } else {
        ProgressReporter::new(queue.total(), args.progress_interval())
    };

    let report = WorkerPool::new(launcher, config, stop_flag).run(queue, &results, &mut progress)?;

    if report.cancelled {
        log::warn!("Stopped early, {} items were not run", report.remaining);
    }
    log::info!("{} of {} workers ran", report.workers_started, args.workers);

    Ok(results)
}

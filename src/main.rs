use indicator_engine::logging::{cleanup_old_logs, init_dual_logging, init_simple_logging, log_system_info};
use indicator_engine::market_data::load_bars_csv;
use indicator_engine::{run_engine, EngineConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

const CONFIG_PATH: &str = "config.toml";

struct Args {
    bars: PathBuf,
    minute_bars: Option<PathBuf>,
    config: PathBuf,
}

fn parse_args() -> Option<Args> {
    let mut positional = Vec::new();
    let mut config = PathBuf::from(CONFIG_PATH);

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = PathBuf::from(args.next()?);
        } else {
            positional.push(PathBuf::from(arg));
        }
    }

    let mut positional = positional.into_iter();
    Some(Args {
        bars: positional.next()?,
        minute_bars: positional.next(),
        config,
    })
}

fn main() -> ExitCode {
    let Some(args) = parse_args() else {
        eprintln!("usage: indicator_engine <bars.csv> [minute_bars.csv] [--config config.toml]");
        return ExitCode::from(2);
    };

    // Logging is not up yet, so config problems are reported once it is
    let (config, config_error) = match EngineConfig::from_toml(&args.config) {
        Ok(config) => (config, None),
        Err(e) => (EngineConfig::default(), Some(e)),
    };

    let _logging_guard = match init_dual_logging(config.logging.clone()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("❌ Failed to initialize logging system: {}", e);
            if let Err(e) = init_simple_logging() {
                eprintln!("❌ Fallback logging unavailable: {}", e);
            }
            None
        }
    };

    match config_error {
        None => info!("✅ Loaded configuration from {}", args.config.display()),
        Some(e) => warn!(
            "⚠️ Failed to load {}: {}. Using default configuration",
            args.config.display(),
            e
        ),
    }

    if let Err(e) = cleanup_old_logs(&config.logging.log_dir, config.logging.cleanup_days) {
        warn!("⚠️ Failed to clean up old log files: {}", e);
    }
    log_system_info();

    info!(
        rsi_period = config.rsi.period,
        macd = ?(config.macd.fast_length, config.macd.slow_length, config.macd.signal_length),
        cvd_anchor = %config.cvd.anchor_period,
        frvp_layout = %config.frvp.rows_layout,
        frvp_row_size = config.frvp.row_size,
        alerts = config.alerts.len(),
        "🔧 Engine configuration"
    );

    let bars = match load_bars_csv(&args.bars) {
        Ok(bars) => bars,
        Err(e) => {
            error!("❌ Failed to load bars from {}: {}", args.bars.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let minute_bars = match args.minute_bars.as_ref().map(load_bars_csv).transpose() {
        Ok(minute_bars) => minute_bars,
        Err(e) => {
            error!("❌ Failed to load 1-minute bars: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match run_engine(&config, &bars, minute_bars.as_deref()) {
        Ok(report) => report,
        Err(e) => {
            error!("❌ Indicator run failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{}", json);
            info!("🏁 Indicator run complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Failed to serialize results: {}", e);
            ExitCode::FAILURE
        }
    }
}

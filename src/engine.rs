//! Batch pipeline: one pass of every indicator over a loaded bar set.

use serde::Serialize;
use tracing::{info, warn};

use crate::alerts::{detect_crossings, series_for, DataSource, LevelCrossing};
use crate::config::EngineConfig;
use crate::cvd::{calculate_cvd, CvdCandle};
use crate::errors::Result;
use crate::market_data::Bar;
use crate::technical_analysis::{calculate_macd, calculate_rsi, MacdOutput, RsiOutput};
use crate::volume_profile::{calculate_profile, Profile};

#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    pub source: DataSource,
    pub level: f64,
    pub crossings: Vec<LevelCrossing>,
}

/// Everything produced for one bar set
#[derive(Debug, Clone, Serialize)]
pub struct EngineReport {
    pub bars: usize,
    pub minute_bars: usize,
    pub rsi: RsiOutput,
    pub macd: MacdOutput,
    /// Present only when 1-minute bars were supplied
    pub cvd: Option<Vec<CvdCandle>>,
    pub profile: Option<Profile>,
    pub alerts: Vec<AlertReport>,
}

/// Run RSI, MACD, CVD and FRVP over the bars, then evaluate the configured alert levels.
///
/// FRVP uses the 1-minute bars when present, otherwise the target bars.
pub fn run_engine(config: &EngineConfig, bars: &[Bar], minute_bars: Option<&[Bar]>) -> Result<EngineReport> {
    let rsi = calculate_rsi(bars, &config.rsi);
    let macd = calculate_macd(bars, &config.macd);
    info!(
        "📈 Oscillators computed: {} RSI points, {} MACD points, {} divergences",
        rsi.rsi.len(),
        macd.macd.len(),
        rsi.divergences.len()
    );

    let cvd = match minute_bars {
        Some(minutes) if !minutes.is_empty() => Some(calculate_cvd(bars, minutes, &config.cvd)?),
        _ => None,
    };

    let profile_bars = minute_bars.filter(|m| !m.is_empty()).unwrap_or(bars);
    let profile = if profile_bars.is_empty() {
        warn!("No bars available for the volume profile");
        None
    } else {
        let profile = calculate_profile(profile_bars, &config.frvp)?;
        info!(
            "📊 Volume profile: POC={:.4} VAH={:.4} VAL={:.4} over {} rows",
            profile.poc.price_level,
            profile.vah.price_level,
            profile.val.price_level,
            profile.rows.len()
        );
        Some(profile)
    };

    let cvd_candles = cvd.as_deref().unwrap_or(&[]);
    let alerts = config
        .alerts
        .iter()
        .map(|rule| {
            let series = series_for(rule.source, bars, &rsi.rsi, cvd_candles);
            AlertReport {
                source: rule.source,
                level: rule.level,
                crossings: detect_crossings(&series, rule.level),
            }
        })
        .collect();

    Ok(EngineReport {
        bars: bars.len(),
        minute_bars: minute_bars.map_or(0, |m| m.len()),
        rsi,
        macd,
        cvd,
        profile,
        alerts,
    })
}

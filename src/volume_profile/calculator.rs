use rayon::prelude::*;
use tracing::{debug, warn};

use crate::errors::{IndicatorError, Result};
use crate::market_data::{Bar, TimestampSec};
use super::structs::{
    DevelopingPoint, FrvpConfig, Profile, ProfileRow, RowsLayout, ValueArea, MAX_DEVELOPING_SAMPLES,
    MAX_ROWS,
};
use super::validation::ProfileValidator;

/// Build a fixed range volume profile over every supplied bar.
///
/// The config is sanitized first, so out-of-range options are clamped here as well.
pub fn calculate_profile(bars: &[Bar], config: &FrvpConfig) -> Result<Profile> {
    let mut config = config.clone();
    config.sanitize();
    compute_profile(bars, &config, config.indicators.wants_developing())
}

/// Build a profile over the bars whose time falls within `[start, end]`
pub fn calculate_profile_for_range(
    bars: &[Bar],
    start: TimestampSec,
    end: TimestampSec,
    config: &FrvpConfig,
) -> Result<Profile> {
    let first = bars.partition_point(|bar| bar.time < start);
    let last = bars.partition_point(|bar| bar.time <= end);
    if first >= last {
        return Err(IndicatorError::EmptyInput(format!(
            "no bars between {} and {} for volume profile",
            start, end
        )));
    }
    calculate_profile(&bars[first..last], config)
}

fn compute_profile(bars: &[Bar], config: &FrvpConfig, with_developing: bool) -> Result<Profile> {
    let (first_bar, last_bar) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(IndicatorError::EmptyInput(
                "volume profile requires at least one bar".to_string(),
            ))
        }
    };

    let (profile_low, profile_high) = price_range(bars);
    let mut rows = build_rows(profile_low, profile_high, config.rows_layout, config.row_size);
    distribute_volume(&mut rows, bars);

    let poc_index = find_poc(&rows)?;
    let value_area = calculate_value_area(&rows, poc_index, config.value_area_volume)?;

    let developing = if with_developing {
        Some(developing_profile(bars, config)?)
    } else {
        None
    };

    let profile = Profile {
        poc: rows[poc_index],
        vah: rows[value_area.vah_index],
        val: rows[value_area.val_index],
        value_area_rows: value_area.rows,
        value_area_volume: value_area.volume,
        target_volume: value_area.target_volume,
        total_volume: rows.iter().map(|r| r.total_volume).sum(),
        input_volume: bars.iter().map(|b| b.volume).filter(|v| v.is_finite() && *v > 0.0).sum(),
        profile_high,
        profile_low,
        start_time: first_bar.time,
        end_time: last_bar.time,
        developing,
        rows,
    };

    let validation = ProfileValidator::validate(&profile);
    if !validation.is_valid {
        warn!("Volume profile failed validation: {:?}", validation.errors);
    }

    debug!(
        "Volume profile: {} bars, {} rows, POC={:.4}, VAH={:.4}, VAL={:.4}, total volume={:.2}",
        bars.len(),
        profile.rows.len(),
        profile.poc.price_level,
        profile.vah.price_level,
        profile.val.price_level,
        profile.total_volume
    );

    Ok(profile)
}

/// Lowest low and highest high over the bars
fn price_range(bars: &[Bar]) -> (f64, f64) {
    bars.iter().fold((f64::MAX, f64::MIN), |(low, high), bar| {
        (low.min(bar.low), high.max(bar.high))
    })
}

/// Number of rows for a price range under the given layout, between 1 and `MAX_ROWS`
pub fn row_count(range: f64, layout: RowsLayout, row_size: f64) -> usize {
    let rows = match layout {
        RowsLayout::Number => row_size.round(),
        RowsLayout::Tick if row_size > 0.0 && range > 0.0 => (range / row_size).ceil(),
        // range / (range * size / 100) reduces to 100 / size
        RowsLayout::Percentage if row_size > 0.0 && range > 0.0 => (100.0 / row_size).ceil(),
        _ => 1.0,
    };

    if !rows.is_finite() {
        return 1;
    }
    if rows > MAX_ROWS as f64 {
        warn!("Volume profile needs {} rows, capped at {}", rows, MAX_ROWS);
    }
    rows.clamp(1.0, MAX_ROWS as f64) as usize
}

/// Equal-height contiguous rows covering `[low, high]`; the last row ends exactly at `high`
pub fn build_rows(low: f64, high: f64, layout: RowsLayout, row_size: f64) -> Vec<ProfileRow> {
    let range = (high - low).max(0.0);
    let count = row_count(range, layout, row_size);
    let height = range / count as f64;

    (0..count)
        .map(|i| {
            let row_low = low + i as f64 * height;
            let row_high = if i + 1 == count {
                high
            } else {
                (low + (i + 1) as f64 * height).min(high)
            };
            ProfileRow::new(i, row_low, row_high)
        })
        .collect()
}

/// Spread each bar's volume over the rows it overlaps, proportionally to the overlap length
pub fn distribute_volume(rows: &mut [ProfileRow], bars: &[Bar]) {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return;
    };
    let low = first.price_low;
    let height = (last.price_high - low) / rows.len() as f64;
    if height <= 0.0 || !height.is_finite() {
        return;
    }

    let row_count = rows.len();
    for bar in bars {
        let bar_range = bar.range();
        if bar_range <= 0.0 || !bar.volume.is_finite() || bar.volume <= 0.0 {
            continue;
        }

        // Candidate rows with one row of slack on each side for boundary rounding
        let start = (((bar.low - low) / height).floor() as usize)
            .min(row_count - 1)
            .saturating_sub(1);
        let end = ((((bar.high - low) / height).ceil() as usize) + 1).min(row_count);
        let is_up = bar.is_up();

        for row in &mut rows[start..end] {
            let overlap = bar.high.min(row.price_high) - bar.low.max(row.price_low);
            if overlap > 0.0 {
                row.add_volume(bar.volume * overlap / bar_range, is_up);
            }
        }
    }
}

/// Row with the greatest total volume; the lowest index wins ties
pub fn find_poc(rows: &[ProfileRow]) -> Result<usize> {
    if rows.is_empty() {
        return Err(IndicatorError::EmptyInput(
            "point of control requires at least one row".to_string(),
        ));
    }

    let mut poc = 0;
    for (i, row) in rows.iter().enumerate().skip(1) {
        if row.total_volume > rows[poc].total_volume {
            poc = i;
        }
    }
    Ok(poc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Walks toward index 0
    Descending(usize),
    /// Walks toward the last row
    Ascending(usize),
}

/// Expand the value area outward from the POC until the next row would overshoot the target.
///
/// Each step takes the neighbouring candidate with more volume. Equal volumes go to the
/// candidate nearer the POC, and equal distances go to the descending-index cursor.
/// The percentage is clamped to `[0, 100]`; a non-finite one falls back to 70.
pub fn calculate_value_area(
    rows: &[ProfileRow],
    poc_index: usize,
    value_area_percent: f64,
) -> Result<ValueArea> {
    if rows.is_empty() {
        return Err(IndicatorError::EmptyInput(
            "value area requires at least one row".to_string(),
        ));
    }
    let poc_volume = match rows.get(poc_index) {
        Some(row) => row.total_volume,
        None => {
            return Err(IndicatorError::InvalidConfiguration(format!(
                "POC index {} outside {} rows",
                poc_index,
                rows.len()
            )))
        }
    };
    let total_volume: f64 = rows.iter().map(|r| r.total_volume).sum();
    let value_area_percent = if value_area_percent.is_finite() {
        value_area_percent.clamp(0.0, 100.0)
    } else {
        70.0
    };

    if total_volume <= 0.0 {
        return Ok(ValueArea {
            poc_index,
            vah_index: poc_index,
            val_index: poc_index,
            rows: vec![poc_index],
            volume: poc_volume,
            target_volume: 0.0,
        });
    }

    let target = total_volume * value_area_percent / 100.0;
    let mut accumulated = poc_volume;
    let mut included = vec![poc_index];
    let mut descending = poc_index.checked_sub(1);
    let mut ascending = (poc_index + 1 < rows.len()).then_some(poc_index + 1);

    while accumulated < target {
        let cursor = match (descending, ascending) {
            (None, None) => break,
            (Some(d), None) => Cursor::Descending(d),
            (None, Some(a)) => Cursor::Ascending(a),
            (Some(d), Some(a)) => {
                let (down_volume, up_volume) = (rows[d].total_volume, rows[a].total_volume);
                if down_volume > up_volume {
                    Cursor::Descending(d)
                } else if up_volume > down_volume {
                    Cursor::Ascending(a)
                } else if a - poc_index < poc_index - d {
                    Cursor::Ascending(a)
                } else {
                    Cursor::Descending(d)
                }
            }
        };

        let index = match cursor {
            Cursor::Descending(i) | Cursor::Ascending(i) => i,
        };
        let candidate_volume = rows[index].total_volume;
        if accumulated + candidate_volume > target {
            break;
        }

        accumulated += candidate_volume;
        included.push(index);
        match cursor {
            Cursor::Descending(i) => descending = i.checked_sub(1),
            Cursor::Ascending(i) => ascending = (i + 1 < rows.len()).then_some(i + 1),
        }
    }

    included.sort_unstable();
    Ok(ValueArea {
        poc_index,
        vah_index: *included.last().unwrap_or(&poc_index),
        val_index: *included.first().unwrap_or(&poc_index),
        rows: included,
        volume: accumulated,
        target_volume: target,
    })
}

/// Recompute the profile over evenly spaced prefixes (at most `MAX_DEVELOPING_SAMPLES`).
/// The last sample always covers every bar.
fn developing_profile(bars: &[Bar], config: &FrvpConfig) -> Result<Vec<DevelopingPoint>> {
    let step = (bars.len() / MAX_DEVELOPING_SAMPLES).max(1);
    let mut prefix_lengths: Vec<usize> = (1..=MAX_DEVELOPING_SAMPLES)
        .map(|k| k * step)
        .take_while(|&len| len <= bars.len())
        .collect();
    if let Some(last) = prefix_lengths.last_mut() {
        *last = bars.len();
    }

    prefix_lengths
        .par_iter()
        .map(|&len| -> Result<DevelopingPoint> {
            let prefix = &bars[..len];
            let profile = compute_profile(prefix, config, false)?;
            Ok(DevelopingPoint {
                time: prefix[len - 1].time,
                poc: profile.poc.price_level,
                vah: profile.vah.price_level,
                val: profile.val.price_level,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_with_volumes(volumes: &[f64]) -> Vec<ProfileRow> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let mut row = ProfileRow::new(i, i as f64, i as f64 + 1.0);
                row.add_volume(v, true);
                row
            })
            .collect()
    }

    fn number_config(rows: f64) -> FrvpConfig {
        FrvpConfig {
            rows_layout: RowsLayout::Number,
            row_size: rows,
            ..FrvpConfig::default()
        }
    }

    #[test]
    fn test_two_bar_profile_splits_by_overlap() {
        let bars = vec![
            Bar::new(0, 10.0, 12.0, 9.0, 11.0, 100.0),
            Bar::new(60, 11.0, 11.0, 8.0, 9.0, 200.0),
        ];
        let profile = calculate_profile(&bars, &number_config(2.0)).unwrap();

        assert_eq!(profile.rows.len(), 2);
        let (row0, row1) = (profile.rows[0], profile.rows[1]);
        assert_eq!((row0.price_low, row0.price_high), (8.0, 10.0));
        assert_eq!((row1.price_low, row1.price_high), (10.0, 12.0));

        assert!((row0.up_volume - 100.0 / 3.0).abs() < 1e-9);
        assert!((row0.down_volume - 400.0 / 3.0).abs() < 1e-9);
        assert!((row1.up_volume - 200.0 / 3.0).abs() < 1e-9);
        assert!((row1.down_volume - 200.0 / 3.0).abs() < 1e-9);
        assert!((profile.total_volume - 300.0).abs() < 1e-9);
        assert_eq!(profile.poc.index, 0);
        assert_eq!((profile.profile_low, profile.profile_high), (8.0, 12.0));
    }

    #[test]
    fn test_row_count_layouts() {
        assert_eq!(row_count(10.0, RowsLayout::Number, 24.0), 24);
        assert_eq!(row_count(10.0, RowsLayout::Tick, 0.3), 34);
        assert_eq!(row_count(10.0, RowsLayout::Percentage, 25.0), 4);
        assert_eq!(row_count(10.0, RowsLayout::Percentage, 30.0), 4);
        assert_eq!(row_count(0.0, RowsLayout::Tick, 0.5), 1);
        assert_eq!(row_count(1.0, RowsLayout::Tick, 1e-9), MAX_ROWS);
        assert_eq!(row_count(1.0, RowsLayout::Number, 3000.0), MAX_ROWS);
        assert_eq!(row_count(7.3, RowsLayout::Percentage, 10.0), 10);
        assert_eq!(row_count(1.0, RowsLayout::Number, f64::NAN), 1);
    }

    #[test]
    fn test_rows_cover_range_exactly() {
        let rows = build_rows(100.0, 100.7, RowsLayout::Number, 7.0);
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].price_low, 100.0);
        assert_eq!(rows[6].price_high, 100.7);
        for pair in rows.windows(2) {
            assert!((pair[0].price_high - pair[1].price_low).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_range_bar_contributes_nothing() {
        let bars = vec![
            Bar::new(0, 10.0, 12.0, 10.0, 12.0, 50.0),
            Bar::new(60, 11.0, 11.0, 11.0, 11.0, 500.0),
        ];
        let profile = calculate_profile(&bars, &number_config(4.0)).unwrap();
        assert!((profile.total_volume - 50.0).abs() < 1e-9);
        assert_eq!(profile.input_volume, 550.0);
    }

    #[test]
    fn test_poc_tie_prefers_lowest_index() {
        let rows = rows_with_volumes(&[5.0, 9.0, 3.0, 9.0]);
        assert_eq!(find_poc(&rows).unwrap(), 1);
        assert!(matches!(find_poc(&[]), Err(IndicatorError::EmptyInput(_))));
    }

    #[test]
    fn test_value_area_picks_larger_neighbour() {
        // total 100, target 70: POC 40 at 2, then 25 above, then stop before 20 (would be 85)
        let rows = rows_with_volumes(&[5.0, 20.0, 40.0, 25.0, 10.0]);
        let va = calculate_value_area(&rows, 2, 70.0).unwrap();

        assert_eq!(va.rows, vec![2, 3]);
        assert_eq!((va.val_index, va.vah_index), (2, 3));
        assert_eq!(va.volume, 65.0);
        assert_eq!(va.target_volume, 70.0);
    }

    #[test]
    fn test_value_area_equal_volume_tie_goes_to_descending_cursor() {
        let rows = rows_with_volumes(&[10.0, 20.0, 40.0, 20.0, 10.0]);
        let va = calculate_value_area(&rows, 2, 80.0).unwrap();

        // 40 -> +20 (descending, tie at equal distance) -> +20 ascending = 80
        assert_eq!(va.rows, vec![1, 2, 3]);
        assert_eq!(va.volume, 80.0);
    }

    #[test]
    fn test_value_area_equal_volume_tie_prefers_closer_row() {
        // After taking row 1 (30), candidates are row 0 (10, distance 2) and row 3 (10, distance 1)
        let rows = rows_with_volumes(&[10.0, 30.0, 40.0, 10.0, 10.0]);
        let va = calculate_value_area(&rows, 2, 85.0).unwrap();

        assert_eq!(va.rows, vec![1, 2, 3]);
        assert_eq!(va.volume, 80.0);
    }

    #[test]
    fn test_value_area_never_overshoots() {
        let rows = rows_with_volumes(&[30.0, 50.0, 20.0]);
        let va = calculate_value_area(&rows, 1, 60.0).unwrap();

        // Either neighbour would push past 60
        assert_eq!(va.rows, vec![1]);
        assert!(va.volume <= va.target_volume);
    }

    #[test]
    fn test_value_area_zero_volume() {
        let rows = rows_with_volumes(&[0.0, 0.0, 0.0]);
        let va = calculate_value_area(&rows, 0, 70.0).unwrap();
        assert_eq!(va.rows, vec![0]);
        assert_eq!((va.val_index, va.vah_index), (0, 0));
    }

    #[test]
    fn test_value_area_percentage_is_clamped() {
        let rows = rows_with_volumes(&[5.0, 20.0, 40.0, 25.0, 10.0]);

        let over = calculate_value_area(&rows, 2, 250.0).unwrap();
        assert_eq!(over.target_volume, 100.0);
        assert_eq!(over.rows, vec![0, 1, 2, 3, 4]);

        let under = calculate_value_area(&rows, 2, -10.0).unwrap();
        assert_eq!(under.target_volume, 0.0);
        assert_eq!(under.rows, vec![2]);
    }

    #[test]
    fn test_value_area_rejects_missing_rows() {
        assert!(matches!(calculate_value_area(&[], 0, 70.0), Err(IndicatorError::EmptyInput(_))));

        let rows = rows_with_volumes(&[1.0, 2.0]);
        assert!(matches!(
            calculate_value_area(&rows, 2, 70.0),
            Err(IndicatorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_profile_clamps_config_built_in_code() {
        let bars: Vec<Bar> = (0..40)
            .map(|i| {
                let base = 50.0 + (i as f64 * 0.4).sin() * 3.0;
                Bar::new(i * 60, base, base + 0.8, base - 0.8, base + 0.2, 100.0 + i as f64)
            })
            .collect();

        let mut config = number_config(12.0);
        config.value_area_volume = 250.0;
        let profile = calculate_profile(&bars, &config).unwrap();
        assert!(profile.target_volume <= profile.total_volume + 1e-9);
        assert!(profile.value_area_volume <= profile.total_volume + 1e-9);

        config.value_area_volume = -10.0;
        let profile = calculate_profile(&bars, &config).unwrap();
        assert_eq!(profile.target_volume, 0.0);
        assert_eq!(profile.value_area_rows, vec![profile.poc.index]);

        let mut config = number_config(4000.0);
        config.value_area_volume = f64::NAN;
        let profile = calculate_profile(&bars, &config).unwrap();
        assert_eq!(profile.rows.len(), MAX_ROWS);
        assert!((profile.target_volume - profile.total_volume * 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let result = calculate_profile(&[], &FrvpConfig::default());
        assert!(matches!(result, Err(IndicatorError::EmptyInput(_))));
    }

    #[test]
    fn test_range_selection_filters_by_time() {
        let bars: Vec<Bar> = (0..10)
            .map(|i| Bar::new(i * 60, 10.0 + i as f64, 11.0 + i as f64, 9.0 + i as f64, 10.5 + i as f64, 10.0))
            .collect();
        let profile = calculate_profile_for_range(&bars, 120, 300, &number_config(4.0)).unwrap();

        assert_eq!((profile.start_time, profile.end_time), (120, 300));
        assert_eq!(profile.profile_low, 11.0);
        assert_eq!(profile.profile_high, 16.0);
        assert!(calculate_profile_for_range(&bars, 1000, 2000, &FrvpConfig::default()).is_err());
    }

    #[test]
    fn test_developing_samples_are_bounded_and_ordered() {
        let bars: Vec<Bar> = (0..237)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.2).sin() * 5.0;
                Bar::new(i * 60, base, base + 1.0, base - 1.0, base + 0.3, 10.0 + (i % 7) as f64)
            })
            .collect();
        let mut config = number_config(20.0);
        config.indicators.developing_poc = true;

        let profile = calculate_profile(&bars, &config).unwrap();
        let developing = profile.developing.expect("developing requested");

        // step = 237 / 50 = 4; the last sample is stretched to cover bar 236
        assert_eq!(developing.len(), 50);
        assert_eq!(developing[0].time, bars[3].time);
        assert_eq!(developing[48].time, bars[195].time);
        assert_eq!(developing[49].time, bars[236].time);
        assert_eq!(developing[49].poc, profile.poc.price_level);
        assert_eq!(developing[49].vah, profile.vah.price_level);
        assert_eq!(developing[49].val, profile.val.price_level);
        assert!(developing.windows(2).all(|w| w[0].time < w[1].time));
        assert!(developing.iter().all(|d| d.vah >= d.val));
    }

    #[test]
    fn test_developing_on_short_input_samples_every_bar() {
        let bars: Vec<Bar> = (0..5)
            .map(|i| Bar::new(i * 60, 10.0, 11.0 + i as f64, 9.0, 10.5, 5.0))
            .collect();
        let mut config = number_config(3.0);
        config.indicators.developing_va = true;

        let developing = calculate_profile(&bars, &config).unwrap().developing.unwrap();
        assert_eq!(developing.len(), 5);
        assert_eq!(developing[4].time, 240);
    }
}

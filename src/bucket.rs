// src/bucket.rs
use std::collections::BTreeMap;

use chrono::TimeZone;

use crate::normalize::Annualizer;
use crate::types::{HourBucket, Sample, Series, SeriesId, HOUR_MS};

#[inline]
fn hour_floor_ms(ms: i64) -> i64 {
    ms.div_euclid(HOUR_MS) * HOUR_MS
}

/// Groups a sub-hourly series by floor-to-hour. Buckets come out in time
/// order; hours without samples are simply missing, so callers must not
/// assume consecutive hours.
///
/// Hours are UTC hours, which coincide with display hours for any
/// whole-hour offset such as UTC+8.
pub fn bucketize(series: &Series) -> Vec<HourBucket> {
    let mut buckets: BTreeMap<i64, HourBucket> = BTreeMap::new();

    for s in &series.samples {
        let key = hour_floor_ms(s.ts.timestamp_millis());
        buckets
            .entry(key)
            .and_modify(|b| {
                // strict on the left, inclusive on the right: ties keep source order
                if s.ts < b.first_time {
                    b.first_time = s.ts;
                    b.first_value = s.value;
                }
                if s.ts >= b.last_time {
                    b.last_time = s.ts;
                    b.last_value = s.value;
                }
                b.count += 1;
            })
            .or_insert_with(|| HourBucket {
                hour_start: s.ts.timezone().timestamp_millis_opt(key).single().unwrap_or(s.ts),
                first_value: s.value,
                first_time: s.ts,
                last_value: s.value,
                last_time: s.ts,
                count: 1,
            });
    }

    buckets.into_values().collect()
}

/// One sample per bucket at `hour_start`, valued at the annualized end-of-hour rate.
pub fn hourly_series(id: SeriesId, buckets: &[HourBucket], annualizer: Annualizer) -> Series {
    let samples = buckets
        .iter()
        .map(|b| Sample::new(b.hour_start, b.last_value.map(|v| annualizer.annualize(v))))
        .collect();
    Series::new(id, samples)
}

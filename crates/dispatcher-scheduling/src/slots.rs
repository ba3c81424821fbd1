use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use dispatcher_core::config::SchedulingConfig;
use dispatcher_sessions::SlotOffer;

use crate::calendar::BusyInterval;

/// Derive bookable slots starting from `from`, honoring business hours local
/// to `config.timezone`, weekday-only scheduling, a buffer around existing
/// events, quarter-hour starts, and `config.max_offers`. Offers are 1-based.
///
/// Mirrors the "walk forward, skip past windows" shape of
/// `compute_next_run`'s Daily/Weekly handling, generalised from computing a
/// single next run to enumerating every open slot in a lookahead window.
pub fn derive_slots(
    config: &SchedulingConfig,
    busy: &[BusyInterval],
    from: DateTime<Utc>,
) -> Vec<SlotOffer> {
    let tz = resolve_timezone(config);
    let mut offers = Vec::new();
    let mut cursor = align_to_quarter_hour(from);
    let mut business_days_scanned = 0u32;

    let slot_len = Duration::minutes(config.slot_duration_minutes);
    let buffer = Duration::minutes(config.buffer_minutes);

    while business_days_scanned < config.lookahead_business_days && offers.len() < config.max_offers {
        if !is_weekday(cursor, tz) {
            cursor = next_business_day_start(config, cursor, tz);
            business_days_scanned += 1;
            continue;
        }

        let day_start = business_hour_start(config, cursor, tz);
        let day_end = business_hour_end(config, cursor, tz);

        if cursor < day_start {
            cursor = day_start;
        }
        if cursor >= day_end {
            cursor = next_business_day_start(config, cursor, tz);
            business_days_scanned += 1;
            continue;
        }

        let slot_end = cursor + slot_len;
        if slot_end > day_end {
            cursor = next_business_day_start(config, cursor, tz);
            business_days_scanned += 1;
            continue;
        }

        if overlaps_with_buffer(cursor, slot_end, busy, buffer) {
            cursor += Duration::minutes(15);
            continue;
        }

        offers.push(SlotOffer {
            offer_index: (offers.len() + 1) as u32,
            start: cursor.to_rfc3339(),
            end: slot_end.to_rfc3339(),
            display_timezone: tz.name().to_string(),
        });
        cursor += Duration::minutes(15);
    }

    offers
}

fn resolve_timezone(config: &SchedulingConfig) -> Tz {
    config.timezone.parse().unwrap_or(chrono_tz::UTC)
}

fn is_weekday(dt: DateTime<Utc>, tz: Tz) -> bool {
    !matches!(dt.with_timezone(&tz).weekday(), Weekday::Sat | Weekday::Sun)
}

fn business_hour_start(config: &SchedulingConfig, dt: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = dt.with_timezone(&tz);
    tz.with_ymd_and_hms(local.year(), local.month(), local.day(), config.business_hour_start as u32, 0, 0)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(dt)
}

fn business_hour_end(config: &SchedulingConfig, dt: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = dt.with_timezone(&tz);
    tz.with_ymd_and_hms(local.year(), local.month(), local.day(), config.business_hour_end as u32, 0, 0)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(dt)
}

fn next_business_day_start(config: &SchedulingConfig, dt: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let next_day = dt + Duration::days(1);
    business_hour_start(config, next_day, tz)
}

fn align_to_quarter_hour(dt: DateTime<Utc>) -> DateTime<Utc> {
    let minute = dt.minute();
    let rounded = ((minute / 15) + 1) * 15;
    let (extra_hours, new_minute) = (rounded / 60, rounded % 60);
    (dt + Duration::hours(extra_hours as i64))
        .with_minute(new_minute)
        .unwrap_or(dt)
        .with_second(0)
        .unwrap_or(dt)
        .with_nanosecond(0)
        .unwrap_or(dt)
}

fn overlaps_with_buffer(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    busy: &[BusyInterval],
    buffer: Duration,
) -> bool {
    busy.iter().any(|b| {
        let buffered_start = b.start - buffer;
        let buffered_end = b.end + buffer;
        start < buffered_end && end > buffered_start
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SchedulingConfig {
        SchedulingConfig {
            business_hour_start: 9,
            business_hour_end: 17,
            buffer_minutes: 15,
            slot_duration_minutes: 30,
            max_offers: 6,
            lookahead_business_days: 5,
            timezone: "America/New_York".to_string(),
        }
    }

    fn ny() -> Tz {
        "America/New_York".parse().unwrap()
    }

    /// Builds a UTC instant from a wall-clock time local to the organiser's
    /// timezone, so tests read in business hours rather than UTC offsets.
    fn local(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        ny().with_ymd_and_hms(y, m, d, h, mi, 0).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn derives_up_to_max_offers() {
        let from = local(2026, 8, 3, 9, 0); // Monday, 9am Eastern
        let offers = derive_slots(&config(), &[], from);
        assert_eq!(offers.len(), 6);
        assert_eq!(offers[0].offer_index, 1);
        assert_eq!(offers[5].offer_index, 6);
        assert_eq!(offers[0].display_timezone, "America/New_York");
    }

    #[test]
    fn skips_weekend() {
        // Friday 16:40 Eastern leaves one slot before close; next should jump to Monday.
        let from = local(2026, 8, 7, 16, 40); // Friday
        let offers = derive_slots(&config(), &[], from);
        assert!(!offers.is_empty());
        for o in &offers {
            let start: DateTime<Utc> = o.start.parse().unwrap();
            assert!(is_weekday(start, ny()));
        }
    }

    #[test]
    fn excludes_slots_overlapping_busy_with_buffer() {
        let from = local(2026, 8, 3, 9, 0);
        let busy = vec![BusyInterval {
            start: local(2026, 8, 3, 9, 30),
            end: local(2026, 8, 3, 10, 0),
        }];
        let offers = derive_slots(&config(), &busy, from);
        for o in &offers {
            let start: DateTime<Utc> = o.start.parse().unwrap();
            let end: DateTime<Utc> = o.end.parse().unwrap();
            // 15-min buffer around 09:30-10:00 Eastern means nothing between
            // 09:15-10:15 Eastern is valid.
            assert!(end <= local(2026, 8, 3, 9, 15) || start >= local(2026, 8, 3, 10, 15));
        }
    }
}

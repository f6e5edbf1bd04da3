//! History export as a flat CSV table

use chrono::{DateTime, Local};
use honestfast_api::FastRecord;
use honestfast_util::format_datetime_full;
use std::io::{self, Write};

/// Header row of the export
pub const EXPORT_HEADER: &str = "date,plan,start,end,duration_hours,completed";

/// Render the history, newest start first. Active fasts have an empty `end`
/// and their duration runs up to `now`.
pub fn export_history(records: &[FastRecord], now: DateTime<Local>) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_history(&mut out, records, now);
    String::from_utf8_lossy(&out).into_owned()
}

/// Write the export to `w`
pub fn write_history<W: Write>(
    w: &mut W,
    records: &[FastRecord],
    now: DateTime<Local>,
) -> io::Result<()> {
    let mut sorted: Vec<&FastRecord> = records.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.start_time()));

    writeln!(w, "{EXPORT_HEADER}")?;
    for record in sorted {
        let end = record
            .end_time()
            .map(|e| format_datetime_full(&e))
            .unwrap_or_default();
        writeln!(
            w,
            "{},{},{},{},{:.2},{}",
            record.start_time().format("%Y-%m-%d"),
            quote(record.plan_label()),
            format_datetime_full(&record.start_time()),
            end,
            record.duration_hours(now),
            record.completed()
        )?;
    }
    Ok(())
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_export_rows_newest_first() {
        let mut older = FastRecord::new(at(10, 20), 16.0, "16:8");
        older.finish(at(11, 12), true);
        let mut broken = FastRecord::new(at(11, 20), 18.0, "18:6");
        broken.finish(at(12, 6), false);
        let active = FastRecord::new(at(12, 20), 16.0, "16:8");

        let csv = export_history(&[older, active, broken], at(12, 23));
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines,
            vec![
                EXPORT_HEADER,
                "2025-06-12,16:8,2025-06-12 20:00:00,,3.00,false",
                "2025-06-11,18:6,2025-06-11 20:00:00,2025-06-12 06:00:00,10.00,false",
                "2025-06-10,16:8,2025-06-10 20:00:00,2025-06-11 12:00:00,16.00,true",
            ]
        );
    }

    #[test]
    fn test_empty_history_has_header_only() {
        assert_eq!(export_history(&[], at(1, 0)), format!("{EXPORT_HEADER}\n"));
    }

    #[test]
    fn test_plan_label_quoting() {
        assert_eq!(quote("Custom (14:10)"), "Custom (14:10)");
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}

use memc_loader_core::{AppsInstalled, parse_apps_installed};
use std::io::BufRead;
use tokio::sync::mpsc;

/// Reads `reader` line by line and feeds parsed records into `records`.
///
/// Runs on a blocking thread: decompression and `blocking_send` both block,
/// the latter whenever the record queue is full. Empty lines are skipped;
/// whitespace-only lines are not empty and go to the parser. Lines the
/// parser rejects never enter the queue and are counted instead; the count
/// is returned once the stream ends. Dropping `records` on return closes the
/// queue for the worker pool.
///
/// A read error mid-stream (e.g. a truncated gzip member) ends the stream
/// early: lines already read stay accounted for.
pub fn produce<R: BufRead>(reader: R, records: mpsc::Sender<AppsInstalled>) -> u64 {
    let mut rejected = 0;

    for line in reader.split(b'\n') {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Read failed, ending stream early: {e}");
                break;
            }
        };

        let line = String::from_utf8_lossy(&line);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.is_empty() {
            continue;
        }

        let Some(record) = parse_apps_installed(line) else {
            rejected += 1;
            continue;
        };

        if records.blocking_send(record).is_err() {
            tracing::error!("Record queue closed before the stream ended");
            break;
        }
    }

    rejected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn drain(rx: &mut mpsc::Receiver<AppsInstalled>) -> Vec<AppsInstalled> {
        let mut out = Vec::new();
        while let Ok(record) = rx.try_recv() {
            out.push(record);
        }
        out
    }

    #[test]
    fn counts_rejected_and_skips_empty_lines() {
        let input = "idfa\ta\t1\t2\t3\n\n\r\nbroken line\r\ngaid\tb\t1\t2\t4\r\nidfa\t\t1\t2\t3\n";
        let (tx, mut rx) = mpsc::channel(16);

        let rejected = produce(Cursor::new(input), tx);
        let records = drain(&mut rx);

        assert_eq!(rejected, 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].dev_id, "b");
        assert_eq!(records[1].apps, vec![4]);
    }

    #[test]
    fn whitespace_only_lines_are_rejected() {
        let (tx, mut rx) = mpsc::channel(4);

        let rejected = produce(Cursor::new("   \n\t\t\t\t\nidfa\ta\t1\t2\t3\n"), tx);

        assert_eq!(rejected, 2);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn last_line_without_newline_is_read() {
        let (tx, mut rx) = mpsc::channel(4);
        assert_eq!(produce(Cursor::new("dvid\tz\t0\t0\t1,2"), tx), 0);
        assert_eq!(drain(&mut rx)[0].apps, vec![1, 2]);
    }

    #[test]
    fn dropped_queue_stops_production() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert_eq!(produce(Cursor::new("idfa\ta\t1\t2\t3\nbad\n"), tx), 0);
    }
}

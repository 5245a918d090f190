//! Streaming metadata scan over a tar archive
//!
//! The archive walk runs on Tokio's blocking pool and hands records to the
//! consumer through a channel with room for a single record, so at most one
//! header is buffered ahead of the reader. Closing or dropping the
//! [`MetadataStream`] makes the walker's next send fail, which ends the walk
//! and releases the underlying reader.

use crate::error::{LayerError, LayerResult};
use crate::file::metadata::{clean_path, entry_name, Metadata, DIR_SEPARATOR};
use futures_util::Stream;
use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};
use tar::{Archive, EntryType};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

type ScanItem = LayerResult<Metadata>;

/// Lazy, single-pass sequence of [`Metadata`] records.
///
/// Yields `Ok` records in archive order. A structural read error ends the
/// sequence with exactly one `Err(LayerError::TarRead)`; a clean end of
/// archive simply ends it.
pub struct MetadataStream {
    rx: mpsc::Receiver<ScanItem>,
}

impl MetadataStream {
    /// Receive the next record, or `None` once the scan has ended
    pub async fn recv(&mut self) -> Option<ScanItem> {
        self.rx.recv().await
    }

    /// Stop the scan early. Records already handed over can still be received.
    pub fn cancel(&mut self) {
        self.rx.close();
    }

    /// Drain the whole sequence, failing on the terminal read error if any
    pub async fn collect_all(mut self) -> LayerResult<Vec<Metadata>> {
        let mut records = Vec::new();
        while let Some(item) = self.recv().await {
            records.push(item?);
        }
        Ok(records)
    }
}

impl Stream for MetadataStream {
    type Item = ScanItem;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Start scanning `reader` for file metadata.
///
/// Must be called from within a Tokio runtime.
pub fn scan<R>(reader: R) -> MetadataStream
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    tokio::task::spawn_blocking(move || walk(reader, tx));
    MetadataStream { rx }
}

fn walk<R: Read>(reader: R, tx: mpsc::Sender<ScanItem>) {
    let mut archive = Archive::new(reader);
    let entries = match archive.entries() {
        Ok(entries) => entries,
        Err(source) => {
            error!("failed to read tar archive: {}", source);
            let _ = tx.blocking_send(Err(LayerError::TarRead { source }));
            return;
        }
    };

    for entry in entries {
        if tx.is_closed() {
            debug!("metadata scan cancelled");
            return;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                error!("failed to read next tar header: {}", source);
                let _ = tx.blocking_send(Err(LayerError::TarRead { source }));
                return;
            }
        };

        // relative notations like "./" are never part of the recorded path
        let path = clean_path(&entry_name(&entry));
        if path == DIR_SEPARATOR {
            continue;
        }

        let entry_type = entry.header().entry_type();
        if matches!(entry_type, EntryType::XGlobalHeader | EntryType::XHeader) {
            warn!(
                path = %path,
                type_flag = %(entry_type.as_byte() as char),
                "skipping tar extension header"
            );
            continue;
        }

        let record = Metadata::from_entry(&entry, path).map_err(|source| {
            error!("failed to read tar header fields: {}", source);
            LayerError::TarRead { source }
        });
        let terminal = record.is_err();

        if tx.blocking_send(record).is_err() {
            debug!("metadata consumer went away, stopping scan");
            return;
        }
        if terminal {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::metadata::FileType;
    use crate::test_support::TarFixture;
    use futures_util::StreamExt;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn scan_cleans_entry_names() {
        let archive = TarFixture::new()
            .dir("./")
            .file("a", b"1")
            .file("./b", b"22")
            .file("c/../c", b"333")
            .build();

        let records = scan(Cursor::new(archive)).collect_all().await.unwrap();

        let paths: Vec<_> = records.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
        assert_eq!(records[1].tar_entry_name, "./b");
        assert_eq!(records[2].tar_entry_name, "c/../c");
        assert_eq!(records[2].size, 3);
        assert_eq!(records[0].mode, 0o644);
        assert_eq!(records[0].user_id, 1000);
        assert_eq!(records[0].group_id, 1001);
        assert_eq!(records[0].file_type, FileType::Regular);
        assert!(!records[0].is_dir);
    }

    #[tokio::test]
    async fn scan_skips_global_extended_headers_anywhere() {
        let archive = TarFixture::new()
            .global_header()
            .file("first", b"x")
            .global_header()
            .file("second", b"y")
            .build();

        let records = scan(Cursor::new(archive)).collect_all().await.unwrap();

        let paths: Vec<_> = records.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/first", "/second"]);
        assert!(records
            .iter()
            .all(|m| m.tar_entry_name != "pax_global_header"));
    }

    #[tokio::test]
    async fn scan_records_links_and_directories() {
        let archive = TarFixture::new()
            .dir("etc/")
            .symlink("etc/localtime", "/usr/share/zoneinfo/UTC")
            .build();

        let records = scan(Cursor::new(archive)).collect_all().await.unwrap();

        assert_eq!(records[0].path, "/etc");
        assert!(records[0].is_dir);
        assert_eq!(records[0].file_type, FileType::Directory);
        assert_eq!(records[1].file_type, FileType::Symlink);
        assert_eq!(records[1].link_target, "/usr/share/zoneinfo/UTC");
        assert!(records[0].link_target.is_empty());
    }

    #[tokio::test]
    async fn scan_surfaces_read_errors() {
        let mut archive = TarFixture::new().file("ok", b"fine").build();
        // replace the end-of-archive blocks with a corrupt header
        archive.truncate(1024);
        archive.extend(std::iter::repeat(b'A').take(512));

        let mut stream = scan(Cursor::new(archive));

        let first = stream.recv().await.unwrap().unwrap();
        assert_eq!(first.path, "/ok");
        let second = stream.recv().await.unwrap();
        assert!(matches!(second, Err(LayerError::TarRead { .. })));
        assert!(stream.recv().await.is_none());
    }

    fn unset_numeric_fields(name: &str, uid: Option<[u8; 8]>) -> Vec<u8> {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(5);
        if let Some(uid) = uid {
            header.as_old_mut().uid = uid;
        }
        let mut builder = tar::Builder::new(Vec::new());
        builder.append_data(&mut header, name, &b"hello"[..]).unwrap();
        builder.into_inner().unwrap()
    }

    #[tokio::test]
    async fn blank_numeric_fields_read_as_zero() {
        let records = scan(Cursor::new(unset_numeric_fields("etc/motd", None)))
            .collect_all()
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "/etc/motd");
        assert_eq!(records[0].size, 5);
        assert_eq!(records[0].mode, 0);
        assert_eq!(records[0].user_id, 0);
        assert_eq!(records[0].group_id, 0);
    }

    #[tokio::test]
    async fn space_padded_numeric_fields_read_as_zero() {
        let archive = unset_numeric_fields("etc/motd", Some(*b"       \0"));
        let records = scan(Cursor::new(archive)).collect_all().await.unwrap();
        assert_eq!(records[0].user_id, 0);
    }

    #[tokio::test]
    async fn garbled_numeric_field_is_a_read_error() {
        let archive = unset_numeric_fields("etc/motd", Some(*b"zz\0\0\0\0\0\0"));
        let result = scan(Cursor::new(archive)).collect_all().await;
        assert!(matches!(result, Err(LayerError::TarRead { .. })));
    }

    #[tokio::test]
    async fn collect_all_fails_on_read_error() {
        let mut archive = TarFixture::new().file("ok", b"fine").build();
        archive.truncate(1024);
        archive.extend(std::iter::repeat(b'A').take(512));

        let result = scan(Cursor::new(archive)).collect_all().await;
        assert!(matches!(result, Err(LayerError::TarRead { .. })));
    }

    #[tokio::test]
    async fn scan_works_as_stream() {
        let archive = TarFixture::new().file("one", b"1").file("two", b"2").build();

        let paths: Vec<String> = scan(Cursor::new(archive))
            .map(|item| item.unwrap().path)
            .collect()
            .await;
        assert_eq!(paths, vec!["/one", "/two"]);
    }

    struct DropFlag<R> {
        inner: R,
        dropped: Arc<AtomicBool>,
    }

    impl<R: Read> Read for DropFlag<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl<R> Drop for DropFlag<R> {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn many_files(count: usize) -> Vec<u8> {
        (0..count)
            .fold(TarFixture::new(), |fixture, i| {
                fixture.file(&format!("file-{}", i), b"data")
            })
            .build()
    }

    #[tokio::test]
    async fn abandoned_scan_releases_reader() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = DropFlag {
            inner: Cursor::new(many_files(500)),
            dropped: Arc::clone(&dropped),
        };

        let mut stream = scan(reader);
        assert!(stream.recv().await.unwrap().is_ok());
        drop(stream);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !dropped.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("scan worker should stop once the stream is dropped");
    }

    #[tokio::test]
    async fn cancel_ends_sequence() {
        let mut stream = scan(Cursor::new(many_files(50)));
        assert!(stream.recv().await.is_some());
        stream.cancel();

        let mut remaining = 0;
        while stream.recv().await.is_some() {
            remaining += 1;
        }
        assert!(remaining <= 1);
    }
}

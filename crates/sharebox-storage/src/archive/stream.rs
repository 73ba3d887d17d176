//! Streaming ZIP producer.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream;

use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ByteStream, StorageProvider};
use sharebox_core::types::range::ByteRange;

use super::encoder;
use super::entry::{ArchiveEntry, ArchivePlan};
use super::layout::archive_size;
use super::slice::RangeSlice;

/// Streams an [`ArchivePlan`] as a stored ZIP archive.
///
/// The total length is known before the first byte is produced, and the
/// stream holds at most one storage chunk in memory. Each file is opened
/// only when its turn comes.
#[derive(Debug, Clone)]
pub struct ArchiveStreamer {
    provider: Arc<dyn StorageProvider>,
    entries: Arc<[ArchiveEntry]>,
    total: u64,
}

impl ArchiveStreamer {
    /// Prepare a plan for streaming.
    ///
    /// Fails with `PayloadTooLarge` when the archive would need ZIP64.
    pub fn new(provider: Arc<dyn StorageProvider>, plan: ArchivePlan) -> AppResult<Self> {
        let entries: Arc<[ArchiveEntry]> = plan.into_entries().into();
        let total = archive_size(&entries)?;
        Ok(Self {
            provider,
            entries,
            total,
        })
    }

    /// Exact length of the archive in bytes.
    pub fn total_size(&self) -> u64 {
        self.total
    }

    /// Entries in stream order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Stream the whole archive.
    pub fn stream(&self) -> ByteStream {
        let producer = Producer {
            provider: Arc::clone(&self.provider),
            entries: Arc::clone(&self.entries),
            index: 0,
            offset: 0,
            crcs: Vec::with_capacity(self.entries.len()),
            offsets: Vec::with_capacity(self.entries.len()),
            phase: Phase::Local,
        };
        Box::pin(stream::try_unfold(producer, produce))
    }

    /// Stream only the bytes inside `range`.
    pub fn stream_range(&self, range: ByteRange) -> ByteStream {
        if range.is_full(self.total) {
            return self.stream();
        }
        Box::pin(RangeSlice::new(self.stream(), range))
    }
}

struct Producer {
    provider: Arc<dyn StorageProvider>,
    entries: Arc<[ArchiveEntry]>,
    index: usize,
    offset: u64,
    crcs: Vec<u32>,
    offsets: Vec<u64>,
    phase: Phase,
}

enum Phase {
    Local,
    FileData(FileData),
    Central { index: usize, start: u64, size: u64 },
    End { start: u64, size: u64 },
    Done,
}

struct FileData {
    reader: ByteStream,
    hasher: crc32fast::Hasher,
    written: u64,
    expected: u64,
    source: String,
}

async fn produce(mut p: Producer) -> io::Result<Option<(Bytes, Producer)>> {
    loop {
        match std::mem::replace(&mut p.phase, Phase::Done) {
            Phase::Local => {
                let entries = Arc::clone(&p.entries);
                let Some(entry) = entries.get(p.index) else {
                    p.phase = Phase::Central {
                        index: 0,
                        start: p.offset,
                        size: 0,
                    };
                    continue;
                };

                let header = encoder::local_header(entry);
                p.offsets.push(p.offset);
                p.offset += header.len() as u64;

                match entry {
                    ArchiveEntry::Directory { .. } => {
                        p.crcs.push(0);
                        p.index += 1;
                        p.phase = Phase::Local;
                    }
                    ArchiveEntry::File { size, source, .. } => {
                        let reader = p.provider.read(source, None).await.map_err(io::Error::other)?;
                        p.phase = Phase::FileData(FileData {
                            reader,
                            hasher: crc32fast::Hasher::new(),
                            written: 0,
                            expected: *size,
                            source: source.clone(),
                        });
                    }
                }
                return Ok(Some((header, p)));
            }
            Phase::FileData(mut data) => match data.reader.next().await {
                Some(Ok(chunk)) => {
                    if chunk.is_empty() {
                        p.phase = Phase::FileData(data);
                        continue;
                    }
                    data.written += chunk.len() as u64;
                    if data.written > data.expected {
                        return Err(size_changed(&data));
                    }
                    data.hasher.update(&chunk);
                    p.offset += chunk.len() as u64;
                    p.phase = Phase::FileData(data);
                    return Ok(Some((chunk, p)));
                }
                Some(Err(e)) => return Err(e),
                None => {
                    if data.written != data.expected {
                        return Err(size_changed(&data));
                    }
                    let crc = data.hasher.finalize();
                    p.crcs.push(crc);
                    let descriptor = encoder::data_descriptor(crc, data.expected);
                    p.offset += descriptor.len() as u64;
                    p.index += 1;
                    p.phase = Phase::Local;
                    return Ok(Some((descriptor, p)));
                }
            },
            Phase::Central { index, start, size } => {
                let entries = Arc::clone(&p.entries);
                let Some(entry) = entries.get(index) else {
                    p.phase = Phase::End { start, size };
                    continue;
                };
                let record = encoder::central_header(entry, p.crcs[index], p.offsets[index]);
                p.offset += record.len() as u64;
                p.phase = Phase::Central {
                    index: index + 1,
                    start,
                    size: size + record.len() as u64,
                };
                return Ok(Some((record, p)));
            }
            Phase::End { start, size } => {
                let record = encoder::end_of_central_directory(p.entries.len(), size, start);
                p.offset += record.len() as u64;
                return Ok(Some((record, p)));
            }
            Phase::Done => return Ok(None),
        }
    }
}

fn size_changed(data: &FileData) -> io::Error {
    io::Error::other(format!(
        "Stored file changed size while archiving: {} (expected {} bytes)",
        data.source, data.expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::entry::ArchivePlanBuilder;
    use crate::archive::encoder::{
        CENTRAL_DIRECTORY_SIG, DATA_DESCRIPTOR_SIG, END_OF_CENTRAL_DIRECTORY_SIG,
        LOCAL_FILE_HEADER_SIG,
    };
    use crate::providers::local::LocalStorageProvider;
    use chrono::Utc;
    use sharebox_core::traits::storage::WriteOptions;
    use tempfile::TempDir;

    async fn provider_with(files: &[(&str, &[u8])]) -> (TempDir, Arc<dyn StorageProvider>) {
        let dir = TempDir::new().unwrap();
        let provider = LocalStorageProvider::new(dir.path()).await.unwrap();
        for (key, content) in files {
            provider
                .write(key, Bytes::copy_from_slice(content), WriteOptions::default())
                .await
                .unwrap();
        }
        (dir, Arc::new(provider))
    }

    async fn streamer(files: &[(&str, &[u8])]) -> (TempDir, ArchiveStreamer) {
        let (dir, provider) = provider_with(files).await;
        let mut builder = ArchivePlanBuilder::new("root");
        for (key, content) in files {
            builder.add_file(key, content.len() as u64, Utc::now(), *key);
        }
        let streamer = ArchiveStreamer::new(provider, builder.build()).unwrap();
        (dir, streamer)
    }

    async fn collect(stream: ByteStream) -> Vec<u8> {
        let parts: Vec<_> = stream.collect().await;
        parts.into_iter().flat_map(|p| p.unwrap().to_vec()).collect()
    }

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    /// Walk the central directory and check every entry against its
    /// local header and content. Returns `(name, content)` pairs for files.
    fn parse(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
        let eocd = archive.len() - 22;
        assert_eq!(u32_at(archive, eocd), END_OF_CENTRAL_DIRECTORY_SIG);
        let count = u16_at(archive, eocd + 10) as usize;
        let cd_size = u32_at(archive, eocd + 12) as usize;
        let cd_offset = u32_at(archive, eocd + 16) as usize;
        assert_eq!(cd_offset + cd_size, eocd);

        let mut files = Vec::new();
        let mut at = cd_offset;
        for _ in 0..count {
            assert_eq!(u32_at(archive, at), CENTRAL_DIRECTORY_SIG);
            let crc = u32_at(archive, at + 16);
            let size = u32_at(archive, at + 24) as usize;
            let name_len = u16_at(archive, at + 28) as usize;
            let extra_len = u16_at(archive, at + 30) as usize;
            let local = u32_at(archive, at + 42) as usize;
            let name = String::from_utf8(archive[at + 46..at + 46 + name_len].to_vec()).unwrap();

            assert_eq!(u32_at(archive, local), LOCAL_FILE_HEADER_SIG);
            assert_eq!(&archive[local + 30..local + 30 + name_len], name.as_bytes());

            if !name.ends_with('/') {
                let data_at = local + 30 + name_len;
                let content = archive[data_at..data_at + size].to_vec();
                assert_eq!(crc32fast::hash(&content), crc);
                let descriptor = data_at + size;
                assert_eq!(u32_at(archive, descriptor), DATA_DESCRIPTOR_SIG);
                assert_eq!(u32_at(archive, descriptor + 4), crc);
                files.push((name, content));
            }
            at += 46 + name_len + extra_len;
        }
        assert_eq!(at, eocd);
        files
    }

    #[tokio::test]
    async fn test_size_matches_stream_and_content_round_trips() {
        let (_dir, streamer) = streamer(&[
            ("docs/readme.md", b"# hello\n"),
            ("docs/sub/deep.txt", b"deep content"),
            ("top.bin", &[0u8, 1, 2, 3, 255]),
            ("empty.txt", b""),
        ])
        .await;

        let bytes = collect(streamer.stream()).await;
        assert_eq!(bytes.len() as u64, streamer.total_size());

        let files = parse(&bytes);
        let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "root/docs/readme.md",
                "root/docs/sub/deep.txt",
                "root/empty.txt",
                "root/top.bin",
            ]
        );
        assert_eq!(files[1].1, b"deep content");
        assert_eq!(files[2].1, b"");
    }

    #[tokio::test]
    async fn test_many_entries_size_is_exact() {
        let owned: Vec<(String, Vec<u8>)> = (0..40)
            .map(|i| (format!("d{}/f{i}.txt", i % 7), vec![b'x'; i * 13]))
            .collect();
        let files: Vec<(&str, &[u8])> = owned
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        let (_dir, streamer) = streamer(&files).await;

        let bytes = collect(streamer.stream()).await;
        assert_eq!(bytes.len() as u64, streamer.total_size());
        assert_eq!(parse(&bytes).len(), 40);
    }

    #[tokio::test]
    async fn test_ranges_are_consistent_with_full_stream() {
        let (_dir, streamer) = streamer(&[("a.txt", b"alpha"), ("b/c.txt", b"charlie")]).await;
        let full = collect(streamer.stream()).await;
        let total = streamer.total_size();

        let whole = collect(streamer.stream_range(ByteRange::new(0, total - 1).unwrap())).await;
        assert_eq!(whole, full);

        let middle = collect(streamer.stream_range(ByteRange::new(40, 90).unwrap())).await;
        assert_eq!(middle, full[40..=90]);

        let mut rebuilt = Vec::new();
        for k in 0..total {
            let byte = collect(streamer.stream_range(ByteRange::new(k, k).unwrap())).await;
            assert_eq!(byte.len(), 1);
            rebuilt.extend(byte);
        }
        assert_eq!(rebuilt, full);
    }

    #[tokio::test]
    async fn test_file_changed_size_aborts_stream() {
        let (_dir, provider) = provider_with(&[("a.txt", b"short")]).await;
        let mut builder = ArchivePlanBuilder::new("root");
        builder.add_file("a.txt", 50, Utc::now(), "a.txt");
        let streamer = ArchiveStreamer::new(provider, builder.build()).unwrap();

        let parts: Vec<_> = streamer.stream().collect().await;
        assert!(parts.iter().any(|p| p.is_err()));
    }

    #[tokio::test]
    async fn test_missing_file_aborts_stream() {
        let (_dir, provider) = provider_with(&[]).await;
        let mut builder = ArchivePlanBuilder::new("root");
        builder.add_file("gone.txt", 3, Utc::now(), "gone.txt");
        let streamer = ArchiveStreamer::new(provider, builder.build()).unwrap();

        let parts: Vec<_> = streamer.stream().collect().await;
        assert!(parts.last().unwrap().is_err());
    }
}

//! ZIP record encoding.
//!
//! Entries are stored (no compression) with sizes and CRC trailing the
//! content in a data descriptor, so a file can be streamed before its
//! checksum is known. Every record has a fixed length given by
//! [`super::layout`].

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use super::entry::ArchiveEntry;
use super::layout::{
    CENTRAL_HEADER_LEN, DATA_DESCRIPTOR_LEN, END_OF_CENTRAL_DIRECTORY_LEN, LOCAL_HEADER_LEN,
    TIMESTAMP_EXTRA_LEN,
};

pub(crate) const LOCAL_FILE_HEADER_SIG: u32 = 0x0403_4b50;
pub(crate) const DATA_DESCRIPTOR_SIG: u32 = 0x0807_4b50;
pub(crate) const CENTRAL_DIRECTORY_SIG: u32 = 0x0201_4b50;
pub(crate) const END_OF_CENTRAL_DIRECTORY_SIG: u32 = 0x0605_4b50;

/// Unix host, format version 6.3.
const VERSION_MADE_BY: u16 = 0x033F;
const VERSION_NEEDED: u16 = 20;

const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
const FLAG_UTF8: u16 = 0x0800;
const METHOD_STORED: u16 = 0;

const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;
const EXTENDED_TIMESTAMP_MTIME: u8 = 0x01;

const FILE_MODE: u32 = 0o100664;
const DIRECTORY_MODE: u32 = 0o040775;
const MSDOS_DIRECTORY: u32 = 0x10;

fn flags(entry: &ArchiveEntry) -> u16 {
    if entry.is_directory() {
        FLAG_UTF8
    } else {
        FLAG_UTF8 | FLAG_DATA_DESCRIPTOR
    }
}

/// Local file header. CRC and sizes are zero; the data descriptor (files)
/// or the central directory (directories) carries the real values.
pub fn local_header(entry: &ArchiveEntry) -> Bytes {
    let name = entry.archive_path().as_bytes();
    let (time, date) = dos_datetime(entry.modified());

    let mut buf = BytesMut::with_capacity((LOCAL_HEADER_LEN as usize) + name.len());
    buf.put_u32_le(LOCAL_FILE_HEADER_SIG);
    buf.put_u16_le(VERSION_NEEDED);
    buf.put_u16_le(flags(entry));
    buf.put_u16_le(METHOD_STORED);
    buf.put_u16_le(time);
    buf.put_u16_le(date);
    buf.put_u32_le(0); // crc-32
    buf.put_u32_le(0); // compressed size
    buf.put_u32_le(0); // uncompressed size
    buf.put_u16_le(name.len() as u16);
    buf.put_u16_le(0); // extra field length
    buf.put_slice(name);
    buf.freeze()
}

/// Data descriptor written after a file's content.
pub fn data_descriptor(crc: u32, size: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(DATA_DESCRIPTOR_LEN as usize);
    buf.put_u32_le(DATA_DESCRIPTOR_SIG);
    buf.put_u32_le(crc);
    buf.put_u32_le(size as u32);
    buf.put_u32_le(size as u32);
    buf.freeze()
}

/// Central directory header for an entry whose local header starts at
/// `local_offset`.
pub fn central_header(entry: &ArchiveEntry, crc: u32, local_offset: u64) -> Bytes {
    let name = entry.archive_path().as_bytes();
    let (time, date) = dos_datetime(entry.modified());
    let size = entry.data_len() as u32;
    let external = if entry.is_directory() {
        (DIRECTORY_MODE << 16) | MSDOS_DIRECTORY
    } else {
        FILE_MODE << 16
    };

    let mut buf = BytesMut::with_capacity(
        (CENTRAL_HEADER_LEN + TIMESTAMP_EXTRA_LEN) as usize + name.len(),
    );
    buf.put_u32_le(CENTRAL_DIRECTORY_SIG);
    buf.put_u16_le(VERSION_MADE_BY);
    buf.put_u16_le(VERSION_NEEDED);
    buf.put_u16_le(flags(entry));
    buf.put_u16_le(METHOD_STORED);
    buf.put_u16_le(time);
    buf.put_u16_le(date);
    buf.put_u32_le(crc);
    buf.put_u32_le(size);
    buf.put_u32_le(size);
    buf.put_u16_le(name.len() as u16);
    buf.put_u16_le(TIMESTAMP_EXTRA_LEN as u16);
    buf.put_u16_le(0); // comment length
    buf.put_u16_le(0); // disk number start
    buf.put_u16_le(0); // internal attributes
    buf.put_u32_le(external);
    buf.put_u32_le(local_offset as u32);
    buf.put_slice(name);

    buf.put_u16_le(EXTENDED_TIMESTAMP_ID);
    buf.put_u16_le((TIMESTAMP_EXTRA_LEN - 4) as u16);
    buf.put_u8(EXTENDED_TIMESTAMP_MTIME);
    buf.put_u32_le(unix_seconds(entry.modified()));
    buf.freeze()
}

/// End of central directory record.
pub fn end_of_central_directory(entries: usize, central_size: u64, central_offset: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(END_OF_CENTRAL_DIRECTORY_LEN as usize);
    buf.put_u32_le(END_OF_CENTRAL_DIRECTORY_SIG);
    buf.put_u16_le(0); // this disk
    buf.put_u16_le(0); // disk with central directory
    buf.put_u16_le(entries as u16);
    buf.put_u16_le(entries as u16);
    buf.put_u32_le(central_size as u32);
    buf.put_u32_le(central_offset as u32);
    buf.put_u16_le(0); // comment length
    buf.freeze()
}

/// MS-DOS `(time, date)` for a UTC timestamp, clamped to 1980..=2107.
pub fn dos_datetime(time: DateTime<Utc>) -> (u16, u16) {
    let clamped = if time.year() < 1980 {
        Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0).single().unwrap_or(time)
    } else if time.year() > 2107 {
        Utc.with_ymd_and_hms(2107, 12, 31, 23, 59, 58)
            .single()
            .unwrap_or(time)
    } else {
        time
    };

    let dos_time = ((clamped.hour() as u16) << 11)
        | ((clamped.minute() as u16) << 5)
        | ((clamped.second() as u16) / 2);
    let dos_date = (((clamped.year() - 1980) as u16) << 9)
        | ((clamped.month() as u16) << 5)
        | (clamped.day() as u16);
    (dos_time, dos_date)
}

fn unix_seconds(time: DateTime<Utc>) -> u32 {
    time.timestamp().clamp(0, u32::MAX as i64) as u32
}

//! Track geometry from ISO base media files (`mp4`, `m4v`, `mov`).
//!
//! Walks `moov` → `trak` → `tkhd` and reads the 16.16 fixed-point width and
//! height stored in the last eight bytes of the track header. Audio tracks
//! have zero geometry, so the first track with both non-zero wins.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

// Version 0 track headers are 84 bytes and version 1 are 96; anything much
// bigger isn't a track header.
const MAX_TKHD_LEN: u64 = 256;

#[derive(Debug, Clone, Copy)]
struct BoxHeader {
    kind: [u8; 4],
    /// First byte after the box header.
    body: u64,
    /// One past the last byte of the box.
    end: u64,
}

/// Dimensions of the first visual track, if the file has one.
pub fn track_dimensions(path: &Path) -> io::Result<Option<(u32, u32)>> {
    let mut reader = BufReader::new(File::open(path)?);
    let length = reader.seek(SeekFrom::End(0))?;
    read_track_dimensions(&mut reader, length)
}

fn read_track_dimensions<R: Read + Seek>(reader: &mut R, length: u64) -> io::Result<Option<(u32, u32)>> {
    let Some(moov) = find_child(reader, 0, length, b"moov")? else {
        return Ok(None);
    };
    let mut position = moov.body;
    while let Some(child) = next_box(reader, position, moov.end)? {
        position = child.end;
        if &child.kind != b"trak" {
            continue;
        }
        let Some(tkhd) = find_child(reader, child.body, child.end, b"tkhd")? else {
            continue;
        };
        if let Some(dimensions) = read_tkhd_dimensions(reader, tkhd)? {
            return Ok(Some(dimensions));
        }
    }
    Ok(None)
}

fn read_tkhd_dimensions<R: Read + Seek>(reader: &mut R, tkhd: BoxHeader) -> io::Result<Option<(u32, u32)>> {
    let len = tkhd.end - tkhd.body;
    if !(8..=MAX_TKHD_LEN).contains(&len) {
        return Ok(None);
    }
    reader.seek(SeekFrom::Start(tkhd.end - 8))?;
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    let width = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) >> 16;
    let height = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) >> 16;
    Ok((width > 0 && height > 0).then_some((width, height)))
}

fn find_child<R: Read + Seek>(reader: &mut R, start: u64, end: u64, kind: &[u8; 4]) -> io::Result<Option<BoxHeader>> {
    let mut position = start;
    while let Some(header) = next_box(reader, position, end)? {
        if &header.kind == kind {
            return Ok(Some(header));
        }
        position = header.end;
    }
    Ok(None)
}

/// Read the box header at `position`, or `None` when there is no (valid) box
/// before `end`. Every box is at least eight bytes, so walking always advances.
fn next_box<R: Read + Seek>(reader: &mut R, position: u64, end: u64) -> io::Result<Option<BoxHeader>> {
    if end.saturating_sub(position) < 8 {
        return Ok(None);
    }
    reader.seek(SeekFrom::Start(position))?;
    let mut header = [0u8; 8];
    reader.read_exact(&mut header)?;
    let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let kind = [header[4], header[5], header[6], header[7]];

    let (body, size) = match size {
        // Extends to the end of the enclosing box.
        0 => (position + 8, end - position),
        // 64-bit size follows the type.
        1 => {
            if end - position < 16 {
                return Ok(None);
            }
            let mut large = [0u8; 8];
            reader.read_exact(&mut large)?;
            (position + 16, u64::from_be_bytes(large))
        },
        n => (position + 8, u64::from(n)),
    };
    match position.checked_add(size) {
        Some(box_end) if box_end >= body && box_end <= end => Ok(Some(BoxHeader { kind, body, end: box_end })),
        _ => Ok(None),
    }
}

//! Binary persistence of chord tables.
//!
//! Evaluating a table costs `O(pegs² · radius²)`, so tables are stored once and
//! reloaded on later runs. All integers are little endian:
//!
//! ```text
//! radius        i32
//! pegs          i32
//! for each canonical chord (a, b), a ascending then b ascending:
//!     length    i32
//!     length × (pixel: i16 or i32, delta: u8)
//! ```
//!
//! Pixel indexes are 16 bits wide when the canvas holds fewer than
//! `i16::MAX` pixels and 32 bits otherwise. The width is not stored, it follows
//! from the radius in the header.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use bincode::Options;
use num_traits::AsPrimitive;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::{
    chord::{self, ChordTable, Darkening},
    evaluator::Evaluator,
    layout::Layout,
    score::Score,
    verboser::{Message, Verboser},
    Float,
};

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

fn write_field<T: Serialize>(writer: &mut impl Write, value: T) -> Result<(), Error> {
    codec().serialize_into(writer, &value).map_err(Error::from)
}

fn read_field<T: DeserializeOwned>(reader: &mut impl Read) -> Result<T, Error> {
    codec().deserialize_from(reader).map_err(Error::from)
}

/// Writes `table` in the cache format.
pub fn encode(table: &ChordTable, writer: &mut impl Write) -> Result<(), Error> {
    let layout = table.layout();
    // Layout bounds keep every header, length and pixel field inside i32.
    write_field(writer, layout.radius() as i32)?;
    write_field(writer, layout.pegs() as i32)?;
    let wide = layout.wide_indices();
    for map in table.maps() {
        write_field(writer, map.len() as i32)?;
        for entry in map {
            if wide {
                write_field(writer, entry.pixel as i32)?;
            } else {
                write_field(writer, entry.pixel as i16)?;
            }
            write_field(writer, entry.delta)?;
        }
    }
    Ok(())
}

/// Reads a table, trusting the layout found in its header.
pub fn decode(reader: &mut impl Read) -> Result<ChordTable, Error> {
    let (radius, pegs) = read_header(reader)?;
    let layout = header_layout(radius, pegs)?;
    decode_body(reader, layout)
}

/// Reads a table that must have been built for `expected`.
pub fn decode_for(reader: &mut impl Read, expected: Layout) -> Result<ChordTable, Error> {
    let (radius, pegs) = read_header(reader)?;
    if i64::from(radius) != expected.radius() as i64 || i64::from(pegs) != expected.pegs() as i64
    {
        return Err(Error::HeaderMismatch {
            expected: (expected.radius(), expected.pegs()),
            found: (radius, pegs),
        });
    }
    decode_body(reader, expected)
}

pub fn write(table: &ChordTable) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    encode(table, &mut bytes)?;
    Ok(bytes)
}

pub fn read(mut bytes: &[u8]) -> Result<ChordTable, Error> {
    decode(&mut bytes)
}

fn read_header(reader: &mut impl Read) -> Result<(i32, i32), Error> {
    let radius = read_field(reader)?;
    let pegs = read_field(reader)?;
    Ok((radius, pegs))
}

fn header_layout(radius: i32, pegs: i32) -> Result<Layout, Error> {
    usize::try_from(radius)
        .ok()
        .zip(usize::try_from(pegs).ok())
        .and_then(|(r, p)| Layout::new(r, p).ok())
        .ok_or(Error::InvalidHeader(radius, pegs))
}

fn decode_body(reader: &mut impl Read, layout: Layout) -> Result<ChordTable, Error> {
    let pixels = layout.pixel_count();
    let wide = layout.wide_indices();
    let mut maps = Vec::with_capacity(layout.chord_count());
    let mut seen = vec![false; pixels];
    for (a, b) in chord::chords(layout.pegs()) {
        let length: i32 = read_field(reader)?;
        let length = usize::try_from(length)
            .ok()
            .filter(|&length| length <= pixels)
            .ok_or(Error::InvalidLength { a, b, length })?;
        let mut map = Vec::with_capacity(length);
        for _ in 0..length {
            let pixel = if wide {
                read_field::<i32>(reader)?
            } else {
                i32::from(read_field::<i16>(reader)?)
            };
            let delta: u8 = read_field(reader)?;
            match u32::try_from(pixel) {
                Ok(index) if (index as usize) < pixels => map.push(Darkening::new(index, delta)),
                _ => return Err(Error::PixelOutOfRange { a, b, pixel }),
            }
        }
        if let Some(pixel) = chord::first_repeated(&map, &mut seen) {
            return Err(Error::RepeatedPixel { a, b, pixel });
        }
        maps.push(map);
    }
    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(Error::TrailingBytes);
    }
    Ok(ChordTable::from_maps_unchecked(layout, maps))
}

/// File identity of a chord table: layout, score function key and the float
/// precision the table was evaluated with.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    layout: Layout,
    score: String,
    precision: &'static str,
}

impl CacheKey {
    pub fn new<T: Float>(layout: Layout, score: &impl Score<T>) -> Self {
        Self {
            layout,
            score: score.key(),
            precision: T::NAME,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.bin",
            self.layout.radius(),
            self.layout.pegs(),
            self.score,
            self.precision
        )
    }
}

/// Directory of cached chord tables.
#[derive(Clone, Debug)]
pub struct ChordCache {
    dir: PathBuf,
}

impl ChordCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// `Ok(None)` when nothing was stored under `key` yet.
    pub fn load(
        &self,
        key: &CacheKey,
        verboser: &impl Verboser,
    ) -> Result<Option<ChordTable>, Error> {
        let path = self.path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        verboser.verbose(Message::LoadingCache(&path));
        decode_for(&mut BufReader::new(file), key.layout).map(Some)
    }

    /// Stores `table` under `key`. The bytes land in a temporary sibling first
    /// and are renamed into place, so readers never see a partial file.
    pub fn store(
        &self,
        key: &CacheKey,
        table: &ChordTable,
        verboser: &impl Verboser,
    ) -> Result<(), Error> {
        if table.layout() != key.layout {
            return Err(Error::HeaderMismatch {
                expected: (key.layout.radius(), key.layout.pegs()),
                found: (table.layout().radius() as i32, table.layout().pegs() as i32),
            });
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let partial = path.with_extension("bin.partial");
        verboser.verbose(Message::StoringCache(&path));
        let written = File::create(&partial)
            .map_err(Error::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                encode(table, &mut writer)?;
                writer.flush().map_err(Error::from)
            });
        if let Err(err) = written {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
        fs::rename(&partial, &path)?;
        Ok(())
    }

    /// Loads the table for `(layout, score)`, evaluating and storing it when
    /// it is not cached yet. A corrupt or mismatched file is an error, it is
    /// never silently rebuilt.
    pub fn load_or_evaluate<T, S>(
        &self,
        layout: Layout,
        score: S,
        verboser: &impl Verboser,
    ) -> Result<ChordTable, Error>
    where
        T: Float,
        S: Score<T>,
        usize: AsPrimitive<T>,
    {
        let key = CacheKey::new(layout, &score);
        if let Some(table) = self.load(&key, verboser)? {
            log::debug!("Chord table [{}] found in cache", key.file_name());
            return Ok(table);
        }
        log::info!(
            "Chord table [{}] not cached, evaluating {} chords",
            key.file_name(),
            layout.chord_count()
        );
        let table = Evaluator::<S, T>::new(layout, score, verboser).evaluate(verboser);
        self.store(&key, &table, verboser)?;
        Ok(table)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Chord cache ended before the table was complete")]
    Truncated,
    #[error(
        "Chord cache was built for radius {} and {} pegs, expected radius {} and {} pegs",
        .found.0,
        .found.1,
        .expected.0,
        .expected.1
    )]
    HeaderMismatch {
        expected: (usize, usize),
        found: (i32, i32),
    },
    #[error("Chord cache header (radius {0}, pegs {1}) does not describe a valid layout")]
    InvalidHeader(i32, i32),
    #[error("Chord ({a}, {b}) declares an invalid length of {length}")]
    InvalidLength { a: usize, b: usize, length: i32 },
    #[error("Chord ({a}, {b}) references pixel {pixel} outside the canvas")]
    PixelOutOfRange { a: usize, b: usize, pixel: i32 },
    #[error("Chord ({a}, {b}) lists pixel {pixel} more than once")]
    RepeatedPixel { a: usize, b: usize, pixel: u32 },
    #[error("Chord cache holds bytes past the end of the table")]
    TrailingBytes,
    #[error(transparent)]
    Codec(bincode::Error),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                Error::Truncated
            }
            bincode::ErrorKind::Io(err) => Error::Io(err),
            other => Error::Codec(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{score::Step, verboser::Silent};

    fn small_table() -> ChordTable {
        let layout = Layout::new(2, 3).unwrap();
        ChordTable::from_maps(
            layout,
            vec![
                vec![Darkening::new(0, 10), Darkening::new(15, 255)],
                vec![],
                vec![Darkening::new(7, 1)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn narrow_layout_bytes() {
        let bytes = write(&small_table()).unwrap();
        let expected: Vec<u8> = [
            &2i32.to_le_bytes()[..],
            &3i32.to_le_bytes(),
            &2i32.to_le_bytes(),
            &0i16.to_le_bytes(),
            &[10],
            &15i16.to_le_bytes(),
            &[255],
            &0i32.to_le_bytes(),
            &1i32.to_le_bytes(),
            &7i16.to_le_bytes(),
            &[1],
        ]
        .concat();
        assert_eq!(bytes, expected);
        assert_eq!(read(&bytes).unwrap(), small_table());
    }

    #[test]
    fn wide_layout_round_trips() {
        let layout = Layout::new(100, 2).unwrap();
        let table =
            ChordTable::from_maps(layout, vec![vec![Darkening::new(39_999, 9), Darkening::new(3, 4)]])
                .unwrap();
        let bytes = write(&table).unwrap();
        assert_eq!(bytes.len(), 4 + 4 + 4 + 2 * (4 + 1));
        assert_eq!(read(&bytes).unwrap(), table);
    }

    #[test]
    fn truncated_stream_is_reported() {
        let bytes = write(&small_table()).unwrap();
        for cut in [0, 3, 8, 10, bytes.len() - 1] {
            assert!(
                matches!(read(&bytes[..cut]), Err(Error::Truncated)),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn trailing_bytes_are_reported() {
        let mut bytes = write(&small_table()).unwrap();
        bytes.push(0);
        assert!(matches!(read(&bytes), Err(Error::TrailingBytes)));
    }

    #[test]
    fn header_must_match_the_requested_layout() {
        let bytes = write(&small_table()).unwrap();
        let other = Layout::new(2, 4).unwrap();
        assert!(matches!(
            decode_for(&mut bytes.as_slice(), other),
            Err(Error::HeaderMismatch {
                expected: (2, 4),
                found: (2, 3)
            })
        ));
        let same = Layout::new(2, 3).unwrap();
        assert_eq!(decode_for(&mut bytes.as_slice(), same).unwrap(), small_table());
    }

    #[test]
    fn invalid_headers_are_rejected() {
        let bytes: Vec<u8> = [&0i32.to_le_bytes()[..], &3i32.to_le_bytes()].concat();
        assert!(matches!(read(&bytes), Err(Error::InvalidHeader(..))));
        let bytes: Vec<u8> = [&2i32.to_le_bytes()[..], &1i32.to_le_bytes()].concat();
        assert!(matches!(read(&bytes), Err(Error::InvalidHeader(..))));
    }

    #[test]
    fn out_of_range_pixels_are_rejected() {
        let mut bytes = write(&small_table()).unwrap();
        // First pixel of chord (0, 1) sits right after the 12 byte prefix.
        bytes[12..14].copy_from_slice(&16i16.to_le_bytes());
        assert!(matches!(
            read(&bytes),
            Err(Error::PixelOutOfRange { a: 0, b: 1, pixel: 16 })
        ));
        bytes[12..14].copy_from_slice(&(-1i16).to_le_bytes());
        assert!(matches!(
            read(&bytes),
            Err(Error::PixelOutOfRange { a: 0, b: 1, pixel: -1 })
        ));
    }

    #[test]
    fn repeated_pixels_are_rejected() {
        let mut bytes = write(&small_table()).unwrap();
        // Point the second entry of chord (0, 1) at the first one's pixel.
        bytes[15..17].copy_from_slice(&0i16.to_le_bytes());
        assert!(matches!(
            read(&bytes),
            Err(Error::RepeatedPixel { a: 0, b: 1, pixel: 0 })
        ));
    }

    #[test]
    fn precision_is_part_of_the_key() {
        let layout = Layout::new(40, 36).unwrap();
        let single = CacheKey::new(layout, &Step::<f32>::new(1.0, 25.0).unwrap());
        let double = CacheKey::new(layout, &Step::<f64>::new(1.0, 25.0).unwrap());
        assert_ne!(single, double);
        assert_eq!(single.file_name(), "40_36_step-1-25_f32.bin");
        assert_eq!(double.file_name(), "40_36_step-1-25_f64.bin");
    }

    #[test]
    fn negative_lengths_are_rejected() {
        let mut bytes = write(&small_table()).unwrap();
        bytes[8..12].copy_from_slice(&(-2i32).to_le_bytes());
        assert!(matches!(
            read(&bytes),
            Err(Error::InvalidLength { a: 0, b: 1, length: -2 })
        ));
    }

    #[test]
    fn file_name_encodes_the_configuration() {
        let layout = Layout::new(250, 300).unwrap();
        let key = CacheKey::new(layout, &Step::new(1.0, 25.0).unwrap());
        assert_eq!(key.file_name(), "250_300_step-1-25_f64.bin");
    }

    #[test]
    fn cache_directory_round_trip() {
        let dir = std::env::temp_dir().join(format!("string_weave_cache_{}", std::process::id()));
        let cache = ChordCache::new(&dir);
        let layout = Layout::new(6, 5).unwrap();
        let step = Step::new(1.0, 25.0).unwrap();
        let key = CacheKey::new(layout, &step);

        assert!(cache.load(&key, &Silent).unwrap().is_none());
        let built = cache.load_or_evaluate(layout, step, &Silent).unwrap();
        assert!(cache.path(&key).exists());
        let loaded = cache.load(&key, &Silent).unwrap().unwrap();
        assert_eq!(built, loaded);

        let other = CacheKey::new(Layout::new(6, 6).unwrap(), &step);
        assert!(matches!(
            cache.store(&other, &built, &Silent),
            Err(Error::HeaderMismatch { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crop buffering and dataset export.
//!
//! Crops accumulate in memory with a display name each. Flushing writes two
//! artifacts next to each other:
//!
//! - `<name>_<size>.npz` (deflated zip holding `data.npy`) or `<name>_<size>.npy`:
//!   a `uint8` array shaped `[N, size, size, 3]`
//! - `<name>_<size>_files.csv`: `ID,File` rows mapping the array index to the
//!   crop name

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;
use rustc_hash::FxHashMap;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::CropRenderer;

/// Entry name of the array inside an `.npz` archive.
pub const NPZ_ENTRY: &str = "data.npy";

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_ALIGN: usize = 64;

/// Files written by one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub array: PathBuf,
    pub index: PathBuf,
    pub count: usize,
}

/// In-memory crops awaiting export.
#[derive(Debug, Default)]
pub struct CropBuffer {
    images: Vec<RgbImage>,
    names: Vec<String>,
    first_index: FxHashMap<String, usize>,
}

impl CropBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a crop and returns its index.
    pub fn push(&mut self, name: String, image: RgbImage) -> usize {
        let index = self.images.len();
        self.first_index.entry(name.clone()).or_insert(index);
        self.names.push(name);
        self.images.push(image);
        index
    }

    /// Index of the first crop stored under `name`.
    pub fn file_id(&self, name: &str) -> Result<usize> {
        self.first_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotProcessed(name.to_string()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn images(&self) -> &[RgbImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.names.clear();
        self.first_index.clear();
    }

    /// Writes the buffered crops under `path` and empties the buffer.
    ///
    /// `path` is a base name; the image size and extensions are appended.
    pub fn flush(&mut self, path: &Path, image_size: u32, compressed: bool) -> Result<ExportedFiles> {
        if self.is_empty() {
            return Err(Error::EmptyExport);
        }
        if let Some(bad) = self
            .images
            .iter()
            .position(|img| img.dimensions() != (image_size, image_size))
        {
            return Err(Error::validation(format!(
                "crop {} is {:?}, expected {image_size}x{image_size}",
                self.names[bad],
                self.images[bad].dimensions()
            )));
        }

        let base = with_suffix(path, &format!("_{image_size}"));
        if let Some(parent) = base.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let array = with_suffix(&base, if compressed { ".npz" } else { ".npy" });
        let index = with_suffix(&base, "_files.csv");

        let header = npy_header(&[self.images.len(), image_size as usize, image_size as usize, 3]);
        let mut writer = BufWriter::new(File::create(&array)?);
        if compressed {
            let payload = (header.len() + self.images.iter().map(|i| i.as_raw().len()).sum::<usize>()) as u64;
            let mut zip = ZipWriter::new(writer);
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(payload > u64::from(u32::MAX));
            zip.start_file(NPZ_ENTRY, options)?;
            write_npy_body(&mut zip, &header, &self.images)?;
            zip.finish()?.flush()?;
        } else {
            write_npy_body(&mut writer, &header, &self.images)?;
            writer.flush()?;
        }

        let mut csv = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(&index)?;
        csv.write_record(["ID", "File"])?;
        for (i, name) in self.names.iter().enumerate() {
            csv.write_record([i.to_string().as_str(), name.as_str()])?;
        }
        csv.flush()?;

        let count = self.len();
        tracing::info!(count, path = %array.display(), "Exported crops");
        self.clear();
        Ok(ExportedFiles { array, index, count })
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Version 1.0 `.npy` header for a C-ordered `uint8` array.
pub fn npy_header(shape: &[usize]) -> Vec<u8> {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    let shape = if dims.len() == 1 {
        format!("({},)", dims[0])
    } else {
        format!("({})", dims.join(", "))
    };
    let mut dict = format!("{{'descr': '|u1', 'fortran_order': False, 'shape': {shape}, }}");
    // magic + version + u16 length + dict + newline
    let unpadded = NPY_MAGIC.len() + 2 + 2 + dict.len() + 1;
    let pad = (NPY_ALIGN - unpadded % NPY_ALIGN) % NPY_ALIGN;
    dict.extend(std::iter::repeat(' ').take(pad));
    dict.push('\n');

    let mut header = Vec::with_capacity(NPY_MAGIC.len() + 4 + dict.len());
    header.extend_from_slice(NPY_MAGIC);
    header.extend_from_slice(&[1, 0]);
    header.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    header.extend_from_slice(dict.as_bytes());
    header
}

fn write_npy_body<W: Write>(w: &mut W, header: &[u8], images: &[RgbImage]) -> std::io::Result<()> {
    w.write_all(header)?;
    for img in images {
        w.write_all(img.as_raw())?;
    }
    Ok(())
}

/// PNG copy of a crop, `<dir>/<name>.png`.
pub fn save_png(dir: &Path, name: &str, image: &RgbImage) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}.png"));
    image.save_with_format(&path, image::ImageFormat::Png)?;
    Ok(path)
}

/// Flushes a renderer's buffer in numbered parts.
///
/// A part is written every `part_size` crops and once the expected total is
/// reached, so the last part may be smaller. Parts are named
/// `<base>_part<k>` before the renderer appends its size suffix.
#[derive(Debug)]
pub struct PartitionedExport {
    base: PathBuf,
    part_size: usize,
    total: Option<usize>,
    compressed: bool,
    seen: usize,
    part: usize,
}

impl PartitionedExport {
    pub fn new(base: impl Into<PathBuf>, part_size: usize, total: Option<usize>, compressed: bool) -> Result<Self> {
        if part_size == 0 {
            return Err(Error::validation("part size must be positive"));
        }
        if total == Some(0) {
            return Err(Error::validation("expected total must be positive"));
        }
        Ok(Self {
            base: base.into(),
            part_size,
            total,
            compressed,
            seen: 0,
            part: 0,
        })
    }

    /// Crops recorded so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Parts written so far.
    pub fn parts(&self) -> usize {
        self.part
    }

    pub fn part_path(&self, part: usize) -> PathBuf {
        with_suffix(&self.base, &format!("_part{part}"))
    }

    /// Records one rendered crop, flushing when a part boundary is reached.
    pub fn record<R: CropRenderer + ?Sized>(&mut self, renderer: &mut R) -> Result<Option<ExportedFiles>> {
        self.seen += 1;
        let last = self.total.is_some_and(|total| self.seen >= total);
        if self.seen % self.part_size != 0 && !last {
            return Ok(None);
        }
        self.flush_part(renderer).map(Some)
    }

    /// Writes whatever is still buffered as a final part.
    pub fn finish<R: CropRenderer + ?Sized>(&mut self, renderer: &mut R) -> Result<Option<ExportedFiles>> {
        if renderer.buffered() == 0 {
            return Ok(None);
        }
        self.flush_part(renderer).map(Some)
    }

    fn flush_part<R: CropRenderer + ?Sized>(&mut self, renderer: &mut R) -> Result<ExportedFiles> {
        let path = self.part_path(self.part);
        let files = renderer.flush(&path, self.compressed)?;
        tracing::debug!(part = self.part, seen = self.seen, "Flushed export part");
        self.part += 1;
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn header_is_aligned() {
        let header = npy_header(&[3, 64, 64, 3]);
        assert_eq!(header.len() % NPY_ALIGN, 0);
        assert_eq!(&header[..6], NPY_MAGIC);
        assert_eq!(header[header.len() - 1], b'\n');
        let text = String::from_utf8_lossy(&header[10..]);
        assert!(text.contains("'shape': (3, 64, 64, 3)"));
        assert!(text.contains("'descr': '|u1'"));

        let single = npy_header(&[5]);
        assert!(String::from_utf8_lossy(&single).contains("(5,)"));
    }

    #[test]
    fn file_id_returns_first_match() {
        let mut buffer = CropBuffer::new();
        buffer.push("a".into(), RgbImage::new(2, 2));
        buffer.push("b".into(), RgbImage::new(2, 2));
        buffer.push("a".into(), RgbImage::new(2, 2));
        assert_eq!(buffer.file_id("a").unwrap(), 0);
        assert_eq!(buffer.file_id("b").unwrap(), 1);
        assert!(matches!(buffer.file_id("c"), Err(Error::NotProcessed(_))));
    }

    #[test]
    fn flush_writes_npy_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = CropBuffer::new();
        buffer.push("1-x-0.00-1.00-y-0.00-1.00".into(), RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        buffer.push("77".into(), RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])));

        let files = buffer.flush(&dir.path().join("out/mask"), 4, false).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(files.count, 2);
        assert_eq!(files.array, dir.path().join("out/mask_4.npy"));

        let bytes = fs::read(&files.array).unwrap();
        let header_len = npy_header(&[2, 4, 4, 3]).len();
        assert_eq!(bytes.len(), header_len + 2 * 4 * 4 * 3);
        assert_eq!(&bytes[header_len..header_len + 3], &[1, 2, 3]);
        assert_eq!(bytes[bytes.len() - 1], 9);

        let csv = fs::read_to_string(&files.index).unwrap();
        assert_eq!(csv, "ID,File\n0,1-x-0.00-1.00-y-0.00-1.00\n1,77\n");
    }

    #[test]
    fn index_quotes_names_with_separators() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = CropBuffer::new();
        buffer.push("wall,north".into(), RgbImage::new(2, 2));
        buffer.push("say \"hi\"".into(), RgbImage::new(2, 2));
        let files = buffer.flush(&dir.path().join("odd"), 2, false).unwrap();

        let csv = fs::read_to_string(&files.index).unwrap();
        assert_eq!(csv, "ID,File\n0,\"wall,north\"\n1,\"say \"\"hi\"\"\"\n");

        let mut reader = csv::Reader::from_path(&files.index).unwrap();
        let rows: Vec<(String, String)> = reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                (r[0].to_string(), r[1].to_string())
            })
            .collect();
        assert_eq!(rows[0], ("0".to_string(), "wall,north".to_string()));
        assert_eq!(rows[1], ("1".to_string(), "say \"hi\"".to_string()));
    }

    #[test]
    fn flush_writes_npz_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = CropBuffer::new();
        buffer.push("a".into(), RgbImage::new(8, 8));
        let files = buffer.flush(&dir.path().join("photo"), 8, true).unwrap();
        assert_eq!(files.array, dir.path().join("photo_8.npz"));

        let mut archive = zip::ZipArchive::new(File::open(&files.array).unwrap()).unwrap();
        let entry = archive.by_name(NPZ_ENTRY).unwrap();
        assert_eq!(entry.size() as usize, npy_header(&[1, 8, 8, 3]).len() + 8 * 8 * 3);
    }

    #[test]
    fn empty_or_mismatched_buffers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = CropBuffer::new();
        assert!(matches!(buffer.flush(dir.path(), 4, false), Err(Error::EmptyExport)));
        buffer.push("a".into(), RgbImage::new(3, 3));
        assert!(matches!(buffer.flush(&dir.path().join("x"), 4, false), Err(Error::Validation(_))));
    }

    #[test]
    fn png_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_png(dir.path(), "12", &RgbImage::new(4, 4)).unwrap();
        assert!(path.ends_with("12.png"));
        assert_eq!(image::open(&path).unwrap().width(), 4);
    }
}

use super::world_file::{WorldFile, WGS84_PRJ};
use crate::Result;

use image::RgbaImage;
use tiff::encoder::{colortype::RGBA8, TiffEncoder};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// RGBA raster encoded as an uncompressed TIFF
pub fn encode_tiff(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut tiff = TiffEncoder::new(&mut buffer)?;
        tiff.write_image::<RGBA8>(image.width(), image.height(), image.as_raw())?;
    }
    Ok(buffer.into_inner())
}

/// A finished export: `{base}.tif`, `{base}.tfw` and `{base}.prj` zipped together
#[derive(Clone, Debug)]
pub struct ExportArtifact {
    base_name: String,
    width: u32,
    height: u32,
    world_file: WorldFile,
    archive: Vec<u8>,
}

impl ExportArtifact {
    pub fn package(base_name: &str, image: &RgbaImage, world_file: WorldFile) -> Result<Self> {
        let tiff = encode_tiff(image)?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file(format!("{base_name}.tif"), options)?;
        zip.write_all(&tiff)?;
        zip.start_file(format!("{base_name}.tfw"), options)?;
        zip.write_all(world_file.to_string().as_bytes())?;
        zip.start_file(format!("{base_name}.prj"), options)?;
        zip.write_all(WGS84_PRJ.as_bytes())?;

        let archive = zip.finish()?.into_inner();
        log::info!(
            "Packed {base_name}.zip, {} bytes ({} bytes of tiff)",
            archive.len(),
            tiff.len()
        );

        Ok(ExportArtifact {
            base_name: base_name.to_string(),
            width: image.width(),
            height: image.height(),
            world_file,
            archive,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn file_name(&self) -> String {
        format!("{}.zip", self.base_name)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn world_file(&self) -> &WorldFile {
        &self.world_file
    }

    pub fn archive_bytes(&self) -> &[u8] {
        &self.archive
    }

    pub fn size_bytes(&self) -> u64 {
        self.archive.len() as u64
    }

    /// names of the files inside the archive, in order
    pub fn entry_names(&self) -> Result<Vec<String>> {
        let archive = ZipArchive::new(Cursor::new(self.archive.as_slice()))?;
        Ok(archive.file_names().map(str::to_string).collect())
    }

    /// Saves the archive as `{dir}/{base}.zip`, creating `dir` if needed
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, &self.archive)?;
        Ok(path)
    }
}

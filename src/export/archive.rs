//! Zip packaging of shapefile components.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::shp::ShapefileParts;
use super::ExportError;

/// Packs the components into a zip archive as `<base>.shp`, `.shx`, `.dbf`, `.prj`.
pub fn zip_shapefile(base_name: &str, parts: &ShapefileParts) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    add_file_to_zip(&mut zip, &format!("{base_name}.shp"), &parts.shp, options)?;
    add_file_to_zip(&mut zip, &format!("{base_name}.shx"), &parts.shx, options)?;
    add_file_to_zip(&mut zip, &format!("{base_name}.dbf"), &parts.dbf, options)?;
    add_file_to_zip(&mut zip, &format!("{base_name}.prj"), parts.prj.as_bytes(), options)?;

    Ok(zip.finish()?.into_inner())
}

/// Adds a file to a zip archive with zip-slip prevention.
fn add_file_to_zip(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    content: &[u8],
    options: SimpleFileOptions,
) -> Result<(), ExportError> {
    if name.starts_with("..") || name.contains('/') || name.contains('\\') {
        return Err(ExportError::InvalidEntryName(name.to_string()));
    }

    zip.start_file(name, options)?;
    zip.write_all(content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn parts() -> ShapefileParts {
        ShapefileParts {
            shp: vec![1, 2, 3],
            shx: vec![4, 5],
            dbf: vec![6],
            prj: "GEOGCS".to_string(),
        }
    }

    #[test]
    fn test_archive_entries() {
        let bytes = zip_shapefile("parcels", &parts()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert_eq!(names.len(), 4);
        for ext in ["shp", "shx", "dbf", "prj"] {
            assert!(names.contains(&format!("parcels.{ext}")));
        }

        let mut prj = String::new();
        archive.by_name("parcels.prj").unwrap().read_to_string(&mut prj).unwrap();
        assert_eq!(prj, "GEOGCS");
    }

    #[test]
    fn test_rejects_traversal_names() {
        let err = zip_shapefile("../evil", &parts()).unwrap_err();
        assert!(matches!(err, ExportError::InvalidEntryName(_)));
    }
}

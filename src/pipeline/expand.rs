//! Archive expansion: flatten ZIP uploads into standalone input files.
//!
//! Entries are sorted by their full archive path before directory components
//! are stripped, and the combined batch is sorted once more by filename after
//! every archive has been expanded. That final sort is load-bearing: it IS
//! the page order for the rest of the pipeline, so `a.png`, `b.png` inside a
//! ZIP interleave deterministically with loose uploads.
//!
//! A corrupt archive fails the whole batch. A truncated upload usually means
//! the rest of the payload cannot be trusted, and silently dropping half an
//! album is worse than asking the user to re-upload.

use crate::error::BookleafError;
use crate::pipeline::classify::{self, FileKind};
use crate::pipeline::InputFile;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Expand every archive in the batch and return the flat, name-sorted list.
///
/// Runs the CPU/memory-heavy unpacking on a blocking thread.
pub async fn expand_files(files: Vec<InputFile>) -> Result<Vec<InputFile>, BookleafError> {
    tokio::task::spawn_blocking(move || expand_files_blocking(files))
        .await
        .map_err(|e| BookleafError::Internal(format!("Join error: {e}")))?
}

/// Synchronous core of [`expand_files`].
pub fn expand_files_blocking(files: Vec<InputFile>) -> Result<Vec<InputFile>, BookleafError> {
    let mut expanded: Vec<InputFile> = Vec::with_capacity(files.len());
    for file in files {
        if file.kind() == FileKind::Archive {
            expand_archive(&file, &mut expanded)?;
        } else {
            expanded.push(file);
        }
    }
    // Page order for everything downstream.
    expanded.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(expanded)
}

fn expand_archive(file: &InputFile, out: &mut Vec<InputFile>) -> Result<(), BookleafError> {
    let corrupt = |detail: String| BookleafError::CorruptArchive {
        name: file.name.clone(),
        detail,
    };

    let mut archive =
        ZipArchive::new(Cursor::new(file.bytes.as_slice())).map_err(|e| corrupt(e.to_string()))?;

    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| corrupt(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let path = entry.name().to_string();
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| corrupt(format!("entry '{path}': {e}")))?;
        entries.push((path, bytes));
    }

    // Sort by full path first so same-directory runs stay together, then
    // strip to the base name.
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    debug!("Expanded archive '{}': {} entries", file.name, entries.len());

    for (path, bytes) in entries {
        // Some Windows archivers write entries with backslash separators.
        let base = match path.rsplit(['/', '\\']).next() {
            Some(base) if !base.is_empty() => base.to_string(),
            _ => {
                warn!("Skipping unnamed entry '{}' in archive '{}'", path, file.name);
                continue;
            }
        };
        let content_type = classify::guess_mime_from_name(&base).map(str::to_string);
        out.push(InputFile::new(base, content_type, bytes));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn zip_input(name: &str, entries: &[(&str, &[u8])]) -> InputFile {
        InputFile::new(name, Some("application/zip".into()), build_zip(entries))
    }

    #[test]
    fn entries_sort_then_strip_directories() {
        let archive = zip_input(
            "photos.zip",
            &[("b.png", b"B".as_slice()), ("a/c.jpg", b"C"), ("a.png", b"A")],
        );
        let expanded = expand_files_blocking(vec![archive]).unwrap();
        let names: Vec<&str> = expanded.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.jpg"]);
        assert_eq!(expanded[2].bytes, b"C");
    }

    #[test]
    fn expanded_entries_get_inferred_content_types() {
        let archive = zip_input("x.zip", &[("photo.JPG", b"j".as_slice()), ("weird.xyz", b"w")]);
        let expanded = expand_files_blocking(vec![archive]).unwrap();
        assert_eq!(expanded[0].content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(expanded[0].kind(), FileKind::Image);
        assert_eq!(expanded[1].content_type, None);
        assert_eq!(expanded[1].kind(), FileKind::Unsupported);
    }

    #[test]
    fn archive_entries_interleave_with_loose_files() {
        let archive = zip_input("x.zip", &[("z.jpg", b"z".as_slice()), ("b.png", b"b")]);
        let loose = InputFile::new("m.jpg", Some("image/jpeg".into()), b"m".to_vec());
        let expanded = expand_files_blocking(vec![archive, loose]).unwrap();
        let names: Vec<&str> = expanded.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.png", "m.jpg", "z.jpg"]);
    }

    #[test]
    fn directory_entries_are_skipped() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.add_directory("album/", options).unwrap();
        writer.start_file("album/p.png", options).unwrap();
        writer.write_all(b"P").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let expanded = expand_files_blocking(vec![InputFile::new(
            "d.zip",
            Some("application/zip".into()),
            bytes,
        )])
        .unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].name, "p.png");
    }

    #[test]
    fn backslash_separated_entries_strip_to_base_names() {
        let archive = zip_input(
            "win.zip",
            &[("album\\b.jpg", b"B".as_slice()), ("album\\sub\\a.jpg", b"A")],
        );
        let expanded = expand_files_blocking(vec![archive]).unwrap();
        let names: Vec<&str> = expanded.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
        assert_eq!(expanded[0].content_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn corrupt_archive_fails_the_batch() {
        let bad = InputFile::new("broken.zip", Some("application/zip".into()), b"nope".to_vec());
        let err = expand_files_blocking(vec![bad]).unwrap_err();
        match err {
            BookleafError::CorruptArchive { name, .. } => assert_eq!(name, "broken.zip"),
            other => panic!("expected CorruptArchive, got: {other}"),
        }
    }

    #[test]
    fn empty_archive_contributes_nothing() {
        let empty = zip_input("empty.zip", &[]);
        let loose = InputFile::new("a.jpg", Some("image/jpeg".into()), b"a".to_vec());
        let expanded = expand_files_blocking(vec![empty, loose]).unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].name, "a.jpg");
    }

    #[test]
    fn nested_archives_are_not_re_expanded() {
        let inner = build_zip(&[("deep.jpg", b"d".as_slice())]);
        let outer = zip_input("outer.zip", &[("inner.zip", inner.as_slice())]);
        let expanded = expand_files_blocking(vec![outer]).unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].name, "inner.zip");
        assert_eq!(expanded[0].kind(), FileKind::Archive);
    }

    #[test]
    fn non_archives_pass_through_unchanged() {
        let pdf = InputFile::new("deck.pdf", Some("application/pdf".into()), b"%PDF".to_vec());
        let expanded = expand_files_blocking(vec![pdf]).unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].name, "deck.pdf");
        assert_eq!(expanded[0].bytes, b"%PDF");
    }

    #[tokio::test]
    async fn async_wrapper_delegates() {
        let archive = zip_input("x.zip", &[("a.png", b"A".as_slice())]);
        let expanded = expand_files(vec![archive]).await.unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].name, "a.png");
    }
}

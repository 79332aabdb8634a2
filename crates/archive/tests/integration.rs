//! Integration tests for archive extraction

#[cfg(test)]
mod tests {
    use modinstall_archive::*;
    use modinstall_errors::{ArchiveError, Error};
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, Option<&[u8]>)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().unix_permissions(0o644);
        for (name, content) in entries {
            match content {
                Some(bytes) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(bytes).unwrap();
                }
                None => zip.add_directory(*name, options).unwrap(),
            }
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_extract_preserves_layout() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("module.zip");
        write_zip(
            &archive,
            &[
                ("widgets-main/", None),
                (
                    "widgets-main/Module.php",
                    Some(b"<?php\nnamespace humhub\\modules\\widgets;\n"),
                ),
                ("widgets-main/migrations/m0001_init.sql", Some(b"SELECT 1;")),
            ],
        );

        let dest = temp.path().join("run").join("extracted");
        let summary = ZipExtractor::new().extract(&archive, &dest).await.unwrap();

        assert_eq!(summary.files, 2);
        assert!(summary.directories >= 1);
        assert!(dest.join("widgets-main/Module.php").is_file());
        assert_eq!(
            std::fs::read_to_string(dest.join("widgets-main/migrations/m0001_init.sql")).unwrap(),
            "SELECT 1;"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_applies_unix_modes() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let archive = temp.path().join("module.zip");
        {
            let file = std::fs::File::create(&archive).unwrap();
            let mut zip = ZipWriter::new(file);
            zip.start_file(
                "widgets-main/bin/tool",
                SimpleFileOptions::default().unix_permissions(0o755),
            )
            .unwrap();
            zip.write_all(b"#!/bin/sh\n").unwrap();
            zip.finish().unwrap();
        }

        let dest = temp.path().join("extracted");
        ZipExtractor::new().extract(&archive, &dest).await.unwrap();

        let mode = std::fs::metadata(dest.join("widgets-main/bin/tool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_traversal_entry_rejects_whole_archive() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("module.zip");
        write_zip(
            &archive,
            &[
                ("widgets-main/Module.php", Some(b"<?php")),
                ("../evil.txt", Some(b"gotcha")),
            ],
        );

        let dest = temp.path().join("run").join("extracted");
        let err = ZipExtractor::new()
            .extract(&archive, &dest)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Archive(ArchiveError::UnsafeEntry { ref entry }) if entry == "../evil.txt"
        ));
        assert!(!temp.path().join("run").join("evil.txt").exists());
        assert!(!dest.join("widgets-main/Module.php").exists());
    }

    #[tokio::test]
    async fn test_not_a_zip() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("module.zip");
        std::fs::write(&archive, b"<html>404</html>").unwrap();

        let err = ZipExtractor::new()
            .extract(&archive, &temp.path().join("extracted"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::CorruptArchive { .. })
        ));
        assert_eq!(err.kind(), modinstall_errors::ErrorKind::Extract);
    }

    #[tokio::test]
    async fn test_missing_archive() {
        let temp = tempdir().unwrap();
        let err = ZipExtractor::new()
            .extract(&temp.path().join("nope.zip"), &temp.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Archive(ArchiveError::OpenFailed { .. })));
    }
}

//! Orchestrator behaviour against an in-memory engine: the storage/mode
//! matrix, ordering, delivery-channel agreement and error mapping.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{config_in, converter, fake_pdf, page_shade, Failure, FakeEngine, BASE_URL};
use pdf2image_server::{
    ConversionOptions, ErrorKind, ImageFormat, ImageMode, JpegOptions, StorageType,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

fn options(storage: StorageType, mode: ImageMode) -> ConversionOptions {
    ConversionOptions::builder()
        .storage_type(storage)
        .image_mode(mode)
        .build()
        .unwrap()
}

fn red_of_png(bytes: &[u8]) -> u8 {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .expect("valid png")
        .to_rgb8();
    img.get_pixel(0, 0)[0]
}

fn file_name_of(url: &str) -> &str {
    url.strip_prefix(BASE_URL)
        .and_then(|rest| rest.strip_prefix('/'))
        .expect("url under base")
}

// ── Storage / mode matrix ────────────────────────────────────────────────

#[tokio::test]
async fn base64_base64_returns_only_inline_images_in_page_order() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(4));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let result = conv
        .convert(&fake_pdf(), &options(StorageType::Base64, ImageMode::Base64), Some("doc"))
        .await
        .unwrap();

    assert_eq!(result.pages_count, 4);
    assert!(result.file_urls.is_none());
    let payloads = result.inline_payloads.expect("inline payloads");
    assert_eq!(payloads.len(), 4);

    let shades: Vec<u8> = payloads
        .iter()
        .map(|b64| red_of_png(&STANDARD.decode(b64).unwrap()))
        .collect();
    assert_eq!(shades, (1..=4).map(page_shade).collect::<Vec<_>>());

    // Nothing persisted.
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    assert!(result.stored_files.is_empty());
}

#[tokio::test]
async fn file_path_returns_urls_and_existing_paths() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(3));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let result = conv
        .convert(&fake_pdf(), &options(StorageType::File, ImageMode::Path), Some("doc"))
        .await
        .unwrap();

    let urls = result.file_urls.expect("file urls");
    let paths = result.inline_payloads.expect("paths");
    assert_eq!(urls.len(), 3);
    assert_eq!(paths.len(), 3);

    for (i, (url, path)) in urls.iter().zip(&paths).enumerate() {
        let name = file_name_of(url);
        assert!(name.starts_with(&format!("doc_page_{}_", i + 1)), "{name}");
        assert!(name.ends_with(".png"));

        let path = Path::new(path);
        assert!(path.exists(), "{}", path.display());
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), name);
        assert_eq!(red_of_png(&std::fs::read(path).unwrap()), page_shade(i as u32 + 1));
    }
}

#[tokio::test]
async fn file_base64_returns_urls_only() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(2));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let result = conv
        .convert(&fake_pdf(), &options(StorageType::File, ImageMode::Base64), None)
        .await
        .unwrap();

    assert!(result.inline_payloads.is_none());
    let urls = result.file_urls.unwrap();
    assert_eq!(urls.len(), 2);
    assert!(file_name_of(&urls[0]).starts_with("page_1_"));
    assert_eq!(result.stored_files.len(), 2);
    assert_eq!(result.stored_files[1].public_url, urls[1]);
}

#[tokio::test]
async fn both_base64_channels_carry_identical_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(3));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let result = conv
        .convert(&fake_pdf(), &options(StorageType::Both, ImageMode::Base64), Some("doc"))
        .await
        .unwrap();

    let payloads = result.inline_payloads.unwrap();
    let urls = result.file_urls.unwrap();
    assert_eq!(payloads.len(), 3);
    assert_eq!(urls.len(), 3);

    for (b64, stored) in payloads.iter().zip(&result.stored_files) {
        let inline = STANDARD.decode(b64).unwrap();
        let on_disk = std::fs::read(&stored.path).unwrap();
        assert_eq!(inline, on_disk);
    }
}

#[tokio::test]
async fn both_path_returns_paths_and_urls() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(2));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let result = conv
        .convert(&fake_pdf(), &options(StorageType::Both, ImageMode::Path), None)
        .await
        .unwrap();

    let paths = result.inline_payloads.unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| Path::new(p).is_file()));
    assert_eq!(result.file_urls.unwrap().len(), 2);
}

#[tokio::test]
async fn base64_storage_with_path_mode_is_rejected_before_rendering() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(2));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let err = conv
        .convert(&fake_pdf(), &options(StorageType::Base64, ImageMode::Path), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidParameters);
    assert_eq!(engine.render_calls(), 0);
}

#[tokio::test]
async fn unset_storage_and_mode_fall_back_to_config() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(1));
    let config = config_in(tmp.path())
        .default_storage_type(StorageType::Both)
        .default_image_mode(ImageMode::Path)
        .build()
        .unwrap();
    let conv = converter(&engine, config);

    let result = conv
        .convert(&fake_pdf(), &ConversionOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(result.storage_type, StorageType::Both);
    assert_eq!(result.image_mode, ImageMode::Path);
    assert!(result.file_urls.is_some());
}

// ── Engine invocation ────────────────────────────────────────────────────

#[tokio::test]
async fn engine_called_once_with_requested_range_and_strict_mode() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(5));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let opts = ConversionOptions::builder()
        .dpi(150)
        .grayscale(true)
        .thread_count(3)
        .pages(Some(2), Some(4))
        .storage_type(StorageType::Base64)
        .image_mode(ImageMode::Base64)
        .build()
        .unwrap();
    let result = conv.convert(&fake_pdf(), &opts, None).await.unwrap();

    assert_eq!(engine.render_calls(), 1);
    let request = engine.last_request().unwrap();
    assert!(request.strict);
    assert_eq!(request.dpi, 150);
    assert!(request.grayscale);
    assert_eq!(request.thread_count, 3);
    assert_eq!((request.first_page, request.last_page), (Some(2), Some(4)));
    assert_eq!(request.target_size, None);
    assert_eq!(request.jpeg_options, None);

    let shades: Vec<u8> = result
        .inline_payloads
        .unwrap()
        .iter()
        .map(|b64| red_of_png(&STANDARD.decode(b64).unwrap()))
        .collect();
    assert_eq!(shades, vec![page_shade(2), page_shade(3), page_shade(4)]);
}

#[tokio::test]
async fn range_past_the_end_yields_no_pages() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(3));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let opts = ConversionOptions::builder()
        .pages(Some(7), None)
        .storage_type(StorageType::Both)
        .image_mode(ImageMode::Base64)
        .build()
        .unwrap();
    let result = conv.convert(&fake_pdf(), &opts, None).await.unwrap();

    assert_eq!(result.pages_count, 0);
    assert_eq!(result.inline_payloads, Some(vec![]));
    assert_eq!(result.file_urls, Some(vec![]));
}

// ── Formats ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn ppm_is_delivered_as_png() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(1));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let opts = ConversionOptions::builder()
        .format(ImageFormat::Ppm)
        .storage_type(StorageType::Both)
        .image_mode(ImageMode::Base64)
        .build()
        .unwrap();
    let result = conv.convert(&fake_pdf(), &opts, None).await.unwrap();

    assert_eq!(result.format, ImageFormat::Ppm);
    assert!(result.file_urls.unwrap()[0].ends_with(".png"));
    let bytes = STANDARD.decode(&result.inline_payloads.unwrap()[0]).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn jpeg_output_is_jpeg_on_both_channels() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(2));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let opts = ConversionOptions::builder()
        .format(ImageFormat::Jpeg)
        .storage_type(StorageType::Both)
        .image_mode(ImageMode::Base64)
        .build()
        .unwrap();
    let result = conv.convert(&fake_pdf(), &opts, None).await.unwrap();

    for (b64, stored) in result.inline_payloads.unwrap().iter().zip(&result.stored_files) {
        let bytes = STANDARD.decode(b64).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8]));
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
        assert_eq!(stored.path.extension().unwrap(), "jpeg");
        assert_eq!(std::fs::read(&stored.path).unwrap(), bytes);
    }
}

#[tokio::test]
async fn jpeg_options_apply_to_both_channels() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(2));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let jpeg = JpegOptions {
        quality: Some(80),
        progressive: Some(true),
        optimize: Some(true),
    };
    let opts = ConversionOptions::builder()
        .format(ImageFormat::Jpeg)
        .jpeg_options(Some(jpeg))
        .storage_type(StorageType::Both)
        .image_mode(ImageMode::Base64)
        .build()
        .unwrap();
    let result = conv.convert(&fake_pdf(), &opts, None).await.unwrap();

    assert_eq!(engine.last_request().unwrap().jpeg_options, Some(jpeg));
    for (b64, stored) in result.inline_payloads.unwrap().iter().zip(&result.stored_files) {
        let inline = STANDARD.decode(b64).unwrap();
        assert_eq!(frame_marker(&inline), Some(0xC2), "inline is not progressive");
        let file = std::fs::read(&stored.path).unwrap();
        assert_eq!(frame_marker(&file), Some(0xC2), "file is not progressive");
    }
}

/// First start-of-frame marker of a JPEG (0xC0 baseline, 0xC2 progressive).
fn frame_marker(jpeg: &[u8]) -> Option<u8> {
    let mut i = 2;
    while i + 4 <= jpeg.len() && jpeg[i] == 0xFF {
        let marker = jpeg[i + 1];
        if (0xC0..=0xC3).contains(&marker) {
            return Some(marker);
        }
        i += 2 + u16::from_be_bytes([jpeg[i + 2], jpeg[i + 3]]) as usize;
    }
    None
}

// ── Filenames ────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_conversions_never_collide() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(2));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());
    let opts = options(StorageType::File, ImageMode::Base64);

    let mut names = HashSet::new();
    for _ in 0..25 {
        let result = conv.convert(&fake_pdf(), &opts, Some("same")).await.unwrap();
        for url in result.file_urls.unwrap() {
            assert!(names.insert(file_name_of(&url).to_string()), "collision: {url}");
        }
    }
    assert_eq!(names.len(), 50);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 50);
}

// ── Validation & errors ──────────────────────────────────────────────────

#[tokio::test]
async fn invalid_bytes_never_reach_the_engine() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::with_pages(1));
    let config = config_in(tmp.path()).max_file_size(64).build().unwrap();
    let conv = converter(&engine, config);
    let opts = options(StorageType::Base64, ImageMode::Base64);

    let err = conv.convert(b"", &opts, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyFile);

    let err = conv.convert(b"<html>not a pdf</html>", &opts, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPdfFormat);

    let mut big = fake_pdf();
    big.resize(65, b'0');
    let err = conv.convert(&big, &opts, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileTooLarge);

    assert_eq!(engine.render_calls(), 0);
}

#[tokio::test]
async fn engine_failures_map_to_domain_kinds() {
    let cases = [
        (Failure::NotInstalled, ErrorKind::PopplerNotInstalled),
        (Failure::PageCount, ErrorKind::PdfCorrupted),
        (Failure::Syntax, ErrorKind::PdfCorrupted),
        (Failure::Timeout, ErrorKind::ConversionFailed),
        (Failure::Other, ErrorKind::ConversionFailed),
    ];

    for (failure, expected) in cases {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::failing(failure));
        let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

        let err = conv
            .convert(&fake_pdf(), &ConversionOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), expected, "{failure:?}");
        if matches!(failure, Failure::Timeout) {
            assert!(err.message().contains("timed out"), "{}", err.message());
        }
        if matches!(failure, Failure::Other) {
            assert!(err.message().contains("status 99"), "{}", err.message());
        }
    }
}

#[tokio::test]
async fn unwritable_output_dir_is_conversion_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, b"a file, not a directory").unwrap();

    let engine = Arc::new(FakeEngine::with_pages(1));
    let conv = converter(&engine, config_in(&blocker.join("out")).build().unwrap());

    let err = conv
        .convert(&fake_pdf(), &options(StorageType::File, ImageMode::Base64), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
}

// ── Metadata ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn inspect_reports_present_fields_and_omits_missing_ones() {
    let engine = Arc::new(
        FakeEngine::with_pages(7).with_metadata(&[
            ("Title", "Quarterly Report"),
            ("Producer", "LibreOffice"),
            ("CreationDate", "2024-03-01T09:00:00Z"),
        ]),
    );
    let tmp = tempfile::tempdir().unwrap();
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());

    let meta = conv.inspect(&fake_pdf()).await.unwrap();
    assert_eq!(meta.page_count, Some(7));
    assert_eq!(meta.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(meta.creation_date.as_deref(), Some("2024-03-01T09:00:00Z"));
    assert_eq!(meta.author, None);
    assert_eq!(meta.modification_date, None);
}

#[tokio::test]
async fn inspect_validates_and_maps_errors() {
    let tmp = tempfile::tempdir().unwrap();

    let engine = Arc::new(FakeEngine::with_pages(1));
    let conv = converter(&engine, config_in(tmp.path()).build().unwrap());
    let err = conv.inspect(b"GIF89a").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPdfFormat);
    assert_eq!(engine.inspect_calls(), 0);

    for (failure, expected) in [
        (Failure::NotInstalled, ErrorKind::PopplerNotInstalled),
        (Failure::Syntax, ErrorKind::PdfCorrupted),
        (Failure::PageCount, ErrorKind::ConversionFailed),
    ] {
        let engine = Arc::new(FakeEngine::failing(failure));
        let conv = converter(&engine, config_in(tmp.path()).build().unwrap());
        let err = conv.inspect(&fake_pdf()).await.unwrap_err();
        assert_eq!(err.kind(), expected, "{failure:?}");
    }
}

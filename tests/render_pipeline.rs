//! End-to-end render service checks against a tiny generated document

mod util;

use std::time::{Duration, Instant};

use pdfsnip::pdf::{RasterParams, RenderService, ServiceEvent};
use pdfsnip::select::PdfRect;
use pdfsnip::svg::VectorOptions;
use regex::Regex;

use util::write_sample_pdf;

fn wait_for_event(service: &mut RenderService) -> ServiceEvent {
    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        if let Some(event) = service.drain_events().into_iter().next() {
            return event;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for render service"
        );
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn document_info_reports_page_count() {
    let doc = write_sample_pdf();
    let service = RenderService::open(doc.path().to_path_buf());
    let info = service.document_info().expect("document should open");
    assert_eq!(info.page_count, 1);
}

#[test]
fn raster_matches_fit_to_width_scale() {
    let doc = write_sample_pdf();
    let mut service = RenderService::open(doc.path().to_path_buf());

    // Page is 200x100pt; 800px viewport minus 2x16px padding -> 768px wide
    service.request_page(
        0,
        RasterParams {
            viewport_width_px: 800,
            zoom: 1.0,
        },
    );

    let ServiceEvent::Page { page, data } = wait_for_event(&mut service) else {
        panic!("expected a page event");
    };
    assert_eq!(page, 0);
    assert_eq!(data.width_px, 768);
    assert_eq!(data.height_px, 384);
    assert!((data.scale - 3.84).abs() < 0.01);
    assert_eq!(
        data.pixels.len(),
        (data.width_px * data.height_px * 3) as usize
    );
    assert_eq!(data.page_width_pt, 200.0);
    assert_eq!(data.page_height_pt, 100.0);

    // the red square from the content stream must be visible somewhere
    let has_red = data
        .pixels
        .chunks_exact(3)
        .any(|px| px[0] > 200 && px[1] < 50 && px[2] < 50);
    assert!(has_red, "rendered page lost its red rectangle");
}

#[test]
fn export_is_sized_to_the_selection() {
    let doc = write_sample_pdf();
    let mut service = RenderService::open(doc.path().to_path_buf());

    let clip = PdfRect {
        x0: 10.0,
        y0: 0.0,
        x1: 110.0,
        y1: 50.0,
    };
    service.request_export(0, clip, VectorOptions::default());

    let ServiceEvent::Svg(svg) = wait_for_event(&mut service) else {
        panic!("expected an svg event");
    };
    assert!(svg.contains("<svg"));
    assert!(svg.contains(r#"width="100pt""#));
    assert!(svg.contains(r#"height="50pt""#));
    assert!(svg.contains(r#"viewBox="10 0 100 50""#));
}

#[test]
fn export_preserves_text_and_merges_kerning() {
    let doc = write_sample_pdf();
    let mut service = RenderService::open(doc.path().to_path_buf());

    let clip = PdfRect {
        x0: 0.0,
        y0: 0.0,
        x1: 200.0,
        y1: 100.0,
    };

    service.request_export(0, clip, VectorOptions::default());
    let ServiceEvent::Svg(plain) = wait_for_event(&mut service) else {
        panic!("expected an svg event");
    };
    assert!(plain.contains(">Hi</text>"), "text layer missing: {plain}");

    let x_list = Regex::new(r#"<text x="([^"]+)""#).unwrap();
    let xs = x_list
        .captures(&plain)
        .expect("text run with x positions")[1]
        .split_whitespace()
        .count();
    assert_eq!(xs, 2, "one x position per glyph");

    service.request_export(
        0,
        clip,
        VectorOptions {
            merge_kerning: true,
            ..VectorOptions::default()
        },
    );
    let ServiceEvent::Svg(merged) = wait_for_event(&mut service) else {
        panic!("expected an svg event");
    };
    let xs = x_list
        .captures(&merged)
        .expect("text run with x positions")[1]
        .split_whitespace()
        .count();
    assert_eq!(xs, 1, "kerning merge collapses to one anchor");
    assert!(merged.contains(">Hi</text>"));
}

#[test]
fn export_without_text_layer_has_no_text_elements() {
    let doc = write_sample_pdf();
    let mut service = RenderService::open(doc.path().to_path_buf());

    let clip = PdfRect {
        x0: 0.0,
        y0: 0.0,
        x1: 200.0,
        y1: 100.0,
    };
    service.request_export(
        0,
        clip,
        VectorOptions {
            preserve_text: false,
            ..VectorOptions::default()
        },
    );

    let ServiceEvent::Svg(svg) = wait_for_event(&mut service) else {
        panic!("expected an svg event");
    };
    assert!(!svg.contains("<text"));
}

#[test]
fn grayscale_export_has_no_colored_channels() {
    let doc = write_sample_pdf();
    let mut service = RenderService::open(doc.path().to_path_buf());

    let clip = PdfRect {
        x0: 0.0,
        y0: 0.0,
        x1: 200.0,
        y1: 100.0,
    };
    service.request_export(
        0,
        clip,
        VectorOptions {
            grayscale: true,
            ..VectorOptions::default()
        },
    );

    let ServiceEvent::Svg(svg) = wait_for_event(&mut service) else {
        panic!("expected an svg event");
    };

    let hex = Regex::new(r"#([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})").unwrap();
    for caps in hex.captures_iter(&svg) {
        assert_eq!(caps[1].to_lowercase(), caps[2].to_lowercase(), "in {svg}");
        assert_eq!(caps[2].to_lowercase(), caps[3].to_lowercase(), "in {svg}");
    }
    let rgb = Regex::new(r"rgb\((\d+),(\d+),(\d+)\)").unwrap();
    for caps in rgb.captures_iter(&svg) {
        assert_eq!(caps[1], caps[2]);
        assert_eq!(caps[2], caps[3]);
    }
}

#[test]
fn degenerate_clip_fails_cleanly() {
    let doc = write_sample_pdf();
    let mut service = RenderService::open(doc.path().to_path_buf());

    let clip = PdfRect {
        x0: 50.0,
        y0: 50.0,
        x1: 50.0,
        y1: 80.0,
    };
    service.request_export(0, clip, VectorOptions::default());

    match wait_for_event(&mut service) {
        ServiceEvent::Failed(message) => {
            assert!(message.contains("zero size"), "unexpected message: {message}");
        }
        other => panic!("expected a failure event, got {other:?}"),
    }
}

#[test]
fn missing_document_surfaces_an_error() {
    let mut service = RenderService::open("/no/such/file.pdf".into());
    assert!(service.document_info().is_none());

    service.request_page(
        0,
        RasterParams {
            viewport_width_px: 800,
            zoom: 1.0,
        },
    );
    // workers fail to open the document and report it
    match wait_for_event(&mut service) {
        ServiceEvent::Failed(_) => {}
        other => panic!("expected a failure event, got {other:?}"),
    }
}

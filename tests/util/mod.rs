//! Shared test fixtures: a tiny single-page PDF generated in memory
//!
//! The page is 200x100pt with a white background, a red square and the
//! text "Hi" in Helvetica, which is enough surface for raster, text and
//! color assertions.

use std::io::Write;

use tempfile::NamedTempFile;

pub fn sample_pdf_bytes() -> Vec<u8> {
    let content = concat!(
        "1 1 1 rg\n",
        "0 0 200 100 re f\n",
        "1 0 0 rg\n",
        "10 40 50 30 re f\n",
        "BT\n/F1 12 Tf\n1 0 0 1 80 50 Tm\n0 0 0 rg\n(Hi) Tj\nET\n"
    );

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );

    out
}

/// Write the sample document to a temp file kept alive by the caller.
pub fn write_sample_pdf() -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .expect("create temp pdf");
    file.write_all(&sample_pdf_bytes()).expect("write temp pdf");
    file.flush().expect("flush temp pdf");
    file
}

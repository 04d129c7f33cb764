//! In-memory PDF fixtures with exact offsets.
//!
//! Objects are appended one by one; each xref section (classic table or xref
//! stream) covers whichever object numbers it is given, so incremental
//! updates are just more objects plus another section with `/Prev`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;

pub struct PdfBuilder {
    buf: Vec<u8>,
    /// Latest offset and generation written for each object number
    offsets: BTreeMap<u32, (u64, u16)>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::with_header(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n")
    }

    pub fn with_header(header: &[u8]) -> Self {
        Self {
            buf: header.to_vec(),
            offsets: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn offset_of(&self, num: u32) -> u64 {
        self.offsets[&num].0
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn object(&mut self, num: u32, body: &str) -> &mut Self {
        self.object_gen(num, 0, body)
    }

    pub fn object_gen(&mut self, num: u32, gen_num: u16, body: &str) -> &mut Self {
        self.offsets.insert(num, (self.len(), gen_num));
        write!(self.buf, "{num} {gen_num} obj\n{body}\nendobj\n").unwrap();
        self
    }

    /// Stream object with a correct `/Length`; `extra` is spliced into the
    /// dictionary.
    pub fn stream(&mut self, num: u32, extra: &str, data: &[u8]) -> &mut Self {
        self.offsets.insert(num, (self.len(), 0));
        write!(
            self.buf,
            "{num} 0 obj\n<< /Length {} {extra} >>\nstream\n",
            data.len()
        )
        .unwrap();
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Classic table over `nums`, one subsection per contiguous run. Number 0
    /// writes the free-list head. Returns the table's offset.
    pub fn classic_xref(&mut self, nums: &[u32], trailer: &str) -> u64 {
        let at = self.len();
        self.buf.extend_from_slice(b"xref\n");
        let mut sorted = nums.to_vec();
        sorted.sort_unstable();
        for run in runs(&sorted) {
            writeln!(self.buf, "{} {}", run[0], run.len()).unwrap();
            for num in run {
                if num == 0 {
                    self.buf.extend_from_slice(b"0000000000 65535 f\r\n");
                    continue;
                }
                let (offset, gen_num) = self.offsets[&num];
                write!(self.buf, "{offset:010} {gen_num:05} n\r\n").unwrap();
            }
        }
        write!(self.buf, "trailer\n{trailer}\n").unwrap();
        at
    }

    /// Uncompressed xref stream object `num` with `/W [1 4 2]`. Each row is
    /// `(obj_num, type, field2, field3)`; a row for `num` itself is added.
    pub fn xref_stream(&mut self, num: u32, rows: &[(u32, u8, u64, u16)], extra: &str) -> u64 {
        let at = self.len();
        let mut rows = rows.to_vec();
        rows.push((num, 1, at, 0));
        rows.sort_by_key(|r| r.0);

        let mut data = Vec::new();
        let mut index = Vec::new();
        for run in runs(&rows.iter().map(|r| r.0).collect::<Vec<_>>()) {
            index.push(format!("{} {}", run[0], run.len()));
        }
        for (_, ty, f2, f3) in &rows {
            data.push(*ty);
            data.extend_from_slice(&(*f2 as u32).to_be_bytes());
            data.extend_from_slice(&f3.to_be_bytes());
        }
        let size = rows.last().map_or(1, |r| r.0 + 1);
        self.stream(
            num,
            &format!(
                "/Type /XRef /W [1 4 2] /Index [{}] /Size {size} {extra}",
                index.join(" ")
            ),
            &data,
        );
        at
    }

    /// Row describing an object already written, for `xref_stream`.
    pub fn direct_row(&self, num: u32) -> (u32, u8, u64, u16) {
        let (offset, gen_num) = self.offsets[&num];
        (num, 1, offset, gen_num)
    }

    pub fn startxref(&mut self, offset: u64) -> &mut Self {
        write!(self.buf, "startxref\n{offset}\n%%EOF\n").unwrap();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

/// Contiguous runs of sorted numbers.
fn runs(nums: &[u32]) -> Vec<Vec<u32>> {
    let mut out: Vec<Vec<u32>> = Vec::new();
    for &n in nums {
        match out.last_mut() {
            Some(run) if run.last().is_some_and(|&l| l + 1 == n) => run.push(n),
            _ => out.push(vec![n]),
        }
    }
    out
}

/// Catalog 1, page tree 2, one page 3 with a content stream 4.
pub fn simple_pdf() -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 100 200] >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
        .stream(4, "", b"BT /F1 12 Tf (Hello) Tj ET");
    let xref = pdf.classic_xref(&[0, 1, 2, 3, 4], "<< /Size 5 /Root 1 0 R >>");
    pdf.startxref(xref);
    pdf.build()
}

/// Two revisions: the update redefines page 3
/// with a new MediaBox and adds object 6 as its second content stream.
pub fn incremental_pdf() -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 100 200] >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
        .stream(4, "", b"q Q")
        .object(5, "<< /Title (first) >>");
    let first = pdf.classic_xref(&[0, 1, 2, 3, 4, 5], "<< /Size 6 /Root 1 0 R /Info 5 0 R >>");
    pdf.startxref(first);

    pdf.object(
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 400] /Contents [4 0 R 6 0 R] >>",
    )
    .stream(6, "", b"BT ET")
    .object(7, "<< /Title (second) >>");
    let second = pdf.classic_xref(
        &[3, 6, 7],
        &format!("<< /Size 8 /Root 1 0 R /Info 7 0 R /Prev {first} >>"),
    );
    pdf.startxref(second);
    pdf.build()
}

/// Catalog and pages compressed into object stream 5, located through an
/// xref stream.
pub fn object_stream_pdf() -> Vec<u8> {
    let members = [
        (1u32, "<< /Type /Catalog /Pages 2 0 R >>"),
        (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
        (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 50 60] /Rotate -90 >>"),
    ];
    let mut header = String::new();
    let mut body = String::new();
    for (num, text) in members {
        header.push_str(&format!("{num} {} ", body.len()));
        body.push_str(text);
        body.push('\n');
    }
    let payload = format!("{header}{body}");

    let mut pdf = PdfBuilder::new();
    pdf.stream(
        5,
        &format!("/Type /ObjStm /N 3 /First {}", header.len()),
        payload.as_bytes(),
    );
    let rows = [
        (1, 2, 5, 0),
        (2, 2, 5, 1),
        (3, 2, 5, 2),
        pdf.direct_row(5),
    ];
    let xref = pdf.xref_stream(6, &rows, "/Root 1 0 R");
    pdf.startxref(xref);
    pdf.build()
}

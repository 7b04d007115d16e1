//! # PDF Serializer
//!
//! Takes the composed pages and writes a PDF 1.7 file. The writer is
//! from scratch: a sheet only needs rectangles, lines, single text lines and
//! at most one image, and that subset of PDF is small enough to emit by hand.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog
//! 2 0 obj ... endobj  <- page tree
//! ...                 <- fonts, images, content streams, pages, info
//! xref                <- byte offset of every object
//! trailer             <- points to the catalog and the info dictionary
//! %%EOF
//! ```
//!
//! Standard fonts are referenced by name with WinAnsiEncoding. An embedded
//! TrueType font is written as a Type0 font with Identity-H encoding, so the
//! two-byte codes in the content stream are the glyph ids that shaping
//! produced. A ToUnicode CMap maps them back to text for copy and search.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::SheetError;
use crate::font::{CustomFont, FontContext, FontData, FontKey};
use crate::image_loader::{ImagePixels, LoadedImage};
use crate::layout::{DrawCommand, LayoutElement, LayoutPage, Stroke, TextLine};
use crate::model::Metadata;
use crate::style::Color;

const PRODUCER: &str = concat!("ledger-sheet ", env!("CARGO_PKG_VERSION"));
const COMPRESSION_LEVEL: u8 = 6;

#[derive(Debug, Default)]
pub struct PdfWriter;

/// Objects allocated so far. Index 0 is the unused free-list head.
struct PdfBuilder {
    objects: Vec<Vec<u8>>,
    /// One entry per `/F<n>` resource.
    fonts: Vec<FontResource>,
    /// Which resource each font key draws with.
    font_for_key: HashMap<FontKey, usize>,
}

struct FontResource {
    obj_id: usize,
    /// Per-glyph advance in 1/1000 em for embedded fonts. `None` for
    /// standard fonts, whose widths the viewer already knows.
    widths: Option<BTreeMap<u16, i64>>,
}

/// Glyphs a font is used with, and the text each one stands for.
#[derive(Default)]
struct FontUsage {
    keys: Vec<FontKey>,
    glyphs: BTreeMap<u16, String>,
}

impl PdfBuilder {
    fn alloc(&mut self) -> usize {
        self.objects.push(Vec::new());
        self.objects.len() - 1
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(data);
        self.objects.len() - 1
    }

    /// Append a Flate-compressed stream object with extra dictionary entries.
    fn push_stream(&mut self, dict_entries: &str, raw: &[u8]) -> usize {
        let compressed = compress_to_vec_zlib(raw, COMPRESSION_LEVEL);
        let mut data = Vec::with_capacity(compressed.len() + 64);
        let _ = write!(
            data,
            "<< /Length {} /Filter /FlateDecode{} >>\nstream\n",
            compressed.len(),
            dict_entries
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write composed pages to a PDF byte vector.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        metadata: &Metadata,
        fonts: &FontContext,
    ) -> Result<Vec<u8>, SheetError> {
        let mut builder = PdfBuilder {
            // 0 = free-list head, 1 = catalog, 2 = page tree
            objects: vec![Vec::new(), Vec::new(), Vec::new()],
            fonts: Vec::new(),
            font_for_key: HashMap::new(),
        };

        self.register_fonts(&mut builder, pages, fonts)?;
        let font_dict = builder
            .fonts
            .iter()
            .enumerate()
            .map(|(i, f)| format!("/F{} {} 0 R", i, f.obj_id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_ids = Vec::with_capacity(pages.len());
        for page in pages {
            let images: Vec<usize> = page
                .elements
                .iter()
                .filter_map(|e| match &e.draw {
                    DrawCommand::Image { image } => Some(Self::write_image_xobject(&mut builder, image)),
                    _ => None,
                })
                .collect();

            let content = self.build_content_stream(page, &builder);
            let content_id = builder.push_stream("", content.as_bytes());

            let mut resources = format!("/Font << {} >>", font_dict);
            if !images.is_empty() {
                let xobjects = images
                    .iter()
                    .enumerate()
                    .map(|(i, id)| format!("/Im{} {} 0 R", i, id))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(resources, " /XObject << {} >>", xobjects);
            }
            let page_id = builder.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                     /Contents {} 0 R /Resources << {} >> >>",
                    page.width, page.height, content_id, resources
                )
                .into_bytes(),
            );
            page_ids.push(page_id);
        }

        builder.objects[1] = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2] =
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_ids.len()).into_bytes();

        let info_id = builder.push(Self::info_dict(metadata).into_bytes());
        log::debug!(
            "serialized {} page(s) into {} PDF objects",
            pages.len(),
            builder.objects.len() - 1
        );
        Ok(Self::serialize(&builder, info_id))
    }

    fn info_dict(metadata: &Metadata) -> String {
        let mut info = String::from("<< ");
        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Creator", &metadata.creator),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                let _ = write!(info, "/{} {} ", name, Self::text_string(value));
            }
        }
        let _ = write!(info, "/Producer ({}) >>", PRODUCER);
        info
    }

    /// Register one font resource per distinct font actually drawn with.
    ///
    /// Keys that resolve to the same face (an embedded font serves both
    /// weights) share a resource, so the face is embedded once.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        pages: &[LayoutPage],
        fonts: &FontContext,
    ) -> Result<(), SheetError> {
        let mut usage: BTreeMap<String, FontUsage> = BTreeMap::new();
        for line in pages.iter().flat_map(|p| p.text_lines()) {
            let name = Self::resource_name(fonts.resolve(&line.font), &line.font);
            let entry = usage.entry(name).or_default();
            if !entry.keys.contains(&line.font) {
                entry.keys.push(line.font.clone());
            }
            for glyph in &line.glyphs {
                let text = entry.glyphs.entry(glyph.glyph_id).or_default();
                if text.is_empty() {
                    text.push_str(&glyph.text);
                }
            }
        }

        for (name, used) in usage {
            let Some(first_key) = used.keys.first() else {
                continue;
            };
            let resource = match fonts.resolve(first_key) {
                FontData::Standard(font) => FontResource {
                    obj_id: builder.push(
                        format!(
                            "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                             /Encoding /WinAnsiEncoding >>",
                            font.pdf_name()
                        )
                        .into_bytes(),
                    ),
                    widths: None,
                },
                FontData::Custom(font) => {
                    Self::write_custom_font_objects(builder, &name, font, &used.glyphs)?
                }
            };
            let index = builder.fonts.len();
            builder.fonts.push(resource);
            for key in used.keys {
                builder.font_for_key.insert(key, index);
            }
        }
        Ok(())
    }

    fn resource_name(data: &FontData, key: &FontKey) -> String {
        match data {
            FontData::Standard(font) => font.pdf_name().to_string(),
            FontData::Custom(_) => Self::sanitize_font_name(&key.family),
        }
    }

    /// Write the five objects of an embedded TrueType font and return the
    /// resource pointing at the Type0 root.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        name: &str,
        font: &CustomFont,
        glyphs: &BTreeMap<u16, String>,
    ) -> Result<FontResource, SheetError> {
        let face = ttf_parser::Face::parse(&font.data, 0)
            .map_err(|e| SheetError::Font(format!("cannot embed '{}': {}", name, e)))?;
        let metrics = &font.metrics;
        let scale = 1000.0 / metrics.units_per_em as f64;
        let to_pdf = |v: i16| (v as f64 * scale).round() as i64;

        // 1. FontFile2: the whole face.
        let fontfile_id = builder.push_stream(&format!(" /Length1 {}", font.data.len()), &font.data);

        // 2. FontDescriptor
        let [x_min, y_min, x_max, y_max] = metrics.bbox;
        let descriptor_id = builder.push(
            format!(
                "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
                 /FontBBox [{} {} {} {}] /ItalicAngle 0 \
                 /Ascent {} /Descent {} /CapHeight {} /StemV 80 \
                 /FontFile2 {} 0 R >>",
                name,
                to_pdf(x_min),
                to_pdf(y_min),
                to_pdf(x_max),
                to_pdf(y_max),
                to_pdf(metrics.ascender),
                to_pdf(metrics.descender),
                to_pdf(metrics.cap_height),
                fontfile_id
            )
            .into_bytes(),
        );

        // 3. CIDFont with the widths of every glyph we draw.
        let widths: BTreeMap<u16, i64> = glyphs
            .keys()
            .map(|&gid| {
                let advance = face
                    .glyph_hor_advance(ttf_parser::GlyphId(gid))
                    .unwrap_or(0);
                (gid, (advance as f64 * scale).round() as i64)
            })
            .collect();
        let cidfont_id = builder.push(
            format!(
                "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
                 /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
                 /FontDescriptor {} 0 R /DW 1000 /W {} /CIDToGIDMap /Identity >>",
                name,
                descriptor_id,
                Self::build_w_array(&widths)
            )
            .into_bytes(),
        );

        // 4. ToUnicode
        let cmap = Self::build_tounicode_cmap(glyphs, name);
        let tounicode_id = builder.push_stream("", cmap.as_bytes());

        // 5. Type0 root
        let type0_id = builder.alloc();
        builder.objects[type0_id] = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
            name, cidfont_id, tounicode_id
        )
        .into_bytes();

        log::debug!(
            "embedded font '{}' ({} bytes, {} glyphs used)",
            name,
            font.data.len(),
            widths.len()
        );
        Ok(FontResource {
            obj_id: type0_id,
            widths: Some(widths),
        })
    }

    /// `/W` array: `[gid [width] gid [width] ...]`.
    fn build_w_array(widths: &BTreeMap<u16, i64>) -> String {
        let mut result = String::from("[");
        for (gid, width) in widths {
            let _ = write!(result, " {} [{}]", gid, width);
        }
        result.push_str(" ]");
        result
    }

    /// ToUnicode CMap from glyph ids to the text they were shaped from.
    fn build_tounicode_cmap(glyphs: &BTreeMap<u16, String>, font_name: &str) -> String {
        let entries: Vec<(u16, String)> = glyphs
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(&gid, text)| {
                let hex: String = text.encode_utf16().map(|u| format!("{:04X}", u)).collect();
                (gid, hex)
            })
            .collect();

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
        cmap.push_str("/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");
        // At most 100 entries per bfchar block.
        for chunk in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for (gid, hex) in chunk {
                let _ = writeln!(cmap, "<{:04X}> <{}>", gid, hex);
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap
    }

    fn build_content_stream(&self, page: &LayoutPage, builder: &PdfBuilder) -> String {
        let mut stream = String::new();
        let mut image_index = 0;
        for element in &page.elements {
            self.write_element(&mut stream, element, page.height, builder, &mut image_index);
        }
        stream
    }

    /// Write one element as PDF operators. Layout y grows downwards, PDF y
    /// grows upwards from the bottom edge.
    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        builder: &PdfBuilder,
        image_index: &mut usize,
    ) {
        match &element.draw {
            DrawCommand::Rect { background, border } => {
                let y = page_height - element.y - element.height;
                if let Some(fill) = background {
                    let _ = write!(
                        stream,
                        "q\n{} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                        Self::color(fill),
                        element.x,
                        y,
                        element.width,
                        element.height
                    );
                }
                if let Some(stroke) = border {
                    let _ = write!(
                        stream,
                        "q\n{}{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                        Self::stroke(stroke),
                        element.x,
                        y,
                        element.width,
                        element.height
                    );
                }
            }

            DrawCommand::Line { stroke } => {
                let _ = write!(
                    stream,
                    "q\n{}{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                    Self::stroke(stroke),
                    element.x,
                    page_height - element.y,
                    element.x + element.width,
                    page_height - element.y - element.height
                );
            }

            DrawCommand::Text { line, color } => {
                if line.glyphs.is_empty() {
                    return;
                }
                let Some(&font_index) = builder.font_for_key.get(&line.font) else {
                    log::warn!("no font resource for '{}', text dropped", line.font.family);
                    return;
                };
                let _ = write!(
                    stream,
                    "BT\n{} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n",
                    Self::color(color),
                    font_index,
                    line.font_size,
                    line.x,
                    page_height - line.y
                );
                match &builder.fonts[font_index].widths {
                    None => {
                        let _ = writeln!(stream, "({}) Tj", Self::encode_winansi(line));
                    }
                    Some(widths) => {
                        let _ = writeln!(stream, "{} TJ", Self::encode_glyph_ids(line, widths));
                    }
                }
                stream.push_str("ET\n");
            }

            DrawCommand::Image { .. } => {
                let _ = write!(
                    stream,
                    "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                    element.width,
                    element.height,
                    element.x,
                    page_height - element.y - element.height,
                    image_index
                );
                *image_index += 1;
            }
        }
    }

    fn color(c: &Color) -> String {
        format!("{:.3} {:.3} {:.3}", c.r, c.g, c.b)
    }

    fn stroke(s: &Stroke) -> String {
        format!("{} RG\n{:.2} w\n", Self::color(&s.color), s.width)
    }

    /// Literal string of WinAnsi codes.
    fn encode_winansi(line: &TextLine) -> String {
        let mut out = String::with_capacity(line.glyphs.len());
        for glyph in &line.glyphs {
            match glyph.glyph_id as u8 {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                b @ 0x20..=0x7E => out.push(b as char),
                b => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// TJ array of two-byte glyph ids. Where shaping moved a glyph away from
    /// where the font's own advance would put it (kerning, marks), a
    /// displacement in 1/1000 em is inserted before it.
    fn encode_glyph_ids(line: &TextLine, widths: &BTreeMap<u16, i64>) -> String {
        let mut out = String::from("[");
        let mut pen = 0.0;
        let mut run = String::new();
        for glyph in &line.glyphs {
            let delta = glyph.x_offset - pen;
            if delta.abs() > 0.001 {
                if !run.is_empty() {
                    let _ = write!(out, "<{}>", run);
                    run.clear();
                }
                let _ = write!(out, " {:.0} ", -delta * 1000.0 / line.font_size);
            }
            let _ = write!(run, "{:04X}", glyph.glyph_id);
            let natural = widths.get(&glyph.glyph_id).copied().unwrap_or(1000);
            pen = glyph.x_offset + natural as f64 * line.font_size / 1000.0;
        }
        if !run.is_empty() {
            let _ = write!(out, "<{}>", run);
        }
        out.push(']');
        out
    }

    /// Write a logo as one or two image XObjects. Returns the main XObject id.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixels {
            ImagePixels::Jpeg { data, gray } => {
                let mut obj = Vec::with_capacity(data.len() + 160);
                let _ = write!(
                    obj,
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /{} /BitsPerComponent 8 /Filter /DCTDecode \
                     /Length {} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    if *gray { "DeviceGray" } else { "DeviceRGB" },
                    data.len()
                );
                obj.extend_from_slice(data);
                obj.extend_from_slice(b"\nendstream");
                builder.push(obj)
            }
            ImagePixels::Rgb { rgb, alpha } => {
                let image_dict = |color_space: &str| {
                    format!(
                        " /Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /{} /BitsPerComponent 8",
                        image.width_px, image.height_px, color_space
                    )
                };
                let smask = alpha
                    .as_ref()
                    .map(|a| builder.push_stream(&image_dict("DeviceGray"), a));
                let mut dict = image_dict("DeviceRGB");
                if let Some(id) = smask {
                    let _ = write!(dict, " /SMask {} 0 R", id);
                }
                builder.push_stream(&dict, rgb)
            }
        }
    }

    /// PDF text string: literal when ASCII, UTF-16BE with BOM otherwise.
    fn text_string(s: &str) -> String {
        if s.is_ascii() {
            format!("({})", Self::escape_pdf_string(s))
        } else {
            let hex: String = s.encode_utf16().map(|u| format!("{:04X}", u)).collect();
            format!("<FEFF{}>", hex)
        }
    }

    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// PDF name for an embedded family: alphanumerics, `-` and `_` only.
    fn sanitize_font_name(family: &str) -> String {
        let name: String = family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if name.is_empty() {
            "EmbeddedFont".to_string()
        } else {
            name
        }
    }

    fn serialize(builder: &PdfBuilder, info_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(obj);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        output.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_id,
            xref_offset
        );
        output
    }
}

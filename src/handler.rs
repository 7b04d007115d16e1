//! # Request Handler
//!
//! The boundary between a transport and the renderer. [`handle`] takes an
//! HTTP-like method and body and returns a complete [`Response`]; any web
//! framework (or a test) can call it without this crate depending on one.

use serde::Serialize;

use crate::config::RenderConfig;
use crate::error::SheetError;
use crate::font::FontContext;
use crate::image_loader::LoadedImage;
use crate::model::{BalanceSheetRequest, Metadata};
use crate::pdf::PdfWriter;
use crate::sheet::compose;

/// A rendered balance sheet and the headers it should be served with.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub page_count: usize,
}

impl PdfDocument {
    pub fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.filename)
    }

    pub fn cache_control(&self) -> &'static str {
        "no-store, no-cache, must-revalidate"
    }
}

/// Render a request with the fonts and logo named in `config`.
pub fn render_balance_sheet(
    request: &BalanceSheetRequest,
    config: &RenderConfig,
) -> Result<PdfDocument, SheetError> {
    let fonts = config.font.load()?;
    render_with_fonts(request, config, &fonts)
}

/// Render with an already loaded font context, e.g. one shared by many
/// requests.
pub fn render_with_fonts(
    request: &BalanceSheetRequest,
    config: &RenderConfig,
    fonts: &FontContext,
) -> Result<PdfDocument, SheetError> {
    let logo = config
        .logo
        .as_deref()
        .map(LoadedImage::from_source)
        .transpose()?;

    let pages = compose(request, config, fonts, logo.as_ref())?;
    let bytes = PdfWriter::new().write(&pages, &document_metadata(config), fonts)?;
    log::info!(
        "rendered {} shop(s) on {} page(s), {} bytes",
        request.shops.len(),
        pages.len(),
        bytes.len()
    );
    Ok(PdfDocument {
        bytes,
        filename: config.filename.clone(),
        page_count: pages.len(),
    })
}

/// Info dictionary entries, defaulting the title and author to the headings.
fn document_metadata(config: &RenderConfig) -> Metadata {
    let metadata = config.metadata.clone();
    Metadata {
        title: metadata.title.or_else(|| Some(config.title.clone())),
        author: metadata.author.or_else(|| Some(config.company.clone())),
        subject: metadata.subject,
        creator: metadata.creator.or_else(|| Some("ledger-sheet".to_string())),
    }
}

/// What goes back over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// First header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn json<T: Serialize>(status: u16, body: &T) -> Self {
        let body = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        }
    }

    fn pdf(doc: PdfDocument) -> Self {
        Self {
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), doc.content_type().to_string()),
                ("Content-Disposition".to_string(), doc.content_disposition()),
                ("Cache-Control".to_string(), doc.cache_control().to_string()),
            ],
            body: doc.bytes,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Handle one request.
///
/// Only `POST` is accepted. Input problems answer 400 with the reason in
/// `error`; failures while producing the document answer 500 with
/// `"PDF generation failed"` and the reason in `message`.
pub fn handle(method: &str, body: &[u8], config: &RenderConfig) -> Response {
    if method != "POST" {
        return Response::json(
            405,
            &ErrorBody {
                error: "Method not allowed",
                message: None,
            },
        );
    }

    let request = match std::str::from_utf8(body)
        .map_err(|e| SheetError::Request(format!("request body is not UTF-8: {}", e)))
        .and_then(BalanceSheetRequest::from_json)
    {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match render_balance_sheet(&request, config) {
        Ok(doc) => Response::pdf(doc),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &SheetError) -> Response {
    let status = err.status_code();
    let message = err.to_string();
    if status >= 500 {
        log::error!("Error generating PDF: {}", message);
        Response::json(
            status,
            &ErrorBody {
                error: "PDF generation failed",
                message: Some(message),
            },
        )
    } else {
        log::warn!("rejected request: {}", message);
        Response::json(
            status,
            &ErrorBody {
                error: &message,
                message: None,
            },
        )
    }
}

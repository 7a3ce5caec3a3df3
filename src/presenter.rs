use std::io::Write;

use http::header::CONTENT_TYPE;
use http::HeaderMap;

use crate::error::{Error, Result};
use crate::highlight::Highlight;
use crate::response::ResponseRecord;

pub const DEFAULT_STYLE: &str = "base16-ocean.dark";

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub hide_headers: bool,
    pub hide_body: bool,
    /// Print bodies without highlighting.
    pub raw: bool,
    pub style: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            hide_headers: false,
            hide_body: false,
            raw: false,
            style: DEFAULT_STYLE.to_string(),
        }
    }
}

/// Writes responses in the same shape as the input file: status line,
/// headers, blank line, body, with `###` between responses.
pub struct Presenter<H> {
    highlighter: H,
    options: OutputOptions,
}

impl<H: Highlight> Presenter<H> {
    pub fn new(highlighter: H, options: OutputOptions) -> Self {
        Self {
            highlighter,
            options,
        }
    }

    pub fn highlighter(&self) -> &H {
        &self.highlighter
    }

    pub fn present<W: Write>(&self, out: &mut W, response: &ResponseRecord) -> Result<()> {
        writeln!(out, "{}", response.status_line())?;

        if !self.options.hide_headers {
            for (name, value) in response.headers.iter() {
                writeln!(
                    out,
                    "{}: {}",
                    canonical_name(name.as_str()),
                    String::from_utf8_lossy(value.as_bytes())
                )?;
            }
        }
        writeln!(out)?;

        if self.options.hide_body {
            return Ok(());
        }

        let body = String::from_utf8_lossy(&response.body);
        let body = body.trim();
        if self.options.raw || body.is_empty() {
            writeln!(out, "{body}")?;
            return Ok(());
        }

        let token = content_category(&response.headers)?;
        let highlighted = self.highlighter.highlight(body, &token, &self.options.style)?;
        writeln!(out, "{highlighted}")?;

        Ok(())
    }

    pub fn delimiter<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "###")?;
        writeln!(out)?;
        Ok(())
    }

    /// Written after a failed response; `skipped` responses follow it
    /// unseen.
    pub fn summary<W: Write>(&self, out: &mut W, response: &ResponseRecord, skipped: usize) -> Result<()> {
        if skipped == 0 {
            writeln!(out, "Error: {}", response.status_line())?;
        } else {
            writeln!(
                out,
                "Error: {} ({skipped} more response(s) not shown)",
                response.status_line()
            )?;
        }
        Ok(())
    }
}

/// The media subtype of `Content-Type`: `application/json; charset=utf-8`
/// gives `json`.
pub fn content_category(headers: &HeaderMap) -> Result<String> {
    let value = headers.get(CONTENT_TYPE).ok_or(Error::MissingContentType)?;
    let value = value
        .to_str()
        .map_err(|_| Error::MalformedContentType(String::from_utf8_lossy(value.as_bytes()).into_owned()))?;

    let media_type = value.split(';').next().unwrap_or_default().trim();
    match media_type.split_once('/') {
        Some((kind, subtype))
            if !kind.trim().is_empty() && !subtype.trim().is_empty() && !subtype.contains('/') =>
        {
            Ok(subtype.trim().to_ascii_lowercase())
        }
        _ => Err(Error::MalformedContentType(value.to_string())),
    }
}

fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

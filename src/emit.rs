use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    asset::AssetKind,
    cli::OutputFormat,
    context::BuildContext,
    error::Result,
};

/// Finished output of a bundling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bundle {
    pub content: String,
    pub assets: BTreeMap<AssetKind, Vec<String>>,
}

impl Bundle {
    /// Drains the context's repositories and copies its asset lists.
    pub fn collect(ctx: &mut BuildContext) -> Self {
        let content = ctx.get_content();
        let assets = AssetKind::ALL
            .into_iter()
            .map(|kind| (kind, ctx.get_assets(kind).to_vec()))
            .filter(|(_, urls)| !urls.is_empty())
            .collect();
        Self { content, assets }
    }

    pub fn urls(&self, kind: AssetKind) -> &[String] {
        self.assets.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct Emitter {
    format: OutputFormat,
    eol: String,
}

impl Emitter {
    pub fn new(format: OutputFormat, eol: impl Into<String>) -> Self {
        Self {
            format,
            eol: eol.into(),
        }
    }

    pub fn render(&self, bundle: &Bundle) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.text(bundle)),
            OutputFormat::Html => Ok(self.html(bundle)),
            OutputFormat::Json => {
                let mut out = serde_json::to_string_pretty(bundle)?;
                out.push('\n');
                Ok(out)
            }
        }
    }

    fn text(&self, bundle: &Bundle) -> String {
        let mut out = bundle.content.clone();
        if !out.is_empty() {
            out.push_str(&self.eol);
        }
        out
    }

    /// Stylesheet links, then script tags, then the bundle inline.
    fn html(&self, bundle: &Bundle) -> String {
        let mut out = String::new();

        for url in bundle.urls(AssetKind::Css) {
            out.push_str("<link rel=\"stylesheet\" href=");
            out.push_str(&quote_attr(url));
            out.push('>');
            out.push_str(&self.eol);
        }

        for url in bundle.urls(AssetKind::Js) {
            out.push_str("<script src=");
            out.push_str(&quote_attr(url));
            out.push_str("></script>");
            out.push_str(&self.eol);
        }

        if !bundle.content.is_empty() {
            out.push_str("<script>");
            out.push_str(&self.eol);
            out.push_str(&escape_inline_script(&bundle.content));
            out.push_str(&self.eol);
            out.push_str("</script>");
            out.push_str(&self.eol);
        }

        out
    }
}

fn quote_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Keeps `</script` inside the bundle from closing the inline tag.
fn escape_inline_script(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = find_ascii_ci(rest, "</script") {
        out.push_str(&rest[..i]);
        out.push_str("<\\/");
        rest = &rest[i + 2..];
    }
    out.push_str(rest);
    out
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

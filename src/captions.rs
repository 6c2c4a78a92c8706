use crate::errors::MemeUrlError;
use crate::templates::MemeTemplate;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Base URL of the external meme rendering service.
pub const MEMEGEN_API_BASE: &str = "https://api.memegen.link";

/// Characters escaped in caption path segments, on top of controls.
const CAPTION_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'%')
    .add(b'/')
    .add(b'\\')
    .add(b'&');

/// A chosen template id plus caption lines already normalized to the
/// template's required line count. Built per generation request and discarded
/// once the meme URL is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionPlan {
    pub template_id: String,
    pub lines: Vec<String>,
}

impl CaptionPlan {
    pub fn new(template: &MemeTemplate, lines: Vec<String>) -> Self {
        Self {
            template_id: template.id.clone(),
            lines: normalize_lines(lines, template.required_lines),
        }
    }

    pub fn url(&self) -> Result<String, MemeUrlError> {
        meme_url(&self.template_id, &self.lines)
    }
}

/// Reconciles a caption line list with a template's required line count.
///
/// Too few lines are padded with empty strings at the end; too many are
/// truncated from the end. Lossy but deterministic: it never fails.
pub fn normalize_lines(mut lines: Vec<String>, required: usize) -> Vec<String> {
    lines.truncate(required);
    while lines.len() < required {
        lines.push(String::new());
    }
    lines
}

/// Builds the rendering-service URL for a template and its caption lines.
///
/// Pure and total for already-normalized input: each line is percent-encoded
/// independently and joined as a path segment, with empty lines rendered as
/// the `_` placeholder segment. Only a blank template id fails.
pub fn meme_url(template_id: &str, lines: &[String]) -> Result<String, MemeUrlError> {
    if template_id.trim().is_empty() {
        return Err(MemeUrlError::InvalidTemplate);
    }

    let mut url = format!("{MEMEGEN_API_BASE}/images/{template_id}");
    for line in lines {
        url.push('/');
        if line.is_empty() {
            url.push('_');
        } else {
            url.push_str(&utf8_percent_encode(line, CAPTION_SEGMENT).to_string());
        }
    }
    url.push_str(".png");
    Ok(url)
}

//! Purpose: Render CSW 2.0.2 `Harvest` request bodies.
//! Exports: `HarvestRequest`, `gen_harvest_request`.
//! Role: Pure string templating; no I/O.
//! Invariants: Default rendering substitutes values verbatim (no escaping, no validation).
//! Invariants: Escaped rendering is opt-in only and uses the same template.

const HARVEST_OPEN: &str =
    r#"<Harvest service="CSW" version="2.0.2" xmlns="http://www.opengis.net/cat/csw/2.0.2">"#;
const HARVEST_CLOSE: &str = "</Harvest>";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HarvestRequest {
    pub resource_type: String,
    pub source: String,
}

impl HarvestRequest {
    pub fn new(resource_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            source: source.into(),
        }
    }

    pub fn to_xml(&self) -> String {
        gen_harvest_request(&self.resource_type, &self.source)
    }

    pub fn to_xml_escaped(&self) -> String {
        render(&escape_xml(&self.resource_type), &escape_xml(&self.source))
    }

    /// True when either value carries `<`, `>` or `&`, which verbatim rendering passes through.
    pub fn markup_chars(&self) -> bool {
        has_markup(&self.resource_type) || has_markup(&self.source)
    }
}

pub fn gen_harvest_request(resource_type: &str, source: &str) -> String {
    render(resource_type, source)
}

fn render(resource_type: &str, source: &str) -> String {
    let mut xml = String::with_capacity(
        HARVEST_OPEN.len() + HARVEST_CLOSE.len() + resource_type.len() + source.len() + 48,
    );
    xml.push_str(HARVEST_OPEN);
    xml.push_str("<Source>");
    xml.push_str(source);
    xml.push_str("</Source>");
    xml.push_str("<ResourceType>");
    xml.push_str(resource_type);
    xml.push_str("</ResourceType>");
    xml.push_str(HARVEST_CLOSE);
    xml
}

fn has_markup(value: &str) -> bool {
    value.contains(['<', '>', '&'])
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::types::{RecId, Record};

/// Output representation selector (the `of` request parameter).
/// Unknown codes fall back to the brief HTML summary, the interface
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Plain identifier list, `[8, 9, 10]`.
    IdList,
    /// Bare hit count.
    Count,
    /// MARC-flavoured XML.
    MarcXml,
    /// Generic field/value XML.
    FieldXml,
    /// Brief HTML hit list.
    BriefHtml,
}

impl OutputFormat {
    pub fn from_code(code: &str) -> Self {
        match code {
            "id" => OutputFormat::IdList,
            "t" => OutputFormat::Count,
            "xm" => OutputFormat::MarcXml,
            "xd" => OutputFormat::FieldXml,
            _ => OutputFormat::BriefHtml,
        }
    }
}

/// Everything a rendering needs. The formatter is a pure projection
/// of the sorted, filtered result set; it never filters on its own.
pub struct FormatContext<'a> {
    pub records: &'a HashMap<RecId, Record>,
    /// Page identifiers grouped for display: one group per requested
    /// collection when split-by-collection is on, otherwise a single
    /// group with an empty name.
    pub groups: &'a [(String, Vec<RecId>)],
    /// Full result set, ascending (for the full-set formats).
    pub all_ids: &'a [RecId],
    pub total: u64,
}

pub fn render(format: OutputFormat, ctx: &FormatContext) -> String {
    match format {
        OutputFormat::IdList => render_ids(ctx.all_ids),
        OutputFormat::Count => ctx.total.to_string(),
        OutputFormat::MarcXml => render_marcxml(ctx),
        OutputFormat::FieldXml => render_fieldxml(ctx),
        OutputFormat::BriefHtml => render_brief_html(ctx),
    }
}

fn render_ids(ids: &[RecId]) -> String {
    let inner: Vec<String> = ids.iter().map(|id| id.value().to_string()).collect();
    format!("[{}]", inner.join(", "))
}

/// Minimal XML escaping; every rendered value passes through here so
/// query-supplied text can never break out of markup.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_marcxml(ctx: &FormatContext) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    for (name, ids) in ctx.groups {
        if name.is_empty() {
            out.push_str("<collection xmlns=\"http://www.loc.gov/MARC21/slim\">\n");
        } else {
            out.push_str(&format!(
                "<collection name=\"{}\" xmlns=\"http://www.loc.gov/MARC21/slim\">\n",
                xml_escape(name)
            ));
        }
        for id in ids {
            out.push_str(&marc_record(ctx.records.get(id), *id));
        }
        out.push_str("</collection>\n");
    }
    out
}

fn marc_record(record: Option<&Record>, id: RecId) -> String {
    let mut out = String::from(" <record>\n");
    out.push_str(&format!(
        "  <controlfield tag=\"001\">{}</controlfield>\n",
        id.value()
    ));
    if let Some(record) = record {
        let mut tags: Vec<&String> = record.fields.keys().collect();
        tags.sort();
        for tag in tags {
            let (field, ind1, ind2, code) = split_tag(tag);
            for value in record.values(tag) {
                out.push_str(&format!(
                    "  <datafield tag=\"{}\" ind1=\"{}\" ind2=\"{}\">\n   <subfield code=\"{}\">{}</subfield>\n  </datafield>\n",
                    xml_escape(field),
                    ind1,
                    ind2,
                    code,
                    xml_escape(value)
                ));
            }
        }
    }
    out.push_str(" </record>\n");
    out
}

/// "100__a" → ("100", ' ', ' ', 'a'). Underscore indicators render as
/// blanks, per MARC convention.
fn split_tag(tag: &str) -> (&str, char, char, char) {
    let chars: Vec<char> = tag.chars().collect();
    let ind = |c: Option<&char>| match c {
        Some('_') | None => ' ',
        Some(&c) => c,
    };
    let field = if tag.is_ascii() && tag.len() >= 3 { &tag[..3] } else { tag };
    let code = match chars.get(5) {
        Some(&c) if c != '_' => c,
        _ => 'a',
    };
    (field, ind(chars.get(3)), ind(chars.get(4)), code)
}

fn render_fieldxml(ctx: &FormatContext) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<records>\n");
    for (name, ids) in ctx.groups {
        for id in ids {
            if name.is_empty() {
                out.push_str(&format!(" <record id=\"{}\">\n", id.value()));
            } else {
                out.push_str(&format!(
                    " <record id=\"{}\" collection=\"{}\">\n",
                    id.value(),
                    xml_escape(name)
                ));
            }
            if let Some(record) = ctx.records.get(id) {
                let mut tags: Vec<&String> = record.fields.keys().collect();
                tags.sort();
                for tag in tags {
                    for value in record.values(tag) {
                        out.push_str(&format!(
                            "  <field tag=\"{}\">{}</field>\n",
                            xml_escape(tag),
                            xml_escape(value)
                        ));
                    }
                }
            }
            out.push_str(" </record>\n");
        }
    }
    out.push_str("</records>\n");
    out
}

fn render_brief_html(ctx: &FormatContext) -> String {
    let mut out = format!("<strong>{} records found</strong>\n", ctx.total);
    for (name, ids) in ctx.groups {
        if !name.is_empty() {
            out.push_str(&format!("<h2>{}</h2>\n", xml_escape(name)));
        }
        out.push_str("<ol>\n");
        for id in ids {
            out.push_str(&format!(" <li>record {}</li>\n", id.value()));
        }
        out.push_str("</ol>\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_fixture() -> (HashMap<RecId, Record>, Vec<RecId>) {
        let mut records = HashMap::new();
        let mut rec = Record::new(RecId(8));
        rec.add_value("100__a", "Ellis, J");
        rec.add_value("245__a", "Muon <decay> & after");
        records.insert(RecId(8), rec);
        (records, vec![RecId(8)])
    }

    #[test]
    fn id_list_rendering_matches_wire_shape() {
        assert_eq!(
            render_ids(&[RecId(8), RecId(9), RecId(47)]),
            "[8, 9, 47]"
        );
        assert_eq!(render_ids(&[]), "[]");
    }

    #[test]
    fn marcxml_escapes_values() {
        let (records, ids) = ctx_fixture();
        let groups = vec![(String::new(), ids.clone())];
        let ctx = FormatContext {
            records: &records,
            groups: &groups,
            all_ids: &ids,
            total: 1,
        };
        let xml = render(OutputFormat::MarcXml, &ctx);
        assert!(xml.contains("<controlfield tag=\"001\">8</controlfield>"));
        assert!(xml.contains("Muon &lt;decay&gt; &amp; after"));
        assert!(xml.contains("tag=\"100\""));
    }

    #[test]
    fn split_groups_render_per_collection() {
        let (records, ids) = ctx_fixture();
        let groups = vec![
            ("Articles".to_string(), ids.clone()),
            ("Preprints".to_string(), Vec::new()),
        ];
        let ctx = FormatContext {
            records: &records,
            groups: &groups,
            all_ids: &ids,
            total: 1,
        };
        let xml = render(OutputFormat::MarcXml, &ctx);
        assert_eq!(xml.matches("<collection").count(), 2);
        assert!(xml.contains("name=\"Articles\""));
    }

    #[test]
    fn count_renders_total() {
        let (records, ids) = ctx_fixture();
        let groups = vec![(String::new(), ids.clone())];
        let ctx = FormatContext {
            records: &records,
            groups: &groups,
            all_ids: &ids,
            total: 12,
        };
        assert_eq!(render(OutputFormat::Count, &ctx), "12");
    }

    #[test]
    fn unknown_code_falls_back_to_brief_html() {
        assert_eq!(OutputFormat::from_code("zz"), OutputFormat::BriefHtml);
        assert_eq!(OutputFormat::from_code("id"), OutputFormat::IdList);
    }
}

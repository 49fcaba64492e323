use std::sync::LazyLock;

use regex::Regex;

static FORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form\s*>").unwrap());
static INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(input|button)\b([^>]*)>").unwrap());
static TEXTAREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<textarea\b([^>]*)>(.*?)</textarea\s*>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)([A-Za-z_:][-A-Za-z0-9_:.$]*)",
        r#"(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
    ))
    .unwrap()
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6}|[A-Za-z][A-Za-z0-9]*);").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// A `<form>` found in a page, reduced to what a browser would submit.
#[derive(Debug, Clone)]
pub struct HtmlForm {
    pub action: Option<String>,
    pub method: FormMethod,
    fields: Vec<FormField>,
    buttons: Vec<FormField>,
}

impl HtmlForm {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Sets every field called `name`. Returns false when the form has no such field.
    pub fn fill(&mut self, name: &str, value: &str) -> bool {
        let mut found = false;
        for field in self.fields.iter_mut().filter(|field| field.name == name) {
            field.value = value.to_string();
            found = true;
        }
        found
    }

    /// Fields to send when pressing the first submit button.
    pub fn submission(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .chain(self.buttons.first())
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect()
    }
}

pub fn parse_forms(html: &str) -> Vec<HtmlForm> {
    FORM_RE
        .captures_iter(html)
        .map(|caps| {
            let attrs = parse_attrs(&caps[1]);
            let method = match attr(&attrs, "method") {
                Some(value) if value.eq_ignore_ascii_case("get") => FormMethod::Get,
                Some(_) => FormMethod::Post,
                None => FormMethod::Get,
            };
            let action = attr(&attrs, "action")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
            let (fields, buttons) = collect_controls(&caps[2]);
            HtmlForm {
                action,
                method,
                fields,
                buttons,
            }
        })
        .collect()
}

fn collect_controls(body: &str) -> (Vec<FormField>, Vec<FormField>) {
    let mut fields = Vec::new();
    let mut buttons = Vec::new();

    for caps in INPUT_RE.captures_iter(body) {
        let tag = caps[1].to_ascii_lowercase();
        let attrs = parse_attrs(&caps[2]);
        let Some(name) = attr(&attrs, "name").filter(|name| !name.is_empty()) else {
            continue;
        };
        if has_attr(&attrs, "disabled") {
            continue;
        }
        let default_kind = if tag == "button" { "submit" } else { "text" };
        let kind = attr(&attrs, "type")
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_else(|| default_kind.to_string());
        let field = FormField {
            name: name.to_string(),
            value: attr(&attrs, "value").unwrap_or_default().to_string(),
        };
        match kind.as_str() {
            "submit" => buttons.push(field),
            "button" | "reset" | "image" | "file" => {}
            "checkbox" | "radio" => {
                if has_attr(&attrs, "checked") {
                    fields.push(field);
                }
            }
            _ if tag == "input" => fields.push(field),
            _ => {}
        }
    }

    for caps in TEXTAREA_RE.captures_iter(body) {
        let attrs = parse_attrs(&caps[1]);
        if has_attr(&attrs, "disabled") {
            continue;
        }
        if let Some(name) = attr(&attrs, "name").filter(|name| !name.is_empty()) {
            fields.push(FormField {
                name: name.to_string(),
                value: decode_entities(&caps[2]),
            });
        }
    }

    (fields, buttons)
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|caps| {
            let key = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|value| decode_entities(value.as_str()))
                .unwrap_or_default();
            (key, value)
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

fn has_attr(attrs: &[(String, String)], key: &str) -> bool {
    attrs.iter().any(|(name, _)| name == key)
}

/// Decodes numeric character references and the common named entities.
/// Unknown names are left as written.
fn decode_entities(value: &str) -> String {
    ENTITY_RE
        .replace_all(value, |caps: &regex::Captures| {
            let reference = &caps[1];
            let decoded = match reference.strip_prefix('#') {
                Some(number) => {
                    let code = match number.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => number.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
                None => named_entity(reference),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        _ => return None,
    })
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub(crate) fn attr(name: &str, value: &str) -> String {
    format!(" {}=\"{}\"", name, escape_html(value))
}

pub(crate) fn hidden_field(name: &str, value: &str) -> String {
    format!(
        "<input type=\"hidden\" id=\"{}\" name=\"{}\" value=\"{}\" />",
        name,
        name,
        escape_html(value)
    )
}

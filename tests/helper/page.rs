//! Installer page fixtures

pub const PKG_URL: &str =
    "https://swcdn.apple.com/content/downloads/62/20/072-12345-A_QSZ7L9BX2H/InstallAssistant.pkg";

/// One table row: description cell and download cell
pub fn installer_row(text: &str, href: &str) -> String {
    format!(
        r#"<tr><td>{}</td><td><a href="{}">InstallAssistant.pkg</a></td></tr>"#,
        text, href
    )
}

/// Heading followed by a table of rows
pub fn section(heading: &str, rows: &[String]) -> String {
    format!(
        "<h2>{}</h2>\n<table>\n<tbody>\n{}\n</tbody>\n</table>\n",
        heading,
        rows.join("\n")
    )
}

/// Full page around the given sections
pub fn installer_page(sections: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>macOS Sequoia Full Installer Database</title><script>var ga = 1;</script></head>
<body>
<p><strong>UPDATED: 10/28/24</strong></p>
{}
</body>
</html>"#,
        sections.join("\n")
    )
}

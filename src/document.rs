use crate::types::ResourceRecord;

/// Wrap a rendered diagram in a Markdown document with a heading.
pub fn assemble(title: &str, diagram: &str) -> String {
    let title: String = title
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!(
        "# {}\n\n```mermaid\n{}\n```\n",
        title.trim(),
        diagram.trim_end_matches('\n')
    )
}

pub fn title_for(record: &ResourceRecord) -> String {
    format!("{}: {}", record.kind, record.name)
}

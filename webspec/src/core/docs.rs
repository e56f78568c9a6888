//! Markdown heading lookup for `doc.section`.

/// True if `document` has an ATX heading (`#` … `######`) whose title equals
/// `title`, ignoring case and surrounding whitespace. Trailing closing `#`s
/// are ignored.
pub fn has_section(document: &str, title: &str) -> bool {
    let wanted = title.trim().to_lowercase();
    document
        .lines()
        .filter_map(heading_title)
        .any(|found| found.to_lowercase() == wanted)
}

fn heading_title(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some(rest.trim().trim_end_matches('#').trim_end())
}

//! Normalizes canonical-format (ASS) subtitle files before the mux: the
//! default style is rewritten to the display font at size 20, and every
//! dialogue line gets a fixed position directive ahead of its visible text.

use std::path::Path;

use tokio::fs;

/// Position directive prepended to every dialogue line. A pixel coordinate
/// carried over verbatim; it is not adapted to the video's resolution.
pub const POSITION_TAG: &str = "{\\pos(193,265)}";

/// Subtitle file size (in style rewrites).
const STYLE_FONT_SIZE: &str = "20";

/// Extensions accepted as subtitles, canonical first.
pub const SUBTITLE_EXTENSIONS: [&str; 3] = ["ass", "srt", "vtt"];

/// True when `path` holds a subtitle in a non-canonical format that needs a
/// conversion pass through the media tool first.
pub fn is_foreign(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => !ext.eq_ignore_ascii_case("ass"),
        None => true,
    }
}

/// Rewrite a whole ASS document. Idempotent: a second pass produces
/// byte-identical output.
pub fn normalize(content: &str, font_name: &str) -> String {
    let mut out = String::with_capacity(content.len() + 64);
    for line in content.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(b) => (b, "\n"),
            None => (line, ""),
        };
        let body = body.strip_suffix('\r').map(|b| (b, "\r")).unwrap_or((body, ""));
        let (text, cr) = body;

        if text.starts_with("Style: Default") {
            out.push_str(&rewrite_style(text, font_name));
        } else if text.starts_with("Dialogue:") {
            out.push_str(&rewrite_dialogue(text));
        } else {
            out.push_str(text);
        }
        out.push_str(cr);
        out.push_str(newline);
    }
    out
}

/// Read, normalize, and write back a subtitle file in place.
pub async fn normalize_file(path: &Path, font_name: &str) -> std::io::Result<()> {
    let content = fs::read_to_string(path).await?;
    fs::write(path, normalize(&content, font_name)).await
}

/// `Style: Default,<font>,<size>,...` — replace the font family and size
/// fields, leaving the rest of the record untouched.
fn rewrite_style(line: &str, font_name: &str) -> String {
    let mut fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 3 {
        return line.to_string();
    }
    fields[1] = font_name;
    fields[2] = STYLE_FONT_SIZE;
    fields.join(",")
}

/// `Dialogue:` records have nine commas of bookkeeping before the text
/// field. Strip any inline override tags from the text, then prepend the
/// position directive.
fn rewrite_dialogue(line: &str) -> String {
    let mut parts: Vec<&str> = line.splitn(10, ',').collect();
    if parts.len() < 10 {
        return line.to_string();
    }
    let stripped = strip_override_tags(parts[9]);
    let text = format!("{POSITION_TAG}{stripped}");
    parts[9] = &text;
    parts.join(",")
}

/// Remove every `{...}` override block from a dialogue text field.
fn strip_override_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_font_and_size_replaced() {
        let line = "Style: Default,Arial,16,&H00FFFFFF,&H000000FF";
        assert_eq!(
            rewrite_style(line, "Oath-Bold"),
            "Style: Default,Oath-Bold,20,&H00FFFFFF,&H000000FF"
        );
    }

    #[test]
    fn dialogue_gains_exactly_one_position_tag() {
        let line = "Dialogue: 0,0:00:01.00,0:00:03.00,Default,,0,0,0,,Hello";
        let once = rewrite_dialogue(line);
        assert_eq!(
            once,
            "Dialogue: 0,0:00:01.00,0:00:03.00,Default,,0,0,0,,{\\pos(193,265)}Hello"
        );
        // Running the rewrite again must not stack a second tag.
        assert_eq!(rewrite_dialogue(&once), once);
    }

    #[test]
    fn existing_override_tags_are_stripped() {
        let line = "Dialogue: 0,0:00:01.00,0:00:03.00,Default,,0,0,0,,{\\an8}{\\i1}Hello";
        let out = rewrite_dialogue(line);
        assert!(out.ends_with(",{\\pos(193,265)}Hello"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let doc = "[Script Info]\nTitle: t\n\n[V4+ Styles]\nStyle: Default,Arial,16,&H00FFFFFF\n\n[Events]\nDialogue: 0,0:00:01.00,0:00:03.00,Default,,0,0,0,,{\\b1}Hi there\n";
        let once = normalize(doc, "Oath-Bold");
        let twice = normalize(&once, "Oath-Bold");
        assert_eq!(once, twice);
        assert!(once.contains("Style: Default,Oath-Bold,20,"));
        assert!(once.contains(",{\\pos(193,265)}Hi there"));
    }

    #[test]
    fn crlf_documents_keep_their_line_endings() {
        let doc = "Dialogue: 0,a,b,Default,,0,0,0,,Text\r\n";
        let out = normalize(doc, "Oath-Bold");
        assert!(out.ends_with("\r\n"));
        assert!(out.contains("{\\pos(193,265)}Text"));
    }

    #[test]
    fn foreign_formats_detected_by_extension() {
        assert!(is_foreign(Path::new("a.srt")));
        assert!(is_foreign(Path::new("a.vtt")));
        assert!(!is_foreign(Path::new("a.ass")));
    }
}

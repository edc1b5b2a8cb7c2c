use regex::Regex;

/// Convert essay markdown into the restricted HTML subset the reader
/// displays.
///
/// This is a fixed sequence of text rewrites, each applied to the whole
/// output of the previous pass. Order matters: headings are converted
/// before bold (so heading markers are gone before `**` handling), bold
/// before italic (a leftover single asterisk pair is an italic span), and
/// inline spans before paragraph structure. Source content is not
/// HTML-escaped; literal `<` and `&` pass through.
pub fn render(markdown: &str) -> String {
    let html = strip_likes_lines(markdown);
    let html = convert_headings(&html);
    let html = convert_bold(&html);
    let html = convert_italic(&html);
    let html = convert_links(&html);
    let html = convert_images(&html);
    let html = convert_paragraphs(&html);
    classify_paragraphs(&html)
}

/// Lowercase, collapse non-alphanumeric runs to single hyphens, trim.
/// Used for heading anchors and list-entry element ids.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let re = Regex::new(r"[^a-z0-9]+").unwrap();
    let collapsed = re.replace_all(&lowered, "-");
    collapsed.trim_matches('-').to_string()
}

/// Like-count lines are scraper residue, not content.
fn strip_likes_lines(text: &str) -> String {
    let re = Regex::new(r"(?m)^\*\*Likes:\*\*\s*\d+\s*$").unwrap();
    re.replace_all(text, "").to_string()
}

fn convert_headings(text: &str) -> String {
    let h3 = Regex::new(r"(?m)^### (.*)$").unwrap();
    let text = h3.replace_all(text, |caps: &regex::Captures| {
        format!("<h3 id=\"section-{}\">{}</h3>", slugify(&caps[1]), &caps[1])
    });

    let h2 = Regex::new(r"(?m)^## (.*)$").unwrap();
    let text = h2.replace_all(&text, |caps: &regex::Captures| {
        format!("<h2 id=\"section-{}\">{}</h2>", slugify(&caps[1]), &caps[1])
    });

    // Top-level headings duplicate the list entry's title; drop the line
    let h1 = Regex::new(r"(?m)^# .*$").unwrap();
    h1.replace_all(&text, "").to_string()
}

fn convert_bold(text: &str) -> String {
    let re = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    re.replace_all(text, "<strong class=\"emphasis\">$1</strong>")
        .to_string()
}

fn convert_italic(text: &str) -> String {
    let re = Regex::new(r"\*(.*?)\*").unwrap();
    re.replace_all(text, "<em class=\"emphasis\">$1</em>").to_string()
}

fn convert_links(text: &str) -> String {
    let re = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap();
    re.replace_all(
        text,
        "<a href=\"$2\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"external-link\">$1</a>",
    )
    .to_string()
}

fn convert_images(text: &str) -> String {
    let re = Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap();
    re.replace_all(
        text,
        "<img src=\"$2\" alt=\"$1\" class=\"article-image\" style=\"max-width: 100%; height: auto; display: block; margin: 20px auto;\">",
    )
    .to_string()
}

fn convert_paragraphs(text: &str) -> String {
    let text = text.replace("\n\n", "</p><p class=\"paragraph\">");
    text.replace('\n', "<br>")
}

fn classify_paragraphs(text: &str) -> String {
    let text = text.replace("<p></p>", "");
    let text = text.replace("<p><br></p>", "");
    text.replace("<p>", "<p class=\"paragraph\">")
}

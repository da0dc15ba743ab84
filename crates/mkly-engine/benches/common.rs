//! Input generators shared by the parsing and reconstruction benches.
//!
//! Each bench target compiles this module on its own and only calls some of
//! the generators, hence the `dead_code` allowances.

#[allow(dead_code)]
pub fn generate_mkly_source(blocks: usize) -> String {
    let mut source = String::from("--- use: core\n\n--- meta\ntitle: Benchmark\n\n");
    for i in 0..blocks {
        source.push_str(&format!(
            "// block {i}\n--- core/heading\nlevel: 2\n\nHeading {i}\n\n\
             --- core/card: Card {i}\nimage: https://example.com/{i}.jpg\nlink: https://example.com/{i}\n\n\
             ### Story {i}\n\nSome **bold** summary text.\n\n\
             --- core/section\ntitle: Section {i}\n\n--- core/text\n\nNested paragraph.\n--- /core/section\n\n"
        ));
    }
    source
}

#[allow(dead_code)]
pub fn generate_web_html(blocks: usize) -> String {
    let mut html = String::from("<html><head><meta name=\"mkly:use\" content=\"core\"></head><body>\n");
    for i in 0..blocks {
        html.push_str(&format!(
            "<h2 class=\"mkly-core-heading\">Heading {i}</h2>\n\
             <div class=\"mkly-core-card\"><img class=\"mkly-core-card__image\" src=\"https://example.com/{i}.jpg\">\
             <div class=\"mkly-core-card__body\"><h3>Story {i}</h3><p>Summary</p>\
             <a class=\"mkly-core-card__more\" href=\"https://example.com/{i}\">Read more</a></div></div>\n"
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Foreign HTML with each block nested `depth` layout tables deep.
#[allow(dead_code)]
pub fn generate_table_html(blocks: usize, depth: usize) -> String {
    let open = "<table width=\"100%\" cellpadding=\"0\"><tr><td>".repeat(depth);
    let close = "</td></tr></table>".repeat(depth);
    let mut html = String::from("<html><body>");
    for i in 0..blocks {
        html.push_str(&format!(
            "{open}<h2>Heading {i}</h2><p>Paragraph {i} with <a href=\"https://example.com\">a link</a>.</p>\
             <ul><li>One</li><li>Two</li></ul>{close}"
        ));
    }
    html.push_str("</body></html>");
    html
}

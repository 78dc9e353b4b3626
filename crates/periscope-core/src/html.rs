//! HTML document rewriting.
//!
//! Built on a streaming tokenizer rather than text substitution, so URLs
//! inside comments or text content are never mistaken for attributes. The
//! passes run per element as the document streams through: URL-bearing
//! attributes, `srcset` lists, inline and embedded CSS, meta-refresh
//! targets, nested `srcdoc` fragments, quoted URLs in inline scripts, and
//! finally the interception script injected before the closing body tag.
//!
//! Every reference resolves against the page's full URL so relative paths
//! on deep pages land on the right document. A reference that fails to
//! resolve is left as written; one bad URL never fails the page.

use lol_html::errors::RewritingError;
use lol_html::html_content::{ContentType, Element};
use lol_html::{element, text, HandlerResult, HtmlRewriter, Settings};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::codec::{self, RewriteContext};
use crate::css;
use crate::error::RewriteError;
use crate::script;

/// Attributes rewritten wholesale through the codec.
const URL_ATTRIBUTES: [&str; 6] = ["href", "src", "action", "poster", "data-src", "data-href"];

/// Rewrites a full HTML document fetched for `ctx`'s base URL.
pub fn rewrite_html(html: &[u8], ctx: &RewriteContext) -> Result<Vec<u8>, RewriteError> {
    let interception = format!("<script>{}</script>", script::interception_script(ctx));

    let mut output = Vec::with_capacity(html.len() + interception.len());
    let mut style_text = String::new();
    let mut script_text = String::new();

    let mut handlers = Vec::new();
    for name in URL_ATTRIBUTES {
        handlers.push(element!(format!("*[{name}]"), move |el| {
            proxy_attribute(el, name, ctx)
        }));
    }
    handlers.push(element!("*[srcset]", |el| {
        if let Some(srcset) = el.get_attribute("srcset") {
            let rewritten = rewrite_srcset(&srcset, ctx);
            if rewritten != srcset {
                el.set_attribute("srcset", &rewritten)?;
            }
        }
        Ok(())
    }));
    handlers.push(element!("*[style]", |el| {
        if let Some(style) = el.get_attribute("style") {
            let rewritten = css::rewrite_css(&style, ctx);
            if rewritten != style {
                el.set_attribute("style", &rewritten)?;
            }
        }
        Ok(())
    }));
    handlers.push(element!("meta", |el| {
        let refresh = el
            .get_attribute("http-equiv")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"));
        if refresh {
            if let Some(content) = el.get_attribute("content") {
                if let Some(rewritten) = rewrite_refresh_content(&content, ctx) {
                    el.set_attribute("content", &rewritten)?;
                }
            }
        }
        Ok(())
    }));
    handlers.push(element!("iframe[srcdoc]", |el| {
        if let Some(srcdoc) = el.get_attribute("srcdoc") {
            let fragment = unescape_attribute(&srcdoc);
            match rewrite_fragment_urls(&fragment, ctx) {
                Ok(rewritten) => el.set_attribute("srcdoc", &rewritten)?,
                Err(error) => debug!(%error, "leaving srcdoc fragment as written"),
            }
        }
        Ok(())
    }));
    handlers.push(text!("style", move |chunk| {
        style_text.push_str(chunk.as_str());
        if chunk.last_in_text_node() {
            chunk.replace(&css::rewrite_css(&style_text, ctx), ContentType::Html);
            style_text.clear();
        } else {
            chunk.remove();
        }
        Ok(())
    }));
    handlers.push(text!("script", move |chunk| {
        script_text.push_str(chunk.as_str());
        if chunk.last_in_text_node() {
            chunk.replace(&rewrite_js_urls(&script_text, ctx), ContentType::Html);
            script_text.clear();
        } else {
            chunk.remove();
        }
        Ok(())
    }));
    handlers.push(element!("body", move |el| {
        el.append(&interception, ContentType::Html);
        Ok(())
    }));

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: handlers,
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );
    rewriter.write(html)?;
    rewriter.end()?;

    Ok(output)
}

/// Routes one URL-bearing attribute through the codec.
///
/// The value is used exactly as written in the markup; entity references
/// like `&amp;` are not decoded first, so they percent-encode literally
/// rather than as the character a browser would navigate with.
fn proxy_attribute(el: &mut Element<'_, '_>, name: &str, ctx: &RewriteContext) -> HandlerResult {
    if let Some(value) = el.get_attribute(name) {
        let routed = codec::resolve_and_encode(&value, ctx);
        if routed != value {
            el.set_attribute(name, &routed)?;
        }
    }
    Ok(())
}

/// Rewrites each comma-separated `srcset` entry's URL token, keeping its
/// width or density descriptor intact.
fn rewrite_srcset(srcset: &str, ctx: &RewriteContext) -> String {
    srcset
        .split(',')
        .map(|entry| {
            let entry = entry.trim();
            let (reference, descriptor) = match entry.split_once(char::is_whitespace) {
                Some((reference, descriptor)) => (reference, Some(descriptor.trim_start())),
                None => (entry, None),
            };
            let routed = codec::resolve_and_encode(reference, ctx);
            match descriptor {
                Some(descriptor) => format!("{routed} {descriptor}"),
                None => routed,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrites the URL segment of a `refresh` directive, `N;url=X`.
/// Returns `None` when the content is not in that form or nothing changed.
fn rewrite_refresh_content(content: &str, ctx: &RewriteContext) -> Option<String> {
    static REFRESH: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)^\s*(\d+\s*;\s*url\s*=\s*)(.+)$").unwrap());

    let caps = REFRESH.captures(content)?;
    let reference = caps[2].trim().trim_matches(|c| c == '"' || c == '\'');
    let routed = codec::resolve_and_encode(reference, ctx);
    if routed == reference {
        return None;
    }
    Some(format!("{}{}", &caps[1], routed))
}

/// Rewrites `href`/`src` attributes inside an HTML fragment, as found in
/// `srcdoc`. The fragment gets its own tokenizer pass.
fn rewrite_fragment_urls(fragment: &str, ctx: &RewriteContext) -> Result<String, RewritingError> {
    let mut output = Vec::with_capacity(fragment.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("*[href]", |el| proxy_attribute(el, "href", ctx)),
                element!("*[src]", |el| proxy_attribute(el, "src", ctx)),
            ],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );
    rewriter.write(fragment.as_bytes())?;
    rewriter.end()?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

/// Decodes the entities an HTML serializer produces in attribute values.
/// `&amp;` goes last so it cannot manufacture new entities. Numeric
/// character references (`&#47;` and the like) are left as written.
fn unescape_attribute(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Rewrites quoted absolute URLs inside inline script text.
///
/// Scans for string literals and routes those whose content is a bare
/// `http(s)://` URL with no embedded quotes or escapes. Anything more
/// structured is left alone rather than risk corrupting the script.
fn rewrite_js_urls(js: &str, ctx: &RewriteContext) -> String {
    let bytes = js.as_bytes();
    let mut out = String::with_capacity(js.len());
    let mut copy_from = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let quote = bytes[i];
        if quote != b'"' && quote != b'\'' && quote != b'`' {
            i += 1;
            continue;
        }
        let close = match find_literal_end(bytes, i) {
            Some(close) => close,
            None => {
                i += 1;
                continue;
            }
        };
        let content = &js[i + 1..close];
        if is_rewritable_js_url(content) {
            let routed = codec::resolve_and_encode(content, ctx);
            if routed != content {
                out.push_str(&js[copy_from..=i]);
                out.push_str(&routed);
                copy_from = close;
            }
        }
        i = close + 1;
    }

    out.push_str(&js[copy_from..]);
    out
}

fn find_literal_end(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn is_rewritable_js_url(content: &str) -> bool {
    (content.starts_with("http://") || content.starts_with("https://"))
        && !content.contains(['"', '\'', '`', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_target;

    fn ctx_for(base: &str) -> RewriteContext {
        RewriteContext::new(parse_target(base).unwrap())
    }

    fn rewrite(html: &str, base: &str) -> String {
        let out = rewrite_html(html.as_bytes(), &ctx_for(base)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn anchor_href_is_proxied_against_page_base() {
        let out = rewrite(r#"<a href="/about">About</a>"#, "https://example.com/");
        assert_eq!(
            out,
            r#"<a href="/p?u=https%3A%2F%2Fexample.com%2Fabout">About</a>"#
        );
    }

    #[test]
    fn relative_paths_resolve_against_the_full_page_url() {
        let out = rewrite(
            r#"<img src="logo.png">"#,
            "https://example.com/blog/post/index.html",
        );
        assert_eq!(
            out,
            r#"<img src="/p?u=https%3A%2F%2Fexample.com%2Fblog%2Fpost%2Flogo.png">"#
        );
    }

    #[test]
    fn fragment_links_keep_their_original_quote_style() {
        let html = "<a href='#top'>Top</a>";
        assert_eq!(rewrite(html, "https://example.com/"), html);
    }

    #[test]
    fn action_poster_and_data_attributes_are_proxied() {
        let out = rewrite(
            r#"<form action="/submit"></form><video poster="p.jpg"></video><img data-src="lazy.png">"#,
            "https://example.com/",
        );
        assert!(out.contains(r#"action="/p?u=https%3A%2F%2Fexample.com%2Fsubmit""#));
        assert!(out.contains(r#"poster="/p?u=https%3A%2F%2Fexample.com%2Fp.jpg""#));
        assert!(out.contains(r#"data-src="/p?u=https%3A%2F%2Fexample.com%2Flazy.png""#));
    }

    #[test]
    fn entity_references_in_attributes_are_encoded_as_written() {
        let out = rewrite(r#"<a href="/x?a=1&amp;b=2">x</a>"#, "https://example.com/");
        assert_eq!(
            out,
            r#"<a href="/p?u=https%3A%2F%2Fexample.com%2Fx%3Fa%3D1%26amp%3Bb%3D2">x</a>"#
        );
    }

    #[test]
    fn srcset_entries_keep_descriptors_and_count() {
        let out = rewrite(
            r#"<img srcset="a.png 1x, b.png 2x">"#,
            "https://example.com/dir/page.html",
        );
        assert_eq!(
            out,
            concat!(
                r#"<img srcset="/p?u=https%3A%2F%2Fexample.com%2Fdir%2Fa.png 1x, "#,
                r#"/p?u=https%3A%2F%2Fexample.com%2Fdir%2Fb.png 2x">"#
            )
        );
    }

    #[test]
    fn srcset_entry_without_descriptor_is_still_rewritten() {
        let out = rewrite(r#"<img srcset="a.png">"#, "https://example.com/");
        assert_eq!(
            out,
            r#"<img srcset="/p?u=https%3A%2F%2Fexample.com%2Fa.png">"#
        );
    }

    #[test]
    fn style_attribute_goes_through_the_css_rewriter() {
        let out = rewrite(
            r#"<div style="background:url(bg.png)"></div>"#,
            "https://example.com/",
        );
        assert_eq!(
            out,
            r#"<div style="background:url(&quot;/p?u=https%3A%2F%2Fexample.com%2Fbg.png&quot;)"></div>"#
        );
    }

    #[test]
    fn style_element_matches_standalone_css_rewriting() {
        let ctx = ctx_for("https://example.com/styles/");
        let sheet = "body{background:url(bg.png)}@import url(extra.css);";
        let out = rewrite(
            &format!("<style>{sheet}</style>"),
            "https://example.com/styles/",
        );
        assert_eq!(out, format!("<style>{}</style>", css::rewrite_css(sheet, &ctx)));
    }

    #[test]
    fn meta_refresh_url_segment_is_rewritten() {
        let out = rewrite(
            r#"<meta http-equiv="refresh" content="5; url=/next">"#,
            "https://example.com/",
        );
        assert_eq!(
            out,
            r#"<meta http-equiv="refresh" content="5; url=/p?u=https%3A%2F%2Fexample.com%2Fnext">"#
        );
    }

    #[test]
    fn meta_refresh_matches_case_insensitively() {
        let out = rewrite(
            r#"<meta http-equiv="REFRESH" content="0;URL='/start'">"#,
            "https://example.com/",
        );
        assert!(out.contains("/p?u=https%3A%2F%2Fexample.com%2Fstart"));
    }

    #[test]
    fn meta_without_refresh_directive_is_untouched() {
        let html = r#"<meta http-equiv="content-type" content="text/html">"#;
        assert_eq!(rewrite(html, "https://example.com/"), html);
    }

    #[test]
    fn srcdoc_fragment_is_rewritten_and_requoted() {
        let out = rewrite(
            r#"<iframe srcdoc="&lt;a href=&quot;/x&quot;&gt;go&lt;/a&gt;"></iframe>"#,
            "https://example.com/",
        );
        assert!(out.contains("href=&quot;/p?u=https%3A%2F%2Fexample.com%2Fx&quot;"));
        assert!(!out.contains(r#"href="/x""#));
    }

    #[test]
    fn numeric_character_references_stay_as_written() {
        assert_eq!(unescape_attribute("&lt;a&gt; &#47; &amp;"), "<a> &#47; &");
    }

    #[test]
    fn iframe_src_is_proxied_like_any_src() {
        let out = rewrite(
            r#"<iframe src="https://other.example.net/embed"></iframe>"#,
            "https://example.com/",
        );
        assert!(out.contains(r#"src="/p?u=https%3A%2F%2Fother.example.net%2Fembed""#));
    }

    #[test]
    fn quoted_absolute_url_in_inline_script_is_rewritten() {
        let out = rewrite(
            r#"<script>var api = "https://api.example.net/v1";</script>"#,
            "https://example.com/",
        );
        assert_eq!(
            out,
            r#"<script>var api = "/p?u=https%3A%2F%2Fapi.example.net%2Fv1";</script>"#
        );
    }

    #[test]
    fn relative_strings_in_scripts_are_not_rewritten() {
        let html = r#"<script>var path = "/api/data";</script>"#;
        assert_eq!(rewrite(html, "https://example.com/"), html);
    }

    #[test]
    fn script_strings_with_embedded_quotes_are_left_alone() {
        let html = r#"<script>var tricky = "https://a.example/it's";</script>"#;
        assert_eq!(rewrite(html, "https://example.com/"), html);
    }

    #[test]
    fn interception_script_lands_before_closing_body() {
        let out = rewrite(
            "<html><body><p>hi</p></body></html>",
            "https://example.com/",
        );
        assert!(out.contains("window.__periscopeHooks"));
        let script_at = out.find("<script>").unwrap();
        let body_close_at = out.find("</body>").unwrap();
        assert!(script_at < body_close_at);
    }

    #[test]
    fn document_without_closing_body_gets_no_script() {
        let out = rewrite("<body><p>unterminated", "https://example.com/");
        assert!(!out.contains("__periscopeHooks"));
    }

    #[test]
    fn one_bad_reference_does_not_stop_the_rest() {
        let out = rewrite(
            r#"<a href="http://[bad">x</a><a href="/ok">y</a>"#,
            "https://example.com/",
        );
        assert!(out.contains(r#"href="http://[bad""#));
        assert!(out.contains(r#"href="/p?u=https%3A%2F%2Fexample.com%2Fok""#));
    }

    #[test]
    fn excluded_schemes_survive_everywhere() {
        let html = concat!(
            r#"<a href="javascript:void(0)">js</a>"#,
            r#"<a href="mailto:a@example.com">mail</a>"#,
            r#"<img src="data:image/png;base64,AAAA">"#
        );
        assert_eq!(rewrite(html, "https://example.com/"), html);
    }
}

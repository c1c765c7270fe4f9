//! Dark Theme Injection
//!
//! Adds dark-theme styling to converted documents. Injection is independent of the
//! word transformation and idempotent: running it twice on the same document
//! leaves a single `<style>` element and a single stylesheet link.

use crate::dom::{Document, Element, Node};

/// Identifier of the injected `<style>` element and of the registered stylesheet
pub const DARK_THEME_ID: &str = "bionic-dark-theme";

/// File name of the shared stylesheet added to containers
pub const DARK_THEME_FILE: &str = "styles/bionic-dark-theme.css";

/// The dark theme rule block
pub const DARK_THEME_CSS: &str = r#"
@media (prefers-color-scheme: dark) {
    body {
        color: #f0f0f0 !important;
        background-color: #121212 !important;
    }

    p, h1, h2, h3, h4, h5, h6, li, span, div {
        color: #f0f0f0 !important;
    }

    a {
        color: #90caf9 !important;
    }

    b, strong {
        color: #ffffff !important;
        font-weight: bold !important;
    }
}
"#;

/// Make sure the document has a `<head>` element and return it
///
/// A missing `<head>` is inserted as the first child of `<html>`. When the document
/// has no `<html>` element at all, its content is wrapped into
/// `<html><head></head>...</html>`; the XML declaration, processing instructions
/// and the doctype stay in front of the new root.
pub fn ensure_head(document: &mut Document) -> &mut Element {
    if document.find_element_mut("head").is_none() {
        match document.find_element_mut("html") {
            Some(html) => {
                let head = Element::new(&prefixed_name(html, "head"));
                html.children.insert(0, Node::Element(head));
            }
            None => wrap_in_html(document),
        }
    }

    document
        .find_element_mut("head")
        .expect("head element was just ensured")
}

/// Keep the namespace prefix of the root, so `<h:html>` gets an `<h:head>`
fn prefixed_name(root: &Element, local_name: &str) -> String {
    match root.name.rsplit_once(':') {
        Some((prefix, _)) => format!("{}:{}", prefix, local_name),
        None => local_name.to_string(),
    }
}

fn wrap_in_html(document: &mut Document) {
    let (prolog, content): (Vec<Node>, Vec<Node>) = std::mem::take(&mut document.children)
        .into_iter()
        .partition(|node| matches!(node, Node::Instruction(_) | Node::DocType(_)));

    let mut html = Element::new("html");
    html.children.push(Node::Element(Element::new("head")));
    html.children.extend(content);

    document.children = prolog;
    document.children.push(Node::Element(html));
}

/// Append the dark theme `<style>` element to the document head
pub fn inject_dark_theme(document: &mut Document) {
    let head = ensure_head(document);
    let present = head
        .find_elements_by_name("style")
        .any(|style| style.get_attr("id").as_deref() == Some(DARK_THEME_ID));
    if present {
        return;
    }

    let style = Element::new("style")
        .with_attr("id", DARK_THEME_ID)
        .with_attr("type", "text/css")
        .with_child(Node::RawText(DARK_THEME_CSS.to_string()));
    head.children.push(Node::Element(style));
}

/// Link a stylesheet from the document head, unless a link with the same href exists
///
/// ## Return
/// `true` when a new `<link>` element was added.
pub fn ensure_stylesheet_link(document: &mut Document, href: &str) -> bool {
    let head = ensure_head(document);
    let linked = head
        .find_elements_by_name("link")
        .any(|link| link.get_attr("href").as_deref() == Some(href));
    if linked {
        return false;
    }

    let link = Element::new_empty("link")
        .with_attr("href", href)
        .with_attr("rel", "stylesheet")
        .with_attr("type", "text/css");
    head.children.push(Node::Element(link));
    true
}

/// Register the shared stylesheet in a package document's manifest
///
/// `href` is relative to the package document. Nothing is added when an item with
/// the same id or href is already declared.
///
/// ## Return
/// `true` when the manifest was changed, `false` when the stylesheet was already
/// registered or the document has no `<manifest>`.
pub fn register_stylesheet(package: &mut Document, href: &str) -> bool {
    let Some(manifest) = package.find_element_mut("manifest") else {
        return false;
    };

    let registered = manifest.find_elements_by_name("item").any(|item| {
        item.get_attr("id").as_deref() == Some(DARK_THEME_ID)
            || item.get_attr("href").as_deref() == Some(href)
    });
    if registered {
        return false;
    }

    let item = Element::new_empty(&prefixed_name(manifest, "item"))
        .with_attr("id", DARK_THEME_ID)
        .with_attr("href", href)
        .with_attr("media-type", "text/css");
    manifest.children.push(Node::Element(item));
    true
}

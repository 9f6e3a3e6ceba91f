// src/storage/rss.rs

//! RSS 2.0 rendering and reading.
//!
//! Rendering is a pure function of the channel metadata and the article list:
//! `lastBuildDate` is the newest article's date rather than the wall clock, so
//! an unchanged history renders to identical bytes.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{AppError, Result};
use crate::models::{Article, FeedMeta, StoredArticle};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Render articles, in the given order, as an RSS 2.0 document.
pub fn render_feed(meta: &FeedMeta, articles: &[Article]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(AppError::render)?;
    writer
        .write_event(Event::Start(
            BytesStart::new("rss").with_attributes([("version", "2.0"), ("xmlns:atom", ATOM_NS)]),
        ))
        .map_err(AppError::render)?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .map_err(AppError::render)?;

    text_element(&mut writer, "title", &meta.title)?;
    text_element(&mut writer, "link", &meta.site_url)?;
    text_element(&mut writer, "description", &meta.description)?;

    // self must come before alternate
    atom_link(&mut writer, &meta.self_url, "self")?;
    atom_link(&mut writer, &meta.site_url, "alternate")?;

    text_element(&mut writer, "language", &meta.language)?;
    if let Some(newest) = articles.iter().map(|a| a.date).max() {
        text_element(&mut writer, "lastBuildDate", &newest.to_rfc2822())?;
    }

    for article in articles {
        write_item(&mut writer, article)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .map_err(AppError::render)?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .map_err(AppError::render)?;

    let mut xml = String::from_utf8(writer.into_inner()).map_err(AppError::render)?;
    xml.push('\n');
    Ok(xml)
}

fn write_item(writer: &mut Writer<Vec<u8>>, article: &Article) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .map_err(AppError::render)?;

    text_element(writer, "title", &article.title)?;
    text_element(writer, "link", &article.link)?;
    text_element(writer, "description", &article.description)?;
    writer
        .create_element("guid")
        .with_attribute(("isPermaLink", "true"))
        .write_text_content(BytesText::new(&article.link))
        .map_err(AppError::render)?;
    if !article.category.is_empty() {
        text_element(writer, "category", &article.category)?;
    }
    text_element(writer, "pubDate", &article.date.to_rfc2822())?;

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .map_err(AppError::render)?;
    Ok(())
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(text))
        .map_err(AppError::render)?;
    Ok(())
}

fn atom_link(writer: &mut Writer<Vec<u8>>, href: &str, rel: &str) -> Result<()> {
    writer
        .write_event(Event::Empty(BytesStart::new("atom:link").with_attributes([
            ("href", href),
            ("rel", rel),
            ("type", if rel == "self" { "application/rss+xml" } else { "text/html" }),
        ])))
        .map_err(AppError::render)?;
    Ok(())
}

/// Read the items of an RSS document back as lenient stored articles.
pub fn parse_feed(xml: &str) -> Result<Vec<StoredArticle>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<StoredArticle> = None;
    let mut field: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| AppError::parse("feed XML", e))?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    current = Some(StoredArticle::default());
                } else if current.is_some() {
                    field = Some(name);
                }
            }
            Event::Text(e) => {
                if let (Some(item), Some(name)) = (current.as_mut(), field.as_deref()) {
                    let text = e.unescape().map_err(|e| AppError::parse("feed XML", e))?;
                    set_field(item, name, &text);
                }
            }
            Event::CData(e) => {
                if let (Some(item), Some(name)) = (current.as_mut(), field.as_deref()) {
                    set_field(item, name, &String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"item" {
                    items.extend(current.take());
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

fn set_field(item: &mut StoredArticle, name: &str, text: &str) {
    let slot = match name {
        "title" => &mut item.title,
        "link" => &mut item.link,
        "description" => &mut item.description,
        "category" => &mut item.category,
        "pubDate" => &mut item.date,
        // guid doubles as the link in feeds without one
        "guid" if item.link.is_none() => &mut item.link,
        _ => return,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

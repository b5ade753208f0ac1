use std::io;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use carlot_core::{car_path, encode_path, localized_paths, Car};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use super::{cars::load_all_cars, AppState};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Static pages with their change frequency and priority.
const STATIC_PAGES: &[(&str, &str, &str)] = &[("/", "daily", "1.0"), ("/all-cars", "daily", "0.9")];

const CAR_CHANGEFREQ: &str = "weekly";
const CAR_PRIORITY: &str = "0.8";

#[derive(Debug, Clone, PartialEq, Eq)]
struct SitemapEntry {
    loc: String,
    changefreq: &'static str,
    priority: &'static str,
}

/// Every public page path, localized, static pages first.
pub(super) fn public_paths(cars: &[Car]) -> Vec<String> {
    let statics = STATIC_PAGES.iter().map(|(path, _, _)| (*path).to_owned());
    let details = cars.iter().map(|car| car_path(&car.handle));
    statics
        .chain(details)
        .flat_map(|path| localized_paths(&path))
        .collect()
}

/// Absolute URL for a public page path, with the path percent-encoded.
pub(super) fn page_url(site_url: &str, path: &str) -> String {
    format!("{}{}", site_url.trim_end_matches('/'), encode_path(path))
}

fn sitemap_entries(site_url: &str, cars: &[Car]) -> Vec<SitemapEntry> {
    let mut entries = Vec::with_capacity((STATIC_PAGES.len() + cars.len()) * 2);

    for &(path, changefreq, priority) in STATIC_PAGES {
        for localized in localized_paths(path) {
            entries.push(SitemapEntry {
                loc: page_url(site_url, &localized),
                changefreq,
                priority,
            });
        }
    }
    for car in cars {
        for localized in localized_paths(&car_path(&car.handle)) {
            entries.push(SitemapEntry {
                loc: page_url(site_url, &localized),
                changefreq: CAR_CHANGEFREQ,
                priority: CAR_PRIORITY,
            });
        }
    }
    entries
}

fn write_text_element<W: io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn render_sitemap(entries: &[SitemapEntry]) -> io::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS)]),
    ))?;
    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", &entry.loc)?;
        write_text_element(&mut writer, "changefreq", entry.changefreq)?;
        write_text_element(&mut writer, "priority", entry.priority)?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("urlset")))?;

    Ok(writer.into_inner())
}

/// `GET /sitemap.xml`. Lists only the static pages when the catalogue is
/// unavailable.
pub(super) async fn sitemap(State(state): State<AppState>) -> Response {
    let cars = load_all_cars(&state).await;
    let entries = sitemap_entries(&state.config.site_url, &cars);

    match render_sitemap(&entries) {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render sitemap");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serves the IndexNow verification key as plain text.
pub(super) async fn indexnow_key_file(State(state): State<AppState>) -> Response {
    match state.indexnow.as_ref() {
        Some(client) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            client.key().to_owned(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

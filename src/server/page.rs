//! The upload page.
//!
//! There is one page. [`PageTheme`] only changes decoration; the form, its
//! element ids and the script are the same for every theme.

use axum::extract::State;
use maud::{html, Markup, DOCTYPE};

use super::{AppState, CONVERT_PATH};
use crate::config::PageTheme;
use crate::upload::ACCEPTED_IMAGE_TYPES;

const TITLE: &str = "Handwriting Converter";

/// Number of star elements drawn by animated themes.
const STAR_COUNT: usize = 50;

pub async fn index(State(state): State<AppState>) -> Markup {
    page(state.theme())
}

/// Render the full page for `theme`.
pub fn page(theme: PageTheme) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (TITLE) }
                link href="/assets/page.css" rel="stylesheet" type="text/css";
                script src="/assets/upload.js" defer {}
            }
            body class=(theme.body_class()) {
                @if theme.is_animated() {
                    (background())
                }
                div class="logo" { "Scrptbl" }
                main class="card" {
                    h1 { (TITLE) }
                    p class="lead" { "Upload an image with handwritten text to convert it to digital text" }
                    (upload_form())
                    (result_panel())
                }
            }
        }
    }
}

fn upload_form() -> Markup {
    html! {
        form id="upload-form" data-endpoint=(CONVERT_PATH) {
            input type="file" id="file-input" accept=(ACCEPTED_IMAGE_TYPES.join(",")) hidden;
            label for="file-input" class="dropzone" {
                span id="file-label" { "Choose an image" }
                small { "PNG or JPG files only" }
            }
            button type="submit" id="convert-button" disabled { "Convert to Text" }
        }
    }
}

fn result_panel() -> Markup {
    html! {
        section id="result" hidden {
            header {
                h3 { "Converted Text:" }
                button type="button" id="download-button" hidden { "Download" }
            }
            pre id="result-text" {}
        }
    }
}

/// Mountain layers and stars. Star positions are fixed by index so the
/// markup is deterministic.
fn background() -> Markup {
    html! {
        div class="background" aria-hidden="true" {
            div class="mountain mountain-back" {}
            div class="mountain mountain-middle" {}
            div class="mountain mountain-front" {}
            @for i in 0..STAR_COUNT {
                span class="star" style=(star_style(i)) {}
            }
        }
    }
}

fn star_style(i: usize) -> String {
    let left = (i * 37) % 100;
    let top = (i * 53) % 60;
    let delay = (i % 6) as f32 * 0.5;
    format!("left:{left}%;top:{top}%;animation-delay:{delay}s")
}
